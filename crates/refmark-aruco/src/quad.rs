//! Candidate quadrilateral extraction.

use crate::contour::{
    approx_poly_closed, arc_length, find_external_contours, is_convex, signed_area,
};
use crate::params::QuadFinderParams;
use crate::subpix::refine_corner;
use crate::threshold::adaptive_threshold_inv;
use log::{debug, trace};
use nalgebra::Point2;
use refmark_core::GrayImageView;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Four image-space corners in canonical order: top-left, top-right,
/// bottom-right, bottom-left (positive shoelace area with y pointing down).
pub type Quad = [Point2<f32>; 4];

/// Find convex, sufficiently large four-sided outer contours.
///
/// Corners are refined to sub-pixel precision and returned in canonical
/// order; quads come out in contour discovery (raster) order. Rejected
/// shapes are dropped silently.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(image, params), fields(width = image.width, height = image.height))
)]
pub fn find_quads(image: &GrayImageView<'_>, params: &QuadFinderParams) -> Vec<Quad> {
    if image.is_empty() {
        return Vec::new();
    }

    let binary = adaptive_threshold_inv(image, &params.threshold);
    let contours = find_external_contours(&binary);

    let mut quads = Vec::new();
    for contour in &contours {
        let pts: Vec<Point2<f64>> = contour
            .iter()
            .map(|p| Point2::new(p.x as f64, p.y as f64))
            .collect();
        let eps = params.poly_epsilon_rel as f64 * arc_length(&pts);
        let poly = approx_poly_closed(&pts, eps);

        let Some(quad) = quad_from_polygon(&poly, params.min_area as f64) else {
            trace!(
                "rejected contour: {} points -> {} vertices",
                contour.len(),
                poly.len()
            );
            continue;
        };

        let refined = quad.map(|p| refine_corner(image, p, &params.subpix));
        quads.push(order_quad(refined));
    }

    debug!(
        "{} outer contours, {} quad candidates",
        contours.len(),
        quads.len()
    );
    quads
}

/// Accept a simplified polygon as a marker candidate.
pub(crate) fn quad_from_polygon(poly: &[Point2<f64>], min_area: f64) -> Option<Quad> {
    if poly.len() != 4 {
        return None;
    }
    if signed_area(poly).abs() < min_area || !is_convex(poly) {
        return None;
    }
    Some([0, 1, 2, 3].map(|i| Point2::new(poly[i].x as f32, poly[i].y as f32)))
}

/// Reorder a convex quad into canonical order.
///
/// Winding follows the sign of the shoelace area, whatever order the
/// contour tracer produced. The corner lying farthest towards the top-left
/// of the centroid is then rotated to the front.
pub fn order_quad(mut quad: Quad) -> Quad {
    let pts = quad.map(|p| Point2::new(p.x as f64, p.y as f64));
    if signed_area(&pts) < 0.0 {
        quad.swap(1, 3);
    }

    let cx = quad.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let cy = quad.iter().map(|p| p.y).sum::<f32>() / 4.0;
    let toward_top_left = |p: &Point2<f32>| (p.x - cx) + (p.y - cy);
    let first = (0..4)
        .min_by(|&a, &b| toward_top_left(&quad[a]).total_cmp(&toward_top_left(&quad[b])))
        .unwrap_or(0);
    quad.rotate_left(first);
    quad
}
