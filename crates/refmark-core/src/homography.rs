//! Planar homographies from four point correspondences.

use crate::{sample_bilinear_u8, GrayImage, GrayImageView};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A 3×3 projective transform acting on image-plane points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Similarity moving the four points to their centroid with mean distance sqrt(2).
fn conditioning(pts: &[Point2<f32>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    let (sx, sy) = pts
        .iter()
        .fold((0.0_f64, 0.0_f64), |(ax, ay), p| (ax + p.x as f64, ay + p.y as f64));
    let (cx, cy) = (sx / 4.0, sy / 4.0);

    let spread = pts
        .iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / 4.0;
    let s = if spread > 1e-12 {
        std::f64::consts::SQRT_2 / spread
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let conditioned = pts.map(|p| {
        let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point2::new(v[0], v[1])
    });
    (conditioned, t)
}

/// Compute `H` with `dst ~ H * src` from exactly four correspondences.
///
/// Returns `None` for degenerate configurations (three collinear points,
/// repeated corners). Corner order must match between `src` and `dst`.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let (s, t_src) = conditioning(src);
    let (d, t_dst) = conditioning(dst);

    // h33 fixed to 1; two rows per correspondence
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for k in 0..4 {
        let (x, y) = (s[k].x, s[k].y);
        let (u, v) = (d[k].x, d[k].y);

        let r = 2 * k;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let x = a.lu().solve(&b)?;
    if x.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let hn = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7], 1.0);
    // conditioned inputs keep a valid map's determinant near unit scale
    if hn.determinant().abs() < 1e-9 {
        return None;
    }

    let h = t_dst.try_inverse()? * hn * t_src;
    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h / scale))
}

/// Inverse-mapped warp: each output pixel centre is sent through
/// `h_img_from_rect` and sampled bilinearly from `src` (black outside).
#[cfg_attr(
    feature = "tracing",
    instrument(level = "trace", skip(src, h_img_from_rect))
)]
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_img_from_rect: &Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = GrayImage::new_fill(out_w, out_h, 0);
    for y in 0..out_h {
        for x in 0..out_w {
            let p = h_img_from_rect.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            out.set_pixel(x, y, sample_bilinear_u8(src, p.x, p.y));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_close(a: Point2<f32>, b: Point2<f32>) {
        assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-3);
        assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-3);
    }

    #[test]
    fn recovers_known_projective_map() {
        let truth = Homography::new(Matrix3::new(
            0.9, 0.08, 40.0, //
            -0.03, 1.05, 25.0, //
            0.0007, -0.0003, 1.0,
        ));
        let square = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(36.0, 0.0),
            Point2::new(36.0, 36.0),
            Point2::new(0.0, 36.0),
        ];
        let quad = square.map(|p| truth.apply(p));

        let h = homography_from_4pt(&square, &quad).expect("non-degenerate");
        for p in [Point2::new(3.0_f32, 3.0), Point2::new(18.0, 30.0)] {
            assert_close(h.apply(p), truth.apply(p));
        }

        let inv = h.inverse().expect("invertible");
        assert_close(inv.apply(h.apply(Point2::new(9.0, 21.0))), Point2::new(9.0, 21.0));
    }

    #[test]
    fn repeated_corners_are_rejected() {
        let square = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let pinched = [Point2::new(4.0_f32, 4.0); 4];
        assert!(homography_from_4pt(&pinched, &square).is_none());
    }

    #[test]
    fn identity_warp_copies_pixels() {
        let mut img = GrayImage::new_fill(5, 4, 0);
        img.set_pixel(2, 1, 200);
        // pixel centres sit at integer coordinates in the sampler
        let shift = Homography::new(Matrix3::new(1.0, 0.0, -0.5, 0.0, 1.0, -0.5, 0.0, 0.0, 1.0));
        let out = warp_perspective_gray(&img.view(), &shift, 5, 4);
        assert_eq!(out, img);
    }
}
