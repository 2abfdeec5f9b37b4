//! Gradient-orthogonality corner refinement.
//!
//! For a true corner `q`, the image gradient at every nearby point `p` is
//! orthogonal to `p - q`. Each iteration solves the Gaussian-weighted
//! least-squares system for `q` over a square window and recentres.

use crate::params::SubPixParams;
use nalgebra::Point2;
use refmark_core::{sample_bilinear_clamped, GrayImageView};

/// Refine a corner estimate and return the new position.
///
/// The initial position is kept when the system is singular (flat window)
/// or when the estimate drifts farther than the window half-size.
pub(crate) fn refine_corner(
    img: &GrayImageView<'_>,
    corner: Point2<f32>,
    params: &SubPixParams,
) -> Point2<f32> {
    let win = params.half_window as i32;
    if win <= 0 || img.is_empty() {
        return corner;
    }
    let side = (2 * win + 1) as usize;

    let weights: Vec<f64> = (-win..=win)
        .map(|i| {
            let t = i as f64 / win as f64;
            (-t * t).exp()
        })
        .collect();

    // patch of side + 2 so central differences cover the whole window
    let patch_side = side + 2;
    let mut patch = vec![0f64; patch_side * patch_side];
    let eps2 = (params.epsilon as f64) * (params.epsilon as f64);

    let start = Point2::new(corner.x as f64, corner.y as f64);
    let mut cur = start;
    for _ in 0..params.max_iterations.max(1) {
        for (py, row) in patch.chunks_exact_mut(patch_side).enumerate() {
            for (px, v) in row.iter_mut().enumerate() {
                let x = cur.x + (px as i32 - win - 1) as f64;
                let y = cur.y + (py as i32 - win - 1) as f64;
                *v = sample_bilinear_clamped(img, x as f32, y as f32) as f64;
            }
        }

        let (mut a, mut b, mut c, mut bb1, mut bb2) = (0f64, 0f64, 0f64, 0f64, 0f64);
        for i in 0..side {
            let dy = (i as i32 - win) as f64;
            for j in 0..side {
                let dx = (j as i32 - win) as f64;
                let m = weights[i] * weights[j];
                let at = |row: usize, col: usize| patch[row * patch_side + col];
                let gx = at(i + 1, j + 2) - at(i + 1, j);
                let gy = at(i + 2, j + 1) - at(i, j + 1);
                let gxx = gx * gx * m;
                let gxy = gx * gy * m;
                let gyy = gy * gy * m;
                a += gxx;
                b += gxy;
                c += gyy;
                bb1 += gxx * dx + gxy * dy;
                bb2 += gxy * dx + gyy * dy;
            }
        }

        let det = a * c - b * b;
        if det.abs() <= f64::EPSILON * f64::EPSILON {
            break;
        }
        let scale = 1.0 / det;
        let next = Point2::new(
            cur.x + c * scale * bb1 - b * scale * bb2,
            cur.y - b * scale * bb1 + a * scale * bb2,
        );
        let step2 = (next - cur).norm_squared();
        cur = next;
        if cur.x < 0.0 || cur.y < 0.0 || cur.x >= img.width as f64 || cur.y >= img.height as f64 {
            break;
        }
        if step2 <= eps2 {
            break;
        }
    }

    if (cur.x - start.x).abs() > win as f64 || (cur.y - start.y).abs() > win as f64 {
        return corner;
    }
    Point2::new(cur.x as f32, cur.y as f32)
}
