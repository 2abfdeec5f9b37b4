//! Global and local thresholding.

use crate::params::{AdaptiveThresholdParams, ThresholdBorder};
use refmark_core::{GrayImage, GrayImageView};

/// Otsu threshold: the level maximising between-class variance.
///
/// Pixels strictly above the returned level belong to the bright class.
pub(crate) fn otsu_threshold(samples: &[u8]) -> u8 {
    let Some((&first, rest)) = samples.split_first() else {
        return 127;
    };
    let (min_v, max_v) = rest
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min_v == max_v {
        return min_v;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;
    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }
    best_t
}

/// Binarise with `255` for pixels above `level`, `0` otherwise.
pub(crate) fn binarize_above(img: &GrayImage, level: u8) -> GrayImage {
    GrayImage {
        width: img.width,
        height: img.height,
        data: img
            .data
            .iter()
            .map(|&v| if v > level { 255 } else { 0 })
            .collect(),
    }
}

/// Otsu-binarise an image in one step.
pub(crate) fn otsu_binarize(img: &GrayImage) -> GrayImage {
    binarize_above(img, otsu_threshold(&img.data))
}

/// Inverted local-mean threshold: `255` marks pixels darker than their
/// neighbourhood mean by at least `offset`, everything else is `0`.
pub(crate) fn adaptive_threshold_inv(
    img: &GrayImageView<'_>,
    params: &AdaptiveThresholdParams,
) -> GrayImage {
    let (w, h) = (img.width, img.height);
    let mut out = GrayImage::new_fill(w, h, 0);
    if img.is_empty() {
        return out;
    }

    let r = params.block_size.max(1) / 2;
    let pw = w + 2 * r;
    let ph = h + 2 * r;

    // summed-area table over the padded frame, one extra zero row and column
    let stride = pw + 1;
    let mut integral = vec![0u64; stride * (ph + 1)];
    for py in 0..ph {
        let mut row_sum = 0u64;
        for px in 0..pw {
            let x = px as i32 - r as i32;
            let y = py as i32 - r as i32;
            let v = match params.border {
                ThresholdBorder::Replicate => img.pixel_clamped(x, y),
                ThresholdBorder::Constant(c) => {
                    if x < 0 || y < 0 || x >= w as i32 || y >= h as i32 {
                        c
                    } else {
                        img.pixel(x as usize, y as usize)
                    }
                }
            };
            row_sum += v as u64;
            integral[(py + 1) * stride + px + 1] = integral[py * stride + px + 1] + row_sum;
        }
    }

    let side = 2 * r + 1;
    let area = (side * side) as u64;
    let delta = params.offset.ceil() as i32;
    for y in 0..h {
        for x in 0..w {
            // window [x, x + side) in padded coordinates
            let (x0, y0, x1, y1) = (x, y, x + side, y + side);
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let mean = ((sum + area / 2) / area) as i32;
            if img.pixel(x, y) as i32 - mean <= -delta {
                out.set_pixel(x, y, 255);
            }
        }
    }
    out
}
