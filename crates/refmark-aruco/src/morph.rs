//! Binary erosion with a square structuring element.

use refmark_core::GrayImage;

/// Erode with a `kernel × kernel` rectangle (kernel `<= 1` is a copy).
///
/// Each output pixel is the minimum over the window. Pixels outside the
/// image do not take part, so the frame edge does not erode inwards.
pub(crate) fn erode_rect(src: &GrayImage, kernel: usize) -> GrayImage {
    if kernel <= 1 || src.width == 0 || src.height == 0 {
        return src.clone();
    }
    let before = (kernel - 1) / 2;
    let after = kernel - 1 - before;

    // separable: rows first, then columns
    let mut rows = src.clone();
    for y in 0..src.height {
        for x in 0..src.width {
            let lo = x.saturating_sub(before);
            let hi = (x + after).min(src.width - 1);
            let m = (lo..=hi).map(|xx| src.pixel(xx, y)).min().unwrap_or(0);
            rows.set_pixel(x, y, m);
        }
    }

    let mut out = rows.clone();
    for y in 0..src.height {
        let lo = y.saturating_sub(before);
        let hi = (y + after).min(src.height - 1);
        for x in 0..src.width {
            let m = (lo..=hi).map(|yy| rows.pixel(x, yy)).min().unwrap_or(0);
            out.set_pixel(x, y, m);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erosion_removes_isolated_pixel() {
        let mut img = GrayImage::new_fill(5, 5, 0);
        img.set_pixel(2, 2, 255);
        let out = erode_rect(&img, 3);
        assert!(out.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn erosion_shrinks_block_by_one_pixel() {
        let mut img = GrayImage::new_fill(8, 8, 0);
        for y in 2..6 {
            for x in 2..6 {
                img.set_pixel(x, y, 255);
            }
        }
        let out = erode_rect(&img, 3);
        assert_eq!(out.pixel(3, 3), 255);
        assert_eq!(out.pixel(4, 4), 255);
        assert_eq!(out.pixel(2, 3), 0);
        assert_eq!(out.pixel(5, 4), 0);
    }

    #[test]
    fn frame_edge_does_not_erode() {
        let img = GrayImage::new_fill(4, 4, 255);
        assert_eq!(erode_rect(&img, 3), img);
    }
}
