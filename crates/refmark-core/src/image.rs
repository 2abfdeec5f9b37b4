use crate::ImageError;
use serde::{Deserialize, Serialize};

/// Borrowed single-channel image, row-major with `data.len() == width * height`.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

impl<'a> GrayImageView<'a> {
    /// Wrap a raw buffer, checking that its length matches the dimensions.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        let expected = checked_area(width, height)?;
        if data.len() != expected {
            return Err(ImageError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel at `(x, y)`; callers guarantee the coordinate is inside the image.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Pixel with coordinates clamped to the nearest edge (replicated border).
    #[inline]
    pub fn pixel_clamped(&self, x: i32, y: i32) -> u8 {
        let cx = x.clamp(0, self.width as i32 - 1) as usize;
        let cy = y.clamp(0, self.height as i32 - 1) as usize;
        self.pixel(cx, cy)
    }

    pub fn to_image(&self) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self.data.to_vec(),
        }
    }
}

/// Owned single-channel image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

/// Channel layout of an interleaved 8-bit colour buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    Gray,
    Rgb,
    Bgr,
    Rgba,
    Bgra,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Gray => 1,
            PixelLayout::Rgb | PixelLayout::Bgr => 3,
            PixelLayout::Rgba | PixelLayout::Bgra => 4,
        }
    }

    /// Byte offsets of the red, green and blue samples inside one pixel.
    fn rgb_offsets(self) -> [usize; 3] {
        match self {
            PixelLayout::Gray => [0, 0, 0],
            PixelLayout::Rgb | PixelLayout::Rgba => [0, 1, 2],
            PixelLayout::Bgr | PixelLayout::Bgra => [2, 1, 0],
        }
    }
}

// BT.601 luma in 14-bit fixed point.
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

impl GrayImage {
    pub fn new_fill(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        GrayImageView::new(width, height, &data)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert an interleaved 8-bit buffer to gray.
    ///
    /// Alpha is ignored. Colour layouts use BT.601 weights.
    pub fn from_interleaved(
        width: usize,
        height: usize,
        layout: PixelLayout,
        data: &[u8],
    ) -> Result<Self, ImageError> {
        let channels = layout.channels();
        let area = checked_area(width, height)?;
        let expected = area
            .checked_mul(channels)
            .ok_or(ImageError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(ImageError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }

        if layout == PixelLayout::Gray {
            return Self::from_raw(width, height, data.to_vec());
        }

        let [ri, gi, bi] = layout.rgb_offsets();
        let gray = data
            .chunks_exact(channels)
            .map(|px| {
                let y = px[ri] as u32 * R_WEIGHT
                    + px[gi] as u32 * G_WEIGHT
                    + px[bi] as u32 * B_WEIGHT
                    + (1 << (LUMA_SHIFT - 1));
                (y >> LUMA_SHIFT).min(255) as u8
            })
            .collect();

        Ok(Self {
            width,
            height,
            data: gray,
        })
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    /// Rotate by 90° clockwise. The result is `height × width`.
    pub fn rotate_cw(&self) -> GrayImage {
        let (w, h) = (self.width, self.height);
        let mut data = vec![0u8; w * h];
        // destination is h wide and w tall
        for dy in 0..w {
            for dx in 0..h {
                data[dy * h + dx] = self.data[(h - 1 - dx) * w + dy];
            }
        }
        GrayImage {
            width: h,
            height: w,
            data,
        }
    }
}

fn checked_area(width: usize, height: usize) -> Result<usize, ImageError> {
    width
        .checked_mul(height)
        .ok_or(ImageError::InvalidDimensions { width, height })
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

#[inline]
fn bilinear(x: f32, y: f32, fetch: impl Fn(i32, i32) -> u8) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = fetch(x0, y0) as f32;
    let p10 = fetch(x0 + 1, y0) as f32;
    let p01 = fetch(x0, y0 + 1) as f32;
    let p11 = fetch(x0 + 1, y0 + 1) as f32;

    let top = p00 + fx * (p10 - p00);
    let bottom = p01 + fx * (p11 - p01);
    top + fy * (bottom - top)
}

/// Bilinear sample; pixels outside the image read as black.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    bilinear(x, y, |ix, iy| get_gray(src, ix, iy))
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).round().clamp(0.0, 255.0) as u8
}

/// Bilinear sample with the border replicated outwards.
#[inline]
pub fn sample_bilinear_clamped(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    if src.is_empty() {
        return 0.0;
    }
    bilinear(x, y, |ix, iy| src.pixel_clamped(ix, iy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> GrayImage {
        let data = (0..width * height).map(|i| (i % 251) as u8).collect();
        GrayImage::from_raw(width, height, data).expect("valid ramp")
    }

    #[test]
    fn view_rejects_short_buffer() {
        let data = [0u8; 5];
        let err = GrayImageView::new(2, 3, &data).unwrap_err();
        assert_eq!(err, ImageError::InvalidBuffer { expected: 6, got: 5 });
    }

    #[test]
    fn rotate_cw_moves_top_left_to_top_right() {
        let img = ramp(3, 2);
        let rot = img.rotate_cw();
        assert_eq!((rot.width, rot.height), (2, 3));
        assert_eq!(rot.pixel(1, 0), img.pixel(0, 0));
        assert_eq!(rot.pixel(0, 0), img.pixel(0, 1));
        assert_eq!(rot.pixel(0, 2), img.pixel(2, 1));
    }

    #[test]
    fn four_rotations_restore_the_image() {
        let img = ramp(7, 4);
        let back = img.rotate_cw().rotate_cw().rotate_cw().rotate_cw();
        assert_eq!(back, img);
    }

    #[test]
    fn bgra_and_rgb_agree_on_gray_value() {
        let rgb = [10u8, 200, 30, 255, 255, 255];
        let bgra = [30u8, 200, 10, 0, 255, 255, 255, 7];
        let a = GrayImage::from_interleaved(2, 1, PixelLayout::Rgb, &rgb).expect("rgb");
        let b = GrayImage::from_interleaved(2, 1, PixelLayout::Bgra, &bgra).expect("bgra");
        assert_eq!(a, b);
        assert_eq!(a.data[1], 255);
        // 0.299*10 + 0.587*200 + 0.114*30 = 123.8
        assert_eq!(a.data[0], 124);
    }

    #[test]
    fn clamped_sampling_replicates_the_edge() {
        let img = GrayImage::new_fill(4, 4, 90);
        let view = img.view();
        approx::assert_relative_eq!(sample_bilinear_clamped(&view, -3.0, 1.5), 90.0);
        approx::assert_relative_eq!(sample_bilinear(&view, -3.0, 1.5), 0.0);
    }
}
