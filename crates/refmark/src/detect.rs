use crate::{aruco, core};
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidGrayDimensions { width: u32, height: u32 },

    #[error(transparent)]
    Image(#[from] ::image::ImageError),

    #[error(transparent)]
    Aruco(#[from] aruco::ArucoError),
}

/// Convert an `image::GrayImage` into the lightweight `refmark-core` view type.
pub fn gray_view(img: &::image::GrayImage) -> core::GrayImageView<'_> {
    core::GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Build a detector from a decoded reference marker image.
///
/// Colour inputs are reduced to gray with the BT.601 weights of
/// `refmark-core` before sampling.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(marker, params), fields(width = marker.width(), height = marker.height()))
)]
pub fn detector_from_image(
    marker: &::image::DynamicImage,
    cell_count: usize,
    params: aruco::DetectorParams,
) -> Result<aruco::MarkerDetector, DetectError> {
    let (width, height) = (marker.width() as usize, marker.height() as usize);
    let detector = match marker {
        ::image::DynamicImage::ImageLuma8(gray) => {
            aruco::MarkerDetector::with_params(&gray_view(gray), cell_count, params)?
        }
        ::image::DynamicImage::ImageRgb8(rgb) => aruco::MarkerDetector::from_interleaved(
            width,
            height,
            core::PixelLayout::Rgb,
            rgb.as_raw(),
            cell_count,
            params,
        )?,
        other => {
            let rgba = other.to_rgba8();
            aruco::MarkerDetector::from_interleaved(
                width,
                height,
                core::PixelLayout::Rgba,
                rgba.as_raw(),
                cell_count,
                params,
            )?
        }
    };
    Ok(detector)
}

/// Decode an image file and build a detector from it.
pub fn detector_from_path(
    path: impl AsRef<Path>,
    cell_count: usize,
    params: aruco::DetectorParams,
) -> Result<aruco::MarkerDetector, DetectError> {
    let marker = ::image::open(path)?;
    detector_from_image(&marker, cell_count, params)
}

/// Decode an image file as 8-bit gray.
pub fn open_gray(path: impl AsRef<Path>) -> Result<::image::GrayImage, DetectError> {
    Ok(::image::open(path)?.to_luma8())
}

/// Run `detector` on an `image::GrayImage` frame.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(detector, frame), fields(width = frame.width(), height = frame.height()))
)]
pub fn detect_image(
    detector: &aruco::MarkerDetector,
    frame: &::image::GrayImage,
    allowed_misses: usize,
) -> Result<Vec<aruco::MarkerDetection>, DetectError> {
    Ok(detector.detect(&gray_view(frame), allowed_misses)?)
}

/// Build an `image::GrayImage` from a raw grayscale buffer.
pub fn gray_image_from_slice(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<::image::GrayImage, DetectError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(DetectError::InvalidGrayDimensions { width, height });
    };
    let Some(expected) = w.checked_mul(h) else {
        return Err(DetectError::InvalidGrayDimensions { width, height });
    };
    if pixels.len() != expected {
        return Err(DetectError::InvalidGrayBuffer {
            expected,
            got: pixels.len(),
        });
    }
    ::image::GrayImage::from_raw(width, height, pixels.to_vec())
        .ok_or(DetectError::InvalidGrayDimensions { width, height })
}

/// Detect in a raw grayscale frame buffer.
pub fn detect_gray_u8(
    detector: &aruco::MarkerDetector,
    width: u32,
    height: u32,
    pixels: &[u8],
    allowed_misses: usize,
) -> Result<Vec<aruco::MarkerDetection>, DetectError> {
    let img = gray_image_from_slice(width, height, pixels)?;
    detect_image(detector, &img, allowed_misses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(module_px: u32) -> ::image::GrayImage {
        const PATTERN: [&str; 6] = ["######", "#..#.#", "#.##.#", "#....#", "##.#.#", "######"];
        ::image::GrayImage::from_fn(6 * module_px, 6 * module_px, |x, y| {
            let ch = PATTERN[(y / module_px) as usize].as_bytes()[(x / module_px) as usize];
            ::image::Luma([if ch == b'#' { 0 } else { 255 }])
        })
    }

    #[test]
    fn slice_length_is_checked() {
        assert!(matches!(
            gray_image_from_slice(4, 4, &[0; 15]),
            Err(DetectError::InvalidGrayBuffer {
                expected: 16,
                got: 15
            })
        ));
        assert!(gray_image_from_slice(4, 4, &[0; 16]).is_ok());
    }

    #[test]
    fn colour_and_gray_markers_agree() {
        let gray = marker(20);
        let rgb = ::image::DynamicImage::ImageLuma8(gray.clone()).to_rgb8();
        let params = aruco::DetectorParams::default();
        let a = detector_from_image(&::image::DynamicImage::ImageLuma8(gray), 36, params.clone())
            .expect("gray detector");
        let b = detector_from_image(&::image::DynamicImage::ImageRgb8(rgb), 36, params)
            .expect("rgb detector");
        assert_eq!(a.dictionary(), b.dictionary());
    }

    #[test]
    fn frame_helpers_find_marker_on_canvas() {
        let m = marker(20);
        let detector = detector_from_image(
            &::image::DynamicImage::ImageLuma8(m.clone()),
            36,
            aruco::DetectorParams::default(),
        )
        .expect("detector");
        let mut frame = ::image::GrayImage::from_pixel(200, 200, ::image::Luma([255]));
        ::image::imageops::replace(&mut frame, &m, 40, 40);

        let found = detect_image(&detector, &frame, 0).expect("detect");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 0);

        let raw = detect_gray_u8(&detector, 200, 200, frame.as_raw(), 0).expect("detect raw");
        assert_eq!(raw, found);
    }

    #[test]
    fn unreadable_path_is_an_image_error() {
        let missing = std::env::temp_dir().join("refmark-no-such-marker.png");
        let err = detector_from_path(&missing, 36, aruco::DetectorParams::default())
            .expect_err("missing file");
        assert!(matches!(err, DetectError::Image(_)));
    }
}
