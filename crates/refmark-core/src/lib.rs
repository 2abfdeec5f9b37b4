//! Core image and geometry primitives for reference-marker detection.
//!
//! This crate is intentionally small. It knows about grayscale buffers,
//! colour-to-gray conversion, bilinear sampling and planar homographies,
//! but nothing about markers, contours or dictionaries.

mod error;
mod homography;
mod image;
mod logger;

pub use error::ImageError;
pub use homography::{homography_from_4pt, warp_perspective_gray, Homography};
pub use image::{
    sample_bilinear, sample_bilinear_clamped, sample_bilinear_u8, GrayImage, GrayImageView,
    PixelLayout,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
