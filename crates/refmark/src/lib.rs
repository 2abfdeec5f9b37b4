//! High-level facade crate for the `refmark-*` workspace.
//!
//! This crate provides:
//! - re-exports of the image primitives and the marker detector
//! - (feature-gated) helpers that run the detector on `image` crate buffers
//!
//! ## Quickstart
//!
//! ```no_run
//! use refmark::detect;
//! use refmark::aruco::DetectorParams;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let marker = image::open("marker.png")?;
//! let frame = image::open("frame.png")?.to_luma8();
//! let detector = detect::detector_from_image(&marker, 36, DetectorParams::default())?;
//! for m in detect::detect_image(&detector, &frame, 0)? {
//!     println!("rotation {} at {:?}", m.index, m.flat_corners());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `refmark::core`: gray images, colour conversion, homographies, logging.
//! - `refmark::aruco`: quad finding, signatures, dictionary, matching, detection.
//! - `refmark::detect` (feature `image`): helpers from `image::DynamicImage` / `image::GrayImage`.

pub use refmark_aruco as aruco;
pub use refmark_core as core;

pub use refmark_aruco::{
    DetectorParams, MarkerDetection, MarkerDetector, MarkerDictionary, SharedDetector,
};
pub use refmark_core::{GrayImage, GrayImageView, PixelLayout};

#[cfg(feature = "image")]
pub mod detect;
