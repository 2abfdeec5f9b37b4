//! Square fiducial detection against a dictionary learned from one
//! reference marker image.
//!
//! The pipeline is:
//! - adaptive thresholding and outer-contour extraction ([`find_quads`]),
//! - perspective rectification and cell sampling ([`sample_signature`]),
//! - a four-rotation dictionary of the reference ([`MarkerDictionary`]),
//! - first-match Hamming lookup ([`first_match`]),
//! - orchestration with a result cap ([`MarkerDetector`]).
//!
//! [`SharedDetector`] wraps a detector for callers that rebuild or release
//! it while other threads detect.

mod contour;
mod detector;
mod dictionary;
mod error;
mod matcher;
mod morph;
mod params;
mod quad;
mod shared;
mod signature;
mod subpix;
mod threshold;

#[cfg(test)]
mod test_utils;

pub use detector::{MarkerDetection, MarkerDetector, DETECTION_CELL_COUNT, MAX_DETECTIONS};
pub use dictionary::{DictionaryEntry, MarkerDictionary, ROTATIONS};
pub use error::ArucoError;
pub use matcher::{first_match, hamming_distance, signatures_match, Match};
pub use params::{
    AdaptiveThresholdParams, DetectorParams, QuadFinderParams, SamplerParams, SubPixParams,
    ThresholdBorder,
};
pub use quad::{find_quads, order_quad, Quad};
pub use shared::SharedDetector;
pub use signature::{grid_side, sample_signature, BitSignature};
