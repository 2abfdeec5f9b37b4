//! End-to-end marker detection against a reference dictionary.

use crate::dictionary::MarkerDictionary;
use crate::error::ArucoError;
use crate::matcher::first_match;
use crate::params::DetectorParams;
use crate::quad::{find_quads, Quad};
use crate::signature::sample_signature;
use log::{debug, trace};
use nalgebra::Point3;
use refmark_core::{GrayImage, GrayImageView, PixelLayout};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Cells sampled from every frame candidate (a 6x6 grid).
pub const DETECTION_CELL_COUNT: usize = 36;

/// Candidates are no longer examined once this many markers were accepted.
pub const MAX_DETECTIONS: usize = 3;

/// One recognised marker in a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    /// Image corners in canonical order (top-left, top-right, bottom-right, bottom-left).
    pub corners: Quad,
    /// Index of the matched dictionary entry.
    pub index: usize,
    /// Differing cells between the sampled and the stored signature.
    pub hamming: usize,
    /// Object-space corners of the matched entry, parallel to `corners`.
    pub world_corners: [Point3<f32>; 4],
}

impl MarkerDetection {
    /// Corners as `[x0, y0, x1, y1, x2, y2, x3, y3]`.
    pub fn flat_corners(&self) -> [f32; 8] {
        let mut out = [0.0; 8];
        for (i, p) in self.corners.iter().enumerate() {
            out[2 * i] = p.x;
            out[2 * i + 1] = p.y;
        }
        out
    }
}

/// Detector bound to the dictionary of a single reference marker.
#[derive(Clone, Debug)]
pub struct MarkerDetector {
    dictionary: MarkerDictionary,
    params: DetectorParams,
}

impl MarkerDetector {
    /// Build the dictionary of `marker` with default parameters.
    pub fn new(marker: &GrayImageView<'_>, cell_count: usize) -> Result<Self, ArucoError> {
        Self::with_params(marker, cell_count, DetectorParams::default())
    }

    pub fn with_params(
        marker: &GrayImageView<'_>,
        cell_count: usize,
        params: DetectorParams,
    ) -> Result<Self, ArucoError> {
        let dictionary = MarkerDictionary::from_reference(
            marker,
            cell_count,
            &params.sampler,
            params.world_marker_size,
        )?;
        Ok(Self { dictionary, params })
    }

    /// Build from an interleaved colour or gray buffer, converted to gray first.
    pub fn from_interleaved(
        width: usize,
        height: usize,
        layout: PixelLayout,
        data: &[u8],
        cell_count: usize,
        params: DetectorParams,
    ) -> Result<Self, ArucoError> {
        let gray = GrayImage::from_interleaved(width, height, layout, data)?;
        Self::with_params(&gray.view(), cell_count, params)
    }

    /// Wrap a prebuilt dictionary.
    ///
    /// An empty dictionary is accepted here; `detect` then refuses to run.
    pub fn from_dictionary(dictionary: MarkerDictionary, params: DetectorParams) -> Self {
        Self { dictionary, params }
    }

    #[inline]
    pub fn dictionary(&self) -> &MarkerDictionary {
        &self.dictionary
    }

    #[inline]
    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Find quad candidates, sample each at [`DETECTION_CELL_COUNT`] cells
    /// and keep those whose signature is within `allowed_misses` of a
    /// dictionary entry.
    ///
    /// Results follow candidate discovery order and stop at
    /// [`MAX_DETECTIONS`]. A dictionary built for a different cell count
    /// fails with [`ArucoError::SignatureLengthMismatch`] as soon as a
    /// candidate is compared.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, frame),
            fields(width = frame.width, height = frame.height)
        )
    )]
    pub fn detect(
        &self,
        frame: &GrayImageView<'_>,
        allowed_misses: usize,
    ) -> Result<Vec<MarkerDetection>, ArucoError> {
        if self.dictionary.is_empty() {
            return Err(ArucoError::NotInitialized);
        }

        let candidates = find_quads(frame, &self.params.finder);
        let mut detections = Vec::new();
        for quad in &candidates {
            if detections.len() >= MAX_DETECTIONS {
                break;
            }
            let Some(signature) =
                sample_signature(frame, quad, DETECTION_CELL_COUNT, &self.params.sampler)?
            else {
                trace!("degenerate candidate {quad:?}");
                continue;
            };
            let Some(hit) = first_match(&signature, &self.dictionary, allowed_misses)? else {
                trace!("no dictionary entry within {allowed_misses} of {signature}");
                continue;
            };
            let entry = &self.dictionary.entries()[hit.index];
            detections.push(MarkerDetection {
                corners: *quad,
                index: hit.index,
                hamming: hit.hamming,
                world_corners: entry.world_corners,
            });
        }

        debug!(
            "{} candidates, {} detections",
            candidates.len(),
            detections.len()
        );
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ThresholdBorder;
    use crate::test_utils::{draw_modules, paste, REFERENCE_PATTERN};
    use nalgebra::Point2;

    fn exact_crop_params() -> DetectorParams {
        let mut params = DetectorParams::default();
        params.finder.threshold.border = ThresholdBorder::Constant(255);
        params
    }

    #[test]
    fn reference_image_detects_itself() {
        let marker = draw_modules(&REFERENCE_PATTERN, 40);
        let detector =
            MarkerDetector::with_params(&marker.view(), 36, exact_crop_params()).expect("detector");
        let found = detector.detect(&marker.view(), 0).expect("detect");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 0);
        assert_eq!(found[0].hamming, 0);

        let extremes = [
            Point2::new(0.0, 0.0),
            Point2::new(239.0, 0.0),
            Point2::new(239.0, 239.0),
            Point2::new(0.0, 239.0),
        ];
        for (got, want) in found[0].corners.iter().zip(extremes) {
            assert!((*got - want).norm() < 2.0, "{got:?} vs {want:?}");
        }
    }

    #[test]
    fn flat_corners_follow_corner_order() {
        let det = MarkerDetection {
            corners: [
                Point2::new(1.0, 2.0),
                Point2::new(3.0, 4.0),
                Point2::new(5.0, 6.0),
                Point2::new(7.0, 8.0),
            ],
            index: 2,
            hamming: 0,
            world_corners: [Point3::origin(); 4],
        };
        assert_eq!(det.flat_corners(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn empty_dictionary_refuses_detection() {
        let detector =
            MarkerDetector::from_dictionary(MarkerDictionary::default(), DetectorParams::default());
        let frame = GrayImage::new_fill(64, 64, 255);
        assert_eq!(
            detector.detect(&frame.view(), 0),
            Err(ArucoError::NotInitialized)
        );
    }

    #[test]
    fn foreign_cell_count_fails_on_first_candidate() {
        let marker = draw_modules(&REFERENCE_PATTERN, 20);
        let detector = MarkerDetector::new(&marker.view(), 16).expect("detector");
        let mut frame = GrayImage::new_fill(200, 200, 255);
        paste(&mut frame, &marker, 40, 40);
        assert_eq!(
            detector.detect(&frame.view(), 0),
            Err(ArucoError::SignatureLengthMismatch {
                left: 36,
                right: 16
            })
        );

        let blank = GrayImage::new_fill(200, 200, 255);
        assert_eq!(detector.detect(&blank.view(), 0), Ok(Vec::new()));
    }

    #[test]
    fn colour_reference_matches_gray_reference() {
        let marker = draw_modules(&REFERENCE_PATTERN, 20);
        let bgra: Vec<u8> = marker
            .data
            .iter()
            .flat_map(|&v| [v, v, v, 255])
            .collect();
        let from_colour = MarkerDetector::from_interleaved(
            marker.width,
            marker.height,
            PixelLayout::Bgra,
            &bgra,
            36,
            DetectorParams::default(),
        )
        .expect("detector");
        let from_gray = MarkerDetector::new(&marker.view(), 36).expect("detector");
        assert_eq!(from_colour.dictionary(), from_gray.dictionary());

        let short = MarkerDetector::from_interleaved(
            10,
            10,
            PixelLayout::Bgra,
            &bgra[..8],
            36,
            DetectorParams::default(),
        );
        assert!(matches!(short, Err(ArucoError::Image(_))));
    }
}
