use serde::{Deserialize, Serialize};

/// What the local-mean window sees beyond the frame edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdBorder {
    /// Repeat the outermost row/column.
    #[default]
    Replicate,
    /// Assume a constant intensity outside the frame.
    ///
    /// `Constant(255)` models a light quiet zone, so a marker cropped
    /// exactly at its outline still shows a border transition.
    Constant(u8),
}

/// Local mean thresholding used to separate marker borders from background.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveThresholdParams {
    /// Side of the square averaging window; even values grow by one.
    pub block_size: usize,
    /// A pixel is foreground when it is at least this much darker than the local mean.
    pub offset: f32,
    pub border: ThresholdBorder,
}

impl Default for AdaptiveThresholdParams {
    fn default() -> Self {
        Self {
            block_size: 11,
            offset: 5.0,
            border: ThresholdBorder::Replicate,
        }
    }
}

/// Iterative sub-pixel corner refinement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubPixParams {
    /// Half side of the search window; the window is `2 * half_window + 1` pixels.
    pub half_window: usize,
    pub max_iterations: usize,
    /// Stop once a step moves the corner by less than this many pixels.
    pub epsilon: f32,
}

impl Default for SubPixParams {
    fn default() -> Self {
        Self {
            half_window: 5,
            max_iterations: 40,
            epsilon: 0.001,
        }
    }
}

/// Candidate quadrilateral extraction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadFinderParams {
    pub threshold: AdaptiveThresholdParams,
    /// Polygon simplification tolerance relative to the contour perimeter.
    pub poly_epsilon_rel: f32,
    /// Minimum enclosed area in square pixels.
    pub min_area: f32,
    pub subpix: SubPixParams,
}

impl Default for QuadFinderParams {
    fn default() -> Self {
        Self {
            threshold: AdaptiveThresholdParams::default(),
            poly_epsilon_rel: 0.05,
            min_area: 200.0,
            subpix: SubPixParams::default(),
        }
    }
}

/// Bit sampling inside a rectified candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerParams {
    /// Side of the square erosion kernel applied after Otsu binarisation (1 disables it).
    pub erode_kernel: usize,
    /// Cell centres at or above this value read as `1`.
    pub bit_threshold: u8,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            erode_kernel: 3,
            bit_threshold: 128,
        }
    }
}

/// Full detector configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    pub finder: QuadFinderParams,
    pub sampler: SamplerParams,
    /// Physical side of the reference marker used for the world corner table.
    pub world_marker_size: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            finder: QuadFinderParams::default(),
            sampler: SamplerParams::default(),
            world_marker_size: 25.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "finder": { "min_area": 400.0, "threshold": { "border": { "constant": 255 } } } }"#;
        let params: DetectorParams = serde_json::from_str(json).expect("parse params");
        assert_eq!(params.finder.min_area, 400.0);
        assert_eq!(params.finder.threshold.border, ThresholdBorder::Constant(255));
        assert_eq!(params.finder.threshold.block_size, 11);
        assert_eq!(params.finder.subpix.max_iterations, 40);
        assert_eq!(params.sampler.erode_kernel, 3);
        assert_eq!(params.world_marker_size, 25.0);
    }
}
