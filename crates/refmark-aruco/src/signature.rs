//! Bit signatures sampled from rectified quadrilaterals.

use crate::error::ArucoError;
use crate::morph::erode_rect;
use crate::params::SamplerParams;
use crate::quad::Quad;
use crate::threshold::otsu_binarize;
use nalgebra::Point2;
use refmark_core::{homography_from_4pt, warp_perspective_gray, GrayImageView};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row-major grid of sampled cells; `true` is a bright cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitSignature {
    bits: Vec<bool>,
}

impl BitSignature {
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    #[inline]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

impl fmt::Display for BitSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.bits {
            f.write_str(if b { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Side of the sampling grid for `cell_count` cells.
///
/// Fails unless `cell_count` is a positive perfect square.
pub fn grid_side(cell_count: usize) -> Result<usize, ArucoError> {
    let side = (cell_count as f64).sqrt().round() as usize;
    if cell_count == 0 || side * side != cell_count {
        return Err(ArucoError::CellCountNotSquare { cell_count });
    }
    Ok(side)
}

/// Sample a `side × side` signature from the region enclosed by `quad`.
///
/// The quad is warped onto a `cell_count`-pixel square (so each cell is
/// `side` pixels wide), Otsu-binarised, eroded, and each cell centre is
/// read as one bit. `Ok(None)` means the quad does not define a
/// homography (collinear or repeated corners).
pub fn sample_signature(
    image: &GrayImageView<'_>,
    quad: &Quad,
    cell_count: usize,
    params: &SamplerParams,
) -> Result<Option<BitSignature>, ArucoError> {
    let side = grid_side(cell_count)?;

    let s = cell_count as f32;
    let square = [
        Point2::new(0.0, 0.0),
        Point2::new(s, 0.0),
        Point2::new(s, s),
        Point2::new(0.0, s),
    ];
    let Some(h_img_from_patch) = homography_from_4pt(&square, quad) else {
        return Ok(None);
    };

    let warped = warp_perspective_gray(image, &h_img_from_patch, cell_count, cell_count);
    let binary = erode_rect(&otsu_binarize(&warped), params.erode_kernel);

    let centre = side / 2;
    let bits = (0..side)
        .flat_map(|r| (0..side).map(move |c| (r, c)))
        .map(|(r, c)| binary.pixel(c * side + centre, r * side + centre) >= params.bit_threshold)
        .collect();
    Ok(Some(BitSignature { bits }))
}
