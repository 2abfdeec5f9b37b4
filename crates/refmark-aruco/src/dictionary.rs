//! Reference dictionary: one signature per quarter turn of the marker.

use crate::error::ArucoError;
use crate::params::SamplerParams;
use crate::signature::{grid_side, sample_signature, BitSignature};
use log::debug;
use nalgebra::{Point2, Point3};
use refmark_core::GrayImageView;
use serde::{Deserialize, Serialize};

/// Number of orientations stored per reference marker.
pub const ROTATIONS: usize = 4;

/// One orientation of the reference marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub signature: BitSignature,
    /// Object-space corners matching the image corners of a detection in
    /// canonical order (top-left first).
    pub world_corners: [Point3<f32>; 4],
}

/// Ordered signatures of a reference marker; the entry index is the number
/// of clockwise quarter turns applied to the reference.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerDictionary {
    entries: Vec<DictionaryEntry>,
}

impl MarkerDictionary {
    /// Build the four-rotation dictionary of a reference marker image.
    ///
    /// The whole image is the marker: its outer corners are sampled into a
    /// `cell_count` signature, then the image is turned 90° clockwise and
    /// sampled again, four times in total. `world_marker_size` is the side
    /// of the object-space square whose corners are attached to each entry.
    pub fn from_reference(
        marker: &GrayImageView<'_>,
        cell_count: usize,
        params: &SamplerParams,
        world_marker_size: f32,
    ) -> Result<Self, ArucoError> {
        grid_side(cell_count)?;
        if marker.is_empty() {
            return Err(ArucoError::EmptyReference);
        }

        let s = world_marker_size;
        let mut world = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(s, 0.0, 0.0),
            Point3::new(s, s, 0.0),
            Point3::new(0.0, s, 0.0),
        ];

        let mut img = marker.to_image();
        let mut entries = Vec::with_capacity(ROTATIONS);
        for k in 0..ROTATIONS {
            let quad = full_frame(img.width, img.height);
            let signature = sample_signature(&img.view(), &quad, cell_count, params)?
                .ok_or(ArucoError::EmptyReference)?;
            debug!("reference rotation {k}: {signature}");
            entries.push(DictionaryEntry {
                signature,
                world_corners: world,
            });
            img = img.rotate_cw();
            world.rotate_right(1);
        }
        Ok(Self { entries })
    }

    /// Assemble a dictionary from precomputed entries.
    ///
    /// All signatures must share one perfect-square length.
    pub fn from_entries(entries: Vec<DictionaryEntry>) -> Result<Self, ArucoError> {
        if let Some(first) = entries.first() {
            let len = first.signature.len();
            grid_side(len)?;
            if let Some(bad) = entries.iter().find(|e| e.signature.len() != len) {
                return Err(ArucoError::SignatureLengthMismatch {
                    left: len,
                    right: bad.signature.len(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Signature length shared by every entry (0 when empty).
    pub fn cell_count(&self) -> usize {
        self.entries.first().map_or(0, |e| e.signature.len())
    }

    #[inline]
    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&DictionaryEntry> {
        self.entries.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outer pixel-edge rectangle of a `w × h` image, pixel centres at integers.
fn full_frame(w: usize, h: usize) -> [Point2<f32>; 4] {
    let (r, b) = (w as f32 - 0.5, h as f32 - 0.5);
    [
        Point2::new(-0.5, -0.5),
        Point2::new(r, -0.5),
        Point2::new(r, b),
        Point2::new(-0.5, b),
    ]
}
