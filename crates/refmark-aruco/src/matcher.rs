//! Hamming comparison of sampled signatures against the dictionary.

use crate::dictionary::MarkerDictionary;
use crate::error::ArucoError;
use crate::signature::BitSignature;
use serde::{Deserialize, Serialize};

/// A dictionary hit for an observed signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Dictionary entry index, i.e. clockwise quarter turns of the reference.
    pub index: usize,
    /// Number of differing cells.
    pub hamming: usize,
}

/// Count positions where the two signatures differ.
pub fn hamming_distance(a: &BitSignature, b: &BitSignature) -> Result<usize, ArucoError> {
    if a.len() != b.len() {
        return Err(ArucoError::SignatureLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.bits()
        .iter()
        .zip(b.bits())
        .filter(|(x, y)| x != y)
        .count())
}

/// True when `a` and `b` differ in at most `allowed_misses` cells.
pub fn signatures_match(
    a: &BitSignature,
    b: &BitSignature,
    allowed_misses: usize,
) -> Result<bool, ArucoError> {
    Ok(hamming_distance(a, b)? <= allowed_misses)
}

/// First dictionary entry within `allowed_misses` of `observed`.
///
/// Entries are tried in index order and the first acceptable one wins, even
/// when a later entry would be closer.
pub fn first_match(
    observed: &BitSignature,
    dictionary: &MarkerDictionary,
    allowed_misses: usize,
) -> Result<Option<Match>, ArucoError> {
    for (index, entry) in dictionary.entries().iter().enumerate() {
        let hamming = hamming_distance(observed, &entry.signature)?;
        if hamming <= allowed_misses {
            return Ok(Some(Match { index, hamming }));
        }
    }
    Ok(None)
}
