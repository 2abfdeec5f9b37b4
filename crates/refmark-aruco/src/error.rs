use refmark_core::ImageError;

/// Errors returned by dictionary construction, matching and detection.
///
/// Shape rejections (wrong vertex count, too small, non-convex) and
/// unmatched candidates are never errors; they simply produce no output.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ArucoError {
    #[error("cell count {cell_count} is not a positive perfect square")]
    CellCountNotSquare { cell_count: usize },

    #[error("signature lengths differ ({left} vs {right} bits)")]
    SignatureLengthMismatch { left: usize, right: usize },

    #[error("reference marker image is empty")]
    EmptyReference,

    #[error("detector is not initialized")]
    NotInitialized,

    #[error(transparent)]
    Image(#[from] ImageError),
}

impl ArucoError {
    /// True for violated call preconditions, as opposed to lifecycle errors.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ArucoError::CellCountNotSquare { .. }
                | ArucoError::SignatureLengthMismatch { .. }
                | ArucoError::EmptyReference
                | ArucoError::Image(_)
        )
    }
}
