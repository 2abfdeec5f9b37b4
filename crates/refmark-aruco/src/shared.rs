//! Reinitialisable detector slot shared between threads.

use crate::detector::{MarkerDetection, MarkerDetector};
use crate::error::ArucoError;
use crate::params::DetectorParams;
use log::info;
use refmark_core::GrayImageView;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Caller-owned handle around an optional [`MarkerDetector`].
///
/// Detections take the read lock and may run concurrently. Initialisation
/// and teardown take the write lock, so a dictionary is never replaced
/// while a frame is being matched against it.
#[derive(Debug, Default)]
pub struct SharedDetector {
    slot: RwLock<Option<MarkerDetector>>,
}

impl SharedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary from `marker` and install it, replacing any previous one.
    ///
    /// On error the previous detector (if any) stays in place.
    pub fn initialize(
        &self,
        marker: &GrayImageView<'_>,
        cell_count: usize,
        params: DetectorParams,
    ) -> Result<(), ArucoError> {
        let detector = MarkerDetector::with_params(marker, cell_count, params)?;
        self.install(detector);
        Ok(())
    }

    /// Install a prebuilt detector.
    pub fn install(&self, detector: MarkerDetector) {
        let replaced = self.write().replace(detector).is_some();
        info!("detector installed (replaced previous: {replaced})");
    }

    /// Run [`MarkerDetector::detect`] on the installed detector.
    pub fn detect(
        &self,
        frame: &GrayImageView<'_>,
        allowed_misses: usize,
    ) -> Result<Vec<MarkerDetection>, ArucoError> {
        let guard = self.read();
        let detector = guard.as_ref().ok_or(ArucoError::NotInitialized)?;
        detector.detect(frame, allowed_misses)
    }

    /// Release the installed detector; returns whether one was present.
    pub fn teardown(&self) -> bool {
        let released = self.write().take().is_some();
        if released {
            info!("detector released");
        }
        released
    }

    pub fn is_initialized(&self) -> bool {
        self.read().is_some()
    }

    // the slot is only ever replaced whole, so a poisoned lock is still consistent
    fn read(&self) -> RwLockReadGuard<'_, Option<MarkerDetector>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<MarkerDetector>> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}
