//! Gesture observer that records every resolution.

use std::sync::{Mutex, MutexGuard, PoisonError};

use savetier_gesture::GestureObserver;

/// One decision delivered to the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<P> {
    /// Short press with its release payload.
    Short(P),
    /// Long press.
    Long,
}

/// Records resolutions in arrival order.
#[derive(Debug)]
pub struct RecordingObserver<P> {
    resolutions: Mutex<Vec<Resolution<P>>>,
}

impl<P> Default for RecordingObserver<P> {
    fn default() -> Self {
        Self {
            resolutions: Mutex::new(Vec::new()),
        }
    }
}

impl<P> RecordingObserver<P> {
    /// Number of short resolutions so far.
    #[must_use]
    pub fn short_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|resolution| matches!(resolution, Resolution::Short(_)))
            .count()
    }

    /// Number of long resolutions so far.
    #[must_use]
    pub fn long_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|resolution| matches!(resolution, Resolution::Long))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Resolution<P>>> {
        self.resolutions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: Clone> RecordingObserver<P> {
    /// Copy of every resolution so far.
    #[must_use]
    pub fn resolutions(&self) -> Vec<Resolution<P>> {
        self.lock().clone()
    }
}

impl<P: Send> GestureObserver<P> for RecordingObserver<P> {
    fn on_short(&self, payload: P) {
        self.lock().push(Resolution::Short(payload));
    }

    fn on_long(&self) {
        self.lock().push(Resolution::Long);
    }
}
