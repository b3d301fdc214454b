use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::mode::GpuMode;

/// Holds the current GPU mode behind a mutex.
///
/// [`get`](Self::get) and [`set`](Self::set) are the only accessors. Each
/// takes the lock for exactly one copy or assignment, so every read observes
/// a whole value and the two operations are linearizable.
#[derive(Debug, Default)]
pub struct ModeStore {
    mode: Mutex<GpuMode>,
}

impl ModeStore {
    /// Create a store holding [`GpuMode::Integrated`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current mode out of the critical section.
    pub fn get(&self) -> GpuMode {
        *self.lock()
    }

    /// Replace the current mode.
    pub fn set(&self, new_mode: GpuMode) {
        *self.lock() = new_mode;
    }

    // A panic elsewhere cannot leave a half-written `GpuMode` behind, so a
    // poisoned lock still guards a valid value.
    fn lock(&self) -> MutexGuard<'_, GpuMode> {
        self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
