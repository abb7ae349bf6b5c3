use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Granularity of cancellable waits.
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Shared cancellation signal for one distillation request.
///
/// Clones observe the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Sleep for `duration` in short slices, returning early on cancellation.
    ///
    /// Returns `false` if the wait was interrupted.
    pub fn wait(&self, duration: Duration) -> bool {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.is_cancelled() {
                return false;
            }
            let slice = remaining.min(WAIT_SLICE);
            std::thread::sleep(slice);
            remaining -= slice;
        }
        !self.is_cancelled()
    }
}
