//! FrameBudget + RAII guard implementations.
//!
//! Operators acquire a guard before materializing pages. Dropping the guard
//! returns the frames to the budget (panic-safe).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use spillway_core::budget::{FrameBudget, FrameGuard};

use crate::error::{Error, Result};
use crate::tracking::PeakTracker;

/// Shared inner state for the budget.
struct BudgetInner {
    capacity: usize,
    used: AtomicUsize,
    peak: PeakTracker,
}

impl BudgetInner {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: AtomicUsize::new(0),
            peak: PeakTracker::new(),
        }
    }

    fn try_acquire(&self, frames: usize) -> bool {
        loop {
            let cur = self.used.load(Ordering::Relaxed);
            let next = cur.saturating_add(frames);
            if next > self.capacity {
                return false;
            }
            if self
                .used
                .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                self.peak.record_used(next);
                return true;
            }
        }
    }

    fn release(&self, frames: usize) {
        self.used.fetch_sub(frames, Ordering::AcqRel);
    }
}

/// Concrete FrameBudget used by every operator that materializes pages.
#[derive(Clone)]
pub struct FrameBudgetImpl {
    inner: Arc<BudgetInner>,
}

impl FrameBudgetImpl {
    pub fn new(capacity_frames: usize) -> Self {
        Self {
            inner: Arc::new(BudgetInner::new(capacity_frames)),
        }
    }

    /// Highest number of frames held at once since creation.
    pub fn peak_frames(&self) -> usize {
        self.inner.peak.peak()
    }

    /// Like `try_acquire`, but running out of frames is an error.
    pub fn acquire(&self, frames: usize, tag: &'static str) -> Result<FrameGuardImpl> {
        self.try_acquire(frames, tag)
            .ok_or_else(|| Error::BudgetExceeded {
                tag,
                requested: frames,
                capacity: self.capacity_frames(),
                used: self.used_frames(),
            })
    }
}

/// RAII guard that accounts for a number of frames.
/// Dropping it returns frames to the budget.
pub struct FrameGuardImpl {
    inner: Arc<BudgetInner>,
    frames: usize,
    tag: &'static str,
}

impl Drop for FrameGuardImpl {
    fn drop(&mut self) {
        if self.frames > 0 {
            self.inner.release(self.frames);
            self.frames = 0;
        }
    }
}

impl FrameGuard for FrameGuardImpl {
    fn frames(&self) -> usize {
        self.frames
    }
    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl FrameGuardImpl {
    /// Try to resize this guard to a new frame count.
    /// Shrinking always succeeds; growing fails if it would exceed capacity.
    pub fn try_resize(&mut self, new_frames: usize) -> bool {
        if new_frames == self.frames {
            return true;
        }

        if new_frames < self.frames {
            let delta = self.frames - new_frames;
            self.inner.release(delta);
            self.frames = new_frames;
            true
        } else {
            let delta = new_frames - self.frames;
            if self.inner.try_acquire(delta) {
                self.frames = new_frames;
                true
            } else {
                false
            }
        }
    }
}

impl FrameBudget for FrameBudgetImpl {
    type Guard = FrameGuardImpl;

    fn try_acquire(&self, frames: usize, tag: &'static str) -> Option<Self::Guard> {
        if frames == 0 {
            return Some(FrameGuardImpl {
                inner: Arc::clone(&self.inner),
                frames: 0,
                tag,
            });
        }
        if self.inner.try_acquire(frames) {
            Some(FrameGuardImpl {
                inner: Arc::clone(&self.inner),
                frames,
                tag,
            })
        } else {
            None
        }
    }

    fn capacity_frames(&self) -> usize {
        self.inner.capacity
    }

    fn used_frames(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }
}
