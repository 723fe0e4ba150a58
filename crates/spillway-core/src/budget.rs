//! Abstract buffer-frame budget interfaces.
//!
//! The concrete implementation lives in `spillway-mem`. We keep only traits here
//! so any crate can depend on the API without pulling the spill logic.
//!
//! The unit of accounting is a *frame*: room for one page of tuples.

/// A guard returned by a frame budget when frames are acquired.
///
/// The concrete type lives in `spillway-mem`. It must be RAII (releases on Drop).
pub trait FrameGuard: Send {
    /// Number of frames currently accounted for by this guard.
    fn frames(&self) -> usize;
    /// Optional debug tag for tracing.
    fn tag(&self) -> &'static str {
        "guard"
    }
}

/// A handle representing a frame-count enforcer.
///
/// Operators call `try_acquire` before materializing pages. If `None` is
/// returned, the operator is about to exceed its allotment.
pub trait FrameBudget: Send + Sync + 'static {
    type Guard: FrameGuard;

    /// Attempt to acquire `frames` from the live budget. Returns a guard on success.
    fn try_acquire(&self, frames: usize, tag: &'static str) -> Option<Self::Guard>;

    /// Total configured capacity (frames).
    fn capacity_frames(&self) -> usize;

    /// Frames currently held by live guards.
    fn used_frames(&self) -> usize;
}

// NOTE: Do *not* add default impls here that would silently "allow" acquisitions.
// The mem crate is the only place where guards should be constructed.
