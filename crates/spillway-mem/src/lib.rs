#![forbid(unsafe_code)]
//! spillway-mem: frame budgeting and the spill manager.
//!
//! This crate provides concrete implementations for the *interfaces* defined
//! in `spillway-core::budget`, and everything needed to spill tuples to
//! backing storage: the segment format, the tuple encoding and the streaming
//! segment writer/reader.
//!
//! No object-store IO lives here. A generic `Storage` trait is exposed
//! (in `spill::`) and implemented by `spillway-io`.

pub mod error;
pub mod guard;
pub mod spill;
pub mod tracking;

pub use error::{Error, Result};
pub use guard::{FrameBudgetImpl, FrameGuardImpl};
pub use spill::{Codec, SegmentName, SegmentReader, SegmentWriter, SpillManager, Storage};
