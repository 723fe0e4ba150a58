#![forbid(unsafe_code)]
//! spillway-core: shared kernel for the spillway engine.
//!
//! This crate contains only *pure* types, small helpers, and interfaces
//! (traits) that other crates implement. There is **no I/O**, **no async**,
//! and **no allocation policy** here.
//!
//! Crates that use this:
//! - spillway-mem: implements the FrameBudget trait and the spill manager.
//! - spillway-io: implements Storage for the local filesystem and memory.
//! - spillway-operators: implements operators over `Tuple`/`Batch`/`Schema`.
//! - spillway-exec: wires config, storage and operators together.

pub mod budget;
pub mod config;
pub mod error;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod tuple;
pub mod types;

pub use error::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
