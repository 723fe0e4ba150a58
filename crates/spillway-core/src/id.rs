//! Strongly-typed identifiers used across the engine.
//!
//! Downstream crates (exec, operators, mem) should *not* use raw integers for IDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(SpillId);

/// Hands out spill ids to operator instances.
///
/// One generator is created per engine session and passed to operators at
/// construction; every operator instance that spills takes exactly one id at
/// `open()` and embeds it in all of its segment names.
#[derive(Debug, Default)]
pub struct SpillIdGen {
    next: AtomicU64,
}

impl SpillIdGen {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> SpillId {
        SpillId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
