//! Per-query counters.
//!
//! Kept as plain data; the engine reports them through `tracing` and leaves
//! exporting to the binary layer.

use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub batches: u64,
    pub tuples: u64,
    pub elapsed: Duration,
}

impl QueryStats {
    pub(crate) fn record_batch(&mut self, tuples: usize) {
        self.batches += 1;
        self.tuples += tuples as u64;
    }

    pub(crate) fn emit(&self, op: &'static str) {
        tracing::info!(
            op,
            batches = self.batches,
            tuples = self.tuples,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "query finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate() {
        let mut stats = QueryStats::default();
        stats.record_batch(3);
        stats.record_batch(1);
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.tuples, 4);
    }
}
