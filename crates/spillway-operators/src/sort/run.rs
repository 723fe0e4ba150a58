//! Sorted runs and run generation for external sort.
//!
//! Run generation fills the whole frame budget with input pages, sorts them
//! in memory, and writes the result as one segment of pass 0.

use std::collections::VecDeque;

use spillway_core::id::SpillId;
use spillway_core::tuple::Tuple;
use spillway_mem::{FrameBudgetImpl, SegmentName, SegmentReader, SpillManager};

use crate::traits::{OpError, Operator};

use super::KeyComparator;

/// A sorted sequence consumed front to back.
///
/// The segment-backed variant keeps at most one decoded page in memory.
pub enum SortedRun {
    Memory(VecDeque<Tuple>),
    Segment {
        name: SegmentName,
        reader: SegmentReader,
        page: VecDeque<Tuple>,
        drained: bool,
    },
}

impl SortedRun {
    pub fn in_memory(tuples: impl Into<VecDeque<Tuple>>) -> Self {
        SortedRun::Memory(tuples.into())
    }

    pub fn from_segment(spill: &SpillManager, name: SegmentName) -> Result<Self, OpError> {
        let reader = spill.open_segment(&name)?;
        Ok(SortedRun::Segment {
            name,
            reader,
            page: VecDeque::new(),
            drained: false,
        })
    }

    /// Segment this run reads, if any.
    pub fn segment(&self) -> Option<SegmentName> {
        match self {
            SortedRun::Memory(_) => None,
            SortedRun::Segment { name, .. } => Some(*name),
        }
    }

    /// Make sure the next tuple, if there is one, is buffered.
    pub fn prime(&mut self) -> Result<(), OpError> {
        if let SortedRun::Segment {
            reader,
            page,
            drained,
            ..
        } = self
        {
            while page.is_empty() && !*drained {
                match reader.next_page()? {
                    Some(tuples) => page.extend(tuples),
                    None => *drained = true,
                }
            }
        }
        Ok(())
    }

    /// Buffered head; call `prime` first.
    pub fn head(&self) -> Option<&Tuple> {
        match self {
            SortedRun::Memory(tuples) => tuples.front(),
            SortedRun::Segment { page, .. } => page.front(),
        }
    }

    pub fn peek(&mut self) -> Result<Option<&Tuple>, OpError> {
        self.prime()?;
        Ok(self.head())
    }

    pub fn poll(&mut self) -> Result<Option<Tuple>, OpError> {
        self.prime()?;
        Ok(match self {
            SortedRun::Memory(tuples) => tuples.pop_front(),
            SortedRun::Segment { page, .. } => page.pop_front(),
        })
    }

    pub fn is_empty(&mut self) -> Result<bool, OpError> {
        Ok(self.peek()?.is_none())
    }
}

/// Output of run generation.
#[derive(Debug)]
pub enum Runs {
    /// The whole input fit in one buffer load and was never written out.
    Resident(Vec<Tuple>),
    /// Pass-0 segments, in generation order. Empty for empty input.
    Spilled(Vec<SegmentName>),
}

impl Runs {
    pub fn count(&self) -> usize {
        match self {
            Runs::Resident(_) => 1,
            Runs::Spilled(names) => names.len(),
        }
    }
}

/// Cuts an input stream into sorted runs of up to `frames` pages each.
pub struct RunGenerator<'a> {
    spill: &'a SpillManager,
    spill_id: SpillId,
    comparator: &'a KeyComparator,
    capacity: usize,
    frames: usize,
}

impl<'a> RunGenerator<'a> {
    pub fn new(
        spill: &'a SpillManager,
        spill_id: SpillId,
        comparator: &'a KeyComparator,
        capacity: usize,
        frames: usize,
    ) -> Self {
        Self {
            spill,
            spill_id,
            comparator,
            capacity,
            frames,
        }
    }

    /// Drain `input` into pass-0 runs. Zero input pages produce zero runs.
    pub fn generate(
        &self,
        input: &mut dyn Operator,
        budget: &FrameBudgetImpl,
    ) -> Result<Runs, OpError> {
        let _frames = budget.acquire(self.frames, "sort_run_generation")?;
        let mut runs = Vec::new();
        let mut exhausted = false;

        while !exhausted {
            let mut tuples: Vec<Tuple> = Vec::with_capacity(self.frames * self.capacity);
            let mut pages = 0;
            while pages < self.frames {
                match input.next()? {
                    Some(batch) => {
                        tuples.extend(batch.into_tuples());
                        pages += 1;
                    }
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }
            if pages == 0 {
                break;
            }

            tuples.sort_by(|a, b| self.comparator.compare(a, b));

            if exhausted && runs.is_empty() {
                tracing::debug!(pages, tuples = tuples.len(), "input fits in memory, no spill");
                return Ok(Runs::Resident(tuples));
            }

            let name = SegmentName::new(self.spill_id, 0, runs.len() as u32);
            let mut writer = self.spill.create_segment(name, self.capacity)?;
            for t in tuples {
                writer.push(t)?;
            }
            let stats = writer.finish()?;
            tracing::debug!(segment = %name, pages, tuples = stats.tuples, "sorted run written");
            runs.push(name);
        }

        Ok(Runs::Spilled(runs))
    }
}
