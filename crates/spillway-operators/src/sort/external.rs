//! External sort operator with run generation and multi-pass k-way merge.
//!
//! Frame usage never exceeds `frames` (B):
//! - run generation holds B frames of input pages;
//! - each merge step holds one frame per input run plus one output frame,
//!   with at most B−1 inputs;
//! - read-out holds two frames (final run page + output page), or B when the
//!   single run never left memory.

use spillway_core::id::SpillId;
use spillway_core::prelude::Schema;
use spillway_core::tuple::{Batch, Tuple};
use spillway_mem::{FrameBudgetImpl, FrameGuardImpl, SegmentName, SpillManager};

use crate::traits::{ExecContext, OpError, Operator};

use super::run::{RunGenerator, Runs, SortedRun};
use super::{KeyComparator, SortConfig};

/// Buffer-constrained external sort over any input operator.
///
/// `frames` must be at least 2. With exactly 2 frames the merge fan-in is 1,
/// so the sort only succeeds when the input fits in one load of 2 pages;
/// larger inputs fail in `open()` with `OpError::Config`. The same holds for
/// `Distinct`, `GroupBy` and `OrderBy`, which sort through this operator.
pub struct ExternalSort {
    input: Box<dyn Operator>,
    config: SortConfig,
    ctx: ExecContext,
    schema: Schema,

    // Set up by open().
    spill_id: Option<SpillId>,
    budget: Option<FrameBudgetImpl>,
    comparator: Option<KeyComparator>,
    capacity: usize,
    output: Option<SortedRun>,
    _readout_frames: Option<FrameGuardImpl>,
    last_emitted: Option<Tuple>,
    finished: bool,

    initial_runs: usize,
    passes: usize,
}

impl ExternalSort {
    pub fn new(input: Box<dyn Operator>, config: SortConfig, ctx: ExecContext) -> Self {
        let schema = input.schema().clone();
        Self {
            input,
            config,
            ctx,
            schema,
            spill_id: None,
            budget: None,
            comparator: None,
            capacity: 0,
            output: None,
            _readout_frames: None,
            last_emitted: None,
            finished: false,
            initial_runs: 0,
            passes: 0,
        }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Number of pass-0 runs produced by the last `open()`.
    pub fn initial_runs(&self) -> usize {
        self.initial_runs
    }

    /// Merge passes performed by the last `open()`.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// High-water mark of frames held at once.
    pub fn peak_frames(&self) -> usize {
        self.budget.as_ref().map_or(0, FrameBudgetImpl::peak_frames)
    }

    /// Spill id taken by the last `open()`.
    pub fn spill_id(&self) -> Option<SpillId> {
        self.spill_id
    }

    fn try_open(&mut self) -> Result<(), OpError> {
        let frames = self.config.frames;
        if frames < 2 {
            return Err(OpError::Config(format!(
                "external sort needs at least 2 buffer frames, got {frames}"
            )));
        }

        self.input.open()?;
        self.capacity = self.ctx.capacity_for(&self.schema)?;
        let comparator =
            KeyComparator::new(&self.schema, &self.config.keys, self.config.direction)?;
        let spill_id = self.ctx.ids.next_id();
        self.spill_id = Some(spill_id);
        let budget = FrameBudgetImpl::new(frames);
        self.budget = Some(budget.clone());

        let runs = RunGenerator::new(&self.ctx.spill, spill_id, &comparator, self.capacity, frames)
            .generate(self.input.as_mut(), &budget)?;
        // The input is fully consumed; release it early.
        self.input.close();
        self.initial_runs = runs.count();

        match runs {
            Runs::Resident(tuples) => {
                self._readout_frames = Some(budget.acquire(frames, "sort_readout")?);
                self.output = Some(SortedRun::in_memory(tuples));
            }
            Runs::Spilled(names) if names.is_empty() => {
                self.finished = true;
            }
            Runs::Spilled(names) => {
                let last = merge_to_one(
                    &self.ctx.spill,
                    spill_id,
                    names,
                    &comparator,
                    self.capacity,
                    frames,
                    &budget,
                    &mut self.passes,
                )?;
                self._readout_frames = Some(budget.acquire(2, "sort_readout")?);
                self.output = Some(SortedRun::from_segment(&self.ctx.spill, last)?);
            }
        }

        tracing::debug!(
            spill = %spill_id,
            initial_runs = self.initial_runs,
            passes = self.passes,
            peak_frames = budget.peak_frames(),
            "external sort opened"
        );
        self.comparator = Some(comparator);
        Ok(())
    }

    /// Drop read-out state and delete every segment this instance created.
    fn release(&mut self) {
        self.output = None;
        self._readout_frames = None;
        self.last_emitted = None;
        if let Some(id) = self.spill_id {
            delete_all(&self.ctx.spill, id);
        }
    }
}

/// Merge `runs` in passes of up to `frames − 1` inputs until one remains.
#[allow(clippy::too_many_arguments)]
fn merge_to_one(
    spill: &SpillManager,
    spill_id: SpillId,
    mut runs: Vec<SegmentName>,
    comparator: &KeyComparator,
    capacity: usize,
    frames: usize,
    budget: &FrameBudgetImpl,
    passes: &mut usize,
) -> Result<SegmentName, OpError> {
    let fan_in = frames - 1;
    if fan_in < 2 && runs.len() > 1 {
        return Err(OpError::Config(format!(
            "{} runs cannot be merged with {frames} buffer frames; at least 3 are needed",
            runs.len()
        )));
    }
    while runs.len() > 1 {
        let pass = *passes as u32 + 1;
        let mut next = Vec::with_capacity(runs.len().div_ceil(fan_in));
        for (i, group) in runs.chunks(fan_in).enumerate() {
            if let [only] = group {
                // A lone trailing run is carried into the next pass untouched.
                next.push(*only);
                continue;
            }
            let out = SegmentName::new(spill_id, pass, i as u32);
            merge_group(spill, group, out, comparator, capacity, budget)?;
            for name in group {
                spill.delete_segment(name)?;
            }
            next.push(out);
        }
        tracing::debug!(
            spill = %spill_id,
            pass,
            inputs = runs.len(),
            outputs = next.len(),
            "merge pass done"
        );
        runs = next;
        *passes += 1;
    }
    runs.pop()
        .ok_or_else(|| OpError::Exec("merge finished without a run".into()))
}

/// k-way merge of `group` into segment `out`: linear tournament over the
/// head of each live input, ties to the lowest input index.
fn merge_group(
    spill: &SpillManager,
    group: &[SegmentName],
    out: SegmentName,
    comparator: &KeyComparator,
    capacity: usize,
    budget: &FrameBudgetImpl,
) -> Result<(), OpError> {
    let _frames = budget.acquire(group.len() + 1, "sort_merge")?;
    let mut inputs = group
        .iter()
        .map(|name| SortedRun::from_segment(spill, *name))
        .collect::<Result<Vec<_>, _>>()?;
    let mut writer = spill.create_segment(out, capacity)?;

    loop {
        for run in inputs.iter_mut() {
            run.prime()?;
        }
        let mut winner: Option<usize> = None;
        for (i, run) in inputs.iter().enumerate() {
            let Some(head) = run.head() else { continue };
            let better = match winner.and_then(|w| inputs[w].head()) {
                None => true,
                Some(best) => comparator.compare(head, best).is_lt(),
            };
            if better {
                winner = Some(i);
            }
        }
        let Some(w) = winner else { break };
        if let Some(t) = inputs[w].poll()? {
            writer.push(t)?;
        }
    }

    let stats = writer.finish()?;
    tracing::trace!(segment = %out, inputs = group.len(), tuples = stats.tuples, "runs merged");
    Ok(())
}

fn delete_all(spill: &SpillManager, id: SpillId) {
    for name in spill.segments_for(id) {
        if let Err(e) = spill.delete_segment(&name) {
            tracing::warn!(segment = %name, error = %e, "failed to delete spill segment");
        }
    }
}

impl Operator for ExternalSort {
    fn name(&self) -> &'static str {
        "sort_external"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.finished = false;
        self.initial_runs = 0;
        self.passes = 0;
        let result = self.try_open();
        if result.is_err() {
            self.close();
        }
        result
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        if self.finished {
            return Ok(None);
        }
        let (Some(run), Some(cmp)) = (self.output.as_mut(), self.comparator.as_ref()) else {
            return Err(OpError::Exec("external sort: next() before open()".into()));
        };

        let mut batch = Batch::new(self.capacity);
        while !batch.is_full() {
            let Some(t) = run.poll()? else { break };
            if self.config.distinct {
                if let Some(prev) = &self.last_emitted {
                    if cmp.same_key(prev, &t) {
                        continue;
                    }
                }
                self.last_emitted = Some(t.clone());
            }
            batch.push(t);
        }

        if batch.is_empty() {
            self.finished = true;
            self.release();
            return Ok(None);
        }
        Ok(Some(batch))
    }

    fn close(&mut self) {
        self.input.close();
        self.release();
        self.comparator = None;
        self.finished = true;
        tracing::debug!(spill = ?self.spill_id, "external sort closed");
    }
}
