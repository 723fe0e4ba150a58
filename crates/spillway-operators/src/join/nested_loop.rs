//! Block nested loop join.
//!
//! The right input is materialized once into a segment. The left input is
//! then consumed in blocks of up to `frames − 2` pages; every block scans the
//! whole right segment, one page at a time. The remaining two frames hold the
//! current right page and the output page.

use spillway_core::id::SpillId;
use spillway_core::prelude::Schema;
use spillway_core::tuple::{Batch, Tuple};
use spillway_mem::{FrameBudgetImpl, FrameGuardImpl, SegmentName, SegmentReader};

use crate::traits::{ExecContext, OpError, Operator};

use super::{resolve_keys, JoinCondition};

/// Resume point inside (block × current right page).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursor {
    batch: usize,
    left: usize,
    right: usize,
}

pub struct BlockNestedLoopJoin {
    left: Box<dyn Operator>,
    right: Box<dyn Operator>,
    conditions: Vec<JoinCondition>,
    frames: usize,
    ctx: ExecContext,
    schema: Schema,

    capacity: usize,
    left_keys: Vec<usize>,
    right_keys: Vec<usize>,
    spill_id: Option<SpillId>,
    right_segment: Option<SegmentName>,
    budget: Option<FrameBudgetImpl>,
    _scan_frames: Option<FrameGuardImpl>,

    block: Vec<Vec<Tuple>>,
    _block_frames: Option<FrameGuardImpl>,
    reader: Option<SegmentReader>,
    page: Vec<Tuple>,
    cursor: Cursor,
    left_exhausted: bool,
    finished: bool,
}

impl BlockNestedLoopJoin {
    pub fn new(
        left: Box<dyn Operator>,
        right: Box<dyn Operator>,
        conditions: Vec<JoinCondition>,
        frames: usize,
        ctx: ExecContext,
    ) -> Self {
        let schema = left.schema().join(right.schema());
        Self {
            left,
            right,
            conditions,
            frames,
            ctx,
            schema,
            capacity: 0,
            left_keys: Vec::new(),
            right_keys: Vec::new(),
            spill_id: None,
            right_segment: None,
            budget: None,
            _scan_frames: None,
            block: Vec::new(),
            _block_frames: None,
            reader: None,
            page: Vec::new(),
            cursor: Cursor::default(),
            left_exhausted: false,
            finished: false,
        }
    }

    pub fn peak_frames(&self) -> usize {
        self.budget.as_ref().map_or(0, FrameBudgetImpl::peak_frames)
    }

    fn try_open(&mut self) -> Result<(), OpError> {
        if self.frames < 3 {
            return Err(OpError::Config(format!(
                "block nested loop join needs at least 3 buffer frames, got {}",
                self.frames
            )));
        }
        self.capacity = self.ctx.capacity_for(&self.schema)?;
        let (l, r) = resolve_keys(&self.conditions, self.left.schema(), self.right.schema())?;
        self.left_keys = l;
        self.right_keys = r;

        let budget = FrameBudgetImpl::new(self.frames);
        self.budget = Some(budget.clone());
        let spill_id = self.ctx.ids.next_id();
        self.spill_id = Some(spill_id);

        // Materialize the right input, one page at a time.
        let name = SegmentName::new(spill_id, 0, 0);
        {
            let _page = budget.acquire(1, "bnlj_materialize")?;
            let right_capacity = self.ctx.capacity_for(self.right.schema())?;
            self.right.open()?;
            let mut writer = self.ctx.spill.create_segment(name, right_capacity)?;
            self.right_segment = Some(name);
            while let Some(batch) = self.right.next()? {
                writer.write_page(batch.tuples())?;
            }
            let stats = writer.finish()?;
            tracing::debug!(
                segment = %name,
                tuples = stats.tuples,
                pages = stats.frames,
                "right input materialized"
            );
        }
        self.right.close();

        self.left.open()?;
        self._scan_frames = Some(budget.acquire(2, "bnlj_scan")?);
        Ok(())
    }

    /// Pull the next block of left pages. Returns false when the left input is done.
    fn load_block(&mut self) -> Result<bool, OpError> {
        self.block.clear();
        self._block_frames = None;
        if self.left_exhausted {
            return Ok(false);
        }
        let block_pages = self.frames - 2;
        while self.block.len() < block_pages {
            match self.left.next()? {
                Some(batch) => self.block.push(batch.into_tuples()),
                None => {
                    self.left_exhausted = true;
                    break;
                }
            }
        }
        if self.block.is_empty() {
            return Ok(false);
        }
        if let Some(budget) = &self.budget {
            self._block_frames = Some(budget.acquire(self.block.len(), "bnlj_block")?);
        }
        let name = self
            .right_segment
            .ok_or_else(|| OpError::Exec("right input was not materialized".into()))?;
        self.reader = Some(self.ctx.spill.open_segment(&name)?);
        self.page.clear();
        self.cursor = Cursor::default();
        Ok(true)
    }

    /// Next right page for the current block, `false` once the segment is drained.
    fn load_page(&mut self) -> Result<bool, OpError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(false);
        };
        match reader.next_page()? {
            Some(page) => {
                self.page = page;
                self.cursor = Cursor::default();
                Ok(true)
            }
            None => {
                self.reader = None;
                self.page.clear();
                Ok(false)
            }
        }
    }

    /// Emit matches from the cursor on. Returns early, with the cursor past
    /// the last emitted pair, when `out` fills up.
    fn scan_page(&mut self, out: &mut Batch) {
        while self.cursor.batch < self.block.len() {
            let left_page = &self.block[self.cursor.batch];
            while self.cursor.left < left_page.len() {
                let l = &left_page[self.cursor.left];
                while self.cursor.right < self.page.len() {
                    let r = &self.page[self.cursor.right];
                    self.cursor.right += 1;
                    if l.joins_with(r, &self.left_keys, &self.right_keys) {
                        out.push(l.join_with(r));
                        if out.is_full() {
                            return;
                        }
                    }
                }
                self.cursor.right = 0;
                self.cursor.left += 1;
            }
            self.cursor.left = 0;
            self.cursor.batch += 1;
        }
    }

    fn page_done(&self) -> bool {
        self.cursor.batch >= self.block.len()
    }

    fn release(&mut self) {
        self.reader = None;
        self.page.clear();
        self.block.clear();
        self._block_frames = None;
        self._scan_frames = None;
        if let Some(name) = self.right_segment.take() {
            if let Err(e) = self.ctx.spill.delete_segment(&name) {
                tracing::warn!(segment = %name, error = %e, "failed to delete spill segment");
            }
        }
    }
}

impl Operator for BlockNestedLoopJoin {
    fn name(&self) -> &'static str {
        "join_block_nested_loop"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.finished = false;
        self.left_exhausted = false;
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
        if self.right_segment.is_none() {
            return Err(OpError::Exec("block nested loop join: next() before open()".into()));
        }

        let mut out = Batch::new(self.capacity);
        loop {
            if self.reader.is_none() && self.page.is_empty() && !self.load_block()? {
                break;
            }
            if self.page.is_empty() || self.page_done() {
                if !self.load_page()? {
                    // Right segment drained for this block.
                    continue;
                }
            }
            self.scan_page(&mut out);
            if out.is_full() {
                return Ok(Some(out));
            }
            self.page.clear();
        }

        if out.is_empty() {
            self.finished = true;
            self.release();
            self.left.close();
            return Ok(None);
        }
        Ok(Some(out))
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.release();
        self.finished = true;
        tracing::debug!(spill = ?self.spill_id, "block nested loop join closed");
    }
}
