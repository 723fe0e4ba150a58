//! Sort-merge join.
//!
//! Both inputs are fed through an ascending `ExternalSort` on their join
//! keys, then merged in one streaming pass. Only the current equal-key group
//! of each side is held in memory.

use std::cmp::Ordering;
use std::collections::VecDeque;

use spillway_core::prelude::Schema;
use spillway_core::tuple::{Batch, Tuple};

use crate::sort::{ExternalSort, SortConfig};
use crate::traits::{ExecContext, OpError, Operator};

use super::{resolve_keys, JoinCondition};

/// Result of comparing two tuples on their join keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMatch {
    pub ordering: Ordering,
    /// Number of leading key pairs that compared equal.
    pub equal_prefix: usize,
}

impl KeyMatch {
    /// Compare pair by pair, stopping at the first mismatch.
    pub fn between(left: &Tuple, right: &Tuple, left_keys: &[usize], right_keys: &[usize]) -> Self {
        let mut equal_prefix = 0;
        for (&l, &r) in left_keys.iter().zip(right_keys) {
            match left.value(l).compare(right.value(r)) {
                Ordering::Equal => equal_prefix += 1,
                ordering => {
                    return Self {
                        ordering,
                        equal_prefix,
                    }
                }
            }
        }
        Self {
            ordering: Ordering::Equal,
            equal_prefix,
        }
    }

    pub fn is_match(&self, keys: usize) -> bool {
        self.ordering == Ordering::Equal && self.equal_prefix == keys
    }
}

/// One side of the merge: a sorted operator with one buffered page.
struct SortedInput {
    sort: ExternalSort,
    page: VecDeque<Tuple>,
    done: bool,
}

impl SortedInput {
    fn new(sort: ExternalSort) -> Self {
        Self {
            sort,
            page: VecDeque::new(),
            done: false,
        }
    }

    fn head(&mut self) -> Result<Option<&Tuple>, OpError> {
        while self.page.is_empty() && !self.done {
            match self.sort.next()? {
                Some(batch) => self.page.extend(batch.into_tuples()),
                None => self.done = true,
            }
        }
        Ok(self.page.front())
    }

    /// Pop every leading tuple whose keys equal `key` (taken from `key_side`'s positions).
    fn take_group(
        &mut self,
        key: &Tuple,
        own_keys: &[usize],
        key_keys: &[usize],
    ) -> Result<Vec<Tuple>, OpError> {
        let mut group = Vec::new();
        loop {
            let matches = match self.head()? {
                Some(t) => t.joins_with(key, own_keys, key_keys),
                None => false,
            };
            if !matches {
                break;
            }
            if let Some(t) = self.page.pop_front() {
                group.push(t);
            }
        }
        Ok(group)
    }

    fn reset(&mut self) {
        self.page.clear();
        self.done = false;
    }
}

pub struct SortMergeJoin {
    left: SortedInput,
    right: SortedInput,
    conditions: Vec<JoinCondition>,
    schema: Schema,
    ctx: ExecContext,

    capacity: usize,
    left_keys: Vec<usize>,
    right_keys: Vec<usize>,
    left_group: Vec<Tuple>,
    right_group: Vec<Tuple>,
    /// Next (left group index, right group index) to emit.
    pending: (usize, usize),
    opened: bool,
    finished: bool,
}

impl SortMergeJoin {
    /// Each side's sort gets `frames` frames; the sorts run one after the other.
    pub fn new(
        left: Box<dyn Operator>,
        right: Box<dyn Operator>,
        conditions: Vec<JoinCondition>,
        frames: usize,
        ctx: ExecContext,
    ) -> Self {
        let schema = left.schema().join(right.schema());
        let left_keys = conditions.iter().map(|c| c.left.clone()).collect();
        let right_keys = conditions.iter().map(|c| c.right.clone()).collect();
        let left_sort =
            ExternalSort::new(left, SortConfig::ascending(left_keys, frames), ctx.clone());
        let right_sort =
            ExternalSort::new(right, SortConfig::ascending(right_keys, frames), ctx.clone());
        Self {
            left: SortedInput::new(left_sort),
            right: SortedInput::new(right_sort),
            conditions,
            schema,
            ctx,
            capacity: 0,
            left_keys: Vec::new(),
            right_keys: Vec::new(),
            left_group: Vec::new(),
            right_group: Vec::new(),
            pending: (0, 0),
            opened: false,
            finished: false,
        }
    }

    pub fn left_sort(&self) -> &ExternalSort {
        &self.left.sort
    }

    pub fn right_sort(&self) -> &ExternalSort {
        &self.right.sort
    }

    fn try_open(&mut self) -> Result<(), OpError> {
        let (l, r) = resolve_keys(
            &self.conditions,
            self.left.sort.schema(),
            self.right.sort.schema(),
        )?;
        self.left_keys = l;
        self.right_keys = r;
        self.capacity = self.ctx.capacity_for(&self.schema)?;
        self.left.sort.open()?;
        self.right.sort.open()?;
        self.opened = true;
        Ok(())
    }

    /// Emit the pending product into `out`; false if `out` filled first.
    fn emit_pending(&mut self, out: &mut Batch) -> bool {
        while self.pending.0 < self.left_group.len() {
            let l = &self.left_group[self.pending.0];
            while self.pending.1 < self.right_group.len() {
                if out.is_full() {
                    return false;
                }
                out.push(l.join_with(&self.right_group[self.pending.1]));
                self.pending.1 += 1;
            }
            self.pending.1 = 0;
            self.pending.0 += 1;
        }
        self.left_group.clear();
        self.right_group.clear();
        self.pending = (0, 0);
        true
    }

    /// Advance both inputs to the next key and load its groups. False once
    /// either side runs out.
    fn next_groups(&mut self) -> Result<bool, OpError> {
        loop {
            let key = {
                let Some(l) = self.left.head()? else { return Ok(false) };
                let l = l.clone();
                let Some(r) = self.right.head()? else { return Ok(false) };
                let m = KeyMatch::between(&l, r, &self.left_keys, &self.right_keys);
                match m.ordering {
                    Ordering::Greater => r.project(&self.right_keys),
                    _ => l.project(&self.left_keys),
                }
            };
            let positions: Vec<usize> = (0..self.left_keys.len()).collect();
            let left_group = self.left.take_group(&key, &self.left_keys, &positions)?;
            let right_group = self.right.take_group(&key, &self.right_keys, &positions)?;
            if !left_group.is_empty() && !right_group.is_empty() {
                self.left_group = left_group;
                self.right_group = right_group;
                self.pending = (0, 0);
                return Ok(true);
            }
        }
    }
}

impl Operator for SortMergeJoin {
    fn name(&self) -> &'static str {
        "join_sort_merge"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.finished = false;
        self.left.reset();
        self.right.reset();
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
        if !self.opened {
            return Err(OpError::Exec("sort-merge join: next() before open()".into()));
        }

        let mut out = Batch::new(self.capacity);
        loop {
            if !self.emit_pending(&mut out) {
                return Ok(Some(out));
            }
            if !self.next_groups()? {
                break;
            }
        }

        if out.is_empty() {
            self.close();
            return Ok(None);
        }
        Ok(Some(out))
    }

    fn close(&mut self) {
        self.left.sort.close();
        self.right.sort.close();
        self.left.reset();
        self.right.reset();
        self.left_group.clear();
        self.right_group.clear();
        self.pending = (0, 0);
        self.opened = false;
        self.finished = true;
    }
}
