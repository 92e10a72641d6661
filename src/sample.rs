//! The sample store: the sparse array of root samples, each with its own
//! per-slot singly-linked overflow chain for sub-samples.
//!
//! There is no `parent` pointer on `Sample` pointing back to the owning
//! cache, and no pointer fixup pass after array growth. Functions that
//! need cache-level context (`num_blocks`) take it as a parameter.

use crate::block::{Block, MetaBlock};
use crate::status::{sample_set_status, sample_unset_status, SampleStatus};
use crate::time::{FloatOrUint, TimeType};

/// Minimum sample-array allocation, regardless of how small the requested
/// index is.
pub const MIN_SAMPLES: u32 = 10;

/// Next power-of-two array size that is both `>= index + 1` and
/// `>= MIN_SAMPLES`.
pub fn min_array_size(index: u32) -> u32 {
    let needed = index + 1;
    let mut size: u32 = 1;
    while size < needed {
        size *= 2;
    }
    size.max(MIN_SAMPLES)
}

/// One time point's payload. `next` is the following
/// sub-sample at the same root index, or `None` at the end of the chain.
#[derive(Clone)]
pub struct Sample {
    pub status: SampleStatus,
    pub time_index: u32,
    pub time_offset: FloatOrUint,
    pub num_blocks_invalid: u32,
    pub num_blocks_outdated: u32,
    pub meta: MetaBlock,
    pub blocks: Vec<Block>,
    pub next: Option<Box<Sample>>,
}

impl Sample {
    /// A root slot auto-created to preserve indexing, carrying no payload.
    fn new_skip_root(index: u32, time_type: TimeType) -> Sample {
        let mut status = SampleStatus::empty();
        sample_set_status(&mut status, SampleStatus::SKIP);
        Sample {
            status,
            time_index: index,
            time_offset: time_type.zero(),
            num_blocks_invalid: 0,
            num_blocks_outdated: 0,
            meta: MetaBlock::new(),
            blocks: Vec::new(),
            next: None,
        }
    }

    fn new_detached(index: u32, offset: FloatOrUint) -> Sample {
        Sample {
            status: SampleStatus::empty(),
            time_index: index,
            time_offset: offset,
            num_blocks_invalid: 0,
            num_blocks_outdated: 0,
            meta: MetaBlock::new(),
            blocks: Vec::new(),
            next: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.time_offset.is_zero()
    }

    pub fn is_skip(&self) -> bool {
        self.status.contains(SampleStatus::SKIP)
    }

    pub fn is_valid(&self) -> bool {
        self.status.contains(SampleStatus::VALID) && !self.is_skip()
    }

    pub fn is_current(&self) -> bool {
        self.status.contains(SampleStatus::CURRENT) && !self.is_skip()
    }

    /// Allocates this sample's block vector and meta block: every
    /// block starts `INITED` but neither `VALID` nor `CURRENT`, and the
    /// invalid/outdated counters start at `num_blocks`.
    fn materialize(&mut self, num_blocks: usize, time_type: TimeType) {
        self.blocks = (0..num_blocks).map(|_| Block::new_inited()).collect();
        self.num_blocks_invalid = num_blocks as u32;
        self.num_blocks_outdated = num_blocks as u32;
        sample_set_status(&mut self.status, SampleStatus::INITED);
        sample_unset_status(&mut self.status, SampleStatus::SKIP);
        let _ = time_type; // time_offset already carries the correct tag.
    }

    /// Frees blocks and meta, unsetting VALID on both (mirrors
    /// `blocks_free` in the original: tears down payload without removing
    /// the sample node itself).
    pub fn free_blocks(&mut self) {
        self.blocks.clear();
        self.meta = MetaBlock::new();
        sample_unset_status(&mut self.status, SampleStatus::VALID);
    }
}

/// Identifies a sample's position for re-lookup after a lookup-only query:
/// `offset: None` means the root itself, `Some(o)` means the sub-sample at
/// offset `o` within that root's chain.
#[derive(Debug, Clone, Copy)]
pub struct SampleCoord {
    pub index: u32,
    pub offset: Option<FloatOrUint>,
}

/// Outcome of a non-mutating lookup.
pub enum Located {
    Exact(SampleCoord),
    Missing { next: Option<SampleCoord> },
}

/// The sparse sample array plus its bookkeeping counters, factored out
/// of `Cache` as its own component.
#[derive(Clone)]
pub struct SampleStore {
    pub samples: Vec<Sample>,
    pub num_samples_tot: u32,
    time_type: TimeType,
}

impl SampleStore {
    pub fn new(time_type: TimeType) -> Self {
        SampleStore {
            samples: Vec::new(),
            num_samples_tot: 0,
            time_type,
        }
    }

    pub fn num_samples_array(&self) -> u32 {
        self.samples.len() as u32
    }

    pub fn num_samples_alloc(&self) -> u32 {
        self.samples.capacity() as u32
    }

    /// Drops every sample (roots and chains) and resets all counters, as
    /// `samples_free` does in the original.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.num_samples_tot = 0;
    }

    /// Non-mutating lookup: never grows the array, never reactivates a
    /// SKIP root, never splices a new sub-sample.
    pub fn locate(&self, index: u32, offset: FloatOrUint) -> Located {
        if index >= self.num_samples_array() {
            return Located::Missing { next: None };
        }

        let root = &self.samples[index as usize];

        if offset.is_zero() {
            if !root.is_skip() {
                Located::Exact(SampleCoord { index, offset: None })
            } else {
                Located::Missing {
                    next: Some(SampleCoord { index, offset: None }),
                }
            }
        } else {
            let mut cur = root.next.as_deref();
            while let Some(node) = cur {
                if node.time_offset.approx_eq(&offset) {
                    return Located::Exact(SampleCoord {
                        index,
                        offset: Some(node.time_offset),
                    });
                }
                if node.time_offset.gt(&offset) {
                    return Located::Missing {
                        next: Some(SampleCoord {
                            index,
                            offset: Some(node.time_offset),
                        }),
                    };
                }
                cur = node.next.as_deref();
            }

            let next_index = index + 1;
            if next_index < self.num_samples_array() {
                Located::Missing {
                    next: Some(SampleCoord {
                        index: next_index,
                        offset: None,
                    }),
                }
            } else {
                Located::Missing { next: None }
            }
        }
    }

    pub fn get(&self, coord: SampleCoord) -> Option<&Sample> {
        let root = self.samples.get(coord.index as usize)?;
        match coord.offset {
            None => Some(root),
            Some(offset) => find_chain_node(root, offset),
        }
    }

    pub fn get_mut(&mut self, coord: SampleCoord) -> Option<&mut Sample> {
        let root = self.samples.get_mut(coord.index as usize)?;
        match coord.offset {
            None => Some(root),
            Some(offset) => find_chain_node_mut(root, offset),
        }
    }

    /// Finds or creates the sample at `(index, offset)`, growing the array
    /// and filling SKIP placeholders as needed.
    pub fn find_or_create(&mut self, num_blocks: usize, index: u32, offset: FloatOrUint) -> SampleCoord {
        if index >= self.num_samples_array() {
            let target = min_array_size(index);
            self.samples.reserve_exact(target.saturating_sub(self.num_samples_array()) as usize);
        }

        while self.num_samples_array() <= index {
            let slot = self.num_samples_array();
            self.samples.push(Sample::new_skip_root(slot, self.time_type));
        }

        if offset.is_zero() {
            let root = &mut self.samples[index as usize];
            if root.is_skip() {
                root.materialize(num_blocks, self.time_type);
                self.num_samples_tot += 1;
            }
            SampleCoord { index, offset: None }
        } else {
            let root = &mut self.samples[index as usize];
            let time_type = self.time_type;
            let (_, created) = insert_or_get(&mut root.next, index, offset, num_blocks, time_type);
            if created {
                self.num_samples_tot += 1;
            }
            SampleCoord {
                index,
                offset: Some(offset),
            }
        }
    }

    /// Removes one sample: a root is reset to SKIP, a
    /// sub-sample is unlinked from its chain and dropped.
    pub fn remove(&mut self, coord: SampleCoord) {
        match coord.offset {
            None => {
                if let Some(root) = self.samples.get_mut(coord.index as usize) {
                    if !root.is_skip() {
                        root.free_blocks();
                        sample_set_status(&mut root.status, SampleStatus::SKIP);
                        self.num_samples_tot -= 1;
                    }
                }
            }
            Some(offset) => {
                if let Some(root) = self.samples.get_mut(coord.index as usize) {
                    if unlink_chain_node(root, offset) {
                        self.num_samples_tot -= 1;
                    }
                }
            }
        }
    }

    /// Removes every sample at time-coordinate `>= coord` (the removal
    /// variant of the `_from` family, `sample_clear_from`).
    pub fn clear_from(&mut self, coord: SampleCoord) {
        match coord.offset {
            Some(offset) => {
                if let Some(root) = self.samples.get_mut(coord.index as usize) {
                    let dropped = truncate_chain_from(root, offset);
                    self.num_samples_tot -= dropped;
                }
                self.clear_full_roots_from(coord.index + 1);
            }
            None => {
                self.clear_full_roots_from(coord.index);
            }
        }
    }

    fn clear_full_roots_from(&mut self, start_index: u32) {
        for i in start_index..self.num_samples_array() {
            let root = &mut self.samples[i as usize];
            let dropped_chain = count_chain(&root.next);
            root.next = None;
            let dropped_root = if !root.is_skip() {
                root.free_blocks();
                sample_set_status(&mut root.status, SampleStatus::SKIP);
                1
            } else {
                0
            };
            self.num_samples_tot -= dropped_chain + dropped_root;
        }
    }

    /// Applies `f` to every live sample at time-coordinate `>= coord`,
    /// without removing anything (`sample_mark_outdated_from` /
    /// `sample_mark_invalid_from`).
    pub fn for_each_from(&mut self, coord: SampleCoord, mut f: impl FnMut(&mut Sample)) {
        if let Some(offset) = coord.offset {
            if let Some(root) = self.samples.get_mut(coord.index as usize) {
                let mut cur = root.next.as_deref_mut();
                while let Some(node) = cur {
                    if node.time_offset.ge_approx(&offset) {
                        f(node);
                    }
                    cur = node.next.as_deref_mut();
                }
            }
            for i in (coord.index + 1)..self.num_samples_array() {
                Self::for_each_root_and_chain(&mut self.samples[i as usize], &mut f);
            }
        } else {
            for i in coord.index..self.num_samples_array() {
                Self::for_each_root_and_chain(&mut self.samples[i as usize], &mut f);
            }
        }
    }

    fn for_each_root_and_chain(root: &mut Sample, f: &mut impl FnMut(&mut Sample)) {
        f(root);
        let mut cur = root.next.as_deref_mut();
        while let Some(node) = cur {
            f(node);
            cur = node.next.as_deref_mut();
        }
    }

    /// Applies `keep` to every live sample in the whole store, removing
    /// any for which it returns `false` (used by `consolidate`'s
    /// `FREE_INVALID`/`FREE_OUTDATED` policies).
    pub fn retain(&mut self, mut keep: impl FnMut(&Sample) -> bool) {
        for i in 0..self.num_samples_array() {
            let root = &mut self.samples[i as usize];

            let dropped = retain_chain(&mut root.next, &mut keep);
            self.num_samples_tot -= dropped;

            if !root.is_skip() && !keep(root) {
                root.free_blocks();
                sample_set_status(&mut root.status, SampleStatus::SKIP);
                self.num_samples_tot -= 1;
            }
        }
    }

    /// Applies `f` to every live sample in the whole store (used by
    /// `consolidate`'s `CONSOLIDATE` policy to reconcile with cache-level
    /// status).
    pub fn for_each(&mut self, mut f: impl FnMut(&mut Sample)) {
        for i in 0..self.num_samples_array() {
            Self::for_each_root_and_chain(&mut self.samples[i as usize], &mut f);
        }
    }
}

fn find_chain_node(root: &Sample, offset: FloatOrUint) -> Option<&Sample> {
    let mut cur = root.next.as_deref();
    while let Some(node) = cur {
        if node.time_offset.approx_eq(&offset) {
            return Some(node);
        }
        cur = node.next.as_deref();
    }
    None
}

fn find_chain_node_mut(root: &mut Sample, offset: FloatOrUint) -> Option<&mut Sample> {
    let mut cur = root.next.as_deref_mut();
    while let Some(node) = cur {
        if node.time_offset.approx_eq(&offset) {
            return Some(node);
        }
        cur = node.next.as_deref_mut();
    }
    None
}

/// Finds or splices a new node at `offset` into the chain rooted at
/// `slot`, keeping the chain strictly increasing in `time_offset`.
/// Returns `(_, true)` iff a new node was created.
fn insert_or_get<'a>(
    slot: &'a mut Option<Box<Sample>>,
    index: u32,
    offset: FloatOrUint,
    num_blocks: usize,
    time_type: TimeType,
) -> (&'a mut Sample, bool) {
    let take_this_branch = match slot {
        None => 0,
        Some(node) if node.time_offset.approx_eq(&offset) => 1,
        Some(node) if node.time_offset.gt(&offset) => 2,
        Some(_) => 3,
    };

    match take_this_branch {
        0 => {
            let mut node = Box::new(Sample::new_detached(index, offset));
            node.materialize(num_blocks, time_type);
            *slot = Some(node);
            (slot.as_mut().unwrap(), true)
        }
        1 => (slot.as_mut().unwrap(), false),
        2 => {
            let mut node = Box::new(Sample::new_detached(index, offset));
            node.materialize(num_blocks, time_type);
            let rest = slot.take();
            node.next = rest;
            *slot = Some(node);
            (slot.as_mut().unwrap(), true)
        }
        _ => insert_or_get(&mut slot.as_mut().unwrap().next, index, offset, num_blocks, time_type),
    }
}

/// Unlinks the chain node at `offset` from `root`'s chain, dropping it.
/// Returns `true` iff a node was actually removed.
fn unlink_chain_node(root: &mut Sample, offset: FloatOrUint) -> bool {
    unlink_from_slot(&mut root.next, offset)
}

fn unlink_from_slot(slot: &mut Option<Box<Sample>>, offset: FloatOrUint) -> bool {
    let matches = matches!(slot, Some(node) if node.time_offset.approx_eq(&offset));
    if matches {
        let mut node = slot.take().unwrap();
        *slot = node.next.take();
        true
    } else if slot.is_some() {
        unlink_from_slot(&mut slot.as_mut().unwrap().next, offset)
    } else {
        false
    }
}

/// Drops every chain node from `offset` onward (inclusive), returning how
/// many were dropped. Used by `clear_from` to truncate a chain mid-way.
fn truncate_chain_from(root: &mut Sample, offset: FloatOrUint) -> u32 {
    truncate_slot_from(&mut root.next, offset)
}

fn truncate_slot_from(slot: &mut Option<Box<Sample>>, offset: FloatOrUint) -> u32 {
    match slot {
        Some(node) if node.time_offset.ge_approx(&offset) => {
            let dropped = 1 + count_chain(&node.next);
            *slot = None;
            dropped
        }
        Some(node) => truncate_slot_from(&mut node.next, offset),
        None => 0,
    }
}

fn count_chain(slot: &Option<Box<Sample>>) -> u32 {
    match slot {
        Some(node) => 1 + count_chain(&node.next),
        None => 0,
    }
}

/// Drops every chain node for which `keep` returns `false`, returning how
/// many were dropped.
fn retain_chain(slot: &mut Option<Box<Sample>>, keep: &mut impl FnMut(&Sample) -> bool) -> u32 {
    match slot {
        Some(node) => {
            if keep(node) {
                retain_chain(&mut node.next, keep)
            } else {
                let mut removed = slot.take().unwrap();
                let rest = removed.next.take();
                *slot = rest;
                1 + retain_chain(slot, keep)
            }
        }
        None => 0,
    }
}

impl FloatOrUint {
    /// `self >= other`, used by the `_from` family's inclusive boundary.
    pub fn ge_approx(&self, other: &FloatOrUint) -> bool {
        self.gt(other) || self.approx_eq(other)
    }
}
