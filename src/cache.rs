//! The cache façade: the public surface a host actually calls.
//!
//! Every mutation here funnels status changes through [`crate::status`] and
//! every sample lookup through [`crate::sample::SampleStore`] — this module
//! owns no lattice or store logic of its own, only the orchestration spec'd
//! for `new`/`duplicate`/`sample_write`/`sample_read`/`consolidate`/etc.

use std::rc::Rc;

use bitflags::bitflags;

use crate::block::{BlockInfo, DataType, MetaGenCallback, OmniData};
use crate::sample::{Located, SampleCoord, SampleStore};
use crate::status::{
    block_set_status, block_unset_status, cache_set_status, cache_unset_status, meta_set_status, meta_unset_status,
    sample_unset_status, BlockStatus, CacheStatus, SampleStatus,
};
use crate::template::CacheTemplate;
use crate::time::{gen_sample_time, FloatOrUint, TimeType};

#[cfg(feature = "stats")]
use crate::stats::CacheStats;

bitflags! {
    /// Cache-level behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CacheFlags: u32 {
        const FRAMED = 1 << 0;
        const INTERPOLATE = 1 << 1;
    }
}

bitflags! {
    /// Combinable policies for [`Cache::consolidate`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ConsolidationFlags: u32 {
        const FREE_INVALID = 1 << 0;
        const FREE_OUTDATED = 1 << 1;
        const CONSOLIDATE = 1 << 2;
    }
}

bitflags! {
    /// Outcome of [`Cache::sample_read`]. `OUTDATED` is an orthogonal
    /// overlay bit that may accompany `EXACT` or `INTERP`; the empty set is
    /// the `INVALID` outcome.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReadResult: u8 {
        const EXACT = 1 << 0;
        const INTERP = 1 << 1;
        const OUTDATED = 1 << 2;
    }
}

/// Outcome of [`Cache::sample_write`]. Not a bitflag set: these three
/// outcomes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Invalid,
    Failed,
    Success,
}

/// The root entity. Parameterized over `U`, the host's opaque
/// user-data type threaded through every callback.
pub struct Cache<U> {
    pub(crate) id: String,
    pub(crate) time_type: TimeType,
    pub(crate) time_initial: FloatOrUint,
    pub(crate) time_final: FloatOrUint,
    pub(crate) time_step: FloatOrUint,
    pub(crate) flags: CacheFlags,
    pub(crate) status: CacheStatus,
    pub(crate) meta_size: u32,
    pub(crate) meta_gen: Option<MetaGenCallback<U>>,
    pub(crate) blocks: Vec<BlockInfo<U>>,
    pub(crate) store: SampleStore,
    #[cfg(feature = "stats")]
    pub(crate) stats: CacheStats,
}

impl<U> Cache<U> {
    /// Constructs a cache from a template. Panics (via
    /// `assert!`) on malformed templates: non-positive step, mismatched
    /// time-type tags, or an inverted range — these are programmer errors,
    /// not runtime conditions.
    pub fn new(template: CacheTemplate<U>) -> Cache<U> {
        assert_eq!(template.time_initial.is_float(), template.time_type.is_float());
        assert_eq!(template.time_final.is_float(), template.time_type.is_float());
        assert_eq!(template.time_step.is_float(), template.time_type.is_float());
        assert!(template.time_step.gt(&template.time_type.zero()), "time_step must be positive");
        assert!(template.time_initial.le(&template.time_final), "time_initial must be <= time_final");

        let blocks = template
            .blocks
            .iter()
            .map(|b| BlockInfo {
                name: b.name.clone(),
                data_type: b.data_type,
                element_size: b.resolved_element_size(),
                flags: b.flags,
                count: Rc::clone(&b.count),
                read: Rc::clone(&b.read),
                write: Rc::clone(&b.write),
                interp: b.interp.clone(),
            })
            .collect();

        let mut status = CacheStatus::empty();
        cache_set_status(&mut status, CacheStatus::CURRENT);

        Cache {
            id: template.id,
            time_type: template.time_type,
            time_initial: template.time_initial,
            time_final: template.time_final,
            time_step: template.time_step,
            flags: template.flags,
            status,
            meta_size: template.meta_size,
            meta_gen: template.meta_gen,
            blocks,
            store: SampleStore::new(template.time_type),
            #[cfg(feature = "stats")]
            stats: CacheStats::default(),
        }
    }

    /// Deep-copies descriptors always; deep-copies the sample array and
    /// every block/overflow node only if `copy_data`.
    /// An empty duplicate is flagged `CURRENT` but not `COMPLETE`.
    pub fn duplicate(&self, copy_data: bool) -> Cache<U> {
        let (store, status) = if copy_data {
            (self.store.clone(), self.status)
        } else {
            let mut status = CacheStatus::empty();
            cache_set_status(&mut status, CacheStatus::CURRENT);
            (SampleStore::new(self.time_type), status)
        };

        Cache {
            id: self.id.clone(),
            time_type: self.time_type,
            time_initial: self.time_initial,
            time_final: self.time_final,
            time_step: self.time_step,
            flags: self.flags,
            status,
            meta_size: self.meta_size,
            meta_gen: self.meta_gen.clone(),
            blocks: self.blocks.clone(),
            store,
            #[cfg(feature = "stats")]
            stats: CacheStats::default(),
        }
    }

    /// Appends a block descriptor. Existing samples have block vectors
    /// sized for the old descriptor count, so every sample is dropped
    /// first rather than migrated in place.
    pub fn block_add(&mut self, block: crate::template::BlockTemplate<U>) {
        self.store.clear();
        self.blocks.push(BlockInfo {
            name: block.name,
            data_type: block.data_type,
            element_size: block.resolved_element_size(),
            flags: block.flags,
            count: block.count,
            read: block.read,
            write: block.write,
            interp: block.interp,
        });
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> CacheStatus {
        self.status
    }

    pub fn flags(&self) -> CacheFlags {
        self.flags
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn num_samples_array(&self) -> u32 {
        self.store.num_samples_array()
    }

    pub fn num_samples_tot(&self) -> u32 {
        self.store.num_samples_tot
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn sample_time(&self, time: FloatOrUint) -> Option<crate::time::SampleTime> {
        gen_sample_time(self.time_type, self.time_initial, self.time_final, self.time_step, time)
    }

    /// Writes one sample at `time`: creates the
    /// sample if needed, runs every descriptor's `count`/`write`
    /// callbacks, runs `meta_gen` if configured, and marks the sample
    /// `CURRENT` on full success.
    pub fn sample_write(&mut self, time: FloatOrUint, user_data: &U) -> WriteResult {
        let stime = match self.sample_time(time) {
            Some(s) => s,
            None => {
                #[cfg(feature = "stats")]
                self.stats.record_write_failure();
                return WriteResult::Invalid;
            }
        };

        let num_blocks = self.blocks.len();
        let coord = self.store.find_or_create(num_blocks, stime.index, stime.offset);

        let mut failed = false;
        {
            let sample = self
                .store
                .get_mut(coord)
                .expect("find_or_create always produces a resolvable sample");

            for (i, descriptor) in self.blocks.iter().enumerate() {
                let count = (descriptor.count)(user_data);
                let block = &mut sample.blocks[i];

                if block.element_count != count {
                    block.element_count = count;
                    block.data.clear();
                }
                let needed_len = descriptor.element_size as usize * count as usize;
                if block.data.len() != needed_len {
                    block.data.resize(needed_len, 0);
                }

                let ptr_before = block.data.as_ptr();
                let mut view = OmniData {
                    data_type: descriptor.data_type,
                    element_size: descriptor.element_size,
                    element_count: count,
                    data: &mut block.data,
                };
                let ok = (descriptor.write)(&mut view, user_data);
                assert_eq!(
                    view.data.as_ptr(),
                    ptr_before,
                    "write callback must not reallocate OmniData.data"
                );

                if ok {
                    block_set_status(
                        &mut block.status,
                        &mut sample.num_blocks_invalid,
                        &mut sample.num_blocks_outdated,
                        BlockStatus::CURRENT,
                    );
                } else {
                    block_unset_status(
                        &mut block.status,
                        &mut sample.num_blocks_invalid,
                        &mut sample.num_blocks_outdated,
                        BlockStatus::VALID,
                    );
                    sample_unset_status(&mut sample.status, SampleStatus::VALID);
                    failed = true;
                    break;
                }
            }

            if !failed {
                if let Some(meta_gen) = self.meta_gen.clone() {
                    if sample.meta.data.is_none() {
                        sample.meta.data = Some(vec![0u8; self.meta_size as usize]);
                    }
                    let buf = sample.meta.data.as_mut().unwrap();
                    if meta_gen(user_data, buf) {
                        meta_set_status(&mut sample.meta.status, BlockStatus::CURRENT);
                    } else {
                        meta_unset_status(&mut sample.meta.status, BlockStatus::VALID);
                        sample_unset_status(&mut sample.status, SampleStatus::VALID);
                        failed = true;
                    }
                }
            }

            if !failed {
                crate::status::sample_set_status(&mut sample.status, SampleStatus::CURRENT);
            }
        }

        #[cfg(feature = "stats")]
        if failed {
            self.stats.record_write_failure();
        } else {
            self.stats.record_write_success();
        }

        if failed {
            WriteResult::Failed
        } else {
            WriteResult::Success
        }
    }

    /// Reads one sample at `time`. Never creates a
    /// sample; a miss at any level (cache, sample, or block) yields
    /// `ReadResult::empty()`.
    pub fn sample_read(&mut self, time: FloatOrUint, user_data: &mut U) -> ReadResult {
        if !self.status.contains(CacheStatus::VALID) {
            #[cfg(feature = "stats")]
            self.stats.record_read_miss();
            return ReadResult::empty();
        }
        let cache_outdated = !self.status.contains(CacheStatus::CURRENT);

        let mut miss = true;
        let mut result = ReadResult::empty();

        if let Some(stime) = self.sample_time(time) {
            if let Located::Exact(coord) = self.store.locate(stime.index, stime.offset) {
                let num_blocks = self.blocks.len();
                if let Some(sample) = self.store.get_mut(coord) {
                    if sample.is_valid() {
                        let mut any_outdated = cache_outdated || !sample.is_current();
                        let mut all_valid = true;

                        for i in 0..num_blocks {
                            let descriptor = &self.blocks[i];
                            let block = &mut sample.blocks[i];
                            if !block.status.contains(BlockStatus::VALID) {
                                all_valid = false;
                                break;
                            }
                            let view = OmniData {
                                data_type: descriptor.data_type,
                                element_size: descriptor.element_size,
                                element_count: block.element_count,
                                data: &mut block.data,
                            };
                            if !(descriptor.read)(&view, user_data) {
                                all_valid = false;
                                break;
                            }
                            if !block.status.contains(BlockStatus::CURRENT) {
                                any_outdated = true;
                            }
                        }

                        if all_valid {
                            miss = false;
                            result = ReadResult::EXACT;
                            if any_outdated {
                                result |= ReadResult::OUTDATED;
                            }
                        }
                    }
                }
            }
        }

        #[cfg(feature = "stats")]
        if miss {
            self.stats.record_read_miss();
        } else {
            self.stats.record_read_hit();
        }

        if miss {
            ReadResult::empty()
        } else {
            result
        }
    }

    /// Changes the cache's time range. On any actual
    /// change, every sample is dropped (clipping the existing sparse
    /// array to a new grid is not attempted). Returns whether anything
    /// changed.
    pub fn set_range(&mut self, initial: FloatOrUint, final_: FloatOrUint, step: FloatOrUint) -> bool {
        assert_eq!(initial.is_float(), self.time_type.is_float());
        assert_eq!(final_.is_float(), self.time_type.is_float());
        assert_eq!(step.is_float(), self.time_type.is_float());
        assert!(step.gt(&self.time_type.zero()), "time_step must be positive");
        assert!(initial.le(&final_), "time_initial must be <= time_final");

        let changed = !initial.approx_eq(&self.time_initial)
            || !final_.approx_eq(&self.time_final)
            || !step.approx_eq(&self.time_step);

        if changed {
            self.time_initial = initial;
            self.time_final = final_;
            self.time_step = step;
            self.store.clear();
        }

        changed
    }

    pub fn get_range(&self) -> (FloatOrUint, FloatOrUint, FloatOrUint) {
        (self.time_initial, self.time_final, self.time_step)
    }

    /// Clears `CURRENT` on the cache itself. Propagation to samples is
    /// deferred until `consolidate(CONSOLIDATE)`.
    pub fn mark_outdated(&mut self) {
        cache_unset_status(&mut self.status, CacheStatus::CURRENT);
    }

    /// Clears `VALID` (and, by upward implication, `CURRENT`) on the cache
    /// itself.
    pub fn mark_invalid(&mut self) {
        cache_unset_status(&mut self.status, CacheStatus::VALID);
    }

    fn locate_exact(&self, time: FloatOrUint) -> Option<SampleCoord> {
        let stime = self.sample_time(time)?;
        match self.store.locate(stime.index, stime.offset) {
            Located::Exact(coord) => Some(coord),
            Located::Missing { .. } => None,
        }
    }

    /// The sample at `time`, or the next sample at a time `>= time` if
    /// none exists exactly there (used by the `_from` family).
    fn locate_from(&self, time: FloatOrUint) -> Option<SampleCoord> {
        let stime = self.sample_time(time)?;
        match self.store.locate(stime.index, stime.offset) {
            Located::Exact(coord) => Some(coord),
            Located::Missing { next } => next,
        }
    }

    /// Clears `CURRENT` on one sample. A no-op, returning `false`, if no
    /// sample exists exactly at `time`.
    pub fn sample_mark_outdated(&mut self, time: FloatOrUint) -> bool {
        match self.locate_exact(time) {
            Some(coord) => {
                let sample = self.store.get_mut(coord).unwrap();
                sample_unset_status(&mut sample.status, SampleStatus::CURRENT);
                true
            }
            None => false,
        }
    }

    /// Clears `VALID` on one sample. A no-op, returning `false`, if no
    /// sample exists exactly at `time`.
    pub fn sample_mark_invalid(&mut self, time: FloatOrUint) -> bool {
        match self.locate_exact(time) {
            Some(coord) => {
                let sample = self.store.get_mut(coord).unwrap();
                sample_unset_status(&mut sample.status, SampleStatus::VALID);
                true
            }
            None => false,
        }
    }

    /// Removes one sample. A no-op, returning `false`, if no sample
    /// exists exactly at `time`.
    pub fn sample_clear(&mut self, time: FloatOrUint) -> bool {
        match self.locate_exact(time) {
            Some(coord) => {
                self.store.remove(coord);
                true
            }
            None => false,
        }
    }

    /// Clears `CURRENT` on every sample at time `>= time` (part of the
    /// `_from` family).
    pub fn sample_mark_outdated_from(&mut self, time: FloatOrUint) {
        if let Some(coord) = self.locate_from(time) {
            self.store
                .for_each_from(coord, |sample| sample_unset_status(&mut sample.status, SampleStatus::CURRENT));
        }
    }

    /// Clears `VALID` on every sample at time `>= time`.
    pub fn sample_mark_invalid_from(&mut self, time: FloatOrUint) {
        if let Some(coord) = self.locate_from(time) {
            self.store
                .for_each_from(coord, |sample| sample_unset_status(&mut sample.status, SampleStatus::VALID));
        }
    }

    /// Removes every sample at time `>= time`.
    pub fn sample_clear_from(&mut self, time: FloatOrUint) {
        if let Some(coord) = self.locate_from(time) {
            self.store.clear_from(coord);
        }
    }

    /// Runs the consolidation policy. `FREE_INVALID`/`FREE_OUTDATED`
    /// reclaim stale samples; `CONSOLIDATE` reconciles sample-level status
    /// with cache-level status and restores the cache to `CURRENT`. When
    /// the cache is already invalid/outdated and the corresponding FREE
    /// flag is set, every sample is dropped outright rather than visited
    /// one by one.
    pub fn consolidate(&mut self, flags: ConsolidationFlags) {
        let cache_invalid = !self.status.contains(CacheStatus::VALID);
        let cache_outdated = !self.status.contains(CacheStatus::CURRENT);

        let fast_full_free = (cache_invalid
            && flags.intersects(ConsolidationFlags::FREE_INVALID | ConsolidationFlags::FREE_OUTDATED))
            || (cache_outdated && flags.contains(ConsolidationFlags::FREE_OUTDATED));

        if fast_full_free {
            self.store.clear();
        } else if flags.contains(ConsolidationFlags::FREE_OUTDATED) {
            self.store.retain(|s| s.is_valid() && s.is_current());
        } else if flags.contains(ConsolidationFlags::FREE_INVALID) {
            self.store.retain(|s| s.is_valid());
        }

        if flags.contains(ConsolidationFlags::CONSOLIDATE) {
            if cache_invalid {
                self.store.for_each(|s| sample_unset_status(&mut s.status, SampleStatus::VALID));
            }
            if cache_outdated {
                self.store.for_each(|s| sample_unset_status(&mut s.status, SampleStatus::CURRENT));
            }
            cache_set_status(&mut self.status, CacheStatus::CURRENT);
        }

        #[cfg(feature = "stats")]
        self.stats.record_consolidation();
    }

    /// Serializes the cache header and block descriptors.
    pub fn serialize(&self, include_data: bool) -> Vec<u8> {
        crate::serialize::serialize(self, include_data)
    }

    /// Rehydrates a cache from bytes produced by [`Cache::serialize`],
    /// rebinding callbacks from `template`.
    pub fn deserialize(bytes: &[u8], template: Option<&CacheTemplate<U>>) -> Option<Cache<U>> {
        crate::serialize::deserialize(bytes, template)
    }

    /// Debug-only structural consistency check: every root's
    /// `time_offset` is exactly zero, and every overflow chain is
    /// strictly increasing. Stands in for a parent-pointer fixup pass in
    /// a representation that has no pointers to fix up.
    #[cfg(debug_assertions)]
    pub fn debug_validate_structure(&self) {
        for sample in &self.store.samples {
            debug_assert!(sample.time_offset.is_zero(), "root sample with nonzero time_offset");
            let mut prev_offset: Option<FloatOrUint> = None;
            let mut cur = sample.next.as_deref();
            while let Some(node) = cur {
                debug_assert!(!node.time_offset.is_zero(), "sub-sample with zero time_offset");
                if let Some(p) = prev_offset {
                    debug_assert!(node.time_offset.gt(&p), "overflow chain out of order");
                }
                prev_offset = Some(node.time_offset);
                cur = node.next.as_deref();
            }
        }
    }
}
