//! The status lattice: the single source of truth for INITED/VALID/CURRENT
//! (plus sample-only SKIP and cache-only COMPLETE) across cache, sample,
//! meta, and block. Every public mutation in [`crate::cache`] and
//! [`crate::sample`] funnels through this module so that counter updates
//! and the monotonicity invariants are never
//! duplicated at a call site.
//!
//! Setting applies the *downward* implication (CURRENT implies VALID
//! implies INITED); unsetting applies the *upward* implication (INITED-loss
//! implies VALID-loss implies CURRENT-loss). This is the opposite direction
//! from a naive "unset only clears what was asked", and is what keeps a
//! `VALID` bit from surviving the loss of `INITED` on the same entity.

use bitflags::bitflags;

bitflags! {
    /// Status bits for one [`crate::block::Block`] or
    /// [`crate::block::MetaBlock`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BlockStatus: u8 {
        const INITED  = 1 << 0;
        const VALID   = 1 << 1;
        const CURRENT = 1 << 2;
    }
}

bitflags! {
    /// Status bits for one [`crate::sample::Sample`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SampleStatus: u8 {
        const INITED  = 1 << 0;
        const VALID   = 1 << 1;
        const CURRENT = 1 << 2;
        const SKIP    = 1 << 3;
    }
}

bitflags! {
    /// Status bits for a [`crate::cache::Cache`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CacheStatus: u8 {
        const INITED   = 1 << 0;
        const VALID    = 1 << 1;
        const CURRENT  = 1 << 2;
        const COMPLETE = 1 << 3;
    }
}

/// Sets `status` on `block`, applying the downward implication and
/// adjusting `sample_num_invalid`/`sample_num_outdated` on the enclosing
/// sample's counters.
pub fn block_set_status(
    block_status: &mut BlockStatus,
    sample_num_invalid: &mut u32,
    sample_num_outdated: &mut u32,
    mut status: BlockStatus,
) {
    if status.contains(BlockStatus::CURRENT) {
        status |= BlockStatus::VALID;
        if !block_status.contains(BlockStatus::CURRENT) {
            *sample_num_outdated -= 1;
        }
    }

    if status.contains(BlockStatus::VALID) {
        status |= BlockStatus::INITED;
        if !block_status.contains(BlockStatus::VALID) {
            *sample_num_invalid -= 1;
        }
    }

    *block_status |= status;
}

/// Unsets `status` on `block`, applying the upward implication and
/// adjusting the enclosing sample's counters.
pub fn block_unset_status(
    block_status: &mut BlockStatus,
    sample_num_invalid: &mut u32,
    sample_num_outdated: &mut u32,
    mut status: BlockStatus,
) {
    if status.contains(BlockStatus::INITED) {
        status |= BlockStatus::VALID;
    }

    if status.contains(BlockStatus::VALID) {
        status |= BlockStatus::CURRENT;
        if block_status.contains(BlockStatus::VALID) {
            *sample_num_invalid += 1;
        }
    }

    if status.contains(BlockStatus::CURRENT) && block_status.contains(BlockStatus::CURRENT) {
        *sample_num_outdated += 1;
    }

    *block_status &= !status;
}

/// Sets `status` on a meta block. Meta has no invalid/outdated counters of
/// its own: it contributes to the sample's status only through the
/// sample-level set/unset calls the caller makes alongside this one.
pub fn meta_set_status(meta_status: &mut BlockStatus, mut status: BlockStatus) {
    if status.contains(BlockStatus::CURRENT) {
        status |= BlockStatus::VALID;
    }
    if status.contains(BlockStatus::VALID) {
        status |= BlockStatus::INITED;
    }
    *meta_status |= status;
}

pub fn meta_unset_status(meta_status: &mut BlockStatus, mut status: BlockStatus) {
    if status.contains(BlockStatus::INITED) {
        status |= BlockStatus::VALID;
    }
    if status.contains(BlockStatus::VALID) {
        status |= BlockStatus::CURRENT;
    }
    *meta_status &= !status;
}

/// Sets `status` on a sample. Setting CURRENT or VALID additionally clears
/// SKIP (a sample that gains real status is no longer a placeholder).
pub fn sample_set_status(sample_status: &mut SampleStatus, mut status: SampleStatus) {
    if status.contains(SampleStatus::CURRENT) {
        status |= SampleStatus::VALID;
    }
    if status.intersects(SampleStatus::VALID | SampleStatus::SKIP) {
        status |= SampleStatus::INITED;
    }

    *sample_status |= status;

    if status.intersects(SampleStatus::CURRENT | SampleStatus::VALID) {
        *sample_status &= !SampleStatus::SKIP;
    }
}

/// Unsets `status` on a sample, applying the upward implication.
pub fn sample_unset_status(sample_status: &mut SampleStatus, mut status: SampleStatus) {
    if status.contains(SampleStatus::INITED) {
        status |= SampleStatus::VALID;
    }
    if status.contains(SampleStatus::VALID) {
        status |= SampleStatus::CURRENT;
    }
    *sample_status &= !status;
}

/// Sets `status` on a cache, applying the downward implication.
pub fn cache_set_status(cache_status: &mut CacheStatus, mut status: CacheStatus) {
    if status.contains(CacheStatus::CURRENT) {
        status |= CacheStatus::VALID;
    }
    if status.contains(CacheStatus::VALID) {
        status |= CacheStatus::INITED;
    }
    *cache_status |= status;
}

/// Unsets `status` on a cache, applying the upward implication.
pub fn cache_unset_status(cache_status: &mut CacheStatus, mut status: CacheStatus) {
    if status.contains(CacheStatus::INITED) {
        status |= CacheStatus::VALID;
    }
    if status.contains(CacheStatus::VALID) {
        status |= CacheStatus::CURRENT;
    }
    *cache_status &= !status;
}
