//! Host-facing configuration: the structs a caller fills in to describe a
//! cache before calling [`crate::Cache::new`] or [`crate::Cache::deserialize`].
//!
//! These are the only place host callbacks are named; everything downstream
//! stores the resolved `Rc<dyn Fn>` handles from [`crate::block`].

use crate::block::{BlockFlags, CountCallback, DataType, InterpCallback, MetaGenCallback, ReadCallback, WriteCallback};
use crate::cache::CacheFlags;
use crate::time::{FloatOrUint, TimeType};

/// Maximum length (in bytes, once encoded) of a cache or block identifier.
/// Longer names are truncated on serialization, not rejected by the
/// template constructors.
pub const MAX_NAME: usize = 64;

/// One block descriptor as supplied by the host, before it becomes a
/// resolved [`crate::block::BlockInfo`].
pub struct BlockTemplate<U> {
    pub name: String,
    pub data_type: DataType,
    /// Element size for `DataType::Generic`; ignored (and overridden by the
    /// fixed-size table) for every other data type.
    pub data_size: u32,
    pub flags: BlockFlags,
    pub count: CountCallback<U>,
    pub read: ReadCallback<U>,
    pub write: WriteCallback<U>,
    pub interp: Option<InterpCallback>,
}

impl<U> BlockTemplate<U> {
    /// Resolved element size: the fixed-size table for every type but
    /// `Generic`, where the host-supplied `data_size` is used.
    pub fn resolved_element_size(&self) -> u32 {
        self.data_type.fixed_element_size().unwrap_or(self.data_size)
    }
}

/// The full configuration needed to construct a [`crate::Cache`].
pub struct CacheTemplate<U> {
    pub id: String,
    pub time_type: TimeType,
    pub time_initial: FloatOrUint,
    pub time_final: FloatOrUint,
    pub time_step: FloatOrUint,
    pub flags: CacheFlags,
    pub meta_size: u32,
    pub meta_gen: Option<MetaGenCallback<U>>,
    pub blocks: Vec<BlockTemplate<U>>,
}
