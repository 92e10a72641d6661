//! # OmniCache
//!
//! An embeddable time-indexed sample cache: a library a host application
//! (a simulator, animation engine, or similar) uses to store, retrieve,
//! invalidate, and persist computed state keyed by time.
//!
//! The cache holds a sparse sequence of *samples*, each carrying one
//! [`Block`](block::Block) per configured [`BlockInfo`](block::BlockInfo)
//! descriptor plus an optional [`MetaBlock`](block::MetaBlock). A uniform
//! four-level status lattice (cache -> sample -> block, with meta tracked
//! alongside) keeps every public mutation coherent without exposing the
//! bits directly to callers.
//!
//! ## Module organization
//!
//! - [`time`] - the tagged `FloatOrUint` scalar and sample-coordinate math
//! - [`status`] - the single source of truth for INITED/VALID/CURRENT/SKIP
//! - [`sample`] - the sparse sample array and per-slot overflow chains
//! - [`block`] - block/meta-block descriptors and payload storage
//! - [`template`] - host-facing configuration structs
//! - [`cache`] - the public façade: `new`, `duplicate`, `sample_write`,
//!   `sample_read`, marking, `consolidate`, `serialize`/`deserialize`
//! - [`serialize`] - the bit-exact header/descriptor byte layout
//!
//! ## Example
//!
//! ```
//! use omnicache::block::{BlockFlags, DataType, OmniData};
//! use omnicache::cache::{Cache, CacheFlags};
//! use omnicache::template::{BlockTemplate, CacheTemplate};
//! use omnicache::time::{FloatOrUint, TimeType};
//! use std::rc::Rc;
//!
//! let template = CacheTemplate {
//!     id: "demo".to_string(),
//!     time_type: TimeType::Float,
//!     time_initial: FloatOrUint::from_float(0.0),
//!     time_final: FloatOrUint::from_float(10.0),
//!     time_step: FloatOrUint::from_float(1.0),
//!     flags: CacheFlags::empty(),
//!     meta_size: 0,
//!     meta_gen: None,
//!     blocks: vec![BlockTemplate {
//!         name: "position".to_string(),
//!         data_type: DataType::Float,
//!         data_size: 0,
//!         flags: BlockFlags::empty(),
//!         count: Rc::new(|_: &f32| 1u32),
//!         write: Rc::new(|data: &mut OmniData, v: &f32| {
//!             data.data[0..4].copy_from_slice(&v.to_le_bytes());
//!             true
//!         }),
//!         read: Rc::new(|data: &OmniData, out: &mut f32| {
//!             *out = f32::from_le_bytes(data.data[0..4].try_into().unwrap());
//!             true
//!         }),
//!         interp: None,
//!     }],
//! };
//!
//! let mut cache = Cache::new(template);
//! cache.sample_write(FloatOrUint::from_float(1.0), &1.5f32);
//! let mut out = 0.0f32;
//! let result = cache.sample_read(FloatOrUint::from_float(1.0), &mut out);
//! assert!(result.contains(omnicache::cache::ReadResult::EXACT));
//! assert_eq!(out, 1.5);
//! ```

pub mod block;
pub mod cache;
pub mod sample;
pub mod serialize;
pub mod status;
pub mod template;
pub mod time;

#[cfg(feature = "stats")]
pub mod stats;

pub use block::{BlockInfo, DataType, NUM_DTYPES};
pub use cache::{Cache, CacheFlags, ConsolidationFlags, ReadResult, WriteResult};
pub use sample::{Sample, SampleStore, MIN_SAMPLES};
pub use status::{BlockStatus, CacheStatus, SampleStatus};
pub use template::{BlockTemplate, CacheTemplate, MAX_NAME};
pub use time::{FloatOrUint, TimeType};

#[cfg(feature = "stats")]
pub use stats::CacheStats;
