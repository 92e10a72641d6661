//! Block store: the descriptor (`BlockInfo`), per-sample payload (`Block`),
//! and the optional per-sample metadata buffer (`MetaBlock`).
//!
//! A sample's block vector and its lifecycle are tied entirely to the
//! enclosing sample: blocks are allocated when a sample is first
//! materialized and freed together with it. Nothing here stores a pointer
//! back to the owning sample or cache.

use std::rc::Rc;

use crate::status::BlockStatus;
use crate::time::FloatOrUint;

/// Wire-stable data type ordinal, shared between the API and the
/// serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataType {
    Generic = 0,
    Meta = 1,
    Float = 2,
    Float3 = 3,
    Int = 4,
    Int3 = 5,
    Mat3 = 6,
    Mat4 = 7,
    Ref = 8,
    TRef = 9,
}

/// Number of variants of [`DataType`] (`OMNI_NUM_DTYPES`).
pub const NUM_DTYPES: usize = 10;

impl DataType {
    pub fn from_ordinal(ordinal: u8) -> Option<DataType> {
        Some(match ordinal {
            0 => DataType::Generic,
            1 => DataType::Meta,
            2 => DataType::Float,
            3 => DataType::Float3,
            4 => DataType::Int,
            5 => DataType::Int3,
            6 => DataType::Mat3,
            7 => DataType::Mat4,
            8 => DataType::Ref,
            9 => DataType::TRef,
            _ => return None,
        })
    }

    /// Fixed element size for this data type, or `None` for `Generic`
    /// (whose size is host-supplied on the block template). Mirrors
    /// `OMNI_DATA_TYPE_SIZE` in `omni_types.h`.
    pub fn fixed_element_size(&self) -> Option<u32> {
        match self {
            DataType::Generic => None,
            DataType::Meta => Some(0),
            DataType::Float => Some(4),
            DataType::Float3 => Some(12),
            DataType::Int => Some(4),
            DataType::Int3 => Some(12),
            DataType::Mat3 => Some(36),
            DataType::Mat4 => Some(64),
            DataType::Ref => Some(4),
            DataType::TRef => Some(68), // u32 index + Mat4 (4 + 64)
        }
    }
}

bitflags::bitflags! {
    /// Per-descriptor flags. `CONTINUOUS` marks a block as
    /// interpolable between bracketing samples.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlockFlags: u32 {
        const CONTINUOUS = 1 << 0;
    }
}

/// A borrowed view into one block's byte buffer, passed to host callbacks.
/// `data` never outlives the call; callbacks must not retain it and must
/// not reallocate/swap it.
pub struct OmniData<'a> {
    pub data_type: DataType,
    pub element_size: u32,
    pub element_count: u32,
    pub data: &'a mut [u8],
}

/// Passed to the interpolation callback: the target time, the bracketing
/// samples' data, and their times.
pub struct OmniInterpData<'a> {
    pub target: OmniData<'a>,
    pub prev: OmniData<'a>,
    pub next: OmniData<'a>,
    pub ttarget: FloatOrUint,
    pub tprev: FloatOrUint,
    pub tnext: FloatOrUint,
}

pub type CountCallback<U> = Rc<dyn Fn(&U) -> u32>;
pub type ReadCallback<U> = Rc<dyn Fn(&OmniData, &mut U) -> bool>;
pub type WriteCallback<U> = Rc<dyn Fn(&mut OmniData, &U) -> bool>;
pub type InterpCallback = Rc<dyn Fn(&mut OmniInterpData) -> bool>;
pub type MetaGenCallback<U> = Rc<dyn Fn(&U, &mut [u8]) -> bool>;

/// Descriptor of one named block within a cache.
pub struct BlockInfo<U> {
    pub name: String,
    pub data_type: DataType,
    pub element_size: u32,
    pub flags: BlockFlags,
    pub count: CountCallback<U>,
    pub read: ReadCallback<U>,
    pub write: WriteCallback<U>,
    pub interp: Option<InterpCallback>,
}

impl<U> Clone for BlockInfo<U> {
    fn clone(&self) -> Self {
        BlockInfo {
            name: self.name.clone(),
            data_type: self.data_type,
            element_size: self.element_size,
            flags: self.flags,
            count: Rc::clone(&self.count),
            read: Rc::clone(&self.read),
            write: Rc::clone(&self.write),
            interp: self.interp.clone(),
        }
    }
}

/// One sample's payload for one descriptor.
#[derive(Clone)]
pub struct Block {
    pub status: BlockStatus,
    pub element_count: u32,
    pub data: Vec<u8>,
}

impl Block {
    /// A freshly allocated, empty, `INITED`-only block: every block
    /// starts neither VALID nor CURRENT.
    pub fn new_inited() -> Self {
        let mut status = BlockStatus::empty();
        // INITED has no counter side effects; set it directly.
        status |= BlockStatus::INITED;
        Block {
            status,
            element_count: 0,
            data: Vec::new(),
        }
    }
}

/// Per-sample optional metadata buffer, exactly `cache.meta_size` bytes
/// when present.
#[derive(Clone, Default)]
pub struct MetaBlock {
    pub status: BlockStatus,
    pub data: Option<Vec<u8>>,
}

impl MetaBlock {
    pub fn new() -> Self {
        MetaBlock::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_sizes_match_table() {
        assert_eq!(DataType::Float.fixed_element_size(), Some(4));
        assert_eq!(DataType::Float3.fixed_element_size(), Some(12));
        assert_eq!(DataType::Mat3.fixed_element_size(), Some(36));
        assert_eq!(DataType::Mat4.fixed_element_size(), Some(64));
        assert_eq!(DataType::Ref.fixed_element_size(), Some(4));
        assert_eq!(DataType::TRef.fixed_element_size(), Some(68));
        assert_eq!(DataType::Generic.fixed_element_size(), None);
        assert_eq!(DataType::Meta.fixed_element_size(), Some(0));
    }

    #[test]
    fn ordinal_round_trip() {
        for ord in 0..NUM_DTYPES as u8 {
            let dt = DataType::from_ordinal(ord).unwrap();
            assert_eq!(dt as u8, ord);
        }
        assert!(DataType::from_ordinal(NUM_DTYPES as u8).is_none());
    }

    #[test]
    fn new_block_is_inited_only() {
        let block = Block::new_inited();
        assert!(block.status.contains(BlockStatus::INITED));
        assert!(!block.status.contains(BlockStatus::VALID));
        assert!(!block.status.contains(BlockStatus::CURRENT));
    }
}
