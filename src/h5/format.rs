//! HDF5 format constants and fixed structure sizes.

/// Signature at the start of every HDF5 superblock.
///
/// Non-ASCII first byte and CR/LF/SUB bytes catch text-mode transfers.
pub const SIGNATURE: &[u8; 8] = b"\x89HDF\r\n\x1a\n";

/// Address value meaning "not allocated".
pub(crate) const UNDEF_ADDR: u64 = u64::MAX;

/// Size in bytes of offsets and lengths in files this engine writes.
pub(crate) const SIZE_OF_OFFSETS: u8 = 8;
pub(crate) const SIZE_OF_LENGTHS: u8 = 8;

/// Size of a version 0 superblock with 8-byte offsets and lengths.
pub(crate) const SUPERBLOCK_V0_SIZE: usize = 96;

/// Local heap free-list offset meaning "no free blocks".
pub(crate) const HEAP_FREE_NULL: u64 = 1;

/// Group leaf node K: a symbol table node holds `2 * K` entries.
pub(crate) const GROUP_LEAF_K: usize = 4;

/// Group internal node K of the group B-tree.
pub(crate) const GROUP_INTERNAL_K: usize = 16;

/// Indexed storage K of chunk B-trees (library default, implied by v0).
pub(crate) const CHUNK_K: usize = 32;

/// Entries per symbol table node.
pub(crate) const SNOD_CAPACITY: usize = 2 * GROUP_LEAF_K;

/// Size of a symbol table entry with 8-byte offsets and lengths.
pub(crate) const SYMBOL_ENTRY_SIZE: usize = 40;

/// Size of a version 1 object header prefix, padding included.
pub(crate) const OBJECT_HEADER_V1_PREFIX: usize = 16;

pub(crate) const SIG_TREE: &[u8; 4] = b"TREE";
pub(crate) const SIG_SNOD: &[u8; 4] = b"SNOD";
pub(crate) const SIG_HEAP: &[u8; 4] = b"HEAP";
pub(crate) const SIG_GCOL: &[u8; 4] = b"GCOL";
pub(crate) const SIG_OHDR: &[u8; 4] = b"OHDR";
pub(crate) const SIG_OCHK: &[u8; 4] = b"OCHK";

/// Object header message types.
pub(crate) mod msg {
    pub const NIL: u16 = 0x00;
    pub const DATASPACE: u16 = 0x01;
    pub const LINK_INFO: u16 = 0x02;
    pub const DATATYPE: u16 = 0x03;
    pub const FILL_VALUE: u16 = 0x05;
    pub const LINK: u16 = 0x06;
    pub const LAYOUT: u16 = 0x08;
    pub const FILTER_PIPELINE: u16 = 0x0B;
    pub const ATTRIBUTE: u16 = 0x0C;
    pub const CONTINUATION: u16 = 0x10;
    pub const SYMBOL_TABLE: u16 = 0x11;
    pub const ATTRIBUTE_INFO: u16 = 0x15;

    /// Message flag: value never changes once written.
    pub const FLAG_CONSTANT: u8 = 0x01;
    /// Message flag: body lives in the shared message heap.
    pub const FLAG_SHARED: u8 = 0x02;
}

/// Datatype classes.
pub(crate) const CLASS_FIXED: u8 = 0;
pub(crate) const CLASS_FLOAT: u8 = 1;
pub(crate) const CLASS_STRING: u8 = 3;
pub(crate) const CLASS_VLEN: u8 = 9;

/// Data layout classes.
pub(crate) const LAYOUT_COMPACT: u8 = 0;
pub(crate) const LAYOUT_CONTIGUOUS: u8 = 1;
pub(crate) const LAYOUT_CHUNKED: u8 = 2;

/// Chunk index types of version 4 layouts.
pub(crate) const CHUNK_INDEX_SINGLE: u8 = 1;
pub(crate) const CHUNK_INDEX_IMPLICIT: u8 = 2;

/// Version 1 B-tree node types.
pub(crate) const BTREE_GROUP: u8 = 0;
pub(crate) const BTREE_CHUNK: u8 = 1;

/// Space allocation times of the fill value message.
pub(crate) const ALLOC_LATE: u8 = 2;
pub(crate) const ALLOC_INCREMENTAL: u8 = 3;

/// Fill value write time "if set by the user".
pub(crate) const FILL_TIME_IFSET: u8 = 2;

/// Maximum group nesting accepted by the reader.
pub(crate) const MAX_DEPTH: usize = 64;

/// Maximum continuation blocks followed for one object header.
pub(crate) const MAX_CONTINUATIONS: usize = 4096;

/// Round up to the 8-byte alignment used by version 1 structures.
#[inline]
pub(crate) const fn pad8(n: usize) -> usize {
    (n + 7) & !7
}

/// Size of a version 1 B-tree node holding up to `2 * k` children.
///
/// Nodes are always allocated at full size; readers load them whole.
pub(crate) const fn btree_node_size(k: usize, key_size: usize) -> usize {
    let header = 4 + 1 + 1 + 2 + 2 * SIZE_OF_OFFSETS as usize;
    header + (2 * k + 1) * key_size + 2 * k * SIZE_OF_OFFSETS as usize
}

/// Size of a chunk B-tree key for a dataset of the given rank.
///
/// Keys carry one offset more than the rank, for the element byte.
pub(crate) const fn chunk_key_size(rank: usize) -> usize {
    4 + 4 + (rank + 1) * 8
}

/// Size of a symbol table node.
pub(crate) const fn snod_size() -> usize {
    8 + SNOD_CAPACITY * SYMBOL_ENTRY_SIZE
}
