/// Magic bytes that should be at the beginning of every OLE file
pub const MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Size of a big block (sector) in bytes
pub const BIG_BLOCK_SIZE: usize = 512;

/// Size of a small block (mini sector) in bytes
pub const SMALL_BLOCK_SIZE: usize = 64;

/// Streams shorter than this many bytes live in the small block region
pub const SMALL_BLOCK_THRESHOLD: usize = 4096;

/// Size of a directory (property storage) entry in bytes
pub const DIRENTRY_SIZE: usize = 128;

/// Number of depot pointers stored inline in the header block
pub const HEADER_DEPOT_POINTERS: usize = 109;

/// Number of depot pointers per extension block (one slot is the chain pointer)
pub const EXTENSION_BLOCK_POINTERS: usize = BIG_BLOCK_SIZE / 4 - 1;

/// Number of depot entries described by one depot block
pub const ENTRIES_PER_DEPOT_BLOCK: u32 = (BIG_BLOCK_SIZE / 4) as u32;

/// Byte size reserved for each of the two summary property set placeholders
pub const SUMMARY_STREAM_SIZE: usize = 4096;

// Block chain sentinels. External readers depend on these exact values;
// they must be written bit-for-bit.
/// Depot or extension block, not part of any chain (-3)
pub const SPECIAL_BLOCK: u32 = 0xFFFFFFFD;
/// End of a block chain (-2)
pub const ENDOFCHAIN: u32 = 0xFFFFFFFE;
/// Unallocated block (-1)
pub const FREEBLOCK: u32 = 0xFFFFFFFF;

// Directory entry IDs
/// Unallocated directory entry reference (-1)
pub const NOSTREAM: u32 = 0xFFFFFFFF;

// Object types in storage
/// Element is a storage object
pub const STGTY_STORAGE: u8 = 1;
/// Element is a stream object
pub const STGTY_STREAM: u8 = 2;
/// Element is a root storage
pub const STGTY_ROOT: u8 = 5;

/// Stream names of the standard workbook container entries, in the fixed
/// order they appear in the property storage directory.
pub const ROOT_ENTRY_NAME: &str = "Root Entry";
pub const WORKBOOK_STREAM_NAME: &str = "Workbook";
pub const SUMMARY_STREAM_NAME: &str = "\u{5}SummaryInformation";
pub const DOC_SUMMARY_STREAM_NAME: &str = "\u{5}DocumentSummaryInformation";
