//! # Engine Configuration Constants
//!
//! This module centralizes the fixed capacities of the tuple engine,
//! grouping interdependent values together and documenting their
//! relationships. Constants that depend on each other are co-located to
//! prevent mismatch bugs.
//!
//! ## Dependency Graph
//!
//! ```text
//! ATTR_HEADER_SIZE (5 bytes: tag + length)
//!       │
//!       ├─> STRING_UPPER_BOUND (largest variable attribute payload)
//!       │
//!       └─> ROW_UPPER_BOUND
//!             Every row buffer is allocated at this size. A row that
//!             serializes past it is rejected before it reaches a block.
//!
//! ROW_UPPER_BOUND (2048 bytes)
//!       │
//!       ├─> MAX_BLOCK_SIZE (must hold at least one padded row)
//!       │
//!       └─> AGG_UPPER_BOUND (derived: counters + group row + partials)
//!             Aggregator state is serialized into a scratch buffer of
//!             exactly this size, then encrypted whole.
//!
//! CIPHER_IV_SIZE + CIPHER_TAG_SIZE
//!       │
//!       └─> CIPHER_OVERHEAD
//!             ciphertext_len(n) = n + CIPHER_OVERHEAD for every framing
//!             layer; readers validate framing lengths against it.
//! ```
//!
//! ## Critical Invariants
//!
//! Enforced by compile-time assertions below:
//!
//! 1. `MAX_BLOCK_SIZE >= ROW_UPPER_BOUND` (a block holds at least one row)
//! 2. `AGG_UPPER_BOUND` covers counters, a full group row, and two partials
//! 3. `ROW_UPPER_BOUND` covers the row header plus one maximal attribute

// ============================================================================
// ATTRIBUTE LAYOUT
// ============================================================================

/// Size of an attribute header: one type tag byte plus a u32 length.
pub const ATTR_HEADER_SIZE: usize = 5;

/// Width of an integer attribute payload.
pub const INT_UPPER_BOUND: usize = 4;

/// Width of a float attribute payload.
pub const FLOAT_UPPER_BOUND: usize = 4;

/// Maximum payload of a string attribute. Schema-derived row upper bounds
/// charge every string column at this size.
pub const STRING_UPPER_BOUND: usize = 256;

// ============================================================================
// ROW AND BLOCK CAPACITIES
// ============================================================================

/// Size of the leading column-count field of a serialized row.
pub const ROW_COUNT_SIZE: usize = 4;

/// Capacity of every row buffer. The maximum number of bytes a row may
/// occupy in serialized form, independent of its schema.
pub const ROW_UPPER_BOUND: usize = 2048;

/// Capacity of a plaintext block. Rows are packed into blocks and each row
/// is accounted at its schema upper bound, so ciphertext lengths reveal
/// only the row count, never individual row sizes.
pub const MAX_BLOCK_SIZE: usize = 128 * 1024;

/// Size of the block framing header: enc_size, num_rows, row_upper_bound
/// and task_id, each a little-endian u32. The header doubles as the
/// associated data of the block cipher.
pub const BLOCK_HEADER_SIZE: usize = 16;

// ============================================================================
// AGGREGATOR STATE
// ============================================================================

/// Serialized size of one aggregate partial at its largest: an average,
/// which stores a sum attribute followed by a count attribute.
pub const AGG_PARTIAL_UPPER_BOUND: usize =
    (ATTR_HEADER_SIZE + INT_UPPER_BOUND) * 2;

/// Size of the plaintext aggregator image: num_distinct and offset
/// counters, a full group row region, and up to two aggregate partials.
/// The image is always padded to exactly this size before encryption.
pub const AGG_UPPER_BOUND: usize =
    8 + ROW_UPPER_BOUND + 2 * AGG_PARTIAL_UPPER_BOUND;

// ============================================================================
// CIPHER FRAMING
// ============================================================================

/// Size of the AES-GCM initialization vector prefixed to every ciphertext.
pub const CIPHER_IV_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag appended to every ciphertext.
pub const CIPHER_TAG_SIZE: usize = 16;

/// Fixed ciphertext expansion: ciphertext_len(n) = n + CIPHER_OVERHEAD.
pub const CIPHER_OVERHEAD: usize = CIPHER_IV_SIZE + CIPHER_TAG_SIZE;

const _: () = assert!(
    MAX_BLOCK_SIZE >= ROW_UPPER_BOUND,
    "a block must hold at least one row at its upper bound"
);

const _: () = assert!(
    ROW_UPPER_BOUND >= ROW_COUNT_SIZE + ATTR_HEADER_SIZE + STRING_UPPER_BOUND,
    "a row must hold at least one maximal attribute"
);

const _: () = assert!(
    AGG_UPPER_BOUND >= 8 + ROW_UPPER_BOUND + 2 * AGG_PARTIAL_UPPER_BOUND,
    "AGG_UPPER_BOUND derivation mismatch"
);
