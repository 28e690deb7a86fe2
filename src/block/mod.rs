//! # Encrypted Block Framing
//!
//! Rows travel between operators packed into encrypted blocks:
//!
//! ```text
//! Block := [enc_size: u32] [num_rows: u32] [row_upper_bound: u32]
//!          [task_id: u32] [ciphertext: enc_size]
//! ```
//!
//! The 16-byte header is the associated data of the block cipher, so a
//! host that flips a row count or forges a lineage task ID produces a
//! block that fails authentication. Three framing variants share the
//! contract:
//!
//! - [`bulk`]: whole-block encryption with padded row accounting
//! - [`stream`]: streaming encryption, rows enciphered as written
//! - [`row`]: individually encrypted rows for small state streams

mod bulk;
mod row;
mod stream;

pub use bulk::{RowReader, RowWriter};
pub use row::{IndividualRowReader, IndividualRowWriter};
pub use stream::{StreamRowReader, StreamRowWriter};

use crate::config::BLOCK_HEADER_SIZE;
use crate::error::{EngineError, Result};
use zerocopy::little_endian::U32;
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

/// Authenticated framing header preceding every block ciphertext.
#[repr(C)]
#[derive(Clone, Copy, Debug, FromZeroes, FromBytes, AsBytes, Unaligned)]
pub struct BlockHeader {
    enc_size: U32,
    num_rows: U32,
    row_upper_bound: U32,
    task_id: U32,
}

const _: () = assert!(std::mem::size_of::<BlockHeader>() == BLOCK_HEADER_SIZE);

impl BlockHeader {
    pub fn new(enc_size: u32, num_rows: u32, row_upper_bound: u32, task_id: u32) -> BlockHeader {
        BlockHeader {
            enc_size: U32::new(enc_size),
            num_rows: U32::new(num_rows),
            row_upper_bound: U32::new(row_upper_bound),
            task_id: U32::new(task_id),
        }
    }

    pub fn parse(buf: &[u8]) -> Result<BlockHeader> {
        BlockHeader::read_from_prefix(buf).ok_or_else(|| {
            EngineError::Format(format!("truncated block header: {} bytes", buf.len()))
        })
    }

    pub fn enc_size(&self) -> u32 {
        self.enc_size.get()
    }

    pub fn num_rows(&self) -> u32 {
        self.num_rows.get()
    }

    pub fn row_upper_bound(&self) -> u32 {
        self.row_upper_bound.get()
    }

    pub fn task_id(&self) -> u32 {
        self.task_id.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_sixteen_little_endian_bytes() {
        let header = BlockHeader::new(1, 2, 3, 0xAABBCCDD);
        let bytes = header.as_bytes();
        assert_eq!(bytes.len(), BLOCK_HEADER_SIZE);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &0xAABBCCDDu32.to_le_bytes());
    }

    #[test]
    fn parse_roundtrips_and_rejects_short_input() {
        let header = BlockHeader::new(10, 20, 30, 40);
        let parsed = BlockHeader::parse(header.as_bytes()).unwrap();
        assert_eq!(parsed.enc_size(), 10);
        assert_eq!(parsed.task_id(), 40);
        assert!(BlockHeader::parse(&[0u8; 15]).is_err());
    }
}
