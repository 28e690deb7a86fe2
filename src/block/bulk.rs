//! # Bulk Block Reader and Writer
//!
//! The bulk path stages plaintext rows into a block buffer and encrypts
//! the block in one shot when it fills or the writer closes. Each row is
//! accounted at `row_upper_bound` bytes regardless of its actual length
//! and the plaintext is padded to `num_rows * row_upper_bound`, so the
//! ciphertext length of a block reveals only its row count.
//!
//! Readers decrypt block by block, verify the header through the
//! cipher's associated data, and feed every block's task ID to the
//! caller's verification set before serving rows in insertion order.

use crate::block::BlockHeader;
use crate::config::{BLOCK_HEADER_SIZE, CIPHER_OVERHEAD, MAX_BLOCK_SIZE};
use crate::crypto;
use crate::error::{EngineError, Result};
use crate::record::{JoinRecord, Record};
use crate::verify::VerifySet;
use zerocopy::AsBytes;

/// Packs rows into encrypted blocks within a caller-owned output buffer.
/// Call `close()` after the last row to flush the final block.
pub struct RowWriter<'a> {
    out: &'a mut [u8],
    pos: usize,
    row_upper_bound: u32,
    self_task_id: u32,
    block: Vec<u8>,
    block_used: usize,
    block_rows: u32,
    block_padded: usize,
}

impl<'a> RowWriter<'a> {
    /// A writer that adopts the first row's schema upper bound.
    pub fn new(out: &'a mut [u8]) -> RowWriter<'a> {
        RowWriter::with_row_upper_bound(out, 0)
    }

    /// A writer with an explicit row upper bound, for streams whose rows
    /// do not all share one schema.
    pub fn with_row_upper_bound(out: &'a mut [u8], row_upper_bound: u32) -> RowWriter<'a> {
        RowWriter {
            out,
            pos: 0,
            row_upper_bound,
            self_task_id: 0,
            block: vec![0u8; MAX_BLOCK_SIZE],
            block_used: 0,
            block_rows: 0,
            block_padded: 0,
        }
    }

    /// Lineage identity stamped into every block header.
    pub fn set_self_task_id(&mut self, task_id: u32) {
        self.self_task_id = task_id;
    }

    pub fn write(&mut self, row: &Record) -> Result<()> {
        if self.row_upper_bound == 0 {
            self.row_upper_bound = row.row_upper_bound();
        }
        let bound = self.row_upper_bound as usize;
        if self.block_padded + bound > MAX_BLOCK_SIZE {
            self.finish_block()?;
        }
        let written = row.write(&mut self.block[self.block_used..])?;
        if written > bound {
            return Err(EngineError::CapacityExceeded {
                requested: written,
                capacity: bound,
            });
        }
        self.block_used += written;
        self.block_rows += 1;
        self.block_padded += bound;
        Ok(())
    }

    pub fn write_join(&mut self, row: &JoinRecord) -> Result<()> {
        self.write(row.as_record())
    }

    /// Encrypts the staged rows as one block: pads the plaintext, writes
    /// the header, and seals with the header as associated data.
    pub fn finish_block(&mut self) -> Result<()> {
        let padded = self.block_padded;
        let enc_size = crypto::ciphertext_len(padded);
        let needed = BLOCK_HEADER_SIZE + enc_size;
        if self.out.len() - self.pos < needed {
            return Err(EngineError::CapacityExceeded {
                requested: self.pos + needed,
                capacity: self.out.len(),
            });
        }
        self.block[self.block_used..padded].fill(0);

        let header = BlockHeader::new(
            enc_size as u32,
            self.block_rows,
            self.row_upper_bound,
            self.self_task_id,
        );
        self.out[self.pos..self.pos + BLOCK_HEADER_SIZE].copy_from_slice(header.as_bytes());
        crypto::encrypt_with_aad(
            &self.block[..padded],
            &mut self.out[self.pos + BLOCK_HEADER_SIZE..self.pos + needed],
            header.as_bytes(),
        )?;
        self.pos += needed;

        self.block_used = 0;
        self.block_rows = 0;
        self.block_padded = 0;
        Ok(())
    }

    /// Flushes the final block, even when partially full.
    pub fn close(&mut self) -> Result<()> {
        self.finish_block()
    }

    pub fn bytes_written(&self) -> usize {
        self.pos
    }
}

/// Serves rows from a buffer of encrypted blocks.
#[derive(Debug)]
pub struct RowReader<'a> {
    buf: &'a [u8],
    pos: usize,
    verify: Option<&'a mut VerifySet>,
    block: Vec<u8>,
    block_len: usize,
    block_pos: usize,
    block_rows: u32,
    rows_read: u32,
}

impl<'a> RowReader<'a> {
    pub fn new(buf: &'a [u8]) -> Result<RowReader<'a>> {
        RowReader::build(buf, None)
    }

    /// A reader that records every block's task ID into `verify`.
    pub fn with_verify(buf: &'a [u8], verify: &'a mut VerifySet) -> Result<RowReader<'a>> {
        RowReader::build(buf, Some(verify))
    }

    fn build(buf: &'a [u8], verify: Option<&'a mut VerifySet>) -> Result<RowReader<'a>> {
        let mut reader = RowReader {
            buf,
            pos: 0,
            verify,
            block: vec![0u8; MAX_BLOCK_SIZE],
            block_len: 0,
            block_pos: 0,
            block_rows: 0,
            rows_read: 0,
        };
        reader.advance_block()?;
        Ok(reader)
    }

    /// Decrypts blocks until one with rows is found or the buffer ends.
    /// Empty blocks are still authenticated and their lineage recorded.
    fn advance_block(&mut self) -> Result<()> {
        loop {
            if self.pos >= self.buf.len() {
                self.block_len = 0;
                self.block_pos = 0;
                self.block_rows = 0;
                self.rows_read = 0;
                return Ok(());
            }
            let header = BlockHeader::parse(&self.buf[self.pos..])?;
            let enc_size = header.enc_size() as usize;
            if enc_size < CIPHER_OVERHEAD || enc_size - CIPHER_OVERHEAD > MAX_BLOCK_SIZE {
                return Err(EngineError::Format(format!(
                    "block enc_size {enc_size} outside valid range"
                )));
            }
            let end = self.pos + BLOCK_HEADER_SIZE + enc_size;
            if end > self.buf.len() {
                return Err(EngineError::Format(format!(
                    "truncated block: want {} bytes, have {}",
                    end - self.pos,
                    self.buf.len() - self.pos
                )));
            }
            let plain_len = enc_size - CIPHER_OVERHEAD;
            crypto::decrypt_with_aad(
                &self.buf[self.pos + BLOCK_HEADER_SIZE..end],
                &mut self.block[..plain_len],
                header.as_bytes(),
            )?;
            if let Some(verify) = self.verify.as_mut() {
                verify.add_node(header.task_id());
            }
            self.pos = end;

            if header.num_rows() > 0 {
                self.block_len = plain_len;
                self.block_pos = 0;
                self.block_rows = header.num_rows();
                self.rows_read = 0;
                return Ok(());
            }
        }
    }

    fn next_row_bytes(&self) -> Result<&[u8]> {
        if self.rows_read >= self.block_rows {
            return Err(EngineError::Format(
                "read past the last row of the buffer".into(),
            ));
        }
        Ok(&self.block[self.block_pos..self.block_len])
    }

    fn consumed(&mut self, n: usize) -> Result<()> {
        self.block_pos += n;
        self.rows_read += 1;
        if self.rows_read >= self.block_rows {
            self.advance_block()?;
        }
        Ok(())
    }

    pub fn read(&mut self, row: &mut Record) -> Result<()> {
        let n = row.read(self.next_row_bytes()?)?;
        self.consumed(n)
    }

    pub fn read_join(&mut self, row: &mut JoinRecord) -> Result<()> {
        let n = row.read(self.next_row_bytes()?)?;
        self.consumed(n)
    }

    pub fn has_next(&self) -> bool {
        self.rows_read < self.block_rows
    }
}
