//! # Streaming Block Reader and Writer
//!
//! The streaming path carries the same block framing as the bulk path
//! but enciphers row bytes as they are written instead of staging a
//! whole plaintext block. `finish_block` learns the ciphertext length
//! from the cipher, emits the header and ciphertext, and resets the
//! cipher for the next block.
//!
//! Each block's task ID comes from the operator opcode and partition
//! index, so downstream readers can attest which partition of which
//! operator produced their input.

use crate::block::BlockHeader;
use crate::config::{BLOCK_HEADER_SIZE, CIPHER_OVERHEAD, MAX_BLOCK_SIZE, ROW_UPPER_BOUND};
use crate::crypto::{self, StreamCipher, StreamDecipher};
use crate::error::{EngineError, Result};
use crate::opcode::OpCode;
use crate::record::{JoinRecord, Record};
use crate::verify::VerifySet;
use zerocopy::AsBytes;

/// Writes stream-encrypted blocks into a caller-owned output buffer.
pub struct StreamRowWriter<'a> {
    out: &'a mut [u8],
    pos: usize,
    cipher: StreamCipher,
    block_rows: u32,
    opcode: OpCode,
    part: u32,
}

impl<'a> StreamRowWriter<'a> {
    pub fn new(out: &'a mut [u8], opcode: OpCode) -> StreamRowWriter<'a> {
        StreamRowWriter {
            out,
            pos: 0,
            cipher: StreamCipher::new(),
            block_rows: 0,
            opcode,
            part: 0,
        }
    }

    pub fn set_opcode(&mut self, opcode: OpCode) {
        self.opcode = opcode;
    }

    /// Partition index folded into every block's task ID.
    pub fn set_part_index(&mut self, part: u32) {
        self.part = part;
    }

    pub fn write(&mut self, row: &Record) -> Result<usize> {
        self.maybe_finish_block()?;
        let written = row.write_stream(self)?;
        self.block_rows += 1;
        Ok(written)
    }

    pub fn write_join(&mut self, row: &JoinRecord) -> Result<usize> {
        self.maybe_finish_block()?;
        let written = row.write_stream(self)?;
        self.block_rows += 1;
        Ok(written)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.cipher.encrypt(bytes)
    }

    fn maybe_finish_block(&mut self) -> Result<()> {
        if self.cipher.plaintext_len() + ROW_UPPER_BOUND > MAX_BLOCK_SIZE {
            self.finish_block()?;
        }
        Ok(())
    }

    /// Seals the accumulated rows, backfills the header with the
    /// ciphertext length, and resets the cipher for the next block.
    pub fn finish_block(&mut self) -> Result<()> {
        let enc_size = crypto::ciphertext_len(self.cipher.plaintext_len());
        let needed = BLOCK_HEADER_SIZE + enc_size;
        if self.out.len() - self.pos < needed {
            return Err(EngineError::CapacityExceeded {
                requested: self.pos + needed,
                capacity: self.out.len(),
            });
        }
        let header = BlockHeader::new(
            enc_size as u32,
            self.block_rows,
            ROW_UPPER_BOUND as u32,
            self.opcode.task_id(self.part),
        );
        let ciphertext = self.cipher.finish_with_aad(header.as_bytes())?;
        self.out[self.pos..self.pos + BLOCK_HEADER_SIZE].copy_from_slice(header.as_bytes());
        self.out[self.pos + BLOCK_HEADER_SIZE..self.pos + needed].copy_from_slice(ciphertext);
        self.pos += needed;

        self.cipher.reset();
        self.block_rows = 0;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        self.finish_block()
    }

    pub fn bytes_written(&self) -> usize {
        self.pos
    }
}

/// Serves rows from a buffer of stream-encrypted blocks.
#[derive(Debug)]
pub struct StreamRowReader<'a> {
    buf: &'a [u8],
    pos: usize,
    verify: Option<&'a mut VerifySet>,
    cipher: StreamDecipher,
    block_rows: u32,
    rows_read: u32,
}

impl<'a> StreamRowReader<'a> {
    pub fn new(buf: &'a [u8]) -> Result<StreamRowReader<'a>> {
        StreamRowReader::build(buf, None)
    }

    /// A reader that records every block's task ID into `verify`.
    pub fn with_verify(
        buf: &'a [u8],
        verify: &'a mut VerifySet,
    ) -> Result<StreamRowReader<'a>> {
        StreamRowReader::build(buf, Some(verify))
    }

    fn build(buf: &'a [u8], verify: Option<&'a mut VerifySet>) -> Result<StreamRowReader<'a>> {
        let mut reader = StreamRowReader {
            buf,
            pos: 0,
            verify,
            cipher: StreamDecipher::new(),
            block_rows: 0,
            rows_read: 0,
        };
        reader.advance_block()?;
        Ok(reader)
    }

    fn advance_block(&mut self) -> Result<()> {
        loop {
            if self.pos >= self.buf.len() {
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
            self.cipher.reset(
                &self.buf[self.pos + BLOCK_HEADER_SIZE..end],
                header.as_bytes(),
            )?;
            if let Some(verify) = self.verify.as_mut() {
                verify.add_node(header.task_id());
            }
            self.pos = end;

            if header.num_rows() > 0 {
                self.block_rows = header.num_rows();
                self.rows_read = 0;
                return Ok(());
            }
        }
    }

    fn check_rows_remain(&self) -> Result<()> {
        if self.rows_read >= self.block_rows {
            return Err(EngineError::Format(
                "read past the last row of the buffer".into(),
            ));
        }
        Ok(())
    }

    fn row_done(&mut self) -> Result<()> {
        self.rows_read += 1;
        if self.rows_read >= self.block_rows {
            self.advance_block()?;
        }
        Ok(())
    }

    pub fn read(&mut self, row: &mut Record) -> Result<()> {
        self.check_rows_remain()?;
        row.read_stream(self)?;
        self.row_done()
    }

    pub fn read_join(&mut self, row: &mut JoinRecord) -> Result<()> {
        self.check_rows_remain()?;
        row.read_stream(self)?;
        self.row_done()
    }

    /// Decrypts the next `out.len()` bytes of the current block.
    pub(crate) fn read_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        self.cipher.decrypt(out)
    }

    pub fn has_next(&self) -> bool {
        self.rows_read < self.block_rows
    }
}
