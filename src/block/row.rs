//! # Individually Encrypted Row Streams
//!
//! Small, variable-count state streams, a handful of partial aggregators
//! checkpointed between passes for instance, do not warrant block
//! framing. Here each record or aggregator is encrypted on its own and
//! the ciphertexts are simply concatenated.
//!
//! The writer can reserve a leading 4-byte task-ID slot which `close()`
//! backfills; a reader constructed with a verification set consumes that
//! slot and records the ID.

use crate::agg::Aggregator;
use crate::error::{EngineError, Result};
use crate::record::{JoinRecord, Record};
use crate::verify::VerifySet;

pub struct IndividualRowWriter<'a> {
    out: &'a mut [u8],
    pos: usize,
    lineage: bool,
    self_task_id: u32,
}

impl<'a> IndividualRowWriter<'a> {
    pub fn new(out: &'a mut [u8]) -> IndividualRowWriter<'a> {
        IndividualRowWriter {
            out,
            pos: 0,
            lineage: false,
            self_task_id: 0,
        }
    }

    /// A writer whose output starts with a 4-byte self task ID, filled in
    /// by `close()`.
    pub fn with_lineage_header(out: &'a mut [u8]) -> Result<IndividualRowWriter<'a>> {
        if out.len() < 4 {
            return Err(EngineError::CapacityExceeded {
                requested: 4,
                capacity: out.len(),
            });
        }
        Ok(IndividualRowWriter {
            out,
            pos: 4,
            lineage: true,
            self_task_id: 0,
        })
    }

    pub fn set_self_task_id(&mut self, task_id: u32) {
        self.self_task_id = task_id;
    }

    pub fn write(&mut self, row: &Record) -> Result<()> {
        self.pos += row.write_encrypted(&mut self.out[self.pos..])?;
        Ok(())
    }

    pub fn write_join(&mut self, row: &JoinRecord) -> Result<()> {
        self.pos += row.write_encrypted(&mut self.out[self.pos..])?;
        Ok(())
    }

    pub fn write_agg(&mut self, agg: &Aggregator) -> Result<()> {
        self.pos += agg.write_encrypted(&mut self.out[self.pos..])?;
        Ok(())
    }

    pub fn close(&mut self) {
        if self.lineage {
            self.out[..4].copy_from_slice(&self.self_task_id.to_le_bytes());
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.pos
    }
}

pub struct IndividualRowReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> IndividualRowReader<'a> {
    pub fn new(buf: &'a [u8]) -> IndividualRowReader<'a> {
        IndividualRowReader { buf, pos: 0 }
    }

    /// A reader over a stream carrying a leading self task ID; the ID is
    /// recorded into `verify`.
    pub fn with_verify(
        buf: &'a [u8],
        verify: &mut VerifySet,
    ) -> Result<IndividualRowReader<'a>> {
        if buf.len() < 4 {
            return Err(EngineError::Format(format!(
                "truncated task-id header: {} bytes",
                buf.len()
            )));
        }
        verify.add_node(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]));
        Ok(IndividualRowReader { buf, pos: 4 })
    }

    pub fn read(&mut self, row: &mut Record) -> Result<()> {
        self.pos += row.read_encrypted(&self.buf[self.pos..])?;
        Ok(())
    }

    pub fn read_join(&mut self, row: &mut JoinRecord) -> Result<()> {
        self.pos += row.read_encrypted(&self.buf[self.pos..])?;
        Ok(())
    }

    pub fn read_agg(&mut self, agg: &mut Aggregator) -> Result<()> {
        self.pos += agg.read_encrypted(&self.buf[self.pos..])?;
        Ok(())
    }

    pub fn bytes_read(&self) -> usize {
        self.pos
    }
}
