//! # Streaming Group-By Aggregation State
//!
//! An `Aggregator` consumes a group-ordered stream of records and keeps
//! the running state for the current group: the group identity, one or
//! two aggregate accumulators, a distinct-group counter, and an opaque
//! caller cursor. Operators checkpoint the state between passes by
//! encrypting it whole at a fixed size, so the ciphertext length never
//! reveals how far an aggregation has progressed.
//!
//! ## Serialized layout
//!
//! ```text
//! plaintext (padded to AGG_UPPER_BOUND, then encrypted whole):
//! [num_distinct: u32][offset: u32][group row: ROW_UPPER_BOUND][partial1][partial2?]
//!
//! container:
//! [enc_size: u32 = ciphertext_len(AGG_UPPER_BOUND)][ciphertext]
//! ```

use crate::agg::func::AggState;
use crate::agg::group::GroupKey;
use crate::config::{AGG_UPPER_BOUND, ROW_UPPER_BOUND};
use crate::crypto;
use crate::error::{EngineError, Result};
use crate::opcode::OpCode;
use crate::record::Record;
use smallvec::SmallVec;

pub struct Aggregator {
    num_distinct: u32,
    offset: u32,
    group: GroupKey,
    states: SmallVec<[AggState; 2]>,
}

impl Aggregator {
    /// Group-by with one aggregate function.
    pub fn single(group_cols: &[u32], agg: AggState) -> Aggregator {
        Aggregator {
            num_distinct: 0,
            offset: 0,
            group: GroupKey::new(group_cols),
            states: SmallVec::from_iter([agg]),
        }
    }

    /// Group-by with two aggregate functions over different columns.
    pub fn pair(group_cols: &[u32], agg1: AggState, agg2: AggState) -> Aggregator {
        Aggregator {
            num_distinct: 0,
            offset: 0,
            group: GroupKey::new(group_cols),
            states: SmallVec::from_iter([agg1, agg2]),
        }
    }

    /// Assembles the aggregator a group-by opcode asks for.
    pub fn for_opcode(op: OpCode) -> Result<Aggregator> {
        let specs = op.agg_specs();
        if specs.is_empty() {
            return Err(EngineError::Format(format!(
                "opcode {} is not a group-by operator",
                op.value()
            )));
        }
        let states = specs
            .iter()
            .map(|&(func, col, ty)| AggState::new(func, col, ty))
            .collect();
        Ok(Aggregator {
            num_distinct: 0,
            offset: 0,
            group: GroupKey::new(op.group_cols()),
            states,
        })
    }

    pub fn num_distinct(&self) -> u32 {
        self.num_distinct
    }

    pub fn set_num_distinct(&mut self, num_distinct: u32) {
        self.num_distinct = num_distinct;
    }

    /// Opaque operator-supplied cursor; serialized but never consulted.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    /// Adds a record to the aggregation state. A record from a new group
    /// first resets the accumulators; a dummy record changes nothing.
    pub fn aggregate(&mut self, record: &Record) -> Result<()> {
        if record.is_dummy() {
            return Ok(());
        }
        if self.group.matches(record)? {
            for state in &mut self.states {
                state.add_record(record)?;
            }
        } else {
            self.num_distinct += 1;
            self.group.bind(record)?;
            for state in &mut self.states {
                state.zero();
                state.add_record(record)?;
            }
        }
        Ok(())
    }

    /// Folds another aggregator's partial state into this one. Callers
    /// must have partitioned by group: combining across groups is an
    /// error.
    pub fn combine(&mut self, other: &Aggregator) -> Result<()> {
        if !self.grouping_attrs_equal(other) {
            return Err(EngineError::GroupingMismatch);
        }
        if self.states.len() != other.states.len() {
            return Err(EngineError::Invariant(format!(
                "combining aggregators with {} and {} aggregate states",
                self.states.len(),
                other.states.len()
            )));
        }
        for (state, theirs) in self.states.iter_mut().zip(&other.states) {
            state.merge(theirs)?;
        }
        Ok(())
    }

    /// True iff both aggregators track the same group.
    pub fn grouping_attrs_equal(&self, other: &Aggregator) -> bool {
        self.group.equals(&other.group)
    }

    /// True iff `record` belongs to the tracked group. Dummy records
    /// belong to no group.
    pub fn grouping_matches(&self, record: &Record) -> Result<bool> {
        if record.is_dummy() {
            return Ok(false);
        }
        self.group.matches(record)
    }

    /// Appends the grouping attributes and each final aggregate value to
    /// `rec`. With `dummy` set the aggregate attributes carry dummy tags,
    /// which oblivious drivers use for sentinel rows.
    pub fn append_result(&self, rec: &mut Record, dummy: bool) -> Result<()> {
        self.group.append_result(rec)?;
        for state in &self.states {
            state.append_result(rec, dummy)?;
        }
        Ok(())
    }

    /// Reads and decrypts a saved aggregation state. Returns the number
    /// of bytes consumed.
    pub fn read_encrypted(&mut self, input: &[u8]) -> Result<usize> {
        let expected = crypto::ciphertext_len(AGG_UPPER_BOUND);
        if input.len() < 4 {
            return Err(EngineError::Format(format!(
                "truncated aggregator length: {} bytes",
                input.len()
            )));
        }
        let enc_size = u32::from_le_bytes([input[0], input[1], input[2], input[3]]) as usize;
        if enc_size != expected {
            return Err(EngineError::Format(format!(
                "aggregator enc_size {enc_size} differs from ciphertext_len(AGG_UPPER_BOUND) = {expected}"
            )));
        }
        if input.len() < 4 + enc_size {
            return Err(EngineError::Format(format!(
                "truncated aggregator: want {} bytes, have {}",
                4 + enc_size,
                input.len()
            )));
        }

        let mut plain = vec![0u8; AGG_UPPER_BOUND];
        crypto::decrypt(&input[4..4 + enc_size], &mut plain)?;

        self.num_distinct = u32::from_le_bytes([plain[0], plain[1], plain[2], plain[3]]);
        self.offset = u32::from_le_bytes([plain[4], plain[5], plain[6], plain[7]]);
        self.group.read(&plain[8..8 + ROW_UPPER_BOUND])?;
        let mut pos = 8 + ROW_UPPER_BOUND;
        for state in &mut self.states {
            pos += state.read_partial(&plain[pos..])?;
        }
        Ok(4 + enc_size)
    }

    /// Encrypts and writes the current aggregation state. Returns the
    /// number of bytes written.
    pub fn write_encrypted(&self, output: &mut [u8]) -> Result<usize> {
        let mut plain = vec![0u8; AGG_UPPER_BOUND];
        plain[..4].copy_from_slice(&self.num_distinct.to_le_bytes());
        plain[4..8].copy_from_slice(&self.offset.to_le_bytes());
        self.group.write_whole_row(&mut plain[8..8 + ROW_UPPER_BOUND])?;
        let mut pos = 8 + ROW_UPPER_BOUND;
        for state in &self.states {
            pos += state.write_partial(&mut plain[pos..])?;
        }

        let enc_size = crypto::ciphertext_len(AGG_UPPER_BOUND);
        let needed = 4 + enc_size;
        if output.len() < needed {
            return Err(EngineError::CapacityExceeded {
                requested: needed,
                capacity: output.len(),
            });
        }
        output[..4].copy_from_slice(&(enc_size as u32).to_le_bytes());
        crypto::encrypt(&plain, &mut output[4..needed])?;
        Ok(needed)
    }

    /// Largest serialized size of an aggregator container.
    pub fn encrypted_size() -> usize {
        4 + crypto::ciphertext_len(AGG_UPPER_BOUND)
    }
}
