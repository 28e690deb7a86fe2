//! # Table-Tagged Join Records
//!
//! Sort-merge join interleaves rows from two tables in one stream. A
//! `JoinRecord` wraps a row whose first attribute is a 4-byte integer
//! table tag (`0` = primary, `1` = foreign); the original attributes
//! follow, shifted by one. The wrapper binds the join attribute named by
//! the operator's opcode as a byte offset into its own buffer, so copies
//! rebind cheaply and nothing dangles.
//!
//! A join record with zero wrapped columns is a dummy: sort-merge join
//! emits such rows as padding and every comparison sorts them last.

use crate::block::{StreamRowReader, StreamRowWriter};
use crate::error::{EngineError, Result};
use crate::opcode::OpCode;
use crate::record::Record;
use crate::types::attr::{attr_key_prefix, attr_less_than, attrs_equal};
use crate::types::AttrType;

pub const PRIMARY_ID: u32 = 0;
pub const FOREIGN_ID: u32 = 1;

pub struct JoinRecord {
    row: Record,
    join_attr: Option<std::ops::Range<usize>>,
}

impl JoinRecord {
    pub fn new() -> JoinRecord {
        JoinRecord {
            row: Record::new(),
            join_attr: None,
        }
    }

    /// Builds the tagged row from a plain record.
    pub fn set(&mut self, is_primary: bool, record: &Record) -> Result<()> {
        let table_id = if is_primary { PRIMARY_ID } else { FOREIGN_ID };
        self.row.clear();
        self.row.add_attr(AttrType::Int, &table_id.to_le_bytes())?;
        self.row.append(record)?;
        self.join_attr = None;
        Ok(())
    }

    /// Copies another join record, carrying its join-attribute binding.
    pub fn set_from(&mut self, other: &JoinRecord) -> Result<()> {
        self.row.set(&other.row)?;
        self.join_attr = other.join_attr.clone();
        Ok(())
    }

    pub fn read(&mut self, input: &[u8]) -> Result<usize> {
        self.join_attr = None;
        self.row.read(input)
    }

    pub fn write(&self, output: &mut [u8]) -> Result<usize> {
        self.row.write(output)
    }

    pub fn read_encrypted(&mut self, input: &[u8]) -> Result<usize> {
        self.join_attr = None;
        self.row.read_encrypted(input)
    }

    pub fn write_encrypted(&self, output: &mut [u8]) -> Result<usize> {
        self.row.write_encrypted(output)
    }

    pub fn read_stream(&mut self, reader: &mut StreamRowReader<'_>) -> Result<usize> {
        self.join_attr = None;
        self.row.read_stream(reader)
    }

    pub fn write_stream(&self, writer: &mut StreamRowWriter<'_>) -> Result<usize> {
        self.row.write_stream(writer)
    }

    fn table_tag(&self) -> Option<u32> {
        let value = self.row.get_attr_value(1).ok()?;
        if value.len() != 4 {
            return None;
        }
        Some(u32::from_le_bytes([value[0], value[1], value[2], value[3]]))
    }

    pub fn is_primary(&self) -> bool {
        self.table_tag() == Some(PRIMARY_ID)
    }

    /// Wrapped column count, excluding the table tag.
    pub fn num_cols(&self) -> u32 {
        self.row.num_cols().saturating_sub(1)
    }

    pub fn is_dummy(&self) -> bool {
        self.row.num_cols() == 0
    }

    /// Zeroes the record so sort-merge join treats it as padding.
    pub fn reset_to_dummy(&mut self) {
        self.row.clear();
        self.join_attr = None;
    }

    pub fn mark_dummy(&mut self) {
        self.row.mark_dummy();
    }

    /// Binds the join attribute selected by the opcode. Opcodes that are
    /// not single-column equijoins leave the binding empty, as do dummy
    /// rows.
    pub fn init_join_attribute(&mut self, op: OpCode) -> Result<()> {
        let idx = op.join_attr_idx(self.is_primary());
        if idx == 0 || self.is_dummy() {
            self.join_attr = None;
            return Ok(());
        }
        self.join_attr = Some(self.row.attr_range(idx + 1)?);
        Ok(())
    }

    pub fn join_attr(&self) -> Option<&[u8]> {
        self.join_attr
            .as_ref()
            .map(|range| &self.row.bytes()[range.clone()])
    }

    /// True iff both records have bound join attributes and they match.
    pub fn join_attr_equals(&self, other: &JoinRecord) -> bool {
        match (self.join_attr(), other.join_attr()) {
            (Some(a), Some(b)) => attrs_equal(a, b),
            _ => false,
        }
    }

    /// The 1-indexed wrapped attribute, skipping the table tag.
    pub fn get_attr(&self, attr_idx: u32) -> Result<&[u8]> {
        self.row.get_attr(attr_idx + 1)
    }

    /// Concatenates the equijoin output into `out`: every attribute of
    /// this primary row, then the foreign row's attributes minus the join
    /// key columns named by the opcode. Table tags are not emitted.
    pub fn merge(&self, other: &JoinRecord, out: &mut Record, op: OpCode) -> Result<()> {
        if !self.is_primary() || other.is_primary() {
            return Err(EngineError::Invariant(
                "merge requires a primary row on the left and a foreign row on the right"
                    .into(),
            ));
        }
        out.clear();
        for idx in 1..=self.num_cols() {
            out.add_attr_from(&self.row, idx + 1)?;
        }
        let dropped = op.foreign_drop_cols();
        for idx in 1..=other.num_cols() {
            if !dropped.contains(&idx) {
                out.add_attr_from(&other.row, idx + 1)?;
            }
        }
        Ok(())
    }

    /// Orders by join attribute, primary rows before foreign rows within
    /// a key, dummies last.
    pub fn less_than(&self, other: &JoinRecord, op: OpCode) -> bool {
        if self.is_dummy() {
            return false;
        }
        if other.is_dummy() {
            return true;
        }
        let a = self.resolve_join_attr(op);
        let b = other.resolve_join_attr(op);
        match (a, b) {
            (Some(a), Some(b)) => {
                if attr_less_than(a, b) {
                    return true;
                }
                if attr_less_than(b, a) {
                    return false;
                }
                self.is_primary() && !other.is_primary()
            }
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn key_prefix(&self, op: OpCode) -> u32 {
        if self.is_dummy() {
            return u32::MAX;
        }
        match self.resolve_join_attr(op) {
            Some(attr) => attr_key_prefix(attr),
            None => u32::MAX,
        }
    }

    fn resolve_join_attr(&self, op: OpCode) -> Option<&[u8]> {
        let idx = op.join_attr_idx(self.is_primary());
        if idx == 0 {
            return None;
        }
        self.get_attr(idx).ok()
    }

    pub fn row_upper_bound(&self) -> u32 {
        self.row.row_upper_bound()
    }

    /// The tagged row backing this join record.
    pub fn as_record(&self) -> &Record {
        &self.row
    }
}

impl Default for JoinRecord {
    fn default() -> Self {
        JoinRecord::new()
    }
}
