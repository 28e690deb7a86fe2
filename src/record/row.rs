//! # Self-Describing Row Buffer
//!
//! A `Record` is one mutable row held in a single contiguous buffer of
//! fixed capacity, designed to be rewritten in place as operators run:
//!
//! ```text
//! Row := [num_cols: u32 LE] [attribute]*
//! Attribute := [tag: u8] [len: u32 LE] [value: len]
//! ```
//!
//! ## Design Goals
//!
//! 1. **Reusable buffers**: one allocation per record, reused across rows
//!    by alternating `read` and `write` calls
//! 2. **Offset-based bindings**: every attribute position is a byte offset
//!    into the owning buffer, so copying a record never dangles
//! 3. **Padding-safe**: dummy rows stay structurally valid and are carried
//!    through every codec path unchanged
//!
//! ## Invariants
//!
//! - The first four bytes always hold `num_cols`; an empty record has
//!   `num_cols == 0` and logical length 4.
//! - The logical length never exceeds the buffer capacity.
//! - `row_upper_bound()` depends only on the attribute types present, so
//!   it is stable across value mutations.
//! - A record is dummy iff at least one attribute carries a dummy tag.

use crate::block::{StreamRowReader, StreamRowWriter};
use crate::config::{ATTR_HEADER_SIZE, ROW_COUNT_SIZE, ROW_UPPER_BOUND, STRING_UPPER_BOUND};
use crate::crypto;
use crate::error::{EngineError, Result};
use crate::opcode::OpCode;
use crate::types::attr::{self, tag, AttrType};
use crate::types::{attr_key_prefix, attr_less_than, Scalar};
use std::ops::Range;

pub struct Record {
    buf: Vec<u8>,
    len: usize,
}

impl Record {
    pub fn new() -> Record {
        Record::with_capacity(ROW_UPPER_BOUND)
    }

    pub fn with_capacity(capacity: usize) -> Record {
        Record {
            buf: vec![0u8; capacity],
            len: ROW_COUNT_SIZE,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Serialized length of the row in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.num_cols() == 0
    }

    pub fn num_cols(&self) -> u32 {
        u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]])
    }

    fn set_num_cols(&mut self, n: u32) {
        self.buf[..ROW_COUNT_SIZE].copy_from_slice(&n.to_le_bytes());
    }

    /// Serialized bytes of the row.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Deletes all attributes from the record.
    pub fn clear(&mut self) {
        self.set_num_cols(0);
        self.len = ROW_COUNT_SIZE;
    }

    /// Populates dummy attributes of the given types, each sized to its
    /// type's upper bound.
    pub fn init(&mut self, types: &[AttrType]) -> Result<()> {
        let zeros = [0u8; STRING_UPPER_BOUND];
        self.clear();
        for ty in types {
            self.add_attr(ty.as_dummy(), &zeros[..ty.upper_bound()])?;
        }
        Ok(())
    }

    /// Copies the contents of `other` into this record.
    pub fn set(&mut self, other: &Record) -> Result<()> {
        if other.len > self.buf.len() {
            return Err(EngineError::CapacityExceeded {
                requested: other.len,
                capacity: self.buf.len(),
            });
        }
        self.buf[..other.len].copy_from_slice(&other.buf[..other.len]);
        self.len = other.len;
        Ok(())
    }

    /// Appends all attributes of `other` to this record.
    pub fn append(&mut self, other: &Record) -> Result<()> {
        let extra = other.len - ROW_COUNT_SIZE;
        if self.len + extra > self.buf.len() {
            return Err(EngineError::CapacityExceeded {
                requested: self.len + extra,
                capacity: self.buf.len(),
            });
        }
        self.buf[self.len..self.len + extra]
            .copy_from_slice(&other.buf[ROW_COUNT_SIZE..other.len]);
        self.len += extra;
        let cols = self.num_cols() + other.num_cols();
        self.set_num_cols(cols);
        Ok(())
    }

    /// Parses a plaintext row. Returns the number of bytes consumed.
    pub fn read(&mut self, input: &[u8]) -> Result<usize> {
        if input.len() < ROW_COUNT_SIZE {
            return Err(EngineError::Format(format!(
                "truncated row header: {} bytes",
                input.len()
            )));
        }
        let num_cols = u32::from_le_bytes([input[0], input[1], input[2], input[3]]);
        let mut pos = ROW_COUNT_SIZE;
        for _ in 0..num_cols {
            pos += attr::total_len(&input[pos..])?;
        }
        if pos > self.buf.len() {
            return Err(EngineError::CapacityExceeded {
                requested: pos,
                capacity: self.buf.len(),
            });
        }
        self.buf[..pos].copy_from_slice(&input[..pos]);
        self.len = pos;
        Ok(pos)
    }

    /// Writes the row in plaintext. Returns the number of bytes written.
    pub fn write(&self, output: &mut [u8]) -> Result<usize> {
        if output.len() < self.len {
            return Err(EngineError::CapacityExceeded {
                requested: self.len,
                capacity: output.len(),
            });
        }
        output[..self.len].copy_from_slice(&self.buf[..self.len]);
        Ok(self.len)
    }

    /// Reads an individually encrypted row: `[plaintext_len: u32][ct]`.
    pub fn read_encrypted(&mut self, input: &[u8]) -> Result<usize> {
        if input.len() < 4 {
            return Err(EngineError::Format(format!(
                "truncated encrypted row length: {} bytes",
                input.len()
            )));
        }
        let plain_len = u32::from_le_bytes([input[0], input[1], input[2], input[3]]) as usize;
        let ct_len = crypto::ciphertext_len(plain_len);
        if input.len() < 4 + ct_len {
            return Err(EngineError::Format(format!(
                "truncated encrypted row: want {} bytes, have {}",
                4 + ct_len,
                input.len()
            )));
        }
        let mut plain = vec![0u8; plain_len];
        crypto::decrypt(&input[4..4 + ct_len], &mut plain)?;
        let consumed = self.read(&plain)?;
        if consumed != plain_len {
            return Err(EngineError::Format(format!(
                "encrypted row container holds {plain_len} bytes but row is {consumed}"
            )));
        }
        Ok(4 + ct_len)
    }

    /// Encrypts and writes the row. Returns the number of bytes written.
    pub fn write_encrypted(&self, output: &mut [u8]) -> Result<usize> {
        let ct_len = crypto::ciphertext_len(self.len);
        let needed = 4 + ct_len;
        if output.len() < needed {
            return Err(EngineError::CapacityExceeded {
                requested: needed,
                capacity: output.len(),
            });
        }
        output[..4].copy_from_slice(&(self.len as u32).to_le_bytes());
        crypto::encrypt(&self.buf[..self.len], &mut output[4..needed])?;
        Ok(needed)
    }

    /// Reads a row through a streaming decryptor, one field at a time.
    pub fn read_stream(&mut self, reader: &mut StreamRowReader<'_>) -> Result<usize> {
        let mut head = [0u8; ROW_COUNT_SIZE];
        reader.read_bytes(&mut head)?;
        let num_cols = u32::from_le_bytes(head);
        self.buf[..ROW_COUNT_SIZE].copy_from_slice(&head);

        let mut pos = ROW_COUNT_SIZE;
        for _ in 0..num_cols {
            if pos + ATTR_HEADER_SIZE > self.buf.len() {
                return Err(EngineError::CapacityExceeded {
                    requested: pos + ATTR_HEADER_SIZE,
                    capacity: self.buf.len(),
                });
            }
            let mut header = [0u8; ATTR_HEADER_SIZE];
            reader.read_bytes(&mut header)?;
            AttrType::from_tag(header[0])?;
            let len =
                u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as usize;
            let end = pos + ATTR_HEADER_SIZE + len;
            if end > self.buf.len() {
                return Err(EngineError::CapacityExceeded {
                    requested: end,
                    capacity: self.buf.len(),
                });
            }
            self.buf[pos..pos + ATTR_HEADER_SIZE].copy_from_slice(&header);
            reader.read_bytes(&mut self.buf[pos + ATTR_HEADER_SIZE..end])?;
            pos = end;
        }
        self.len = pos;
        Ok(pos)
    }

    /// Writes the row through a streaming encryptor.
    pub fn write_stream(&self, writer: &mut StreamRowWriter<'_>) -> Result<usize> {
        writer.write_bytes(&self.buf[..self.len])?;
        Ok(self.len)
    }

    /// Byte range of the 1-indexed attribute, including its header.
    pub(crate) fn attr_range(&self, attr_idx: u32) -> Result<Range<usize>> {
        let num_cols = self.num_cols();
        if attr_idx == 0 || attr_idx > num_cols {
            return Err(EngineError::IndexOutOfRange {
                index: attr_idx,
                num_cols,
            });
        }
        let mut start = ROW_COUNT_SIZE;
        for _ in 1..attr_idx {
            start += attr::total_len(&self.buf[start..self.len])?;
        }
        let total = attr::total_len(&self.buf[start..self.len])?;
        Ok(start..start + total)
    }

    /// The full `[tag][len][value]` bytes of the 1-indexed attribute.
    pub fn get_attr(&self, attr_idx: u32) -> Result<&[u8]> {
        let range = self.attr_range(attr_idx)?;
        Ok(&self.buf[range])
    }

    pub fn get_attr_type(&self, attr_idx: u32) -> Result<AttrType> {
        let range = self.attr_range(attr_idx)?;
        AttrType::from_tag(self.buf[range.start])
    }

    pub fn get_attr_len(&self, attr_idx: u32) -> Result<u32> {
        let range = self.attr_range(attr_idx)?;
        Ok((range.len() - ATTR_HEADER_SIZE) as u32)
    }

    /// The value bytes of the 1-indexed attribute.
    pub fn get_attr_value(&self, attr_idx: u32) -> Result<&[u8]> {
        let range = self.attr_range(attr_idx)?;
        Ok(&self.buf[range.start + ATTR_HEADER_SIZE..range.end])
    }

    /// Overwrites an attribute's value in place. The new value must have
    /// the same length as the existing one.
    pub fn set_attr_value(&mut self, attr_idx: u32, value: &[u8]) -> Result<()> {
        let range = self.attr_range(attr_idx)?;
        let existing = range.len() - ATTR_HEADER_SIZE;
        if value.len() != existing {
            return Err(EngineError::Invariant(format!(
                "in-place value write of {} bytes over a {existing}-byte attribute",
                value.len()
            )));
        }
        self.buf[range.start + ATTR_HEADER_SIZE..range.end].copy_from_slice(value);
        Ok(())
    }

    /// Resizes an attribute, shifting every later attribute to keep the
    /// row contiguous. New value bytes are zeroed when growing.
    pub fn set_attr_len(&mut self, attr_idx: u32, new_len: u32) -> Result<()> {
        let range = self.attr_range(attr_idx)?;
        let old_len = range.len() - ATTR_HEADER_SIZE;
        let new_len = new_len as usize;
        if new_len == old_len {
            return Ok(());
        }
        let new_total = self.len - old_len + new_len;
        if new_total > self.buf.len() {
            return Err(EngineError::CapacityExceeded {
                requested: new_total,
                capacity: self.buf.len(),
            });
        }
        let value_start = range.start + ATTR_HEADER_SIZE;
        let new_end = value_start + new_len;
        self.buf.copy_within(range.end..self.len, new_end);
        if new_len > old_len {
            self.buf[value_start + old_len..new_end].fill(0);
        }
        self.buf[range.start + 1..value_start]
            .copy_from_slice(&(new_len as u32).to_le_bytes());
        self.len = new_total;
        Ok(())
    }

    /// Appends an attribute copied from another record's column.
    pub fn add_attr_from(&mut self, other: &Record, attr_idx: u32) -> Result<()> {
        let range = other.attr_range(attr_idx)?;
        self.add_attr_raw(&other.buf[range])
    }

    /// Appends an attribute given its full `[tag][len][value]` bytes.
    pub fn add_attr_raw(&mut self, attr_bytes: &[u8]) -> Result<()> {
        let total = attr::total_len(attr_bytes)?;
        if self.len + total > self.buf.len() {
            return Err(EngineError::CapacityExceeded {
                requested: self.len + total,
                capacity: self.buf.len(),
            });
        }
        self.buf[self.len..self.len + total].copy_from_slice(&attr_bytes[..total]);
        self.len += total;
        let cols = self.num_cols() + 1;
        self.set_num_cols(cols);
        Ok(())
    }

    /// Appends an attribute from its parts.
    pub fn add_attr(&mut self, ty: AttrType, value: &[u8]) -> Result<()> {
        let written = attr::write_attr(&mut self.buf[self.len..], ty, value, false)?;
        self.len += written;
        let cols = self.num_cols() + 1;
        self.set_num_cols(cols);
        Ok(())
    }

    /// Appends a typed scalar, marked dummy on request.
    pub fn add_scalar(&mut self, value: Scalar, dummy: bool) -> Result<()> {
        let written = value.write_attr(&mut self.buf[self.len..], dummy)?;
        self.len += written;
        let cols = self.num_cols() + 1;
        self.set_num_cols(cols);
        Ok(())
    }

    /// Iterates attribute byte ranges. The buffer is kept consistent by
    /// every mutator, so the walk never leaves the logical row.
    fn attr_ranges(&self) -> AttrRanges<'_> {
        AttrRanges {
            buf: &self.buf[..self.len],
            pos: ROW_COUNT_SIZE,
            remaining: self.num_cols(),
        }
    }

    /// Rewrites every attribute tag to its dummy counterpart, preserving
    /// lengths and value bytes. Idempotent.
    pub fn mark_dummy(&mut self) {
        let ranges: Vec<Range<usize>> = self.attr_ranges().collect();
        for range in ranges {
            self.buf[range.start] |= tag::DUMMY_BIT;
        }
    }

    /// A row is dummy iff any of its attributes carries a dummy tag.
    pub fn is_dummy(&self) -> bool {
        self.attr_ranges()
            .any(|range| self.buf[range.start] & tag::DUMMY_BIT != 0)
    }

    /// Compares on the opcode's sort columns, tie-breaking in column-list
    /// order. A row missing a sort column orders after rows that have it.
    pub fn less_than(&self, other: &Record, op: OpCode) -> bool {
        for &col in op.sort_cols() {
            match (self.attr_range(col), other.attr_range(col)) {
                (Ok(ra), Ok(rb)) => {
                    let a = &self.buf[ra];
                    let b = &other.buf[rb];
                    if attr_less_than(a, b) {
                        return true;
                    }
                    if attr_less_than(b, a) {
                        return false;
                    }
                }
                (Ok(_), Err(_)) => return true,
                (Err(_), Ok(_)) => return false,
                (Err(_), Err(_)) => {}
            }
        }
        false
    }

    /// Key prefix of the opcode's leading sort column.
    pub fn key_prefix(&self, op: OpCode) -> u32 {
        match op.sort_cols().first() {
            Some(&col) => match self.attr_range(col) {
                Ok(range) => attr_key_prefix(&self.buf[range]),
                Err(_) => u32::MAX,
            },
            None => 0,
        }
    }

    /// The maximum number of bytes `write` could produce for any row with
    /// the same schema as this one.
    pub fn row_upper_bound(&self) -> u32 {
        let mut total = ROW_COUNT_SIZE;
        for range in self.attr_ranges() {
            let payload = match AttrType::from_tag(self.buf[range.start]) {
                Ok(ty) => ty.upper_bound(),
                Err(_) => range.len() - ATTR_HEADER_SIZE,
            };
            total += ATTR_HEADER_SIZE + payload;
        }
        total as u32
    }
}

impl Default for Record {
    fn default() -> Self {
        Record::new()
    }
}

struct AttrRanges<'a> {
    buf: &'a [u8],
    pos: usize,
    remaining: u32,
}

impl Iterator for AttrRanges<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if self.remaining == 0 {
            return None;
        }
        let total = attr::total_len(&self.buf[self.pos..]).ok()?;
        let range = self.pos..self.pos + total;
        self.pos = range.end;
        self.remaining -= 1;
        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColType;

    fn sample_record() -> Record {
        let mut rec = Record::new();
        rec.add_attr(AttrType::Int, &42u32.to_le_bytes()).unwrap();
        rec.add_attr(AttrType::Str, b"ab").unwrap();
        rec.add_attr(AttrType::Float, &1.5f32.to_le_bytes()).unwrap();
        rec
    }

    #[test]
    fn empty_record_is_four_bytes() {
        let rec = Record::new();
        assert_eq!(rec.num_cols(), 0);
        assert_eq!(rec.len(), 4);
        assert!(rec.is_empty());
    }

    #[test]
    fn write_then_read_reproduces_the_row() {
        let rec = sample_record();
        assert_eq!(rec.len(), 4 + 9 + 7 + 9);

        let mut buf = vec![0u8; ROW_UPPER_BOUND];
        let written = rec.write(&mut buf).unwrap();
        assert_eq!(written, 29);

        let mut back = Record::new();
        let read = back.read(&buf).unwrap();
        assert_eq!(read, written);
        assert_eq!(back.num_cols(), 3);
        assert_eq!(back.bytes(), rec.bytes());
    }

    #[test]
    fn encrypted_roundtrip_reproduces_the_row() {
        let rec = sample_record();
        let mut buf = vec![0u8; 4 + crypto::ciphertext_len(ROW_UPPER_BOUND)];
        let written = rec.write_encrypted(&mut buf).unwrap();

        let mut back = Record::new();
        let read = back.read_encrypted(&buf).unwrap();
        assert_eq!(read, written);
        assert_eq!(back.bytes(), rec.bytes());
    }

    #[test]
    fn accessors_are_one_indexed() {
        let rec = sample_record();
        assert_eq!(rec.get_attr_type(1).unwrap(), AttrType::Int);
        assert_eq!(rec.get_attr_value(2).unwrap(), b"ab");
        assert_eq!(rec.get_attr_len(3).unwrap(), 4);

        assert!(matches!(
            rec.get_attr(0).unwrap_err(),
            EngineError::IndexOutOfRange { .. }
        ));
        assert!(matches!(
            rec.get_attr(4).unwrap_err(),
            EngineError::IndexOutOfRange { .. }
        ));
    }

    #[test]
    fn set_attr_value_requires_matching_length() {
        let mut rec = sample_record();
        rec.set_attr_value(2, b"cd").unwrap();
        assert_eq!(rec.get_attr_value(2).unwrap(), b"cd");
        assert!(rec.set_attr_value(2, b"long").is_err());
    }

    #[test]
    fn set_attr_len_shifts_later_attributes() {
        let mut rec = sample_record();
        let float_before = rec.get_attr(3).unwrap().to_vec();

        rec.set_attr_len(2, 5).unwrap();
        assert_eq!(rec.get_attr_len(2).unwrap(), 5);
        assert_eq!(rec.get_attr_value(2).unwrap(), b"ab\0\0\0");
        assert_eq!(rec.get_attr(3).unwrap(), float_before.as_slice());

        rec.set_attr_len(2, 1).unwrap();
        assert_eq!(rec.get_attr_value(2).unwrap(), b"a");
        assert_eq!(rec.get_attr(3).unwrap(), float_before.as_slice());
        assert_eq!(rec.len(), 4 + 9 + 6 + 9);
    }

    #[test]
    fn append_concatenates_attributes() {
        let mut a = Record::new();
        a.add_attr(AttrType::Int, &1u32.to_le_bytes()).unwrap();
        let mut b = Record::new();
        b.add_attr(AttrType::Int, &2u32.to_le_bytes()).unwrap();
        b.add_attr(AttrType::Str, b"xyz").unwrap();

        a.append(&b).unwrap();
        assert_eq!(a.num_cols(), 3);
        assert_eq!(a.get_attr_value(2).unwrap(), &2u32.to_le_bytes());
        assert_eq!(a.get_attr_value(3).unwrap(), b"xyz");
    }

    #[test]
    fn add_attr_from_copies_a_column() {
        let src = sample_record();
        let mut dst = Record::new();
        dst.add_attr_from(&src, 2).unwrap();
        assert_eq!(dst.num_cols(), 1);
        assert_eq!(dst.get_attr_value(1).unwrap(), b"ab");
    }

    #[test]
    fn mark_dummy_is_idempotent_and_detected() {
        let mut rec = sample_record();
        assert!(!rec.is_dummy());

        rec.mark_dummy();
        assert!(rec.is_dummy());
        let after_once = rec.bytes().to_vec();

        rec.mark_dummy();
        assert_eq!(rec.bytes(), after_once.as_slice());
        assert_eq!(rec.get_attr_value(1).unwrap(), &42u32.to_le_bytes());
    }

    #[test]
    fn init_builds_dummy_attributes_at_upper_bounds() {
        let mut rec = Record::new();
        rec.init(&[AttrType::Int, AttrType::Str]).unwrap();
        assert_eq!(rec.num_cols(), 2);
        assert!(rec.is_dummy());
        assert_eq!(rec.get_attr_len(1).unwrap() as usize, 4);
        assert_eq!(rec.get_attr_len(2).unwrap() as usize, STRING_UPPER_BOUND);
    }

    #[test]
    fn row_upper_bound_is_stable_across_value_mutations() {
        let mut rec = sample_record();
        let bound = rec.row_upper_bound();
        assert_eq!(
            bound as usize,
            4 + (5 + 4) + (5 + STRING_UPPER_BOUND) + (5 + 4)
        );
        rec.set_attr_value(1, &7u32.to_le_bytes()).unwrap();
        assert_eq!(rec.row_upper_bound(), bound);
    }

    #[test]
    fn less_than_orders_by_sort_column() {
        let mut lo = Record::new();
        lo.add_attr(AttrType::Int, &2u32.to_le_bytes()).unwrap();
        let mut hi = Record::new();
        hi.add_attr(AttrType::Int, &5u32.to_le_bytes()).unwrap();

        assert!(lo.less_than(&hi, OpCode::SortCol1));
        assert!(!hi.less_than(&lo, OpCode::SortCol1));
        assert!(!lo.less_than(&lo, OpCode::SortCol1));
    }

    #[test]
    fn key_prefix_refines_less_than() {
        let values = [2u32, 5, 9];
        let records: Vec<Record> = values
            .iter()
            .map(|v| {
                let mut rec = Record::new();
                rec.add_attr(AttrType::Int, &v.to_le_bytes()).unwrap();
                rec
            })
            .collect();
        for a in &records {
            for b in &records {
                if a.key_prefix(OpCode::SortCol1) < b.key_prefix(OpCode::SortCol1) {
                    assert!(a.less_than(b, OpCode::SortCol1));
                }
            }
        }
    }

    #[test]
    fn dummy_rows_sort_after_live_rows() {
        let mut live = Record::new();
        live.add_attr(AttrType::Int, &u32::MAX.to_le_bytes()).unwrap();
        let mut padding = Record::new();
        padding.add_attr(AttrType::Int, &0u32.to_le_bytes()).unwrap();
        padding.mark_dummy();

        assert!(live.less_than(&padding, OpCode::SortCol1));
        assert!(!padding.less_than(&live, OpCode::SortCol1));
        assert_eq!(padding.key_prefix(OpCode::SortCol1), u32::MAX);
    }

    #[test]
    fn read_rejects_truncated_input() {
        let rec = sample_record();
        let mut buf = vec![0u8; ROW_UPPER_BOUND];
        let written = rec.write(&mut buf).unwrap();

        let mut back = Record::new();
        assert!(matches!(
            back.read(&buf[..written - 3]).unwrap_err(),
            EngineError::Format(_)
        ));
    }

    #[test]
    fn capacity_overflow_is_rejected() {
        let mut small = Record::with_capacity(16);
        small.add_attr(AttrType::Int, &1u32.to_le_bytes()).unwrap();
        let err = small.add_attr(AttrType::Str, b"overflow").unwrap_err();
        assert!(matches!(err, EngineError::CapacityExceeded { .. }));
    }

    #[test]
    fn scalar_append_matches_attr_layout() {
        let mut rec = Record::new();
        rec.add_scalar(Scalar::Int(99), false).unwrap();
        rec.add_scalar(Scalar::Float(0.5), true).unwrap();

        assert_eq!(rec.get_attr_type(1).unwrap(), AttrType::Int);
        assert_eq!(rec.get_attr_type(2).unwrap(), AttrType::DummyFloat);
        let (v, _) = Scalar::read_attr(rec.get_attr(1).unwrap(), ColType::Int).unwrap();
        assert_eq!(v, Scalar::Int(99));
    }
}
