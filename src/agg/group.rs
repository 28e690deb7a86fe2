//! # Group Identity
//!
//! A `GroupKey` tracks which group an aggregation pass is currently
//! accumulating. It keeps a full copy of the row that opened the group
//! and binds the grouping columns as byte ranges into that copy.
//!
//! Serialization deliberately stores the whole row, not just the key
//! columns: a restored aggregator can then project any attribute of the
//! grouping row that downstream operators ask for.

use crate::error::Result;
use crate::record::Record;
use crate::types::attrs_equal;
use smallvec::SmallVec;

pub struct GroupKey {
    cols: SmallVec<[u32; 2]>,
    row: Record,
    bound: SmallVec<[(usize, usize); 2]>,
}

impl GroupKey {
    /// A key over the given 1-indexed grouping columns, tracking no group
    /// yet.
    pub fn new(cols: &[u32]) -> GroupKey {
        GroupKey {
            cols: SmallVec::from_slice(cols),
            row: Record::new(),
            bound: SmallVec::new(),
        }
    }

    pub fn cols(&self) -> &[u32] {
        &self.cols
    }

    /// True once a group row has been captured.
    pub fn is_bound(&self) -> bool {
        !self.bound.is_empty()
    }

    pub fn clear(&mut self) {
        self.row.clear();
        self.bound.clear();
    }

    fn rebind(&mut self) -> Result<()> {
        self.bound.clear();
        if self.row.num_cols() == 0 {
            return Ok(());
        }
        for &col in &self.cols {
            let range = self.row.attr_range(col)?;
            self.bound.push((range.start, range.end));
        }
        Ok(())
    }

    /// Captures `record` as the current group.
    pub fn bind(&mut self, record: &Record) -> Result<()> {
        self.row.set(record)?;
        self.rebind()
    }

    /// Copies another key's group, rebinding into the local buffer.
    pub fn set_from(&mut self, other: &GroupKey) -> Result<()> {
        self.row.set(&other.row)?;
        self.bound = other.bound.clone();
        Ok(())
    }

    fn attr_bytes(&self, i: usize) -> &[u8] {
        let (start, end) = self.bound[i];
        &self.row.bytes()[start..end]
    }

    /// True iff both keys track a group and the grouping attributes
    /// match. A key with no group equals nothing, itself included.
    pub fn equals(&self, other: &GroupKey) -> bool {
        if !self.is_bound() || !other.is_bound() || self.bound.len() != other.bound.len() {
            return false;
        }
        (0..self.bound.len()).all(|i| attrs_equal(self.attr_bytes(i), other.attr_bytes(i)))
    }

    /// True iff `record` belongs to the tracked group.
    pub fn matches(&self, record: &Record) -> Result<bool> {
        if !self.is_bound() || record.num_cols() == 0 {
            return Ok(false);
        }
        for (i, &col) in self.cols.iter().enumerate() {
            if !attrs_equal(self.attr_bytes(i), record.get_attr(col)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Projects the grouping attributes onto `rec`.
    pub fn append_result(&self, rec: &mut Record) -> Result<()> {
        for i in 0..self.bound.len() {
            rec.add_attr_raw(self.attr_bytes(i))?;
        }
        Ok(())
    }

    /// Reads an entire row and extracts the grouping columns from it. An
    /// empty row leaves the key tracking no group.
    pub fn read(&mut self, input: &[u8]) -> Result<usize> {
        let consumed = self.row.read(input)?;
        self.rebind()?;
        Ok(consumed)
    }

    /// Writes the entire row containing the grouping columns.
    pub fn write_whole_row(&self, output: &mut [u8]) -> Result<usize> {
        self.row.write(output)
    }
}
