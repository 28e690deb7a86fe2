//! # Sort Handles
//!
//! A `SortKey` pairs a reference to a populated record with the
//! precomputed key prefix of its leading sort column. Sorting over
//! handles keeps comparisons cache-resident: the u32 prefixes decide most
//! orderings outright, and only prefix ties fall back to a deep attribute
//! comparison on the referenced rows.
//!
//! The optional deep-comparison counter is an observability hook for the
//! sort drivers; it is incremented exactly once per deep comparison and
//! never changes the comparison result.

use crate::opcode::OpCode;
use crate::record::Record;

#[derive(Clone, Copy)]
pub struct SortKey<'a> {
    rec: &'a Record,
    key_prefix: u32,
}

impl<'a> SortKey<'a> {
    /// Binds a handle to a populated record, caching its key prefix.
    /// Rebind after any mutation of the underlying record.
    pub fn bind(rec: &'a Record, op: OpCode) -> SortKey<'a> {
        SortKey {
            rec,
            key_prefix: rec.key_prefix(op),
        }
    }

    pub fn record(&self) -> &'a Record {
        self.rec
    }

    pub fn key_prefix(&self) -> u32 {
        self.key_prefix
    }

    /// Prefix comparison with deep fallback on ties.
    pub fn less_than(
        &self,
        other: &SortKey<'_>,
        op: OpCode,
        deep_comparisons: Option<&mut u64>,
    ) -> bool {
        if self.key_prefix < other.key_prefix {
            return true;
        }
        if self.key_prefix > other.key_prefix {
            return false;
        }
        if let Some(counter) = deep_comparisons {
            *counter += 1;
        }
        self.rec.less_than(other.rec, op)
    }
}
