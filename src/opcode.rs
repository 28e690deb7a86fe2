//! # Operator Catalog
//!
//! Operators arrive at the engine as integer opcodes chosen by the host
//! planner. Each opcode names the columns that participate in a sort,
//! join or group-by, so the tuple primitives never carry schema knowledge
//! of their own: `Record::less_than`, join-attribute binding and merge
//! projection all consult this table.
//!
//! The catalog also derives lineage task IDs. A task ID identifies one
//! operator instance working one partition; block writers stamp it into
//! every block header and readers feed it to the verification set.

use crate::agg::AggFn;
use crate::error::{EngineError, Result};
use crate::types::ColType;

/// Catalog of operators the engine can execute.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    GroupbyCol2SumCol3Step1 = 1,
    SortCol1 = 2,
    JoinCol2 = 3,
    SortCol2 = 50,
    SortIntegersTest = 90,
    GroupbyCol2SumCol3Step2 = 101,
    GroupbyCol1SumCol2Step1 = 102,
    GroupbyCol1SumCol2Step2 = 103,
    GroupbyCol1AvgCol2SumCol3Step1 = 104,
    GroupbyCol1AvgCol2SumCol3Step2 = 105,
    JoinCol1 = 106,
}

/// One aggregate requested by a group-by opcode: function, 1-indexed
/// source column, and the column's type.
pub type AggSpec = (AggFn, u32, ColType);

impl OpCode {
    /// Resolves a wire opcode. Unknown values are a framing error.
    pub fn from_u32(value: u32) -> Result<OpCode> {
        Ok(match value {
            1 => OpCode::GroupbyCol2SumCol3Step1,
            2 => OpCode::SortCol1,
            3 => OpCode::JoinCol2,
            50 => OpCode::SortCol2,
            90 => OpCode::SortIntegersTest,
            101 => OpCode::GroupbyCol2SumCol3Step2,
            102 => OpCode::GroupbyCol1SumCol2Step1,
            103 => OpCode::GroupbyCol1SumCol2Step2,
            104 => OpCode::GroupbyCol1AvgCol2SumCol3Step1,
            105 => OpCode::GroupbyCol1AvgCol2SumCol3Step2,
            106 => OpCode::JoinCol1,
            other => {
                return Err(EngineError::Format(format!("unknown opcode {other}")))
            }
        })
    }

    pub fn value(self) -> u32 {
        self as u32
    }

    /// The 1-indexed columns this operator sorts on, in tie-break order.
    pub fn sort_cols(self) -> &'static [u32] {
        match self {
            OpCode::SortCol1 | OpCode::SortIntegersTest | OpCode::JoinCol1 => &[1],
            OpCode::SortCol2 | OpCode::JoinCol2 => &[2],
            OpCode::GroupbyCol1SumCol2Step1
            | OpCode::GroupbyCol1SumCol2Step2
            | OpCode::GroupbyCol1AvgCol2SumCol3Step1
            | OpCode::GroupbyCol1AvgCol2SumCol3Step2 => &[1],
            OpCode::GroupbyCol2SumCol3Step1 | OpCode::GroupbyCol2SumCol3Step2 => &[2],
        }
    }

    /// For a single-column equijoin, the 1-indexed join attribute of the
    /// primary or foreign side. Zero for every other operator.
    pub fn join_attr_idx(self, is_primary: bool) -> u32 {
        let _ = is_primary;
        match self {
            OpCode::JoinCol1 => 1,
            OpCode::JoinCol2 => 2,
            _ => 0,
        }
    }

    /// Foreign-side columns dropped by `merge`: the equijoin output keeps
    /// a single copy of the join key.
    pub fn foreign_drop_cols(self) -> &'static [u32] {
        match self {
            OpCode::JoinCol1 => &[1],
            OpCode::JoinCol2 => &[2],
            _ => &[],
        }
    }

    /// The 1-indexed grouping columns of a group-by operator.
    pub fn group_cols(self) -> &'static [u32] {
        match self {
            OpCode::GroupbyCol1SumCol2Step1
            | OpCode::GroupbyCol1SumCol2Step2
            | OpCode::GroupbyCol1AvgCol2SumCol3Step1
            | OpCode::GroupbyCol1AvgCol2SumCol3Step2 => &[1],
            OpCode::GroupbyCol2SumCol3Step1 | OpCode::GroupbyCol2SumCol3Step2 => &[2],
            _ => &[],
        }
    }

    /// The aggregates a group-by operator computes.
    pub fn agg_specs(self) -> &'static [AggSpec] {
        match self {
            OpCode::GroupbyCol1SumCol2Step1 | OpCode::GroupbyCol1SumCol2Step2 => {
                &[(AggFn::Sum, 2, ColType::Int)]
            }
            OpCode::GroupbyCol2SumCol3Step1 | OpCode::GroupbyCol2SumCol3Step2 => {
                &[(AggFn::Sum, 3, ColType::Int)]
            }
            OpCode::GroupbyCol1AvgCol2SumCol3Step1
            | OpCode::GroupbyCol1AvgCol2SumCol3Step2 => &[
                (AggFn::Avg, 2, ColType::Int),
                (AggFn::Sum, 3, ColType::Int),
            ],
            _ => &[],
        }
    }

    /// Lineage task ID for one partition of this operator: the opcode in
    /// the high half-word, the partition index in the low.
    pub fn task_id(self, part: u32) -> u32 {
        (self.value() << 16) | (part & 0xFFFF)
    }
}
