//! # Aggregate Functions
//!
//! One `AggState` accumulates one aggregate function over one typed
//! column. The function, column and type are runtime values rather than
//! type parameters, so operator drivers can assemble any combination from
//! an opcode's catalog entry.
//!
//! Partial state serializes as plain attributes: a sum is one attribute
//! of the column type; an average is a sum attribute followed by a u32
//! count attribute. That keeps partials readable with the row codec when
//! they cross block boundaries between passes.

use crate::error::{EngineError, Result};
use crate::record::Record;
use crate::types::{ColType, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggFn {
    Sum,
    Avg,
}

pub struct AggState {
    func: AggFn,
    col: u32,
    ty: ColType,
    sum: Scalar,
    count: u32,
}

impl AggState {
    pub fn new(func: AggFn, col: u32, ty: ColType) -> AggState {
        AggState {
            func,
            col,
            ty,
            sum: Scalar::zero(ty),
            count: 0,
        }
    }

    pub fn func(&self) -> AggFn {
        self.func
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    pub fn col_type(&self) -> ColType {
        self.ty
    }

    /// Resets the accumulator for a new group.
    pub fn zero(&mut self) {
        self.sum = Scalar::zero(self.ty);
        self.count = 0;
    }

    /// Folds one record's column value into the accumulator.
    pub fn add_record(&mut self, record: &Record) -> Result<()> {
        let attr_ty = record.get_attr_type(self.col)?;
        if attr_ty.base() != self.ty.attr_type() {
            return Err(EngineError::TypeMismatch {
                expected: self.ty.attr_type().tag(),
                found: attr_ty.tag(),
            });
        }
        let value = Scalar::from_value_bytes(self.ty, record.get_attr_value(self.col)?)?;
        self.sum.add_assign(value)?;
        self.count += 1;
        Ok(())
    }

    /// Folds another state's partial into this one. Both states must
    /// describe the same aggregate.
    pub fn merge(&mut self, other: &AggState) -> Result<()> {
        if self.func != other.func || self.col != other.col || self.ty != other.ty {
            return Err(EngineError::Invariant(format!(
                "combining mismatched aggregates: {:?} col {} with {:?} col {}",
                self.func, self.col, other.func, other.col
            )));
        }
        self.sum.add_assign(other.sum)?;
        self.count += other.count;
        Ok(())
    }

    /// Parses a serialized partial. Returns the number of bytes consumed.
    pub fn read_partial(&mut self, input: &[u8]) -> Result<usize> {
        let (sum, mut consumed) = Scalar::read_attr(input, self.ty)?;
        self.sum = sum;
        match self.func {
            AggFn::Sum => self.count = 0,
            AggFn::Avg => {
                let (count, n) = Scalar::read_attr(&input[consumed..], ColType::Int)?;
                let Scalar::Int(count) = count else {
                    return Err(EngineError::Invariant(
                        "average count decoded as a non-integer".into(),
                    ));
                };
                self.count = count;
                consumed += n;
            }
        }
        Ok(consumed)
    }

    /// Serializes the partial. Returns the number of bytes written.
    pub fn write_partial(&self, output: &mut [u8]) -> Result<usize> {
        let mut written = self.sum.write_attr(output, false)?;
        if self.func == AggFn::Avg {
            written += Scalar::Int(self.count).write_attr(&mut output[written..], false)?;
        }
        Ok(written)
    }

    /// Appends the final aggregate value to `rec`, marked dummy when the
    /// aggregator stands for a sentinel row.
    pub fn append_result(&self, rec: &mut Record, dummy: bool) -> Result<()> {
        let value = match self.func {
            AggFn::Sum => self.sum,
            AggFn::Avg => self.sum.div_by_count(self.count)?,
        };
        rec.add_scalar(value, dummy)
    }
}
