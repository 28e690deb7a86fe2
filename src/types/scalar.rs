//! # Tagged Scalar Values for Aggregation
//!
//! Aggregate functions accumulate over a single typed column. `ColType`
//! names the column's type and `Scalar` holds one value of it, so a single
//! aggregate-state struct can carry any column type without generics.
//! Scalars serialize as ordinary attributes, which keeps aggregate
//! partials readable by the same codec as row data.

use crate::error::{EngineError, Result};
use crate::types::attr::{self, AttrType};

/// Column types an aggregate function may accumulate over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColType {
    Int,
    Float,
}

impl ColType {
    pub fn attr_type(self) -> AttrType {
        match self {
            ColType::Int => AttrType::Int,
            ColType::Float => AttrType::Float,
        }
    }
}

/// One value of a `ColType`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(u32),
    Float(f32),
}

impl Scalar {
    pub fn zero(ty: ColType) -> Scalar {
        match ty {
            ColType::Int => Scalar::Int(0),
            ColType::Float => Scalar::Float(0.0),
        }
    }

    pub fn col_type(&self) -> ColType {
        match self {
            Scalar::Int(_) => ColType::Int,
            Scalar::Float(_) => ColType::Float,
        }
    }

    /// Decodes a scalar from the 4-byte payload of an attribute.
    pub fn from_value_bytes(ty: ColType, bytes: &[u8]) -> Result<Scalar> {
        if bytes.len() != 4 {
            return Err(EngineError::Format(format!(
                "scalar payload must be 4 bytes, got {}",
                bytes.len()
            )));
        }
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        Ok(match ty {
            ColType::Int => Scalar::Int(u32::from_le_bytes(raw)),
            ColType::Float => Scalar::Float(f32::from_le_bytes(raw)),
        })
    }

    pub fn to_le_bytes(self) -> [u8; 4] {
        match self {
            Scalar::Int(v) => v.to_le_bytes(),
            Scalar::Float(v) => v.to_le_bytes(),
        }
    }

    /// Adds `other` into this scalar. Both sides must hold the same type.
    pub fn add_assign(&mut self, other: Scalar) -> Result<()> {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => {
                *a = a.wrapping_add(b);
                Ok(())
            }
            (Scalar::Float(a), Scalar::Float(b)) => {
                *a += b;
                Ok(())
            }
            (a, b) => Err(EngineError::Invariant(format!(
                "scalar type mismatch: {:?} += {:?}",
                a.col_type(),
                b.col_type()
            ))),
        }
    }

    /// The mean of a running sum, cast back to the column type through f64.
    pub fn div_by_count(self, count: u32) -> Result<Scalar> {
        if count == 0 {
            return Err(EngineError::Invariant(
                "average over zero contributing rows".into(),
            ));
        }
        Ok(match self {
            Scalar::Int(v) => Scalar::Int((v as f64 / count as f64) as u32),
            Scalar::Float(v) => Scalar::Float((v as f64 / count as f64) as f32),
        })
    }

    /// Serializes this scalar as one attribute.
    pub fn write_attr(self, dst: &mut [u8], dummy: bool) -> Result<usize> {
        attr::write_attr(dst, self.col_type().attr_type(), &self.to_le_bytes(), dummy)
    }

    /// Parses one attribute of the given type. Returns (scalar, consumed).
    pub fn read_attr(src: &[u8], ty: ColType) -> Result<(Scalar, usize)> {
        let mut out = [0u8; 4];
        let n = attr::read_attr(src, ty.attr_type(), &mut out)?;
        Ok((Scalar::from_value_bytes(ty, &out)?, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assign_accumulates_ints() {
        let mut s = Scalar::zero(ColType::Int);
        s.add_assign(Scalar::Int(3)).unwrap();
        s.add_assign(Scalar::Int(4)).unwrap();
        assert_eq!(s, Scalar::Int(7));
    }

    #[test]
    fn add_assign_rejects_mixed_types() {
        let mut s = Scalar::Int(1);
        let err = s.add_assign(Scalar::Float(1.0)).unwrap_err();
        assert!(matches!(err, EngineError::Invariant(_)));
    }

    #[test]
    fn div_by_count_truncates_int_mean() {
        assert_eq!(Scalar::Int(7).div_by_count(2).unwrap(), Scalar::Int(3));
        assert_eq!(
            Scalar::Float(7.0).div_by_count(2).unwrap(),
            Scalar::Float(3.5)
        );
    }

    #[test]
    fn div_by_zero_count_is_an_invariant_violation() {
        assert!(Scalar::Int(7).div_by_count(0).is_err());
    }

    #[test]
    fn attr_roundtrip_preserves_value() {
        let mut buf = [0u8; 16];
        let n = Scalar::Float(2.5).write_attr(&mut buf, false).unwrap();
        let (back, consumed) = Scalar::read_attr(&buf, ColType::Float).unwrap();
        assert_eq!(n, consumed);
        assert_eq!(back, Scalar::Float(2.5));
    }
}
