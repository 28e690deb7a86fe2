//! Typed attribute primitives: the wire codec for single column values,
//! their comparison rules, and the tagged scalars used by aggregation.

pub mod attr;
pub mod scalar;

pub use attr::{
    attr_key_prefix, attr_less_than, attrs_equal, read_attr, write_attr, AttrType,
};
pub use scalar::{ColType, Scalar};
