//! Group-by aggregation: group identity tracking, tagged aggregate
//! accumulators, and the encrypted aggregator state machine.

mod aggregator;
mod func;
mod group;

pub use aggregator::Aggregator;
pub use func::{AggFn, AggState};
pub use group::GroupKey;
