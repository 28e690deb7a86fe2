//! Row representations: the mutable self-describing `Record`, the
//! table-tagged `JoinRecord` for sort-merge join, and prefix-cached
//! `SortKey` handles.

mod join;
mod row;
mod sort;

pub use join::{JoinRecord, FOREIGN_ID, PRIMARY_ID};
pub use row::Record;
pub use sort::SortKey;
