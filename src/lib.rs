//! # sealdb - In-Enclave Tuple Engine
//!
//! sealdb is the tuple engine of an oblivious, encrypted SQL operator
//! library. It runs inside a trusted execution environment: the host
//! hands it opaque encrypted byte buffers, and inside the enclave the
//! engine decodes them into rows that relational primitives (sort
//! support, sort-merge join, group-by aggregation) operate on before the
//! results are re-encrypted. Every output block is tagged with the task
//! that produced it so downstream operators can attest the provenance of
//! their inputs.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │       Host buffers (opaque ciphertext)        │
//! ├───────────────────────────────────────────────┤
//! │  Block framing (bulk / stream / per-row)      │
//! │  header-as-AAD, lineage task IDs              │
//! ├───────────────────────────────────────────────┤
//! │  Rows: Record, JoinRecord, SortKey            │
//! ├───────────────────────────────────────────────┤
//! │  Operators: opcode catalog, GroupKey,         │
//! │  AggState, Aggregator                         │
//! ├───────────────────────────────────────────────┤
//! │  Attribute codec + AES-GCM cipher             │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Design Constraints
//!
//! - **Fixed capacities**: rows, aggregator state and blocks live in
//!   buffers of compile-time size (`ROW_UPPER_BOUND`, `AGG_UPPER_BOUND`,
//!   `MAX_BLOCK_SIZE`); blocks pad rows to their schema upper bound so
//!   ciphertext lengths leak only row counts
//! - **Single-threaded**: one enclave call runs one operator pass to
//!   completion, no suspension points, no shared state
//! - **Fail-fast**: every error aborts the enclosing call with one of
//!   seven attestable error codes
//!
//! ## Module Overview
//!
//! - [`types`]: attribute wire codec, typed comparisons, key prefixes
//! - [`record`]: mutable row buffers and join/sort wrappers
//! - [`agg`]: group-by aggregation state machine
//! - [`block`]: encrypted block framing in three variants
//! - [`crypto`]: AES-GCM cipher and its streaming front
//! - [`opcode`]: operator catalog and lineage task IDs
//! - [`verify`]: lineage sink consumed by the DAG verifier
//! - [`config`]: fixed capacities shared by everything above

pub mod agg;
pub mod block;
pub mod config;
pub mod crypto;
pub mod error;
pub mod opcode;
pub mod record;
pub mod types;
pub mod verify;

pub use agg::{AggFn, AggState, Aggregator, GroupKey};
pub use block::{
    BlockHeader, IndividualRowReader, IndividualRowWriter, RowReader, RowWriter,
    StreamRowReader, StreamRowWriter,
};
pub use error::{EngineError, Result};
pub use opcode::OpCode;
pub use record::{JoinRecord, Record, SortKey};
pub use types::{AttrType, ColType, Scalar};
pub use verify::VerifySet;
