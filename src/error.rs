//! # Engine Error Taxonomy
//!
//! Every failure inside the tuple engine is one of seven kinds. Errors are
//! fatal to the enclosing enclave call: nothing is retried or recovered
//! locally, and the host receives a stable numeric code it can attest.
//!
//! | Kind | Meaning |
//! |------|---------|
//! | `TypeMismatch` | attribute tag differs from the reader's expected type |
//! | `IndexOutOfRange` | attribute index outside `[1, num_cols]` |
//! | `CapacityExceeded` | write past a fixed row, aggregator or block bound |
//! | `Format` | truncated buffer or inconsistent framing length |
//! | `Cipher` | authenticated encryption or decryption failed |
//! | `GroupingMismatch` | combining partial aggregates from different groups |
//! | `Invariant` | internal consistency violation (a programming error) |

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("attribute type mismatch: expected tag {expected:#04x}, found {found:#04x}")]
    TypeMismatch { expected: u8, found: u8 },

    #[error("attribute index {index} out of range for row with {num_cols} columns")]
    IndexOutOfRange { index: u32, num_cols: u32 },

    #[error("capacity exceeded: {requested} bytes requested, {capacity} available")]
    CapacityExceeded { requested: usize, capacity: usize },

    #[error("malformed framing: {0}")]
    Format(String),

    #[error("authenticated cipher operation failed")]
    Cipher,

    #[error("attempted to combine partial aggregates with different grouping attributes")]
    GroupingMismatch,

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl EngineError {
    /// Stable error code surfaced to the host across the enclave boundary.
    pub fn code(&self) -> u32 {
        match self {
            EngineError::TypeMismatch { .. } => 1,
            EngineError::IndexOutOfRange { .. } => 2,
            EngineError::CapacityExceeded { .. } => 3,
            EngineError::Format(_) => 4,
            EngineError::Cipher => 5,
            EngineError::GroupingMismatch => 6,
            EngineError::Invariant(_) => 7,
        }
    }
}

impl From<ring::error::Unspecified> for EngineError {
    fn from(_: ring::error::Unspecified) -> Self {
        EngineError::Cipher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_distinct() {
        let errors = [
            EngineError::TypeMismatch {
                expected: 1,
                found: 2,
            },
            EngineError::IndexOutOfRange {
                index: 5,
                num_cols: 3,
            },
            EngineError::CapacityExceeded {
                requested: 10,
                capacity: 4,
            },
            EngineError::Format("short".into()),
            EngineError::Cipher,
            EngineError::GroupingMismatch,
            EngineError::Invariant("count underflow".into()),
        ];
        let mut codes: Vec<u32> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
