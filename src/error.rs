//! Error types for the store boundary and the analytics engine.

use std::path::PathBuf;

/// Errors raised by a [`DataStore`](crate::store::DataStore) when a relation
/// cannot be read.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be opened or read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The CSV header or framing is unusable (individual bad rows are skipped, not reported here).
    #[error("Malformed CSV in {path}: {source}")]
    Csv {
        /// File that failed.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Catch-all for stores that are not file-backed.
    #[error("{0}")]
    Unavailable(String),
}

/// Errors surfaced to callers of the analytics operations.
#[derive(Debug, thiserror::Error)]
pub enum IntelError {
    /// The underlying relation could not be read. Fatal for the current request.
    #[error("{operation}: data unavailable: {source}")]
    DataUnavailable {
        /// Operation that was running when the store failed.
        operation: &'static str,
        /// Store failure.
        #[source]
        source: StoreError,
    },

    /// The subject TIN has no bid history.
    #[error("Company with TIN {tin} not found")]
    NotFound {
        /// TIN that was looked up.
        tin: String,
    },

    /// Request rejected before any computation ran.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl IntelError {
    pub fn not_found(tin: &str) -> Self {
        IntelError::NotFound {
            tin: tin.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        IntelError::InvalidInput(msg.into())
    }
}

/// Attach the running operation's name to store failures.
pub trait StoreResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T, IntelError>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn during(self, operation: &'static str) -> Result<T, IntelError> {
        self.map_err(|source| IntelError::DataUnavailable { operation, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_during_annotates_operation() {
        let failed: Result<(), StoreError> = Err(StoreError::Unavailable("db down".to_string()));
        let err = failed.during("head_to_head").unwrap_err();
        assert_eq!(
            err.to_string(),
            "head_to_head: data unavailable: db down"
        );
        assert!(matches!(
            err,
            IntelError::DataUnavailable {
                operation: "head_to_head",
                ..
            }
        ));
    }

    #[test]
    fn test_not_found_message() {
        let err = IntelError::not_found("0105551234567");
        assert_eq!(err.to_string(), "Company with TIN 0105551234567 not found");
    }
}
