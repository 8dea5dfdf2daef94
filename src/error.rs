//! Error taxonomy for the ledger
//!
//! Lookups never fail: absence is an `Option`, a `false` or an empty collection.
//! Only malformed mandatory input, ledger-level uniqueness conflicts, broken
//! index state and import I/O surface as `LedgerError`.

#[derive(Debug)]
pub enum LedgerError {
    /// Malformed or missing mandatory field on insert/update
    Validation(String),
    /// Duplicate key rejected by a policy above the record store
    Conflict(String),
    /// Index state disagrees with the record array
    InvariantViolation(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        LedgerError::InvariantViolation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err)
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Json(err)
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::Validation(e) => write!(f, "Validation error: {}", e),
            LedgerError::Conflict(e) => write!(f, "Conflict: {}", e),
            LedgerError::InvariantViolation(e) => write!(f, "Invariant violation: {}", e),
            LedgerError::Io(e) => write!(f, "IO error: {}", e),
            LedgerError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::Io(e) => Some(e),
            LedgerError::Json(e) => Some(e),
            _ => None,
        }
    }
}
