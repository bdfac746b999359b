//! Binding errors.

use std::fmt;

use thiserror::Error;

use crate::types::SemanticType;

/// Result alias used throughout the binding layer.
pub type BindResult<T> = Result<T, BindError>;

/// Where a type appears inside a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePosition {
    /// Zero-based parameter index.
    Param(usize),
    Return,
}

impl fmt::Display for TypePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypePosition::Param(i) => write!(f, "parameter {}", i),
            TypePosition::Return => write!(f, "return type"),
        }
    }
}

/// Errors raised while binding or calling native functions.
///
/// None of these are retried by the binding layer. The type is `Clone` so a
/// memoized bind failure can be handed back to every later caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// A signature uses a type outside the closed semantic type set.
    #[error("unsupported type `{ty}` in {position} of `{symbol}`")]
    UnsupportedType {
        symbol: String,
        position: TypePosition,
        ty: String,
    },

    /// A native symbol could not be found through the configured lookup.
    #[error("symbol `{symbol}` not found in {library}")]
    SymbolNotBound { symbol: String, library: String },

    /// None of the candidate libraries could be opened.
    /// Carries the error of the first candidate.
    #[error("unable to open library `{library}`: {reason}")]
    LibraryNotFound { library: String, reason: String },

    /// The native call itself could not be completed.
    #[error("native call to `{symbol}` failed: {reason}")]
    NativeCallFailed { symbol: String, reason: String },

    /// Wrong number of arguments for a bound method.
    #[error("`{symbol}` expects {expected} argument(s), got {found}")]
    ArityMismatch {
        symbol: String,
        expected: usize,
        found: usize,
    },

    /// An argument cannot be down-converted by the type at its position.
    #[error("argument {position} of `{symbol}`: expected {expected}, found {found}")]
    ArgumentMismatch {
        symbol: String,
        position: usize,
        expected: SemanticType,
        found: &'static str,
    },

    /// A managed string with an embedded zero byte.
    #[error("string argument contains a NUL byte at offset {offset}")]
    InteriorNul { offset: usize },

    /// Two signatures in one interface share a name.
    #[error("duplicate method `{0}` in interface")]
    DuplicateMethod(String),

    /// A method name that is not a plain ASCII identifier.
    #[error("invalid symbol name `{0}`")]
    InvalidSymbolName(String),

    /// Dispatch by a name or id the interface does not define.
    #[error("no method `{0}` in interface")]
    UnknownMethod(String),
}

impl BindError {
    pub fn symbol_not_bound(symbol: &str, library: &str) -> Self {
        BindError::SymbolNotBound {
            symbol: symbol.to_string(),
            library: library.to_string(),
        }
    }

    pub fn native_call_failed(symbol: &str, reason: impl Into<String>) -> Self {
        BindError::NativeCallFailed {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the errors raised while building a binding table,
    /// as opposed to errors of one individual call.
    pub fn is_bind_time(&self) -> bool {
        matches!(
            self,
            BindError::UnsupportedType { .. }
                | BindError::SymbolNotBound { .. }
                | BindError::LibraryNotFound { .. }
                | BindError::DuplicateMethod(_)
                | BindError::InvalidSymbolName(_)
        )
    }
}
