//! Managed-side values crossing the binding layer.

use crate::handle::Handle;
use crate::types::SemanticType;

/// A managed value passed to or returned from a bound native function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Managed null; valid for `NativeString` and `Handle`.
    Null,
    Int32(i32),
    Int64(i64),
    Str(String),
    Handle(Handle),
    /// Result of a `Void` function.
    Void,
}

impl Value {
    /// Short kind name used in argument mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int32(_) => "i32",
            Value::Int64(_) => "i64",
            Value::Str(_) => "string",
            Value::Handle(_) => "handle",
            Value::Void => "void",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value can be down-converted by `ty`.
    pub fn fits(&self, ty: SemanticType) -> bool {
        match (ty, self) {
            (SemanticType::Int32, Value::Int32(_)) => true,
            (SemanticType::Int64, Value::Int64(_)) => true,
            (SemanticType::NativeString, Value::Str(_) | Value::Null) => true,
            (SemanticType::Handle, Value::Handle(_) | Value::Null) => true,
            _ => false,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            Value::Handle(h) => Some(*h),
            _ => None,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Void
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Handle> for Value {
    fn from(h: Handle) -> Self {
        Value::Handle(h)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
