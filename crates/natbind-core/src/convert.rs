//! Down- and up-converters shared by both binders.
//!
//! The dynamic dispatcher and the generated stubs call exactly these
//! functions, in the same order: arity check, per-argument kind check,
//! down-conversion into a `CallArena`, native call, up-conversion. That is
//! what makes the two paths agree on values and on failures.

use std::ffi::{c_void, CStr};
use std::os::raw::c_char;

use crate::arena::CallArena;
use crate::error::{BindError, BindResult};
use crate::handle::Handle;
use crate::types::{NativeLayout, SemanticType};
use crate::value::Value;

/// A managed argument that passed its kind check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedArg<'a> {
    Int32(i32),
    Int64(i64),
    Str(Option<&'a str>),
    Handle(Option<Handle>),
}

/// A down-converted argument, ready for the native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeValue {
    Int32(i32),
    Int64(i64),
    Pointer(*const c_void),
}

/// Raw native return value, shaped by the return layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawReturn {
    Void,
    Int32(i32),
    Int64(i64),
    Pointer(*const c_void),
}

impl RawReturn {
    pub fn layout(&self) -> NativeLayout {
        match self {
            RawReturn::Void => NativeLayout::Void,
            RawReturn::Int32(_) => NativeLayout::Int32,
            RawReturn::Int64(_) => NativeLayout::Int64,
            RawReturn::Pointer(_) => NativeLayout::Pointer,
        }
    }
}

// =============================================================================
// Argument checks
// =============================================================================

pub fn check_arity(symbol: &str, expected: usize, args: &[Value]) -> BindResult<()> {
    if args.len() != expected {
        return Err(BindError::ArityMismatch {
            symbol: symbol.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn mismatch(symbol: &str, position: usize, expected: SemanticType, found: &Value) -> BindError {
    BindError::ArgumentMismatch {
        symbol: symbol.to_string(),
        position,
        expected,
        found: found.kind(),
    }
}

fn arg_at<'a>(symbol: &str, args: &'a [Value], position: usize) -> BindResult<&'a Value> {
    args.get(position).ok_or_else(|| BindError::ArityMismatch {
        symbol: symbol.to_string(),
        expected: position + 1,
        found: args.len(),
    })
}

pub fn arg_i32(symbol: &str, args: &[Value], position: usize) -> BindResult<i32> {
    let value = arg_at(symbol, args, position)?;
    value
        .as_i32()
        .ok_or_else(|| mismatch(symbol, position, SemanticType::Int32, value))
}

pub fn arg_i64(symbol: &str, args: &[Value], position: usize) -> BindResult<i64> {
    let value = arg_at(symbol, args, position)?;
    value
        .as_i64()
        .ok_or_else(|| mismatch(symbol, position, SemanticType::Int64, value))
}

pub fn arg_string<'a>(symbol: &str, args: &'a [Value], position: usize) -> BindResult<Option<&'a str>> {
    match arg_at(symbol, args, position)? {
        Value::Null => Ok(None),
        Value::Str(s) => Ok(Some(s)),
        other => Err(mismatch(symbol, position, SemanticType::NativeString, other)),
    }
}

pub fn arg_handle(symbol: &str, args: &[Value], position: usize) -> BindResult<Option<Handle>> {
    match arg_at(symbol, args, position)? {
        Value::Null => Ok(None),
        Value::Handle(h) => Ok(Some(*h)),
        other => Err(mismatch(symbol, position, SemanticType::Handle, other)),
    }
}

/// Kind-check the argument at `position` against `ty`.
pub fn extract<'a>(
    symbol: &str,
    args: &'a [Value],
    position: usize,
    ty: SemanticType,
) -> BindResult<ManagedArg<'a>> {
    match ty {
        SemanticType::Int32 => arg_i32(symbol, args, position).map(ManagedArg::Int32),
        SemanticType::Int64 => arg_i64(symbol, args, position).map(ManagedArg::Int64),
        SemanticType::NativeString => arg_string(symbol, args, position).map(ManagedArg::Str),
        SemanticType::Handle => arg_handle(symbol, args, position).map(ManagedArg::Handle),
        SemanticType::Void => {
            let value = arg_at(symbol, args, position)?;
            Err(mismatch(symbol, position, ty, value))
        }
    }
}

// =============================================================================
// Down-conversion
// =============================================================================

/// `None` becomes the native null address, never an empty string.
pub fn down_string(arena: &mut CallArena, s: Option<&str>) -> BindResult<*const c_char> {
    match s {
        None => Ok(std::ptr::null()),
        Some(s) => arena.alloc_str(s),
    }
}

/// The stored address, unchanged; `None` becomes null.
pub fn down_handle(h: Option<Handle>) -> *mut c_void {
    h.map_or(std::ptr::null_mut(), Handle::as_ptr)
}

pub fn lower(arg: ManagedArg<'_>, arena: &mut CallArena) -> BindResult<NativeValue> {
    Ok(match arg {
        ManagedArg::Int32(v) => NativeValue::Int32(v),
        ManagedArg::Int64(v) => NativeValue::Int64(v),
        ManagedArg::Str(s) => NativeValue::Pointer(down_string(arena, s)? as *const c_void),
        ManagedArg::Handle(h) => NativeValue::Pointer(down_handle(h) as *const c_void),
    })
}

// =============================================================================
// Up-conversion
// =============================================================================

/// Copy a native nul-terminated string into a managed string.
///
/// The native buffer is not freed; its ownership stays with the library.
/// Bytes that are not valid UTF-8 are replaced, with a warning.
///
/// # Safety
/// `ptr` must be null or point to a nul-terminated byte sequence that stays
/// valid for the duration of this call.
pub unsafe fn up_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let raw = CStr::from_ptr(ptr);
    match raw.to_str() {
        Ok(s) => Some(s.to_owned()),
        Err(e) => {
            log::warn!(
                "native string at {:p} is not valid UTF-8 ({}), replacing invalid bytes",
                ptr,
                e
            );
            Some(raw.to_string_lossy().into_owned())
        }
    }
}

pub fn up_handle(ptr: *mut c_void) -> Option<Handle> {
    Handle::from_raw(ptr)
}

/// Up-convert a raw return value of type `ty` from a call to `symbol`.
///
/// A raw value whose layout is not `ty.layout()` is `NativeCallFailed`.
///
/// # Safety
/// For `NativeString`, a pointer in `raw` must satisfy `up_string`.
pub unsafe fn raise(symbol: &str, ty: SemanticType, raw: RawReturn) -> BindResult<Value> {
    let value = match ty {
        SemanticType::Void => match raw {
            RawReturn::Void => Some(Value::Void),
            _ => None,
        },
        SemanticType::Int32 => match raw {
            RawReturn::Int32(v) => Some(Value::Int32(v)),
            _ => None,
        },
        SemanticType::Int64 => match raw {
            RawReturn::Int64(v) => Some(Value::Int64(v)),
            _ => None,
        },
        SemanticType::NativeString => match raw {
            RawReturn::Pointer(p) => Some(up_string(p as *const c_char).into()),
            _ => None,
        },
        SemanticType::Handle => match raw {
            RawReturn::Pointer(p) => Some(up_handle(p as *mut c_void).into()),
            _ => None,
        },
    };
    value.ok_or_else(|| {
        BindError::native_call_failed(
            symbol,
            format!("expected a {} return, got {}", ty.layout(), raw.layout()),
        )
    })
}
