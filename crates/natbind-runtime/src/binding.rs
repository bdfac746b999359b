//! Method binding: one resolved native function plus its call descriptor.
//!
//! Calls go through libffi with a `Cif` prepared once from the method's
//! layouts. Argument checks and conversions are the shared ones from
//! `natbind_core::convert`.

use std::ffi::c_void;
use std::fmt;

use libffi::middle::{arg, Arg, Cif, CodePtr, Type};

use natbind_core::convert::{self, NativeValue, RawReturn};
use natbind_core::{BindResult, CallArena, CallShape, MethodId, MethodPlan, NativeLayout, Value};

use crate::resolver::EntryPoint;

/// Prepared libffi call descriptor.
struct CallDescriptor(Cif);

// SAFETY: the Cif is read-only after construction.
unsafe impl Send for CallDescriptor {}
unsafe impl Sync for CallDescriptor {}

fn ffi_type(layout: NativeLayout) -> Type {
    match layout {
        NativeLayout::Void => Type::void(),
        NativeLayout::Int32 => Type::i32(),
        NativeLayout::Int64 => Type::i64(),
        NativeLayout::Pointer => Type::pointer(),
    }
}

/// One bound method. Immutable once built.
pub struct MethodBinding {
    plan: MethodPlan,
    entry: EntryPoint,
    descriptor: CallDescriptor,
}

impl MethodBinding {
    pub fn new(plan: MethodPlan, entry: EntryPoint) -> Self {
        let params = plan.params.iter().map(|p| ffi_type(p.layout()));
        let cif = Cif::new(params, ffi_type(plan.ret.layout()));
        Self {
            plan,
            entry,
            descriptor: CallDescriptor(cif),
        }
    }

    pub fn id(&self) -> MethodId {
        self.plan.id
    }

    pub fn symbol(&self) -> &str {
        &self.plan.symbol
    }

    pub fn plan(&self) -> &MethodPlan {
        &self.plan
    }

    pub fn entry(&self) -> EntryPoint {
        self.entry
    }

    pub fn shape(&self) -> CallShape {
        self.plan.shape()
    }

    /// Check, down-convert, call, up-convert.
    ///
    /// Every argument is kind-checked before any is converted, so a
    /// mismatch never allocates. The call arena is released on every path.
    pub fn invoke(&self, args: &[Value]) -> BindResult<Value> {
        let symbol = self.plan.symbol.as_str();
        convert::check_arity(symbol, self.plan.arity(), args)?;

        let managed = self
            .plan
            .params
            .iter()
            .enumerate()
            .map(|(i, ty)| convert::extract(symbol, args, i, *ty))
            .collect::<BindResult<Vec<_>>>()?;

        let mut arena = CallArena::new();
        let lowered = managed
            .into_iter()
            .map(|a| convert::lower(a, &mut arena))
            .collect::<BindResult<Vec<_>>>()?;

        let func = self.entry.callable(symbol)?;
        log::trace!(
            "call {} at {:p} with {} argument(s), {} arena buffer(s)",
            symbol,
            func,
            lowered.len(),
            arena.len()
        );

        let value = unsafe {
            let raw = self.call_raw(func, &lowered);
            convert::raise(symbol, self.plan.ret, raw)
        };
        drop(arena);
        value
    }

    /// # Safety
    /// `func` must be a function whose C signature matches the plan.
    unsafe fn call_raw(&self, func: *const c_void, lowered: &[NativeValue]) -> RawReturn {
        let args: Vec<Arg> = lowered
            .iter()
            .map(|v| match v {
                NativeValue::Int32(x) => arg(x),
                NativeValue::Int64(x) => arg(x),
                NativeValue::Pointer(p) => arg(p),
            })
            .collect();
        let code = CodePtr::from_ptr(func);
        let cif = &self.descriptor.0;

        match self.plan.ret.layout() {
            NativeLayout::Void => {
                cif.call::<()>(code, &args);
                RawReturn::Void
            }
            // libffi widens small integer returns to a full register.
            NativeLayout::Int32 => RawReturn::Int32(cif.call::<libffi::raw::ffi_arg>(code, &args) as i32),
            NativeLayout::Int64 => RawReturn::Int64(cif.call::<i64>(code, &args)),
            NativeLayout::Pointer => {
                RawReturn::Pointer(cif.call::<*mut c_void>(code, &args) as *const c_void)
            }
        }
    }
}

impl fmt::Debug for MethodBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBinding")
            .field("id", &self.plan.id)
            .field("symbol", &self.plan.symbol)
            .field("shape", &self.plan.shape().to_string())
            .field("entry", &self.entry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use natbind_core::{BindError, Handle, SemanticType};
    use std::ffi::CStr;
    use std::os::raw::c_char;

    extern "C" fn add(a: i32, b: i32) -> i32 {
        a.wrapping_add(b)
    }

    extern "C" fn widen(a: i32, b: i64) -> i64 {
        a as i64 * b
    }

    extern "C" fn len_or_minus_one(s: *const c_char) -> i32 {
        if s.is_null() {
            return -1;
        }
        unsafe { CStr::from_ptr(s) }.to_bytes().len() as i32
    }

    extern "C" fn identity(p: *mut c_void) -> *mut c_void {
        p
    }

    extern "C" fn nothing() {}

    fn method(symbol: &str, params: &[SemanticType], ret: SemanticType, func: *const c_void) -> MethodBinding {
        let plan = MethodPlan {
            id: MethodId::new(0),
            symbol: symbol.to_string(),
            params: params.to_vec(),
            ret,
        };
        MethodBinding::new(plan, EntryPoint::from_ptr(func))
    }

    #[test]
    fn test_invoke_int32() {
        let m = method(
            "add",
            &[SemanticType::Int32, SemanticType::Int32],
            SemanticType::Int32,
            add as *const c_void,
        );
        assert_eq!(m.invoke(&[Value::Int32(40), Value::Int32(2)]).unwrap(), Value::Int32(42));
        assert_eq!(
            m.invoke(&[Value::Int32(-5), Value::Int32(-7)]).unwrap(),
            Value::Int32(-12)
        );
    }

    #[test]
    fn test_invoke_mixed_widths() {
        let m = method(
            "widen",
            &[SemanticType::Int32, SemanticType::Int64],
            SemanticType::Int64,
            widen as *const c_void,
        );
        assert_eq!(
            m.invoke(&[Value::Int32(3), Value::Int64(1 << 40)]).unwrap(),
            Value::Int64(3 << 40)
        );
    }

    #[test]
    fn test_invoke_string_and_null() {
        let m = method(
            "len",
            &[SemanticType::NativeString],
            SemanticType::Int32,
            len_or_minus_one as *const c_void,
        );
        assert_eq!(m.invoke(&[Value::from("hello")]).unwrap(), Value::Int32(5));
        assert_eq!(m.invoke(&[Value::from("")]).unwrap(), Value::Int32(0));
        assert_eq!(m.invoke(&[Value::Null]).unwrap(), Value::Int32(-1));
    }

    #[test]
    fn test_invoke_handle_round_trip() {
        let m = method(
            "identity",
            &[SemanticType::Handle],
            SemanticType::Handle,
            identity as *const c_void,
        );
        let h = Handle::from_addr(0xdead_beef).unwrap();
        assert_eq!(m.invoke(&[Value::Handle(h)]).unwrap(), Value::Handle(h));
        assert_eq!(m.invoke(&[Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_invoke_void() {
        let m = method("nothing", &[], SemanticType::Void, nothing as *const c_void);
        assert_eq!(m.invoke(&[]).unwrap(), Value::Void);
    }

    #[test]
    fn test_precondition_failures() {
        let m = method(
            "add",
            &[SemanticType::Int32, SemanticType::Int32],
            SemanticType::Int32,
            add as *const c_void,
        );
        assert!(matches!(
            m.invoke(&[Value::Int32(1)]),
            Err(BindError::ArityMismatch { expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            m.invoke(&[Value::Int32(1), Value::Null]),
            Err(BindError::ArgumentMismatch { position: 1, .. })
        ));
        assert!(matches!(
            m.invoke(&[Value::Int64(1), Value::Int32(1)]),
            Err(BindError::ArgumentMismatch { position: 0, .. })
        ));
    }

    #[test]
    fn test_interior_nul_fails_before_call() {
        let m = method(
            "len",
            &[SemanticType::NativeString],
            SemanticType::Int32,
            len_or_minus_one as *const c_void,
        );
        assert_eq!(
            m.invoke(&[Value::from("a\0b")]).unwrap_err(),
            BindError::InteriorNul { offset: 1 }
        );
    }

    #[test]
    fn test_null_entry_fails() {
        let m = method("weak", &[], SemanticType::Void, std::ptr::null());
        assert!(matches!(
            m.invoke(&[]),
            Err(BindError::NativeCallFailed { .. })
        ));
    }
}
