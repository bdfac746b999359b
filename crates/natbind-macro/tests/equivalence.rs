//! The generated binding and the dynamic binder behave identically.

use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use natbind_macro::natbind_interface;
use natbind_runtime::{
    BindError, BindResult, DynamicBinder, DynamicInterface, Handle, InterfaceDescription,
    MethodId, NativeInterface, PointerSlot, SymbolLookup, SymbolTable, Value,
};

natbind_interface! {
    name = Equiv,
    path = "tests/equiv.ffi",
    entry = crate::shared_lookup(),
}

const SIGNATURES: &str = include_str!("equiv.ffi");

// =============================================================================
// Native side
// =============================================================================

extern "C" fn nb_add(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

extern "C" fn nb_widen(a: i32, b: i64) -> i64 {
    (a as i64).wrapping_mul(b)
}

extern "C" fn nb_len(s: *const c_char) -> i32 {
    if s.is_null() {
        return -1;
    }
    unsafe { CStr::from_ptr(s) }.to_bytes().len() as i32
}

extern "C" fn nb_echo(s: *const c_char) -> *const c_char {
    s
}

extern "C" fn nb_identity(p: *mut c_void) -> *mut c_void {
    p
}

static TOUCHES: AtomicUsize = AtomicUsize::new(0);

extern "C" fn nb_touch() {
    TOUCHES.fetch_add(1, Ordering::SeqCst);
}

extern "C" fn nb_fill(slot: *mut *mut c_void, value: i64) -> i32 {
    if slot.is_null() {
        return -1;
    }
    unsafe { *slot = value as usize as *mut c_void };
    0
}

extern "C" fn nb_greeting(which: i32) -> *const c_char {
    match which {
        0 => b"hello\0".as_ptr() as *const c_char,
        1 => b"\0".as_ptr() as *const c_char,
        _ => std::ptr::null(),
    }
}

fn natives() -> Vec<(&'static str, *const c_void)> {
    vec![
        ("nb_add", nb_add as *const c_void),
        ("nb_widen", nb_widen as *const c_void),
        ("nb_len", nb_len as *const c_void),
        ("nb_echo", nb_echo as *const c_void),
        ("nb_identity", nb_identity as *const c_void),
        ("nb_touch", nb_touch as *const c_void),
        ("nb_fill", nb_fill as *const c_void),
        ("nb_greeting", nb_greeting as *const c_void),
    ]
}

fn lookup_without(skip: &[&str]) -> SymbolTable {
    let mut table = SymbolTable::new("equiv");
    for (name, addr) in natives() {
        if !skip.contains(&name) {
            table.insert(name, addr);
        }
    }
    table
}

fn lookup() -> SymbolTable {
    lookup_without(&[])
}

pub fn shared_lookup() -> BindResult<Arc<dyn SymbolLookup>> {
    Ok(Arc::new(lookup()))
}

fn dynamic(lookup: SymbolTable) -> DynamicInterface {
    let desc = InterfaceDescription::parse("Equiv", SIGNATURES).unwrap();
    DynamicBinder::bind(desc, Arc::new(lookup))
}

// =============================================================================
// Tests
// =============================================================================

fn cases() -> Vec<(&'static str, Vec<Value>)> {
    let h = Value::Handle(Handle::from_addr(0x5000).unwrap());
    vec![
        ("nb_add", vec![Value::Int32(2), Value::Int32(40)]),
        ("nb_add", vec![Value::Int32(i32::MAX), Value::Int32(1)]),
        ("nb_widen", vec![Value::Int32(-3), Value::Int64(1 << 33)]),
        ("nb_len", vec![Value::from("hello world")]),
        ("nb_len", vec![Value::from("")]),
        ("nb_len", vec![Value::Null]),
        ("nb_echo", vec![Value::from("round trip")]),
        ("nb_echo", vec![Value::Null]),
        ("nb_identity", vec![h.clone()]),
        ("nb_identity", vec![Value::Null]),
        ("nb_touch", vec![]),
        ("nb_greeting", vec![Value::Int32(0)]),
        ("nb_greeting", vec![Value::Int32(1)]),
        ("nb_greeting", vec![Value::Int32(2)]),
        // Failures
        ("nb_add", vec![Value::Int32(1)]),
        ("nb_add", vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]),
        ("nb_add", vec![Value::Null, Value::Int32(1)]),
        ("nb_add", vec![Value::Int32(1), Value::Int64(1)]),
        ("nb_widen", vec![Value::Int32(1), Value::Int32(1)]),
        ("nb_len", vec![h.clone()]),
        ("nb_len", vec![Value::from("nul\0inside")]),
        ("nb_identity", vec![Value::from("not a handle")]),
        ("nb_touch", vec![Value::Void]),
        ("nb_missing", vec![]),
    ]
}

#[test]
fn test_same_results_and_errors() {
    let dynamic = dynamic(lookup());
    let generated = Equiv::bind(&lookup()).unwrap();

    for (method, args) in cases() {
        let d = dynamic.call_by_name(method, &args);
        let g = generated.call_by_name(method, &args);
        assert_eq!(d, g, "{} {:?}", method, args);
    }
}

#[test]
fn test_expected_values() {
    let generated = Equiv::bind(&lookup()).unwrap();
    assert_eq!(
        generated.call_by_name("nb_add", &[Value::Int32(2), Value::Int32(40)]),
        Ok(Value::Int32(42))
    );
    assert_eq!(
        generated.call_by_name("nb_echo", &[Value::from("round trip")]),
        Ok(Value::from("round trip"))
    );
    assert_eq!(
        generated.call_by_name("nb_len", &[Value::from("nul\0inside")]),
        Err(BindError::InteriorNul { offset: 3 })
    );
    assert_eq!(
        generated.call_by_name("nb_missing", &[]),
        Err(BindError::UnknownMethod("nb_missing".into()))
    );
}

#[test]
fn test_method_ids_agree() {
    let dynamic = dynamic(lookup());
    let generated = Equiv::bind(&lookup()).unwrap();

    assert_eq!(Equiv::METHODS.len(), 8);
    for (i, name) in Equiv::METHODS.iter().enumerate() {
        let id = generated.method_id(name).unwrap();
        assert_eq!(id.index(), i);
        assert_eq!(dynamic.method_id(name).unwrap(), id);
    }
    assert_eq!(Equiv::NB_ADD, MethodId::new(0));
    assert_eq!(Equiv::NB_WIDEN, MethodId::new(7));

    let bogus = MethodId::new(99);
    assert_eq!(dynamic.call(bogus, &[]), generated.call(bogus, &[]));
    assert_eq!(
        generated.call(bogus, &[]),
        Err(BindError::UnknownMethod("#99".into()))
    );
}

#[test]
fn test_typed_stubs_propagate_null() {
    let generated = Equiv::bind(&lookup()).unwrap();
    assert_eq!(generated.nb_echo(None), Ok(None));
    assert_eq!(generated.nb_echo(Some("x")), Ok(Some("x".to_string())));
    assert_eq!(generated.nb_identity(None), Ok(None));
    assert_eq!(generated.nb_len(None), Ok(-1));
    assert_eq!(generated.nb_greeting(1), Ok(Some(String::new())));
    assert_eq!(generated.nb_greeting(5), Ok(None));

    let h = Handle::from_addr(usize::MAX).unwrap();
    assert_eq!(generated.nb_identity(Some(h)), Ok(Some(h)));
}

#[test]
fn test_void_calls_reach_native_code() {
    let generated = Equiv::bind(&lookup()).unwrap();
    let dynamic = dynamic(lookup());
    let before = TOUCHES.load(Ordering::SeqCst);
    assert_eq!(generated.nb_touch(), Ok(()));
    assert_eq!(dynamic.call_by_name("nb_touch", &[]), Ok(Value::Void));
    assert!(TOUCHES.load(Ordering::SeqCst) >= before + 2);
}

#[test]
fn test_pointer_slot_both_ways() {
    let generated = Equiv::bind(&lookup()).unwrap();
    let dynamic = dynamic(lookup());

    let slot = PointerSlot::new();
    assert_eq!(slot.read(), None);
    assert_eq!(generated.nb_fill(Some(slot.as_handle()), 0x1234), Ok(0));
    assert_eq!(slot.read().map(Handle::addr), Some(0x1234));

    let slot = PointerSlot::new();
    let rc = dynamic.call_by_name("nb_fill", &[Value::Handle(slot.as_handle()), Value::Int64(0x5678)]);
    assert_eq!(rc, Ok(Value::Int32(0)));
    assert_eq!(slot.read().map(Handle::addr), Some(0x5678));

    assert_eq!(generated.nb_fill(None, 1), Ok(-1));
}

#[test]
fn test_symbol_not_bound_is_identical() {
    for missing in ["nb_add", "nb_touch", "nb_widen"] {
        let d = dynamic(lookup_without(&[missing])).ensure_bound().map(|_| ()).unwrap_err();
        let g = Equiv::bind(&lookup_without(&[missing])).map(|_| ()).unwrap_err();
        assert_eq!(d, g);
        assert_eq!(d, BindError::symbol_not_bound(missing, "equiv"));
    }

    // With several missing, both report the first in name order.
    let d = dynamic(lookup_without(&["nb_widen", "nb_echo"])).ensure_bound().map(|_| ()).unwrap_err();
    let g = Equiv::bind(&lookup_without(&["nb_widen", "nb_echo"])).map(|_| ()).unwrap_err();
    assert_eq!(d, g);
    assert_eq!(d, BindError::symbol_not_bound("nb_echo", "equiv"));
}

#[test]
fn test_null_entry_fails_identically() {
    let mut weak = lookup_without(&["nb_touch"]);
    weak.insert("nb_touch", std::ptr::null());
    let dynamic = dynamic(weak.clone());
    let generated = Equiv::bind(&weak).unwrap();

    let d = dynamic.call_by_name("nb_touch", &[]);
    let g = generated.call_by_name("nb_touch", &[]);
    assert!(matches!(d, Err(BindError::NativeCallFailed { .. })));
    assert_eq!(d, g);
}

#[test]
fn test_call_shapes_agree() {
    let dynamic = dynamic(lookup());
    let table = dynamic.ensure_bound().unwrap();
    assert_eq!(Equiv::CALL_SHAPES.to_vec(), table.call_shapes());
}

#[test]
fn test_entry_point_module() {
    assert!(equiv::binding().is_ok());
    assert_eq!(equiv::nb_add(20, 22), Ok(42));
    assert_eq!(equiv::nb_echo(Some("entry")), Ok(Some("entry".to_string())));
    assert!(std::ptr::eq(equiv::binding().unwrap(), equiv::binding().unwrap()));
}
