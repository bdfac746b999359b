//! Opaque handles and pointer slots.

use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicPtr, Ordering};

/// A native address passed through managed code uninterpreted.
///
/// A handle owns no memory. It is never dereferenced, validated or freed by
/// the binding layer; the consumer releases it by calling the native
/// library's matching free function. The address is stored as an integer so
/// handles can cross threads like any other plain value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroUsize);

impl Handle {
    /// Wrap a native address. Null yields `None`.
    pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(Handle)
    }

    pub fn from_addr(addr: usize) -> Option<Self> {
        NonZeroUsize::new(addr).map(Handle)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }

    pub fn addr(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:#x})", self.0)
    }
}

/// Storage for one native "out-parameter" address.
///
/// Pass `as_handle()` to a native function that writes an address through
/// its pointer argument, then `read()` the result. A slot that was never
/// written reads as `None`. The slot is allocated once and may be reused
/// across calls from the same call site; it is not a general native memory
/// API.
pub struct PointerSlot {
    cell: Box<AtomicPtr<c_void>>,
}

impl PointerSlot {
    pub fn new() -> Self {
        Self {
            cell: Box::new(AtomicPtr::new(std::ptr::null_mut())),
        }
    }

    /// Address of the slot itself, to be passed as a `Handle` argument.
    pub fn as_handle(&self) -> Handle {
        let addr = &*self.cell as *const AtomicPtr<c_void> as usize;
        // A boxed value never lives at address zero.
        Handle(NonZeroUsize::new(addr).unwrap_or(NonZeroUsize::MIN))
    }

    /// The address native code wrote into the slot, if any.
    pub fn read(&self) -> Option<Handle> {
        Handle::from_raw(self.cell.load(Ordering::Acquire))
    }

    /// Reset to "no handle" before reuse.
    pub fn clear(&self) {
        self.cell.store(std::ptr::null_mut(), Ordering::Release);
    }
}

impl Default for PointerSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PointerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerSlot")
            .field("at", &self.as_handle())
            .field("value", &self.read())
            .finish()
    }
}
