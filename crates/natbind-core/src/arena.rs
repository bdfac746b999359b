//! Per-call storage for native-side temporaries.
//!
//! A `CallArena` lives for exactly one native invocation. Every string
//! argument is copied into a nul-terminated buffer owned by the arena, and
//! all buffers are released when the arena is dropped, on success and on
//! every error path alike.

use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{BindError, BindResult};

/// Buffers currently owned by live arenas, process-wide.
static LIVE_BUFFERS: AtomicUsize = AtomicUsize::new(0);

/// Number of arena buffers not yet released, across all threads.
///
/// Meant for leak checks in tests and diagnostics.
pub fn live_buffers() -> usize {
    LIVE_BUFFERS.load(Ordering::Acquire)
}

/// Scoped allocator for the temporaries of one native call.
#[derive(Debug, Default)]
pub struct CallArena {
    buffers: Vec<CString>,
}

impl CallArena {
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
        }
    }

    /// Copy `s` into a nul-terminated buffer and return its address.
    ///
    /// The address stays valid until the arena is dropped. Moving the arena
    /// does not move the buffers.
    pub fn alloc_str(&mut self, s: &str) -> BindResult<*const c_char> {
        let buf = CString::new(s).map_err(|e| BindError::InteriorNul {
            offset: e.nul_position(),
        })?;
        let ptr = buf.as_ptr();
        self.buffers.push(buf);
        LIVE_BUFFERS.fetch_add(1, Ordering::AcqRel);
        Ok(ptr)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Total bytes held, terminators included.
    pub fn allocated_bytes(&self) -> usize {
        self.buffers
            .iter()
            .map(|b| b.as_bytes_with_nul().len())
            .sum()
    }
}

impl Drop for CallArena {
    fn drop(&mut self) {
        if !self.buffers.is_empty() {
            LIVE_BUFFERS.fetch_sub(self.buffers.len(), Ordering::AcqRel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_alloc_str_is_nul_terminated() {
        let mut arena = CallArena::new();
        let p = arena.alloc_str("rpmdb").unwrap();
        let back = unsafe { CStr::from_ptr(p) };
        assert_eq!(back.to_bytes(), b"rpmdb");
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.allocated_bytes(), 6);
    }

    #[test]
    fn test_pointers_survive_growth_and_moves() {
        let mut arena = CallArena::new();
        let first = arena.alloc_str("first").unwrap();
        for i in 0..64 {
            arena.alloc_str(&format!("filler-{}", i)).unwrap();
        }
        let moved = arena;
        assert_eq!(unsafe { CStr::from_ptr(first) }.to_str().unwrap(), "first");
        assert_eq!(moved.len(), 65);
    }

    #[test]
    fn test_interior_nul_rejected() {
        let mut arena = CallArena::new();
        let err = arena.alloc_str("ab\0cd").unwrap_err();
        assert_eq!(err, BindError::InteriorNul { offset: 2 });
        assert!(arena.is_empty());
    }

    #[test]
    fn test_empty_string() {
        let mut arena = CallArena::new();
        let p = arena.alloc_str("").unwrap();
        assert_eq!(unsafe { *p }, 0);
    }
}
