//! Library registry: opens native libraries once and applies the
//! candidate fallback policy.
//!
//! Libraries are opened through a `LibraryLoader`. The default loader uses
//! `libloading`; tests inject their own. Each distinct library identifier is
//! opened at most once per registry and stays loaded for the registry's
//! lifetime. Failed opens are not cached.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Arc;

use libloading::Library;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;

use natbind_core::{BindError, BindResult};

use crate::resolver::{EntryPoint, LibrarySpec, SymbolLookup};

/// Opens libraries by identifier.
pub trait LibraryLoader: Send + Sync {
    /// Open the library `name`. The error string is kept verbatim in
    /// `LibraryNotFound`.
    fn open(&self, name: &str) -> Result<Arc<dyn SymbolLookup>, String>;

    /// Symbols of the running process.
    fn open_process(&self) -> Result<Arc<dyn SymbolLookup>, String>;
}

// =============================================================================
// dlopen-backed loader
// =============================================================================

/// A library opened through `libloading`.
pub struct LoadedLibrary {
    name: String,
    lib: Library,
}

impl LoadedLibrary {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SymbolLookup for LoadedLibrary {
    fn find(&self, name: &str) -> Option<EntryPoint> {
        // The symbol's own address, not a value stored at it.
        let sym = unsafe { self.lib.get::<*const c_void>(name.as_bytes()) }.ok()?;
        Some(EntryPoint::from_ptr(*sym))
    }

    fn describe(&self) -> &str {
        &self.name
    }
}

/// Default loader: `dlopen` / `LoadLibrary` via `libloading`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DlopenLoader;

impl LibraryLoader for DlopenLoader {
    fn open(&self, name: &str) -> Result<Arc<dyn SymbolLookup>, String> {
        let lib = unsafe { Library::new(name) }.map_err(|e| e.to_string())?;
        Ok(Arc::new(LoadedLibrary {
            name: name.to_string(),
            lib,
        }))
    }

    fn open_process(&self) -> Result<Arc<dyn SymbolLookup>, String> {
        #[cfg(unix)]
        let lib: Library = libloading::os::unix::Library::this().into();
        #[cfg(windows)]
        let lib: Library = libloading::os::windows::Library::this()
            .map_err(|e| e.to_string())?
            .into();

        Ok(Arc::new(LoadedLibrary {
            name: PROCESS_KEY.to_string(),
            lib,
        }))
    }
}

// =============================================================================
// Registry
// =============================================================================

const PROCESS_KEY: &str = "<current process>";

type Slot = Arc<OnceCell<Arc<dyn SymbolLookup>>>;

/// Memoizing front end over a `LibraryLoader`.
pub struct LibraryRegistry {
    loader: Box<dyn LibraryLoader>,
    opened: Mutex<HashMap<String, Slot>>,
}

static GLOBAL: Lazy<LibraryRegistry> = Lazy::new(LibraryRegistry::new);

impl LibraryRegistry {
    /// Registry backed by `DlopenLoader`.
    pub fn new() -> Self {
        Self::with_loader(DlopenLoader)
    }

    pub fn with_loader(loader: impl LibraryLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            opened: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry used by generated entry points.
    pub fn global() -> &'static LibraryRegistry {
        &GLOBAL
    }

    /// Resolve `spec` to a symbol lookup.
    ///
    /// Candidates are tried in order and the first one that opens wins. If
    /// none opens, the error names the first candidate and carries its
    /// failure, not the last one's.
    pub fn resolve(&self, spec: &LibrarySpec) -> BindResult<Arc<dyn SymbolLookup>> {
        match spec {
            LibrarySpec::CurrentProcess => self
                .open_once(PROCESS_KEY, || self.loader.open_process())
                .map_err(|reason| BindError::LibraryNotFound {
                    library: PROCESS_KEY.to_string(),
                    reason,
                }),
            LibrarySpec::Candidates(names) => self.resolve_candidates(names),
        }
    }

    fn resolve_candidates(&self, names: &[String]) -> BindResult<Arc<dyn SymbolLookup>> {
        let mut first_error: Option<(String, String)> = None;

        for name in names {
            match self.open_once(name, || self.loader.open(name)) {
                Ok(lookup) => return Ok(lookup),
                Err(reason) => {
                    log::warn!("failed to open library `{}`: {}", name, reason);
                    if first_error.is_none() {
                        first_error = Some((name.clone(), reason));
                    }
                }
            }
        }

        let (library, reason) = first_error.unwrap_or_else(|| {
            ("[]".to_string(), "no candidate libraries given".to_string())
        });
        Err(BindError::LibraryNotFound { library, reason })
    }

    fn open_once<F>(&self, key: &str, open: F) -> Result<Arc<dyn SymbolLookup>, String>
    where
        F: FnOnce() -> Result<Arc<dyn SymbolLookup>, String>,
    {
        // Map lock is released before the open runs.
        let slot = self.opened.lock().entry(key.to_string()).or_default().clone();
        let result = slot
            .get_or_try_init(|| {
                let lookup = open()?;
                log::debug!("opened library `{}`", key);
                Ok(lookup)
            })
            .map(Arc::clone);

        if result.is_err() {
            self.forget_failed(key, &slot);
        }
        result
    }

    /// Drop an empty slot left by a failed open, unless another caller
    /// holds it.
    fn forget_failed(&self, key: &str, slot: &Slot) {
        let mut map = self.opened.lock();
        let unused = map.get(key).map_or(false, |current| {
            Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2 && slot.get().is_none()
        });
        if unused {
            map.remove(key);
        }
    }

    /// Identifiers of the libraries opened so far, sorted.
    pub fn opened(&self) -> Vec<String> {
        let map = self.opened.lock();
        let mut names: Vec<String> = map
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve `spec` through the process-wide registry.
pub fn resolve(spec: &LibrarySpec) -> BindResult<Arc<dyn SymbolLookup>> {
    LibraryRegistry::global().resolve(spec)
}
