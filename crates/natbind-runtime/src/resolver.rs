//! Symbol lookup: from a symbol name to a native entry point.

use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;

use natbind_core::{BindError, BindResult};

/// Address of a resolved native function.
///
/// The address is stored as an integer so resolved tables are `Send + Sync`.
/// It can be zero: a weak symbol that no loaded object defines resolves to
/// null, and calling it fails with `NativeCallFailed`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryPoint(usize);

impl EntryPoint {
    pub fn from_ptr(ptr: *const c_void) -> Self {
        EntryPoint(ptr as usize)
    }

    pub fn addr(self) -> usize {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The address to call, or `NativeCallFailed` if there is none.
    pub fn callable(self, symbol: &str) -> BindResult<*const c_void> {
        if self.is_null() {
            return Err(BindError::native_call_failed(
                symbol,
                "entry point resolved to a null address",
            ));
        }
        Ok(self.0 as *const c_void)
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryPoint({:#x})", self.0)
    }
}

/// Symbol name to entry point, for one opened library (or the process).
///
/// `find` either returns the symbol's address or `None`; it never resolves
/// partially and returns the same address for the same name every time.
pub trait SymbolLookup: Send + Sync {
    fn find(&self, name: &str) -> Option<EntryPoint>;

    /// Human-readable origin, used in `SymbolNotBound` errors.
    fn describe(&self) -> &str;
}

impl fmt::Debug for dyn SymbolLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolLookup({})", self.describe())
    }
}

/// Resolve `name` or fail with `SymbolNotBound`.
///
/// Both binders resolve through this function, so they fail identically.
pub fn resolve_symbol(lookup: &dyn SymbolLookup, name: &str) -> BindResult<EntryPoint> {
    match lookup.find(name) {
        Some(entry) => Ok(entry),
        None => Err(BindError::symbol_not_bound(name, lookup.describe())),
    }
}

/// Where symbols come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LibrarySpec {
    /// Symbols already loaded into the running process.
    CurrentProcess,
    /// Ordered candidate library identifiers; the first that opens wins.
    Candidates(Vec<String>),
}

impl LibrarySpec {
    pub fn candidates<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LibrarySpec::Candidates(names.into_iter().map(Into::into).collect())
    }

    /// Registry key and display name.
    pub fn key(&self) -> String {
        match self {
            LibrarySpec::CurrentProcess => "<current process>".to_string(),
            LibrarySpec::Candidates(names) => format!("[{}]", names.join(", ")),
        }
    }
}

impl fmt::Display for LibrarySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// In-memory lookup over explicitly registered entry points.
///
/// Used to bind functions that are linked into the program itself.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    name: String,
    symbols: HashMap<String, EntryPoint>,
}

impl SymbolTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbols: HashMap::new(),
        }
    }

    pub fn insert(&mut self, symbol: impl Into<String>, addr: *const c_void) -> &mut Self {
        self.symbols.insert(symbol.into(), EntryPoint::from_ptr(addr));
        self
    }

    /// Builder-style `insert`.
    pub fn with(mut self, symbol: impl Into<String>, addr: *const c_void) -> Self {
        self.insert(symbol, addr);
        self
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolLookup for SymbolTable {
    fn find(&self, name: &str) -> Option<EntryPoint> {
        self.symbols.get(name).copied()
    }

    fn describe(&self) -> &str {
        &self.name
    }
}
