//! Dynamic binder: builds a binding table on first use and dispatches by
//! `MethodId`.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use natbind_core::{BindError, BindResult, InterfaceDescription, MethodId, Value};

use crate::registry::LibraryRegistry;
use crate::resolver::{LibrarySpec, SymbolLookup};
use crate::table::BindingTable;

/// A callable object implementing an interface description.
///
/// Implemented by `DynamicInterface` and by generated bindings. For the
/// same description and lookup both give the same results and the same
/// errors.
pub trait NativeInterface: Send + Sync {
    /// Stable token for the method named `name`.
    fn method_id(&self, name: &str) -> BindResult<MethodId>;

    fn call(&self, id: MethodId, args: &[Value]) -> BindResult<Value>;

    fn call_by_name(&self, name: &str, args: &[Value]) -> BindResult<Value> {
        let id = self.method_id(name)?;
        self.call(id, args)
    }
}

/// Entry point for runtime binding.
pub struct DynamicBinder;

impl DynamicBinder {
    /// Bind `desc` against `lookup`.
    ///
    /// Nothing is resolved yet; the table is built on first use.
    pub fn bind(desc: InterfaceDescription, lookup: Arc<dyn SymbolLookup>) -> DynamicInterface {
        DynamicInterface {
            desc,
            lookup,
            table: OnceCell::new(),
        }
    }

    /// Resolve `spec` through `registry`, then bind.
    ///
    /// Library resolution is eager: `LibraryNotFound` is returned here.
    pub fn bind_library(
        desc: InterfaceDescription,
        spec: &LibrarySpec,
        registry: &LibraryRegistry,
    ) -> BindResult<DynamicInterface> {
        let lookup = registry.resolve(spec)?;
        Ok(Self::bind(desc, lookup))
    }
}

/// Lazily bound interface.
pub struct DynamicInterface {
    desc: InterfaceDescription,
    lookup: Arc<dyn SymbolLookup>,
    /// Built once; a failed build is kept and returned to every caller.
    table: OnceCell<BindResult<BindingTable>>,
}

impl DynamicInterface {
    /// Build the table now if it has not been built.
    pub fn ensure_bound(&self) -> BindResult<&BindingTable> {
        self.table
            .get_or_init(|| {
                let built = BindingTable::build(&self.desc, &*self.lookup);
                if let Err(e) = &built {
                    log::debug!("binding `{}` failed: {}", self.desc.name(), e);
                }
                built
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The table, if it has been built successfully.
    pub fn table(&self) -> Option<&BindingTable> {
        self.table.get().and_then(|r| r.as_ref().ok())
    }

    pub fn description(&self) -> &InterfaceDescription {
        &self.desc
    }

    pub fn lookup(&self) -> &Arc<dyn SymbolLookup> {
        &self.lookup
    }
}

impl NativeInterface for DynamicInterface {
    fn method_id(&self, name: &str) -> BindResult<MethodId> {
        self.ensure_bound()?
            .method_id(name)
            .ok_or_else(|| BindError::UnknownMethod(name.to_string()))
    }

    fn call(&self, id: MethodId, args: &[Value]) -> BindResult<Value> {
        self.ensure_bound()?.invoke(id, args)
    }
}

impl fmt::Debug for DynamicInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.table.get() {
            None => "unbound",
            Some(Ok(_)) => "bound",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("DynamicInterface")
            .field("name", &self.desc.name())
            .field("library", &self.lookup.describe())
            .field("state", &state)
            .finish()
    }
}
