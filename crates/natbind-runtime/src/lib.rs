//! # natbind-runtime
//!
//! Runtime half of natbind: opening libraries, resolving symbols and
//! calling native functions.
//!
//! - `LibraryRegistry` - opens each library once, with candidate fallback
//! - `SymbolLookup` - symbol name to `EntryPoint`
//! - `MethodBinding` / `BindingTable` - libffi call dispatch per method
//! - `DynamicBinder` - lazily bound `NativeInterface` objects
//! - `Manifest` - `natbind.toml` binding manifests
//!
//! Code produced by `natbind-codegen` refers to this crate by absolute path
//! (`::natbind_runtime::...`), so everything it needs is re-exported here.
//!
//! ```no_run
//! use natbind_runtime::{DynamicBinder, InterfaceDescription, LibrarySpec, NativeInterface, Value};
//!
//! let desc = InterfaceDescription::parse("LibC", "strlen: (string) -> i64").unwrap();
//! let lookup = natbind_runtime::resolve(&LibrarySpec::CurrentProcess).unwrap();
//! let libc = DynamicBinder::bind(desc, lookup);
//! assert_eq!(libc.call_by_name("strlen", &[Value::from("four")]).unwrap(), Value::Int64(4));
//! ```

pub mod binder;
pub mod binding;
pub mod config;
pub mod registry;
pub mod resolver;
pub mod table;

pub use binder::{DynamicBinder, DynamicInterface, NativeInterface};
pub use binding::MethodBinding;
pub use config::{Manifest, ManifestError};
pub use registry::{resolve, DlopenLoader, LibraryLoader, LibraryRegistry};
pub use resolver::{resolve_symbol, EntryPoint, LibrarySpec, SymbolLookup, SymbolTable};
pub use table::BindingTable;

pub use natbind_core::{arena, convert};
pub use natbind_core::{
    BindError, BindResult, BindingPlan, CallArena, CallShape, Handle, InterfaceDescription,
    MethodId, NativeLayout, PointerSlot, SemanticType, Signature, Value,
};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::OnceCell;
}
