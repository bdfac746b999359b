//! # natbind-core
//!
//! Core types for the natbind native-call binding layer.
//!
//! This crate holds everything both binders (the runtime dynamic binder and
//! the ahead-of-time source generator) must agree on:
//! - `SemanticType` / `NativeLayout` - the closed type set and its ABI shapes
//! - `Value`, `Handle`, `PointerSlot` - managed-side values
//! - `CallArena` - per-call storage for native string buffers
//! - `convert` - the down/up converters shared by both binders
//! - `InterfaceDescription` - method signatures, built in code or parsed from `.ffi` files
//! - `BindingPlan` - the ordered, validated analysis of one interface
//!
//! Nothing in this crate opens libraries or calls native code.

pub mod arena;
pub mod convert;
pub mod error;
pub mod handle;
pub mod interface;
pub mod parser;
pub mod plan;
pub mod types;
pub mod value;

pub use arena::CallArena;
pub use error::{BindError, BindResult, TypePosition};
pub use handle::{Handle, PointerSlot};
pub use interface::{InterfaceDescription, Signature};
pub use parser::ParseError;
pub use plan::{BindingPlan, MethodId, MethodPlan};
pub use types::{CallShape, NativeLayout, SemanticType, TypeSpec};
pub use value::Value;
