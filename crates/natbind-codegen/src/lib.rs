//! # natbind-codegen
//!
//! Ahead-of-time counterpart of the dynamic binder. From an interface
//! description it emits Rust source that binds the same symbols, in the same
//! order, with the same conversions and the same errors as
//! `natbind_runtime::DynamicBinder`, but with typed stubs and no libffi.
//!
//! - `generate` - bound struct, `MethodId` constants, typed stubs,
//!   `NativeInterface` impl and the `CALL_SHAPES` list
//! - `generate_entry_point` - a module of free functions over a
//!   process-wide binding, resolved through a caller-supplied expression
//! - `shapes_manifest` - the call-shape list as JSON
//!
//! Output is a pure function of the description: regenerating produces
//! byte-identical text, whatever the order of the signatures.
//!
//! No symbol is resolved here. A missing symbol surfaces when the generated
//! `bind` runs, as the same `SymbolNotBound` the dynamic binder reports.

mod emit;
mod names;
mod shapes;

use proc_macro2::TokenStream;
use thiserror::Error;

use natbind_core::{BindError, BindingPlan, InterfaceDescription};

pub use shapes::{shapes_manifest, ShapesManifest};

/// First line of every generated file.
pub const HEADER: &str = "// @generated by natbind-codegen. Do not edit.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// Planning failed: unsupported type, duplicate or invalid method name.
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("invalid interface name `{0}`")]
    InvalidName(String),

    #[error("`{0}` is reserved in generated code")]
    Reserved(String),

    #[error("`{first}` and `{second}` both generate the name `{generated}`")]
    NameCollision {
        first: String,
        second: String,
        generated: String,
    },

    #[error("invalid resolver expression `{expr}`: {reason}")]
    InvalidResolver { expr: String, reason: String },

    #[error("failed to serialize call shapes: {0}")]
    Json(String),
}

/// Emit the binding for `desc`.
pub fn generate(desc: &InterfaceDescription) -> Result<String, GenerateError> {
    let plan = BindingPlan::analyze(desc)?;
    let items = binding_items(&plan)?;
    Ok(render(plan.interface_name(), &items))
}

/// Emit the entry-point module for `desc`.
///
/// `resolver_expr` must be a Rust expression of type
/// `BindResult<Arc<dyn SymbolLookup>>`, written with absolute paths; it is
/// evaluated once, on first use. The module expects the struct emitted by
/// `generate` to be its sibling.
pub fn generate_entry_point(
    desc: &InterfaceDescription,
    resolver_expr: &str,
) -> Result<String, GenerateError> {
    let plan = BindingPlan::analyze(desc)?;
    let module = entry_items(&plan, resolver_expr)?;
    Ok(render(plan.interface_name(), &[module]))
}

/// Emit the binding and its entry-point module as one file.
pub fn generate_with_entry_point(
    desc: &InterfaceDescription,
    resolver_expr: &str,
) -> Result<String, GenerateError> {
    let plan = BindingPlan::analyze(desc)?;
    let mut items = binding_items(&plan)?;
    items.push(entry_items(&plan, resolver_expr)?);
    Ok(render(plan.interface_name(), &items))
}

fn binding_items(plan: &BindingPlan) -> Result<Vec<TokenStream>, GenerateError> {
    let ty = names::type_ident(plan.interface_name())?;
    let method_names = emit::method_names(plan)?;
    Ok(vec![
        emit::bound_struct(plan, &ty, &method_names),
        emit::inherent_impl(plan, &ty, &method_names),
        emit::interface_impl(plan, &ty, &method_names),
    ])
}

fn entry_items(plan: &BindingPlan, resolver_expr: &str) -> Result<TokenStream, GenerateError> {
    let ty = names::type_ident(plan.interface_name())?;
    if names::snake_case(plan.interface_name()) == plan.interface_name() {
        return Err(GenerateError::NameCollision {
            first: plan.interface_name().to_string(),
            second: "entry-point module".to_string(),
            generated: plan.interface_name().to_string(),
        });
    }
    for method in plan.methods() {
        if names::RESERVED_ENTRY.contains(&method.symbol.as_str()) {
            return Err(GenerateError::Reserved(method.symbol.clone()));
        }
    }

    let resolver: syn::Expr =
        syn::parse_str(resolver_expr).map_err(|e| GenerateError::InvalidResolver {
            expr: resolver_expr.to_string(),
            reason: e.to_string(),
        })?;
    let method_names = emit::method_names(plan)?;
    Ok(emit::entry_module(plan, &ty, &method_names, &resolver))
}

fn render(interface: &str, items: &[TokenStream]) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    out.push_str(&format!("// interface: {}\n", interface));
    for item in items {
        out.push('\n');
        out.push_str(&item.to_string());
        out.push('\n');
    }
    out
}
