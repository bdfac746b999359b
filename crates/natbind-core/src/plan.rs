//! Binding plans: the type-directed analysis shared by both binders.
//!
//! `BindingPlan::analyze` is the single place that decides what gets bound:
//! method order, method ids, semantic types and layouts. The dynamic binder
//! builds its table from a plan and the source generator emits code from the
//! same plan, so the two cannot disagree on any of these.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{BindError, BindResult, TypePosition};
use crate::interface::{InterfaceDescription, Signature};
use crate::types::{CallShape, SemanticType, TypeSpec};

/// Stable per-method token: the method's index in plan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(u32);

impl MethodId {
    pub const fn new(index: u32) -> Self {
        MethodId(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fully resolved signature of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPlan {
    pub id: MethodId,
    /// Native symbol name.
    pub symbol: String,
    pub params: Vec<SemanticType>,
    pub ret: SemanticType,
}

impl MethodPlan {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn shape(&self) -> CallShape {
        CallShape::owned(
            self.ret.layout(),
            self.params.iter().map(|p| p.layout()).collect(),
        )
    }
}

/// Ordered, validated analysis of one interface description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPlan {
    interface: String,
    methods: Vec<MethodPlan>,
}

impl BindingPlan {
    /// Validate and order the methods of `desc`.
    ///
    /// Methods are processed in lexicographic order by name, whatever the
    /// order of the description. The first invalid name, duplicate or
    /// unsupported type in that order fails the whole plan.
    pub fn analyze(desc: &InterfaceDescription) -> BindResult<Self> {
        Self::analyze_with(desc, |_| Ok(()))
    }

    /// Like `analyze`, but hands each method to `visit` as soon as it is
    /// planned, before the next method is looked at.
    ///
    /// An error from `visit` stops the analysis, so a failure on one method
    /// is reported ahead of any problem with a method sorting after it.
    pub fn analyze_with<F>(desc: &InterfaceDescription, mut visit: F) -> BindResult<Self>
    where
        F: FnMut(&MethodPlan) -> BindResult<()>,
    {
        let mut sorted: Vec<&Signature> = desc.signatures().iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut methods = Vec::with_capacity(sorted.len());
        for (idx, sig) in sorted.iter().enumerate() {
            if !is_symbol_name(&sig.name) {
                return Err(BindError::InvalidSymbolName(sig.name.clone()));
            }
            if idx > 0 && sorted[idx - 1].name == sig.name {
                return Err(BindError::DuplicateMethod(sig.name.clone()));
            }

            let params = sig
                .params
                .iter()
                .enumerate()
                .map(|(i, p)| param_type(sig, i, p))
                .collect::<BindResult<Vec<_>>>()?;
            let ret = sig
                .ret
                .resolve()
                .ok_or_else(|| unsupported(sig, TypePosition::Return, &sig.ret))?;

            let method = MethodPlan {
                id: MethodId::new(idx as u32),
                symbol: sig.name.clone(),
                params,
                ret,
            };
            visit(&method)?;
            methods.push(method);
        }

        Ok(Self {
            interface: desc.name().to_string(),
            methods,
        })
    }

    pub fn interface_name(&self) -> &str {
        &self.interface
    }

    pub fn methods(&self) -> &[MethodPlan] {
        &self.methods
    }

    pub fn method(&self, id: MethodId) -> Option<&MethodPlan> {
        self.methods.get(id.index())
    }

    pub fn method_id(&self, name: &str) -> Option<MethodId> {
        self.methods
            .binary_search_by(|m| m.symbol.as_str().cmp(name))
            .ok()
            .map(|idx| self.methods[idx].id)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Every distinct call shape used by the interface, sorted.
    pub fn call_shapes(&self) -> Vec<CallShape> {
        self.methods
            .iter()
            .map(MethodPlan::shape)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn param_type(sig: &Signature, position: usize, spec: &TypeSpec) -> BindResult<SemanticType> {
    match spec.resolve() {
        Some(ty) if ty.is_param_type() => Ok(ty),
        _ => Err(unsupported(sig, TypePosition::Param(position), spec)),
    }
}

fn unsupported(sig: &Signature, position: TypePosition, spec: &TypeSpec) -> BindError {
    BindError::UnsupportedType {
        symbol: sig.name.clone(),
        position,
        ty: spec.to_string(),
    }
}

/// Plain ASCII C identifier.
pub fn is_symbol_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NativeLayout;
    use pretty_assertions::assert_eq;

    fn rpm_like() -> InterfaceDescription {
        InterfaceDescription::parse(
            "Rpm",
            r#"
rpmtsCreate: () -> handle
headerGetString: (handle, i32) -> string
rpmReadConfigFiles: (string, string) -> i32
headerFree: (handle) -> handle
rpmtsSetVSFlags: (handle, i32) -> i32
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_methods_sorted_by_name() {
        let plan = BindingPlan::analyze(&rpm_like()).unwrap();
        let names: Vec<_> = plan.methods().iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(
            names,
            [
                "headerFree",
                "headerGetString",
                "rpmReadConfigFiles",
                "rpmtsCreate",
                "rpmtsSetVSFlags"
            ]
        );
        for (i, m) in plan.methods().iter().enumerate() {
            assert_eq!(m.id.index(), i);
        }
    }

    #[test]
    fn test_analysis_is_order_independent() {
        let desc = rpm_like();
        let mut reversed = InterfaceDescription::new("Rpm");
        for sig in desc.signatures().iter().rev() {
            reversed.push(sig.clone());
        }
        assert_eq!(
            BindingPlan::analyze(&desc).unwrap(),
            BindingPlan::analyze(&reversed).unwrap()
        );
    }

    #[test]
    fn test_method_id_lookup() {
        let plan = BindingPlan::analyze(&rpm_like()).unwrap();
        let id = plan.method_id("rpmtsCreate").unwrap();
        assert_eq!(id, MethodId::new(3));
        assert_eq!(plan.method(id).unwrap().ret, SemanticType::Handle);
        assert_eq!(plan.method_id("rpmtsFree"), None);
    }

    #[test]
    fn test_unsupported_param_type() {
        let desc = InterfaceDescription::parse("M", "scale: (i32, f64) -> i32").unwrap();
        assert_eq!(
            BindingPlan::analyze(&desc).unwrap_err(),
            BindError::UnsupportedType {
                symbol: "scale".into(),
                position: TypePosition::Param(1),
                ty: "f64".into(),
            }
        );
    }

    #[test]
    fn test_void_parameter_unsupported() {
        let desc = InterfaceDescription::parse("M", "f: (void) -> i32").unwrap();
        assert!(matches!(
            BindingPlan::analyze(&desc),
            Err(BindError::UnsupportedType { position: TypePosition::Param(0), .. })
        ));
    }

    #[test]
    fn test_unsupported_return_type() {
        let desc = InterfaceDescription::parse("M", "f: () -> double").unwrap();
        assert!(matches!(
            BindingPlan::analyze(&desc),
            Err(BindError::UnsupportedType { position: TypePosition::Return, .. })
        ));
    }

    #[test]
    fn test_first_error_in_name_order_wins() {
        let desc = InterfaceDescription::parse("M", "zeta: (f32) -> i32\nalpha: () -> f64\n").unwrap();
        match BindingPlan::analyze(&desc) {
            Err(BindError::UnsupportedType { symbol, .. }) => assert_eq!(symbol, "alpha"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_visit_runs_per_method_in_name_order() {
        let desc = InterfaceDescription::parse("M", "beta: () -> i32\nalpha: () -> i32\ngamma: (f32) -> i32\n")
            .unwrap();
        let mut seen = Vec::new();
        let err = BindingPlan::analyze_with(&desc, |m| {
            seen.push(m.symbol.clone());
            Ok(())
        })
        .unwrap_err();
        assert_eq!(seen, ["alpha", "beta"]);
        assert!(matches!(err, BindError::UnsupportedType { symbol, .. } if symbol == "gamma"));

        // A failure from the visitor wins over a bad type further on.
        let mut seen = Vec::new();
        let err = BindingPlan::analyze_with(&desc, |m| {
            seen.push(m.symbol.clone());
            Err(BindError::UnknownMethod(m.symbol.clone()))
        })
        .unwrap_err();
        assert_eq!(seen, ["alpha"]);
        assert_eq!(err, BindError::UnknownMethod("alpha".into()));
    }

    #[test]
    fn test_duplicate_and_invalid_names() {
        let desc = InterfaceDescription::new("M")
            .with(Signature::new("f", [SemanticType::Int32], SemanticType::Int32))
            .with(Signature::new("f", [SemanticType::Int64], SemanticType::Int32));
        assert_eq!(
            BindingPlan::analyze(&desc).unwrap_err(),
            BindError::DuplicateMethod("f".into())
        );

        let desc = InterfaceDescription::new("M").with(Signature::new(
            "not-a-symbol",
            Vec::<TypeSpec>::new(),
            SemanticType::Void,
        ));
        assert_eq!(
            BindingPlan::analyze(&desc).unwrap_err(),
            BindError::InvalidSymbolName("not-a-symbol".into())
        );
    }

    #[test]
    fn test_call_shapes_deduplicated() {
        let plan = BindingPlan::analyze(&rpm_like()).unwrap();
        let shapes = plan.call_shapes();
        // headerGetString and rpmtsSetVSFlags differ only in return layout;
        // headerFree and rpmtsCreate differ in arity.
        assert_eq!(
            shapes,
            vec![
                CallShape::owned(NativeLayout::Int32, vec![NativeLayout::Pointer, NativeLayout::Int32]),
                CallShape::owned(NativeLayout::Int32, vec![NativeLayout::Pointer, NativeLayout::Pointer]),
                CallShape::owned(NativeLayout::Pointer, vec![]),
                CallShape::owned(NativeLayout::Pointer, vec![NativeLayout::Pointer]),
                CallShape::owned(NativeLayout::Pointer, vec![NativeLayout::Pointer, NativeLayout::Int32]),
            ]
        );
    }

    #[test]
    fn test_symbol_names() {
        assert!(is_symbol_name("rpmtsCreate"));
        assert!(is_symbol_name("_private2"));
        assert!(!is_symbol_name("2fast"));
        assert!(!is_symbol_name(""));
        assert!(!is_symbol_name("a.b"));
    }
}
