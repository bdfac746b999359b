//! Binding table: every method of an interface, bound.

use natbind_core::{
    BindError, BindResult, BindingPlan, CallShape, InterfaceDescription, MethodId, Value,
};

use crate::binding::MethodBinding;
use crate::resolver::{resolve_symbol, SymbolLookup};

/// All method bindings of one interface, in plan order.
///
/// A table only exists if every method bound; there is no partially bound
/// table.
#[derive(Debug)]
pub struct BindingTable {
    interface: String,
    methods: Vec<MethodBinding>,
}

impl BindingTable {
    /// Plan `desc` and resolve every symbol through `lookup`.
    ///
    /// Methods are taken in name order; each one is planned and then its
    /// symbol resolved before the next is looked at, so the first failing
    /// method decides the error.
    pub fn build(desc: &InterfaceDescription, lookup: &dyn SymbolLookup) -> BindResult<Self> {
        let mut methods = Vec::with_capacity(desc.len());
        let plan = BindingPlan::analyze_with(desc, |method| {
            let entry = resolve_symbol(lookup, &method.symbol)?;
            methods.push(MethodBinding::new(method.clone(), entry));
            Ok(())
        })?;
        Ok(Self::assemble(&plan, lookup, methods))
    }

    /// Resolve every method of an already analyzed plan.
    pub fn from_plan(plan: &BindingPlan, lookup: &dyn SymbolLookup) -> BindResult<Self> {
        let methods = plan
            .methods()
            .iter()
            .map(|method| {
                let entry = resolve_symbol(lookup, &method.symbol)?;
                Ok(MethodBinding::new(method.clone(), entry))
            })
            .collect::<BindResult<Vec<_>>>()?;
        Ok(Self::assemble(plan, lookup, methods))
    }

    fn assemble(plan: &BindingPlan, lookup: &dyn SymbolLookup, methods: Vec<MethodBinding>) -> Self {
        log::debug!(
            "bound {} method(s) of `{}` from {}",
            methods.len(),
            plan.interface_name(),
            lookup.describe()
        );
        Self {
            interface: plan.interface_name().to_string(),
            methods,
        }
    }

    pub fn interface_name(&self) -> &str {
        &self.interface
    }

    pub fn methods(&self) -> &[MethodBinding] {
        &self.methods
    }

    pub fn get(&self, id: MethodId) -> Option<&MethodBinding> {
        self.methods.get(id.index())
    }

    pub fn method_id(&self, name: &str) -> Option<MethodId> {
        self.methods
            .binary_search_by(|m| m.symbol().cmp(name))
            .ok()
            .map(|idx| self.methods[idx].id())
    }

    pub fn invoke(&self, id: MethodId, args: &[Value]) -> BindResult<Value> {
        self.get(id)
            .ok_or_else(|| BindError::UnknownMethod(id.to_string()))?
            .invoke(args)
    }

    pub fn call_shapes(&self) -> Vec<CallShape> {
        let mut shapes: Vec<CallShape> = self.methods.iter().map(MethodBinding::shape).collect();
        shapes.sort();
        shapes.dedup();
        shapes
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
