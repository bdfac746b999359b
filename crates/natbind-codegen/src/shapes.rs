//! Declarative call-shape list for ahead-of-time tooling.

use serde::Serialize;

use natbind_core::{BindingPlan, CallShape, InterfaceDescription};

use crate::GenerateError;

/// Every distinct call shape of an interface, and which method uses which.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapesManifest {
    pub interface: String,
    /// Sorted, deduplicated.
    pub shapes: Vec<CallShape>,
    /// In method-id order.
    pub methods: Vec<MethodShape>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodShape {
    pub name: String,
    pub id: usize,
    /// Index into `shapes`.
    pub shape: usize,
}

impl ShapesManifest {
    pub fn from_plan(plan: &BindingPlan) -> Self {
        let shapes = plan.call_shapes();
        let methods = plan
            .methods()
            .iter()
            .map(|m| MethodShape {
                name: m.symbol.clone(),
                id: m.id.index(),
                shape: shapes.binary_search(&m.shape()).unwrap_or_default(),
            })
            .collect();
        Self {
            interface: plan.interface_name().to_string(),
            shapes,
            methods,
        }
    }
}

/// The call-shape list of `desc` as pretty-printed JSON.
pub fn shapes_manifest(desc: &InterfaceDescription) -> Result<String, GenerateError> {
    let plan = BindingPlan::analyze(desc)?;
    let manifest = ShapesManifest::from_plan(&plan);
    serde_json::to_string_pretty(&manifest).map_err(|e| GenerateError::Json(e.to_string()))
}
