//! Deterministic node functions
//!
//! A deterministic DAG node owns a [`DeterministicFunction`] that recomputes
//! its value from its parents' current values. Functions are pure strategy
//! objects: they read the parameter slice they are handed and produce a new
//! value, nothing else. The graph decides *when* recomputation happens.

use crate::value::{Value, ValueKind};

/// A pure function from parent values to a node value
pub trait DeterministicFunction: Send + Sync {
    /// Human-readable name, used in structure printouts
    fn name(&self) -> &'static str;

    /// Parameter kinds this function expects, in order
    ///
    /// Checked structurally when the node is wired into the graph.
    /// `None` means the function is variadic over reals/real vectors.
    fn param_kinds(&self) -> Option<&'static [ValueKind]> {
        None
    }

    /// Recompute the value from the parents' current values
    fn evaluate(&self, params: &[Value]) -> Value;
}

/// Iterate all scalar elements of a parameter slice
fn scalar_elements(params: &[Value]) -> impl Iterator<Item = f64> + '_ {
    params.iter().flat_map(|p| match p {
        Value::Real(x) => std::slice::from_ref(x).iter().copied(),
        Value::RealVector(v) => v.iter().copied(),
        Value::Tree(_) => [].iter().copied(),
    })
}

/// Sum of all scalar elements of the parents
#[derive(Clone, Copy, Debug, Default)]
pub struct Sum;

impl DeterministicFunction for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn evaluate(&self, params: &[Value]) -> Value {
        Value::Real(scalar_elements(params).sum())
    }
}

/// Product of all scalar elements of the parents
#[derive(Clone, Copy, Debug, Default)]
pub struct Product;

impl DeterministicFunction for Product {
    fn name(&self) -> &'static str {
        "product"
    }

    fn evaluate(&self, params: &[Value]) -> Value {
        Value::Real(scalar_elements(params).product())
    }
}

/// `exp` of a single real parent
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpTransform;

impl DeterministicFunction for ExpTransform {
    fn name(&self) -> &'static str {
        "exp"
    }

    fn param_kinds(&self) -> Option<&'static [ValueKind]> {
        Some(&[ValueKind::Real])
    }

    fn evaluate(&self, params: &[Value]) -> Value {
        let x = params[0].as_real().unwrap_or(f64::NAN);
        Value::Real(x.exp())
    }
}

/// Sum of branch lengths of a single tree parent
#[derive(Clone, Copy, Debug, Default)]
pub struct TreeLength;

impl DeterministicFunction for TreeLength {
    fn name(&self) -> &'static str {
        "treeLength"
    }

    fn param_kinds(&self) -> Option<&'static [ValueKind]> {
        Some(&[ValueKind::Tree])
    }

    fn evaluate(&self, params: &[Value]) -> Value {
        let length = params[0].as_tree().map_or(f64::NAN, |t| t.tree_length());
        Value::Real(length)
    }
}
