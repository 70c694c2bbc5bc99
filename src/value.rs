//! Node value payloads
//!
//! Every DAG node holds an opaque typed payload. The engine itself never
//! interprets payloads beyond their kind; distributions, deterministic
//! functions and proposals do.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::TimeTree;

/// The kind of a node payload, used for structural type checks
/// (e.g. when swapping a parameter edge).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// A single real number
    Real,
    /// A vector of real numbers
    RealVector,
    /// A dated tree with node ages and branch lengths
    Tree,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Real => write!(f, "Real"),
            ValueKind::RealVector => write!(f, "RealVector"),
            ValueKind::Tree => write!(f, "Tree"),
        }
    }
}

/// An opaque typed payload stored in a DAG node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A single real number
    Real(f64),
    /// A vector of real numbers
    RealVector(Vec<f64>),
    /// A dated tree
    Tree(TimeTree),
}

impl Value {
    /// Get the kind tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Real(_) => ValueKind::Real,
            Value::RealVector(_) => ValueKind::RealVector,
            Value::Tree(_) => ValueKind::Tree,
        }
    }

    /// View as a real number, if this is one
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(x) => Some(*x),
            _ => None,
        }
    }

    /// Mutable view as a real number
    pub fn as_real_mut(&mut self) -> Option<&mut f64> {
        match self {
            Value::Real(x) => Some(x),
            _ => None,
        }
    }

    /// View as a real vector, if this is one
    pub fn as_real_vector(&self) -> Option<&[f64]> {
        match self {
            Value::RealVector(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable view as a real vector
    pub fn as_real_vector_mut(&mut self) -> Option<&mut Vec<f64>> {
        match self {
            Value::RealVector(v) => Some(v),
            _ => None,
        }
    }

    /// View as a tree, if this is one
    pub fn as_tree(&self) -> Option<&TimeTree> {
        match self {
            Value::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Mutable view as a tree
    pub fn as_tree_mut(&mut self) -> Option<&mut TimeTree> {
        match self {
            Value::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Number of scalar elements in this value
    ///
    /// Trees count one element per node age.
    pub fn num_elements(&self) -> usize {
        match self {
            Value::Real(_) => 1,
            Value::RealVector(v) => v.len(),
            Value::Tree(t) => t.num_nodes(),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Real(x)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::RealVector(v)
    }
}

impl From<TimeTree> for Value {
    fn from(t: TimeTree) -> Self {
        Value::Tree(t)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Real(x) => write!(f, "{x}"),
            Value::RealVector(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
            Value::Tree(t) => write!(f, "<tree with {} nodes>", t.num_nodes()),
        }
    }
}
