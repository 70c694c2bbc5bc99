//! The model graph
//!
//! This module holds the DAG machinery: per-node value caches
//! ([`cache::ValueCache`]), the node representation ([`node::ModelNode`])
//! and the arena-backed graph ([`model::ModelGraph`]) with the
//! touch/keep/restore protocol and affected-set traversal.
//!
//! Nodes are addressed by stable [`NodeId`] indices into the graph arena;
//! parent/child relationships are index sets, never pointers.

pub mod cache;
pub mod model;
pub mod node;

pub mod prelude {
    pub use super::cache::{TouchState, ValueCache};
    pub use super::model::ModelGraph;
    pub use super::node::{ModelNode, NodeType};
    pub use super::NodeId;
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable index of a node in the graph arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
