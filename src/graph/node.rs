//! Model-graph nodes
//!
//! A [`ModelNode`] is one unit of the probabilistic model: a payload cache,
//! a dependency-kind tag, and parent/child edges stored as arena indices.
//! The node owns only node-local state; dependency propagation (touching
//! descendants, computing affected sets) is the graph's job.

use std::fmt;

use crate::dist::Distribution;
use crate::function::DeterministicFunction;
use crate::graph::cache::{TouchState, ValueCache};
use crate::graph::NodeId;
use crate::value::Value;

/// Dependency-kind tag, without the kind-specific payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    /// Fixed value, no parents
    Constant,
    /// Pure function of the parents
    Deterministic,
    /// Random variable with an attached distribution
    Stochastic,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Constant => write!(f, "constant"),
            NodeType::Deterministic => write!(f, "deterministic"),
            NodeType::Stochastic => write!(f, "stochastic"),
        }
    }
}

/// Kind-specific node state
pub enum NodeKind {
    /// Fixed value
    Constant,
    /// Value recomputed from the parents by a pure function
    Deterministic {
        /// The recomputation strategy
        function: Box<dyn DeterministicFunction>,
        /// Whether the cached value is out of date with the parents
        needs_update: bool,
    },
    /// Random variable scored by a distribution
    Stochastic {
        /// The density/sampling strategy
        distribution: Box<dyn Distribution>,
        /// Whether the node is clamped to observed data
        clamped: bool,
        /// Cached log-probability, valid when `needs_recalculation` is false
        ln_prob: f64,
        /// Log-probability before the current touch, for delta computation
        stored_ln_prob: f64,
        /// Whether the cached log-probability is stale
        needs_recalculation: bool,
    },
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Constant => write!(f, "Constant"),
            NodeKind::Deterministic { function, .. } => {
                write!(f, "Deterministic({})", function.name())
            }
            NodeKind::Stochastic {
                distribution,
                clamped,
                ..
            } => write!(
                f,
                "Stochastic({}, clamped: {})",
                distribution.name(),
                clamped
            ),
        }
    }
}

/// One node of the model graph
#[derive(Debug)]
pub struct ModelNode {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) cache: ValueCache,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl ModelNode {
    pub(crate) fn new(name: impl Into<String>, kind: NodeKind, value: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            cache: ValueCache::new(value),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Node name, for diagnostics and trace headers
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dependency-kind tag
    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Constant => NodeType::Constant,
            NodeKind::Deterministic { .. } => NodeType::Deterministic,
            NodeKind::Stochastic { .. } => NodeType::Stochastic,
        }
    }

    /// Whether this is a stochastic node
    pub fn is_stochastic(&self) -> bool {
        matches!(self.kind, NodeKind::Stochastic { .. })
    }

    /// Whether this node is clamped to observed data
    pub fn is_clamped(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Stochastic { clamped: true, .. }
        )
    }

    /// Parent edges
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Child edges
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Current payload (possibly speculative while touched)
    pub fn current_value(&self) -> &Value {
        self.cache.current()
    }

    /// Cache state flag
    pub fn touch_state(&self) -> TouchState {
        self.cache.state()
    }

    /// Whether the node holds speculative state
    pub fn is_touched(&self) -> bool {
        self.cache.is_touched()
    }

    /// Mark this node touched; returns `true` on the first touch
    ///
    /// The backup and (for stochastic nodes) the pre-touch log-probability
    /// are saved only on the first touch; staleness flags are set on every
    /// touch.
    pub(crate) fn touch_local(&mut self) -> bool {
        let newly_touched = self.cache.touch();
        match &mut self.kind {
            NodeKind::Constant => {}
            NodeKind::Deterministic { needs_update, .. } => {
                *needs_update = true;
            }
            NodeKind::Stochastic {
                ln_prob,
                stored_ln_prob,
                needs_recalculation,
                ..
            } => {
                if newly_touched {
                    *stored_ln_prob = *ln_prob;
                }
                *needs_recalculation = true;
            }
        }
        newly_touched
    }

    /// Commit speculative state
    ///
    /// The caller must have refreshed the cached value/log-probability
    /// before committing.
    pub(crate) fn keep_local(&mut self) {
        self.cache.keep();
        match &mut self.kind {
            NodeKind::Constant => {}
            NodeKind::Deterministic { needs_update, .. } => {
                *needs_update = false;
            }
            NodeKind::Stochastic {
                needs_recalculation,
                ..
            } => {
                *needs_recalculation = false;
            }
        }
    }

    /// Roll speculative state back to the last known-good state
    pub(crate) fn restore_local(&mut self) {
        self.cache.restore();
        match &mut self.kind {
            NodeKind::Constant => {}
            NodeKind::Deterministic { needs_update, .. } => {
                // the reinstated value is consistent with restored parents
                *needs_update = false;
            }
            NodeKind::Stochastic {
                ln_prob,
                stored_ln_prob,
                needs_recalculation,
                ..
            } => {
                *ln_prob = *stored_ln_prob;
                *needs_recalculation = false;
            }
        }
    }
}
