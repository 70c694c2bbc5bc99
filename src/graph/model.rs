//! The arena-backed model graph
//!
//! [`ModelGraph`] owns every node of the model and drives the dependency
//! protocol:
//!
//! - `touch` marks a node and, transitively, every descendant as stale,
//!   saving each node's backup on first touch;
//! - `value`/`ln_probability` recompute lazily, leaving the touch state in
//!   place so a later rejection can still roll back;
//! - `keep` commits speculative state and `restore` rolls it back, each
//!   propagating along touched children only;
//! - `affected_nodes` computes the set of stochastic nodes whose density
//!   changes when a given set of nodes changes value.
//!
//! Laziness makes the propagation order safe without a topological sort: a
//! depth-first touch never recomputes anything, and by the time a value is
//! actually read, every ancestor on the path to it has already been marked
//! and is resolved first by the recursive refresh.

use rand::RngCore;

use crate::error::{McmcResult, ModelError};
use crate::dist::Distribution;
use crate::function::DeterministicFunction;
use crate::graph::node::{ModelNode, NodeKind};
use crate::graph::NodeId;
use crate::value::Value;

/// The set of all nodes of a probabilistic model
#[derive(Debug, Default)]
pub struct ModelGraph {
    nodes: Vec<ModelNode>,
}

impl ModelGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node
    pub fn node(&self, id: NodeId) -> McmcResult<&ModelNode> {
        Ok(&self.nodes[self.check(id)?])
    }

    /// Find a node by name
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name() == name)
            .map(NodeId)
    }

    /// Ids of all nodes, in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Ids of all stochastic nodes
    pub fn stochastic_nodes(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].is_stochastic())
            .map(NodeId)
            .collect()
    }

    // ---- construction ----------------------------------------------------

    /// Add a constant node
    pub fn add_constant(&mut self, name: impl Into<String>, value: impl Into<Value>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(ModelNode::new(name, NodeKind::Constant, value.into()));
        id
    }

    /// Add a deterministic node computing its value from `parents`
    ///
    /// The initial value is computed eagerly so the graph is consistent
    /// immediately after construction.
    pub fn add_deterministic(
        &mut self,
        name: impl Into<String>,
        function: Box<dyn DeterministicFunction>,
        parents: &[NodeId],
    ) -> McmcResult<NodeId> {
        let name = name.into();
        if let Some(kinds) = function.param_kinds() {
            self.check_param_kinds(&name, kinds, parents)?;
        } else {
            for &p in parents {
                self.check(p)?;
            }
        }

        let params = self.parent_values(parents)?;
        let initial = function.evaluate(&params);

        let id = NodeId(self.nodes.len());
        self.nodes.push(ModelNode::new(
            name,
            NodeKind::Deterministic {
                function,
                needs_update: false,
            },
            initial,
        ));
        self.wire_parents(id, parents);
        Ok(id)
    }

    /// Add a stochastic node with an initial value
    ///
    /// The initial log-probability is evaluated eagerly, like deterministic
    /// initial values: the cached state is settled immediately after
    /// construction, and the first touch snapshots a real density.
    pub fn add_stochastic(
        &mut self,
        name: impl Into<String>,
        distribution: Box<dyn Distribution>,
        parents: &[NodeId],
        initial: impl Into<Value>,
    ) -> McmcResult<NodeId> {
        let name = name.into();
        self.check_param_kinds(&name, distribution.param_kinds(), parents)?;

        let id = NodeId(self.nodes.len());
        self.nodes.push(ModelNode::new(
            name,
            NodeKind::Stochastic {
                distribution,
                clamped: false,
                ln_prob: 0.0,
                stored_ln_prob: 0.0,
                needs_recalculation: true,
            },
            initial.into(),
        ));
        self.wire_parents(id, parents);
        self.ln_probability_idx(id.0);
        Ok(id)
    }

    /// Clamp a stochastic node to an observed value
    ///
    /// Clamped nodes contribute to the likelihood term of the acceptance
    /// ratio instead of the prior term, and are excluded from redraws.
    pub fn clamp(&mut self, id: NodeId, value: Value) -> McmcResult<()> {
        let idx = self.check(id)?;
        let expected = self.nodes[idx].current_value().kind();
        let actual = value.kind();
        if expected != actual {
            return Err(ModelError::TypeMismatch {
                node: self.nodes[idx].name().to_string(),
                expected,
                actual,
            }
            .into());
        }
        match &mut self.nodes[idx].kind {
            NodeKind::Stochastic {
                clamped,
                needs_recalculation,
                ..
            } => {
                *clamped = true;
                *needs_recalculation = true;
            }
            _ => {
                return Err(
                    ModelError::NotStochastic(self.nodes[idx].name().to_string()).into(),
                )
            }
        }
        self.nodes[idx].cache.set_current(value);
        self.ln_probability_idx(idx);
        Ok(())
    }

    /// Whether a node is clamped
    pub fn is_clamped(&self, id: NodeId) -> McmcResult<bool> {
        Ok(self.nodes[self.check(id)?].is_clamped())
    }

    /// Replace one parent edge of `child` with another node of the same
    /// value type
    ///
    /// Fails with [`ModelError::TypeMismatch`] when the value types differ
    /// and with [`ModelError::CycleDetected`] when the new parent is a
    /// descendant of `child`. The child is *not* touched; the caller must
    /// touch it afterwards so dependents recompute.
    pub fn swap_parameter(
        &mut self,
        child: NodeId,
        old_parent: NodeId,
        new_parent: NodeId,
    ) -> McmcResult<()> {
        let child_idx = self.check(child)?;
        let old_idx = self.check(old_parent)?;
        let new_idx = self.check(new_parent)?;

        let position = self.nodes[child_idx]
            .parents
            .iter()
            .position(|&p| p == old_parent)
            .ok_or_else(|| ModelError::NotAParent {
                node: self.nodes[child_idx].name().to_string(),
            })?;

        let expected = self.nodes[old_idx].current_value().kind();
        let actual = self.nodes[new_idx].current_value().kind();
        if expected != actual {
            return Err(ModelError::TypeMismatch {
                node: self.nodes[child_idx].name().to_string(),
                expected,
                actual,
            }
            .into());
        }

        if new_idx == child_idx || self.is_descendant(child_idx, new_idx) {
            return Err(ModelError::CycleDetected {
                parent: self.nodes[new_idx].name().to_string(),
                child: self.nodes[child_idx].name().to_string(),
            }
            .into());
        }

        self.nodes[child_idx].parents[position] = new_parent;
        if let Some(pos) = self.nodes[old_idx]
            .children
            .iter()
            .position(|&c| c == child)
        {
            self.nodes[old_idx].children.remove(pos);
        }
        self.nodes[new_idx].children.push(child);
        Ok(())
    }

    // ---- value access ----------------------------------------------------

    /// Current value of a node, recomputing lazily if stale
    ///
    /// Recomputation refreshes the cache but leaves the touch state in
    /// place: a rejected proposal may still need the backup.
    pub fn value(&mut self, id: NodeId) -> McmcResult<Value> {
        let idx = self.check(id)?;
        self.refresh_value(idx);
        Ok(self.nodes[idx].current_value().clone())
    }

    /// Current cached value of a node, without recomputation
    pub fn current_value(&self, id: NodeId) -> McmcResult<&Value> {
        Ok(self.nodes[self.check(id)?].current_value())
    }

    /// Assign a node's value, saving rollback state first
    ///
    /// This is the mutation used by proposals. The node and its dependents
    /// are touched *before* the assignment, so the backup always holds the
    /// pre-mutation value and a later `restore` undoes the assignment. A
    /// touch issued by the caller afterwards is an idempotent no-op.
    pub fn set_value(&mut self, id: NodeId, value: Value) -> McmcResult<()> {
        let idx = self.check(id)?;
        let expected = self.nodes[idx].current_value().kind();
        let actual = value.kind();
        if expected != actual {
            return Err(ModelError::TypeMismatch {
                node: self.nodes[idx].name().to_string(),
                expected,
                actual,
            }
            .into());
        }
        self.touch_idx(idx);
        self.nodes[idx].cache.set_current(value);
        Ok(())
    }

    /// Log-probability of a stochastic node, recomputing lazily if stale
    ///
    /// Non-stochastic nodes report zero.
    pub fn ln_probability(&mut self, id: NodeId) -> McmcResult<f64> {
        let idx = self.check(id)?;
        Ok(self.ln_probability_idx(idx))
    }

    /// Difference between the recomputed and pre-touch log-probability
    pub fn ln_probability_ratio(&mut self, id: NodeId) -> McmcResult<f64> {
        let idx = self.check(id)?;
        let current = self.ln_probability_idx(idx);
        let stored = match &self.nodes[idx].kind {
            NodeKind::Stochastic { stored_ln_prob, .. } if self.nodes[idx].is_touched() => {
                *stored_ln_prob
            }
            _ => current,
        };
        Ok(current - stored)
    }

    /// Sum of log-probabilities over unclamped stochastic nodes
    pub fn ln_prior(&mut self) -> f64 {
        let mut total = 0.0;
        for i in 0..self.nodes.len() {
            if self.nodes[i].is_stochastic() && !self.nodes[i].is_clamped() {
                total += self.ln_probability_idx(i);
            }
        }
        total
    }

    /// Sum of log-probabilities over clamped stochastic nodes
    pub fn ln_likelihood(&mut self) -> f64 {
        let mut total = 0.0;
        for i in 0..self.nodes.len() {
            if self.nodes[i].is_clamped() {
                total += self.ln_probability_idx(i);
            }
        }
        total
    }

    /// Sum of log-probabilities over all stochastic nodes
    pub fn ln_posterior(&mut self) -> f64 {
        let mut total = 0.0;
        for i in 0..self.nodes.len() {
            if self.nodes[i].is_stochastic() {
                total += self.ln_probability_idx(i);
            }
        }
        total
    }

    /// Redraw an unclamped stochastic node from its distribution and touch
    /// its dependents
    pub fn redraw(&mut self, id: NodeId, rng: &mut dyn RngCore) -> McmcResult<()> {
        let idx = self.check(id)?;
        if !self.nodes[idx].is_stochastic() {
            return Err(ModelError::NotStochastic(self.nodes[idx].name().to_string()).into());
        }
        if self.nodes[idx].is_clamped() {
            return Ok(());
        }
        let parents = self.nodes[idx].parents.clone();
        let params = self.parent_values(&parents)?;
        let drawn = match &self.nodes[idx].kind {
            NodeKind::Stochastic { distribution, .. } => distribution.redraw(&params, rng),
            _ => unreachable!(),
        };
        // touch first so the backup holds the pre-draw value
        self.touch_idx(idx);
        self.nodes[idx].cache.set_current(drawn);
        Ok(())
    }

    // ---- the touch/keep/restore protocol ---------------------------------

    /// Mark a node and every descendant as stale
    ///
    /// Idempotent: nodes already touched keep their saved backup and do not
    /// re-propagate.
    pub fn touch(&mut self, id: NodeId) -> McmcResult<()> {
        let idx = self.check(id)?;
        self.touch_idx(idx);
        Ok(())
    }

    /// Commit the speculative state of a node and of every touched
    /// descendant
    pub fn keep(&mut self, id: NodeId) -> McmcResult<()> {
        let idx = self.check(id)?;
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            if !self.nodes[i].is_touched() {
                continue;
            }
            // settle the cached value and log-probability before committing
            self.refresh_value(i);
            self.ln_probability_idx(i);
            self.nodes[i].keep_local();
            stack.extend(self.nodes[i].children.iter().map(|c| c.0));
        }
        Ok(())
    }

    /// Roll back the speculative state of a node and of every touched
    /// descendant
    pub fn restore(&mut self, id: NodeId) -> McmcResult<()> {
        let idx = self.check(id)?;
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            if !self.nodes[i].is_touched() {
                continue;
            }
            self.nodes[i].restore_local();
            stack.extend(self.nodes[i].children.iter().map(|c| c.0));
        }
        Ok(())
    }

    /// The stochastic nodes whose density changes when `roots` change value
    ///
    /// Includes every stochastic root itself, then walks child edges depth
    /// first, collecting stochastic nodes and passing through deterministic
    /// ones. Recursion stops at stochastic nodes: a stochastic child
    /// insulates its own descendants, whose densities depend on its value,
    /// not on its density.
    pub fn affected_nodes(&self, roots: &[NodeId]) -> McmcResult<Vec<NodeId>> {
        let mut visited = vec![false; self.nodes.len()];
        let mut affected = Vec::new();
        for &root in roots {
            let idx = self.check(root)?;
            if self.nodes[idx].is_stochastic() && !visited[idx] {
                visited[idx] = true;
                affected.push(root);
            }
            self.collect_affected(idx, &mut visited, &mut affected);
        }
        Ok(affected)
    }

    // ---- internals -------------------------------------------------------

    fn check(&self, id: NodeId) -> Result<usize, ModelError> {
        if id.0 < self.nodes.len() {
            Ok(id.0)
        } else {
            Err(ModelError::UnknownNode(id.0))
        }
    }

    fn check_param_kinds(
        &self,
        name: &str,
        kinds: &[crate::value::ValueKind],
        parents: &[NodeId],
    ) -> McmcResult<()> {
        for &p in parents {
            self.check(p)?;
        }
        if parents.len() < kinds.len() {
            return Err(ModelError::MissingParameter {
                node: name.to_string(),
                index: parents.len(),
            }
            .into());
        }
        for (&kind, &parent) in kinds.iter().zip(parents.iter()) {
            let idx = self.check(parent)?;
            let actual = self.nodes[idx].current_value().kind();
            if actual != kind {
                return Err(ModelError::TypeMismatch {
                    node: name.to_string(),
                    expected: kind,
                    actual,
                }
                .into());
            }
        }
        Ok(())
    }

    fn wire_parents(&mut self, child: NodeId, parents: &[NodeId]) {
        self.nodes[child.0].parents = parents.to_vec();
        for &p in parents {
            self.nodes[p.0].children.push(child);
        }
    }

    fn is_descendant(&self, ancestor: usize, candidate: usize) -> bool {
        let mut stack: Vec<usize> = self.nodes[ancestor].children.iter().map(|c| c.0).collect();
        let mut seen = vec![false; self.nodes.len()];
        while let Some(i) = stack.pop() {
            if i == candidate {
                return true;
            }
            if seen[i] {
                continue;
            }
            seen[i] = true;
            stack.extend(self.nodes[i].children.iter().map(|c| c.0));
        }
        false
    }

    fn touch_idx(&mut self, idx: usize) {
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            let newly_touched = self.nodes[i].touch_local();
            if newly_touched {
                stack.extend(self.nodes[i].children.iter().map(|c| c.0));
            }
        }
    }

    fn collect_affected(&self, idx: usize, visited: &mut [bool], affected: &mut Vec<NodeId>) {
        for c in 0..self.nodes[idx].children.len() {
            let child = self.nodes[idx].children[c].0;
            if visited[child] {
                continue;
            }
            visited[child] = true;
            if self.nodes[child].is_stochastic() {
                affected.push(NodeId(child));
            } else {
                self.collect_affected(child, visited, affected);
            }
        }
    }

    fn parent_values(&mut self, parents: &[NodeId]) -> McmcResult<Vec<Value>> {
        parents.iter().map(|&p| self.value(p)).collect()
    }

    /// Recompute a stale deterministic value, resolving parents first
    fn refresh_value(&mut self, idx: usize) {
        let needs = matches!(
            self.nodes[idx].kind,
            NodeKind::Deterministic {
                needs_update: true,
                ..
            }
        );
        if !needs {
            return;
        }
        let parents = self.nodes[idx].parents.clone();
        let mut params = Vec::with_capacity(parents.len());
        for p in parents {
            self.refresh_value(p.0);
            params.push(self.nodes[p.0].current_value().clone());
        }
        if let NodeKind::Deterministic {
            function,
            needs_update,
        } = &mut self.nodes[idx].kind
        {
            let value = function.evaluate(&params);
            *needs_update = false;
            self.nodes[idx].cache.set_current(value);
        }
    }

    /// Recompute a stale stochastic log-probability
    ///
    /// NaN densities degrade to `-infinity` so a pathological proposal
    /// becomes "always reject" instead of poisoning the chain.
    fn ln_probability_idx(&mut self, idx: usize) -> f64 {
        let needs = matches!(
            self.nodes[idx].kind,
            NodeKind::Stochastic {
                needs_recalculation: true,
                ..
            }
        );
        if needs {
            let parents = self.nodes[idx].parents.clone();
            let mut params = Vec::with_capacity(parents.len());
            for p in &parents {
                self.refresh_value(p.0);
                params.push(self.nodes[p.0].current_value().clone());
            }
            let value = self.nodes[idx].current_value().clone();
            let ln = match &self.nodes[idx].kind {
                NodeKind::Stochastic { distribution, .. } => {
                    distribution.ln_probability(&value, &params)
                }
                _ => unreachable!(),
            };
            let ln = if ln.is_nan() { f64::NEG_INFINITY } else { ln };
            if let NodeKind::Stochastic {
                ln_prob,
                needs_recalculation,
                ..
            } = &mut self.nodes[idx].kind
            {
                *ln_prob = ln;
                *needs_recalculation = false;
            }
        }
        match &self.nodes[idx].kind {
            NodeKind::Stochastic { ln_prob, .. } => *ln_prob,
            _ => 0.0,
        }
    }
}
