//! Dated trees
//!
//! A [`TimeTree`] is a rooted tree whose nodes carry ages (time before the
//! present). Branch lengths are implied: the length of the branch above a
//! node is its parent's age minus its own age. Tree-valued model nodes store
//! a `TimeTree` payload, and tree proposals mutate node ages through the
//! accessors here.
//!
//! Tips are nodes without children. A tip age of zero means the tip is
//! sampled in the present; positive tip ages represent serially sampled
//! data. Tip ages are fixed data and are never rescaled by proposals.

use serde::{Deserialize, Serialize};

/// A single node of a dated tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TreeNode {
    age: f64,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// A rooted tree with node ages, stored as an index-addressed arena
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeTree {
    nodes: Vec<TreeNode>,
    root: usize,
}

impl TimeTree {
    /// Build a tree from explicit topology
    ///
    /// `parents[i]` is the parent index of node `i`, or `None` for the root;
    /// `ages[i]` is the age of node `i`. Exactly one root is required, every
    /// parent must be older than its children, and ages must be
    /// non-negative. Returns `None` if the topology is malformed.
    pub fn from_parents(parents: &[Option<usize>], ages: &[f64]) -> Option<Self> {
        if parents.len() != ages.len() || parents.is_empty() {
            return None;
        }
        let n = parents.len();
        let mut nodes: Vec<TreeNode> = ages
            .iter()
            .zip(parents.iter())
            .map(|(&age, &parent)| TreeNode {
                age,
                parent,
                children: Vec::new(),
            })
            .collect();

        let mut root = None;
        for i in 0..n {
            match parents[i] {
                Some(p) => {
                    if p >= n || p == i {
                        return None;
                    }
                    nodes[p].children.push(i);
                }
                None => {
                    if root.is_some() {
                        return None;
                    }
                    root = Some(i);
                }
            }
        }

        let tree = Self {
            nodes,
            root: root?,
        };
        if tree.is_consistent() {
            Some(tree)
        } else {
            None
        }
    }

    /// Total number of nodes
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of tips (nodes without children)
    pub fn num_tips(&self) -> usize {
        self.nodes.iter().filter(|n| n.children.is_empty()).count()
    }

    /// Number of interior nodes (nodes with children)
    pub fn num_interior_nodes(&self) -> usize {
        self.num_nodes() - self.num_tips()
    }

    /// Index of the root node
    pub fn root(&self) -> usize {
        self.root
    }

    /// Whether `index` is a tip
    pub fn is_tip(&self, index: usize) -> bool {
        self.nodes[index].children.is_empty()
    }

    /// Whether `index` is an interior node
    pub fn is_interior(&self, index: usize) -> bool {
        !self.is_tip(index)
    }

    /// Whether `index` is the root
    pub fn is_root(&self, index: usize) -> bool {
        index == self.root
    }

    /// Age of a node
    pub fn age(&self, index: usize) -> f64 {
        self.nodes[index].age
    }

    /// Set the age of a node
    ///
    /// No validity check is performed here; proposals set candidate ages
    /// freely and check [`TimeTree::is_consistent`] afterwards.
    pub fn set_age(&mut self, index: usize, age: f64) {
        self.nodes[index].age = age;
    }

    /// Parent index of a node, `None` for the root
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes[index].parent
    }

    /// Child indices of a node
    pub fn children(&self, index: usize) -> &[usize] {
        &self.nodes[index].children
    }

    /// Length of the branch above a node (parent age minus node age)
    ///
    /// The root has no branch above it and reports zero.
    pub fn branch_length(&self, index: usize) -> f64 {
        match self.nodes[index].parent {
            Some(p) => self.nodes[p].age - self.nodes[index].age,
            None => 0.0,
        }
    }

    /// Indices of the interior, non-root nodes
    pub fn interior_non_root_nodes(&self) -> Vec<usize> {
        (0..self.num_nodes())
            .filter(|&i| self.is_interior(i) && !self.is_root(i))
            .collect()
    }

    /// All descendants of a node in depth-first order, excluding the node
    pub fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[index].children.to_vec();
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend_from_slice(&self.nodes[i].children);
        }
        out
    }

    /// Age of the oldest tip in the subtree rooted at `index`
    ///
    /// Zero for a clade of present-day samples. This is the lower bound for
    /// any new age assigned to `index`, since tip ages are fixed.
    pub fn oldest_tip_age(&self, index: usize) -> f64 {
        let mut oldest: f64 = 0.0;
        for i in self.descendants(index) {
            if self.is_tip(i) {
                oldest = oldest.max(self.nodes[i].age);
            }
        }
        if self.is_tip(index) {
            oldest = oldest.max(self.nodes[index].age);
        }
        oldest
    }

    /// Rescale the ages of all interior nodes in the subtree rooted at
    /// `index` (inclusive) by `factor`
    ///
    /// Tip ages are left untouched. Returns the number of rescaled nodes.
    pub fn rescale_subtree(&mut self, index: usize, factor: f64) -> usize {
        let mut count = 0;
        if self.is_interior(index) {
            self.nodes[index].age *= factor;
            count += 1;
        }
        for i in self.descendants(index) {
            if self.is_interior(i) {
                self.nodes[i].age *= factor;
                count += 1;
            }
        }
        count
    }

    /// Snapshot of all node ages, in index order
    pub fn ages(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.age).collect()
    }

    /// Overwrite all node ages from a snapshot taken with [`TimeTree::ages`]
    pub fn set_ages(&mut self, ages: &[f64]) {
        debug_assert_eq!(ages.len(), self.nodes.len());
        for (node, &age) in self.nodes.iter_mut().zip(ages.iter()) {
            node.age = age;
        }
    }

    /// Whether every node is non-negative in age and younger than its parent
    pub fn is_consistent(&self) -> bool {
        self.nodes.iter().all(|n| {
            n.age >= 0.0
                && n.age.is_finite()
                && n.children.iter().all(|&c| self.nodes[c].age < n.age)
        })
    }

    /// Sum of all branch lengths
    pub fn tree_length(&self) -> f64 {
        (0..self.num_nodes()).map(|i| self.branch_length(i)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Four tips, three interior nodes:
    ///
    /// ```text
    ///        6 (age 10)
    ///       /  \
    ///      4    5 (age 4)
    ///   (age 6) |  \
    ///    / \    2   3
    ///   0   1      (tips, age 0)
    /// ```
    fn balanced_four_tip_tree() -> TimeTree {
        TimeTree::from_parents(
            &[
                Some(4),
                Some(4),
                Some(5),
                Some(5),
                Some(6),
                Some(6),
                None,
            ],
            &[0.0, 0.0, 0.0, 0.0, 6.0, 4.0, 10.0],
        )
        .unwrap()
    }

    #[test]
    fn test_topology_accessors() {
        let tree = balanced_four_tip_tree();
        assert_eq!(tree.num_nodes(), 7);
        assert_eq!(tree.num_tips(), 4);
        assert_eq!(tree.num_interior_nodes(), 3);
        assert_eq!(tree.root(), 6);
        assert!(tree.is_tip(0));
        assert!(tree.is_interior(4));
        assert!(!tree.is_root(4));
        assert_eq!(tree.parent(4), Some(6));
        assert_eq!(tree.children(6), &[4, 5]);
    }

    #[test]
    fn test_branch_lengths() {
        let tree = balanced_four_tip_tree();
        assert!((tree.branch_length(0) - 6.0).abs() < 1e-12);
        assert!((tree.branch_length(4) - 4.0).abs() < 1e-12);
        assert!((tree.branch_length(6) - 0.0).abs() < 1e-12);
        assert!((tree.tree_length() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_descendants() {
        let tree = balanced_four_tip_tree();
        let mut desc = tree.descendants(6);
        desc.sort_unstable();
        assert_eq!(desc, vec![0, 1, 2, 3, 4, 5]);
        let mut desc = tree.descendants(5);
        desc.sort_unstable();
        assert_eq!(desc, vec![2, 3]);
    }

    #[test]
    fn test_rescale_subtree_leaves_tips_alone() {
        let mut tree = balanced_four_tip_tree();
        let count = tree.rescale_subtree(6, 0.5);
        assert_eq!(count, 3);
        assert!((tree.age(6) - 5.0).abs() < 1e-12);
        assert!((tree.age(4) - 3.0).abs() < 1e-12);
        assert!((tree.age(5) - 2.0).abs() < 1e-12);
        for tip in 0..4 {
            assert_eq!(tree.age(tip), 0.0);
        }
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_ages_roundtrip() {
        let mut tree = balanced_four_tip_tree();
        let snapshot = tree.ages();
        tree.rescale_subtree(6, 2.0);
        assert!((tree.age(6) - 20.0).abs() < 1e-12);
        tree.set_ages(&snapshot);
        assert_eq!(tree.ages(), snapshot);
    }

    #[test]
    fn test_consistency_detects_negative_branch() {
        let mut tree = balanced_four_tip_tree();
        assert!(tree.is_consistent());
        // make node 4 older than its parent
        tree.set_age(4, 12.0);
        assert!(!tree.is_consistent());
    }

    #[test]
    fn test_oldest_tip_age_with_serial_samples() {
        let tree = TimeTree::from_parents(
            &[Some(2), Some(2), None],
            &[0.0, 1.5, 5.0],
        )
        .unwrap();
        assert!((tree.oldest_tip_age(2) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_topologies_rejected() {
        // two roots
        assert!(TimeTree::from_parents(&[None, None], &[0.0, 0.0]).is_none());
        // self-parent
        assert!(TimeTree::from_parents(&[Some(0)], &[0.0]).is_none());
        // child older than parent
        assert!(
            TimeTree::from_parents(&[Some(1), None], &[3.0, 2.0]).is_none()
        );
    }

    #[test]
    fn test_interior_non_root_nodes() {
        let tree = balanced_four_tip_tree();
        let mut interior = tree.interior_non_root_nodes();
        interior.sort_unstable();
        assert_eq!(interior, vec![4, 5]);
    }
}
