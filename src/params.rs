use std::collections::BTreeMap;

use ndarray::ArrayD;

use crate::{Result, TrainErr};

/// A single entry of a [`ParamTree`]: either an array of values or a nested
/// subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamNode {
    Leaf(ArrayD<f32>),
    Tree(ParamTree),
}

/// A nested mapping from parameter name to numeric array.
///
/// Two independent instances exist during a training run: the *live* tree,
/// rewritten every step by the optimizer, and the *averaged* tree, rewritten
/// every step by the tracker and never by the optimizer. Entries are kept in
/// a `BTreeMap` so iteration order (and therefore every derived computation)
/// is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamTree {
    entries: BTreeMap<String, ParamNode>,
}

impl ParamTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) a leaf array under `name`.
    ///
    /// # Arguments
    /// * `name` - The entry name at this nesting level.
    /// * `values` - The parameter array stored under `name`.
    pub fn insert_leaf(&mut self, name: impl Into<String>, values: ArrayD<f32>) {
        self.entries.insert(name.into(), ParamNode::Leaf(values));
    }

    /// Inserts (or replaces) a nested subtree under `name`.
    pub fn insert_tree(&mut self, name: impl Into<String>, subtree: ParamTree) {
        self.entries.insert(name.into(), ParamNode::Tree(subtree));
    }

    /// Returns the node stored directly under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&ParamNode> {
        self.entries.get(name)
    }

    /// Returns the leaf array stored directly under `name`, if any.
    pub fn leaf(&self, name: &str) -> Option<&ArrayD<f32>> {
        match self.entries.get(name) {
            Some(ParamNode::Leaf(values)) => Some(values),
            _ => None,
        }
    }

    /// Number of entries at this nesting level.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of scalar parameters across all leaves.
    pub fn num_params(&self) -> usize {
        self.entries
            .values()
            .map(|node| match node {
                ParamNode::Leaf(values) => values.len(),
                ParamNode::Tree(subtree) => subtree.num_params(),
            })
            .sum()
    }

    /// Iterates the entries at this nesting level in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamNode)> {
        self.entries.iter()
    }

    /// Collects every leaf together with its '/'-joined path, in path order.
    pub fn leaves(&self) -> Vec<(String, &ArrayD<f32>)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut Vec::new(), &mut out);
        out
    }

    fn collect_leaves<'t>(
        &'t self,
        path: &mut Vec<&'t str>,
        out: &mut Vec<(String, &'t ArrayD<f32>)>,
    ) {
        for (name, node) in &self.entries {
            path.push(name);
            match node {
                ParamNode::Leaf(values) => out.push((path.join("/"), values)),
                ParamNode::Tree(subtree) => subtree.collect_leaves(path, out),
            }
            path.pop();
        }
    }

    /// Combines two structurally identical trees leaf by leaf.
    ///
    /// Walks both trees in lockstep and builds a fresh tree where every leaf
    /// is `combine(self_leaf, other_leaf)`. Neither input is mutated.
    ///
    /// # Arguments
    /// * `other` - The tree combined with `self`; must mirror its structure.
    /// * `combine` - The per-leaf operation.
    ///
    /// # Errors
    /// Returns `TrainErr::StructureMismatch` when the key sets diverge at any
    /// level, and `TrainErr::LeafShapeMismatch` when a shared key holds arrays
    /// of different shapes. Both carry the offending '/'-joined path.
    pub fn zip_map<F>(&self, other: &Self, combine: F) -> Result<ParamTree>
    where
        F: Fn(&ArrayD<f32>, &ArrayD<f32>) -> ArrayD<f32>,
    {
        self.zip_map_at(other, &mut Vec::new(), &combine)
    }

    fn zip_map_at<'t, F>(
        &'t self,
        other: &'t Self,
        path: &mut Vec<&'t str>,
        combine: &F,
    ) -> Result<ParamTree>
    where
        F: Fn(&ArrayD<f32>, &ArrayD<f32>) -> ArrayD<f32>,
    {
        // A key present in `other` but absent here must be reported too.
        for name in other.entries.keys() {
            if !self.entries.contains_key(name) {
                return Err(TrainErr::StructureMismatch {
                    path: join_path(path, name),
                });
            }
        }

        let mut out = ParamTree::new();

        for (name, node) in &self.entries {
            let Some(counterpart) = other.entries.get(name) else {
                return Err(TrainErr::StructureMismatch {
                    path: join_path(path, name),
                });
            };

            path.push(name);
            match (node, counterpart) {
                (ParamNode::Leaf(a), ParamNode::Leaf(b)) => {
                    if a.shape() != b.shape() {
                        return Err(TrainErr::LeafShapeMismatch {
                            path: path.join("/"),
                            got: b.shape().to_vec(),
                            expected: a.shape().to_vec(),
                        });
                    }
                    out.insert_leaf(name.clone(), combine(a, b));
                }
                (ParamNode::Tree(a), ParamNode::Tree(b)) => {
                    out.insert_tree(name.clone(), a.zip_map_at(b, path, combine)?);
                }
                _ => {
                    return Err(TrainErr::StructureMismatch {
                        path: path.join("/"),
                    });
                }
            }
            path.pop();
        }

        Ok(out)
    }
}

fn join_path(path: &[&str], name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", path.join("/"), name)
    }
}
