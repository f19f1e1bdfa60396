//! 干涉图
//!
//! Undirected graph over the allocatable names of one method. `a` and `b`
//! interfere when
//!
//! - (a) `a` is defined at `i` and `b ∈ liveOut[i]`,
//! - (b) `a` is defined at `i` and `b` is used at `i`, or
//! - (c) both are in `liveIn[i] ∪ liveOut[i]` for some `i`.
//!
//! At a direct copy `x := y` the pair `(x, y)` is not added by (b) or (c) from
//! that instruction alone; (a) still applies, so `y` surviving the copy keeps
//! them apart.

use crate::error::{CompileError, CompileResult};
use crate::middle::ir::Method;
use crate::middle::liveness::Liveness;
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterferenceGraph {
    adjacency: IndexMap<String, IndexSet<String>>,
}

impl InterferenceGraph {
    pub fn new<'a>(nodes: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            adjacency: nodes
                .into_iter()
                .map(|n| (n.to_string(), IndexSet::new()))
                .collect(),
        }
    }

    pub fn contains(
        &self,
        node: &str,
    ) -> bool {
        self.adjacency.contains_key(node)
    }

    /// Adds `a — b` when both are nodes and distinct
    pub fn add_edge(
        &mut self,
        a: &str,
        b: &str,
    ) {
        if a == b || !self.contains(a) || !self.contains(b) {
            return;
        }
        if let Some(neighbors) = self.adjacency.get_mut(a) {
            neighbors.insert(b.to_string());
        }
        if let Some(neighbors) = self.adjacency.get_mut(b) {
            neighbors.insert(a.to_string());
        }
    }

    pub fn interferes(
        &self,
        a: &str,
        b: &str,
    ) -> bool {
        self.adjacency
            .get(a)
            .map(|neighbors| neighbors.contains(b))
            .unwrap_or(false)
    }

    pub fn neighbors(
        &self,
        node: &str,
    ) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(node)
            .into_iter()
            .flat_map(|neighbors| neighbors.iter().map(String::as_str))
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.adjacency.keys().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(IndexSet::len).sum::<usize>() / 2
    }

    /// Build the graph over `nodes` from the liveness of `method`.
    ///
    /// Every name the analysis mentions must have a variable table entry.
    pub fn build<'a>(
        method: &Method,
        liveness: &Liveness,
        nodes: impl IntoIterator<Item = &'a str>,
    ) -> CompileResult<Self> {
        let mut graph = Self::new(nodes);

        for idx in 0..liveness.len() {
            for name in liveness.used[idx]
                .iter()
                .chain(&liveness.defined[idx])
                .chain(&liveness.live_in[idx])
                .chain(&liveness.live_out[idx])
            {
                if !method.vars.contains_key(name) {
                    return Err(CompileError::allocator(
                        &method.name,
                        format!("`{}` is live at instruction {} but has no variable table entry", name, idx),
                    ));
                }
            }

            let copy = method.instructions[idx]
                .as_copy()
                .map(|(dest, src)| (dest.name.as_str(), src.name.as_str()));
            let is_copy_pair = |a: &str, b: &str| {
                copy.map(|(d, s)| (a == d && b == s) || (a == s && b == d))
                    .unwrap_or(false)
            };

            for def in &liveness.defined[idx] {
                // (a)
                for out in &liveness.live_out[idx] {
                    graph.add_edge(def, out);
                }
                // (b)
                for used in &liveness.used[idx] {
                    if !is_copy_pair(def, used) {
                        graph.add_edge(def, used);
                    }
                }
            }

            // (c)
            let live: IndexSet<&String> = liveness.live_in[idx]
                .iter()
                .chain(&liveness.live_out[idx])
                .collect();
            let live: Vec<&String> = live.into_iter().collect();
            for (pos, a) in live.iter().enumerate() {
                for b in &live[pos + 1..] {
                    if !is_copy_pair(a, b) {
                        graph.add_edge(a, b);
                    }
                }
            }
        }

        Ok(graph)
    }
}
