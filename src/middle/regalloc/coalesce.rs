//! 复制合并
//!
//! Names connected by direct copies `x := y` form chains (connected components
//! of the assignment graph). A chain shares one register, but only members that
//! do not interfere with each other are merged: a member conflicting with a
//! group starts or joins another group.

use super::interference::InterferenceGraph;
use crate::middle::ir::Method;
use indexmap::{IndexMap, IndexSet};

/// Undirected graph of direct copies between `candidates`
pub fn assignment_graph(
    method: &Method,
    candidates: &IndexSet<String>,
) -> IndexMap<String, IndexSet<String>> {
    let mut graph: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for instr in &method.instructions {
        let Some((dest, src)) = instr.as_copy() else {
            continue;
        };
        if dest.name == src.name || !candidates.contains(&dest.name) || !candidates.contains(&src.name) {
            continue;
        }
        graph
            .entry(dest.name.clone())
            .or_default()
            .insert(src.name.clone());
        graph
            .entry(src.name.clone())
            .or_default()
            .insert(dest.name.clone());
    }
    graph
}

/// Connected components with at least two members, members in `order`
pub fn copy_components(
    graph: &IndexMap<String, IndexSet<String>>,
    order: &IndexSet<String>,
) -> Vec<Vec<String>> {
    let mut seen: IndexSet<&str> = IndexSet::new();
    let mut components = Vec::new();

    for start in order {
        if !graph.contains_key(start) || seen.contains(start.as_str()) {
            continue;
        }
        let mut members: IndexSet<&str> = IndexSet::new();
        let mut stack = vec![start.as_str()];
        while let Some(node) = stack.pop() {
            if !members.insert(node) {
                continue;
            }
            if let Some(next) = graph.get(node) {
                stack.extend(next.iter().map(String::as_str).filter(|n| !members.contains(n)));
            }
        }
        seen.extend(members.iter().copied());

        let component: Vec<String> = order
            .iter()
            .filter(|name| members.contains(name.as_str()))
            .cloned()
            .collect();
        if component.len() >= 2 {
            components.push(component);
        }
    }
    components
}

/// Split a component into groups whose members are pairwise non-interfering
pub fn split_interfering(
    component: &[String],
    interference: &InterferenceGraph,
) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = Vec::new();
    for name in component {
        let slot = groups
            .iter_mut()
            .find(|group| group.iter().all(|member| !interference.interferes(member, name)));
        match slot {
            Some(group) => group.push(name.clone()),
            None => groups.push(vec![name.clone()]),
        }
    }
    groups
}

/// Coalesced chains: groups of at least two names that will share a register
pub fn coalesced_chains(
    method: &Method,
    candidates: &IndexSet<String>,
    interference: &InterferenceGraph,
) -> Vec<Vec<String>> {
    let graph = assignment_graph(method, candidates);
    copy_components(&graph, candidates)
        .iter()
        .flat_map(|component| split_interfering(component, interference))
        .filter(|group| group.len() >= 2)
        .collect()
}
