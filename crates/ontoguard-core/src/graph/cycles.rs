/// Cycle detection shared by all three acyclicity relations.
///
/// Implements Kahn's algorithm (BFS-based topological sort) to find nodes
/// that participate in a cycle, then extracts the individual cycles among
/// them via iterative DFS. A self-loop counts as a cycle.
use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::stable_graph::NodeIndex;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use super::DepGraph;

/// Detects cycles in `graph`.
///
/// Returns an empty `Vec` if `graph` is acyclic. Otherwise returns one
/// `Vec<String>` per detected cycle, each a closed path of entity ids (first
/// and last entry equal).
pub fn detect_cycles(graph: &DepGraph) -> Vec<Vec<String>> {
    let g = graph.inner();

    let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
    for node_idx in g.node_indices() {
        in_degree.entry(node_idx).or_insert(0);
    }
    for edge_ref in g.edge_references() {
        *in_degree.entry(edge_ref.target()).or_insert(0) += 1;
    }

    let mut queue: VecDeque<NodeIndex> = in_degree
        .iter()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(&idx, _)| idx)
        .collect();

    let mut visited_count = 0usize;
    let total_nodes = in_degree.len();

    while let Some(node) = queue.pop_front() {
        visited_count += 1;
        for edge_ref in g.edges(node) {
            let target = edge_ref.target();
            if let Some(deg) = in_degree.get_mut(&target) {
                if *deg > 0 {
                    *deg -= 1;
                }
                if *deg == 0 {
                    queue.push_back(target);
                }
            }
        }
    }

    if visited_count == total_nodes {
        return Vec::new();
    }

    let cyclic_nodes: HashSet<NodeIndex> = in_degree
        .iter()
        .filter(|&(_, &deg)| deg > 0)
        .map(|(&idx, _)| idx)
        .collect();

    extract_cycles(graph, &cyclic_nodes)
}

/// Extracts individual cycles from a set of nodes known to be in cycles via
/// iterative DFS restricted to that set.
fn extract_cycles(graph: &DepGraph, cyclic_nodes: &HashSet<NodeIndex>) -> Vec<Vec<String>> {
    let g = graph.inner();
    let mut all_cycles: Vec<Vec<NodeIndex>> = Vec::new();
    let mut globally_visited: HashSet<NodeIndex> = HashSet::new();

    for &start in cyclic_nodes {
        if globally_visited.contains(&start) {
            continue;
        }

        let mut path: Vec<NodeIndex> = Vec::new();
        let mut on_path: HashSet<NodeIndex> = HashSet::new();
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();

        let start_children = filtered_successors(g, start, cyclic_nodes);
        stack.push((start, start_children, 0));
        path.push(start);
        on_path.insert(start);

        while let Some(frame) = stack.last_mut() {
            let (node, children, child_idx) = frame;
            let node = *node;

            if *child_idx >= children.len() {
                stack.pop();
                path.pop();
                on_path.remove(&node);
                globally_visited.insert(node);
                continue;
            }

            let child = children[*child_idx];
            *child_idx += 1;

            if on_path.contains(&child) {
                if let Some(cycle_start_pos) = path.iter().position(|&n| n == child) {
                    let mut cycle: Vec<NodeIndex> = path[cycle_start_pos..].to_vec();
                    cycle.push(child);
                    all_cycles.push(cycle);
                }
                continue;
            }

            if globally_visited.contains(&child) {
                continue;
            }

            let child_children = filtered_successors(g, child, cyclic_nodes);
            path.push(child);
            on_path.insert(child);
            stack.push((child, child_children, 0));
        }
    }

    all_cycles
        .into_iter()
        .map(|cycle| cycle.into_iter().map(|idx| graph.id_at(idx).to_owned()).collect())
        .collect()
}

fn filtered_successors(
    g: &petgraph::stable_graph::StableDiGraph<String, ()>,
    node: NodeIndex,
    cyclic_nodes: &HashSet<NodeIndex>,
) -> Vec<NodeIndex> {
    g.edges(node)
        .map(|e| e.target())
        .filter(|t| cyclic_nodes.contains(t))
        .collect()
}
