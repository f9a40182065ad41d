/// A single reusable directed-graph primitive, shared by all three acyclicity
/// relations the engine checks (category `parents`, property
/// `parent_property`, module `dependencies`).
///
/// Each relation gets its own [`DepGraph`] instance rather than three bespoke
/// graph types — the node identifier is always a plain entity id string, and
/// edges are built directly from the reference field under inspection.
/// Dangling references (an id with no corresponding node) are never inserted
/// as edges; the reference validator reports those separately.
pub mod cycles;

pub use cycles::detect_cycles;

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};

/// A directed graph over entity ids, built from one reference relation.
#[derive(Debug, Default)]
pub struct DepGraph {
    graph: StableDiGraph<String, ()>,
    id_to_index: HashMap<String, NodeIndex>,
}

impl DepGraph {
    /// Builds a [`DepGraph`] from a complete set of node ids and a list of
    /// `(from, to)` edges. Edges whose endpoints are not both present in
    /// `node_ids` are silently dropped (dangling references are the
    /// responsibility of the reference validator, not the cycle detector).
    pub fn build<'a>(
        node_ids: impl IntoIterator<Item = &'a str>,
        edges: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut graph: StableDiGraph<String, ()> = StableDiGraph::new();
        let mut id_to_index: HashMap<String, NodeIndex> = HashMap::new();

        for id in node_ids {
            let idx = graph.add_node(id.to_owned());
            id_to_index.insert(id.to_owned(), idx);
        }

        for (from, to) in edges {
            if let (Some(&f), Some(&t)) = (id_to_index.get(from), id_to_index.get(to)) {
                graph.add_edge(f, t, ());
            }
        }

        Self { graph, id_to_index }
    }

    /// Returns the [`NodeIndex`] for a node id, if present.
    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_index.get(id).copied()
    }

    /// Returns the node id string stored at the given index.
    pub fn id_at(&self, idx: NodeIndex) -> &str {
        self.graph.node_weight(idx).map(String::as_str).unwrap_or("")
    }

    /// Iterates over every node id in the graph, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(String::as_str)
    }

    /// Returns the direct successors (outgoing-edge targets) of a node id.
    pub fn successors(&self, id: &str) -> Vec<&str> {
        let Some(idx) = self.node_index(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.id_at(n))
            .collect()
    }

    fn inner(&self) -> &StableDiGraph<String, ()> {
        &self.graph
    }
}
