/// Module ownership and dependency-closure computation.
///
/// Shared by the reference validator (module-scope checks) and the cascade
/// engine (aggregating owned changes upward). Both need the same reverse
/// index from `(type, id)` to the owning module, and the same closure of a
/// module's transitive dependencies.
use std::collections::{HashMap, HashSet};

use crate::graph::DepGraph;
use crate::index::EntityIndex;
use crate::model::{EntityType, Module};

/// Reverse index from a content-bearing entity to the module that claims it.
#[derive(Debug, Clone, Default)]
pub struct OwnerMap {
    owners: HashMap<(EntityType, String), String>,
}

impl OwnerMap {
    /// Builds the reverse index by iterating every module's contents.
    ///
    /// If two modules claim the same entity, the first one encountered in
    /// index order wins; this can only happen in an already-inconsistent
    /// repository and is not separately diagnosed.
    pub fn build(index: &EntityIndex) -> Self {
        let mut owners = HashMap::new();
        for indexed in index.entities_of(EntityType::Module) {
            let crate::model::Entity::Module(module) = &indexed.entity else {
                continue;
            };
            for (t, id) in module.contents() {
                owners
                    .entry((t, id.to_owned()))
                    .or_insert_with(|| module.id.clone());
            }
        }
        Self { owners }
    }

    /// Returns the module id that claims `(type, id)`, if any.
    pub fn owner_of(&self, t: EntityType, id: &str) -> Option<&str> {
        self.owners.get(&(t, id.to_owned())).map(String::as_str)
    }
}

/// Builds the module-dependency [`DepGraph`] from every module's
/// `dependencies` field.
pub fn module_dependency_graph(index: &EntityIndex) -> DepGraph {
    let modules: Vec<&Module> = index
        .entities_of(EntityType::Module)
        .iter()
        .filter_map(|e| match &e.entity {
            crate::model::Entity::Module(m) => Some(m),
            _ => None,
        })
        .collect();

    let ids: Vec<&str> = modules.iter().map(|m| m.id.as_str()).collect();
    let edges: Vec<(&str, &str)> = modules
        .iter()
        .flat_map(|m| m.dependencies.iter().map(move |dep| (m.id.as_str(), dep.as_str())))
        .collect();

    DepGraph::build(ids, edges)
}

/// Computes the transitive closure of `module_id` over the dependency graph:
/// the module itself plus every module reachable via `dependencies`.
///
/// Returns `None` if the dependency graph contains a cycle reachable from
/// `module_id` (scope checks then skip rather than report spuriously; the
/// cycle itself is reported separately by the cycle detector).
pub fn module_closure(graph: &DepGraph, module_id: &str) -> Option<HashSet<String>> {
    let mut closure: HashSet<String> = HashSet::new();
    let mut stack = vec![module_id.to_owned()];
    let mut visiting: HashSet<String> = HashSet::new();

    while let Some(current) = stack.pop() {
        if closure.contains(&current) {
            continue;
        }
        if visiting.contains(&current) {
            return None;
        }
        visiting.insert(current.clone());
        closure.insert(current.clone());
        for dep in graph.successors(&current) {
            stack.push(dep.to_owned());
        }
    }

    Some(closure)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::index::test_support::FakeFileStore;
    use crate::index::build_index;

    fn module_json(id: &str, deps: &[&str], categories: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "label": id,
            "version": "1.0.0",
            "categories": categories,
            "dependencies": deps,
        })
    }

    #[test]
    fn owner_map_finds_claiming_module() {
        let store = FakeFileStore::new()
            .with_json("modules/Core.json", module_json("Core", &[], &["Person"]))
            .with_json("categories/Person.json", serde_json::json!({"id": "Person", "label": "Person"}));
        let index = build_index(&store);
        let owners = OwnerMap::build(&index);
        assert_eq!(owners.owner_of(EntityType::Category, "Person"), Some("Core"));
        assert_eq!(owners.owner_of(EntityType::Category, "Ghost"), None);
    }

    #[test]
    fn module_closure_includes_transitive_deps() {
        let store = FakeFileStore::new()
            .with_json("modules/A.json", module_json("A", &["B"], &[]))
            .with_json("modules/B.json", module_json("B", &["C"], &[]))
            .with_json("modules/C.json", module_json("C", &[], &[]));
        let index = build_index(&store);
        let graph = module_dependency_graph(&index);
        let closure = module_closure(&graph, "A").expect("acyclic");
        assert!(closure.contains("A"));
        assert!(closure.contains("B"));
        assert!(closure.contains("C"));
    }

    #[test]
    fn module_closure_none_on_cycle() {
        let store = FakeFileStore::new()
            .with_json("modules/A.json", module_json("A", &["B"], &[]))
            .with_json("modules/B.json", module_json("B", &["A"], &[]));
        let index = build_index(&store);
        let graph = module_dependency_graph(&index);
        assert!(module_closure(&graph, "A").is_none());
    }
}
