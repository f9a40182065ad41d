/// Top-level orchestration tying every validator into a single report.
///
/// Every applicable validator runs on every invocation; an error from one
/// never suppresses the others. Diagnostic order follows component order:
/// schema, references, cycles, orphans.
use crate::graph::{DepGraph, detect_cycles};
use crate::index::{EntityIndex, FileStore, build_index};
use crate::model::{Entity, EntityType};
use crate::newtypes::SemVer;
use crate::orphan::find_orphans;
use crate::ownership::module_dependency_graph;
use crate::refs::validate_references;
use crate::report::{Diagnostic, Location, Report, RuleId};
use crate::schema::validate_schemas;

/// Runs the full validation pipeline over a repository reached through
/// `store`.
pub fn validate_repository(store: &dyn FileStore) -> Report {
    let mut report = Report::new();

    report.extend(check_version_file(store));
    report.extend(validate_schemas(store).diagnostics);

    let index = build_index(store);

    report.extend(validate_references(&index).diagnostics);
    report.extend(cycle_diagnostics(&index));
    report.extend(find_orphans(&index).diagnostics);

    report
}

fn check_version_file(store: &dyn FileStore) -> Vec<Diagnostic> {
    match store.read("VERSION") {
        None => vec![Diagnostic::error(RuleId::MissingVersion, Location::VersionFile, "VERSION file is absent")],
        Some(bytes) => {
            let raw = String::from_utf8_lossy(&bytes).trim().to_owned();
            match SemVer::try_from(raw.as_str()) {
                Ok(_) => Vec::new(),
                Err(_) => vec![Diagnostic::error(
                    RuleId::InvalidVersion,
                    Location::VersionFile,
                    format!("VERSION file does not contain a valid semver: {raw:?}"),
                )],
            }
        }
    }
}

fn cycle_diagnostics(index: &EntityIndex) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    diagnostics.extend(relation_cycles(
        RuleId::CircularCategoryInheritance,
        category_parent_graph(index),
    ));
    diagnostics.extend(relation_cycles(
        RuleId::CircularPropertyParent,
        property_parent_graph(index),
    ));
    diagnostics.extend(relation_cycles(RuleId::CircularModuleDependency, module_dependency_graph(index)));

    diagnostics
}

fn relation_cycles(rule_id: RuleId, graph: DepGraph) -> Vec<Diagnostic> {
    detect_cycles(&graph)
        .into_iter()
        .map(|cycle| Diagnostic::error(rule_id.clone(), Location::Global, format!("cycle: {}", cycle.join(" -> "))))
        .collect()
}

fn category_parent_graph(index: &EntityIndex) -> DepGraph {
    let categories: Vec<_> = index
        .entities_of(EntityType::Category)
        .iter()
        .filter_map(|e| match &e.entity {
            Entity::Category(c) => Some(c),
            _ => None,
        })
        .collect();
    let ids: Vec<&str> = categories.iter().map(|c| c.id.as_str()).collect();
    let edges: Vec<(&str, &str)> = categories
        .iter()
        .flat_map(|c| c.parents.iter().map(move |p| (c.id.as_str(), p.as_str())))
        .collect();
    DepGraph::build(ids, edges)
}

fn property_parent_graph(index: &EntityIndex) -> DepGraph {
    let properties: Vec<_> = index
        .entities_of(EntityType::Property)
        .iter()
        .filter_map(|e| match &e.entity {
            Entity::Property(p) => Some(p),
            _ => None,
        })
        .collect();
    let ids: Vec<&str> = properties.iter().map(|p| p.id.as_str()).collect();
    let edges: Vec<(&str, &str)> = properties
        .iter()
        .filter_map(|p| p.parent_property.as_ref().map(|parent| (p.id.as_str(), parent.as_str())))
        .collect();
    DepGraph::build(ids, edges)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::index::test_support::FakeFileStore;

    fn property_schema() -> serde_json::Value {
        serde_json::json!({"type": "object", "required": ["id", "label", "datatype"]})
    }

    fn category_schema() -> serde_json::Value {
        serde_json::json!({"type": "object", "required": ["id", "label"]})
    }

    #[test]
    fn valid_repository_has_zero_errors() {
        let store = FakeFileStore::new()
            .with_raw("VERSION", "1.0.0")
            .with_json("properties/_schema.json", property_schema())
            .with_json("categories/_schema.json", category_schema())
            .with_json("properties/Name.json", serde_json::json!({"id": "Name", "label": "Name", "datatype": "Text"}))
            .with_json(
                "categories/Person.json",
                serde_json::json!({"id": "Person", "label": "Person", "optional_properties": ["Name"]}),
            );
        let report = validate_repository(&store);
        assert!(!report.has_errors(), "{:?}", report.diagnostics);
    }

    #[test]
    fn missing_version_file_is_reported() {
        let store = FakeFileStore::new();
        let report = validate_repository(&store);
        assert!(report.diagnostics.iter().any(|d| d.rule_id == RuleId::MissingVersion));
    }

    #[test]
    fn invalid_version_file_is_reported() {
        let store = FakeFileStore::new().with_raw("VERSION", "not-a-version");
        let report = validate_repository(&store);
        assert!(report.diagnostics.iter().any(|d| d.rule_id == RuleId::InvalidVersion));
    }

    #[test]
    fn category_cycle_is_reported() {
        let store = FakeFileStore::new()
            .with_json("categories/A.json", serde_json::json!({"id": "A", "label": "A", "parents": ["B"]}))
            .with_json("categories/B.json", serde_json::json!({"id": "B", "label": "B", "parents": ["A"]}));
        let report = validate_repository(&store);
        assert!(report.diagnostics.iter().any(|d| d.rule_id == RuleId::CircularCategoryInheritance));
    }

    #[test]
    fn scope_violation_from_scenario_is_fatal() {
        let store = FakeFileStore::new()
            .with_raw("VERSION", "1.0.0")
            .with_json(
                "modules/Core.json",
                serde_json::json!({"id": "Core", "label": "Core", "version": "1.0.0", "properties": ["Name"], "categories": ["Person"]}),
            )
            .with_json(
                "modules/Other.json",
                serde_json::json!({"id": "Other", "label": "Other", "version": "1.0.0", "properties": ["Isolated"], "dependencies": []}),
            )
            .with_json(
                "categories/Person.json",
                serde_json::json!({"id": "Person", "label": "Person", "optional_properties": ["Name", "Isolated"]}),
            )
            .with_json("properties/Name.json", serde_json::json!({"id": "Name", "label": "Name", "datatype": "Text"}))
            .with_json("properties/Isolated.json", serde_json::json!({"id": "Isolated", "label": "Isolated", "datatype": "Text"}));
        let report = validate_repository(&store);
        assert!(report.has_errors());
        assert!(report.diagnostics.iter().any(|d| d.rule_id == RuleId::ScopeViolation));
    }
}
