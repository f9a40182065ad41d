/// Warns on content-bearing entities claimed by no module.
use crate::index::EntityIndex;
use crate::model::EntityType;
use crate::ownership::OwnerMap;
use crate::report::{Diagnostic, Location, Report, RuleId};

/// Runs the orphan detector over every category, property, subobject, and
/// template in the index. Modules and bundles are never considered orphans.
pub fn find_orphans(index: &EntityIndex) -> Report {
    let mut report = Report::new();
    let owners = OwnerMap::build(index);

    for t in EntityType::ALL {
        if !t.is_content_bearing() {
            continue;
        }
        for indexed in index.entities_of(t) {
            if owners.owner_of(t, indexed.entity.id()).is_none() {
                report.diagnostics.push(Diagnostic::warning(
                    RuleId::OrphanedEntity,
                    Location::File {
                        path: indexed.path.clone(),
                        field: None,
                    },
                    format!("{} is claimed by no module", indexed.entity.id()),
                ));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::index::build_index;
    use crate::index::test_support::FakeFileStore;

    #[test]
    fn unclaimed_category_is_an_orphan() {
        let store = FakeFileStore::new().with_json(
            "categories/Loose.json",
            serde_json::json!({"id": "Loose", "label": "Loose"}),
        );
        let index = build_index(&store);
        let report = find_orphans(&index);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].rule_id, RuleId::OrphanedEntity);
    }

    #[test]
    fn claimed_category_is_not_an_orphan() {
        let store = FakeFileStore::new()
            .with_json("categories/Person.json", serde_json::json!({"id": "Person", "label": "Person"}))
            .with_json(
                "modules/Core.json",
                serde_json::json!({"id": "Core", "label": "Core", "version": "1.0.0", "categories": ["Person"]}),
            );
        let index = build_index(&store);
        let report = find_orphans(&index);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn modules_and_bundles_are_never_orphans() {
        let store = FakeFileStore::new()
            .with_json("modules/Core.json", serde_json::json!({"id": "Core", "label": "Core", "version": "1.0.0"}))
            .with_json("bundles/Default.json", serde_json::json!({"id": "Default", "label": "Default", "version": "1.0.0"}));
        let index = build_index(&store);
        let report = find_orphans(&index);
        assert!(report.diagnostics.is_empty());
    }
}
