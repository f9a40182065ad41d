/// Comparison of a base revision against the working tree, classified into
/// the bump size each change requires.
use std::collections::HashSet;

use serde_json::Value;

use crate::index::expected_id;
use crate::index::FileStore;
use crate::model::EntityType;
use crate::newtypes::BumpClass;

/// Read access to a repository at a named base revision.
///
/// The CLI crate's implementation shells out to `git diff --name-only` and
/// `git show`; a failure from either operation is treated as "no changes"
/// rather than propagated as an error, per the engine's resource model.
pub trait VersionedStore {
    /// Lists paths that differ between `base` and the working tree.
    fn list_changed(&self, base: &str) -> Vec<String>;

    /// Reads the bytes of `path` as it existed at `base`. Returns `None` if
    /// the path did not exist at that revision.
    fn read_at(&self, base: &str, path: &str) -> Option<Vec<u8>>;
}

/// Whether an entity was added, removed, or edited between base and working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Present in the working tree, absent at the base revision.
    Added,
    /// Present at the base revision, absent in the working tree.
    Removed,
    /// Present at both revisions with different content.
    Modified,
}

/// A single classified change to an entity file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityChange {
    /// Repository-root-relative path of the changed file.
    pub path: String,
    /// The path-derived entity id.
    pub id: String,
    /// The entity type the path belongs to.
    pub entity_type: EntityType,
    /// Whether the entity was added, removed, or modified.
    pub kind: ChangeKind,
    /// The bump size this change requires.
    pub bump: BumpClass,
    /// A human-readable reason, present for deletions and id changes.
    pub reason: Option<String>,
}

/// Detects and classifies every entity change between `base` and the working
/// tree reachable through `working`.
pub fn detect_changes(working: &dyn FileStore, versioned: &dyn VersionedStore, base: &str) -> Vec<EntityChange> {
    versioned
        .list_changed(base)
        .into_iter()
        .filter_map(|path| {
            let entity_type = entity_type_for_path(&path)?;
            let base_bytes = versioned.read_at(base, &path);
            let working_bytes = working.read(&path);
            Some(classify(entity_type, path, base_bytes.as_deref(), working_bytes.as_deref()))
        })
        .collect()
}

fn entity_type_for_path(path: &str) -> Option<EntityType> {
    let (dir, rest) = path.split_once('/')?;
    if rest.ends_with("_schema.json") || !rest.ends_with(".json") {
        return None;
    }
    EntityType::from_dir_name(dir)
}

fn classify(entity_type: EntityType, path: String, base_bytes: Option<&[u8]>, working_bytes: Option<&[u8]>) -> EntityChange {
    let base_value = base_bytes.and_then(|b| serde_json::from_slice::<Value>(b).ok());
    let working_value = working_bytes.and_then(|b| serde_json::from_slice::<Value>(b).ok());

    match (&base_value, &working_value) {
        (Some(base), None) => {
            let id = base.get("id").and_then(Value::as_str).unwrap_or("?").to_owned();
            let reason = format!("{entity_type} deleted: {id}");
            new_change(path, entity_type, id, ChangeKind::Removed, BumpClass::Major, Some(reason))
        }
        (None, Some(working)) => {
            let id = working_id(entity_type, &path, working);
            new_change(path, entity_type, id, ChangeKind::Added, BumpClass::Minor, None)
        }
        (None, None) => {
            let id = expected_id(entity_type, &path).unwrap_or_default();
            new_change(path, entity_type, id, ChangeKind::Modified, BumpClass::Patch, None)
        }
        (Some(base), Some(working)) => classify_modified(entity_type, path, base, working),
    }
}

fn working_id(entity_type: EntityType, path: &str, working: &Value) -> String {
    working
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| expected_id(entity_type, path))
        .unwrap_or_default()
}

fn classify_modified(entity_type: EntityType, path: String, base: &Value, working: &Value) -> EntityChange {
    let base_id = base.get("id").and_then(Value::as_str);
    let working_id = working.get("id").and_then(Value::as_str);

    if base_id != working_id {
        let reason = format!("id changed: {} -> {}", base_id.unwrap_or("?"), working_id.unwrap_or("?"));
        let id = working_id.unwrap_or("?").to_owned();
        return new_change(path, entity_type, id, ChangeKind::Modified, BumpClass::Major, Some(reason));
    }

    let id = working_id.unwrap_or("?").to_owned();

    if let Some(bump) = type_specific_bump(entity_type, base, working) {
        return new_change(path, entity_type, id, ChangeKind::Modified, bump, None);
    }

    if let (Some(b), Some(w)) = (base.as_object(), working.as_object()) {
        if w.keys().any(|k| !b.contains_key(k)) {
            return new_change(path, entity_type, id, ChangeKind::Modified, BumpClass::Minor, None);
        }
        if w.iter().any(|(k, v)| b.get(k) != Some(v)) {
            return new_change(path, entity_type, id, ChangeKind::Modified, BumpClass::Patch, None);
        }
    }

    new_change(path, entity_type, id, ChangeKind::Modified, BumpClass::Patch, None)
}

fn type_specific_bump(entity_type: EntityType, base: &Value, working: &Value) -> Option<BumpClass> {
    match entity_type {
        EntityType::Property => property_bump(base, working),
        EntityType::Category => category_bump(base, working),
        EntityType::Module | EntityType::Bundle => structural_field_removed(base, working),
        EntityType::Subobject | EntityType::Template => None,
    }
}

fn property_bump(base: &Value, working: &Value) -> Option<BumpClass> {
    if base.get("datatype") != working.get("datatype") {
        return Some(BumpClass::Major);
    }

    let base_cardinality = base.get("cardinality").and_then(Value::as_str).unwrap_or("single");
    let working_cardinality = working.get("cardinality").and_then(Value::as_str).unwrap_or("single");
    if base_cardinality == "multiple" && working_cardinality == "single" {
        return Some(BumpClass::Major);
    }

    let base_values = string_set(base.get("allowed_values"));
    let working_values = string_set(working.get("allowed_values"));
    if base.get("allowed_values").is_some() && working.get("allowed_values").is_some() {
        if base_values.iter().any(|v| !working_values.contains(v)) {
            return Some(BumpClass::Major);
        }
        if working_values.iter().any(|v| !base_values.contains(v)) {
            return Some(BumpClass::Minor);
        }
    }

    None
}

fn category_bump(base: &Value, working: &Value) -> Option<BumpClass> {
    let base_required = string_set(base.get("required_properties"));
    let working_required = string_set(working.get("required_properties"));
    if working_required.iter().any(|id| !base_required.contains(id)) {
        return Some(BumpClass::Major);
    }

    let base_optional = string_set(base.get("optional_properties"));
    let working_optional = string_set(working.get("optional_properties"));
    if base_optional.iter().any(|id| !working_optional.contains(id)) {
        return Some(BumpClass::Major);
    }

    None
}

fn structural_field_removed(base: &Value, working: &Value) -> Option<BumpClass> {
    for field in ["id", "label", "description", "categories", "properties"] {
        if base.get(field).is_some() && working.get(field).is_none() {
            return Some(BumpClass::Major);
        }
    }
    None
}

fn string_set(value: Option<&Value>) -> HashSet<&str> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect()
}

fn new_change(path: String, entity_type: EntityType, id: String, kind: ChangeKind, bump: BumpClass, reason: Option<String>) -> EntityChange {
    EntityChange {
        path,
        id,
        entity_type,
        kind,
        bump,
        reason,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::VersionedStore;
    use std::collections::BTreeMap;

    /// An in-memory [`VersionedStore`] backed by a flat map of base-revision
    /// file contents and an explicit changed-path list.
    #[derive(Debug, Clone, Default)]
    pub struct FakeVersionedStore {
        base_files: BTreeMap<String, Vec<u8>>,
        changed: Vec<String>,
    }

    impl FakeVersionedStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_base_json(mut self, path: &str, value: serde_json::Value) -> Self {
            self.base_files
                .insert(path.to_owned(), serde_json::to_vec(&value).unwrap_or_default());
            self.changed.push(path.to_owned());
            self
        }

        pub fn changed(mut self, path: &str) -> Self {
            if !self.changed.contains(&path.to_owned()) {
                self.changed.push(path.to_owned());
            }
            self
        }
    }

    impl VersionedStore for FakeVersionedStore {
        fn list_changed(&self, _base: &str) -> Vec<String> {
            self.changed.clone()
        }

        fn read_at(&self, _base: &str, path: &str) -> Option<Vec<u8>> {
            self.base_files.get(path).cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::test_support::FakeVersionedStore;
    use super::*;
    use crate::index::test_support::FakeFileStore;

    #[test]
    fn deleted_entity_is_major() {
        let working = FakeFileStore::new();
        let base = FakeVersionedStore::new().with_base_json(
            "properties/Name.json",
            serde_json::json!({"id": "Name", "label": "Name", "datatype": "Text"}),
        );
        let changes = detect_changes(&working, &base, "HEAD");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].bump, BumpClass::Major);
        assert_eq!(changes[0].kind, ChangeKind::Removed);
    }

    #[test]
    fn added_entity_is_minor() {
        let working = FakeFileStore::new().with_json(
            "properties/Email.json",
            serde_json::json!({"id": "Email", "label": "Email", "datatype": "Text"}),
        );
        let base = FakeVersionedStore::new().changed("properties/Email.json");
        let changes = detect_changes(&working, &base, "HEAD");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].bump, BumpClass::Minor);
        assert_eq!(changes[0].kind, ChangeKind::Added);
    }

    #[test]
    fn datatype_change_is_major() {
        let working = FakeFileStore::new().with_json(
            "properties/Name.json",
            serde_json::json!({"id": "Name", "label": "Name", "datatype": "Integer"}),
        );
        let base = FakeVersionedStore::new().with_base_json(
            "properties/Name.json",
            serde_json::json!({"id": "Name", "label": "Name", "datatype": "Text"}),
        );
        let changes = detect_changes(&working, &base, "HEAD");
        assert_eq!(changes[0].bump, BumpClass::Major);
    }

    #[test]
    fn new_required_property_is_major() {
        let working = FakeFileStore::new().with_json(
            "categories/Person.json",
            serde_json::json!({"id": "Person", "label": "Person", "required_properties": ["Name"]}),
        );
        let base = FakeVersionedStore::new().with_base_json(
            "categories/Person.json",
            serde_json::json!({"id": "Person", "label": "Person"}),
        );
        let changes = detect_changes(&working, &base, "HEAD");
        assert_eq!(changes[0].bump, BumpClass::Major);
    }

    #[test]
    fn unrelated_label_edit_is_patch() {
        let working = FakeFileStore::new().with_json(
            "properties/Name.json",
            serde_json::json!({"id": "Name", "label": "Full Name", "datatype": "Text"}),
        );
        let base = FakeVersionedStore::new().with_base_json(
            "properties/Name.json",
            serde_json::json!({"id": "Name", "label": "Name", "datatype": "Text"}),
        );
        let changes = detect_changes(&working, &base, "HEAD");
        assert_eq!(changes[0].bump, BumpClass::Patch);
    }

    #[test]
    fn schema_files_are_excluded_from_detection() {
        let working = FakeFileStore::new();
        let base = FakeVersionedStore::new().changed("properties/_schema.json");
        let changes = detect_changes(&working, &base, "HEAD");
        assert!(changes.is_empty());
    }
}
