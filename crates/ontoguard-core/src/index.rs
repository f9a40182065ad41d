/// Entity discovery and indexing.
///
/// Builds an in-memory index `I[type][id] = entity` from a repository's
/// entity files. The engine never touches the filesystem directly: it reads
/// through the [`FileStore`] capability, so tests can exercise the index
/// builder against an in-memory fixture without any real I/O.
use std::collections::BTreeMap;
use std::fmt;

use crate::model::{Entity, EntityType};

/// Read-only access to the files of a repository working tree.
///
/// Implementations live outside `ontoguard-core`: a real implementation backed
/// by `std::fs` belongs to the CLI crate; tests use an in-memory map.
pub trait FileStore {
    /// Lists every file path under `dir` matching `**/*.json`, relative to
    /// the repository root, in lexicographic order. Excludes `_schema.json`
    /// and anything under a `versions/` directory.
    fn list_json_files(&self, dir: &str) -> Vec<String>;

    /// Reads the raw bytes of the file at `path` (repository-root-relative).
    ///
    /// Returns `None` if the path does not exist.
    fn read(&self, path: &str) -> Option<Vec<u8>>;
}

/// A single discovered entity, paired with the path it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntity {
    /// The parsed entity.
    pub entity: Entity,
    /// Repository-root-relative path the entity was read from.
    pub path: String,
}

/// A problem encountered while discovering or parsing files that stops the
/// affected file from being indexed.
///
/// These are not validation diagnostics: they are recorded so the schema
/// validator (which re-derives the same parse failure) can report them, but
/// index construction itself never fails outright — a broken file is simply
/// absent from the index.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    /// Path of the file that could not be indexed.
    pub path: String,
    /// Human-readable reason it was skipped.
    pub reason: String,
}

impl fmt::Display for SkippedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// In-memory index of every discovered entity, keyed by type then id.
///
/// Iteration order within a type matches file-discovery order (lexicographic
/// by relative path), which downstream validators rely on for deterministic
/// diagnostic ordering.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    by_type: BTreeMap<EntityType, Vec<IndexedEntity>>,
    skipped: Vec<SkippedFile>,
}

impl EntityIndex {
    /// Returns every indexed entity of the given type, in discovery order.
    pub fn entities_of(&self, t: EntityType) -> &[IndexedEntity] {
        self.by_type.get(&t).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Looks up a single entity by type and id.
    pub fn get(&self, t: EntityType, id: &str) -> Option<&Entity> {
        self.entities_of(t)
            .iter()
            .find(|e| e.entity.id() == id)
            .map(|e| &e.entity)
    }

    /// Returns `true` if an entity of the given type and id exists.
    pub fn contains(&self, t: EntityType, id: &str) -> bool {
        self.get(t, id).is_some()
    }

    /// Returns every file that was discovered but could not be parsed or
    /// indexed, in discovery order.
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Iterates over all indexed entities across all six types, in
    /// `EntityType::ALL` then discovery order.
    pub fn iter_all(&self) -> impl Iterator<Item = &IndexedEntity> {
        EntityType::ALL.into_iter().flat_map(move |t| self.entities_of(t).iter())
    }
}

/// Builds an [`EntityIndex`] by discovering and parsing every entity file
/// under each of the six type directories.
///
/// A file that fails to parse as JSON, or whose JSON has no string `id`
/// field, is recorded in [`EntityIndex::skipped`] rather than causing the
/// whole build to fail — the schema validator re-derives and reports the
/// same parse failure as a diagnostic.
pub fn build_index(store: &dyn FileStore) -> EntityIndex {
    let mut index = EntityIndex::default();

    for t in EntityType::ALL {
        let mut entities = Vec::new();
        for path in store.list_json_files(t.dir_name()) {
            let Some(bytes) = store.read(&path) else {
                index.skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: "file disappeared during indexing".to_owned(),
                });
                continue;
            };
            let value: serde_json::Value = match serde_json::from_slice(&bytes) {
                Ok(v) => v,
                Err(e) => {
                    index.skipped.push(SkippedFile {
                        path: path.clone(),
                        reason: format!("invalid JSON: {e}"),
                    });
                    continue;
                }
            };
            let Some(id) = value.get("id").and_then(serde_json::Value::as_str) else {
                index.skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: "missing string \"id\" field".to_owned(),
                });
                continue;
            };
            let id = id.to_owned();
            match Entity::parse(t, value) {
                Ok(entity) => entities.push(IndexedEntity { entity, path }),
                Err(e) => index.skipped.push(SkippedFile {
                    path,
                    reason: format!("does not conform to the {t} shape: {e} (id {id:?})"),
                }),
            }
        }
        index.by_type.insert(t, entities);
    }

    index
}

/// Computes the path-derived expected id for a file under an entity type
/// directory: the path relative to the type directory with `.json` stripped.
///
/// `path` is repository-root-relative, e.g. `"properties/Name.json"` for
/// type [`EntityType::Property`] yields `"Name"`.
pub fn expected_id(entity_type: EntityType, path: &str) -> Option<String> {
    let prefix = format!("{}/", entity_type.dir_name());
    let rest = path.strip_prefix(&prefix)?;
    rest.strip_suffix(".json").map(str::to_owned)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::FileStore;
    use std::collections::BTreeMap;

    /// An in-memory [`FileStore`] backed by a flat map of path to bytes.
    #[derive(Debug, Clone, Default)]
    pub struct FakeFileStore {
        files: BTreeMap<String, Vec<u8>>,
    }

    impl FakeFileStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_json(mut self, path: &str, value: serde_json::Value) -> Self {
            self.files
                .insert(path.to_owned(), serde_json::to_vec(&value).unwrap_or_default());
            self
        }

        pub fn with_raw(mut self, path: &str, bytes: &str) -> Self {
            self.files.insert(path.to_owned(), bytes.as_bytes().to_vec());
            self
        }
    }

    impl FileStore for FakeFileStore {
        fn list_json_files(&self, dir: &str) -> Vec<String> {
            let prefix = format!("{dir}/");
            self.files
                .keys()
                .filter(|p| {
                    p.starts_with(&prefix)
                        && p.ends_with(".json")
                        && !p.ends_with("_schema.json")
                        && !p[prefix.len()..].contains("versions/")
                })
                .cloned()
                .collect()
        }

        fn read(&self, path: &str) -> Option<Vec<u8>> {
            self.files.get(path).cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::test_support::FakeFileStore;
    use super::*;

    #[test]
    fn build_index_finds_entities_by_type() {
        let store = FakeFileStore::new()
            .with_json("categories/Person.json", serde_json::json!({"id": "Person", "label": "Person"}))
            .with_json("properties/Name.json", serde_json::json!({"id": "Name", "label": "Name", "datatype": "Text"}));
        let index = build_index(&store);
        assert!(index.contains(EntityType::Category, "Person"));
        assert!(index.contains(EntityType::Property, "Name"));
        assert!(!index.contains(EntityType::Category, "Ghost"));
    }

    #[test]
    fn build_index_excludes_schema_files() {
        let store = FakeFileStore::new()
            .with_json("categories/_schema.json", serde_json::json!({"type": "object"}))
            .with_json("categories/Person.json", serde_json::json!({"id": "Person", "label": "Person"}));
        let index = build_index(&store);
        assert_eq!(index.entities_of(EntityType::Category).len(), 1);
    }

    #[test]
    fn build_index_excludes_versions_subdir() {
        let store = FakeFileStore::new().with_json(
            "modules/Core/versions/1.0.0.json",
            serde_json::json!({"id": "Core"}),
        );
        let index = build_index(&store);
        assert!(index.entities_of(EntityType::Module).is_empty());
    }

    #[test]
    fn build_index_skips_invalid_json() {
        let store = FakeFileStore::new().with_raw("categories/Broken.json", "{not json");
        let index = build_index(&store);
        assert_eq!(index.skipped().len(), 1);
        assert!(index.skipped()[0].reason.contains("invalid JSON"));
    }

    #[test]
    fn build_index_skips_missing_id() {
        let store = FakeFileStore::new().with_json("categories/NoId.json", serde_json::json!({"label": "x"}));
        let index = build_index(&store);
        assert_eq!(index.skipped().len(), 1);
        assert!(index.skipped()[0].reason.contains("missing string"));
    }

    #[test]
    fn expected_id_strips_dir_and_extension() {
        assert_eq!(
            expected_id(EntityType::Property, "properties/Name.json"),
            Some("Name".to_owned())
        );
        assert_eq!(
            expected_id(EntityType::Template, "templates/infobox/person.json"),
            Some("infobox/person".to_owned())
        );
    }

    #[test]
    fn expected_id_rejects_wrong_dir() {
        assert_eq!(expected_id(EntityType::Property, "categories/Name.json"), None);
    }
}
