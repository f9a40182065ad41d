/// Per-type JSON Schema validation and id/filename consistency checks.
///
/// Each entity type directory carries a `_schema.json`; schemas compile once
/// per run and are reused across every file of that type.
use std::collections::HashMap;

use crate::index::{FileStore, expected_id};
use crate::model::EntityType;
use crate::report::{Diagnostic, Location, Report, RuleId};

/// Runs the schema validator over every discovered file of every type.
pub fn validate_schemas(store: &dyn FileStore) -> Report {
    let mut report = Report::new();
    let mut schema_cache: HashMap<&'static str, Option<jsonschema::Validator>> = HashMap::new();

    for t in EntityType::ALL {
        let schema_path = format!("{}/_schema.json", t.dir_name());
        let validator = schema_cache
            .entry(t.dir_name())
            .or_insert_with(|| compile_schema(store, &schema_path));

        for path in store.list_json_files(t.dir_name()) {
            let Some(validator) = validator.as_ref() else {
                report.diagnostics.push(Diagnostic::error(
                    RuleId::NoSchema,
                    Location::File {
                        path: path.clone(),
                        field: None,
                    },
                    format!("no schema found at {schema_path}"),
                ));
                continue;
            };

            let Some(bytes) = store.read(&path) else {
                continue;
            };
            let value: serde_json::Value = match serde_json::from_slice(&bytes) {
                Ok(v) => v,
                Err(e) => {
                    report.diagnostics.push(Diagnostic::error(
                        RuleId::Parse,
                        Location::File {
                            path,
                            field: None,
                        },
                        format!("invalid JSON: {e}"),
                    ));
                    continue;
                }
            };

            let errors: Vec<String> = validator.iter_errors(&value).map(|e| e.to_string()).collect();
            if !errors.is_empty() {
                report.diagnostics.push(Diagnostic::error(
                    RuleId::Schema,
                    Location::File {
                        path: path.clone(),
                        field: None,
                    },
                    errors.join("; "),
                ));
            }

            if let Some(id) = value.get("id").and_then(serde_json::Value::as_str) {
                if let Some(expected) = expected_id(t, &path) {
                    if id != expected {
                        report.diagnostics.push(Diagnostic::error(
                            RuleId::IdMismatch,
                            Location::File {
                                path,
                                field: Some("id".to_owned()),
                            },
                            format!("id {id:?} does not match path-derived id {expected:?}"),
                        ));
                    }
                }
            }
        }
    }

    report
}

fn compile_schema(store: &dyn FileStore, path: &str) -> Option<jsonschema::Validator> {
    let bytes = store.read(path)?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    jsonschema::validator_for(&value).ok()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::index::test_support::FakeFileStore;

    fn property_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["id", "label", "datatype"],
            "properties": {
                "id": {"type": "string"},
                "label": {"type": "string"},
                "datatype": {"type": "string"},
            },
        })
    }

    #[test]
    fn missing_schema_is_reported() {
        let store = FakeFileStore::new().with_json(
            "categories/Person.json",
            serde_json::json!({"id": "Person", "label": "Person"}),
        );
        let report = validate_schemas(&store);
        assert!(report.diagnostics.iter().any(|d| d.rule_id == RuleId::NoSchema));
    }

    #[test]
    fn schema_violation_is_reported() {
        let store = FakeFileStore::new()
            .with_json("properties/_schema.json", property_schema())
            .with_json("properties/Name.json", serde_json::json!({"id": "Name", "label": "Name"}));
        let report = validate_schemas(&store);
        assert!(report.diagnostics.iter().any(|d| d.rule_id == RuleId::Schema));
    }

    #[test]
    fn id_mismatch_is_reported() {
        let store = FakeFileStore::new()
            .with_json("properties/_schema.json", property_schema())
            .with_json(
                "properties/Name.json",
                serde_json::json!({"id": "OtherName", "label": "Name", "datatype": "Text"}),
            );
        let report = validate_schemas(&store);
        assert!(report.diagnostics.iter().any(|d| d.rule_id == RuleId::IdMismatch));
    }

    #[test]
    fn conforming_file_yields_no_diagnostics_for_its_type() {
        let store = FakeFileStore::new()
            .with_json("properties/_schema.json", property_schema())
            .with_json(
                "properties/Name.json",
                serde_json::json!({"id": "Name", "label": "Name", "datatype": "Text"}),
            );
        let report = validate_schemas(&store);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn invalid_json_reports_parse() {
        let store = FakeFileStore::new()
            .with_json("properties/_schema.json", property_schema())
            .with_raw("properties/Broken.json", "{not json");
        let report = validate_schemas(&store);
        assert!(report.diagnostics.iter().any(|d| d.rule_id == RuleId::Parse));
    }
}
