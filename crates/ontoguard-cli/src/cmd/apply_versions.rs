//! Implementation of `ontoguard apply-versions --repo <path> --base <revision>`.
//!
//! Runs validation, detects changes since `base`, cascades bumps through the
//! module dependency graph, and writes the results back into the
//! repository: updated `version` fields on modules and bundles, a new root
//! `VERSION`, generated artifacts under `modules/<id>/versions/` and
//! `bundles/<id>/versions/`, and removal of `VERSION_OVERRIDES.json`.
use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use ontoguard_core::{
    BumpClass, CascadeResult, EntityIndex, EntityType, FileStore, SemVer, VersionedStore, build_bundle_manifest, build_module_artifact,
    build_index, detect_changes, run_cascade, validate_repository,
};

use crate::OutputFormat;
use crate::error::CliError;
use crate::io::{self, RealFileStore};

const OVERRIDES_PATH: &str = "VERSION_OVERRIDES.json";

/// Runs the `apply-versions` command.
///
/// # Errors
///
/// Returns [`CliError::ValidationErrors`] if the repository has validation
/// errors (nothing is written in that case), or a host-level [`CliError`] if
/// `git`, a read, or a write fails.
pub fn run(
    store: &RealFileStore,
    versioned: &dyn VersionedStore,
    base: &str,
    format: OutputFormat,
    summary_sink: Option<&Path>,
) -> Result<(), CliError> {
    let report = validate_repository(store);
    if report.has_errors() {
        crate::cmd::validate::print_diagnostics(&report, format);
        return Err(CliError::ValidationErrors);
    }

    let index = build_index(store);
    let overrides = read_overrides(store)?;
    let changes = detect_changes(store, versioned, base);
    let result = run_cascade(&index, &changes, &overrides);

    for warning in &result.override_warnings {
        eprintln!("{warning}");
    }

    let current_ontology = read_ontology_version(store)?;
    let new_ontology = match result.ontology_bump {
        Some(bump) => current_ontology.apply_bump(bump),
        None => current_ontology.clone(),
    };

    write_new_versions(store.root(), &result)?;

    if result.ontology_bump.is_some() {
        io::write_atomic(store.root(), "VERSION", new_ontology.to_string().as_bytes())?;
    }

    let fresh_index = build_index(store);
    write_artifacts(store.root(), &fresh_index, &result, &new_ontology)?;

    io::remove_if_present(store.root(), OVERRIDES_PATH)?;

    let summary = result_json(&result, &current_ontology, &new_ontology);
    println!("{summary}");
    if let Some(path) = summary_sink {
        io::write_atomic(store.root(), &path.display().to_string(), format!("{summary}\n").as_bytes())?;
    }

    Ok(())
}

fn read_overrides(store: &RealFileStore) -> Result<BTreeMap<String, BumpClass>, CliError> {
    let Some(bytes) = store.read(OVERRIDES_PATH) else {
        return Ok(BTreeMap::new());
    };
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| CliError::InvalidOverrides { detail: e.to_string() })?;
    let object = value.as_object().ok_or_else(|| CliError::InvalidOverrides { detail: "expected a JSON object".to_owned() })?;

    let mut overrides = BTreeMap::new();
    for (id, bump_value) in object {
        let bump_str = bump_value
            .as_str()
            .ok_or_else(|| CliError::InvalidOverrides { detail: format!("override for {id:?} is not a string") })?;
        let bump = bump_str
            .parse::<BumpClass>()
            .map_err(|e| CliError::InvalidOverrides { detail: format!("override for {id:?}: {e}") })?;
        overrides.insert(id.clone(), bump);
    }
    Ok(overrides)
}

fn read_ontology_version(store: &RealFileStore) -> Result<SemVer, CliError> {
    let bytes = io::read_required(store.root(), "VERSION", u64::MAX)?;
    let raw = String::from_utf8_lossy(&bytes).trim().to_owned();
    SemVer::try_from(raw.as_str()).map_err(|e| CliError::InvalidOverrides { detail: format!("VERSION file: {e}") })
}

fn write_new_versions(root: &Path, result: &CascadeResult) -> Result<(), CliError> {
    for (id, entry) in result.module_versions.iter().chain(&result.bundle_versions) {
        let Some(new_version) = &entry.new else {
            continue;
        };
        let entity_type = if result.module_versions.contains_key(id) { EntityType::Module } else { EntityType::Bundle };
        patch_version_field(root, entity_type, id, new_version)?;
    }
    Ok(())
}

fn patch_version_field(root: &Path, entity_type: EntityType, id: &str, new_version: &SemVer) -> Result<(), CliError> {
    let path = format!("{}/{id}.json", entity_type.dir_name());
    let bytes = io::read_required(root, &path, u64::MAX)?;
    let mut value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| CliError::IoError { source: path.clone(), detail: e.to_string() })?;
    if let Some(object) = value.as_object_mut() {
        object.insert("version".to_owned(), serde_json::Value::String(new_version.to_string()));
    }
    let pretty = serde_json::to_vec_pretty(&value).map_err(|e| CliError::IoError { source: path.clone(), detail: e.to_string() })?;
    io::write_atomic(root, &path, &pretty)
}

fn write_artifacts(root: &Path, index: &EntityIndex, result: &CascadeResult, ontology_version: &SemVer) -> Result<(), CliError> {
    let generated = Utc::now();

    for (id, entry) in &result.module_versions {
        let Some(new_version) = &entry.new else {
            continue;
        };
        let Ok(artifact) = build_module_artifact(index, id, new_version, generated) else {
            continue;
        };
        let path = format!("modules/{id}/versions/{new_version}.json");
        let bytes =
            serde_json::to_vec_pretty(&artifact).map_err(|e| CliError::IoError { source: path.clone(), detail: e.to_string() })?;
        io::write_atomic(root, &path, &bytes)?;
    }

    for (id, entry) in &result.bundle_versions {
        let Some(new_version) = &entry.new else {
            continue;
        };
        let Ok(manifest) = build_bundle_manifest(index, id, new_version, ontology_version, generated) else {
            continue;
        };
        let path = format!("bundles/{id}/versions/{new_version}.json");
        let bytes =
            serde_json::to_vec_pretty(&manifest).map_err(|e| CliError::IoError { source: path.clone(), detail: e.to_string() })?;
        io::write_atomic(root, &path, &bytes)?;
    }

    Ok(())
}

fn result_json(result: &CascadeResult, current_ontology: &SemVer, new_ontology: &SemVer) -> serde_json::Value {
    serde_json::json!({
        "ontologyVersion": { "from": current_ontology.to_string(), "to": new_ontology.to_string() },
        "ontologyBump": result.ontology_bump.map(|b| b.to_string()),
        "moduleBumps": result.module_bumps.iter().map(|(k, v)| (k.clone(), v.to_string())).collect::<BTreeMap<_, _>>(),
        "bundleBumps": result.bundle_bumps.iter().map(|(k, v)| (k.clone(), v.to_string())).collect::<BTreeMap<_, _>>(),
        "orphanChanges": result.orphan_changes.iter().map(|c| c.path.clone()).collect::<Vec<_>>(),
        "overrideWarnings": result.override_warnings.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
    })
}
