/// Self-contained JSON artifact generation for modules and bundles.
///
/// Writing the result to `modules/<id>/versions/<v>.json` (or the bundle
/// equivalent) through a temp-file-then-rename sequence is the CLI's
/// responsibility; this module only produces the value to write.
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::index::EntityIndex;
use crate::model::{Entity, EntityType};
use crate::newtypes::SemVer;

const MODULE_SCHEMA_URL: &str = "https://ontoguard.dev/schemas/module-artifact.json";
const BUNDLE_SCHEMA_URL: &str = "https://ontoguard.dev/schemas/bundle-manifest.json";

/// A failure while assembling an artifact: always a consequence of an
/// inconsistent repository (a dangling reference that reached this stage
/// despite validation, or an unknown module/bundle id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    /// The requested module id has no entry in the index.
    UnknownModule(String),
    /// The requested bundle id has no entry in the index.
    UnknownBundle(String),
    /// A module or bundle references an entity absent from the index.
    MissingEntity {
        /// The type of the missing entity.
        entity_type: EntityType,
        /// The id that was not found.
        id: String,
    },
    /// A module depends on another module absent from the index.
    MissingDependency {
        /// The module doing the depending (or the bundle doing the shipping).
        owner_id: String,
        /// The dependency id that was not found.
        dependency_id: String,
    },
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownModule(id) => write!(f, "no module named {id:?}"),
            Self::UnknownBundle(id) => write!(f, "no bundle named {id:?}"),
            Self::MissingEntity { entity_type, id } => write!(f, "no {entity_type} named {id:?}"),
            Self::MissingDependency { owner_id, dependency_id } => {
                write!(f, "{owner_id:?} depends on {dependency_id:?}, which does not exist")
            }
        }
    }
}

impl std::error::Error for ArtifactError {}

/// A module's generated, self-contained artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleArtifact {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub id: String,
    pub version: String,
    pub generated: String,
    pub dependencies: BTreeMap<String, String>,
    pub categories: Vec<Value>,
    pub properties: Vec<Value>,
    pub subobjects: Vec<Value>,
    pub templates: Vec<Value>,
}

/// A bundle's generated manifest.
#[derive(Debug, Clone, Serialize)]
pub struct BundleManifest {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub id: String,
    pub version: String,
    pub generated: String,
    #[serde(rename = "ontologyVersion")]
    pub ontology_version: String,
    pub modules: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Builds the self-contained artifact for module `module_id` at `version`.
pub fn build_module_artifact(
    index: &EntityIndex,
    module_id: &str,
    version: &SemVer,
    generated: DateTime<Utc>,
) -> Result<ModuleArtifact, ArtifactError> {
    let Some(Entity::Module(module)) = index.get(EntityType::Module, module_id) else {
        return Err(ArtifactError::UnknownModule(module_id.to_owned()));
    };

    let mut dependencies = BTreeMap::new();
    for dep_id in &module.dependencies {
        let Some(Entity::Module(dep)) = index.get(EntityType::Module, dep_id) else {
            return Err(ArtifactError::MissingDependency {
                owner_id: module_id.to_owned(),
                dependency_id: dep_id.clone(),
            });
        };
        dependencies.insert(dep_id.clone(), dep.version.to_string());
    }

    Ok(ModuleArtifact {
        schema: MODULE_SCHEMA_URL.to_owned(),
        id: module_id.to_owned(),
        version: version.to_string(),
        generated: format_timestamp(generated),
        dependencies,
        categories: collect(index, EntityType::Category, &module.categories)?,
        properties: collect(index, EntityType::Property, &module.properties)?,
        subobjects: collect(index, EntityType::Subobject, &module.subobjects)?,
        templates: collect(index, EntityType::Template, &module.templates)?,
    })
}

/// Builds the manifest for bundle `bundle_id` at `version`, recording the
/// ontology-wide version `ontology_version` alongside it.
pub fn build_bundle_manifest(
    index: &EntityIndex,
    bundle_id: &str,
    version: &SemVer,
    ontology_version: &SemVer,
    generated: DateTime<Utc>,
) -> Result<BundleManifest, ArtifactError> {
    let Some(Entity::Bundle(bundle)) = index.get(EntityType::Bundle, bundle_id) else {
        return Err(ArtifactError::UnknownBundle(bundle_id.to_owned()));
    };

    let mut modules = BTreeMap::new();
    for module_id in &bundle.modules {
        let Some(Entity::Module(module)) = index.get(EntityType::Module, module_id) else {
            return Err(ArtifactError::MissingDependency {
                owner_id: bundle_id.to_owned(),
                dependency_id: module_id.clone(),
            });
        };
        modules.insert(module_id.clone(), module.version.to_string());
    }

    Ok(BundleManifest {
        schema: BUNDLE_SCHEMA_URL.to_owned(),
        id: bundle_id.to_owned(),
        version: version.to_string(),
        generated: format_timestamp(generated),
        ontology_version: ontology_version.to_string(),
        modules,
        description: bundle.description.clone(),
    })
}

fn collect(index: &EntityIndex, t: EntityType, ids: &[String]) -> Result<Vec<Value>, ArtifactError> {
    ids.iter()
        .map(|id| {
            let entity = index
                .get(t, id)
                .ok_or_else(|| ArtifactError::MissingEntity { entity_type: t, id: id.clone() })?;
            Ok(entity_to_value(entity))
        })
        .collect()
}

fn entity_to_value(entity: &Entity) -> Value {
    match entity {
        Entity::Category(c) => serde_json::to_value(c),
        Entity::Property(p) => serde_json::to_value(p),
        Entity::Subobject(s) => serde_json::to_value(s),
        Entity::Template(t) => serde_json::to_value(t),
        Entity::Module(m) => serde_json::to_value(m),
        Entity::Bundle(b) => serde_json::to_value(b),
    }
    .unwrap_or(Value::Null)
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
