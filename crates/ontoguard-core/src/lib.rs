#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod artifact;
pub mod cascade;
pub mod change;
pub mod graph;
pub mod index;
pub mod model;
pub mod newtypes;
pub mod orphan;
pub mod ownership;
pub mod refs;
pub mod report;
pub mod schema;
pub mod validate;

pub use artifact::{ArtifactError, BundleManifest, ModuleArtifact, build_bundle_manifest, build_module_artifact};
pub use cascade::{CascadeResult, VersionEntry, run_cascade};
pub use change::{ChangeKind, EntityChange, VersionedStore, detect_changes};
pub use graph::{DepGraph, detect_cycles};
pub use index::{EntityIndex, FileStore, IndexedEntity, SkippedFile, build_index, expected_id};
pub use model::{Bundle, Cardinality, Category, Entity, EntityType, Extra, Module, Property, Subobject, Template};
pub use newtypes::{BumpClass, EntityId, NewtypeError, SemVer, max_bump};
pub use orphan::find_orphans;
pub use ownership::{OwnerMap, module_closure, module_dependency_graph};
pub use refs::validate_references;
pub use report::{Diagnostic, Location, Report, RuleId, Severity};
pub use schema::validate_schemas;
pub use validate::validate_repository;

/// Returns the current version of the ontoguard-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn version_is_semver() {
        let v = version();
        let parts: Vec<&str> = v.split('.').collect();
        assert_eq!(parts.len(), 3, "version should have 3 parts: {v}");
        for part in parts {
            part.parse::<u32>().expect("each part should be a number");
        }
    }
}
