/// Reference and constraint validation (existence, self-reference, module
/// scope, and required/optional disjointness).
///
/// The reference field table below is the single source of truth for which
/// fields on which entity types point at which other entity types; both the
/// existence/self-reference/scope checks here and the cycle detector's choice
/// of relation are driven by this table's shape (cycle detection only
/// applies to the three fields marked `cycles_checked`).
use crate::index::EntityIndex;
use crate::model::{Entity, EntityType};
use crate::ownership::{OwnerMap, module_closure, module_dependency_graph};
use crate::report::{Diagnostic, Location, Report, RuleId};

/// One reference a single entity instance holds toward entities of another
/// (or the same) type, extracted from whichever field declares it.
struct ReferenceValue<'a> {
    field: &'static str,
    target_type: EntityType,
    ids: Vec<&'a str>,
    /// Scope checks do not apply to references that target modules or
    /// bundles (a module's `dependencies` and a bundle's `modules` are
    /// exempt by definition).
    scope_checked: bool,
}

fn references_of(entity: &Entity) -> Vec<ReferenceValue<'_>> {
    match entity {
        Entity::Category(c) => vec![
            ReferenceValue {
                field: "parents",
                target_type: EntityType::Category,
                ids: c.parents.iter().map(String::as_str).collect(),
                scope_checked: true,
            },
            ReferenceValue {
                field: "required_properties",
                target_type: EntityType::Property,
                ids: c.required_properties.iter().map(String::as_str).collect(),
                scope_checked: true,
            },
            ReferenceValue {
                field: "optional_properties",
                target_type: EntityType::Property,
                ids: c.optional_properties.iter().map(String::as_str).collect(),
                scope_checked: true,
            },
            ReferenceValue {
                field: "required_subobjects",
                target_type: EntityType::Subobject,
                ids: c.required_subobjects.iter().map(String::as_str).collect(),
                scope_checked: true,
            },
            ReferenceValue {
                field: "optional_subobjects",
                target_type: EntityType::Subobject,
                ids: c.optional_subobjects.iter().map(String::as_str).collect(),
                scope_checked: true,
            },
        ],
        Entity::Property(p) => {
            let mut refs = vec![];
            if let Some(parent) = &p.parent_property {
                refs.push(ReferenceValue {
                    field: "parent_property",
                    target_type: EntityType::Property,
                    ids: vec![parent.as_str()],
                    scope_checked: true,
                });
            }
            if let Some(template) = &p.has_display_template {
                refs.push(ReferenceValue {
                    field: "has_display_template",
                    target_type: EntityType::Template,
                    ids: vec![template.as_str()],
                    scope_checked: true,
                });
            }
            refs
        }
        Entity::Subobject(s) => vec![
            ReferenceValue {
                field: "required_properties",
                target_type: EntityType::Property,
                ids: s.required_properties.iter().map(String::as_str).collect(),
                scope_checked: true,
            },
            ReferenceValue {
                field: "optional_properties",
                target_type: EntityType::Property,
                ids: s.optional_properties.iter().map(String::as_str).collect(),
                scope_checked: true,
            },
        ],
        Entity::Template(_) => vec![],
        Entity::Module(m) => vec![
            ReferenceValue {
                field: "categories",
                target_type: EntityType::Category,
                ids: m.categories.iter().map(String::as_str).collect(),
                scope_checked: false,
            },
            ReferenceValue {
                field: "properties",
                target_type: EntityType::Property,
                ids: m.properties.iter().map(String::as_str).collect(),
                scope_checked: false,
            },
            ReferenceValue {
                field: "subobjects",
                target_type: EntityType::Subobject,
                ids: m.subobjects.iter().map(String::as_str).collect(),
                scope_checked: false,
            },
            ReferenceValue {
                field: "templates",
                target_type: EntityType::Template,
                ids: m.templates.iter().map(String::as_str).collect(),
                scope_checked: false,
            },
            ReferenceValue {
                field: "dependencies",
                target_type: EntityType::Module,
                ids: m.dependencies.iter().map(String::as_str).collect(),
                scope_checked: false,
            },
        ],
        Entity::Bundle(b) => vec![ReferenceValue {
            field: "modules",
            target_type: EntityType::Module,
            ids: b.modules.iter().map(String::as_str).collect(),
            scope_checked: false,
        }],
    }
}

/// Runs the reference and constraint validator over every indexed entity.
pub fn validate_references(index: &EntityIndex) -> Report {
    let mut report = Report::new();
    let owners = OwnerMap::build(index);
    let module_graph = module_dependency_graph(index);

    for indexed in index.iter_all() {
        let entity = &indexed.entity;
        let source_type = entity.entity_type();

        for reference in references_of(entity) {
            for &target_id in &reference.ids {
                if target_id == entity.id() && reference.target_type == source_type {
                    report.diagnostics.push(Diagnostic::error(
                        RuleId::SelfReference,
                        Location::File {
                            path: indexed.path.clone(),
                            field: Some(reference.field.to_owned()),
                        },
                        format!("{} references itself via \"{}\"", entity.id(), reference.field),
                    ));
                    continue;
                }

                if !index.contains(reference.target_type, target_id) {
                    report.diagnostics.push(Diagnostic::error(
                        RuleId::MissingReference,
                        Location::File {
                            path: indexed.path.clone(),
                            field: Some(reference.field.to_owned()),
                        },
                        format!(
                            "\"{}\" in field \"{}\" does not exist among {}",
                            target_id,
                            reference.field,
                            reference.target_type
                        ),
                    ));
                    continue;
                }

                if reference.scope_checked {
                    check_scope(
                        &owners,
                        &module_graph,
                        indexed,
                        source_type,
                        reference.field,
                        reference.target_type,
                        target_id,
                        &mut report,
                    );
                }
            }
        }

        check_conflicts(indexed, &mut report);
    }

    report
}

#[allow(clippy::too_many_arguments)]
fn check_scope(
    owners: &OwnerMap,
    module_graph: &crate::graph::DepGraph,
    indexed: &crate::index::IndexedEntity,
    source_type: EntityType,
    field: &'static str,
    target_type: EntityType,
    target_id: &str,
    report: &mut Report,
) {
    let Some(source_module) = owners.owner_of(source_type, indexed.entity.id()) else {
        return;
    };
    let Some(target_module) = owners.owner_of(target_type, target_id) else {
        return;
    };
    let Some(closure) = module_closure(module_graph, source_module) else {
        return;
    };
    if !closure.contains(target_module) {
        report.diagnostics.push(Diagnostic::error(
            RuleId::ScopeViolation,
            Location::File {
                path: indexed.path.clone(),
                field: Some(field.to_owned()),
            },
            format!(
                "\"{}\" (module \"{target_module}\") is out of scope for module \"{source_module}\" via field \"{field}\"",
                target_id
            ),
        ));
    }
}

fn check_conflicts(indexed: &crate::index::IndexedEntity, report: &mut Report) {
    match &indexed.entity {
        Entity::Category(c) => {
            let overlap: Vec<&String> = c.required_properties.intersection(&c.optional_properties).collect();
            if !overlap.is_empty() {
                report.diagnostics.push(Diagnostic::error(
                    RuleId::PropertyConflict,
                    Location::File {
                        path: indexed.path.clone(),
                        field: None,
                    },
                    format!("required and optional properties overlap: {overlap:?}"),
                ));
            }
            let sub_overlap: Vec<&String> = c.required_subobjects.intersection(&c.optional_subobjects).collect();
            if !sub_overlap.is_empty() {
                report.diagnostics.push(Diagnostic::error(
                    RuleId::SubobjectConflict,
                    Location::File {
                        path: indexed.path.clone(),
                        field: None,
                    },
                    format!("required and optional subobjects overlap: {sub_overlap:?}"),
                ));
            }
        }
        Entity::Subobject(s) => {
            let overlap: Vec<&String> = s.required_properties.intersection(&s.optional_properties).collect();
            if !overlap.is_empty() {
                report.diagnostics.push(Diagnostic::error(
                    RuleId::PropertyConflict,
                    Location::File {
                        path: indexed.path.clone(),
                        field: None,
                    },
                    format!("required and optional properties overlap: {overlap:?}"),
                ));
            }
        }
        _ => {}
    }
}
