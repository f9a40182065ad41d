/// Aggregates classified changes into per-module and per-bundle version
/// bumps, cascades bumps across the module dependency graph, computes the
/// ontology-wide bump, and applies manual overrides.
use std::collections::{BTreeMap, VecDeque};

use crate::change::EntityChange;
use crate::graph::{DepGraph, detect_cycles};
use crate::index::EntityIndex;
use crate::model::{Entity, EntityType};
use crate::newtypes::{BumpClass, SemVer, max_bump};
use crate::ownership::{OwnerMap, module_dependency_graph};
use crate::report::{Diagnostic, Location, RuleId};

/// A module or bundle's version movement, if it was bumped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    /// The version currently on record.
    pub current: SemVer,
    /// The version after applying `bump`, or `None` if `current` could not
    /// be parsed.
    pub new: Option<SemVer>,
    /// The bump size applied.
    pub bump: BumpClass,
}

/// The full output of one cascade pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CascadeResult {
    /// Bump required for each module, after cascade and overrides.
    pub module_bumps: BTreeMap<String, BumpClass>,
    /// Bump required for each bundle, after aggregation and overrides.
    pub bundle_bumps: BTreeMap<String, BumpClass>,
    /// The repository-wide bump, or `None` if nothing bumped.
    pub ontology_bump: Option<BumpClass>,
    /// Changes to entities claimed by no module.
    pub orphan_changes: Vec<EntityChange>,
    /// Warnings raised when an override reduced a computed bump.
    pub override_warnings: Vec<Diagnostic>,
    /// New version strings for each bumped module.
    pub module_versions: BTreeMap<String, VersionEntry>,
    /// New version strings for each bumped bundle.
    pub bundle_versions: BTreeMap<String, VersionEntry>,
}

/// Runs the full cascade over `changes`, given the current entity index and
/// a set of manual overrides (entity id, or the literal `"ontology"`,
/// mapped to a bump class).
pub fn run_cascade(index: &EntityIndex, changes: &[EntityChange], overrides: &BTreeMap<String, BumpClass>) -> CascadeResult {
    let owners = OwnerMap::build(index);

    let mut module_bumps: BTreeMap<String, BumpClass> = BTreeMap::new();
    let mut orphan_changes = Vec::new();

    for change in changes {
        match owners.owner_of(change.entity_type, &change.id) {
            Some(owner) => {
                module_bumps
                    .entry(owner.to_owned())
                    .and_modify(|b| *b = b.max(change.bump))
                    .or_insert(change.bump);
            }
            None => orphan_changes.push(change.clone()),
        }
    }

    let module_graph = module_dependency_graph(index);
    if detect_cycles(&module_graph).is_empty() {
        cascade_dependencies(&module_graph, &mut module_bumps);
    }

    let bundle_bumps = aggregate_bundles(index, &module_bumps);

    let ontology_bump_before_override = max_bump(module_bumps.values().copied().chain(bundle_bumps.values().copied()));

    let mut module_bumps = module_bumps;
    let mut bundle_bumps = bundle_bumps;
    let mut override_warnings = Vec::new();

    for (id, &override_class) in overrides {
        if id == "ontology" {
            continue;
        }
        apply_override(index, id, override_class, &mut module_bumps, &mut bundle_bumps, &mut override_warnings);
    }

    let ontology_bump = match overrides.get("ontology") {
        Some(&override_class) => match ontology_bump_before_override {
            Some(current) => {
                if override_class < current {
                    override_warnings.push(Diagnostic::warning(
                        RuleId::OverrideDowngrade,
                        Location::Global,
                        format!("ontology override downgrades {current} -> {override_class}"),
                    ));
                }
                Some(override_class)
            }
            None => None,
        },
        None => ontology_bump_before_override,
    };

    let module_versions = version_entries(index, EntityType::Module, &module_bumps);
    let bundle_versions = version_entries(index, EntityType::Bundle, &bundle_bumps);

    CascadeResult {
        module_bumps,
        bundle_bumps,
        ontology_bump,
        orphan_changes,
        override_warnings,
        module_versions,
        bundle_versions,
    }
}

/// Processes modules leaf-first (no dependencies) toward roots, so that a
/// module's bump reflects the largest bump among its transitive dependencies.
fn cascade_dependencies(graph: &DepGraph, module_bumps: &mut BTreeMap<String, BumpClass>) {
    let Some(order) = topo_order_leaves_first(graph) else {
        return;
    };

    for module_id in order {
        let deps_bump = max_bump(graph.successors(&module_id).into_iter().filter_map(|dep| module_bumps.get(dep).copied()));
        if let Some(d) = deps_bump {
            module_bumps
                .entry(module_id)
                .and_modify(|b| *b = b.max(d))
                .or_insert(d);
        }
    }
}

fn topo_order_leaves_first(graph: &DepGraph) -> Option<Vec<String>> {
    let ids: Vec<String> = graph.node_ids().map(str::to_owned).collect();
    let mut out_degree: BTreeMap<String, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for id in &ids {
        let successors = graph.successors(id);
        out_degree.insert(id.clone(), successors.len());
        for dep in successors {
            dependents.entry(dep.to_owned()).or_default().push(id.clone());
        }
    }

    let mut queue: VecDeque<String> = ids.iter().filter(|id| out_degree.get(*id) == Some(&0)).cloned().collect();
    let mut order = Vec::new();

    while let Some(id) = queue.pop_front() {
        order.push(id.clone());
        if let Some(deps) = dependents.get(&id) {
            for dependent in deps {
                if let Some(deg) = out_degree.get_mut(dependent) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        queue.push_back(dependent.clone());
                    }
                }
            }
        }
    }

    (order.len() == ids.len()).then_some(order)
}

fn aggregate_bundles(index: &EntityIndex, module_bumps: &BTreeMap<String, BumpClass>) -> BTreeMap<String, BumpClass> {
    let mut bundle_bumps = BTreeMap::new();
    for indexed in index.entities_of(EntityType::Bundle) {
        let Entity::Bundle(bundle) = &indexed.entity else {
            continue;
        };
        if let Some(bump) = max_bump(bundle.modules.iter().filter_map(|m| module_bumps.get(m).copied())) {
            bundle_bumps.insert(bundle.id.clone(), bump);
        }
    }
    bundle_bumps
}

fn apply_override(
    index: &EntityIndex,
    id: &str,
    override_class: BumpClass,
    module_bumps: &mut BTreeMap<String, BumpClass>,
    bundle_bumps: &mut BTreeMap<String, BumpClass>,
    warnings: &mut Vec<Diagnostic>,
) {
    if let Some(current) = module_bumps.get(id).copied() {
        warn_if_downgrade(id, current, override_class, warnings);
        module_bumps.insert(id.to_owned(), override_class);
    } else if let Some(current) = bundle_bumps.get(id).copied() {
        warn_if_downgrade(id, current, override_class, warnings);
        bundle_bumps.insert(id.to_owned(), override_class);
    } else if index.contains(EntityType::Module, id) {
        module_bumps.insert(id.to_owned(), override_class);
    } else if index.contains(EntityType::Bundle, id) {
        bundle_bumps.insert(id.to_owned(), override_class);
    }
}

fn warn_if_downgrade(id: &str, current: BumpClass, override_class: BumpClass, warnings: &mut Vec<Diagnostic>) {
    if override_class < current {
        warnings.push(Diagnostic::warning(
            RuleId::OverrideDowngrade,
            Location::Global,
            format!("override for \"{id}\" downgrades {current} -> {override_class}"),
        ));
    }
}

fn version_entries(index: &EntityIndex, t: EntityType, bumps: &BTreeMap<String, BumpClass>) -> BTreeMap<String, VersionEntry> {
    bumps
        .iter()
        .filter_map(|(id, &bump)| {
            let current = current_version(index, t, id)?;
            let new = SemVer::try_from(current.as_str()).ok().map(|v| v.apply_bump(bump));
            Some((
                id.clone(),
                VersionEntry {
                    current,
                    new,
                    bump,
                },
            ))
        })
        .collect()
}

fn current_version(index: &EntityIndex, t: EntityType, id: &str) -> Option<SemVer> {
    match (t, index.get(t, id)?) {
        (EntityType::Module, Entity::Module(m)) => Some(m.version.clone()),
        (EntityType::Bundle, Entity::Bundle(b)) => Some(b.version.clone()),
        _ => None,
    }
}
