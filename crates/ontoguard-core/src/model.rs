/// The ontology entity types and the typed records that represent them.
///
/// Every entity shares an `id` and `label`, plus an `extra` catch-all that
/// preserves unknown JSON fields for round-trip fidelity when the entity is
/// later re-emitted into a generated artifact.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unknown-field catch-all, preserved verbatim across parse/emit.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// The six kinds of entity the repository stores, one per top-level directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A class in the category hierarchy.
    Category,
    /// A typed, possibly-enumerated attribute.
    Property,
    /// A reusable bundle of properties nested under a category.
    Subobject,
    /// A display template with no referential fields.
    Template,
    /// A named collection of categories/properties/subobjects/templates.
    Module,
    /// A named collection of modules with its own release cadence.
    Bundle,
}

impl EntityType {
    /// All six entity types, in the fixed order used for deterministic
    /// directory discovery and diagnostic ordering.
    pub const ALL: [EntityType; 6] = [
        EntityType::Category,
        EntityType::Property,
        EntityType::Subobject,
        EntityType::Template,
        EntityType::Module,
        EntityType::Bundle,
    ];

    /// Returns the directory name this entity type is stored under.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Property => "properties",
            Self::Subobject => "subobjects",
            Self::Template => "templates",
            Self::Module => "modules",
            Self::Bundle => "bundles",
        }
    }

    /// Parses a directory name back into an [`EntityType`].
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.dir_name() == name)
    }

    /// Whether entities of this type can be claimed by a module's contents.
    ///
    /// Modules and bundles are never themselves claimed; only categories,
    /// properties, subobjects, and templates can be orphaned.
    pub fn is_content_bearing(self) -> bool {
        !matches!(self, Self::Module | Self::Bundle)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A category: a class in the inheritance hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier within the category type.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Parent category ids, ordered. May be empty.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Property ids that an instance of this category must declare.
    #[serde(default)]
    pub required_properties: BTreeSet<String>,
    /// Property ids an instance of this category may declare.
    #[serde(default)]
    pub optional_properties: BTreeSet<String>,
    /// Subobject ids that an instance of this category must declare.
    #[serde(default)]
    pub required_subobjects: BTreeSet<String>,
    /// Subobject ids an instance of this category may declare.
    #[serde(default)]
    pub optional_subobjects: BTreeSet<String>,
    /// Unknown fields preserved for round-trip fidelity.
    #[serde(flatten)]
    pub extra: Extra,
}

/// Declared cardinality of a property's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Exactly one value.
    Single,
    /// Zero or more values.
    Multiple,
}

/// A property: a typed, possibly-enumerated attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Unique identifier within the property type.
    pub id: String,
    /// Display label.
    pub label: String,
    /// The datatype of values stored under this property.
    pub datatype: String,
    /// Whether this property holds one value or many.
    #[serde(default = "default_cardinality")]
    pub cardinality: Cardinality,
    /// Closed set of permitted values, if this property is enumerated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<BTreeSet<String>>,
    /// Property id this property inherits display/validation behavior from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_property: Option<String>,
    /// Template id used to render this property's value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_display_template: Option<String>,
    /// Unknown fields preserved for round-trip fidelity.
    #[serde(flatten)]
    pub extra: Extra,
}

fn default_cardinality() -> Cardinality {
    Cardinality::Single
}

/// A subobject: a reusable bundle of properties nested under a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subobject {
    /// Unique identifier within the subobject type.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Property ids this subobject must declare.
    #[serde(default)]
    pub required_properties: BTreeSet<String>,
    /// Property ids this subobject may declare.
    #[serde(default)]
    pub optional_properties: BTreeSet<String>,
    /// Unknown fields preserved for round-trip fidelity.
    #[serde(flatten)]
    pub extra: Extra,
}

/// A display template. Carries no referential fields the engine interprets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Unique identifier within the template type (may contain `/`).
    pub id: String,
    /// Display label.
    pub label: String,
    /// Unknown fields preserved for round-trip fidelity.
    #[serde(flatten)]
    pub extra: Extra,
}

/// A module: a named collection of categories/properties/subobjects/templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Unique identifier within the module type.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Current released version.
    pub version: crate::newtypes::SemVer,
    /// Category ids claimed by this module.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Property ids claimed by this module.
    #[serde(default)]
    pub properties: Vec<String>,
    /// Subobject ids claimed by this module.
    #[serde(default)]
    pub subobjects: Vec<String>,
    /// Template ids claimed by this module.
    #[serde(default)]
    pub templates: Vec<String>,
    /// Other module ids this module depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Unknown fields preserved for round-trip fidelity.
    #[serde(flatten)]
    pub extra: Extra,
}

impl Module {
    /// Iterates over every content-bearing id this module claims, paired with
    /// the entity type it belongs to.
    pub fn contents(&self) -> impl Iterator<Item = (EntityType, &str)> {
        self.categories
            .iter()
            .map(|id| (EntityType::Category, id.as_str()))
            .chain(
                self.properties
                    .iter()
                    .map(|id| (EntityType::Property, id.as_str())),
            )
            .chain(
                self.subobjects
                    .iter()
                    .map(|id| (EntityType::Subobject, id.as_str())),
            )
            .chain(
                self.templates
                    .iter()
                    .map(|id| (EntityType::Template, id.as_str())),
            )
    }
}

/// A bundle: a named collection of modules with its own release cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Unique identifier within the bundle type.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Current released version.
    pub version: crate::newtypes::SemVer,
    /// Module ids this bundle ships.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unknown fields preserved for round-trip fidelity.
    #[serde(flatten)]
    pub extra: Extra,
}

/// A parsed entity of any of the six types, tagged by [`EntityType`].
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// A category.
    Category(Category),
    /// A property.
    Property(Property),
    /// A subobject.
    Subobject(Subobject),
    /// A template.
    Template(Template),
    /// A module.
    Module(Module),
    /// A bundle.
    Bundle(Bundle),
}

impl Entity {
    /// Returns the [`EntityType`] tag for this entity.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Category(_) => EntityType::Category,
            Self::Property(_) => EntityType::Property,
            Self::Subobject(_) => EntityType::Subobject,
            Self::Template(_) => EntityType::Template,
            Self::Module(_) => EntityType::Module,
            Self::Bundle(_) => EntityType::Bundle,
        }
    }

    /// Returns the entity's `id` field.
    pub fn id(&self) -> &str {
        match self {
            Self::Category(e) => &e.id,
            Self::Property(e) => &e.id,
            Self::Subobject(e) => &e.id,
            Self::Template(e) => &e.id,
            Self::Module(e) => &e.id,
            Self::Bundle(e) => &e.id,
        }
    }

    /// Parses `value` as the entity type named by `entity_type`.
    pub fn parse(entity_type: EntityType, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match entity_type {
            EntityType::Category => Self::Category(serde_json::from_value(value)?),
            EntityType::Property => Self::Property(serde_json::from_value(value)?),
            EntityType::Subobject => Self::Subobject(serde_json::from_value(value)?),
            EntityType::Template => Self::Template(serde_json::from_value(value)?),
            EntityType::Module => Self::Module(serde_json::from_value(value)?),
            EntityType::Bundle => Self::Bundle(serde_json::from_value(value)?),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn entity_type_dir_name_roundtrip() {
        for t in EntityType::ALL {
            assert_eq!(EntityType::from_dir_name(t.dir_name()), Some(t));
        }
    }

    #[test]
    fn entity_type_from_unknown_dir_is_none() {
        assert_eq!(EntityType::from_dir_name("widgets"), None);
    }

    #[test]
    fn content_bearing_excludes_modules_and_bundles() {
        assert!(EntityType::Category.is_content_bearing());
        assert!(!EntityType::Module.is_content_bearing());
        assert!(!EntityType::Bundle.is_content_bearing());
    }

    #[test]
    fn category_parses_with_defaults() {
        let json = serde_json::json!({"id": "Person", "label": "Person"});
        let cat: Category = serde_json::from_value(json).expect("parses");
        assert!(cat.parents.is_empty());
        assert!(cat.required_properties.is_empty());
    }

    #[test]
    fn category_preserves_unknown_fields() {
        let json = serde_json::json!({
            "id": "Person",
            "label": "Person",
            "icon": "person.svg",
        });
        let cat: Category = serde_json::from_value(json.clone()).expect("parses");
        let back = serde_json::to_value(&cat).expect("serializes");
        assert_eq!(back.get("icon"), json.get("icon"));
    }

    #[test]
    fn module_contents_iterates_all_four_lists() {
        let m = Module {
            id: "Core".to_owned(),
            label: "Core".to_owned(),
            version: crate::newtypes::SemVer::try_from("1.0.0").expect("valid"),
            categories: vec!["Person".to_owned()],
            properties: vec!["Name".to_owned()],
            subobjects: vec![],
            templates: vec!["infobox".to_owned()],
            dependencies: vec![],
            extra: Extra::new(),
        };
        let contents: Vec<_> = m.contents().collect();
        assert_eq!(contents.len(), 3);
        assert!(contents.contains(&(EntityType::Category, "Person")));
        assert!(contents.contains(&(EntityType::Template, "infobox")));
    }

    #[test]
    fn entity_parse_dispatches_by_type() {
        let json = serde_json::json!({"id": "Name", "label": "Name", "datatype": "Text"});
        let e = Entity::parse(EntityType::Property, json).expect("parses");
        assert_eq!(e.entity_type(), EntityType::Property);
        assert_eq!(e.id(), "Name");
    }
}
