/// Diagnostic types shared by every validator in the engine.
///
/// Defines [`Diagnostic`], [`Severity`], [`RuleId`], [`Location`], and
/// [`Report`] — the types every component in §4 of the specification emits
/// into. Validators never fail outright for reasons that are a property of
/// the data; they push a [`Diagnostic`] and keep going.
use std::fmt;

/// The severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The repository is non-conformant; the run must exit non-zero.
    Error,
    /// The repository is conformant but the finding is worth surfacing.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// Machine-readable identifier for a diagnostic's rule.
///
/// Each variant corresponds to one error or warning code named in the error
/// taxonomy. [`RuleId::code`] returns the canonical kebab-case string used in
/// serialized output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RuleId {
    /// The file is not valid JSON.
    Parse,
    /// No schema was found for the entity's type directory.
    NoSchema,
    /// The file does not conform to its type's JSON schema.
    Schema,
    /// `entity.id` differs from the path-derived id.
    IdMismatch,
    /// A referenced id does not exist in the target type's index.
    MissingReference,
    /// An entity references itself through a same-type field.
    SelfReference,
    /// A reference crosses module scope without a declared dependency.
    ScopeViolation,
    /// `required_properties` and `optional_properties` overlap.
    PropertyConflict,
    /// `required_subobjects` and `optional_subobjects` overlap.
    SubobjectConflict,
    /// A cycle was found in the category `parents` relation.
    CircularCategoryInheritance,
    /// A cycle was found in the property `parent_property` relation.
    CircularPropertyParent,
    /// A cycle was found in the module `dependencies` relation.
    CircularModuleDependency,
    /// The repository-root `VERSION` file is absent.
    MissingVersion,
    /// The repository-root `VERSION` file does not contain a valid semver.
    InvalidVersion,
    /// A content-bearing entity is claimed by no module.
    OrphanedEntity,
    /// The bump applied to an entity is smaller than the computed requirement.
    VersionBumpInsufficient,
    /// A manual override reduced a bump below what the cascade computed.
    OverrideDowngrade,
}

impl RuleId {
    /// Returns the canonical kebab-case rule code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::NoSchema => "no-schema",
            Self::Schema => "schema",
            Self::IdMismatch => "id-mismatch",
            Self::MissingReference => "missing-reference",
            Self::SelfReference => "self-reference",
            Self::ScopeViolation => "scope-violation",
            Self::PropertyConflict => "property-conflict",
            Self::SubobjectConflict => "subobject-conflict",
            Self::CircularCategoryInheritance => "circular-category-inheritance",
            Self::CircularPropertyParent => "circular-property-parent_property",
            Self::CircularModuleDependency => "circular-module-dependency",
            Self::MissingVersion => "missing-version",
            Self::InvalidVersion => "invalid-version",
            Self::OrphanedEntity => "orphaned-entity",
            Self::VersionBumpInsufficient => "version-bump-insufficient",
            Self::OverrideDowngrade => "override-downgrade",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The location within the repository where a diagnostic was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A specific file, with an optional field within it.
    File {
        /// Repository-root-relative path.
        path: String,
        /// The field within the file, if applicable.
        field: Option<String>,
    },
    /// The repository-root `VERSION` file.
    VersionFile,
    /// A finding not attributable to a specific file.
    Global,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { path, field: None } => write!(f, "{path}"),
            Self::File {
                path,
                field: Some(field),
            } => write!(f, "{path}:{field}"),
            Self::VersionFile => f.write_str("VERSION"),
            Self::Global => f.write_str("(global)"),
        }
    }
}

/// A single diagnostic finding produced by a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The rule that produced this finding.
    pub rule_id: RuleId,
    /// The severity of this finding.
    pub severity: Severity,
    /// Where in the repository the problem was detected.
    pub location: Location,
    /// A human-readable explanation of the problem.
    pub message: String,
}

impl Diagnostic {
    /// Constructs a new [`Diagnostic`].
    pub fn new(rule_id: RuleId, severity: Severity, location: Location, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            severity,
            location,
            message: message.into(),
        }
    }

    /// Convenience constructor for an error-severity diagnostic.
    pub fn error(rule_id: RuleId, location: Location, message: impl Into<String>) -> Self {
        Self::new(rule_id, Severity::Error, location, message)
    }

    /// Convenience constructor for a warning-severity diagnostic.
    pub fn warning(rule_id: RuleId, location: Location, message: impl Into<String>) -> Self {
        Self::new(rule_id, Severity::Warning, location, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}: {}", self.severity, self.rule_id, self.location, self.message)
    }
}

/// The accumulated diagnostics produced by a full validation pass.
///
/// The engine never fails fast: every applicable validator runs, and all
/// diagnostics are collected before a [`Report`] is returned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Report {
    /// All diagnostics produced during the pass, in component order.
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Creates an empty [`Report`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every diagnostic from `other` onto `self`, preserving order.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(other);
    }

    /// Returns `true` if any diagnostic has [`Severity::Error`].
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Returns `true` if there are zero error-severity diagnostics.
    pub fn is_conformant(&self) -> bool {
        !self.has_errors()
    }

    /// Returns an iterator over all error-severity diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    /// Returns an iterator over all warning-severity diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }
}
