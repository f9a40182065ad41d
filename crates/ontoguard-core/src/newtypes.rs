/// Validated newtype wrappers for core ontology domain string types.
///
/// Each newtype enforces a regex-based shape constraint at construction time via
/// [`TryFrom<&str>`]. Once constructed, the inner value is immutable (no
/// `DerefMut`). Serde `Deserialize` impls re-run validation so invalid data
/// cannot enter the type system from untrusted JSON.
use std::fmt;
use std::ops::Deref;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced when constructing a validated newtype from an invalid string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewtypeError {
    /// The string did not match the expected format.
    InvalidFormat {
        /// Name of the type that rejected the input.
        type_name: &'static str,
        /// A human-readable description of the expected format.
        expected: &'static str,
        /// The input that was rejected.
        got: String,
    },
}

impl fmt::Display for NewtypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat {
                type_name,
                expected,
                got,
            } => write!(f, "invalid {type_name}: expected {expected}, got {got:?}"),
        }
    }
}

impl std::error::Error for NewtypeError {}

// ---------------------------------------------------------------------------
// Regex statics
//
// All patterns are compile-time string literals; Regex::new never returns Err
// for them. The fallback chain is required because the workspace bans
// expect()/unwrap(), but "a^" (a pattern that never matches) is always valid,
// so it serves as a safe fallback that satisfies the type checker.
// ---------------------------------------------------------------------------

/// Matches `MAJOR.MINOR.PATCH`.
static SEMVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+$")
        .unwrap_or_else(|_| Regex::new("a^").unwrap_or_else(|_| unreachable!("regex engine broken")))
});

/// Matches a non-empty identifier: letters, digits, `_`, `-`, and `/` (for
/// nested template paths).
static ENTITY_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_\-./]+$")
        .unwrap_or_else(|_| Regex::new("a^").unwrap_or_else(|_| unreachable!("regex engine broken")))
});

// ---------------------------------------------------------------------------
// BumpClass
// ---------------------------------------------------------------------------

/// The size of a semantic-version bump required by a change.
///
/// Ordered `Major > Minor > Patch`; [`BumpClass::max`] and [`max_bump`]
/// implement the monoid used throughout the cascade engine to aggregate
/// changes upward through the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpClass {
    /// A breaking change.
    Patch,
    /// A backwards-compatible addition.
    Minor,
    /// A removal or incompatible alteration.
    Major,
}

impl BumpClass {
    /// Returns the greater of `self` and `other`.
    pub fn max(self, other: Self) -> Self {
        std::cmp::max(self, other)
    }
}

impl fmt::Display for BumpClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => f.write_str("major"),
            Self::Minor => f.write_str("minor"),
            Self::Patch => f.write_str("patch"),
        }
    }
}

impl std::str::FromStr for BumpClass {
    type Err = NewtypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            _ => Err(NewtypeError::InvalidFormat {
                type_name: "BumpClass",
                expected: "one of \"major\", \"minor\", \"patch\"",
                got: s.to_owned(),
            }),
        }
    }
}

/// Folds an iterator of [`BumpClass`] values into the single largest one.
///
/// Returns `None` for an empty iterator. Commutative, associative, and
/// idempotent, with `Patch` as the identity element.
pub fn max_bump(classes: impl IntoIterator<Item = BumpClass>) -> Option<BumpClass> {
    classes.into_iter().reduce(BumpClass::max)
}

// ---------------------------------------------------------------------------
// SemVer
// ---------------------------------------------------------------------------

/// Semantic version string in `MAJOR.MINOR.PATCH` format.
///
/// Validates that the string matches `^\d+\.\d+\.\d+$`. The inner value is not
/// parsed into integers at construction time; use [`SemVer::major`],
/// [`SemVer::minor`], and [`SemVer::patch`] for on-demand integer access.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemVer(String);

impl TryFrom<&str> for SemVer {
    type Error = NewtypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        if SEMVER_RE.is_match(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(NewtypeError::InvalidFormat {
                type_name: "SemVer",
                expected: "MAJOR.MINOR.PATCH (e.g. 1.0.0)",
                got: s.to_owned(),
            })
        }
    }
}

impl SemVer {
    /// The zero version, `0.0.0`.
    pub fn zero() -> Self {
        Self("0.0.0".to_owned())
    }

    /// Returns the major version component parsed from the stored string.
    ///
    /// Returns `0` if the component cannot be parsed as `u64`, which cannot
    /// happen for a correctly validated `SemVer`.
    pub fn major(&self) -> u64 {
        self.component(0)
    }

    /// Returns the minor version component parsed from the stored string.
    pub fn minor(&self) -> u64 {
        self.component(1)
    }

    /// Returns the patch version component parsed from the stored string.
    pub fn patch(&self) -> u64 {
        self.component(2)
    }

    /// Parses the `n`th dot-separated component as a `u64`.
    fn component(&self, n: usize) -> u64 {
        self.0
            .split('.')
            .nth(n)
            .and_then(|part| part.parse::<u64>().ok())
            .unwrap_or(0)
    }

    /// Returns the version obtained by applying `bump` to `self`.
    ///
    /// A `Major` bump increments the major component and resets minor and
    /// patch to zero. A `Minor` bump increments minor and resets patch. A
    /// `Patch` bump increments patch only.
    pub fn apply_bump(&self, bump: BumpClass) -> Self {
        let (major, minor, patch) = match bump {
            BumpClass::Major => (self.major() + 1, 0, 0),
            BumpClass::Minor => (self.major(), self.minor() + 1, 0),
            BumpClass::Patch => (self.major(), self.minor(), self.patch() + 1),
        };
        Self(format!("{major}.{minor}.{patch}"))
    }
}

impl Deref for SemVer {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SemVer {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SemVer {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Self::try_from(s.as_str()).map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Non-empty identifier for an ontology entity, unique within its type.
///
/// Accepts letters, digits, `_`, `-`, `.` and `/` so that template ids may
/// carry nested paths (e.g. `"infobox/person"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(String);

impl TryFrom<&str> for EntityId {
    type Error = NewtypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        if ENTITY_ID_RE.is_match(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(NewtypeError::InvalidFormat {
                type_name: "EntityId",
                expected: "non-empty string of letters, digits, '_', '-', '.', '/'",
                got: s.to_owned(),
            })
        }
    }
}

impl Deref for EntityId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Self::try_from(s.as_str()).map_err(de::Error::custom)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn semver_valid_basic() {
        let v = SemVer::try_from("1.0.0").expect("valid semver");
        assert_eq!(&*v, "1.0.0");
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 0);
        assert_eq!(v.patch(), 0);
    }

    #[test]
    fn semver_reject_missing_patch() {
        assert!(SemVer::try_from("1.0").is_err());
    }

    #[test]
    fn semver_reject_prerelease_suffix() {
        assert!(SemVer::try_from("1.0.0-beta").is_err());
    }

    #[test]
    fn semver_serde_roundtrip() {
        let v = SemVer::try_from("1.2.3").expect("valid");
        let json = serde_json::to_string(&v).expect("serialize");
        assert_eq!(json, "\"1.2.3\"");
        let back: SemVer = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(v, back);
    }

    #[test]
    fn apply_bump_major_resets_minor_and_patch() {
        let v = SemVer::try_from("1.4.9").expect("valid");
        assert_eq!(&*v.apply_bump(BumpClass::Major), "2.0.0");
    }

    #[test]
    fn apply_bump_minor_resets_patch_only() {
        let v = SemVer::try_from("1.4.9").expect("valid");
        assert_eq!(&*v.apply_bump(BumpClass::Minor), "1.5.0");
    }

    #[test]
    fn apply_bump_patch_increments_patch_only() {
        let v = SemVer::try_from("1.4.9").expect("valid");
        assert_eq!(&*v.apply_bump(BumpClass::Patch), "1.4.10");
    }

    #[test]
    fn apply_bump_then_patch_never_decreases() {
        for (base, bump) in [
            ("1.0.0", BumpClass::Major),
            ("1.0.0", BumpClass::Minor),
            ("1.0.0", BumpClass::Patch),
        ] {
            let v = SemVer::try_from(base).expect("valid");
            let direct = v.apply_bump(bump);
            let via_patch = v.apply_bump(BumpClass::Patch).apply_bump(bump);
            assert!(
                (via_patch.major(), via_patch.minor(), via_patch.patch())
                    >= (direct.major(), direct.minor(), direct.patch())
            );
        }
    }

    #[test]
    fn bump_class_ordering() {
        assert!(BumpClass::Major > BumpClass::Minor);
        assert!(BumpClass::Minor > BumpClass::Patch);
    }

    #[test]
    fn max_bump_is_commutative_and_idempotent() {
        assert_eq!(
            max_bump([BumpClass::Minor, BumpClass::Major]),
            max_bump([BumpClass::Major, BumpClass::Minor])
        );
        assert_eq!(
            max_bump([BumpClass::Minor, BumpClass::Minor]),
            Some(BumpClass::Minor)
        );
    }

    #[test]
    fn max_bump_empty_is_none() {
        assert_eq!(max_bump(Vec::<BumpClass>::new()), None);
    }

    #[test]
    fn bump_class_from_str_roundtrip() {
        for (s, c) in [
            ("major", BumpClass::Major),
            ("minor", BumpClass::Minor),
            ("patch", BumpClass::Patch),
        ] {
            assert_eq!(s.parse::<BumpClass>().expect("valid"), c);
            assert_eq!(c.to_string(), s);
        }
    }

    #[test]
    fn bump_class_from_str_rejects_unknown() {
        assert!("breaking".parse::<BumpClass>().is_err());
    }

    #[test]
    fn entity_id_valid_nested_template_path() {
        let id = EntityId::try_from("infobox/person").expect("valid");
        assert_eq!(&*id, "infobox/person");
    }

    #[test]
    fn entity_id_reject_empty() {
        assert!(EntityId::try_from("").is_err());
    }

    #[test]
    fn entity_id_reject_whitespace() {
        assert!(EntityId::try_from("has space").is_err());
    }
}
