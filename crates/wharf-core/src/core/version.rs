use crate::core::error::{WharfError, WharfResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version constraint types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Matches every version: "*" or an empty range
    Any,
    /// Exact version: "1.2.3" or "=1.2.3"
    Exact(Version),
    /// Caret range: "^1.2.3" (>=1.2.3 <2.0.0; for 0.x majors the minor is
    /// the breaking component, for 0.0.x the patch is)
    Compatible(Version),
    /// Tilde range: "~1.2.3" (>=1.2.3 <1.3.0)
    Patch(Version),
    /// Greater than: ">1.2.3"
    GreaterThan(Version),
    /// Greater than or equal: ">=1.2.3"
    GreaterOrEqual(Version),
    /// Less than: "<2.0.0"
    LessThan(Version),
    /// Less than or equal: "<=2.0.0"
    LessOrEqual(Version),
    /// Any patch within a minor: "1.2.x"
    AnyPatch(Version),
    /// Any minor within a major: "1.x"
    AnyMinor(Version),
    /// All of the given constraints (AND semantics, space-separated)
    All(Vec<VersionConstraint>),
    /// Any of the given constraints (OR semantics, "||")
    AnyOf(Vec<VersionConstraint>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Pre-release version (e.g., "alpha.1", "beta.2", "rc.1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<String>,
    /// Build metadata (e.g., "build.123")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_metadata: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build_metadata: None,
        }
    }

    /// Create a new version with pre-release metadata
    pub fn with_prerelease(major: u64, minor: u64, patch: u64, prerelease: String) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: Some(prerelease),
            build_metadata: None,
        }
    }

    /// Parse a version string (e.g., "1.2.3", "1.2.3-alpha.1", "1.2.3+build.123")
    pub fn parse(s: &str) -> WharfResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);

        // Split by '+' to separate build metadata
        let (version_prerelease, build_metadata) = if let Some(pos) = s.find('+') {
            let build = s[pos + 1..].to_string();
            (&s[..pos], Some(build))
        } else {
            (s, None)
        };

        // Split by '-' to separate the pre-release part
        let (version_part, prerelease) = if let Some(pos) = version_prerelease.find('-') {
            (
                &version_prerelease[..pos],
                Some(version_prerelease[pos + 1..].to_string()),
            )
        } else {
            (version_prerelease, None)
        };

        let parts: Vec<&str> = version_part.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(WharfError::Version(format!("Invalid version format: {}", s)));
        }

        let major = parts[0]
            .parse()
            .map_err(|_| WharfError::Version(format!("Invalid major version: {}", s)))?;
        let minor = match parts.get(1) {
            Some(p) => p
                .parse()
                .map_err(|_| WharfError::Version(format!("Invalid minor version: {}", s)))?,
            None => 0,
        };
        let patch = match parts.get(2) {
            Some(p) => p
                .parse()
                .map_err(|_| WharfError::Version(format!("Invalid patch version: {}", s)))?,
            None => 0,
        };

        Ok(Self {
            major,
            minor,
            patch,
            prerelease,
            build_metadata,
        })
    }

    /// Check if this version satisfies a constraint
    pub fn satisfies(&self, constraint: &VersionConstraint) -> bool {
        match constraint {
            VersionConstraint::Any => true,
            VersionConstraint::Exact(v) => self == v,
            VersionConstraint::Compatible(v) => {
                if self < v {
                    return false;
                }
                // The leftmost non-zero component is the breaking one
                if v.major > 0 {
                    self.major == v.major
                } else if v.minor > 0 {
                    self.major == 0 && self.minor == v.minor
                } else {
                    self.major == 0 && self.minor == 0 && self.patch == v.patch
                }
            }
            VersionConstraint::Patch(v) => {
                self >= v && (self.major, self.minor) == (v.major, v.minor)
            }
            VersionConstraint::GreaterThan(v) => self > v,
            VersionConstraint::GreaterOrEqual(v) => self >= v,
            VersionConstraint::LessThan(v) => self < v,
            VersionConstraint::LessOrEqual(v) => self <= v,
            VersionConstraint::AnyPatch(v) => self.major == v.major && self.minor == v.minor,
            VersionConstraint::AnyMinor(v) => self.major == v.major,
            VersionConstraint::All(constraints) => constraints.iter().all(|c| self.satisfies(c)),
            VersionConstraint::AnyOf(constraints) => constraints.iter().any(|c| self.satisfies(c)),
        }
    }
}

// Implement PartialEq and Eq manually to ignore build_metadata (per SemVer spec)
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.major == other.major
            && self.minor == other.minor
            && self.patch == other.patch
            && self.prerelease == other.prerelease
        // build_metadata is intentionally ignored
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch)) {
            std::cmp::Ordering::Equal => {
                // Pre-release versions have lower precedence than normal versions
                match (&self.prerelease, &other.prerelease) {
                    (None, None) => std::cmp::Ordering::Equal,
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (Some(a), Some(b)) => compare_prerelease_identifiers(a, b),
                }
            }
            other => other,
        }
    }
}

/// Compare pre-release identifiers according to SemVer spec
fn compare_prerelease_identifiers(a: &str, b: &str) -> std::cmp::Ordering {
    let a_parts: Vec<&str> = a.split('.').collect();
    let b_parts: Vec<&str> = b.split('.').collect();

    for (a_part, b_part) in a_parts.iter().zip(b_parts.iter()) {
        let ordering = match (a_part.parse::<u64>(), b_part.parse::<u64>()) {
            (Ok(a_num), Ok(b_num)) => a_num.cmp(&b_num),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less, // Numeric < alphanumeric
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => a_part.cmp(b_part),
        };

        if ordering != std::cmp::Ordering::Equal {
            return ordering;
        }
    }

    // If all compared parts are equal, the longer pre-release is greater
    a_parts.len().cmp(&b_parts.len())
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }
        if let Some(ref build) = self.build_metadata {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

/// Parse a single version constraint (no `||` or space-separated parts)
pub fn parse_constraint(s: &str) -> WharfResult<VersionConstraint> {
    let s = s.trim();

    if s.is_empty() || s == "*" || s == "x" || s == "latest" {
        return Ok(VersionConstraint::Any);
    }

    if let Some(rest) = s.strip_prefix('^') {
        Ok(VersionConstraint::Compatible(Version::parse(rest)?))
    } else if let Some(rest) = s.strip_prefix('~') {
        Ok(VersionConstraint::Patch(Version::parse(rest)?))
    } else if let Some(rest) = s.strip_prefix(">=") {
        Ok(VersionConstraint::GreaterOrEqual(Version::parse(rest)?))
    } else if let Some(rest) = s.strip_prefix("<=") {
        Ok(VersionConstraint::LessOrEqual(Version::parse(rest)?))
    } else if let Some(rest) = s.strip_prefix('>') {
        Ok(VersionConstraint::GreaterThan(Version::parse(rest)?))
    } else if let Some(rest) = s.strip_prefix('<') {
        Ok(VersionConstraint::LessThan(Version::parse(rest)?))
    } else if let Some(rest) = s.strip_prefix('=') {
        Ok(VersionConstraint::Exact(Version::parse(rest)?))
    } else if let Some(base) = s
        .strip_suffix(".x")
        .or_else(|| s.strip_suffix(".X"))
        .or_else(|| s.strip_suffix(".*"))
    {
        // "1.2.x" pins a minor; "1.x" pins only the major
        let version = Version::parse(base)?;
        if base.contains('.') {
            Ok(VersionConstraint::AnyPatch(version))
        } else {
            Ok(VersionConstraint::AnyMinor(version))
        }
    } else {
        Ok(VersionConstraint::Exact(Version::parse(s)?))
    }
}

/// Parse a full range expression with `||` (OR) and whitespace (AND) operators.
///
/// Examples: `^1.2.0`, `>=1.0.0 <2.0.0`, `<2.0.0 || >=2.5.0 <3.0.0`
pub fn parse_range(s: &str) -> WharfResult<VersionConstraint> {
    let s = s.trim();

    let or_parts: Vec<&str> = s.split("||").map(str::trim).collect();
    if or_parts.len() > 1 {
        let constraints: Result<Vec<_>, _> =
            or_parts.iter().map(|part| parse_range(part)).collect();
        return Ok(VersionConstraint::AnyOf(constraints?));
    }

    // Comma separators are tolerated for compatibility with older manifests
    let and_parts: Vec<&str> = s
        .split([' ', ','])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if and_parts.len() > 1 {
        let constraints: Result<Vec<_>, _> =
            and_parts.iter().map(|part| parse_constraint(part)).collect();
        return Ok(VersionConstraint::All(constraints?));
    }

    parse_constraint(s)
}
