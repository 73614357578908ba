// In: src/descriptor.rs

//! The package descriptor: a typed model of `pyproject.toml`.
//!
//! maturin reads `pyproject.toml` to build the wheel. This module reads the same file
//! so the crate can check it (name, semantic version, build requirements), evaluate
//! the build requirement constraints against candidate versions, and render the
//! core metadata record that ends up in the built artifact.
//!
//! Requirement strings follow the PEP 508 subset maturin needs: a distribution name
//! followed by comma separated specifiers with the operators `== != <= >= < > ~=`
//! over one to three numeric release components. Wildcards, pre-release tags,
//! environment markers, extras, and URLs are rejected as malformed.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::PuanError;

/// The descriptor this crate was built from.
const EMBEDDED_PYPROJECT: &str = include_str!("../pyproject.toml");

//==================================================================================
// 1. On-disk layout
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct PyProject {
    #[serde(rename = "build-system")]
    build_system: BuildSystem,
    project: Project,
    #[serde(default)]
    tool: Tool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct BuildSystem {
    requires: Vec<String>,
    #[serde(rename = "build-backend")]
    build_backend: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Project {
    name: String,
    version: String,
    #[serde(default)]
    description: String,
    #[serde(
        rename = "requires-python",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    requires_python: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    classifiers: Vec<String>,
    // Arrays of tables render after plain values.
    #[serde(default)]
    authors: Vec<Author>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
struct Tool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    maturin: Option<MaturinTool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
struct MaturinTool {
    #[serde(default)]
    features: Vec<String>,
    #[serde(rename = "python-packages", default)]
    python_packages: Vec<String>,
}

/// An entry of `project.authors`. At least one of the fields is normally set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Author {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Author {
    /// `Name <email>`, or whichever half is present.
    pub fn contact(&self) -> Option<String> {
        match (&self.name, &self.email) {
            (Some(name), Some(email)) => Some(format!("{} <{}>", name, email)),
            (None, Some(email)) => Some(email.clone()),
            (Some(name), None) => Some(name.clone()),
            (None, None) => None,
        }
    }
}

//==================================================================================
// 2. Package Descriptor
//==================================================================================

/// Static metadata consumed by the build tool.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: Version,
    pub description: String,
    pub authors: Vec<Author>,
    pub requires_python: Option<String>,
    pub classifiers: Vec<String>,
    /// Python package paths shipped next to the extension module.
    pub packages: Vec<String>,
    /// Cargo features the build tool enables.
    pub features: Vec<String>,
    pub build_backend: String,
    pub build_requires: Vec<Requirement>,
}

impl PackageDescriptor {
    /// Parses and validates a `pyproject.toml` document.
    pub fn from_toml(text: &str) -> Result<Self, PuanError> {
        let raw: PyProject = toml::from_str(text)?;

        let name = raw.project.name;
        if !is_valid_name(&name) {
            return Err(PuanError::MalformedDescriptor {
                field: "project.name".to_string(),
                reason: format!("'{}' is not a valid distribution name", name),
            });
        }
        if raw.build_system.build_backend.trim().is_empty() {
            return Err(PuanError::MalformedDescriptor {
                field: "build-system.build-backend".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        let version = Version::parse(&raw.project.version)?;
        let build_requires = raw
            .build_system
            .requires
            .iter()
            .map(|r| Requirement::parse(r))
            .collect::<Result<Vec<_>, _>>()?;
        let maturin = raw.tool.maturin.unwrap_or_default();
        if let Some(bad) = maturin.python_packages.iter().find(|p| !is_valid_package_path(p)) {
            return Err(PuanError::MalformedDescriptor {
                field: "tool.maturin.python-packages".to_string(),
                reason: format!("'{}' is not a dotted package path", bad),
            });
        }

        Ok(Self {
            name,
            version,
            description: raw.project.description,
            authors: raw.project.authors,
            requires_python: raw.project.requires_python,
            classifiers: raw.project.classifiers,
            packages: maturin.python_packages,
            features: maturin.features,
            build_backend: raw.build_system.build_backend,
            build_requires,
        })
    }

    /// The descriptor compiled into this crate.
    pub fn embedded() -> Result<Self, PuanError> {
        Self::from_toml(EMBEDDED_PYPROJECT)
    }

    pub fn to_toml(&self) -> Result<String, PuanError> {
        let raw = PyProject {
            build_system: BuildSystem {
                requires: self.build_requires.iter().map(|r| r.to_string()).collect(),
                build_backend: self.build_backend.clone(),
            },
            project: Project {
                name: self.name.clone(),
                version: self.version.to_string(),
                description: self.description.clone(),
                requires_python: self.requires_python.clone(),
                classifiers: self.classifiers.clone(),
                authors: self.authors.clone(),
            },
            tool: Tool {
                maturin: Some(MaturinTool {
                    features: self.features.clone(),
                    python_packages: self.packages.clone(),
                }),
            },
        };
        Ok(toml::to_string(&raw)?)
    }

    /// Contact string of every author, in declaration order.
    pub fn author_contact(&self) -> String {
        self.authors
            .iter()
            .filter_map(Author::contact)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The core metadata record of the built artifact. Deterministic for a given
    /// descriptor.
    pub fn metadata_record(&self) -> String {
        let mut lines = vec![
            "Metadata-Version: 2.1".to_string(),
            format!("Name: {}", self.name),
            format!("Version: {}", self.version),
        ];
        if !self.description.is_empty() {
            lines.push(format!("Summary: {}", self.description));
        }
        let contact = self.author_contact();
        if !contact.is_empty() {
            lines.push(format!("Author-email: {}", contact));
        }
        if let Some(requires_python) = &self.requires_python {
            lines.push(format!("Requires-Python: {}", requires_python));
        }
        lines.extend(self.classifiers.iter().map(|c| format!("Classifier: {}", c)));
        lines.extend(
            self.build_requires
                .iter()
                .map(|r| format!("Requires-Build: {}", r)),
        );
        let mut record = lines.join("\n");
        record.push('\n');
        record
    }
}

/// PEP 508 names: ASCII letters, digits, `.`, `_`, `-`, starting and ending
/// alphanumeric.
fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
        }
        _ => false,
    }
}

/// `pkg` or `pkg.sub`, every segment a Python identifier.
fn is_valid_package_path(path: &str) -> bool {
    path.split('.').all(|segment| {
        let mut chars = segment.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

//==================================================================================
// 3. Requirements
//==================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Compatible,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Compatible => "~=",
        }
    }

    /// Longest operators first so `<=` is not read as `<`.
    const ALL: [Operator; 7] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::LessEqual,
        Operator::GreaterEqual,
        Operator::Compatible,
        Operator::Less,
        Operator::Greater,
    ];
}

/// A single `<op><release>` clause, e.g. `>=0.13`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub operator: Operator,
    /// Release components as written, one to three of them.
    pub release: Vec<u64>,
}

impl Specifier {
    fn parse(clause: &str, requirement: &str) -> Result<Self, PuanError> {
        let malformed = |reason: String| {
            PuanError::MalformedRequirement(requirement.to_string(), reason)
        };
        let operator = Operator::ALL
            .into_iter()
            .find(|op| clause.starts_with(op.as_str()))
            .ok_or_else(|| malformed(format!("'{}' has no version operator", clause)))?;
        let text = clause[operator.as_str().len()..].trim();

        let release = text
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(malformed(format!("'{}' is not a plain release version", text)));
                }
                part.parse::<u64>()
                    .map_err(|e| malformed(format!("'{}': {}", text, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if release.len() > 3 {
            return Err(malformed(format!(
                "'{}' has more than three release components",
                text
            )));
        }
        if operator == Operator::Compatible && release.len() < 2 {
            return Err(malformed(format!(
                "'~={}' needs at least two release components",
                text
            )));
        }
        Ok(Self { operator, release })
    }

    fn padded(&self) -> (u64, u64, u64) {
        let at = |i: usize| self.release.get(i).copied().unwrap_or(0);
        (at(0), at(1), at(2))
    }

    /// Exclusive upper end of a `~=` clause: the next value of the second to last
    /// written component.
    fn compatible_ceiling(&self) -> (u64, u64, u64) {
        let (major, minor, _) = self.padded();
        if self.release.len() == 2 {
            (major.saturating_add(1), 0, 0)
        } else {
            (major, minor.saturating_add(1), 0)
        }
    }

    pub fn matches(&self, version: &Version) -> bool {
        let candidate = (version.major, version.minor, version.patch);
        let ordering = candidate.cmp(&self.padded());
        match self.operator {
            Operator::Equal => ordering == Ordering::Equal,
            Operator::NotEqual => ordering != Ordering::Equal,
            Operator::LessEqual => ordering != Ordering::Greater,
            Operator::GreaterEqual => ordering != Ordering::Less,
            Operator::Less => ordering == Ordering::Less,
            Operator::Greater => ordering == Ordering::Greater,
            Operator::Compatible => {
                ordering != Ordering::Less && candidate < self.compatible_ceiling()
            }
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release: Vec<String> = self.release.iter().map(|c| c.to_string()).collect();
        write!(f, "{}{}", self.operator.as_str(), release.join("."))
    }
}

/// A build requirement such as `maturin>=0.13,<0.14`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    /// All clauses must hold. Empty means any version.
    pub specifiers: Vec<Specifier>,
}

impl Requirement {
    pub fn parse(text: &str) -> Result<Self, PuanError> {
        let malformed =
            |reason: &str| PuanError::MalformedRequirement(text.to_string(), reason.to_string());
        let trimmed = text.trim();

        let name_end = trimmed
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
            .unwrap_or(trimmed.len());
        let (name, rest) = trimmed.split_at(name_end);
        if !is_valid_name(name) {
            return Err(malformed("missing or invalid distribution name"));
        }

        let rest = rest.trim();
        if rest.starts_with('[') {
            return Err(malformed("extras are not supported"));
        }
        if rest.contains(';') {
            return Err(malformed("environment markers are not supported"));
        }
        if rest.starts_with('@') {
            return Err(malformed("URL requirements are not supported"));
        }

        let specifiers = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',')
                .map(|clause| Specifier::parse(clause.trim(), text))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            name: name.to_string(),
            specifiers,
        })
    }

    /// Pre-release candidates never match.
    pub fn matches(&self, version: &Version) -> bool {
        version.pre.is_empty() && self.specifiers.iter().all(|s| s.matches(version))
    }

    /// The highest candidate that satisfies every specifier.
    pub fn select<'a>(&self, candidates: &'a [Version]) -> Result<&'a Version, PuanError> {
        candidates
            .iter()
            .filter(|v| self.matches(v))
            .max_by_key(|v| (v.major, v.minor, v.patch))
            .ok_or_else(|| PuanError::Unsatisfiable {
                name: self.name.clone(),
                constraint: self.to_string(),
            })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let specifiers: Vec<String> = self.specifiers.iter().map(|s| s.to_string()).collect();
        write!(f, "{}{}", self.name, specifiers.join(","))
    }
}
