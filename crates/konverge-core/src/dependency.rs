use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DeclarationError;

/// A dependency specification in `[module.dependencies]`.
///
/// Supports both shorthand (`"group:artifact" = "1.0"`) and a detailed form
/// keyed by an alias (`core = { group = "...", artifact = "...", version = "..." }`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    Short(String),
    Detailed(DetailedDependency),
}

/// A dependency with explicit group, artifact and version constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedDependency {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub artifact: Option<String>,
    pub version: String,
}

impl DependencySpec {
    /// Resolve the declaration under `key` to its identity and raw
    /// constraint string.
    ///
    /// The key is the identity for shorthand entries; detailed entries may
    /// name the coordinates explicitly and use the key as an alias.
    pub fn resolve(&self, key: &str) -> Result<(DependencyId, String), DeclarationError> {
        match self {
            DependencySpec::Short(version) => Ok((DependencyId::parse(key)?, version.clone())),
            DependencySpec::Detailed(d) => {
                let id = match (&d.group, &d.artifact) {
                    (Some(group), Some(artifact)) => DependencyId::new(group, artifact)?,
                    (None, None) => DependencyId::parse(key)?,
                    _ => return Err(DeclarationError::PartialCoordinates(key.to_string())),
                };
                Ok((id, d.version.clone()))
            }
        }
    }
}

/// A `group:artifact` pair identifying a library independently of its version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyId {
    pub group: String,
    pub artifact: String,
}

impl DependencyId {
    pub fn new(group: &str, artifact: &str) -> Result<Self, DeclarationError> {
        let group = group.trim();
        let artifact = artifact.trim();
        if group.is_empty() || artifact.is_empty() {
            return Err(DeclarationError::EmptyCoordinate(format!("{group}:{artifact}")));
        }
        if group.contains(':') || artifact.contains(':') {
            return Err(DeclarationError::ExtraSeparator(format!("{group}:{artifact}")));
        }
        Ok(Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
        })
    }

    /// Parse `"group:artifact"`.
    pub fn parse(s: &str) -> Result<Self, DeclarationError> {
        match s.split_once(':') {
            Some((group, artifact)) => Self::new(group, artifact),
            None => Err(DeclarationError::DependencyKey(s.to_string())),
        }
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

impl Serialize for DependencyId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DependencyId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
