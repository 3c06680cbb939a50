//! Compiler toolchain targets (JVM target, SDK level and similar).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::DeclarationError;

/// A toolchain target such as `17`, `1.8` or `11.0.2`, backed by semver.
///
/// Missing minor/patch components are treated as zero, so `17` and
/// `17.0` compare equal. The text is kept as written for output.
#[derive(Debug, Clone)]
pub struct ToolchainTarget {
    original: String,
    version: Version,
}

impl ToolchainTarget {
    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl FromStr for ToolchainTarget {
    type Err = DeclarationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if trimmed.is_empty() || parts.len() > 3 {
            return Err(DeclarationError::ToolchainTarget(s.to_string()));
        }
        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| DeclarationError::ToolchainTarget(s.to_string()))?;
        }
        Ok(Self {
            original: trimmed.to_string(),
            version: Version::new(numbers[0], numbers[1], numbers[2]),
        })
    }
}

impl PartialEq for ToolchainTarget {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for ToolchainTarget {}

impl Hash for ToolchainTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.version.hash(state);
    }
}

impl Ord for ToolchainTarget {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

impl PartialOrd for ToolchainTarget {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ToolchainTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Serialize for ToolchainTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for ToolchainTarget {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Project-wide toolchain policy from `[toolchain]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToolchainSection {
    pub canonical: String,
    #[serde(default = "default_allow_overrides")]
    pub allow_overrides: bool,
}

fn default_allow_overrides() -> bool {
    true
}
