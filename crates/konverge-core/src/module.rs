use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dependency::DependencySpec;
use crate::overrides::OverrideDeclaration;

/// A single `[[module]]` declaration, exactly as written in `Konverge.toml`.
///
/// Version strings are kept raw; the loader validates them so every
/// malformed entry can be reported at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDeclaration {
    pub name: String,

    /// Other modules this module consumes (project dependencies).
    #[serde(default)]
    pub modules: Vec<String>,

    /// Plugin ids in application order.
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Explicit toolchain target for this module only.
    #[serde(default)]
    pub toolchain: Option<String>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencySpec>,

    /// Rules scoped to this module and its path descendants.
    #[serde(default)]
    pub overrides: Vec<OverrideDeclaration>,

    /// Opaque key/value pairs forwarded to the resolved configuration.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Unique module identity, usually a path such as `:app` or `:feature:login`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this module lives at `prefix` or below it.
    ///
    /// Matching is segment-aware: `:feature` covers `:feature` and
    /// `:feature:login` but not `:features`. Both `:` and `/` separate
    /// segments.
    pub fn is_within(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return true;
        }
        let Some(rest) = self.0.strip_prefix(prefix) else {
            return false;
        };
        rest.is_empty()
            || prefix.ends_with([':', '/'])
            || rest.starts_with([':', '/'])
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
