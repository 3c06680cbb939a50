use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::catalog::LibraryEntry;
use crate::config::OutputFormat;
use crate::module::ModuleDeclaration;
use crate::overrides::OverrideDeclaration;
use crate::plugin::PluginSpec;
use crate::toolchain::ToolchainSection;

/// The parsed representation of a `Konverge.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub toolchain: ToolchainSection,

    #[serde(default)]
    pub settings: Option<ProjectSettings>,

    #[serde(default)]
    pub plugins: BTreeMap<String, PluginSpec>,

    #[serde(default)]
    pub libraries: BTreeMap<String, LibraryEntry>,

    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleDeclaration>,

    #[serde(default, rename = "override")]
    pub overrides: Vec<OverrideDeclaration>,
}

/// Per-project reconciliation defaults from `[settings]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSettings {
    #[serde(default)]
    pub format: Option<OutputFormat>,
    /// Output path, relative to the manifest directory.
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub jobs: Option<usize>,
}

impl Manifest {
    /// Load and parse a `Konverge.toml` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            konverge_util::errors::KonvergeError::Manifest {
                message: format!("Failed to read {}: {e}", path.display()),
            }
        })?;
        Self::parse_toml(&content)
    }

    /// Parse a `Konverge.toml` from a string.
    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            konverge_util::errors::KonvergeError::Manifest {
                message: format!("Failed to parse Konverge.toml: {e}"),
            }
            .into()
        })
    }

    /// Hash of the declaration set, used as the cache key of a resolved
    /// configuration.
    ///
    /// Modules are sorted by name first so that reordering module blocks
    /// does not change the key. Override order is meaningful and kept.
    /// `[settings]` only affects how output is written, so it is excluded.
    pub fn input_hash(&self) -> Result<String, serde_json::Error> {
        let mut canonical = self.clone();
        canonical.settings = None;
        canonical.modules.sort_by(|a, b| a.name.cmp(&b.name));
        let bytes = serde_json::to_vec(&canonical)?;
        Ok(konverge_util::hash::sha256_bytes(&bytes))
    }
}
