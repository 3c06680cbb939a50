use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Known facts about a library, from `[libraries."group:artifact"]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LibraryEntry {
    /// Published versions; candidates when a range has to be narrowed to
    /// one concrete version.
    #[serde(default)]
    pub versions: Vec<String>,

    /// Toolchain target required by every version of the library.
    #[serde(default)]
    pub min_toolchain: Option<String>,

    /// Per-version requirement, taking precedence over `min-toolchain`.
    #[serde(default)]
    pub requires_toolchain: BTreeMap<String, String>,
}
