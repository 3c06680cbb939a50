use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dependency::DependencySpec;

/// Behaviour contributed by a build plugin, from `[plugins."<id>"]`.
///
/// Modules apply plugins by id; ids without a spec contribute nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginSpec {
    /// The plugin must be the last one a module applies.
    #[serde(default)]
    pub apply_last: bool,

    /// Lowest toolchain target a module applying this plugin may use.
    #[serde(default)]
    pub min_toolchain: Option<String>,

    /// Dependencies added to every module that applies the plugin.
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencySpec>,
}
