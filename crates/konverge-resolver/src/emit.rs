//! The resolved configuration document handed to the downstream build.

use std::collections::BTreeMap;

use konverge_core::config::OutputFormat;
use konverge_core::dependency::DependencyId;
use konverge_core::module::ModuleId;
use konverge_util::errors::KonvergeError;
use serde::{Deserialize, Serialize};

use crate::graph::LoadedInput;
use crate::resolver::Resolution;
use crate::toolchain::Enforcement;

/// Final reconciled configuration. Maps are ordered, so serializing the
/// same value always yields the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedConfiguration {
    pub input_hash: String,
    pub canonical_toolchain: String,
    #[serde(default)]
    pub modules: BTreeMap<ModuleId, ResolvedModule>,
}

/// One module's entry in the resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedModule {
    pub toolchain: String,
    /// Override that set `toolchain`, absent when it is canonical.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolchain_source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<DependencyId, String>,
    /// Override that forced each pinned dependency.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub forced: BTreeMap<DependencyId, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ResolvedConfiguration {
    /// Combine the outputs of every stage into the final configuration.
    pub fn build(
        input_hash: String,
        input: &LoadedInput,
        resolution: &Resolution,
        enforcement: &Enforcement,
    ) -> Self {
        let modules = input
            .graph
            .modules()
            .into_iter()
            .map(|node| {
                let assignment = enforcement.targets.get(&node.id);
                let mut dependencies = BTreeMap::new();
                let mut forced = BTreeMap::new();
                for (dep, resolved) in resolution.dependencies_of(&node.id) {
                    dependencies.insert(dep.clone(), resolved.version.to_string());
                    if let Some(ref source) = resolved.forced_by {
                        forced.insert(dep.clone(), source.clone());
                    }
                }
                let module = ResolvedModule {
                    toolchain: assignment
                        .map(|a| a.target.to_string())
                        .unwrap_or_else(|| input.canonical.to_string()),
                    toolchain_source: assignment.and_then(|a| a.overridden_by.clone()),
                    plugins: node.plugins.clone(),
                    dependencies,
                    forced,
                    attributes: node.attributes.clone(),
                };
                (node.id.clone(), module)
            })
            .collect();

        Self {
            input_hash,
            canonical_toolchain: input.canonical.to_string(),
            modules,
        }
    }
}

/// Serialize a configuration. Output always ends with a newline.
pub fn emit(config: &ResolvedConfiguration, format: OutputFormat) -> Result<String, KonvergeError> {
    let mut text = match format {
        OutputFormat::Toml => toml::to_string_pretty(config).map_err(|e| KonvergeError::Artifact {
            message: format!("Failed to serialize resolved configuration: {e}"),
        })?,
        OutputFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| KonvergeError::Artifact {
                message: format!("Failed to serialize resolved configuration: {e}"),
            })?
        }
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

/// Parse a previously emitted document.
pub fn parse(text: &str, format: OutputFormat) -> Result<ResolvedConfiguration, KonvergeError> {
    let parsed = match format {
        OutputFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        OutputFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| KonvergeError::Artifact {
        message: format!("Failed to read resolved configuration: {e}"),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HashOnly {
    input_hash: String,
}

/// The `input-hash` of a previously emitted document, if it has one.
pub fn read_input_hash(text: &str, format: OutputFormat) -> Option<String> {
    let parsed: Option<HashOnly> = match format {
        OutputFormat::Toml => toml::from_str(text).ok(),
        OutputFormat::Json => serde_json::from_str(text).ok(),
    };
    parsed.map(|h| h.input_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResolvedConfiguration {
        let mut modules = BTreeMap::new();
        let mut app_deps = BTreeMap::new();
        app_deps.insert(DependencyId::parse("org.example:libX").unwrap(), "1.2".to_string());
        app_deps.insert(DependencyId::parse("com.example:a").unwrap(), "2.0".to_string());
        let mut forced = BTreeMap::new();
        forced.insert(
            DependencyId::parse("org.example:libX").unwrap(),
            "override #1 (all modules)".to_string(),
        );
        modules.insert(
            ModuleId::from(":core"),
            ResolvedModule {
                toolchain: "17".to_string(),
                toolchain_source: None,
                plugins: Vec::new(),
                dependencies: BTreeMap::new(),
                forced: BTreeMap::new(),
                attributes: BTreeMap::new(),
            },
        );
        modules.insert(
            ModuleId::from(":app"),
            ResolvedModule {
                toolchain: "21".to_string(),
                toolchain_source: Some("toolchain field of :app".to_string()),
                plugins: vec!["com.android.application".to_string()],
                dependencies: app_deps,
                forced,
                attributes: BTreeMap::from([(
                    "namespace".to_string(),
                    "com.example.app".to_string(),
                )]),
            },
        );
        ResolvedConfiguration {
            input_hash: "abc123".to_string(),
            canonical_toolchain: "17".to_string(),
            modules,
        }
    }

    #[test]
    fn toml_is_sorted_and_stable() {
        let config = sample();
        let first = emit(&config, OutputFormat::Toml).unwrap();
        let second = emit(&config.clone(), OutputFormat::Toml).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("input-hash = "));
        assert!(first.find(":app").unwrap() < first.find(":core").unwrap());
        let a = first.find("com.example:a").unwrap();
        let x = first.find("org.example:libX").unwrap();
        assert!(a < x);
    }

    #[test]
    fn json_round_trips() {
        let config = sample();
        let text = emit(&config, OutputFormat::Json).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(parse(&text, OutputFormat::Json).unwrap(), config);
    }

    #[test]
    fn reads_input_hash() {
        let config = sample();
        for format in [OutputFormat::Toml, OutputFormat::Json] {
            let text = emit(&config, format).unwrap();
            assert_eq!(read_input_hash(&text, format).as_deref(), Some("abc123"));
        }
        assert_eq!(read_input_hash("not a document", OutputFormat::Toml), None);
    }
}
