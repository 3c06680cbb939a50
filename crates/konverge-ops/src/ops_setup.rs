//! Shared setup for every operation: locate and read the manifest, then
//! merge CLI flags, `[settings]` and global config into effective settings.

use std::path::{Path, PathBuf};

use konverge_core::config::{GlobalConfig, OutputFormat};
use konverge_core::manifest::Manifest;
use konverge_core::{DEFAULT_OUTPUT_FILE, MANIFEST_FILE};
use konverge_resolver::pipeline::default_workers;
use konverge_util::errors::{KonvergeError, KonvergeResult};

/// A manifest and the directory it lives in.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
}

/// Settings given on the command line; `None` defers to lower layers.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub jobs: Option<usize>,
}

/// Settings after precedence is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub format: OutputFormat,
    pub output: PathBuf,
    pub jobs: usize,
}

/// Find the manifest: the explicit path if given, otherwise the nearest
/// `Konverge.toml` in `cwd` or one of its ancestors.
pub fn locate_manifest(cwd: &Path, explicit: Option<&Path>) -> KonvergeResult<PathBuf> {
    if let Some(path) = explicit {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };
        if !path.is_file() {
            return Err(KonvergeError::Manifest {
                message: format!("{} does not exist", path.display()),
            }
            .into());
        }
        return Ok(path);
    }
    konverge_util::fs::find_ancestor_with(cwd, MANIFEST_FILE)
        .map(|dir| dir.join(MANIFEST_FILE))
        .ok_or_else(|| {
            KonvergeError::Manifest {
                message: format!(
                    "could not find {MANIFEST_FILE} in {} or any parent directory",
                    cwd.display()
                ),
            }
            .into()
        })
}

/// Locate and parse the project manifest.
pub fn load_project(cwd: &Path, explicit: Option<&Path>) -> KonvergeResult<Project> {
    let manifest_path = locate_manifest(cwd, explicit)?;
    tracing::debug!("using manifest {}", manifest_path.display());
    let manifest = Manifest::from_path(&manifest_path)?;
    let root = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf());
    Ok(Project {
        root,
        manifest_path,
        manifest,
    })
}

/// Apply precedence: CLI flag, then manifest `[settings]`, then global
/// config, then built-in defaults. Relative output paths resolve against
/// the project root.
pub fn effective_settings(
    project: &Project,
    global: &GlobalConfig,
    cli: &SettingsOverrides,
) -> EffectiveSettings {
    let settings = project.manifest.settings.clone().unwrap_or_default();

    let format = cli
        .format
        .or(settings.format)
        .or(global.reconcile.format)
        .unwrap_or_default();
    let jobs = cli
        .jobs
        .or(settings.jobs)
        .or(global.reconcile.jobs)
        .unwrap_or_else(default_workers)
        .max(1);
    let output = cli
        .output
        .clone()
        .or_else(|| settings.output.map(PathBuf::from))
        .unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_FILE).with_extension(format.extension()));
    let output = if output.is_absolute() {
        output
    } else {
        project.root.join(output)
    };

    EffectiveSettings {
        format,
        output,
        jobs,
    }
}

/// Load global config, falling back to defaults with a warning when it is
/// unreadable.
pub fn global_config() -> GlobalConfig {
    GlobalConfig::load().unwrap_or_else(|e| {
        konverge_util::progress::status_warn("Warning", &format!("{e}; using defaults"));
        GlobalConfig::default()
    })
}
