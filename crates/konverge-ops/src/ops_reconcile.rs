//! Operation: reconcile the project and write the resolved configuration.

use std::path::{Path, PathBuf};

use konverge_core::config::GlobalConfig;
use konverge_resolver::emit::read_input_hash;
use konverge_resolver::pipeline::{
    CancelToken, ReconcileFailure, ReconcileOptions, ReconcileSuccess, Reconciler,
};
use konverge_util::errors::KonvergeError;

use crate::ops_setup::{self, EffectiveSettings, Project, SettingsOverrides};
use crate::report::{self, MessageFormat};

/// Options for `konverge reconcile`.
#[derive(Debug, Clone, Default)]
pub struct ReconcileArgs {
    pub manifest_path: Option<PathBuf>,
    pub settings: SettingsOverrides,
    /// Reconcile even if the existing output is up to date.
    pub force: bool,
    pub message_format: MessageFormat,
}

/// What `reconcile` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Written { output: PathBuf, modules: usize },
    /// The output already matches the current declarations.
    Fresh { output: PathBuf },
}

/// Run the pipeline over a loaded project. Ctrl-C cancels the run at the
/// next stage boundary.
pub async fn run_pipeline(
    project: &Project,
    settings: &EffectiveSettings,
) -> Result<ReconcileSuccess, ReconcileFailure> {
    let token = CancelToken::new();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };

    let reconciler = Reconciler::new(ReconcileOptions {
        workers: settings.jobs,
        format: settings.format,
    })
    .with_cancel_token(token);

    let spinner = konverge_util::progress::spinner(&format!(
        "reconciling {} modules",
        project.manifest.modules.len()
    ));
    let result = reconciler.run(&project.manifest).await;
    spinner.finish_and_clear();
    watcher.abort();
    result
}

/// Whether `output` was produced from the current declarations.
fn is_fresh(project: &Project, settings: &EffectiveSettings) -> bool {
    let Ok(existing) = std::fs::read_to_string(&settings.output) else {
        return false;
    };
    let Some(previous) = read_input_hash(&existing, settings.format) else {
        return false;
    };
    match project.manifest.input_hash() {
        Ok(current) => current == previous,
        Err(e) => {
            tracing::debug!("cannot hash declarations: {e}");
            false
        }
    }
}

fn relative<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

/// Reconcile the project found from `cwd` and write the result, using the
/// user's global config.
pub async fn reconcile(cwd: &Path, args: &ReconcileArgs) -> miette::Result<ReconcileOutcome> {
    reconcile_with(cwd, args, &ops_setup::global_config()).await
}

/// [`reconcile`] with an explicit global config.
pub async fn reconcile_with(
    cwd: &Path,
    args: &ReconcileArgs,
    global: &GlobalConfig,
) -> miette::Result<ReconcileOutcome> {
    let project = ops_setup::load_project(cwd, args.manifest_path.as_deref())?;
    let settings = ops_setup::effective_settings(&project, global, &args.settings);
    let shown = relative(&settings.output, &project.root).display().to_string();

    if !args.force && is_fresh(&project, &settings) {
        tracing::info!("{} is up to date", settings.output.display());
        konverge_util::progress::status("Fresh", &shown);
        report::print_success(args.message_format, Some(settings.output.as_path()));
        return Ok(ReconcileOutcome::Fresh {
            output: settings.output,
        });
    }

    konverge_util::progress::status(
        "Reconciling",
        &format!(
            "{} ({} modules, {} jobs)",
            relative(&project.manifest_path, cwd).display(),
            project.manifest.modules.len(),
            settings.jobs
        ),
    );

    let success = match run_pipeline(&project, &settings).await {
        Ok(success) => success,
        Err(failure) => {
            report::print_failure(args.message_format, &failure);
            return Err(KonvergeError::Reconcile {
                message: failure.to_string(),
            }
            .into());
        }
    };

    if let Some(parent) = settings.output.parent() {
        konverge_util::fs::ensure_dir(parent).map_err(KonvergeError::Io)?;
    }
    konverge_util::fs::write_atomic(&settings.output, success.document.as_bytes()).map_err(
        |e| KonvergeError::Artifact {
            message: format!("Failed to write {}: {e}", settings.output.display()),
        },
    )?;

    let modules = success.configuration.modules.len();
    konverge_util::progress::status("Finished", &format!("{modules} modules -> {shown}"));
    report::print_success(args.message_format, Some(settings.output.as_path()));
    Ok(ReconcileOutcome::Written {
        output: settings.output,
        modules,
    })
}
