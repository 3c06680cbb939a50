//! Operation: reconcile without writing any output.

use std::path::{Path, PathBuf};

use konverge_util::errors::KonvergeError;

use crate::ops_reconcile::run_pipeline;
use crate::ops_setup::{self, SettingsOverrides};
use crate::report::{self, MessageFormat};

/// Validate the project and report every diagnostic. Succeeds only when
/// reconciliation would succeed.
pub async fn check(
    cwd: &Path,
    manifest_path: Option<PathBuf>,
    jobs: Option<usize>,
    message_format: MessageFormat,
) -> miette::Result<()> {
    let project = ops_setup::load_project(cwd, manifest_path.as_deref())?;
    let global = ops_setup::global_config();
    let settings = ops_setup::effective_settings(
        &project,
        &global,
        &SettingsOverrides {
            jobs,
            ..Default::default()
        },
    );

    konverge_util::progress::status(
        "Checking",
        &format!("{} modules", project.manifest.modules.len()),
    );
    match run_pipeline(&project, &settings).await {
        Ok(success) => {
            konverge_util::progress::status(
                "Finished",
                &format!(
                    "no conflicts in {} modules",
                    success.configuration.modules.len()
                ),
            );
            report::print_success(message_format, None);
            Ok(())
        }
        Err(failure) => {
            report::print_failure(message_format, &failure);
            Err(KonvergeError::Reconcile {
                message: failure.to_string(),
            }
            .into())
        }
    }
}
