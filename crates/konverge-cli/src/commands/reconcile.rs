//! Handler for `konverge reconcile`.

use std::path::PathBuf;

use konverge_core::config::OutputFormat;
use konverge_ops::ops_reconcile::{self, ReconcileArgs};
use konverge_ops::ops_setup::SettingsOverrides;
use konverge_ops::report::MessageFormat;
use miette::Result;

pub async fn exec(
    manifest_path: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
    jobs: Option<usize>,
    force: bool,
    message_format: MessageFormat,
) -> Result<()> {
    let cwd = std::env::current_dir().map_err(konverge_util::errors::KonvergeError::Io)?;
    let args = ReconcileArgs {
        manifest_path,
        settings: SettingsOverrides {
            format,
            output,
            jobs,
        },
        force,
        message_format,
    };
    ops_reconcile::reconcile(&cwd, &args).await.map(|_| ())
}
