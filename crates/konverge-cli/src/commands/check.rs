//! Check command implementation.

use std::path::PathBuf;

use konverge_ops::report::MessageFormat;
use miette::Result;

pub async fn exec(
    manifest_path: Option<PathBuf>,
    jobs: Option<usize>,
    message_format: MessageFormat,
) -> Result<()> {
    let cwd = std::env::current_dir().map_err(konverge_util::errors::KonvergeError::Io)?;
    konverge_ops::ops_check::check(&cwd, manifest_path, jobs, message_format).await
}
