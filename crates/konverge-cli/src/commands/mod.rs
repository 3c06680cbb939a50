//! Command dispatch and handler modules.

mod check;
mod reconcile;
mod tree;

use miette::Result;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Reconcile {
            manifest_path,
            output,
            format,
            jobs,
            force,
            message_format,
        } => {
            reconcile::exec(
                manifest_path,
                output,
                format.map(Into::into),
                jobs,
                force,
                message_format.into(),
            )
            .await
        }
        Command::Check {
            manifest_path,
            jobs,
            message_format,
        } => check::exec(manifest_path, jobs, message_format.into()).await,
        Command::Tree {
            manifest_path,
            why,
            dependencies,
        } => tree::exec(manifest_path, why, dependencies),
    }
}
