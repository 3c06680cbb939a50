//! CLI argument definitions for Konverge.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use konverge_core::config::OutputFormat;
use konverge_ops::report::MessageFormat;

#[derive(Parser, Debug)]
#[command(
    name = "konverge",
    version,
    about = "Reconcile toolchain targets and dependency versions across a module graph",
    long_about = "Konverge reads the module declarations in Konverge.toml and converges them on \
                  one toolchain target per module and one version per library, or reports \
                  every conflict that prevents it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile the project and write the resolved configuration
    Reconcile {
        /// Path to Konverge.toml
        #[arg(long)]
        manifest_path: Option<PathBuf>,
        /// Where to write the resolved configuration
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Worker tasks for dependency analysis
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Reconcile even if the output is up to date
        #[arg(long)]
        force: bool,
        /// How to report results
        #[arg(long, value_enum, default_value = "human")]
        message_format: MessageFormatArg,
    },

    /// Check that the project reconciles without writing output
    Check {
        /// Path to Konverge.toml
        #[arg(long)]
        manifest_path: Option<PathBuf>,
        /// Worker tasks for dependency analysis
        #[arg(short, long)]
        jobs: Option<usize>,
        /// How to report results
        #[arg(long, value_enum, default_value = "human")]
        message_format: MessageFormatArg,
    },

    /// Display the module graph
    Tree {
        /// Path to Konverge.toml
        #[arg(long)]
        manifest_path: Option<PathBuf>,
        /// Show how a module is reached, or which modules use a dependency
        #[arg(long)]
        why: Option<String>,
        /// Show resolved dependency versions
        #[arg(short, long)]
        dependencies: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatArg {
    Toml,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Toml => OutputFormat::Toml,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum MessageFormatArg {
    Human,
    Json,
}

impl From<MessageFormatArg> for MessageFormat {
    fn from(arg: MessageFormatArg) -> Self {
        match arg {
            MessageFormatArg::Human => MessageFormat::Human,
            MessageFormatArg::Json => MessageFormat::Json,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
