use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Konverge operations outside the pure
/// reconciliation core.
#[derive(Debug, Error, Diagnostic)]
pub enum KonvergeError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed manifest (e.g. Konverge.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Konverge.toml for syntax errors"))]
    Manifest { message: String },

    /// Global or project configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Reconciliation finished with diagnostics; nothing was emitted.
    #[error("Reconciliation failed: {message}")]
    #[diagnostic(help("Add an [[override]] rule or fix the conflicting declarations"))]
    Reconcile { message: String },

    /// Writing or reading the resolved configuration artifact failed.
    #[error("Artifact error: {message}")]
    Artifact { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type KonvergeResult<T> = miette::Result<T>;
