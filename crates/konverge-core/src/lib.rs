//! Core data types for the Konverge reconciler.
//!
//! This crate defines the raw declarations read from `Konverge.toml`
//! (modules, dependencies, plugins, library catalog, override rules), the
//! identities used throughout reconciliation, toolchain targets, and the
//! global user configuration.
//!
//! This crate is intentionally free of async code and network I/O.

/// File name of the project manifest.
pub const MANIFEST_FILE: &str = "Konverge.toml";

/// Default file name of the emitted resolved configuration.
pub const DEFAULT_OUTPUT_FILE: &str = "Konverge.resolved.toml";

pub mod catalog;
pub mod config;
pub mod dependency;
pub mod error;
pub mod manifest;
pub mod module;
pub mod overrides;
pub mod plugin;
pub mod toolchain;
