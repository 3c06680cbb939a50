//! Reconciliation engine: turns validated module declarations into one
//! consistent configuration, or a complete report of why it cannot.
//!
//! The crate performs no file or network I/O. Callers pass a parsed
//! [`konverge_core::manifest::Manifest`] in and receive either a
//! [`emit::ResolvedConfiguration`] or a [`conflict::ConflictReport`].

pub mod conflict;
pub mod emit;
pub mod graph;
pub mod pipeline;
pub mod resolver;
pub mod rules;
pub mod toolchain;
pub mod version;
