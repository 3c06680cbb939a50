//! Shared utilities for Konverge.
//!
//! This crate provides cross-cutting concerns used by all other Konverge
//! crates: error types, filesystem helpers, input hashing, and terminal
//! status output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
