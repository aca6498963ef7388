//! # Anbar Support
//!
//! Shared helpers for the Anbar DI workspace.
//!
//! Currently this is the diagnostics renderer used by the container's
//! error messages: dependency chains, short type names and
//! "did you mean" suggestions.

pub mod rendering;
