//! Derive and attribute macros for Anbar, re-exported for the facade
//! crate.

pub use anbar_macros::injectable;
