// src/errors.rs

//! Crate-wide error aliases.
//!
//! Currently a thin wrapper around `anyhow`; captured node failures and
//! plan-fatal errors are plain `anyhow::Error` values carrying task context.

pub use anyhow::{Error, Result};
