// src/checksum/mod.rs

//! File-content checksumming.
//!
//! - [`service`] computes digests for a fixed set of named algorithms, with
//!   a per-algorithm memo keyed by path and invalidated on length/mtime
//!   changes.
//! - [`store`] persists one aggregate input digest per task, which is what
//!   makes skip-if-unchanged work across invocations.

pub mod service;
pub mod store;

pub use service::{Algorithm, ChecksumService};
pub use store::ChecksumStore;
