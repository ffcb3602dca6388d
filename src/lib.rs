//! Property listing service.
//!
//! Serves the full property collection through a cache-aside aggregate that is
//! invalidated synchronously on every write, and reports the cache backend's
//! own hit ratio for operational inspection.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
