//! Caravel deployment agent
//!
//! Provisions a single ephemeral cloud instance, bootstraps it over SSH,
//! and runs exactly one container on it. Invoked programmatically; there
//! is no CLI or HTTP surface in this crate.

pub mod app;
pub mod container;
pub mod deploy;
pub mod errors;
pub mod logs;
pub mod models;
pub mod provision;
pub mod remote;
pub mod utils;
