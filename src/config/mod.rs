//! Sentinel Configuration Module
//!
//! TOML configuration for the monitor loop, the status API, recovery
//! overrides and TCP probe targets.
//!
//! ## Loading Order
//!
//! 1. `--config` path from the command line
//! 2. `SENTINEL_CONFIG` environment variable
//! 3. `sentinel.toml` in the current working directory
//! 4. Built-in defaults
//!
//! The loaded [`SentinelConfig`] is passed explicitly to the monitor builder
//! and the API layer; there is no global instance.

mod sentinel_config;
pub mod defaults;

pub use sentinel_config::*;
