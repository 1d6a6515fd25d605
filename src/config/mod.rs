//! Engine Configuration Module
//!
//! Provides forecaster, decision, report and storage settings loaded from a
//! TOML file, with every threshold overridable by the operator.
//!
//! ## Loading Order
//!
//! 1. `CML_ALO_CONFIG` environment variable (path to TOML file)
//! 2. `cml_config.toml` in the current working directory
//! 3. Built-in defaults from [`defaults`]
//!
//! The loaded config is passed explicitly to each component; there is no
//! process-wide instance.

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;
