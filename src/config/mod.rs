// src/config/mod.rs

//! Job file loading and validation.
//!
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a job file from disk (`loader.rs`).
//! - Validate dependencies and acyclicity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{parse_duration, ConfigSection, JobConfig, JobFile, RawJobFile};
