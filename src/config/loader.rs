// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{JobFile, RawJobFile};
use crate::errors::Result;

/// Load a job file from a given path and return the raw `RawJobFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (unknown dependencies, cycles). Use [`load_and_validate`] for
/// that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawJobFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawJobFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load a job file from path and validate it.
///
/// This is the entry point the binary uses. It checks for:
/// - at least one job,
/// - unknown or self `after` references,
/// - dependency cycles,
/// - a parseable `[config].timeout`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<JobFile> {
    let raw = load_from_path(&path)?;
    JobFile::try_from(raw)
}

/// Default job file location: `Jobdag.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Jobdag.toml")
}
