// src/config/validate.rs

use crate::config::model::{JobFile, RawJobFile};
use crate::errors::{JobdagError, Result};

impl TryFrom<RawJobFile> for JobFile {
    type Error = JobdagError;

    fn try_from(raw: RawJobFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_job_file(&raw)?;
        Ok(JobFile::new_unchecked(raw.config, raw.job))
    }
}

fn validate_raw_job_file(cfg: &RawJobFile) -> Result<()> {
    ensure_has_jobs(cfg)?;
    validate_global_config(cfg)?;
    validate_job_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_jobs(cfg: &RawJobFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(JobdagError::ConfigError(
            "job file must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawJobFile) -> Result<()> {
    if let Some(timeout) = cfg.config.timeout.as_deref() {
        crate::config::model::parse_duration(timeout).map_err(|e| {
            JobdagError::ConfigError(format!("[config].timeout is invalid: {e}"))
        })?;
    }
    Ok(())
}

fn validate_job_dependencies(cfg: &RawJobFile) -> Result<()> {
    for (name, job) in cfg.job.iter() {
        for dep in job.after.iter() {
            if dep == name {
                return Err(JobdagError::ConfigError(format!(
                    "job '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.job.contains_key(dep) {
                return Err(JobdagError::ConfigError(format!(
                    "job '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawJobFile) -> Result<()> {
    // Same shape the scheduler will see; a topological sort fails on a cycle.
    let unchecked = JobFile::new_unchecked(cfg.config.clone(), cfg.job.clone());
    unchecked.graph().check_acyclic().map(|_| ())
}
