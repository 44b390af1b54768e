//! Run configuration shared by every pipeline step.
use crate::cli::SeedArgs;
use anyhow::{anyhow, Context, Result};
use std::time::Duration;

/// Immutable settings for one seeding run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Base URL without a trailing slash.
    pub host: String,
    pub credential: String,
    pub index: String,
    pub verbose: bool,
    pub json: bool,
    pub timeout: Duration,
    pub check_health: bool,
    pub fresh: bool,
}

impl RunConfig {
    /// Validate the connection settings; optional behaviour starts disabled.
    pub fn new(host: &str, credential: &str, index: &str) -> Result<Self> {
        Ok(Self {
            host: normalize_host(host)?,
            credential: credential.to_string(),
            index: validate_index(index)?,
            verbose: false,
            json: false,
            timeout: Duration::from_secs(crate::cli::DEFAULT_TIMEOUT_SECS),
            check_health: false,
            fresh: false,
        })
    }

    pub fn from_args(args: &SeedArgs) -> Result<Self> {
        if args.timeout_secs == 0 {
            return Err(anyhow!("--timeout-secs must be greater than zero"));
        }
        let mut config = Self::new(&args.host, &args.key, &args.index)?;
        config.verbose = args.verbose;
        config.json = args.json;
        config.timeout = Duration::from_secs(args.timeout_secs);
        config.check_health = args.check_health;
        config.fresh = args.fresh;
        Ok(config)
    }
}

fn normalize_host(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed = url::Url::parse(trimmed).with_context(|| format!("parse host URL {trimmed:?}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!(
            "host URL must use http or https (got {:?})",
            parsed.scheme()
        ));
    }
    if parsed.host_str().is_none() {
        return Err(anyhow!("host URL has no host: {trimmed:?}"));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(anyhow!(
            "host URL must not carry a query or fragment: {trimmed:?}"
        ));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn validate_index(raw: &str) -> Result<String> {
    let index = raw.trim();
    if index.is_empty() {
        return Err(anyhow!("index name must not be empty"));
    }
    // Index uids are interpolated into request paths.
    if !index
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(anyhow!(
            "index name may only contain ASCII letters, digits, '-' and '_' (got {index:?})"
        ));
    }
    Ok(index.to_string())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
