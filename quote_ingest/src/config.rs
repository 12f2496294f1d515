//! Worker configuration: parsing, defaults, and loading.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! dedupe_within_payload = true
//! dry_run = false
//!
//! [parameters]
//! host     = "/rrg-creator/rds-endpoint"
//! user     = "/rrg-creator/rds-user"
//! password = "/rrg-creator/rds-password"
//! database = "/rrg-creator/rds-database"
//!
//! # Optional: serve the parameters above from the config itself instead of
//! # the environment.
//! [static_parameters]
//! "/rrg-creator/rds-database" = "quotes.db"
//! ```

use std::path::Path;

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::plan::PlanOptions;

/// Top-level worker configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct IngestConfig {
    /// Parameter paths handed to the credentials provider.
    pub parameters: ParameterPaths,
    /// Skip repeated `(code, date)` keys within one payload instead of
    /// queueing every copy.
    pub dedupe_within_payload: bool,
    /// Probe and plan, then roll back instead of committing.
    pub dry_run: bool,
    /// Parameter values served by a static provider instead of the environment.
    pub static_parameters: Option<IndexMap<String, String>>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            parameters: ParameterPaths::default(),
            dedupe_within_payload: true,
            dry_run: false,
            static_parameters: None,
        }
    }
}

impl IngestConfig {
    /// Planner options derived from this config.
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            dedupe_within_payload: self.dedupe_within_payload,
        }
    }
}

/// Paths of the four connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ParameterPaths {
    /// Database host.
    pub host: String,
    /// Database user.
    pub user: String,
    /// Database password; always requested decrypted.
    pub password: String,
    /// Database name (for SQLite, the file path or URL).
    pub database: String,
}

impl Default for ParameterPaths {
    fn default() -> Self {
        Self {
            host: "/rrg-creator/rds-endpoint".to_string(),
            user: "/rrg-creator/rds-user".to_string(),
            password: "/rrg-creator/rds-password".to_string(),
            database: "/rrg-creator/rds-database".to_string(),
        }
    }
}

/// Parse and validate a config from a TOML string.
pub fn load_config_str(s: &str) -> anyhow::Result<IngestConfig> {
    let cfg: IngestConfig = toml::from_str(s).context("parse ingest config TOML")?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Read, parse and validate a config file.
pub fn load_config_path(path: impl AsRef<Path>) -> anyhow::Result<IngestConfig> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    load_config_str(&s).with_context(|| format!("load config {}", path.display()))
}

fn validate(cfg: &IngestConfig) -> anyhow::Result<()> {
    let p = &cfg.parameters;
    for (name, value) in [
        ("host", &p.host),
        ("user", &p.user),
        ("password", &p.password),
        ("database", &p.database),
    ] {
        if value.trim().is_empty() {
            bail!("parameters.{name} must not be empty");
        }
    }
    Ok(())
}
