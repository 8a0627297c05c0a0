//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{Result, SyncError};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the connection settings and run options.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Validate that the run options make sense for `operation`.
    pub fn validate_for(&self, operation: Operation) -> Result<()> {
        validation::validate_options(&self.run, operation)?;
        validation::validate_pool_sizes(self, operation)
    }
}

impl DatabaseConfig {
    /// Connection settings for tokio-postgres. TLS is negotiated by the driver.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password)
            .application_name("pgcopy");
        pg
    }

    /// `user@host:database`, used in report headers.
    pub fn label(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.database)
    }
}
