//! Configuration validation.

use super::{Config, DatabaseConfig, Operation, RunConfig};
use crate::drivers::common::tls::SslMode;
use crate::error::{Result, SyncError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_side("source", &config.source)?;
    validate_side("destination", &config.destination)?;

    if config.run.checkpoint_interval == 0 {
        return Err(SyncError::Config(
            "run.checkpoint_interval must be at least 1".into(),
        ));
    }

    Ok(())
}

fn validate_side(side: &str, db: &DatabaseConfig) -> Result<()> {
    if db.host.is_empty() {
        return Err(SyncError::Config(format!("{}.host is required", side)));
    }
    if db.database.is_empty() {
        return Err(SyncError::Config(format!("{}.database is required", side)));
    }
    if db.user.is_empty() {
        return Err(SyncError::Config(format!("{}.user is required", side)));
    }
    if db.max_connections == 0 {
        return Err(SyncError::Config(format!(
            "{}.max_connections must be at least 1",
            side
        )));
    }
    SslMode::parse(&db.ssl_mode)?;
    Ok(())
}

/// Copy, single and compare hold a session per side while still reading the catalog.
pub fn validate_pool_sizes(config: &Config, operation: Operation) -> Result<()> {
    if matches!(operation, Operation::Define | Operation::Alter) {
        return Ok(());
    }
    for (side, db) in [("source", &config.source), ("destination", &config.destination)] {
        if db.max_connections < 2 {
            return Err(SyncError::Config(format!(
                "{}.max_connections must be at least 2 for {}",
                side, operation
            )));
        }
    }
    Ok(())
}

/// Reject option combinations that have no meaning for `operation`.
pub fn validate_options(run: &RunConfig, operation: Operation) -> Result<()> {
    if run.relaxed_nulls && operation != Operation::Alter {
        return Err(SyncError::Usage(
            "--relaxed-nulls can only be used with alter".into(),
        ));
    }
    if run.html && operation.writes() {
        return Err(SyncError::Usage(format!(
            "--html cannot be used with {}",
            operation
        )));
    }
    if run.update_fallback && operation != Operation::Copy {
        return Err(SyncError::Usage("--update can only be used with copy".into()));
    }
    if !run.show.is_empty() && !(run.html && operation == Operation::Compare) {
        return Err(SyncError::Usage(
            "--show can only be used with compare --html".into(),
        ));
    }
    if run.limited && !run.html {
        return Err(SyncError::Usage("--limited requires --html".into()));
    }
    if !operation.writes() {
        for (set, flag) in [
            (run.keep_going, "--keep-going"),
            (run.verbose, "--verbose"),
            (run.fire_triggers, "--fire-triggers"),
            (run.commit_on_checkpoint, "--commit-on-checkpoint"),
        ] {
            if set {
                return Err(SyncError::Usage(format!(
                    "{} can only be used with copy or single",
                    flag
                )));
            }
        }
    }
    if run.commit_on_checkpoint && run.single_transaction {
        return Err(SyncError::Usage(
            "--commit-on-checkpoint cannot be combined with --single-transaction".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShowRows;

    fn side(host: &str) -> DatabaseConfig {
        DatabaseConfig {
            host: host.to_string(),
            port: 5432,
            database: "inventory".to_string(),
            user: "postgres".to_string(),
            password: "password".to_string(),
            schema: "public".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 4,
        }
    }

    fn valid_config() -> Config {
        Config {
            source: side("db1"),
            destination: side("db2"),
            run: RunConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_same_database_allowed() {
        let mut config = valid_config();
        config.destination.host = "db1".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_source_host() {
        let mut config = valid_config();
        config.source.host = "".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("source.host"));
    }

    #[test]
    fn test_missing_destination_user() {
        let mut config = valid_config();
        config.destination.user = "".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("destination.user"));
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = valid_config();
        config.source.ssl_mode = "sometimes".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_checkpoint_interval() {
        let mut config = valid_config();
        config.run.checkpoint_interval = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_relaxed_nulls_only_with_alter() {
        let run = RunConfig {
            relaxed_nulls: true,
            ..Default::default()
        };
        assert!(validate_options(&run, Operation::Alter).is_ok());
        assert!(validate_options(&run, Operation::Define).is_err());
    }

    #[test]
    fn test_html_not_with_copy_or_single() {
        let run = RunConfig {
            html: true,
            ..Default::default()
        };
        assert!(validate_options(&run, Operation::Compare).is_ok());
        assert!(validate_options(&run, Operation::Define).is_ok());
        assert!(validate_options(&run, Operation::Copy).is_err());
        assert!(validate_options(&run, Operation::Single).is_err());
    }

    #[test]
    fn test_update_only_with_copy() {
        let run = RunConfig {
            update_fallback: true,
            ..Default::default()
        };
        assert!(validate_options(&run, Operation::Copy).is_ok());
        let err = validate_options(&run, Operation::Single).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_show_requires_html_compare() {
        let mut run = RunConfig {
            show: vec![ShowRows::Missing],
            ..Default::default()
        };
        assert!(validate_options(&run, Operation::Compare).is_err());
        run.html = true;
        assert!(validate_options(&run, Operation::Compare).is_ok());
        assert!(validate_options(&run, Operation::Define).is_err());
    }

    #[test]
    fn test_write_options_only_with_copy_or_single() {
        let run = RunConfig {
            keep_going: true,
            fire_triggers: true,
            ..Default::default()
        };
        assert!(validate_options(&run, Operation::Copy).is_ok());
        assert!(validate_options(&run, Operation::Single).is_ok());
        let err = validate_options(&run, Operation::Compare).unwrap_err();
        assert!(err.to_string().contains("--keep-going"));
    }

    #[test]
    fn test_single_connection_pool_only_for_schema_operations() {
        let mut config = valid_config();
        config.destination.max_connections = 1;
        assert!(validate(&config).is_ok());
        assert!(validate_pool_sizes(&config, Operation::Define).is_ok());
        assert!(validate_pool_sizes(&config, Operation::Alter).is_ok());
        for operation in [Operation::Copy, Operation::Single, Operation::Compare] {
            let err = validate_pool_sizes(&config, operation).unwrap_err();
            assert!(err.to_string().contains("destination.max_connections"));
            assert_eq!(err.exit_code(), 1);
        }
        assert!(config.validate_for(Operation::Compare).is_err());
    }

    #[test]
    fn test_display_flags() {
        let run = RunConfig {
            show: vec![ShowRows::Missing, ShowRows::Different],
            ..Default::default()
        };
        assert_eq!(run.display_flags(), 2 | 8);
    }
}
