mod file_config;

pub use file_config::{AuthConfig, FileConfig};

use crate::server::RequestsLoggingLevel;
use crate::user::UserRole;
use anyhow::{anyhow, bail, Context, Result};
use chrono::FixedOffset;
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 9 * 60;
pub const DEFAULT_AUTH_TOKEN_RETENTION_DAYS: u64 = 30;

/// Settings given on the command line. Any of them may be replaced by the
/// TOML file.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub prune_interval_hours: u64,
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub prune_interval_hours: u64,
    /// Local time of the community, used for calendar days of festivals.
    pub utc_offset: FixedOffset,
    pub admin_roles: Vec<UserRole>,
    pub auth_token_retention_days: u64,
}

impl AppConfig {
    /// Merges command line and file settings, the file winning.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow!("db_dir must be specified via --db-dir or in config file"))?;
        if !db_dir.is_dir() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        let prune_interval_hours = file
            .prune_interval_hours
            .unwrap_or(cli.prune_interval_hours);

        let utc_offset = utc_offset_from_minutes(
            file.utc_offset_minutes
                .or(cli.utc_offset_minutes)
                .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES),
        )?;

        let auth = file.auth.unwrap_or_default();
        let admin_roles = parse_admin_roles(auth.admin_roles.as_deref())?;
        let auth_token_retention_days = auth
            .token_retention_days
            .unwrap_or(DEFAULT_AUTH_TOKEN_RETENTION_DAYS);

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            prune_interval_hours,
            utc_offset,
            admin_roles,
            auth_token_retention_days,
        })
    }

    pub fn community_db_path(&self) -> PathBuf {
        self.db_dir.join("community.db")
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

fn utc_offset_from_minutes(minutes: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(minutes * 60)
        .with_context(|| format!("Invalid UTC offset of {} minutes", minutes))
}

/// Unset means the `admin` role only.
fn parse_admin_roles(names: Option<&[String]>) -> Result<Vec<UserRole>> {
    let Some(names) = names else {
        return Ok(vec![UserRole::Admin]);
    };
    names
        .iter()
        .map(|name| name.parse::<UserRole>())
        .collect::<Result<Vec<_>>>()
        .context("Invalid admin_roles")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_for(temp_dir: &TempDir) -> CliConfig {
        CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Headers,
            prune_interval_hours: 12,
            ..Default::default()
        }
    }

    #[test]
    fn logging_level_names_are_case_insensitive() {
        assert_eq!(parse_logging_level("none"), Some(RequestsLoggingLevel::None));
        assert_eq!(parse_logging_level("PATH"), Some(RequestsLoggingLevel::Path));
        assert_eq!(parse_logging_level("Body"), Some(RequestsLoggingLevel::Body));
        assert_eq!(parse_logging_level("verbose"), None);
    }

    #[test]
    fn admin_roles_default_to_admin() {
        assert_eq!(parse_admin_roles(None).unwrap(), vec![UserRole::Admin]);
        let names = vec!["Admin".to_string(), "moderator".to_string()];
        assert_eq!(
            parse_admin_roles(Some(names.as_slice())).unwrap(),
            vec![UserRole::Admin, UserRole::Moderator]
        );
        assert_eq!(parse_admin_roles(Some(&[][..])).unwrap(), vec![]);
    }

    #[test]
    fn command_line_alone_is_enough() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::resolve(&cli_for(&temp_dir), None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 3001);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.prune_interval_hours, 12);
        assert_eq!(config.utc_offset.local_minus_utc(), 9 * 3600);
        assert_eq!(config.admin_roles, vec![UserRole::Admin]);
        assert_eq!(
            config.auth_token_retention_days,
            DEFAULT_AUTH_TOKEN_RETENTION_DAYS
        );
        assert_eq!(config.community_db_path(), temp_dir.path().join("community.db"));
    }

    #[test]
    fn file_settings_win_over_command_line() {
        let temp_dir = TempDir::new().unwrap();
        let mut cli = cli_for(&temp_dir);
        cli.db_dir = Some(PathBuf::from("/should/be/overridden"));
        cli.utc_offset_minutes = Some(0);

        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            port: Some(4000),
            logging_level: Some("body".to_string()),
            utc_offset_minutes: Some(-300),
            auth: Some(AuthConfig {
                admin_roles: Some(vec!["moderator".to_string()]),
                token_retention_days: Some(7),
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 4000);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert_eq!(config.utc_offset.local_minus_utc(), -300 * 60);
        assert_eq!(config.admin_roles, vec![UserRole::Moderator]);
        assert_eq!(config.auth_token_retention_days, 7);
    }

    #[test]
    fn db_dir_must_exist() {
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/definitely/not/here")),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
        assert!(AppConfig::resolve(&CliConfig::default(), None).is_err());
    }

    #[test]
    fn rejects_unknown_roles_and_offsets() {
        let temp_dir = TempDir::new().unwrap();
        let file_config = FileConfig {
            auth: Some(AuthConfig {
                admin_roles: Some(vec!["superuser".to_string()]),
                token_retention_days: None,
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli_for(&temp_dir), Some(file_config)).is_err());

        let file_config = FileConfig {
            utc_offset_minutes: Some(24 * 60),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli_for(&temp_dir), Some(file_config)).is_err());
    }
}
