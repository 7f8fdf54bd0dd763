use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub prune_interval_hours: Option<u64>,
    /// Offset of the community's local time from UTC, in minutes.
    pub utc_offset_minutes: Option<i32>,

    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Role claims granting administration, e.g. `["admin", "moderator"]`.
    pub admin_roles: Option<Vec<String>>,
    pub token_retention_days: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_nested_auth_section() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
port = 4000
utc_offset_minutes = 60

[auth]
admin_roles = ["admin", "moderator"]
"#,
        )
        .unwrap();

        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.port, Some(4000));
        assert_eq!(config.utc_offset_minutes, Some(60));
        let auth = config.auth.unwrap();
        assert_eq!(
            auth.admin_roles,
            Some(vec!["admin".to_string(), "moderator".to_string()])
        );
        assert_eq!(auth.token_retention_days, None);
    }

    #[test]
    fn rejects_malformed_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();
        assert!(FileConfig::load(&path).is_err());
    }
}
