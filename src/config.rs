use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, sync::Arc};

use crate::db::DBType;

pub struct AppState {
    pub db: Arc<DBType>,
    pub config: Config,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: usize,
    /// In-memory store when unset
    pub sqlite_path: Option<String>,

    pub jwt_secret: String,
    pub jwt_expire_hours: i64,
    pub bcrypt_cost: Option<u32>,

    #[serde(default = "default_seed")]
    pub seed: bool,
    pub admin_password: Option<String>,
    pub student_password: Option<String>,
}

fn default_seed() -> bool {
    true
}

impl Config {
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost.unwrap_or(bcrypt::DEFAULT_COST)
    }
}

/// Parse the config file into Config struct.
pub fn parse_config(filepath: &str) -> Result<Config> {
    let content = fs::read_to_string(filepath).context("failed to read config file")?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<Config> {
    let c: Config = toml::from_str(content).context("failed to convert toml config data")?;

    if !hostname_validator::is_valid(&c.host) {
        return Err(anyhow::Error::msg(format!("host '{}' is invalid", c.host)));
    }

    if c.port > 65535 {
        return Err(anyhow::Error::msg(format!(
            "port '{}' is invalid, must be between [0, 65535]",
            c.port
        )));
    }

    if c.jwt_secret.is_empty() {
        return Err(anyhow::Error::msg("jwt secret must not be empty"));
    }

    if c.jwt_expire_hours < 1 || c.jwt_expire_hours > 168 {
        return Err(anyhow::Error::msg(format!(
            "jwt expiry interval in hours '{}' is invalid, must be between [1, 168]",
            c.jwt_expire_hours
        )));
    }

    if let Some(cost) = c.bcrypt_cost {
        if !(4..=31).contains(&cost) {
            return Err(anyhow::Error::msg(format!(
                "bcrypt cost '{}' is invalid, must be between [4, 31]",
                cost
            )));
        }
    }

    Ok(c)
}

#[cfg(test)]
mod test {
    use super::*;

    const VALID: &str = r#"
host = "localhost"
port = 3000
jwt_secret = "secret"
jwt_expire_hours = 24
"#;

    #[test]
    fn test_parse_defaults() {
        let config = parse_config_str(VALID).unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.sqlite_path.is_none());
        assert!(config.seed);
        assert!(config.admin_password.is_none());
        assert_eq!(config.bcrypt_cost(), bcrypt::DEFAULT_COST);
    }

    #[test]
    fn test_parse_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            format!("{}sqlite_path = \"bachub.db\"\nbcrypt_cost = 4\nseed = false\n", VALID),
        )
        .unwrap();

        let config = parse_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.sqlite_path.as_deref(), Some("bachub.db"));
        assert_eq!(config.bcrypt_cost(), 4);
        assert!(!config.seed);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        assert!(parse_config_str(&VALID.replace("localhost", "bad host!")).is_err());
        assert!(parse_config_str(&VALID.replace("3000", "70000")).is_err());
        assert!(parse_config_str(&VALID.replace("= 24", "= 200")).is_err());
        assert!(parse_config_str(&VALID.replace("\"secret\"", "\"\"")).is_err());
        assert!(parse_config_str(&format!("{}bcrypt_cost = 2\n", VALID)).is_err());
        assert!(parse_config("/nonexistent/config.toml").is_err());
    }
}
