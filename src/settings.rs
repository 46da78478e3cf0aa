//! Application settings.
//!
//! Sources, from lowest to highest priority: built-in defaults, an optional
//! TOML file (`archilog.toml` unless another path is given) and `ARCHILOG_*`
//! environment variables such as `ARCHILOG_DATABASE_URL`.
use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "archilog.toml";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:archilog.db";

/// What an API token is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read and write.
    Admin,
    /// Read only.
    User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub debug: bool,
    pub bind: String,
    pub templates_dir: String,
    pub public_dir: String,
    #[serde(default)]
    pub api_tokens: HashMap<String, Role>,
}

impl Settings {
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("debug", false)?
            .set_default("bind", "127.0.0.1:3000")?
            .set_default("templates_dir", "./src/front/templates")?
            .set_default("public_dir", "./src/front/public")?
            .add_source(file)
            .add_source(Environment::with_prefix("ARCHILOG"))
            .build()?
            .try_deserialize()
    }

    /// Filter handed to `env_logger` when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "archilog=debug"
        } else {
            "archilog=info"
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            database_url = "sqlite:/tmp/other.db"
            bind = "0.0.0.0:8080"

            [api_tokens]
            secret-token-admin = "admin"
            secret-token-user = "user"
            "#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.database_url, "sqlite:/tmp/other.db");
        assert_eq!(settings.bind, "0.0.0.0:8080");
        assert_eq!(settings.templates_dir, "./src/front/templates");
        assert_eq!(settings.api_tokens.get("secret-token-admin"), Some(&Role::Admin));
        assert_eq!(settings.api_tokens.get("secret-token-user"), Some(&Role::User));
        assert_eq!(settings.log_filter(), "archilog=info");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(Settings::load(Some("/nonexistent/archilog.toml")).is_err());
    }
}
