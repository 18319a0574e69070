//! Server configuration
//!
//! Built from the defaults, an optional TOML file, the environment and the
//! command line flags, each one overriding the previous.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub const ENV_PORT: &str = "PORT";
pub const ENV_JWT_SECRET: &str = "JWT_SECRET";
pub const ENV_DATA_DIR: &str = "IMGTUNE_DATA_DIR";
pub const ENV_UPLOAD_DIR: &str = "IMGTUNE_UPLOAD_DIR";

const DB_FILE_NAME: &str = "users.json";

/// What to do with a `userToken` cookie that fails verification
#[derive(Serialize, Deserialize, ValueEnum, Default, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvalidTokenPolicy {
    /// Treat the request like a first visit
    #[default]
    Reissue,

    /// Keep going without a session, handlers answer 401
    Reject,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct Config {
    #[derivative(Default(value = "\"0.0.0.0\".to_string()"))]
    pub host: String,

    #[derivative(Default(value = "5000"))]
    pub port: u16,

    pub jwt_secret: String,

    #[derivative(Default(value = "PathBuf::from(\"data\")"))]
    pub data_dir: PathBuf,

    #[derivative(Default(value = "PathBuf::from(\"uploads\")"))]
    pub upload_dir: PathBuf,

    #[derivative(Default(value = "7"))]
    pub token_ttl_days: i64,

    #[derivative(Default(value = "400"))]
    pub preview_width: u32,

    #[derivative(Default(value = "400"))]
    pub preview_height: u32,

    // 20 MiB
    #[derivative(Default(value = "20 * 1024 * 1024"))]
    pub max_upload_bytes: usize,

    pub invalid_token_policy: InvalidTokenPolicy,
}

#[derive(Parser, Debug, Default, Clone)]
#[command(version, about = "Image tuning web service")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory of the session record document
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory of the uploaded and generated images
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub invalid_token_policy: Option<InvalidTokenPolicy>,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_cli(cli);

        if config.jwt_secret.is_empty() {
            log::warn!("{ENV_JWT_SECRET} is empty, session tokens are signed with an empty key");
        }

        Ok(config)
    }

    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file {} failed", path.display()))?;

        toml::from_str::<Config>(&text)
            .with_context(|| format!("parse config file {} failed", path.display()))
    }

    /// Override fields from environment variables looked up by `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_PORT}: {port}"))?;
        }

        if let Some(secret) = lookup(ENV_JWT_SECRET) {
            self.jwt_secret = secret;
        }

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(dir) = lookup(ENV_UPLOAD_DIR) {
            self.upload_dir = PathBuf::from(dir);
        }

        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }

        if let Some(port) = cli.port {
            self.port = port;
        }

        if let Some(dir) = &cli.data_dir {
            self.data_dir = dir.clone();
        }

        if let Some(dir) = &cli.upload_dir {
            self.upload_dir = dir.clone();
        }

        if let Some(policy) = cli.invalid_token_policy {
            self.invalid_token_policy = policy;
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:5000");
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!((config.preview_width, config.preview_height), (400, 400));
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.invalid_token_policy, InvalidTokenPolicy::Reissue);
        assert_eq!(config.db_path(), PathBuf::from("data/users.json"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("imgtune.toml");
        fs::write(
            &path,
            "port = 8080\ninvalid_token_policy = \"reject\"\nupload_dir = \"/srv/uploads\"\n",
        )?;

        let config = Config::from_file(&path)?;
        assert_eq!(config.port, 8080);
        assert_eq!(config.invalid_token_policy, InvalidTokenPolicy::Reject);
        assert_eq!(config.upload_dir, PathBuf::from("/srv/uploads"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.preview_width, 400);
        Ok(())
    }

    #[test]
    fn test_env_then_cli_override() -> Result<()> {
        let env = HashMap::from([
            (ENV_PORT, "6000"),
            (ENV_JWT_SECRET, "s3cret"),
            (ENV_DATA_DIR, "/var/lib/imgtune"),
        ]);

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()))?;
        assert_eq!(config.port, 6000);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/imgtune/users.json"));

        let cli = Cli::parse_from(["imgtune", "--port", "7000", "--invalid-token-policy", "reject"]);
        config.apply_cli(&cli);
        assert_eq!(config.port, 7000);
        assert_eq!(config.invalid_token_policy, InvalidTokenPolicy::Reject);
        assert_eq!(config.jwt_secret, "s3cret");
        Ok(())
    }

    #[test]
    fn test_invalid_port_env() {
        let mut config = Config::default();
        assert!(config.apply_env(|key| (key == ENV_PORT).then(|| "http".to_string())).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        assert!(Config::from_file(&PathBuf::from("/nonexistent/imgtune.toml")).is_err());
    }
}
