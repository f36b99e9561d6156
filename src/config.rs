use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

use crate::commands::Command;

#[derive(Parser, Debug)]
#[command(name = "storyfeed", about = "A small social feed server and terminal feed client")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mentor: MentorConfig,
    pub client: ClientConfig,

    #[serde(skip)]
    pub data_dir: PathBuf,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Longest accepted token lifetime, about a century.
pub const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365 * 100;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for bearer tokens. A random per-process secret is used when unset.
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: u64,
    pub bcrypt_cost: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MentorConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the API the feed client talks to, including the `/api` prefix.
    pub api_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://localhost:8080".to_string(),
            ],
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: 24 * 7,
            bcrypt_cost: 12,
        }
    }
}

impl Default for MentorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-3-flash-preview".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001/api".to_string(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        Self::load_with_env(cli, |key| std::env::var(key).ok())
    }

    pub fn load_with_env<F>(cli: &Cli, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config: Config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };
        if config.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            anyhow::bail!(
                "auth.token_ttl_hours must be at most {} (got {})",
                MAX_TOKEN_TTL_HOURS,
                config.auth.token_ttl_hours
            );
        }
        config.data_dir = data_dir;

        config.apply_env(lookup)?;

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        Ok(config)
    }

    /// Environment overrides sit between the config file and the CLI flags.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse()?;
        }
        if let Some(secret) = lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(hours) = lookup("JWT_EXPIRE_HOURS") {
            let hours: u64 = hours.parse()?;
            if hours > MAX_TOKEN_TTL_HOURS {
                anyhow::bail!(
                    "JWT_EXPIRE_HOURS must be at most {} (got {})",
                    MAX_TOKEN_TTL_HOURS,
                    hours
                );
            }
            self.auth.token_ttl_hours = hours;
        }
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|s| !s.is_empty()) {
            self.mentor.api_key = Some(key);
        }
        if let Some(url) = lookup("STORYFEED_API_URL") {
            self.client.api_url = url;
        }
        Ok(())
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".storyfeed")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("storyfeed.db"))
    }

    pub fn filter_cache_path(&self) -> PathBuf {
        self.data_dir.join("feed_filters.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn cli_for(data_dir: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir,
            command: None,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.cors_origins.len(), 3);
        assert_eq!(config.auth.token_ttl_hours, 168);
        assert_eq!(config.auth.bcrypt_cost, 12);
        assert!(config.auth.jwt_secret.is_none());
        assert!(config.mentor.api_key.is_none());
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_for(Some(PathBuf::from("/tmp/test-storyfeed")));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-storyfeed"));
    }

    #[test]
    fn data_dir_defaults_to_dot_storyfeed() {
        let dir = Config::data_dir(&cli_for(None));
        assert!(dir.ends_with(".storyfeed"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = cli_for(Some(tmp.path().to_path_buf()));
        let config = Config::load_with_env(&cli, no_env).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.db_path(), tmp.path().join("storyfeed.db"));
        assert_eq!(
            config.filter_cache_path(),
            tmp.path().join("feed_filters.json")
        );
    }

    #[test]
    fn load_applies_cli_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cli = cli_for(Some(tmp.path().to_path_buf()));
        cli.host = Some("127.0.0.1".to_string());
        cli.port = Some(8080);
        let config = Config::load_with_env(&cli, no_env).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[database]
path = "/var/lib/storyfeed/feed.db"

[auth]
token_ttl_hours = 24
bcrypt_cost = 10

[mentor]
model = "gemini-pro"
"#,
        )
        .unwrap();

        let mut cli = cli_for(Some(tmp.path().to_path_buf()));
        cli.config = Some(config_path);
        let config = Config::load_with_env(&cli, no_env).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.db_path(),
            PathBuf::from("/var/lib/storyfeed/feed.db")
        );
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert_eq!(config.mentor.model, "gemini-pro");
        // untouched sections keep their defaults
        assert_eq!(config.mentor.timeout_secs, 30);
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "4100"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRE_HOURS", "1"),
            ("GEMINI_API_KEY", "key-123"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.token_ttl_hours, 1);
        assert_eq!(config.mentor.api_key.as_deref(), Some("key-123"));
    }

    #[test]
    fn empty_env_secret_is_ignored() {
        let mut config = Config::default();
        config
            .apply_env(|k| (k == "JWT_SECRET").then(String::new))
            .unwrap();
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn bad_env_port_is_an_error() {
        let mut config = Config::default();
        let result = config.apply_env(|k| (k == "PORT").then(|| "not-a-port".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn huge_env_token_ttl_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_env(|k| {
            (k == "JWT_EXPIRE_HOURS").then(|| "9223372036854775807".to_string())
        });
        assert!(result.is_err());
        assert_eq!(config.auth.token_ttl_hours, 168);

        config
            .apply_env(|k| (k == "JWT_EXPIRE_HOURS").then(|| MAX_TOKEN_TTL_HOURS.to_string()))
            .unwrap();
        assert_eq!(config.auth.token_ttl_hours, MAX_TOKEN_TTL_HOURS);
    }

    #[test]
    fn huge_file_token_ttl_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[auth]\ntoken_ttl_hours = 9000000000000\n").unwrap();

        let mut cli = cli_for(Some(tmp.path().to_path_buf()));
        cli.config = Some(config_path);
        assert!(Config::load_with_env(&cli, no_env).is_err());
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
"#,
        )
        .unwrap();

        let mut cli = cli_for(Some(tmp.path().to_path_buf()));
        cli.config = Some(config_path);
        cli.host = Some("10.0.0.1".to_string());
        cli.port = Some(4000);
        let config = Config::load_with_env(&cli, no_env).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }
}
