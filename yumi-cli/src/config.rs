//! Configuration for the yumi binary
//!
//! Precedence, highest first: command-line flag, environment variable,
//! `~/.yumi/config.toml`, built-in default. `.env` files are loaded into the
//! environment before anything is resolved.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use yumi_server::db::pool::DEFAULT_MAX_CONNECTIONS;
use yumi_server::media::CloudinaryConfig;
use yumi_server::ServerConfig;

/// Contents of `~/.yumi/config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub bind: Option<SocketAddr>,
    pub identity_url: Option<String>,
    pub max_connections: Option<u32>,
    pub cloudinary: Option<CloudinarySection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudinarySection {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl FileConfig {
    /// Load `~/.yumi/config.toml`, or defaults when it does not exist.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file (invalid TOML): {}", path.display()))
    }

    fn cloudinary(&self) -> Option<CloudinaryConfig> {
        let section = self.cloudinary.as_ref()?;
        let filled = |v: &str| !v.trim().is_empty();
        (filled(&section.cloud_name) && filled(&section.api_key) && filled(&section.api_secret))
            .then(|| CloudinaryConfig {
                cloud_name: section.cloud_name.clone(),
                api_key: section.api_key.clone(),
                api_secret: section.api_secret.clone(),
            })
    }
}

/// The yumi config directory (`~/.yumi`)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".yumi"))
}

/// `~/.yumi/config.toml`
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Load `./.env`, then `~/.yumi/.env`. Variables already set win.
///
/// Runs before tracing is initialized, so the loaded paths are returned for
/// the caller to log.
pub fn load_dotenv() -> Vec<PathBuf> {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(path);
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() && dotenvy::from_path(&env_file).is_ok() {
            loaded_from.push(env_file);
        }
    }

    loaded_from
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Database URL from the flag or `DATABASE_URL` (clap merges both), then the
/// config file.
pub fn database_url(flag: Option<String>, file: &FileConfig) -> Result<String> {
    flag.filter(|v| !v.trim().is_empty())
        .or_else(|| file.database_url.clone())
        .context("DATABASE_URL not set. Set via --database-url, DATABASE_URL env, ~/.yumi/.env or ~/.yumi/config.toml")
}

/// Pool size from `YUMI_MAX_CONNECTIONS`, then the config file.
pub fn max_connections(file: &FileConfig) -> Result<u32> {
    match env_var("YUMI_MAX_CONNECTIONS") {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("YUMI_MAX_CONNECTIONS is not a number: {raw}")),
        None => Ok(file.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)),
    }
}

/// Everything `serve` needs once flags, environment and file are merged
#[derive(Debug, Clone)]
pub struct ServeSettings {
    pub database_url: String,
    pub max_connections: u32,
    pub bind: SocketAddr,
    pub cors_permissive: bool,
    pub identity_url: Option<String>,
    pub cloudinary: Option<CloudinaryConfig>,
}

impl ServeSettings {
    pub fn resolve(
        database_url_flag: Option<String>,
        bind_flag: Option<SocketAddr>,
        cors_permissive: bool,
        file: &FileConfig,
    ) -> Result<Self> {
        Ok(Self {
            database_url: database_url(database_url_flag, file)?,
            max_connections: max_connections(file)?,
            bind: bind_flag
                .or(file.bind)
                .unwrap_or_else(|| ServerConfig::default().bind_addr),
            cors_permissive,
            identity_url: env_var("YUMI_IDENTITY_URL").or_else(|| file.identity_url.clone()),
            cloudinary: CloudinaryConfig::from_env().or_else(|| file.cloudinary()),
        })
    }
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show config file path
    Path,
    /// Print the config file contents (secrets masked)
    Show,
}

pub fn run_config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Path => {
            let path = config_path().context("Could not determine home directory")?;
            println!("{}", path.display());
        }
        ConfigCommands::Show => {
            let mut config = FileConfig::load()?;
            if let Some(section) = config.cloudinary.as_mut() {
                section.api_secret = "********".into();
            }
            if config.database_url.is_some() {
                config.database_url = Some("********".into());
            }
            let rendered =
                toml::to_string_pretty(&config).context("Failed to serialize config")?;
            print!("{rendered}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_url = "postgres://localhost/yumi"
bind = "0.0.0.0:8080"
identity_url = "https://id.example.com/userinfo"
max_connections = 12

[cloudinary]
cloud_name = "demo"
api_key = "123"
api_secret = "shh"
"#
        )
        .unwrap();

        let config = FileConfig::load_from(file.path()).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/yumi"));
        assert_eq!(config.bind, Some("0.0.0.0:8080".parse().unwrap()));
        assert_eq!(config.max_connections, Some(12));
        assert_eq!(config.cloudinary().unwrap().cloud_name, "demo");
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(FileConfig::load_from(file.path()).unwrap(), FileConfig::default());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = [").unwrap();
        assert!(FileConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn flag_beats_file_for_database_url() {
        let file = FileConfig {
            database_url: Some("postgres://file/yumi".into()),
            ..Default::default()
        };
        assert_eq!(
            database_url(Some("postgres://flag/yumi".into()), &file).unwrap(),
            "postgres://flag/yumi"
        );
        assert_eq!(database_url(None, &file).unwrap(), "postgres://file/yumi");
        assert!(database_url(None, &FileConfig::default()).is_err());
    }

    #[test]
    fn incomplete_cloudinary_section_is_ignored() {
        let file = FileConfig {
            cloudinary: Some(CloudinarySection {
                cloud_name: "demo".into(),
                api_key: "123".into(),
                api_secret: " ".into(),
            }),
            ..Default::default()
        };
        assert!(file.cloudinary().is_none());
    }
}
