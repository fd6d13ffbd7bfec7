//! Server configuration.
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `SCAN_RELAY_*` environment variables (a `.env` file is honoured).
//! Command-line flags are applied last by the binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "scan-relay.toml";

const ENV_PREFIX: &str = "SCAN_RELAY_";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interface to bind
    pub host: IpAddr,

    /// Listening port
    pub port: u16,

    /// Root directory for uploaded photos
    pub uploads_dir: PathBuf,

    /// Request body ceiling for uploads, in bytes
    pub max_upload_bytes: usize,

    /// Directory with the desktop and mobile pages, served at `/`
    pub static_dir: Option<PathBuf>,

    /// Base url phones should use; defaults to `http://<lan-ip>:<port>/`
    pub public_url: Option<Url>,

    /// Write a daily rolling log file here in addition to stderr
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            uploads_dir: PathBuf::from("uploads"),
            max_upload_bytes: 16 * 1024 * 1024,
            static_dir: None,
            public_url: None,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load defaults, the config file and the environment.
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Override fields from variables looked up through `var`
    /// (keys without the `SCAN_RELAY_` prefix).
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("HOST") {
            self.host = host
                .parse()
                .with_context(|| format!("{ENV_PREFIX}HOST: invalid address {host:?}"))?;
        }
        if let Some(port) = var("PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("{ENV_PREFIX}PORT: invalid port {port:?}"))?;
        }
        if let Some(dir) = var("UPLOADS_DIR") {
            self.uploads_dir = dir.into();
        }
        if let Some(limit) = var("MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = limit
                .parse()
                .with_context(|| format!("{ENV_PREFIX}MAX_UPLOAD_BYTES: invalid size {limit:?}"))?;
        }
        if let Some(dir) = var("STATIC_DIR") {
            self.static_dir = Some(dir.into());
        }
        if let Some(url) = var("PUBLIC_URL") {
            self.public_url = Some(
                Url::parse(&url)
                    .with_context(|| format!("{ENV_PREFIX}PUBLIC_URL: invalid url {url:?}"))?,
            );
        }
        if let Some(dir) = var("LOG_DIR") {
            self.log_dir = Some(dir.into());
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Base url handed to phones, derived from the LAN address when not
    /// configured.
    pub fn mobile_base_url(&self, local_ip: &str) -> Result<Url> {
        match &self.public_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(&format!("http://{}:{}/", local_ip, self.port))
                .with_context(|| format!("cannot build base url from {local_ip:?}")),
        }
    }
}
