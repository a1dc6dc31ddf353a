use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Default upload cap, matching the 10 MiB PDF limit.
pub const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://quiz.sqlite3";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub limit_bytes: usize,
    /// Where uploaded PDFs are kept; `None` keeps only the extracted text.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upload: UploadConfig,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns `None` for unset keys.
    ///
    /// # Errors
    ///
    /// Fails when a value is present but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("SERVER_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse SERVER_HOST")?;

        let port = lookup("SERVER_PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse SERVER_PORT")?;

        let db_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(val) => val
                .parse()
                .context("Failed to parse DATABASE_MAX_CONNECTIONS")?,
            None => storage::sqlite::DEFAULT_MAX_CONNECTIONS,
        };

        let limit_bytes = match lookup("UPLOAD_LIMIT_BYTES") {
            Some(val) => val.parse().context("Failed to parse UPLOAD_LIMIT_BYTES")?,
            None => DEFAULT_UPLOAD_LIMIT_BYTES,
        };
        let dir = lookup("UPLOAD_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Config {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: db_url,
                max_connections,
            },
            upload: UploadConfig { limit_bytes, dir },
        })
    }

    #[must_use]
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.upload.limit_bytes, DEFAULT_UPLOAD_LIMIT_BYTES);
        assert!(config.upload.dir.is_none());
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("SERVER_HOST", "0.0.0.0"),
            ("SERVER_PORT", "9090"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("DATABASE_MAX_CONNECTIONS", "2"),
            ("UPLOAD_LIMIT_BYTES", "1024"),
            ("UPLOAD_DIR", "uploads"),
        ]))
        .unwrap();
        assert_eq!(config.server_addr().to_string(), "0.0.0.0:9090");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.upload.limit_bytes, 1024);
        assert_eq!(config.upload.dir, Some(PathBuf::from("uploads")));
    }

    #[test]
    fn bad_port_is_reported() {
        let err = Config::from_lookup(lookup_from(&[("SERVER_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }
}
