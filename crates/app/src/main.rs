use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::config::Config;
use app::extract::PdfTextExtractor;
use app::{AppState, router};
use services::{AppServices, Clock};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPort { raw: String },
    InvalidHost { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPort { raw } => write!(f, "invalid --port value: {raw}"),
            ArgsError::InvalidHost { raw } => write!(f, "invalid --host value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz-server [--db <sqlite_url>] [--host <ip>] [--port <port>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://quiz.sqlite3");
    eprintln!("  --host 127.0.0.1");
    eprintln!("  --port 8000");
    eprintln!();
    eprintln!("Environment (flags win):");
    eprintln!("  DATABASE_URL, DATABASE_MAX_CONNECTIONS, SERVER_HOST, SERVER_PORT,");
    eprintln!("  UPLOAD_LIMIT_BYTES, UPLOAD_DIR, RUST_LOG");
}

/// Apply command line overrides on top of the environment config.
fn apply_args(
    config: &mut Config,
    args: &mut impl Iterator<Item = String>,
) -> Result<(), ArgsError> {
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let value = require_value(args, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                config.database.url = value;
            }
            "--port" => {
                let value = require_value(args, "--port")?;
                config.server.port = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidPort { raw: value.clone() })?;
            }
            "--host" => {
                let value = require_value(args, "--host")?;
                config.server.host = value
                    .parse::<IpAddr>()
                    .map_err(|_| ArgsError::InvalidHost { raw: value.clone() })?;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(())
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("create {}", path.display()))?;
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=debug,services=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to listen for ctrl-c");
    }
    tracing::info!("shutting down");
}

async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let mut config = Config::from_env()?;
    let mut args = std::env::args().skip(1);
    apply_args(&mut config, &mut args).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    config.database.url = normalize_sqlite_url(config.database.url);

    // Open + migrate SQLite at startup.
    prepare_sqlite_file(&config.database.url)?;
    let services = AppServices::new_sqlite_with_pool_size(
        &config.database.url,
        Clock::default(),
        config.database.max_connections,
    )
    .await
    .context("Failed to open database")?;

    let state = AppState::new(services, Arc::new(PdfTextExtractor), config.upload.clone());
    let app = router(state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, db = %config.database.url, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>().into_iter()
    }

    fn base() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    #[test]
    fn flags_override_config() {
        let mut config = base();
        apply_args(
            &mut config,
            &mut args(&["--db", "sqlite::memory:", "--port", "9000", "--host", "0.0.0.0"]),
        )
        .unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.server_addr().to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn bad_flags_are_reported() {
        let mut config = base();
        assert!(matches!(
            apply_args(&mut config, &mut args(&["--port"])),
            Err(ArgsError::MissingValue { flag: "--port" })
        ));
        assert!(matches!(
            apply_args(&mut config, &mut args(&["--port", "x"])),
            Err(ArgsError::InvalidPort { .. })
        ));
        assert!(matches!(
            apply_args(&mut config, &mut args(&["--verbose"])),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:/tmp/q.db".into()),
            "sqlite:///tmp/q.db"
        );
    }
}
