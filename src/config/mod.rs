//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::{CacheBackendKind, DEFAULT_LISTING_PREFIX};

mod cli;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "tasklane";
const ENV_PREFIX: &str = "TASKLANE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
pub(crate) const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub(crate) const DEFAULT_CACHE_MEMORY_CAPACITY: usize = 1024;
pub(crate) const DEFAULT_CACHE_OPERATION_TIMEOUT_MS: u64 = 250;
pub(crate) const DEFAULT_CACHE_INVALIDATION_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    /// Requests still running after this are answered with 408.
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    pub ttl_seconds: NonZeroU64,
    pub redis_url: Option<String>,
    pub memory_capacity: NonZeroUsize,
    pub operation_timeout_ms: NonZeroU64,
    pub invalidation_timeout_ms: NonZeroU64,
    pub key_prefix: String,
    pub hash_keys: bool,
}

#[derive(Debug, Clone)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub path: String,
    /// Dedicated listener for the endpoint; `None` serves it on the API listener.
    pub addr: Option<SocketAddr>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    metrics: RawMetricsSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.server_request_timeout_seconds {
            self.server.request_timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(run) = overrides.database_run_migrations {
            self.database.run_migrations = Some(run);
        }
        if let Some(backend) = overrides.cache_backend {
            self.cache.backend = Some(backend);
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(url) = overrides.cache_redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
        if let Some(capacity) = overrides.cache_memory_capacity {
            self.cache.memory_capacity = Some(capacity);
        }
        if let Some(enabled) = overrides.metrics_enabled {
            self.metrics.enabled = Some(enabled);
        }
        if let Some(port) = overrides.metrics_port {
            self.metrics.port = Some(port);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            metrics,
        } = raw;

        let server = build_server_settings(server)?;
        let metrics = build_metrics_settings(metrics, &server)?;
        Ok(Self {
            server,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            metrics,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    let graceful_shutdown = Duration::from_secs(
        non_zero_u64(graceful_secs, "server.graceful_shutdown_seconds")?.get(),
    );

    let request_timeout_secs = server
        .request_timeout_seconds
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    let request_timeout = Duration::from_secs(
        non_zero_u64(request_timeout_secs, "server.request_timeout_seconds")?.get(),
    );

    Ok(ServerSettings {
        addr,
        graceful_shutdown,
        request_timeout,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
        run_migrations: database.run_migrations.unwrap_or(true),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = cache.backend.unwrap_or(CacheBackendKind::Memory);
    let redis_url = non_blank(cache.redis_url);
    if backend == CacheBackendKind::Redis && redis_url.is_none() {
        return Err(LoadError::invalid(
            "cache.redis_url",
            "required when cache.backend is `redis`",
        ));
    }

    let ttl_seconds = non_zero_u64(
        cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS),
        "cache.ttl_seconds",
    )?;
    let operation_timeout_ms = non_zero_u64(
        cache
            .operation_timeout_ms
            .unwrap_or(DEFAULT_CACHE_OPERATION_TIMEOUT_MS),
        "cache.operation_timeout_ms",
    )?;
    let invalidation_timeout_ms = non_zero_u64(
        cache
            .invalidation_timeout_ms
            .unwrap_or(DEFAULT_CACHE_INVALIDATION_TIMEOUT_MS),
        "cache.invalidation_timeout_ms",
    )?;
    let memory_capacity = NonZeroUsize::new(
        cache
            .memory_capacity
            .unwrap_or(DEFAULT_CACHE_MEMORY_CAPACITY),
    )
    .ok_or_else(|| LoadError::invalid("cache.memory_capacity", "must be greater than zero"))?;

    let key_prefix = cache
        .key_prefix
        .unwrap_or_else(|| DEFAULT_LISTING_PREFIX.to_string());
    if key_prefix.trim().is_empty() {
        return Err(LoadError::invalid(
            "cache.key_prefix",
            "prefix must not be empty",
        ));
    }

    Ok(CacheSettings {
        backend,
        ttl_seconds,
        redis_url,
        memory_capacity,
        operation_timeout_ms,
        invalidation_timeout_ms,
        key_prefix,
        hash_keys: cache.hash_keys.unwrap_or(false),
    })
}

fn build_metrics_settings(
    metrics: RawMetricsSettings,
    server: &ServerSettings,
) -> Result<MetricsSettings, LoadError> {
    let path = metrics
        .path
        .unwrap_or_else(|| DEFAULT_METRICS_PATH.to_string());
    if !path.starts_with('/') || path.len() < 2 {
        return Err(LoadError::invalid(
            "metrics.path",
            format!("`{path}` must start with `/` and name a route"),
        ));
    }

    let addr = match metrics.port {
        None => None,
        Some(0) => {
            return Err(LoadError::invalid(
                "metrics.port",
                "port must be greater than zero",
            ));
        }
        Some(port) if port == server.addr.port() => {
            return Err(LoadError::invalid(
                "metrics.port",
                "must differ from server.port",
            ));
        }
        Some(port) => Some(SocketAddr::new(server.addr.ip(), port)),
    };

    Ok(MetricsSettings {
        enabled: metrics.enabled.unwrap_or(true),
        path,
        addr,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    run_migrations: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<CacheBackendKind>,
    ttl_seconds: Option<u64>,
    redis_url: Option<String>,
    memory_capacity: Option<usize>,
    operation_timeout_ms: Option<u64>,
    invalidation_timeout_ms: Option<u64>,
    key_prefix: Option<String>,
    hash_keys: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMetricsSettings {
    enabled: Option<bool>,
    path: Option<String>,
    port: Option<u16>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_u64(value: u64, key: &'static str) -> Result<NonZeroU64, LoadError> {
    NonZeroU64::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
