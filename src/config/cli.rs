use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::cache::CacheBackendKind;

/// Command-line arguments for the tasklane binary.
#[derive(Debug, Parser)]
#[command(name = "tasklane", version, about = "Task management HTTP service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TASKLANE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the per-request timeout.
    #[arg(long = "server-request-timeout-seconds", value_name = "SECONDS")]
    pub server_request_timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Toggle applying bundled migrations at startup.
    #[arg(
        long = "database-run-migrations",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub database_run_migrations: Option<bool>,

    /// Select the listing cache backend (memory|redis|disabled).
    #[arg(long = "cache-backend", value_name = "BACKEND", value_parser = parse_backend)]
    pub cache_backend: Option<CacheBackendKind>,

    /// Override the listing cache TTL.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the Redis connection URL.
    #[arg(long = "cache-redis-url", value_name = "URL")]
    pub cache_redis_url: Option<String>,

    /// Override the in-process cache capacity.
    #[arg(long = "cache-memory-capacity", value_name = "ENTRIES")]
    pub cache_memory_capacity: Option<usize>,

    /// Toggle the Prometheus endpoint.
    #[arg(
        long = "metrics-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub metrics_enabled: Option<bool>,

    /// Serve the Prometheus endpoint on its own port.
    #[arg(long = "metrics-port", value_name = "PORT")]
    pub metrics_port: Option<u16>,
}

fn parse_backend(value: &str) -> Result<CacheBackendKind, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(CacheBackendKind::Memory),
        "redis" => Ok(CacheBackendKind::Redis),
        "disabled" | "none" | "off" => Ok(CacheBackendKind::Disabled),
        other => Err(format!(
            "unknown cache backend `{other}` (expected memory, redis or disabled)"
        )),
    }
}
