use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const LISTEN_ADDR_ENV: &str = "MARQUEE_GATEWAY_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "MARQUEE_GATEWAY_STORAGE_BACKEND";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const MAX_CONNECTIONS_ENV: &str = "MARQUEE_GATEWAY_MAX_CONNECTIONS";
pub const MIGRATE_ENV: &str = "MARQUEE_GATEWAY_MIGRATE";
pub const FIXTURES_ENV: &str = "MARQUEE_GATEWAY_FIXTURES";
pub const REQUEST_TIMEOUT_MS_ENV: &str = "MARQUEE_GATEWAY_REQUEST_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "MARQUEE_GATEWAY_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "postgres")]
    Postgres,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "marquee-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = DATABASE_URL_ENV, required_if_eq("storage", "postgres"))]
    pub database_url: Option<String>,

    #[arg(long, env = MAX_CONNECTIONS_ENV, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    /// Apply the embedded schema migrations before serving.
    #[arg(long, env = MIGRATE_ENV)]
    pub migrate: bool,

    /// JSON array of movie records loaded into the in-memory store.
    #[arg(long, env = FIXTURES_ENV)]
    pub fixtures: Option<PathBuf>,

    #[arg(long, env = REQUEST_TIMEOUT_MS_ENV, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}
