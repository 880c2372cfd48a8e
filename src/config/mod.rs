use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::apply_security_headers;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_STATIC_DIR: &str = "public";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    /// Postgres connection string. Without one, records live in memory.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub static_dir: PathBuf,
    /// Send `Strict-Transport-Security`; enabled when `RUST_ENV=production`.
    pub include_hsts: bool,
    /// Comma-separated origin list; any origin is allowed when unset.
    pub cors_allowed_origins: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            include_hsts: false,
            cors_allowed_origins: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let include_hsts = lookup("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);
        if include_hsts {
            tracing::info!("Security: HSTS header enabled (production mode)");
        } else {
            tracing::info!("Security: HSTS header disabled (development mode)");
        }

        Self {
            port: parse_or("PORT", non_empty("PORT"), defaults.port),
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                non_empty("DATABASE_MAX_CONNECTIONS"),
                defaults.database_max_connections,
            ),
            static_dir: non_empty("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            include_hsts,
            cors_allowed_origins: non_empty("CORS_ALLOWED_ORIGINS"),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Config: ignoring invalid {}='{}'", key, raw);
            default
        }),
        None => default,
    }
}
