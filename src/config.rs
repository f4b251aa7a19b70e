use std::env;
use std::path::PathBuf;

/// Upper bound for one page of audit history when not configured.
pub const DEFAULT_HISTORY_LIMIT: i64 = 200;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub migrations_path: PathBuf,
    /// Largest `limit` accepted by the history endpoint.
    pub history_limit: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: env::var("PROVISIONS_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PROVISIONS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(7070),
            database_path: env::var("PROVISIONS_DATABASE_URL")
                .map(|v| {
                    PathBuf::from(
                        v.strip_prefix("sqlite://")
                            .or_else(|| v.strip_prefix("sqlite:"))
                            .unwrap_or(&v),
                    )
                })
                .unwrap_or_else(|_| PathBuf::from("data/provisions.db")),
            migrations_path: env::var("PROVISIONS_MIGRATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("migrations")),
            history_limit: env::var("PROVISIONS_HISTORY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v > 0)
                .unwrap_or(DEFAULT_HISTORY_LIMIT),
        }
    }

    /// Settings for an in-memory database, used by tests and tooling.
    pub fn in_memory() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7070,
            database_path: PathBuf::from(":memory:"),
            migrations_path: PathBuf::from("migrations"),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
