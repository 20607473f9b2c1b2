pub mod api;
pub mod config;
pub mod db;

pub use db::DbPool;

use config::Config;

/// Shared request context: immutable configuration plus the connection pool.
pub struct AppState {
    pub config: Config,
    pub db: DbPool,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        Self { config, db }
    }
}
