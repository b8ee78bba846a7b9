use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DbConn, DbErr};

use super::schema;

/// Configuration for the blog database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub log_statements: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            log_statements: false,
        }
    }

    /// A private in-memory SQLite database, used by tests and as the
    /// fallback when no database is configured.
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// The blog's database connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConnections {
    pub main: DbConn,
}

impl DatabaseConnections {
    /// Connect and make sure every table exists.
    pub async fn init(config: &DatabaseConfig) -> Result<Self, DbErr> {
        tracing::info!("Initializing database connection...");

        // Each in-memory SQLite connection is a separate database, so the
        // pool must hold exactly one and never let it go idle.
        let (max, min) = if config.is_in_memory() {
            (1, 1)
        } else {
            (config.max_connections, config.min_connections)
        };

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(max)
            .min_connections(min)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(config.log_statements);
        if !config.is_in_memory() {
            opts.idle_timeout(Duration::from_secs(300));
        }

        let main = Database::connect(opts).await?;
        tracing::info!(pool = max, "Database connected");

        schema::create_tables(&main).await?;

        Ok(Self { main })
    }
}
