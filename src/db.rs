use crate::config::Config;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sqlite::SqliteConnection;

pub type DbConnection = SqliteConnection;
pub type Pool = r2d2::Pool<ConnectionManager<DbConnection>>;
pub use diesel::r2d2::PoolError;

pub const MEMORY_DATABASE_URL: &str = ":memory:";

/// Idempotent schema bootstrap, executed on every new pooled connection.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS taxonomy_nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    parent_id INTEGER REFERENCES taxonomy_nodes (id),
    path TEXT NOT NULL,
    level INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    color TEXT,
    icon TEXT,
    description TEXT,
    created_at TIMESTAMP NOT NULL,
    updated_at TIMESTAMP NOT NULL,
    UNIQUE (kind, slug)
);
CREATE INDEX IF NOT EXISTS idx_taxonomy_nodes_parent ON taxonomy_nodes (kind, parent_id);
CREATE INDEX IF NOT EXISTS idx_taxonomy_nodes_path ON taxonomy_nodes (kind, path);
CREATE TABLE IF NOT EXISTS taxonomy_assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    node_id INTEGER NOT NULL REFERENCES taxonomy_nodes (id),
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (node_id, entity_type, entity_id)
);
"#;

#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions {
    pub busy_timeout_ms: u32,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
        }
    }
}

impl CustomizeConnection<DbConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut DbConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        ))
        .map_err(r2d2::Error::QueryError)?;
        conn.batch_execute(SCHEMA_SQL)
            .map_err(r2d2::Error::QueryError)
    }
}

pub fn is_memory_url(database_url: &str) -> bool {
    database_url == MEMORY_DATABASE_URL || database_url.starts_with("file::memory:")
}

pub fn establish_pool(config: &Config) -> Result<Pool, PoolError> {
    build_pool(&config.database_url, config.pool_size)
}

/// Each `:memory:` connection is a separate database, so memory pools hold a
/// single connection that never expires.
pub fn build_pool(database_url: &str, pool_size: u32) -> Result<Pool, PoolError> {
    let manager = ConnectionManager::<DbConnection>::new(database_url);
    let builder = r2d2::Pool::builder().connection_customizer(Box::new(ConnectionOptions::default()));

    if is_memory_url(database_url) {
        builder
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
    } else {
        builder.max_size(pool_size).build(manager)
    }
}

pub fn establish_memory_pool() -> Result<Pool, PoolError> {
    build_pool(MEMORY_DATABASE_URL, 1)
}
