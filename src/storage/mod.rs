pub mod repository;

use std::path::{Path, PathBuf};

use rusqlite_migration::{Migrations, M};

use crate::error::{Error, Result};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;\
                       PRAGMA foreign_keys=ON;\
                       PRAGMA busy_timeout=5000;";

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!("migrations/001_initial.sql"))])
}

/// The CRM store: one connection for writes and one for reads over the same
/// SQLite file. `tokio_rusqlite` runs each connection on its own thread, so
/// reports never queue behind an import.
#[derive(Clone)]
pub struct Database {
    writer: tokio_rusqlite::Connection,
    reader: tokio_rusqlite::Connection,
}

impl Database {
    /// `~/.crmdash/crmdash.db`, creating the directory if needed.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("no home directory for the default store".into()))?;
        Ok(home.join(".crmdash").join("crmdash.db"))
    }

    pub async fn open() -> Result<Self> {
        let path = Self::default_path()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        Self::open_at(path).await
    }

    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("opening store at {}", path.display());

        let writer = tokio_rusqlite::Connection::open(path).await?;
        Self::migrate(&writer).await?;
        let reader = tokio_rusqlite::Connection::open(path).await?;
        Self::configure(&reader).await?;
        Ok(Self { writer, reader })
    }

    /// A private in-memory store. Reads go through the writer connection,
    /// since a second in-memory connection would see an empty database.
    pub async fn open_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::migrate(&conn).await?;
        Ok(Self {
            reader: conn.clone(),
            writer: conn,
        })
    }

    async fn migrate(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| -> Result<()> {
            conn.execute_batch(PRAGMAS)?;
            migrations().to_latest(conn)?;
            Ok(())
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(inner) => inner,
            other => Error::Database(other.to_string()),
        })
    }

    async fn configure(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| conn.execute_batch(PRAGMAS)).await?;
        Ok(())
    }

    pub fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.writer
    }

    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        &self.reader
    }
}
