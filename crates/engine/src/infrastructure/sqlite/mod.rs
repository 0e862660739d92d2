//! SQLite-backed storage for traits, relationships and the evolution queue.
//!
//! One pool is shared by the three repositories; [`SqliteStore::connect`]
//! creates the schema on first use.

mod evolutions;
mod relationships;
mod traits;

pub use evolutions::SqliteEvolutionRepo;
pub use relationships::SqliteRelationshipRepo;
pub use traits::SqliteTraitRepo;

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use taleweaver_domain::common::parse_datetime;
use taleweaver_domain::{EntityRef, EntityType};

use crate::infrastructure::ports::{ClockPort, RepoError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS entity_traits (
        id TEXT PRIMARY KEY,
        game_id TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        trait TEXT NOT NULL,
        acquired_turn INTEGER NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_entity_traits_entity
        ON entity_traits (game_id, entity_type, entity_id, status)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS relationships (
        id TEXT PRIMARY KEY,
        game_id TEXT NOT NULL,
        from_type TEXT NOT NULL,
        from_id TEXT NOT NULL,
        to_type TEXT NOT NULL,
        to_id TEXT NOT NULL,
        trust REAL NOT NULL,
        respect REAL NOT NULL,
        affection REAL NOT NULL,
        fear REAL NOT NULL,
        resentment REAL NOT NULL,
        debt REAL NOT NULL,
        updated_turn INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (game_id, from_type, from_id, to_type, to_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pending_evolutions (
        id TEXT PRIMARY KEY,
        game_id TEXT NOT NULL,
        turn INTEGER NOT NULL,
        entity_type TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        evolution_type TEXT NOT NULL,
        trait TEXT,
        target_type TEXT,
        target_id TEXT,
        dimension TEXT,
        old_value REAL,
        new_value REAL,
        reason TEXT NOT NULL,
        source_event_id TEXT,
        status TEXT NOT NULL,
        dm_notes TEXT,
        created_at TEXT NOT NULL,
        resolved_at TEXT
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_pending_evolutions_game
        ON pending_evolutions (game_id, status, created_at)
    "#,
];

/// Shared connection pool plus the clock used to stamp rows.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteStore {
    pub async fn connect(db_path: &str, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| RepoError::database("connect", e))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| RepoError::database("migrate", e))?;
        }

        tracing::info!(path = %db_path, "SQLite store ready");
        Ok(Self { pool, clock })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn traits(&self) -> SqliteTraitRepo {
        SqliteTraitRepo::new(self.clone())
    }

    pub fn relationships(&self) -> SqliteRelationshipRepo {
        SqliteRelationshipRepo::new(self.clone())
    }

    pub fn evolutions(&self) -> SqliteEvolutionRepo {
        SqliteEvolutionRepo::new(self.clone())
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

// =============================================================================
// Row decoding helpers
// =============================================================================

/// Fixed-width RFC3339 so text ordering matches time ordering.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn column<'r, T>(row: &'r SqliteRow, name: &'static str) -> Result<T, RepoError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RepoError::database("decode_row", e))
}

fn parse_column<T>(row: &SqliteRow, name: &'static str) -> Result<T, RepoError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = column(row, name)?;
    raw.parse()
        .map_err(|e| RepoError::serialization(format!("{}: {}", name, e)))
}

fn timestamp_column(row: &SqliteRow, name: &'static str) -> Result<DateTime<Utc>, RepoError> {
    let raw: String = column(row, name)?;
    parse_datetime(&raw).map_err(|e| RepoError::serialization(format!("{}: {}", name, e)))
}

fn entity_columns(
    row: &SqliteRow,
    type_column: &'static str,
    id_column: &'static str,
) -> Result<EntityRef, RepoError> {
    let entity_type: EntityType = parse_column(row, type_column)?;
    let entity_id: String = column(row, id_column)?;
    Ok(EntityRef::new(entity_type, entity_id))
}
