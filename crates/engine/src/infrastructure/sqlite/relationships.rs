//! SQLite relationship repository.
//!
//! One row per ordered `(from, to)` pair; absent rows read as defaults.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use taleweaver_domain::{DimensionUpdate, DimensionValues, EntityRef, GameId, Relationship};

use super::{column, entity_columns, format_timestamp, parse_column, timestamp_column, SqliteStore};
use crate::infrastructure::ports::{RelationshipRepo, RepoError};

pub struct SqliteRelationshipRepo {
    store: SqliteStore,
}

impl SqliteRelationshipRepo {
    pub(super) fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    async fn find(
        &self,
        game_id: GameId,
        from: &EntityRef,
        to: &EntityRef,
    ) -> Result<Option<Relationship>, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM relationships
            WHERE game_id = ? AND from_type = ? AND from_id = ? AND to_type = ? AND to_id = ?
            "#,
        )
        .bind(game_id.to_string())
        .bind(from.entity_type.as_str())
        .bind(&from.entity_id)
        .bind(to.entity_type.as_str())
        .bind(&to.entity_id)
        .fetch_optional(self.store.pool())
        .await
        .map_err(|e| RepoError::database("get_relationship", e))?;

        row.as_ref().map(row_to_relationship).transpose()
    }
}

fn row_to_relationship(row: &SqliteRow) -> Result<Relationship, RepoError> {
    let updated_turn: i64 = column(row, "updated_turn")?;
    Ok(Relationship {
        id: parse_column(row, "id")?,
        game_id: parse_column(row, "game_id")?,
        from: entity_columns(row, "from_type", "from_id")?,
        to: entity_columns(row, "to_type", "to_id")?,
        values: DimensionValues {
            trust: column(row, "trust")?,
            respect: column(row, "respect")?,
            affection: column(row, "affection")?,
            fear: column(row, "fear")?,
            resentment: column(row, "resentment")?,
            debt: column(row, "debt")?,
        },
        updated_turn: updated_turn as u32,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

#[async_trait]
impl RelationshipRepo for SqliteRelationshipRepo {
    async fn get(
        &self,
        game_id: GameId,
        from: &EntityRef,
        to: &EntityRef,
    ) -> Result<Relationship, RepoError> {
        Ok(self.find(game_id, from, to).await?.unwrap_or_else(|| {
            Relationship::with_defaults(game_id, from.clone(), to.clone(), self.store.now())
        }))
    }

    async fn upsert(
        &self,
        game_id: GameId,
        from: &EntityRef,
        to: &EntityRef,
        turn: u32,
        update: DimensionUpdate,
    ) -> Result<Relationship, RepoError> {
        let now = self.store.now();
        let mut relationship = self.get(game_id, from, to).await?;
        relationship.apply(&update, turn, now);
        let values = relationship.values;

        sqlx::query(
            r#"
            INSERT INTO relationships
                (id, game_id, from_type, from_id, to_type, to_id,
                 trust, respect, affection, fear, resentment, debt,
                 updated_turn, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(game_id, from_type, from_id, to_type, to_id) DO UPDATE SET
                trust = excluded.trust,
                respect = excluded.respect,
                affection = excluded.affection,
                fear = excluded.fear,
                resentment = excluded.resentment,
                debt = excluded.debt,
                updated_turn = excluded.updated_turn,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(relationship.id.to_string())
        .bind(game_id.to_string())
        .bind(from.entity_type.as_str())
        .bind(&from.entity_id)
        .bind(to.entity_type.as_str())
        .bind(&to.entity_id)
        .bind(values.trust)
        .bind(values.respect)
        .bind(values.affection)
        .bind(values.fear)
        .bind(values.resentment)
        .bind(values.debt)
        .bind(i64::from(relationship.updated_turn))
        .bind(format_timestamp(relationship.created_at))
        .bind(format_timestamp(relationship.updated_at))
        .execute(self.store.pool())
        .await
        .map_err(|e| RepoError::database("upsert_relationship", e))?;

        Ok(relationship)
    }

    async fn list_from(
        &self,
        game_id: GameId,
        from: &EntityRef,
    ) -> Result<Vec<Relationship>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM relationships
            WHERE game_id = ? AND from_type = ? AND from_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(game_id.to_string())
        .bind(from.entity_type.as_str())
        .bind(&from.entity_id)
        .fetch_all(self.store.pool())
        .await
        .map_err(|e| RepoError::database("list_relationships_from", e))?;

        rows.iter().map(row_to_relationship).collect()
    }
}
