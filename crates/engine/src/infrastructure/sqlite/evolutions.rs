//! SQLite pending-evolution queue.
//!
//! The change payload is flattened into nullable columns; which ones are
//! set depends on `evolution_type`.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use taleweaver_domain::{
    same_trait, EntityRef, EntityType, EvolutionChange, EvolutionId, EvolutionStatus,
    EvolutionType, GameId, PendingEvolution, RelationshipDimension,
};

use super::{column, entity_columns, format_timestamp, parse_column, timestamp_column, SqliteStore};
use crate::infrastructure::ports::{PendingEvolutionRepo, RepoError};

pub struct SqliteEvolutionRepo {
    store: SqliteStore,
}

impl SqliteEvolutionRepo {
    pub(super) fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

/// Change columns: trait, target_type, target_id, dimension, old_value, new_value.
type ChangeColumns = (
    Option<String>,
    Option<&'static str>,
    Option<String>,
    Option<&'static str>,
    Option<f64>,
    Option<f64>,
);

fn change_columns(change: &EvolutionChange) -> ChangeColumns {
    match change {
        EvolutionChange::TraitAdd { trait_name } | EvolutionChange::TraitRemove { trait_name } => {
            (Some(trait_name.clone()), None, None, None, None, None)
        }
        EvolutionChange::RelationshipChange {
            target,
            dimension,
            old_value,
            new_value,
        } => (
            None,
            Some(target.entity_type.as_str()),
            Some(target.entity_id.clone()),
            Some(dimension.as_str()),
            Some(*old_value),
            Some(*new_value),
        ),
    }
}

fn missing(name: &str) -> RepoError {
    RepoError::serialization(format!("pending evolution row missing {}", name))
}

fn row_to_change(row: &SqliteRow) -> Result<EvolutionChange, RepoError> {
    let evolution_type: EvolutionType = parse_column(row, "evolution_type")?;
    match evolution_type {
        EvolutionType::TraitAdd | EvolutionType::TraitRemove => {
            let trait_name: Option<String> = column(row, "trait")?;
            let trait_name = trait_name.ok_or_else(|| missing("trait"))?;
            Ok(if evolution_type == EvolutionType::TraitAdd {
                EvolutionChange::TraitAdd { trait_name }
            } else {
                EvolutionChange::TraitRemove { trait_name }
            })
        }
        EvolutionType::RelationshipChange => {
            let target_type: Option<String> = column(row, "target_type")?;
            let target_id: Option<String> = column(row, "target_id")?;
            let dimension: Option<String> = column(row, "dimension")?;
            let target_type: EntityType = target_type
                .ok_or_else(|| missing("target_type"))?
                .parse()
                .map_err(|e| RepoError::serialization(format!("target_type: {}", e)))?;
            let dimension: RelationshipDimension = dimension
                .ok_or_else(|| missing("dimension"))?
                .parse()
                .map_err(|e| RepoError::serialization(format!("dimension: {}", e)))?;
            let old_value: Option<f64> = column(row, "old_value")?;
            let new_value: Option<f64> = column(row, "new_value")?;
            Ok(EvolutionChange::RelationshipChange {
                target: EntityRef::new(target_type, target_id.ok_or_else(|| missing("target_id"))?),
                dimension,
                old_value: old_value.ok_or_else(|| missing("old_value"))?,
                new_value: new_value.ok_or_else(|| missing("new_value"))?,
            })
        }
    }
}

fn row_to_evolution(row: &SqliteRow) -> Result<PendingEvolution, RepoError> {
    let turn: i64 = column(row, "turn")?;
    let source_event_id: Option<String> = column(row, "source_event_id")?;
    let resolved_at: Option<String> = column(row, "resolved_at")?;

    Ok(PendingEvolution {
        id: parse_column(row, "id")?,
        game_id: parse_column(row, "game_id")?,
        turn: turn as u32,
        subject: entity_columns(row, "entity_type", "entity_id")?,
        change: row_to_change(row)?,
        reason: column(row, "reason")?,
        source_event_id: source_event_id
            .map(|s| s.parse())
            .transpose()
            .map_err(|e| RepoError::serialization(format!("source_event_id: {}", e)))?,
        status: parse_column(row, "status")?,
        dm_notes: column(row, "dm_notes")?,
        created_at: timestamp_column(row, "created_at")?,
        resolved_at: resolved_at
            .map(|s| taleweaver_domain::common::parse_datetime(&s))
            .transpose()
            .map_err(|e| RepoError::serialization(format!("resolved_at: {}", e)))?,
    })
}

#[async_trait]
impl PendingEvolutionRepo for SqliteEvolutionRepo {
    async fn insert(&self, evolution: &PendingEvolution) -> Result<(), RepoError> {
        let (trait_name, target_type, target_id, dimension, old_value, new_value) =
            change_columns(&evolution.change);

        sqlx::query(
            r#"
            INSERT INTO pending_evolutions
                (id, game_id, turn, entity_type, entity_id, evolution_type,
                 trait, target_type, target_id, dimension, old_value, new_value,
                 reason, source_event_id, status, dm_notes, created_at, resolved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(evolution.id.to_string())
        .bind(evolution.game_id.to_string())
        .bind(i64::from(evolution.turn))
        .bind(evolution.subject.entity_type.as_str())
        .bind(&evolution.subject.entity_id)
        .bind(evolution.evolution_type().as_str())
        .bind(trait_name)
        .bind(target_type)
        .bind(target_id)
        .bind(dimension)
        .bind(old_value)
        .bind(new_value)
        .bind(&evolution.reason)
        .bind(evolution.source_event_id.map(|id| id.to_string()))
        .bind(evolution.status.as_str())
        .bind(&evolution.dm_notes)
        .bind(format_timestamp(evolution.created_at))
        .bind(evolution.resolved_at.map(format_timestamp))
        .execute(self.store.pool())
        .await
        .map_err(|e| RepoError::database("insert_evolution", e))?;

        Ok(())
    }

    async fn update(&self, evolution: &PendingEvolution) -> Result<(), RepoError> {
        let (trait_name, target_type, target_id, dimension, old_value, new_value) =
            change_columns(&evolution.change);

        let result = sqlx::query(
            r#"
            UPDATE pending_evolutions SET
                trait = ?, target_type = ?, target_id = ?, dimension = ?,
                old_value = ?, new_value = ?, reason = ?,
                status = ?, dm_notes = ?, resolved_at = ?
            WHERE id = ?
            "#,
        )
        .bind(trait_name)
        .bind(target_type)
        .bind(target_id)
        .bind(dimension)
        .bind(old_value)
        .bind(new_value)
        .bind(&evolution.reason)
        .bind(evolution.status.as_str())
        .bind(&evolution.dm_notes)
        .bind(evolution.resolved_at.map(format_timestamp))
        .bind(evolution.id.to_string())
        .execute(self.store.pool())
        .await
        .map_err(|e| RepoError::database("update_evolution", e))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::not_found("PendingEvolution", evolution.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: EvolutionId) -> Result<Option<PendingEvolution>, RepoError> {
        let row = sqlx::query("SELECT * FROM pending_evolutions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.store.pool())
            .await
            .map_err(|e| RepoError::database("find_evolution", e))?;

        row.as_ref().map(row_to_evolution).transpose()
    }

    async fn find_pending_by_entity_trait(
        &self,
        game_id: GameId,
        entity: &EntityRef,
        trait_name: &str,
    ) -> Result<Option<PendingEvolution>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM pending_evolutions
            WHERE game_id = ? AND entity_type = ? AND entity_id = ?
              AND evolution_type = ? AND status = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(game_id.to_string())
        .bind(entity.entity_type.as_str())
        .bind(&entity.entity_id)
        .bind(EvolutionType::TraitAdd.as_str())
        .bind(EvolutionStatus::Pending.as_str())
        .fetch_all(self.store.pool())
        .await
        .map_err(|e| RepoError::database("find_pending_trait", e))?;

        for row in &rows {
            let evolution = row_to_evolution(row)?;
            if evolution
                .change
                .trait_name()
                .is_some_and(|t| same_trait(t, trait_name))
            {
                return Ok(Some(evolution));
            }
        }
        Ok(None)
    }

    async fn list(
        &self,
        game_id: GameId,
        pending_only: bool,
    ) -> Result<Vec<PendingEvolution>, RepoError> {
        let rows = if pending_only {
            sqlx::query(
                r#"
                SELECT * FROM pending_evolutions
                WHERE game_id = ? AND status = ?
                ORDER BY created_at ASC, rowid ASC
                "#,
            )
            .bind(game_id.to_string())
            .bind(EvolutionStatus::Pending.as_str())
            .fetch_all(self.store.pool())
            .await
        } else {
            sqlx::query(
                r#"
                SELECT * FROM pending_evolutions
                WHERE game_id = ?
                ORDER BY created_at ASC, rowid ASC
                "#,
            )
            .bind(game_id.to_string())
            .fetch_all(self.store.pool())
            .await
        }
        .map_err(|e| RepoError::database("list_evolutions", e))?;

        rows.iter().map(row_to_evolution).collect()
    }

    async fn list_for_entity(
        &self,
        game_id: GameId,
        entity: &EntityRef,
    ) -> Result<Vec<PendingEvolution>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM pending_evolutions
            WHERE game_id = ? AND entity_type = ? AND entity_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(game_id.to_string())
        .bind(entity.entity_type.as_str())
        .bind(&entity.entity_id)
        .fetch_all(self.store.pool())
        .await
        .map_err(|e| RepoError::database("list_entity_evolutions", e))?;

        rows.iter().map(row_to_evolution).collect()
    }
}
