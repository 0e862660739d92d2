//! SQLite trait repository.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use taleweaver_domain::{EntityRef, GameId, Trait, TraitStatus};

use super::{column, entity_columns, format_timestamp, parse_column, timestamp_column, SqliteStore};
use crate::infrastructure::ports::{RepoError, TraitRepo};

pub struct SqliteTraitRepo {
    store: SqliteStore,
}

impl SqliteTraitRepo {
    pub(super) fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

fn row_to_trait(row: &SqliteRow) -> Result<Trait, RepoError> {
    let acquired_turn: i64 = column(row, "acquired_turn")?;
    Ok(Trait {
        id: parse_column(row, "id")?,
        game_id: parse_column(row, "game_id")?,
        entity: entity_columns(row, "entity_type", "entity_id")?,
        name: column(row, "trait")?,
        acquired_turn: acquired_turn as u32,
        status: parse_column(row, "status")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

#[async_trait]
impl TraitRepo for SqliteTraitRepo {
    async fn find_active(
        &self,
        game_id: GameId,
        entity: &EntityRef,
    ) -> Result<Vec<Trait>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM entity_traits
            WHERE game_id = ? AND entity_type = ? AND entity_id = ? AND status = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(game_id.to_string())
        .bind(entity.entity_type.as_str())
        .bind(&entity.entity_id)
        .bind(TraitStatus::Active.as_str())
        .fetch_all(self.store.pool())
        .await
        .map_err(|e| RepoError::database("find_active_traits", e))?;

        rows.iter().map(row_to_trait).collect()
    }

    async fn add(
        &self,
        game_id: GameId,
        entity: &EntityRef,
        trait_name: &str,
        turn: u32,
    ) -> Result<Trait, RepoError> {
        let active = self.find_active(game_id, entity).await?;
        if let Some(existing) = active.into_iter().find(|t| t.matches(trait_name)) {
            return Ok(existing);
        }

        let added = Trait::new(game_id, entity.clone(), trait_name.trim(), turn, self.store.now());
        sqlx::query(
            r#"
            INSERT INTO entity_traits
                (id, game_id, entity_type, entity_id, trait, acquired_turn, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(added.id.to_string())
        .bind(game_id.to_string())
        .bind(entity.entity_type.as_str())
        .bind(&entity.entity_id)
        .bind(&added.name)
        .bind(i64::from(added.acquired_turn))
        .bind(added.status.as_str())
        .bind(format_timestamp(added.created_at))
        .execute(self.store.pool())
        .await
        .map_err(|e| RepoError::database("add_trait", e))?;

        Ok(added)
    }

    async fn remove(
        &self,
        game_id: GameId,
        entity: &EntityRef,
        trait_name: &str,
    ) -> Result<(), RepoError> {
        let matching: Vec<Trait> = self
            .find_active(game_id, entity)
            .await?
            .into_iter()
            .filter(|t| t.matches(trait_name))
            .collect();

        for t in matching {
            sqlx::query("UPDATE entity_traits SET status = ? WHERE id = ?")
                .bind(TraitStatus::Removed.as_str())
                .bind(t.id.to_string())
                .execute(self.store.pool())
                .await
                .map_err(|e| RepoError::database("remove_trait", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traits.db");
        let store = SqliteStore::connect(path.to_str().unwrap(), Arc::new(SystemClock::new()))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn add_find_and_remove_round_trip_through_sqlite() {
        let (_dir, store) = store().await;
        let repo = store.traits();
        let game = GameId::new();
        let npc = EntityRef::npc("innkeeper");

        let added = repo.add(game, &npc, " Generous ", 3).await.unwrap();
        assert_eq!(added.name, "Generous");

        let duplicate = repo.add(game, &npc, "generous", 8).await.unwrap();
        assert_eq!(duplicate.id, added.id);
        assert_eq!(duplicate.acquired_turn, 3);

        repo.add(game, &npc, "suspicious", 4).await.unwrap();
        let active = repo.find_active(game, &npc).await.unwrap();
        assert_eq!(
            active.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            vec!["Generous", "suspicious"]
        );

        repo.remove(game, &npc, "GENEROUS").await.unwrap();
        let active = repo.find_active(game, &npc).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "suspicious");
    }

    #[tokio::test]
    async fn traits_survive_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        let path = path.to_str().unwrap();
        let game = GameId::new();
        let player = EntityRef::player("p1");

        {
            let store = SqliteStore::connect(path, Arc::new(SystemClock::new()))
                .await
                .unwrap();
            store.traits().add(game, &player, "reckless", 2).await.unwrap();
        }

        let store = SqliteStore::connect(path, Arc::new(SystemClock::new()))
            .await
            .unwrap();
        let active = store.traits().find_active(game, &player).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].entity, player);
    }
}
