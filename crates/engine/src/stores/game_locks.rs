//! Per-game write serialization.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use taleweaver_domain::GameId;

/// One async mutex per game.
///
/// Queue and relationship writes for a game run under its guard; different
/// games never contend.
#[derive(Default)]
pub struct GameLocks {
    locks: DashMap<GameId, Arc<Mutex<()>>>,
}

impl GameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `game_id`.
    pub async fn lock(&self, game_id: GameId) -> OwnedMutexGuard<()> {
        // Clone out of the map so no shard lock is held across the await.
        let lock = self
            .locks
            .entry(game_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Number of games that have been locked at least once.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}
