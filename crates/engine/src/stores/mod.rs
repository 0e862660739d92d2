//! In-memory state storage modules.
//!
//! Stores manage runtime state that doesn't belong in the database:
//! - `GameLocks` - per-game serialization of evolution writes

pub mod game_locks;

pub use game_locks::GameLocks;
