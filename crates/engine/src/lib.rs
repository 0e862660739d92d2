//! Taleweaver engine library.
//!
//! Server-side half of the entity evolution subsystem.
//!
//! ## Structure
//!
//! - `use_cases/` - the evolution service (intake, DM resolution, summaries)
//! - `infrastructure/` - ports plus SQLite, in-memory and broadcast adapters
//! - `stores/` - in-process runtime state (per-game locks)
//! - `replay` - transcript replay used by the binary
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod replay;
pub mod stores;
pub mod use_cases;

pub use app::App;
