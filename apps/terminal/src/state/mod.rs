//! # State Module
//!
//! Injected state for terminal commands. Each command takes only the state
//! it needs; nothing is ambient.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  run() builds once per process                                          │
//! │          ┌──────────────────┬──────────────────┬────────────────┐       │
//! │          ▼                  ▼                  ▼                ▼       │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────┐ ┌────────────┐ │
//! │  │   DbState    │  │ ConfigState  │  │ SessionContext │ │  Notifier  │ │
//! │  │              │  │              │  │                │ │            │ │
//! │  │ Arc<dyn      │  │ store_name   │  │ operator       │ │ broadcast  │ │
//! │  │  DataAccess> │  │ currency     │  │ argon2 hash    │ │ ChangeEvent│ │
//! │  └──────────────┘  └──────────────┘  └────────────────┘ └────────────┘ │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: the SQLite pool is thread-safe                              │
//! │  • ConfigState, SessionContext: read-only after initialization          │
//! │  • Notifier: broadcast::Sender is Clone + Send + Sync                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod notifier;
pub(crate) mod session;

pub use config::ConfigState;
pub use db::DbState;
pub use notifier::{ChangeEvent, EntityKind, Notifier};
pub use session::SessionContext;
