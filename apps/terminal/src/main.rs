//! # Caja Terminal Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Terminal                                │
//! │                                                                         │
//! │  $ caja add-item <order> AZUC-01 --quantity 2                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  main.rs ────► runs the library                                        │
//! │  lib.rs ─────► logging, database, state, dispatch                      │
//! │  commands/ ──► add_item, settle, check_credit, ...                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  stdout: JSON result          stderr: {"code": ..., "message": ...}     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // The actual setup is in lib.rs for better testability
    caja_terminal::run().await
}
