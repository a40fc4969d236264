//! # FlatDB
//!
//! Persistence core of a flat on-disk key/value index:
//! - Binary codec for big-endian integers and packed 40-bit values
//! - Position tables (4, 5 and 8-byte slots, in-process or memory-mapped)
//! - Write-Ahead Logging (WAL) for atomic, crash-recoverable batches
//! - Exclusive file lock for single-writer directories
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Hash map / heap owner (external)                  │
//! │        set slot ─────────┐        process_log_entry / save  │
//! └──────────────────────────┼───────────────────▲──────────────┘
//!                            │                   │ replay
//!          ┌─────────────────┴───────┐           │
//!          │                         │           │
//!          ▼                         ▼           │
//!   ┌──────────────┐          ┌─────────────┐    │
//!   │ PositionTable│          │ LogManager  │────┘
//!   │ (packed/mmap)│          │ Begin…End   │
//!   └──────┬───────┘          └──────┬──────┘
//!          │ update / sync           │ append / force
//!          ▼                         ▼
//!     table.dat                  table.log        LOCK
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod lock;
pub mod table;
pub mod wal;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FlatDbError, Result};
pub use config::Config;
pub use lock::ExclusiveFileLock;
pub use store::TableStore;
pub use table::{Table, TableKind};
pub use wal::{LogManager, LogTarget};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FlatDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
