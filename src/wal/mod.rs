//! Write-Ahead Log (WAL) Module
//!
//! Makes batched position-table updates atomic and crash-recoverable.
//!
//! ## Responsibilities
//! - Bracket each batch of slot mutations with Begin / End frames
//! - Force the End frame to disk as the commit point
//! - Replay committed batches after a crash, discard the rest
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Frame 1 (16 bytes)                           │
//! │ ┌──────────┬──────────────┬────────────────┐ │
//! │ │ Type (4) │ Position     │ Value          │ │
//! │ └──────────┴──────────────┴────────────────┘ │
//! ├──────────────────────────────────────────────┤
//! │ Frame 2 ...                                  │
//! └──────────────────────────────────────────────┘
//! ```
//! Position / value widths are 4 / 8 or 8 / 4 bytes, see [`FrameLayout`].

mod frame;
mod manager;
mod reader;
mod writer;

pub use frame::{FrameLayout, LogRecord, RecordType, FRAME_SIZE};
pub use manager::{LogManager, LogTarget, ReplayOutcome, ReplayReport};
pub use reader::LogReader;
pub use writer::{LogWriter, WriteMode};
