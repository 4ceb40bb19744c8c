//! Shared data models for the mp3ify backend.
//!
//! This crate provides Serde-serializable types for:
//! - Job records and their status state machine
//! - Status update messages shared by the progress channel and the
//!   WebSocket wire format

pub mod job;
pub mod status;
pub mod ws;

// Re-export common types
pub use job::{JobId, JobRecord, RecordError};
pub use status::{JobStatus, UnknownStatus};
pub use ws::StatusUpdate;
