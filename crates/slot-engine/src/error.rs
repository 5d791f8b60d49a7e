//! Error types for slot-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A rule, exception or appointment type carries values the engine cannot
    /// schedule against (non-positive duration, negative buffer, inverted times).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The requested slot is not produced by the doctor's rules and exceptions,
    /// or it is already occupied. Callers should re-query and pick again.
    #[error("Slot unavailable for doctor {doctor_id} at {start_at}: {reason}")]
    SlotUnavailable {
        doctor_id: Uuid,
        start_at: DateTime<Utc>,
        reason: String,
    },

    /// A non-cancelled appointment of the doctor overlaps the interval being
    /// written. Raised by the write-time gate, usually after a lost race.
    #[error("Overlapping appointment {conflicting_id} for doctor {doctor_id} in [{start_at}, {end_at})")]
    OverlapDetected {
        doctor_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        conflicting_id: Uuid,
    },

    /// The stored appointment changed between read and write; re-read and
    /// try again.
    #[error("Appointment {0} was modified concurrently")]
    ConcurrentUpdate(Uuid),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
