//! # slot-engine
//!
//! Appointment availability engine for a single doctor's calendar.
//!
//! Weekly availability rules, one-off date exceptions, per-type durations and
//! buffers, and already-booked appointments are combined into the exact set of
//! bookable slots in a window. The same pipeline decides whether one specific
//! slot is still bookable, and an atomic overlap check guards every write so a
//! doctor is never double-booked, even under concurrent requests.
//!
//! ## Modules
//!
//! - [`interval`] — half-open overlap, buffer expansion, containment
//! - [`expander`] — weekly rules → slots, including the window slicer
//! - [`exceptions`] — one-off add/remove windows
//! - [`occupancy`] — drop slots colliding with booked appointments
//! - [`assembler`] — dedupe, sort, merge into blocks
//! - [`availability`] — the query facade over a store
//! - [`booking`] — book, reschedule, transfer, cancel
//! - [`store`] — repository traits and an in-memory store
//! - [`dst`] — DST transition policies
//! - [`config`] — engine configuration
//! - [`error`] — Error types

pub mod assembler;
pub mod availability;
pub mod booking;
pub mod clock;
pub mod config;
pub mod dst;
pub mod error;
pub mod exceptions;
pub mod expander;
pub mod interval;
pub mod model;
pub mod occupancy;
pub mod store;

pub use assembler::{assemble, merge_contiguous};
pub use availability::AvailabilityEngine;
pub use booking::{BookingRequest, BookingService};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use dst::DstPolicy;
pub use error::EngineError;
pub use interval::{buffered_range, overlaps, Buffers};
pub use model::{
    Appointment, AppointmentStatus, AppointmentType, AvailabilityException, AvailabilityRule,
    ExceptionKind, PatientInfo, Slot, SlotBlock, TransferRecord,
};
pub use store::{CalendarSnapshot, CalendarStore, InMemoryStore};
