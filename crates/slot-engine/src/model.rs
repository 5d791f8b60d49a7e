//! Scheduling data model: rules, exceptions, appointment types, appointments
//! and the slots computed from them.
//!
//! All types are plain values that serialize with serde. Wall-clock times
//! (`start_time`/`end_time`) are `HH:MM` strings on the wire; instants are
//! RFC 3339 UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::interval::Buffers;

/// Upper bound for an appointment type's duration and for each of its buffers.
pub const MAX_TYPE_MINUTES: i64 = 24 * 60;

/// Whether `[start, end)` is a non-empty wall-clock window. An `end` of
/// midnight (written `24:00`) closes the window at the end of the day.
pub(crate) fn is_ordered(start: NaiveTime, end: NaiveTime) -> bool {
    end == NaiveTime::MIN || start < end
}

/// Recurring weekly availability for one doctor on one calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub calendar_id: Uuid,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// `00:00` here means the midnight that ends the day.
    #[serde(with = "hhmm::end")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
    /// Wall-clock zone of `start_time`/`end_time`. `None` means the engine's
    /// reference zone.
    #[serde(default)]
    pub timezone: Option<Tz>,
}

impl AvailabilityRule {
    /// Check the invariants a rule must hold before it is stored.
    pub fn validate(&self) -> Result<()> {
        if self.day_of_week > 6 {
            return Err(EngineError::InvalidConfiguration(format!(
                "rule {}: day_of_week must be between 0 (Sunday) and 6 (Saturday), got {}",
                self.id, self.day_of_week
            )));
        }
        if !is_ordered(self.start_time, self.end_time) {
            return Err(EngineError::InvalidConfiguration(format!(
                "rule {}: start_time {} must be before end_time {}",
                self.id, self.start_time, self.end_time
            )));
        }
        if let (Some(from), Some(to)) = (self.valid_from, self.valid_to) {
            if from > to {
                return Err(EngineError::InvalidConfiguration(format!(
                    "rule {}: valid_from {} is after valid_to {}",
                    self.id, from, to
                )));
            }
        }
        Ok(())
    }

    /// Whether the rule produces a window on the given local date.
    ///
    /// Missing validity bounds are unbounded; present bounds are inclusive.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        if date.weekday().num_days_from_sunday() != u32::from(self.day_of_week) {
            return false;
        }
        if self.valid_from.is_some_and(|from| date < from) {
            return false;
        }
        if self.valid_to.is_some_and(|to| date > to) {
            return false;
        }
        true
    }
}

/// Whether an exception injects or removes availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionKind {
    Add,
    Remove,
}

/// One-off override of a doctor's availability on a specific date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityException {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub calendar_id: Uuid,
    pub date: NaiveDate,
    pub kind: ExceptionKind,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm::end")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AvailabilityException {
    pub fn validate(&self) -> Result<()> {
        if !is_ordered(self.start_time, self.end_time) {
            return Err(EngineError::InvalidConfiguration(format!(
                "exception {}: start_time {} must be before end_time {}",
                self.id, self.start_time, self.end_time
            )));
        }
        Ok(())
    }
}

/// A bookable service with its own duration and invisible padding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentType {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub calendar_id: Uuid,
    #[serde(default)]
    pub specialty_id: Option<Uuid>,
    /// Unique per (doctor, calendar).
    pub code: String,
    pub label: String,
    pub duration_minutes: i64,
    #[serde(default)]
    pub buffer_before_minutes: i64,
    #[serde(default)]
    pub buffer_after_minutes: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Out-of-range values saturate; `validate` rejects them anyway.
fn minutes(value: i64) -> Duration {
    Duration::try_minutes(value).unwrap_or(Duration::MAX)
}

impl AppointmentType {
    pub fn duration(&self) -> Duration {
        minutes(self.duration_minutes)
    }

    pub fn buffer_before(&self) -> Duration {
        minutes(self.buffer_before_minutes)
    }

    pub fn buffer_after(&self) -> Duration {
        minutes(self.buffer_after_minutes)
    }

    pub fn buffers(&self) -> Buffers {
        Buffers::new(self.buffer_before(), self.buffer_after())
    }

    /// Total footprint: duration plus both buffers.
    pub fn slot_length_minutes(&self) -> i64 {
        self.duration_minutes + self.buffer_before_minutes + self.buffer_after_minutes
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TYPE_MINUTES).contains(&self.duration_minutes) {
            return Err(EngineError::InvalidConfiguration(format!(
                "appointment type {}: duration_minutes must be between 1 and {}, got {}",
                self.code, MAX_TYPE_MINUTES, self.duration_minutes
            )));
        }
        for buffer in [self.buffer_before_minutes, self.buffer_after_minutes] {
            if !(0..=MAX_TYPE_MINUTES).contains(&buffer) {
                return Err(EngineError::InvalidConfiguration(format!(
                    "appointment type {}: buffers must be between 0 and {} minutes, got {}",
                    self.code, MAX_TYPE_MINUTES, buffer
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Booked,
    Cancelled,
}

/// Patient details attached to an appointment.
///
/// Only the named fields are accepted; unknown keys are rejected when the
/// struct is built from a loose attribute map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PatientInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build from an untyped JSON object, rejecting unknown or mistyped keys.
    pub fn from_attributes(attributes: serde_json::Value) -> Result<Self> {
        let info: PatientInfo = serde_json::from_value(attributes)
            .map_err(|e| EngineError::InvalidAttribute(e.to_string()))?;
        if info.name.trim().is_empty() {
            return Err(EngineError::InvalidAttribute(
                "patient name must not be empty".to_string(),
            ));
        }
        Ok(info)
    }
}

/// One change of ownership of an appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from_doctor_id: Uuid,
    pub from_calendar_id: Uuid,
    pub to_doctor_id: Uuid,
    pub to_calendar_id: Uuid,
    pub transferred_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A single booked interval on a doctor's timeline.
///
/// `[start_at, end_at)` is the visible interval only; buffers of the
/// appointment type are not included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub calendar_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default)]
    pub specialty_id: Option<Uuid>,
    pub appointment_type_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub patient: PatientInfo,
    /// Prior owners, oldest first.
    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Non-cancelled appointments occupy the doctor's timeline.
    pub fn is_active(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

/// A bookable slot. `end - start` equals the appointment type's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// A maximal run of contiguous slots, for coarse display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBlock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub slot_count: usize,
}

/// `HH:MM` wall-clock serialization. Seconds are accepted on input.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse::<D::Error>(&raw)
    }

    fn parse<E: Error>(raw: &str) -> Result<NaiveTime, E> {
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|_| E::custom(format!("invalid wall-clock time '{}', expected HH:MM", raw)))
    }

    /// Window ends additionally accept `24:00`, stored as midnight and
    /// written back as `24:00`.
    pub mod end {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
            if *time == NaiveTime::MIN {
                serializer.serialize_str("24:00")
            } else {
                super::serialize(time, serializer)
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
            let raw = String::deserialize(deserializer)?;
            match raw.as_str() {
                "24:00" | "24:00:00" => Ok(NaiveTime::MIN),
                other => super::parse::<D::Error>(other),
            }
        }
    }
}
