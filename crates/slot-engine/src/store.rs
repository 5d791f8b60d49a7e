//! Repository contracts the engine reads from, and an in-memory store.
//!
//! The engine only needs consistent reads plus one atomic primitive: an
//! appointment write that checks the doctor's timeline for overlaps and
//! performs the write as a single step ([`AppointmentRepository::insert_if_free`]
//! and [`AppointmentRepository::replace_if_free`]). Replacements are also
//! conditional on the stored record being the one the caller read. A
//! database-backed store would implement these with a per-doctor lock held
//! across check and write plus a compare-and-swap on the row.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::interval::Buffers;
use crate::model::{Appointment, AppointmentType, AvailabilityException, AvailabilityRule};
use crate::occupancy::find_conflict;

pub trait RuleRepository: Send + Sync {
    fn rules_for(&self, doctor_id: Uuid, calendar_id: Uuid) -> Result<Vec<AvailabilityRule>>;
    fn create_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule>;
    fn update_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule>;
    fn delete_rule(&self, id: Uuid) -> Result<()>;
}

pub trait ExceptionRepository: Send + Sync {
    /// Exceptions whose date lies in `[from, to]` (inclusive).
    fn exceptions_between(
        &self,
        doctor_id: Uuid,
        calendar_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilityException>>;
    fn create_exception(&self, exception: AvailabilityException) -> Result<AvailabilityException>;
    fn delete_exception(&self, id: Uuid) -> Result<()>;
}

pub trait AppointmentTypeRepository: Send + Sync {
    fn appointment_type(&self, id: Uuid) -> Result<AppointmentType>;
    fn appointment_types_for(&self, doctor_id: Uuid, calendar_id: Uuid) -> Result<Vec<AppointmentType>>;
    fn create_appointment_type(&self, appointment_type: AppointmentType) -> Result<AppointmentType>;
    fn update_appointment_type(&self, appointment_type: AppointmentType) -> Result<AppointmentType>;
}

pub trait AppointmentRepository: Send + Sync {
    fn appointment(&self, id: Uuid) -> Result<Appointment>;

    /// Non-cancelled appointments of `doctor_id` intersecting `[from, to)`,
    /// sorted by start.
    fn appointments_in_range(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>>;

    /// Insert a new appointment unless its footprint, widened by `buffers`,
    /// overlaps an active appointment of the same doctor. Check and insert are
    /// atomic.
    fn insert_if_free(&self, appointment: Appointment, buffers: Buffers) -> Result<Appointment>;

    /// Replace `expected` with `appointment`, which must carry the same id.
    ///
    /// Fails with [`EngineError::ConcurrentUpdate`] when the stored record is no
    /// longer `expected`, and refuses to bring a cancelled appointment back.
    /// When the new version is active, its buffered footprint must not overlap
    /// any other active appointment of its (possibly new) doctor. Check and
    /// write are atomic.
    fn replace_if_free(
        &self,
        expected: &Appointment,
        appointment: Appointment,
        buffers: Buffers,
    ) -> Result<Appointment>;
}

/// Everything the availability engine and booking service read and write.
pub trait CalendarStore:
    RuleRepository + ExceptionRepository + AppointmentTypeRepository + AppointmentRepository
{
}

impl<T> CalendarStore for T where
    T: RuleRepository + ExceptionRepository + AppointmentTypeRepository + AppointmentRepository
{
}

/// A serializable dump of one or more calendars, used to seed a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarSnapshot {
    #[serde(default)]
    pub rules: Vec<AvailabilityRule>,
    #[serde(default)]
    pub exceptions: Vec<AvailabilityException>,
    #[serde(default)]
    pub appointment_types: Vec<AppointmentType>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

/// Thread-safe in-memory implementation of every repository trait.
///
/// Appointment writes hold the appointments write lock across the overlap
/// check and the write, which makes them atomic with respect to each other.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rules: RwLock<HashMap<Uuid, AvailabilityRule>>,
    exceptions: RwLock<HashMap<Uuid, AvailabilityException>>,
    appointment_types: RwLock<HashMap<Uuid, AppointmentType>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| EngineError::Store("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| EngineError::Store("lock poisoned".to_string()))
}

/// Type codes are unique per (doctor, calendar).
fn ensure_unique_code(
    types: &HashMap<Uuid, AppointmentType>,
    appointment_type: &AppointmentType,
) -> Result<()> {
    let duplicate = types.values().any(|t| {
        t.id != appointment_type.id
            && t.doctor_id == appointment_type.doctor_id
            && t.calendar_id == appointment_type.calendar_id
            && t.code == appointment_type.code
    });
    if duplicate {
        return Err(EngineError::InvalidConfiguration(format!(
            "appointment type code '{}' already exists for this doctor and calendar",
            appointment_type.code
        )));
    }
    Ok(())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot, validating every record on the way in.
    ///
    /// Appointments go through [`AppointmentRepository::insert_if_free`] without
    /// buffers, so a snapshot containing double bookings is rejected while
    /// historical bookings that predate a buffer change still load.
    pub fn from_snapshot(snapshot: CalendarSnapshot) -> Result<Self> {
        let store = Self::new();
        for rule in snapshot.rules {
            store.create_rule(rule)?;
        }
        for exception in snapshot.exceptions {
            store.create_exception(exception)?;
        }
        for appointment_type in snapshot.appointment_types {
            store.create_appointment_type(appointment_type)?;
        }
        for appointment in snapshot.appointments {
            store.insert_if_free(appointment, Buffers::none())?;
        }
        Ok(store)
    }

    fn check_free(
        appointments: &HashMap<Uuid, Appointment>,
        appointment: &Appointment,
        buffers: Buffers,
    ) -> Result<()> {
        if !appointment.is_active() {
            return Ok(());
        }
        if appointment.start_at >= appointment.end_at {
            return Err(EngineError::InvalidConfiguration(format!(
                "appointment {}: start_at must be before end_at",
                appointment.id
            )));
        }
        let same_doctor: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.doctor_id == appointment.doctor_id)
            .cloned()
            .collect();
        let (start, end) = buffers.around(appointment.start_at, appointment.end_at);
        match find_conflict(
            &same_doctor,
            appointment.doctor_id,
            start,
            end,
            Some(appointment.id),
        ) {
            Some(conflict) => Err(EngineError::OverlapDetected {
                doctor_id: appointment.doctor_id,
                start_at: appointment.start_at,
                end_at: appointment.end_at,
                conflicting_id: conflict.appointment_id,
            }),
            None => Ok(()),
        }
    }
}

impl RuleRepository for InMemoryStore {
    fn rules_for(&self, doctor_id: Uuid, calendar_id: Uuid) -> Result<Vec<AvailabilityRule>> {
        let mut rules: Vec<AvailabilityRule> = read(&self.rules)?
            .values()
            .filter(|r| r.doctor_id == doctor_id && r.calendar_id == calendar_id)
            .cloned()
            .collect();
        rules.sort_by_key(|r| (r.day_of_week, r.start_time, r.id));
        Ok(rules)
    }

    fn create_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule> {
        rule.validate()?;
        write(&self.rules)?.insert(rule.id, rule.clone());
        Ok(rule)
    }

    fn update_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule> {
        rule.validate()?;
        let mut rules = write(&self.rules)?;
        match rules.get_mut(&rule.id) {
            Some(existing) => {
                *existing = rule.clone();
                Ok(rule)
            }
            None => Err(EngineError::NotFound(format!("rule {}", rule.id))),
        }
    }

    fn delete_rule(&self, id: Uuid) -> Result<()> {
        write(&self.rules)?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("rule {}", id)))
    }
}

impl ExceptionRepository for InMemoryStore {
    fn exceptions_between(
        &self,
        doctor_id: Uuid,
        calendar_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilityException>> {
        let mut exceptions: Vec<AvailabilityException> = read(&self.exceptions)?
            .values()
            .filter(|e| e.doctor_id == doctor_id && e.calendar_id == calendar_id)
            .filter(|e| from <= e.date && e.date <= to)
            .cloned()
            .collect();
        exceptions.sort_by_key(|e| (e.date, e.start_time, e.id));
        Ok(exceptions)
    }

    fn create_exception(&self, exception: AvailabilityException) -> Result<AvailabilityException> {
        exception.validate()?;
        write(&self.exceptions)?.insert(exception.id, exception.clone());
        Ok(exception)
    }

    fn delete_exception(&self, id: Uuid) -> Result<()> {
        write(&self.exceptions)?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("exception {}", id)))
    }
}

impl AppointmentTypeRepository for InMemoryStore {
    fn appointment_type(&self, id: Uuid) -> Result<AppointmentType> {
        read(&self.appointment_types)?
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("appointment type {}", id)))
    }

    fn appointment_types_for(&self, doctor_id: Uuid, calendar_id: Uuid) -> Result<Vec<AppointmentType>> {
        let mut types: Vec<AppointmentType> = read(&self.appointment_types)?
            .values()
            .filter(|t| t.doctor_id == doctor_id && t.calendar_id == calendar_id)
            .cloned()
            .collect();
        types.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(types)
    }

    fn create_appointment_type(&self, appointment_type: AppointmentType) -> Result<AppointmentType> {
        appointment_type.validate()?;
        let mut types = write(&self.appointment_types)?;
        ensure_unique_code(&types, &appointment_type)?;
        types.insert(appointment_type.id, appointment_type.clone());
        Ok(appointment_type)
    }

    fn update_appointment_type(&self, appointment_type: AppointmentType) -> Result<AppointmentType> {
        appointment_type.validate()?;
        let mut types = write(&self.appointment_types)?;
        ensure_unique_code(&types, &appointment_type)?;
        match types.get_mut(&appointment_type.id) {
            Some(existing) => {
                *existing = appointment_type.clone();
                Ok(appointment_type)
            }
            None => Err(EngineError::NotFound(format!(
                "appointment type {}",
                appointment_type.id
            ))),
        }
    }
}

impl AppointmentRepository for InMemoryStore {
    fn appointment(&self, id: Uuid) -> Result<Appointment> {
        read(&self.appointments)?
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("appointment {}", id)))
    }

    fn appointments_in_range(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>> {
        let mut found: Vec<Appointment> = read(&self.appointments)?
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.is_active())
            .filter(|a| a.start_at < to && from < a.end_at)
            .cloned()
            .collect();
        found.sort_by_key(|a| (a.start_at, a.id));
        Ok(found)
    }

    fn insert_if_free(&self, appointment: Appointment, buffers: Buffers) -> Result<Appointment> {
        let mut appointments = write(&self.appointments)?;
        if appointments.contains_key(&appointment.id) {
            return Err(EngineError::Store(format!(
                "appointment {} already exists",
                appointment.id
            )));
        }
        Self::check_free(&appointments, &appointment, buffers)?;
        debug!(
            "inserting appointment {} for doctor {}",
            appointment.id, appointment.doctor_id
        );
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    fn replace_if_free(
        &self,
        expected: &Appointment,
        appointment: Appointment,
        buffers: Buffers,
    ) -> Result<Appointment> {
        if expected.id != appointment.id {
            return Err(EngineError::InvalidConfiguration(format!(
                "cannot replace appointment {} with {}",
                expected.id, appointment.id
            )));
        }
        let mut appointments = write(&self.appointments)?;
        let Some(stored) = appointments.get(&appointment.id) else {
            return Err(EngineError::NotFound(format!("appointment {}", appointment.id)));
        };
        if stored != expected {
            debug!("appointment {} changed since it was read", appointment.id);
            return Err(EngineError::ConcurrentUpdate(appointment.id));
        }
        if !stored.is_active() && appointment.is_active() {
            return Err(EngineError::InvalidConfiguration(format!(
                "appointment {} is cancelled and cannot be reactivated",
                appointment.id
            )));
        }
        Self::check_free(&appointments, &appointment, buffers)?;
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }
}
