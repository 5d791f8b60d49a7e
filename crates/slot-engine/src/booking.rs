//! Write paths on a doctor's timeline: book, reschedule, transfer, cancel.
//!
//! Every write that changes `(doctor_id, start_at, end_at)` re-validates
//! against the live store right before writing, then hands the record to the
//! store's atomic conditional write, which checks the buffered footprint
//! again. Two concurrent bookings for the same slot can both pass the first
//! check, but only one passes the write; the other gets
//! [`EngineError::OverlapDetected`].
//!
//! Updates to an existing appointment are conditional on the record the
//! service read. If another writer got there first (a cancel racing a
//! reschedule, say) the update fails with [`EngineError::ConcurrentUpdate`]
//! instead of overwriting it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::availability::AvailabilityEngine;
use crate::clock::Clock;
use crate::error::{EngineError, Result};
use crate::interval::Buffers;
use crate::model::{Appointment, AppointmentStatus, AppointmentType, PatientInfo, TransferRecord};
use crate::store::CalendarStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: Uuid,
    pub calendar_id: Uuid,
    pub appointment_type_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub patient: PatientInfo,
    #[serde(default)]
    pub specialty_id: Option<Uuid>,
}

pub struct BookingService<S, C> {
    engine: AvailabilityEngine<S>,
    clock: C,
}

impl<S: CalendarStore, C: Clock> BookingService<S, C> {
    pub fn new(engine: AvailabilityEngine<S>, clock: C) -> Self {
        Self { engine, clock }
    }

    pub fn engine(&self) -> &AvailabilityEngine<S> {
        &self.engine
    }

    /// Book a new appointment in an available slot.
    ///
    /// # Errors
    /// - `SlotUnavailable` when the slot is in the past, the type is inactive,
    ///   or rules/exceptions/buffers do not produce the slot.
    /// - `OverlapDetected` when another active appointment holds the interval.
    pub fn book(&self, request: BookingRequest) -> Result<Appointment> {
        let store = self.engine.store();
        let appointment_type = store.appointment_type(request.appointment_type_id)?;
        if appointment_type.doctor_id != request.doctor_id
            || appointment_type.calendar_id != request.calendar_id
        {
            return Err(EngineError::InvalidConfiguration(format!(
                "appointment type {} does not belong to doctor {} calendar {}",
                appointment_type.code, request.doctor_id, request.calendar_id
            )));
        }

        let now = self.clock.now();
        let end_at = self.ensure_bookable(
            request.doctor_id,
            request.calendar_id,
            request.start_at,
            &appointment_type,
            None,
            now,
        )?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            calendar_id: request.calendar_id,
            doctor_id: request.doctor_id,
            specialty_id: request.specialty_id.or(appointment_type.specialty_id),
            appointment_type_id: appointment_type.id,
            start_at: request.start_at,
            end_at,
            status: AppointmentStatus::Booked,
            patient: request.patient,
            transfers: Vec::new(),
            created_at: now,
            cancelled_at: None,
        };

        let appointment = store
            .insert_if_free(appointment, appointment_type.buffers())
            .inspect_err(|e| {
                warn!("booking for doctor {} rejected at write: {}", request.doctor_id, e);
            })?;
        info!(
            "appointment {} booked with doctor {} at {}",
            appointment.id, appointment.doctor_id, appointment.start_at
        );
        Ok(appointment)
    }

    /// Move an active appointment to a new start time on the same calendar.
    pub fn reschedule(&self, appointment_id: Uuid, new_start: DateTime<Utc>) -> Result<Appointment> {
        let store = self.engine.store();
        let current = self.active_appointment(appointment_id)?;
        let appointment_type = store.appointment_type(current.appointment_type_id)?;

        let end_at = self.ensure_bookable(
            current.doctor_id,
            current.calendar_id,
            new_start,
            &appointment_type,
            Some(current.id),
            self.clock.now(),
        )?;

        let updated = Appointment {
            start_at: new_start,
            end_at,
            ..current.clone()
        };
        let updated = store.replace_if_free(&current, updated, appointment_type.buffers())?;
        info!("appointment {} rescheduled to {}", updated.id, updated.start_at);
        Ok(updated)
    }

    /// Reassign an active appointment to another doctor/calendar, keeping its
    /// time. Only the new owner's timeline is checked for overlaps; the rules
    /// of the new owner are not consulted.
    pub fn transfer(
        &self,
        appointment_id: Uuid,
        to_doctor_id: Uuid,
        to_calendar_id: Uuid,
        reason: Option<String>,
    ) -> Result<Appointment> {
        let store = self.engine.store();
        let current = self.active_appointment(appointment_id)?;
        if current.doctor_id == to_doctor_id && current.calendar_id == to_calendar_id {
            return Err(EngineError::InvalidConfiguration(format!(
                "appointment {} is already owned by doctor {} calendar {}",
                appointment_id, to_doctor_id, to_calendar_id
            )));
        }

        let mut updated = current.clone();
        updated.transfers.push(TransferRecord {
            from_doctor_id: current.doctor_id,
            from_calendar_id: current.calendar_id,
            to_doctor_id,
            to_calendar_id,
            transferred_at: self.clock.now(),
            reason,
        });
        updated.doctor_id = to_doctor_id;
        updated.calendar_id = to_calendar_id;

        let buffers = store.appointment_type(current.appointment_type_id)?.buffers();
        let updated = store.replace_if_free(&current, updated, buffers)?;
        info!(
            "appointment {} transferred from doctor {} to doctor {}",
            updated.id, current.doctor_id, updated.doctor_id
        );
        Ok(updated)
    }

    /// Cancel an appointment, freeing its interval. Cancelling twice is a no-op.
    pub fn cancel(&self, appointment_id: Uuid) -> Result<Appointment> {
        let store = self.engine.store();
        let current = store.appointment(appointment_id)?;
        if !current.is_active() {
            return Ok(current);
        }
        let cancelled = Appointment {
            status: AppointmentStatus::Cancelled,
            cancelled_at: Some(self.clock.now()),
            ..current.clone()
        };
        let cancelled = store.replace_if_free(&current, cancelled, Buffers::none())?;
        info!("appointment {} cancelled", cancelled.id);
        Ok(cancelled)
    }

    fn active_appointment(&self, appointment_id: Uuid) -> Result<Appointment> {
        let appointment = self.engine.store().appointment(appointment_id)?;
        if !appointment.is_active() {
            return Err(EngineError::SlotUnavailable {
                doctor_id: appointment.doctor_id,
                start_at: appointment.start_at,
                reason: format!("appointment {} is cancelled", appointment_id),
            });
        }
        Ok(appointment)
    }

    /// Re-check the slot against the live store and return its end.
    ///
    /// A slot that fails because an active appointment overlaps its visible
    /// interval is reported as `OverlapDetected`; any other failure is
    /// `SlotUnavailable`.
    fn ensure_bookable(
        &self,
        doctor_id: Uuid,
        calendar_id: Uuid,
        start_at: DateTime<Utc>,
        appointment_type: &AppointmentType,
        ignore_appointment_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let unavailable = |reason: &str| EngineError::SlotUnavailable {
            doctor_id,
            start_at,
            reason: reason.to_string(),
        };

        if start_at < now {
            return Err(unavailable("slot starts in the past"));
        }
        if !appointment_type.is_active {
            return Err(unavailable("appointment type is inactive"));
        }
        appointment_type.validate()?;
        let end_at = start_at
            .checked_add_signed(appointment_type.duration())
            .ok_or_else(|| unavailable("slot ends outside the supported time range"))?;
        if self.engine.is_slot_available(
            doctor_id,
            calendar_id,
            start_at,
            appointment_type,
            ignore_appointment_id,
        )? {
            return Ok(end_at);
        }

        match self
            .engine
            .find_overlap(doctor_id, start_at, end_at, ignore_appointment_id)?
        {
            Some(conflict) => Err(EngineError::OverlapDetected {
                doctor_id,
                start_at,
                end_at,
                conflicting_id: conflict.appointment_id,
            }),
            None => Err(unavailable("slot is not offered by the doctor's availability")),
        }
    }
}
