//! Availability queries over a doctor's calendar.
//!
//! [`AvailabilityEngine`] runs the full pipeline against a [`CalendarStore`]:
//!
//! 1. [`crate::expander`] turns weekly rules into candidate slots,
//! 2. [`crate::exceptions`] folds in one-off add/remove windows,
//! 3. [`crate::occupancy`] drops slots colliding with booked appointments,
//! 4. [`crate::assembler`] dedupes and sorts.
//!
//! Every call re-reads the store; there is no cache, so results always reflect
//! the current rules, exceptions and appointments.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::assembler::{assemble, merge_contiguous};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::exceptions::{apply_exceptions, exception_dates};
use crate::expander::expand_rules;
use crate::model::{AppointmentType, Slot, SlotBlock};
use crate::occupancy::{filter_occupied, find_conflict, occupancy_range, Conflict};
use crate::store::CalendarStore;

/// Read-only availability facade over a store.
#[derive(Debug)]
pub struct AvailabilityEngine<S> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S> Clone for AvailabilityEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

impl<S: CalendarStore> AvailabilityEngine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Bookable slots for `appointment_type` in `[from, to)`, deduped and
    /// sorted by start.
    ///
    /// An inactive or misconfigured appointment type, or one owned by another
    /// doctor/calendar, yields an empty list rather than an error.
    pub fn list_slots(
        &self,
        doctor_id: Uuid,
        calendar_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        appointment_type: &AppointmentType,
    ) -> Result<Vec<Slot>> {
        let slots = self.candidate_slots(doctor_id, calendar_id, from, to, appointment_type, None)?;
        Ok(assemble(slots))
    }

    /// [`list_slots`](Self::list_slots) folded into contiguous display blocks.
    pub fn list_slot_blocks(
        &self,
        doctor_id: Uuid,
        calendar_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        appointment_type: &AppointmentType,
    ) -> Result<Vec<SlotBlock>> {
        let slots = self.list_slots(doctor_id, calendar_id, from, to, appointment_type)?;
        Ok(merge_contiguous(&slots))
    }

    /// Whether the exact slot `[start_at, start_at + duration)` is bookable now.
    ///
    /// Runs the same pipeline as [`list_slots`](Self::list_slots) restricted to
    /// that one interval. `ignore_appointment_id` lets an appointment being
    /// rescheduled not block its own slot.
    pub fn is_slot_available(
        &self,
        doctor_id: Uuid,
        calendar_id: Uuid,
        start_at: DateTime<Utc>,
        appointment_type: &AppointmentType,
        ignore_appointment_id: Option<Uuid>,
    ) -> Result<bool> {
        if let Err(e) = appointment_type.validate() {
            warn!("slot check skipped: {}", e);
            return Ok(false);
        }
        let Some(end_at) = start_at.checked_add_signed(appointment_type.duration()) else {
            return Ok(false);
        };
        let requested = Slot::new(start_at, end_at);
        let slots = self.candidate_slots(
            doctor_id,
            calendar_id,
            requested.start,
            requested.end,
            appointment_type,
            ignore_appointment_id,
        )?;
        let available = assemble(slots).contains(&requested);
        debug!(
            "slot [{}, {}) for doctor {} available: {}",
            requested.start, requested.end, doctor_id, available
        );
        Ok(available)
    }

    /// Whether any non-cancelled appointment of the doctor overlaps
    /// `[start_at, end_at)`. Independent of rules and exceptions.
    pub fn has_overlap(
        &self,
        doctor_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        ignore_id: Option<Uuid>,
    ) -> Result<bool> {
        Ok(self.find_overlap(doctor_id, start_at, end_at, ignore_id)?.is_some())
    }

    /// The first appointment overlapping `[start_at, end_at)`, if any.
    pub fn find_overlap(
        &self,
        doctor_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        ignore_id: Option<Uuid>,
    ) -> Result<Option<Conflict>> {
        let appointments = self.store.appointments_in_range(doctor_id, start_at, end_at)?;
        Ok(find_conflict(&appointments, doctor_id, start_at, end_at, ignore_id))
    }

    fn candidate_slots(
        &self,
        doctor_id: Uuid,
        calendar_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        appointment_type: &AppointmentType,
        ignore_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Slot>> {
        if from >= to {
            return Ok(Vec::new());
        }
        if appointment_type.doctor_id != doctor_id || appointment_type.calendar_id != calendar_id {
            warn!(
                "appointment type {} does not belong to doctor {} calendar {}",
                appointment_type.code, doctor_id, calendar_id
            );
            return Ok(Vec::new());
        }
        if !appointment_type.is_active {
            debug!("appointment type {} is inactive", appointment_type.code);
            return Ok(Vec::new());
        }
        if let Err(e) = appointment_type.validate() {
            warn!("no slots generated: {}", e);
            return Ok(Vec::new());
        }

        let rules = self.store.rules_for(doctor_id, calendar_id)?;
        let slots = expand_rules(&rules, from, to, appointment_type, &self.config);

        let span = exception_dates(from, to, appointment_type, &self.config);
        let slots = match (span.first(), span.last()) {
            (Some(first), Some(last)) => {
                let exceptions =
                    self.store
                        .exceptions_between(doctor_id, calendar_id, *first, *last)?;
                apply_exceptions(slots, &exceptions, from, to, appointment_type, &self.config)
            }
            _ => slots,
        };

        let (busy_from, busy_to) = occupancy_range(from, to, appointment_type);
        let appointments = self.store.appointments_in_range(doctor_id, busy_from, busy_to)?;
        Ok(filter_occupied(
            slots,
            &appointments,
            appointment_type,
            ignore_appointment_id,
        ))
    }
}
