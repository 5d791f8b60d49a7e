//! Detect collisions between candidate slots and booked appointments.
//!
//! A slot collides when its *buffered* range overlaps the raw
//! `[start_at, end_at)` of any non-cancelled appointment. Adjacent intervals
//! (where one ends exactly when another starts) are NOT conflicts.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::interval::{overlap_minutes, overlaps};
use crate::model::{Appointment, AppointmentType, Slot};

/// A booked appointment that blocks a requested interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub appointment_id: Uuid,
    pub overlap_minutes: i64,
}

/// The range appointments must be fetched for so that buffered slots in
/// `[from, to)` can be checked: `[from - buffer_before, to + buffer_after)`.
pub fn occupancy_range(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    appointment_type: &AppointmentType,
) -> (DateTime<Utc>, DateTime<Utc>) {
    appointment_type.buffers().around(from, to)
}

/// Whether `appointment` counts against the doctor's timeline for this check.
fn blocks(appointment: &Appointment, ignore_id: Option<Uuid>) -> bool {
    appointment.is_active() && Some(appointment.id) != ignore_id
}

/// First active appointment of `doctor_id` overlapping `[start, end)`.
///
/// `ignore_id` excludes the appointment being edited so that it does not
/// conflict with its own prior record.
pub fn find_conflict(
    appointments: &[Appointment],
    doctor_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ignore_id: Option<Uuid>,
) -> Option<Conflict> {
    appointments
        .iter()
        .filter(|a| a.doctor_id == doctor_id && blocks(a, ignore_id))
        .find(|a| overlaps(start, end, a.start_at, a.end_at))
        .map(|a| Conflict {
            appointment_id: a.id,
            overlap_minutes: overlap_minutes(start, end, a.start_at, a.end_at),
        })
}

/// Drop every slot whose buffered range overlaps an active appointment.
pub fn filter_occupied(
    slots: Vec<Slot>,
    appointments: &[Appointment],
    appointment_type: &AppointmentType,
    ignore_id: Option<Uuid>,
) -> Vec<Slot> {
    let busy: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| blocks(a, ignore_id))
        .collect();
    if busy.is_empty() {
        return slots;
    }

    let buffers = appointment_type.buffers();
    let total = slots.len();
    let free: Vec<Slot> = slots
        .into_iter()
        .filter(|slot| {
            let (start, end) = buffers.around(slot.start, slot.end);
            !busy
                .iter()
                .any(|a| overlaps(start, end, a.start_at, a.end_at))
        })
        .collect();
    debug!(
        "{} booked appointments removed {} of {} slots",
        busy.len(),
        total - free.len(),
        total
    );
    free
}
