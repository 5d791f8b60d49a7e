//! Apply one-off date exceptions to expanded slots.
//!
//! All `add` exceptions are sliced and folded in first; all `remove`
//! exceptions are then applied as a filter over the accumulated list. A
//! removal therefore also wins over slots injected by an `add` on the same
//! date, regardless of the order the exceptions arrive in.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::expander::{clip_to_range, local_date_span, resolve_window, slice_window, Window};
use crate::interval::overlaps;
use crate::model::{AppointmentType, AvailabilityException, ExceptionKind, Slot};
use crate::occupancy::occupancy_range;

/// Reference-zone dates whose exceptions can affect slots in `[from, to)`.
///
/// A slot's buffers may reach past either end of the range, and a `remove`
/// window on the neighbouring date still collides with them.
pub fn exception_dates(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    appointment_type: &AppointmentType,
    config: &EngineConfig,
) -> Vec<NaiveDate> {
    if from >= to {
        return Vec::new();
    }
    let (reach_from, reach_to) = occupancy_range(from, to, appointment_type);
    local_date_span(reach_from, reach_to, config.reference_timezone)
}

/// Fold `exceptions` into `slots` for the query range `[from, to)`.
///
/// Exceptions dated outside [`exception_dates`] are ignored. Exceptions are
/// interpreted in the config's reference timezone; `add` windows only
/// contribute slots that lie inside `[from, to)`.
pub fn apply_exceptions(
    mut slots: Vec<Slot>,
    exceptions: &[AvailabilityException],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    appointment_type: &AppointmentType,
    config: &EngineConfig,
) -> Vec<Slot> {
    let tz = config.reference_timezone;
    let span = exception_dates(from, to, appointment_type, config);

    let mut removals: Vec<Window> = Vec::new();
    for exception in exceptions.iter().filter(|e| span.contains(&e.date)) {
        if let Err(e) = exception.validate() {
            warn!("skipping exception: {}", e);
            continue;
        }
        let Some(window) = resolve_window(
            exception.date,
            exception.start_time,
            exception.end_time,
            tz,
            config.dst_policy,
        ) else {
            continue;
        };
        match exception.kind {
            ExceptionKind::Add => {
                slots.extend(clip_to_range(slice_window(window, appointment_type), from, to));
            }
            ExceptionKind::Remove => removals.push(window),
        }
    }

    if removals.is_empty() {
        return slots;
    }

    let buffers = appointment_type.buffers();
    let total = slots.len();
    slots.retain(|slot| {
        let (start, end) = buffers.around(slot.start, slot.end);
        !removals.iter().any(|w| overlaps(start, end, w.start, w.end))
    });
    debug!(
        "remove exceptions dropped {} of {} slots",
        total - slots.len(),
        total
    );
    slots
}
