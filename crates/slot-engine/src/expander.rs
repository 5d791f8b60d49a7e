//! Rule expansion -- converts weekly availability rules into concrete slots.
//!
//! A rule is matched against every local calendar date touched by the query
//! range. Each matching date yields one wall-clock window, which is resolved to
//! UTC (see [`crate::dst`]) and cut into fixed-length slots by
//! [`slice_window`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::dst::DstPolicy;
use crate::interval::contains;
use crate::model::{AppointmentType, AvailabilityRule, Slot};

/// A resolved availability window in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Every local date in `tz` from the day containing `from` to the day
/// containing `to`, inclusive.
pub fn local_date_span(from: DateTime<Utc>, to: DateTime<Utc>, tz: Tz) -> Vec<NaiveDate> {
    if from >= to {
        return Vec::new();
    }
    let first = from.with_timezone(&tz).date_naive();
    let last = to.with_timezone(&tz).date_naive();
    first.iter_days().take_while(|d| *d <= last).collect()
}

/// Resolve a wall-clock `[start_time, end_time)` on `date` to a UTC window.
///
/// An `end_time` of midnight ends the window at the start of the next day.
/// Returns `None` when the policy drops a boundary that falls in a DST gap, or
/// when the resolved window is empty.
pub fn resolve_window(
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    tz: Tz,
    policy: DstPolicy,
) -> Option<Window> {
    let end_date = if end_time == NaiveTime::MIN {
        date.succ_opt()?
    } else {
        date
    };
    let start = policy.resolve(tz, date.and_time(start_time))?;
    let end = policy.resolve(tz, end_date.and_time(end_time))?;
    (start < end).then_some(Window { start, end })
}

/// Cut a window into back-to-back slots of the appointment type's duration.
///
/// Slots start at `window.start, window.start + L, ...` while the slot still
/// fits. A slot whose buffered range escapes the window is dropped, never
/// shifted, so buffers cannot leak into time outside the window.
pub fn slice_window(window: Window, appointment_type: &AppointmentType) -> Vec<Slot> {
    if let Err(e) = appointment_type.validate() {
        warn!("not slicing window: {}", e);
        return Vec::new();
    }

    let length = appointment_type.duration();
    let buffers = appointment_type.buffers();

    let mut slots = Vec::new();
    let mut slot_start = window.start;
    while let Some(slot_end) = slot_start
        .checked_add_signed(length)
        .filter(|end| *end <= window.end)
    {
        let (buffered_start, buffered_end) = buffers.around(slot_start, slot_end);
        if contains(window.start, window.end, buffered_start, buffered_end) {
            slots.push(Slot::new(slot_start, slot_end));
        }
        slot_start = slot_end;
    }
    slots
}

/// Keep only slots whose unbuffered range lies inside `[from, to)`.
pub(crate) fn clip_to_range(slots: Vec<Slot>, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Slot> {
    slots
        .into_iter()
        .filter(|s| contains(from, to, s.start, s.end))
        .collect()
}

/// Expand every rule into candidate slots for the query range `[from, to)`.
///
/// Rules that fail validation contribute nothing; the rest of the calendar is
/// still expanded. Output is unsorted and may contain duplicates when rules
/// overlap -- see [`crate::assembler`].
pub fn expand_rules(
    rules: &[AvailabilityRule],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    appointment_type: &AppointmentType,
    config: &EngineConfig,
) -> Vec<Slot> {
    let mut slots = Vec::new();

    for rule in rules {
        if let Err(e) = rule.validate() {
            warn!("skipping rule: {}", e);
            continue;
        }

        let tz = rule.timezone.unwrap_or(config.reference_timezone);
        for date in local_date_span(from, to, tz) {
            if !rule.applies_on(date) {
                continue;
            }
            let Some(window) =
                resolve_window(date, rule.start_time, rule.end_time, tz, config.dst_policy)
            else {
                debug!("rule {} window on {} dropped by DST policy", rule.id, date);
                continue;
            };
            slots.extend(clip_to_range(slice_window(window, appointment_type), from, to));
        }
    }

    debug!(
        "expanded {} rules into {} candidate slots",
        rules.len(),
        slots.len()
    );
    slots
}
