//! Half-open interval helpers.
//!
//! Every range in the engine is `[start, end)`. Adjacent ranges (where one ends
//! exactly when the other starts) do NOT overlap.

use chrono::{DateTime, Duration, Utc};

/// Two intervals overlap iff `a_start < b_end && b_start < a_end`.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Widen a slot by its buffers, giving the footprint it occupies for collision
/// purposes. Saturates at the ends of the representable range.
pub fn buffered_range(
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
    before: Duration,
    after: Duration,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        slot_start
            .checked_sub_signed(before)
            .unwrap_or(DateTime::<Utc>::MIN_UTC),
        slot_end
            .checked_add_signed(after)
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    )
}

/// Dead time kept free on either side of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buffers {
    pub before: Duration,
    pub after: Duration,
}

impl Buffers {
    pub fn new(before: Duration, after: Duration) -> Self {
        Self { before, after }
    }

    pub fn none() -> Self {
        Self::new(Duration::zero(), Duration::zero())
    }

    /// The buffered footprint of `[start, end)`.
    pub fn around(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        buffered_range(start, end, self.before, self.after)
    }
}

/// True when `[inner_start, inner_end)` lies entirely inside `[outer_start, outer_end)`.
pub fn contains(
    outer_start: DateTime<Utc>,
    outer_end: DateTime<Utc>,
    inner_start: DateTime<Utc>,
    inner_end: DateTime<Utc>,
) -> bool {
    outer_start <= inner_start && inner_end <= outer_end
}

/// Length of the intersection in whole minutes, or 0 when the ranges are disjoint.
pub fn overlap_minutes(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> i64 {
    if !overlaps(a_start, a_end, b_start, b_end) {
        return 0;
    }
    (a_end.min(b_end) - a_start.max(b_start)).num_minutes()
}
