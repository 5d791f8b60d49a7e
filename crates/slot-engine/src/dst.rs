//! DST transition policies for wall-clock availability windows.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Longest DST gap in the tz database is well under this.
const MAX_GAP_MINUTES: i64 = 180;

/// Policy for window boundaries that fall during DST transitions.
///
/// Ambiguous wall-clock times (the repeated hour when clocks fall back) always
/// resolve to the earliest instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Drop windows whose boundary falls in the DST gap (e.g. 02:30 during spring forward)
    Skip,
    /// Move the boundary to the first valid instant after the gap
    #[default]
    ShiftForward,
}

impl DstPolicy {
    /// Resolve a local wall-clock time in `tz` to a UTC instant.
    ///
    /// Returns `None` only when the time is inside a gap and the policy is `Skip`.
    pub fn resolve(self, tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        match tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => match self {
                DstPolicy::Skip => None,
                DstPolicy::ShiftForward => (1..=MAX_GAP_MINUTES).find_map(|m| {
                    let shifted = local.checked_add_signed(Duration::minutes(m))?;
                    tz.from_local_datetime(&shifted)
                        .earliest()
                        .map(|dt| dt.with_timezone(&Utc))
                }),
            },
        }
    }
}
