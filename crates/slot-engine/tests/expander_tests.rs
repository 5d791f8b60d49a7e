//! Tests for rule expansion and the window slicer.

mod common;

use chrono_tz::Tz;
use common::*;
use slot_engine::expander::{expand_rules, local_date_span, slice_window, Window};
use slot_engine::{DstPolicy, EngineConfig};

fn week() -> (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) {
    (utc(2026, 3, 16, 0, 0), utc(2026, 3, 23, 0, 0))
}

// ── Window slicer ───────────────────────────────────────────────────────────

#[test]
fn slicer_packs_slots_from_window_open() {
    let window = Window {
        start: monday(9, 0),
        end: monday(12, 0),
    };
    let slots = slice_window(window, &appointment_type(30, 0, 0));
    assert_eq!(
        starts(&slots),
        vec!["09:00", "09:30", "10:00", "10:30", "11:00", "11:30"]
    );
    assert!(slots.iter().all(|s| s.duration_minutes() == 30));
}

#[test]
fn slicer_drops_trailing_partial_slot() {
    let window = Window {
        start: monday(9, 0),
        end: monday(10, 15),
    };
    let slots = slice_window(window, &appointment_type(30, 0, 0));
    assert_eq!(starts(&slots), vec!["09:00", "09:30"]);
}

#[test]
fn slicer_discards_slots_whose_buffers_escape_the_window() {
    let window = Window {
        start: monday(9, 0),
        end: monday(12, 0),
    };
    let slots = slice_window(window, &appointment_type(30, 10, 10));
    // 09:00 → [08:50, 09:40) escapes the open; 11:30 → [11:20, 12:10) escapes the close.
    assert_eq!(starts(&slots), vec!["09:30", "10:00", "10:30", "11:00"]);
}

#[test]
fn slicer_yields_nothing_for_non_positive_duration() {
    let window = Window {
        start: monday(9, 0),
        end: monday(12, 0),
    };
    assert!(slice_window(window, &appointment_type(0, 0, 0)).is_empty());
    assert!(slice_window(window, &appointment_type(-15, 0, 0)).is_empty());
}

#[test]
fn slicer_yields_nothing_for_negative_buffer() {
    let window = Window {
        start: monday(9, 0),
        end: monday(12, 0),
    };
    assert!(slice_window(window, &appointment_type(30, -5, 0)).is_empty());
}

// ── Rule expansion ──────────────────────────────────────────────────────────

#[test]
fn monday_rule_without_buffers_produces_six_slots() {
    let (from, to) = week();
    let slots = expand_rules(
        &[rule(MONDAY, "09:00", "12:00")],
        from,
        to,
        &appointment_type(30, 0, 0),
        &EngineConfig::default(),
    );
    assert_eq!(slots.len(), 6);
    assert_eq!(slots[0].start, monday(9, 0));
    assert_eq!(slots[5].start, monday(11, 30));
    assert!(slots.iter().all(|s| s.start != monday(12, 0)));
}

#[test]
fn rule_ending_at_midnight_fills_the_evening() {
    let (from, to) = week();
    let slots = expand_rules(
        &[rule(MONDAY, "22:00", "00:00")],
        from,
        to,
        &appointment_type(30, 0, 0),
        &EngineConfig::default(),
    );
    assert_eq!(starts(&slots), vec!["22:00", "22:30", "23:00", "23:30"]);
    assert_eq!(slots[3].end, utc(2026, 3, 17, 0, 0));
}

#[test]
fn monday_rule_with_buffers_excludes_window_open() {
    let (from, to) = week();
    let slots = expand_rules(
        &[rule(MONDAY, "09:00", "12:00")],
        from,
        to,
        &appointment_type(30, 10, 10),
        &EngineConfig::default(),
    );
    assert!(slots.iter().all(|s| s.start != monday(9, 0)));
    assert_eq!(slots[0].start, monday(9, 30));
}

#[test]
fn rule_only_matches_its_weekday() {
    let (from, to) = week();
    let slots = expand_rules(
        &[rule(3, "09:00", "10:00")],
        from,
        to,
        &appointment_type(60, 0, 0),
        &EngineConfig::default(),
    );
    // Wednesday 2026-03-18 only.
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, utc(2026, 3, 18, 9, 0));
}

#[test]
fn validity_window_bounds_are_inclusive() {
    let mut r = rule(MONDAY, "09:00", "10:00");
    r.valid_from = Some(date(2026, 3, 23));
    r.valid_to = Some(date(2026, 3, 30));

    let slots = expand_rules(
        &[r],
        utc(2026, 3, 16, 0, 0),
        utc(2026, 4, 7, 0, 0),
        &appointment_type(60, 0, 0),
        &EngineConfig::default(),
    );
    let days: Vec<_> = slots.iter().map(|s| s.start.date_naive()).collect();
    assert_eq!(days, vec![date(2026, 3, 23), date(2026, 3, 30)]);
}

#[test]
fn slots_outside_query_range_are_clipped() {
    // Query 10:00-11:00 on Monday: only slots fully inside survive.
    let slots = expand_rules(
        &[rule(MONDAY, "09:00", "12:00")],
        monday(10, 0),
        monday(11, 0),
        &appointment_type(30, 0, 0),
        &EngineConfig::default(),
    );
    assert_eq!(starts(&slots), vec!["10:00", "10:30"]);
}

#[test]
fn slot_straddling_query_end_is_excluded() {
    let slots = expand_rules(
        &[rule(MONDAY, "09:00", "12:00")],
        monday(9, 0),
        monday(9, 45),
        &appointment_type(30, 0, 0),
        &EngineConfig::default(),
    );
    assert_eq!(starts(&slots), vec!["09:00"]);
}

#[test]
fn invalid_rule_is_skipped_without_breaking_others() {
    let broken = rule(MONDAY, "12:00", "09:00");
    let out_of_range = rule(9, "09:00", "10:00");
    let good = rule(MONDAY, "14:00", "15:00");
    let (from, to) = week();

    let slots = expand_rules(
        &[broken, out_of_range, good],
        from,
        to,
        &appointment_type(30, 0, 0),
        &EngineConfig::default(),
    );
    assert_eq!(starts(&slots), vec!["14:00", "14:30"]);
}

#[test]
fn empty_query_range_yields_nothing() {
    let slots = expand_rules(
        &[rule(MONDAY, "09:00", "12:00")],
        monday(12, 0),
        monday(9, 0),
        &appointment_type(30, 0, 0),
        &EngineConfig::default(),
    );
    assert!(slots.is_empty());
}

// ── Timezones ───────────────────────────────────────────────────────────────

#[test]
fn local_date_span_uses_wall_clock_dates() {
    // 12:00Z-18:00Z on Sunday 15th is 21:00 Sun → 03:00 Mon in Tokyo.
    let span = local_date_span(
        utc(2026, 3, 15, 12, 0),
        utc(2026, 3, 15, 18, 0),
        Tz::Asia__Tokyo,
    );
    assert_eq!(span, vec![date(2026, 3, 15), date(2026, 3, 16)]);
}

#[test]
fn weekday_matching_happens_in_reference_zone() {
    // Monday 00:00-01:00 in Tokyo is Sunday 15:00-16:00 UTC.
    let config = EngineConfig::new(Tz::Asia__Tokyo);
    let slots = expand_rules(
        &[rule(MONDAY, "00:00", "01:00")],
        utc(2026, 3, 15, 12, 0),
        utc(2026, 3, 15, 18, 0),
        &appointment_type(60, 0, 0),
        &config,
    );
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, utc(2026, 3, 15, 15, 0));
}

#[test]
fn rule_timezone_overrides_reference_zone() {
    let mut r = rule(MONDAY, "09:00", "10:00");
    r.timezone = Some(Tz::Europe__Berlin);
    let (from, to) = week();

    let slots = expand_rules(
        &[r],
        from,
        to,
        &appointment_type(60, 0, 0),
        &EngineConfig::new(Tz::America__New_York),
    );
    // Berlin is UTC+1 in mid-March.
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, monday(8, 0));
}

#[test]
fn window_across_spring_forward_is_measured_in_real_minutes() {
    // 2026-03-08 US spring forward: 01:00 EST (06:00Z) → 04:00 EDT (08:00Z).
    let config = EngineConfig::new(Tz::America__New_York);
    let slots = expand_rules(
        &[rule(SUNDAY, "01:00", "04:00")],
        utc(2026, 3, 8, 0, 0),
        utc(2026, 3, 9, 0, 0),
        &appointment_type(60, 0, 0),
        &config,
    );
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].start, utc(2026, 3, 8, 6, 0));
    assert_eq!(slots[1].start, utc(2026, 3, 8, 7, 0));
}

#[test]
fn window_opening_in_dst_gap_shifts_forward_by_default() {
    let config = EngineConfig::new(Tz::America__New_York);
    let slots = expand_rules(
        &[rule(SUNDAY, "02:30", "04:00")],
        utc(2026, 3, 8, 0, 0),
        utc(2026, 3, 9, 0, 0),
        &appointment_type(60, 0, 0),
        &config,
    );
    // Opens at 03:00 EDT (07:00Z), closes 04:00 EDT (08:00Z).
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, utc(2026, 3, 8, 7, 0));
}

#[test]
fn window_opening_in_dst_gap_is_dropped_with_skip_policy() {
    let config = EngineConfig {
        reference_timezone: Tz::America__New_York,
        dst_policy: DstPolicy::Skip,
    };
    let slots = expand_rules(
        &[rule(SUNDAY, "02:30", "04:00")],
        utc(2026, 3, 8, 0, 0),
        utc(2026, 3, 9, 0, 0),
        &appointment_type(60, 0, 0),
        &config,
    );
    assert!(slots.is_empty());
}

#[test]
fn ambiguous_fall_back_time_resolves_to_earliest_instant() {
    // 2026-11-01 US fall back: 01:30 happens twice; the first is EDT (05:30Z).
    let config = EngineConfig::new(Tz::America__New_York);
    let slots = expand_rules(
        &[rule(SUNDAY, "01:30", "02:00")],
        utc(2026, 11, 1, 0, 0),
        utc(2026, 11, 2, 0, 0),
        &appointment_type(30, 0, 0),
        &config,
    );
    // Window [05:30Z, 07:00Z) since 02:00 is EST (07:00Z).
    assert_eq!(slots.first().map(|s| s.start), Some(utc(2026, 11, 1, 5, 30)));
    assert_eq!(slots.len(), 3);
}
