//! Tests for applying one-off add/remove exceptions.

mod common;

use common::*;
use slot_engine::exceptions::apply_exceptions;
use slot_engine::expander::expand_rules;
use slot_engine::{EngineConfig, ExceptionKind, Slot};

fn monday_slots(duration: i64, before: i64, after: i64) -> Vec<Slot> {
    expand_rules(
        &[rule(MONDAY, "09:00", "12:00")],
        monday(0, 0),
        utc(2026, 3, 17, 0, 0),
        &appointment_type(duration, before, after),
        &EngineConfig::default(),
    )
}

fn apply(
    slots: Vec<Slot>,
    exceptions: &[slot_engine::AvailabilityException],
    duration: i64,
    before: i64,
    after: i64,
) -> Vec<Slot> {
    apply_exceptions(
        slots,
        exceptions,
        monday(0, 0),
        utc(2026, 3, 17, 0, 0),
        &appointment_type(duration, before, after),
        &EngineConfig::default(),
    )
}

#[test]
fn remove_exception_drops_exactly_the_covered_slot() {
    let removal = exception(date(2026, 3, 16), ExceptionKind::Remove, "10:00", "10:30");
    let slots = apply(monday_slots(30, 0, 0), &[removal], 30, 0, 0);
    assert_eq!(
        starts(&slots),
        vec!["09:00", "09:30", "10:30", "11:00", "11:30"]
    );
}

#[test]
fn partial_overlap_removes_whole_slot() {
    // 10:15-10:20 only clips the 10:00 slot, but the whole slot goes.
    let removal = exception(date(2026, 3, 16), ExceptionKind::Remove, "10:15", "10:20");
    let slots = apply(monday_slots(30, 0, 0), &[removal], 30, 0, 0);
    assert!(!starts(&slots).contains(&"10:00".to_string()));
    assert_eq!(slots.len(), 5);
}

#[test]
fn remove_checks_buffered_range() {
    // With 10-minute buffers, the 10:00 slot occupies [09:50, 10:40); a removal
    // at 10:35-10:45 collides with its trailing buffer.
    let removal = exception(date(2026, 3, 16), ExceptionKind::Remove, "10:35", "10:45");
    let before = monday_slots(30, 10, 10);
    assert!(starts(&before).contains(&"10:00".to_string()));

    let after = apply(before, &[removal], 30, 10, 10);
    assert!(!starts(&after).contains(&"10:00".to_string()));
}

#[test]
fn add_exception_injects_slots_outside_rule_hours() {
    let extra = exception(date(2026, 3, 16), ExceptionKind::Add, "14:00", "15:00");
    let slots = apply(monday_slots(30, 0, 0), &[extra], 30, 0, 0);
    assert_eq!(slots.len(), 8);
    assert!(slots.contains(&Slot::new(monday(14, 0), monday(14, 30))));
    assert!(slots.contains(&Slot::new(monday(14, 30), monday(15, 0))));
}

#[test]
fn add_exception_respects_buffers() {
    let extra = exception(date(2026, 3, 16), ExceptionKind::Add, "14:00", "15:00");
    let slots = apply(Vec::new(), &[extra], 30, 10, 10);
    // Slicing starts at 14:00 and is never shifted: 14:00 ([13:50,14:40)) and
    // 14:30 ([14:20,15:10)) both escape the window.
    assert!(slots.is_empty());
}

#[test]
fn remove_wins_over_add_on_same_window() {
    let add = exception(date(2026, 3, 16), ExceptionKind::Add, "14:00", "15:00");
    let remove = exception(date(2026, 3, 16), ExceptionKind::Remove, "14:00", "15:00");

    let remove_first = apply(Vec::new(), &[remove.clone(), add.clone()], 30, 0, 0);
    let add_first = apply(Vec::new(), &[add, remove], 30, 0, 0);

    assert!(remove_first.is_empty());
    assert!(add_first.is_empty());
}

#[test]
fn exceptions_on_other_dates_are_ignored() {
    let removal = exception(date(2026, 3, 23), ExceptionKind::Remove, "09:00", "12:00");
    let slots = apply(monday_slots(30, 0, 0), &[removal], 30, 0, 0);
    assert_eq!(slots.len(), 6);
}

#[test]
fn malformed_exception_is_skipped() {
    let inverted = exception(date(2026, 3, 16), ExceptionKind::Remove, "11:00", "09:00");
    let slots = apply(monday_slots(30, 0, 0), &[inverted], 30, 0, 0);
    assert_eq!(slots.len(), 6);
}
