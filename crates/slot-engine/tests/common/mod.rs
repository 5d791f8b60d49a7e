//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use slot_engine::{
    Appointment, AppointmentStatus, AppointmentType, AvailabilityEngine, AvailabilityException,
    AvailabilityRule, CalendarSnapshot, EngineConfig, ExceptionKind, InMemoryStore, PatientInfo,
};
use uuid::Uuid;

pub const MONDAY: u8 = 1;
pub const SUNDAY: u8 = 0;

pub fn doctor() -> Uuid {
    Uuid::from_u128(0xD0C)
}

pub fn other_doctor() -> Uuid {
    Uuid::from_u128(0xD0D)
}

pub fn calendar() -> Uuid {
    Uuid::from_u128(0xCA1)
}

pub fn other_calendar() -> Uuid {
    Uuid::from_u128(0xCA2)
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0).unwrap()
}

/// Monday 2026-03-16 at the given UTC wall-clock time.
pub fn monday(hour: u32, min: u32) -> DateTime<Utc> {
    utc(2026, 3, 16, hour, min)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

pub fn rule(day_of_week: u8, start: &str, end: &str) -> AvailabilityRule {
    AvailabilityRule {
        id: Uuid::new_v4(),
        doctor_id: doctor(),
        calendar_id: calendar(),
        day_of_week,
        start_time: time(start),
        end_time: time(end),
        valid_from: None,
        valid_to: None,
        timezone: None,
    }
}

pub fn exception(on: NaiveDate, kind: ExceptionKind, start: &str, end: &str) -> AvailabilityException {
    AvailabilityException {
        id: Uuid::new_v4(),
        doctor_id: doctor(),
        calendar_id: calendar(),
        date: on,
        kind,
        start_time: time(start),
        end_time: time(end),
        reason: None,
    }
}

pub fn appointment_type(duration: i64, before: i64, after: i64) -> AppointmentType {
    AppointmentType {
        id: Uuid::new_v4(),
        doctor_id: doctor(),
        calendar_id: calendar(),
        specialty_id: None,
        code: format!("consult-{}-{}-{}", duration, before, after),
        label: "Consultation".to_string(),
        duration_minutes: duration,
        buffer_before_minutes: before,
        buffer_after_minutes: after,
        is_active: true,
    }
}

pub fn booked(start: DateTime<Utc>, end: DateTime<Utc>) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        calendar_id: calendar(),
        doctor_id: doctor(),
        specialty_id: None,
        appointment_type_id: Uuid::new_v4(),
        start_at: start,
        end_at: end,
        status: AppointmentStatus::Booked,
        patient: PatientInfo::new("Ada Patient"),
        transfers: Vec::new(),
        created_at: utc(2026, 1, 1, 0, 0),
        cancelled_at: None,
    }
}

pub fn engine(snapshot: CalendarSnapshot) -> AvailabilityEngine<InMemoryStore> {
    engine_with_config(snapshot, EngineConfig::default())
}

pub fn engine_with_config(
    snapshot: CalendarSnapshot,
    config: EngineConfig,
) -> AvailabilityEngine<InMemoryStore> {
    let store = InMemoryStore::from_snapshot(snapshot).expect("fixture snapshot must be valid");
    AvailabilityEngine::new(Arc::new(store), config)
}

/// Start times of `slots` as `HH:MM` in UTC, for compact assertions.
pub fn starts(slots: &[slot_engine::Slot]) -> Vec<String> {
    slots
        .iter()
        .map(|s| s.start.format("%H:%M").to_string())
        .collect()
}
