//! `slots` CLI — query appointment availability from a JSON calendar snapshot.
//!
//! ## Usage
//!
//! ```sh
//! # List bookable slots for an appointment type (snapshot on stdin)
//! slots list --type <TYPE_ID> --from 2026-03-16T00:00:00Z --to 2026-03-17T00:00:00Z < calendar.json
//!
//! # Same, folded into contiguous blocks, reading the snapshot from a file
//! slots blocks -i calendar.json --type <TYPE_ID> --from ... --to ...
//!
//! # Is one exact slot still bookable?
//! slots check -i calendar.json --type <TYPE_ID> --start 2026-03-16T10:00:00Z
//!
//! # Does any booking of the doctor overlap an interval?
//! slots overlap -i calendar.json --doctor <DOCTOR_ID> --start ... --end ...
//!
//! # Interpret rules in a specific wall-clock zone
//! slots --timezone Europe/Berlin list ...
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use slot_engine::store::AppointmentTypeRepository;
use slot_engine::{
    AppointmentType, AvailabilityEngine, CalendarSnapshot, DstPolicy, EngineConfig, InMemoryStore,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Appointment availability queries over a calendar snapshot"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Reference IANA timezone for rules and exceptions (overrides SLOT_ENGINE_TIMEZONE)
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// How to treat window boundaries inside a DST gap
    #[arg(long, global = true, value_enum)]
    dst_policy: Option<DstArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DstArg {
    Skip,
    ShiftForward,
}

impl From<DstArg> for DstPolicy {
    fn from(arg: DstArg) -> Self {
        match arg {
            DstArg::Skip => DstPolicy::Skip,
            DstArg::ShiftForward => DstPolicy::ShiftForward,
        }
    }
}

#[derive(Args)]
struct SnapshotArgs {
    /// Calendar snapshot JSON file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
}

#[derive(Args)]
struct RangeArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,
    /// Appointment type id; doctor and calendar are taken from the type
    #[arg(long = "type")]
    appointment_type: Uuid,
    /// Range start (RFC 3339)
    #[arg(long)]
    from: DateTime<Utc>,
    /// Range end, exclusive (RFC 3339)
    #[arg(long)]
    to: DateTime<Utc>,
}

#[derive(Subcommand)]
enum Commands {
    /// List bookable slots in [from, to)
    List(RangeArgs),
    /// List bookable slots merged into contiguous blocks
    Blocks(RangeArgs),
    /// Check whether one exact slot is bookable
    Check {
        #[command(flatten)]
        snapshot: SnapshotArgs,
        /// Appointment type id
        #[arg(long = "type")]
        appointment_type: Uuid,
        /// Slot start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// Appointment to ignore (the one being rescheduled)
        #[arg(long)]
        ignore: Option<Uuid>,
    },
    /// Check whether any booking of a doctor overlaps [start, end)
    Overlap {
        #[command(flatten)]
        snapshot: SnapshotArgs,
        #[arg(long)]
        doctor: Uuid,
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
        /// Appointment to ignore
        #[arg(long)]
        ignore: Option<Uuid>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(cli.timezone.as_deref(), cli.dst_policy)?;
    debug!("using reference timezone {}", config.reference_timezone);

    let output = match cli.command {
        Commands::List(args) => {
            let (engine, ty) = load(&args.snapshot, args.appointment_type, config)?;
            let slots = engine.list_slots(ty.doctor_id, ty.calendar_id, args.from, args.to, &ty)?;
            serde_json::to_value(slots)?
        }
        Commands::Blocks(args) => {
            let (engine, ty) = load(&args.snapshot, args.appointment_type, config)?;
            let blocks =
                engine.list_slot_blocks(ty.doctor_id, ty.calendar_id, args.from, args.to, &ty)?;
            serde_json::to_value(blocks)?
        }
        Commands::Check {
            snapshot,
            appointment_type,
            start,
            ignore,
        } => {
            let (engine, ty) = load(&snapshot, appointment_type, config)?;
            let available =
                engine.is_slot_available(ty.doctor_id, ty.calendar_id, start, &ty, ignore)?;
            json!({
                "start": start,
                "end": start.checked_add_signed(ty.duration()),
                "available": available,
            })
        }
        Commands::Overlap {
            snapshot,
            doctor,
            start,
            end,
            ignore,
        } => {
            if start >= end {
                bail!("--start must be before --end");
            }
            let engine = AvailabilityEngine::new(Arc::new(read_store(&snapshot)?), config);
            let conflict = engine.find_overlap(doctor, start, end, ignore)?;
            json!({
                "overlap": conflict.is_some(),
                "conflicting_id": conflict.as_ref().map(|c| c.appointment_id),
                "overlap_minutes": conflict.map(|c| c.overlap_minutes).unwrap_or(0),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Environment first, then command-line overrides.
fn build_config(timezone: Option<&str>, dst_policy: Option<DstArg>) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env();
    if let Some(name) = timezone {
        config.reference_timezone = name
            .parse::<Tz>()
            .map_err(|_| anyhow::anyhow!("Unknown timezone: '{}'", name))?;
    }
    if let Some(policy) = dst_policy {
        config.dst_policy = policy.into();
    }
    Ok(config)
}

fn load(
    snapshot: &SnapshotArgs,
    appointment_type_id: Uuid,
    config: EngineConfig,
) -> Result<(AvailabilityEngine<InMemoryStore>, AppointmentType)> {
    let store = read_store(snapshot)?;
    let appointment_type = store
        .appointment_type(appointment_type_id)
        .with_context(|| format!("Unknown appointment type: {}", appointment_type_id))?;
    Ok((AvailabilityEngine::new(Arc::new(store), config), appointment_type))
}

fn read_store(snapshot: &SnapshotArgs) -> Result<InMemoryStore> {
    let raw = read_input(snapshot.input.as_deref())?;
    let parsed: CalendarSnapshot =
        serde_json::from_str(&raw).context("Failed to parse calendar snapshot")?;
    InMemoryStore::from_snapshot(parsed).context("Invalid calendar snapshot")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
