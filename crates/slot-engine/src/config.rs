//! Engine configuration.
//!
//! The engine never reads process state on its own: callers build an
//! [`EngineConfig`] (directly, from serde, or via [`EngineConfig::from_env`])
//! and hand it to [`crate::availability::AvailabilityEngine`].

use std::env;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dst::DstPolicy;
use crate::error::{EngineError, Result};

pub const TIMEZONE_ENV: &str = "SLOT_ENGINE_TIMEZONE";
pub const DST_POLICY_ENV: &str = "SLOT_ENGINE_DST_POLICY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wall-clock zone used for day matching when a rule carries no zone of
    /// its own, and for all exceptions.
    #[serde(default = "default_timezone")]
    pub reference_timezone: Tz,
    #[serde(default)]
    pub dst_policy: DstPolicy,
}

fn default_timezone() -> Tz {
    Tz::UTC
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_timezone: default_timezone(),
            dst_policy: DstPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(reference_timezone: Tz) -> Self {
        Self {
            reference_timezone,
            ..Self::default()
        }
    }

    /// Parse an IANA zone name into a config with the default DST policy.
    pub fn with_timezone_name(name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|_| EngineError::InvalidTimezone(name.to_string()))?;
        Ok(Self::new(tz))
    }

    /// Read `SLOT_ENGINE_TIMEZONE` and `SLOT_ENGINE_DST_POLICY`, falling back
    /// to UTC and `shift_forward` with a warning.
    pub fn from_env() -> Self {
        let reference_timezone = match env::var(TIMEZONE_ENV) {
            Ok(name) => name.parse().unwrap_or_else(|_| {
                warn!("{} '{}' is not an IANA zone, using UTC", TIMEZONE_ENV, name);
                default_timezone()
            }),
            Err(_) => {
                warn!("{} not set, using UTC", TIMEZONE_ENV);
                default_timezone()
            }
        };

        let dst_policy = match env::var(DST_POLICY_ENV).as_deref() {
            Ok("skip") => DstPolicy::Skip,
            Ok("shift_forward") | Err(_) => DstPolicy::ShiftForward,
            Ok(other) => {
                warn!("{} '{}' is not recognised, using shift_forward", DST_POLICY_ENV, other);
                DstPolicy::ShiftForward
            }
        };

        Self {
            reference_timezone,
            dst_policy,
        }
    }
}
