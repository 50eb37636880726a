//! Surface identities and the read model handed to rendering layers

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{SessionSettings, TimerState};
use crate::{engine::TimeTravelState, sync::ReplicaId};

/// The cooperating views of one timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    Setup,
    Display,
    Moderator,
}

impl SurfaceKind {
    pub const ALL: [SurfaceKind; 3] = [SurfaceKind::Setup, SurfaceKind::Display, SurfaceKind::Moderator];

    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKind::Setup => "setup",
            SurfaceKind::Display => "display",
            SurfaceKind::Moderator => "moderator",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown surface: {0:?}")]
pub struct UnknownSurface(pub String);

impl FromStr for SurfaceKind {
    type Err = UnknownSurface;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SurfaceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownSurface(s.to_string()))
    }
}

/// Everything a surface needs to render the timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceView {
    pub surface: SurfaceKind,
    pub replica: ReplicaId,
    pub timer: TimerState,
    pub time_travel: TimeTravelState,
    /// Local wall-clock time at which time-travel lands on zero
    pub ends_at: Option<DateTime<FixedOffset>>,
    pub settings: SessionSettings,
    pub now: DateTime<FixedOffset>,
}
