//! Per-request relay session bookkeeping

use std::fmt;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

/// Lifecycle of one relay request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Resolving,
    SelectingVariant,
    Spawning,
    Streaming,
    Teardown,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Resolving => "resolving",
            SessionPhase::SelectingVariant => "selecting-variant",
            SessionPhase::Spawning => "spawning",
            SessionPhase::Streaming => "streaming",
            SessionPhase::Teardown => "teardown",
            SessionPhase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Identity and phase of one relay request
#[derive(Debug)]
pub struct RelaySession {
    id: Uuid,
    station: String,
    phase: SessionPhase,
    started: Instant,
}

impl RelaySession {
    pub fn new(station: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            station: station.into(),
            phase: SessionPhase::Resolving,
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    #[cfg(test)]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Move to `phase`. Closed sessions stay closed.
    pub fn enter(&mut self, phase: SessionPhase) {
        if self.phase == SessionPhase::Closed || self.phase == phase {
            return;
        }
        tracing::debug!(
            session = %self.id,
            station = %self.station,
            "Session {} -> {}",
            self.phase,
            phase
        );
        self.phase = phase;
    }
}
