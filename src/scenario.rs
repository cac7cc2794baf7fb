//! Scenario launcher configuration (spec.md §4.J's launch config, folded
//! into its own module per SPEC_FULL.md's supplemental Module L):
//! departure/arrival/overflight rate controls consumed by the RPC server's
//! launch-config mutation and by [`crate::backend::simulated::SimulatedBackend`]'s
//! spawn scheduling.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchMode {
    Manual,
    Automatic,
}

/// Spread applied to a newly spawned aircraft's initial heading/altitude so
/// a burst of departures doesn't all stack on the same track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PushParameters {
    pub heading_spread_deg: f32,
    pub altitude_spread_ft: i32,
}

impl Default for PushParameters {
    fn default() -> Self {
        Self {
            heading_spread_deg: 10.0,
            altitude_spread_ft: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub airport: String,
    pub departure_rate_per_hour: u32,
    pub arrival_rate_per_hour: u32,
    pub overflight_rate_per_hour: u32,
    pub mode: LaunchMode,
    pub push_parameters: PushParameters,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            airport: String::new(),
            departure_rate_per_hour: 0,
            arrival_rate_per_hour: 0,
            overflight_rate_per_hour: 0,
            mode: LaunchMode::Manual,
            push_parameters: PushParameters::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficKind {
    Departure,
    Arrival,
    Overflight,
}

/// Per-kind spawn scheduler driven by a configured hourly rate. In
/// `Automatic` mode, [`SpawnScheduler::due`] answers whether enough sim time
/// has elapsed since the last spawn of that kind; `Manual` mode never fires
/// on its own (spawns happen only from an explicit RPC call).
pub struct SpawnScheduler {
    last_spawn: std::collections::HashMap<TrafficKind, i64>,
}

impl SpawnScheduler {
    pub fn new() -> Self {
        Self {
            last_spawn: std::collections::HashMap::new(),
        }
    }

    fn rate_for(config: &ScenarioConfig, kind: TrafficKind) -> u32 {
        match kind {
            TrafficKind::Departure => config.departure_rate_per_hour,
            TrafficKind::Arrival => config.arrival_rate_per_hour,
            TrafficKind::Overflight => config.overflight_rate_per_hour,
        }
    }

    /// Returns `true` (and records `now` as the new last-spawn time) if a
    /// new aircraft of `kind` is due, given its configured hourly rate.
    pub fn due(&mut self, config: &ScenarioConfig, kind: TrafficKind, now: i64) -> bool {
        if config.mode != LaunchMode::Automatic {
            return false;
        }
        let rate = Self::rate_for(config, kind);
        if rate == 0 {
            return false;
        }
        let interval_secs = 3600 / rate as i64;
        let due = match self.last_spawn.get(&kind) {
            Some(last) => now - last >= interval_secs,
            None => true,
        };
        if due {
            self.last_spawn.insert(kind, now);
        }
        due
    }
}

impl Default for SpawnScheduler {
    fn default() -> Self {
        Self::new()
    }
}
