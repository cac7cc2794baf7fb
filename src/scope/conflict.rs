//! Conflict detection (spec.md §4.I.5): pairwise lateral/vertical
//! separation against thresholds that vary by flight-rules combination,
//! with a 3 s audio-trigger throttle on violations.

use crate::geometry::nm_distance;
use crate::world::Aircraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRules {
    Ifr,
    Vfr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictSeverity {
    None,
    Warning,
    Violation,
}

#[derive(Debug, Clone, Copy)]
pub struct RangeLimits {
    pub warning_lateral_nm: f64,
    pub warning_vertical_ft: i32,
    pub violation_lateral_nm: f64,
    pub violation_vertical_ft: i32,
}

/// Separation minima keyed by the unordered pair of flight rules. IFR-IFR
/// is the standard 3 nm / 1000 ft; VFR legs get looser minima since VFR
/// separation isn't an ATC mandate, only an advisory.
pub fn range_limits(a: FlightRules, b: FlightRules) -> RangeLimits {
    match (a, b) {
        (FlightRules::Ifr, FlightRules::Ifr) => RangeLimits {
            warning_lateral_nm: 5.0,
            warning_vertical_ft: 1500,
            violation_lateral_nm: 3.0,
            violation_vertical_ft: 1000,
        },
        (FlightRules::Vfr, FlightRules::Vfr) => RangeLimits {
            warning_lateral_nm: 2.0,
            warning_vertical_ft: 750,
            violation_lateral_nm: 1.0,
            violation_vertical_ft: 500,
        },
        _ => RangeLimits {
            warning_lateral_nm: 3.0,
            warning_vertical_ft: 1000,
            violation_lateral_nm: 1.5,
            violation_vertical_ft: 500,
        },
    }
}

fn flight_rules_of(ac: &Aircraft) -> FlightRules {
    match &ac.flight_plan {
        Some(fp) if fp.is_ifr => FlightRules::Ifr,
        _ => FlightRules::Vfr,
    }
}

#[derive(Debug, Clone)]
pub struct ConflictPair {
    pub a: String,
    pub b: String,
    pub lateral_nm: f64,
    pub vertical_ft: i32,
    pub severity: ConflictSeverity,
}

/// Evaluates one unordered pair of (non-ghost, visible) aircraft.
pub fn evaluate_pair(a: &Aircraft, b: &Aircraft) -> ConflictPair {
    let lateral_nm = nm_distance(a.position, b.position);
    let vertical_ft = (a.altitude - b.altitude).abs();
    let limits = range_limits(flight_rules_of(a), flight_rules_of(b));

    let severity = if lateral_nm <= limits.violation_lateral_nm && vertical_ft <= limits.violation_vertical_ft {
        ConflictSeverity::Violation
    } else if lateral_nm <= limits.warning_lateral_nm && vertical_ft <= limits.warning_vertical_ft {
        ConflictSeverity::Warning
    } else {
        ConflictSeverity::None
    };

    ConflictPair {
        a: a.callsign.clone(),
        b: b.callsign.clone(),
        lateral_nm,
        vertical_ft,
        severity,
    }
}

/// All pairwise conflicts among `aircraft` with severity above `None`.
pub fn detect_conflicts(aircraft: &[&Aircraft]) -> Vec<ConflictPair> {
    let mut out = Vec::new();
    for i in 0..aircraft.len() {
        for j in (i + 1)..aircraft.len() {
            let pair = evaluate_pair(aircraft[i], aircraft[j]);
            if pair.severity != ConflictSeverity::None {
                out.push(pair);
            }
        }
    }
    out
}

/// Throttles the violation audio trigger to at most once every 3 s per
/// pair (spec.md §4.I.5). Callers hold one instance per pair key.
pub struct AudioThrottle {
    last_triggered: Option<i64>,
}

const AUDIO_THROTTLE_SECONDS: i64 = 3;

impl AudioThrottle {
    pub fn new() -> Self {
        Self { last_triggered: None }
    }

    /// Returns `true` if the audio should fire now, recording that it did.
    pub fn should_trigger(&mut self, now: i64) -> bool {
        match self.last_triggered {
            Some(t) if now - t < AUDIO_THROTTLE_SECONDS => false,
            _ => {
                self.last_triggered = Some(now);
                true
            }
        }
    }
}

impl Default for AudioThrottle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LatLon;
    use crate::world::World;

    fn near(lat: f64) -> LatLon {
        LatLon { lat, lon: -73.0 }
    }

    #[test]
    fn ifr_pair_within_three_miles_is_a_violation() {
        let mut world = World::new();
        world.track_received("AAL1", near(40.0), 10000, 250, 0.0, 1);
        world.track_received("AAL2", near(40.02), 10000, 250, 0.0, 1);
        let a = world.get_aircraft("AAL1").unwrap();
        let b = world.get_aircraft("AAL2").unwrap();
        let pair = evaluate_pair(a, b);
        assert_eq!(pair.severity, ConflictSeverity::Violation);
    }

    #[test]
    fn far_apart_aircraft_have_no_conflict() {
        let mut world = World::new();
        world.track_received("AAL1", near(40.0), 10000, 250, 0.0, 1);
        world.track_received("AAL2", near(41.0), 10000, 250, 0.0, 1);
        let a = world.get_aircraft("AAL1").unwrap();
        let b = world.get_aircraft("AAL2").unwrap();
        assert_eq!(evaluate_pair(a, b).severity, ConflictSeverity::None);
    }

    #[test]
    fn audio_throttle_fires_at_most_every_three_seconds() {
        let mut throttle = AudioThrottle::new();
        assert!(throttle.should_trigger(100));
        assert!(!throttle.should_trigger(101));
        assert!(!throttle.should_trigger(102));
        assert!(throttle.should_trigger(103));
    }
}
