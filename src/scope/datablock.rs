//! Data-block text formatting (spec.md §4.I.3): 1-3 line blocks, a
//! 1 Hz flash cycle between two precomputed text variants, vertical trend
//! arrows, and the duplicate/mismatch/ident/VFR annotations.

use std::collections::HashMap;

use crate::world::{Aircraft, TransponderMode, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBlockFormat {
    None,
    Simple,
    Ground,
    Tower,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalTrend {
    Level,
    Climbing,
    Descending,
}

/// Per-sample altitude delta beyond which the trend arrow shows, per
/// spec.md §4.I.3 ("250 ft/sample = climb/descend").
const TREND_THRESHOLD_FT: i32 = 250;

/// Two precomputed text variants for the 1 Hz flash; callers pick with
/// [`flash_variant`].
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlock {
    pub primary: Vec<String>,
    pub alternate: Vec<String>,
}

/// `(secondsSinceEpoch / datablockFrequency) mod 2`, per spec.md §4.I.3.
pub fn flash_variant(now: i64, datablock_frequency_secs: i64) -> u8 {
    if datablock_frequency_secs <= 0 {
        return 0;
    }
    ((now / datablock_frequency_secs) % 2) as u8
}

pub fn select_variant<'a>(block: &'a DataBlock, now: i64, datablock_frequency_secs: i64) -> &'a [String] {
    if flash_variant(now, datablock_frequency_secs) == 0 {
        &block.primary
    } else {
        &block.alternate
    }
}

pub fn vertical_trend(ac: &Aircraft) -> VerticalTrend {
    if ac.tracks.len() < 2 {
        return VerticalTrend::Level;
    }
    let delta = ac.tracks[0].altitude - ac.tracks[1].altitude;
    if delta > TREND_THRESHOLD_FT {
        VerticalTrend::Climbing
    } else if delta < -TREND_THRESHOLD_FT {
        VerticalTrend::Descending
    } else {
        VerticalTrend::Level
    }
}

fn trend_arrow(trend: VerticalTrend) -> &'static str {
    match trend {
        VerticalTrend::Level => "",
        VerticalTrend::Climbing => "\u{2191}",
        VerticalTrend::Descending => "\u{2193}",
    }
}

/// Counts aircraft sharing the same effective squawk, excluding ghosts
/// (spec.md §4.I.3: "computing per-squawk counts each frame excluding
/// ghosts").
pub fn duplicate_squawk_counts<'a>(aircraft: &[&'a Aircraft]) -> HashMap<u16, usize> {
    let mut counts = HashMap::new();
    for ac in aircraft {
        *counts.entry(ac.effective_squawk()).or_insert(0) += 1;
    }
    counts
}

/// Builds the data block for one aircraft at the given format, per
/// spec.md §4.I.3's content rules. Line 1 is always callsign + altitude +
/// ground speed; deeper formats add flight-plan/scratchpad lines.
pub fn build_data_block(
    ac: &Aircraft,
    world: &World,
    format: DataBlockFormat,
    dupe_counts: &HashMap<u16, usize>,
) -> DataBlock {
    if format == DataBlockFormat::None {
        return DataBlock { primary: Vec::new(), alternate: Vec::new() };
    }

    let altitude_hundreds = ac.altitude / 100;
    let trend = trend_arrow(vertical_trend(ac));
    let is_vfr = ac.squawk == 0o1200;

    let mut flags = String::new();
    if dupe_counts.get(&ac.effective_squawk()).copied().unwrap_or(0) > 1 {
        flags.push_str(" CODE");
    }
    if ac.assigned_squawk != 0 && ac.assigned_squawk != ac.squawk {
        flags.push_str(&format!(" {:04o}", ac.squawk));
    }
    if ac.transponder_mode == TransponderMode::Ident {
        flags.push_str(" ID");
    }
    if is_vfr {
        flags.push_str(" V");
    }

    let line1 = format!("{}{}", ac.callsign, flags);
    let line2_primary = format!("{:03}{}{}", altitude_hundreds, trend, ac.ground_speed / 10);

    let line2_alternate = match (format, &ac.flight_plan) {
        (DataBlockFormat::Simple, _) => line2_primary.clone(),
        (_, Some(fp)) if !ac.scratchpad.is_empty() => {
            format!("{}/{}", ac.scratchpad, fp.arrival)
        }
        (_, Some(fp)) => fp.arrival.clone(),
        (_, None) if !ac.scratchpad.is_empty() => ac.scratchpad.clone(),
        (_, None) => String::new(),
    };

    let mut primary = vec![line1.clone(), line2_primary.clone()];
    let mut alternate = vec![line1, line2_alternate];

    if matches!(format, DataBlockFormat::Tower | DataBlockFormat::Full) {
        if let Some(fp) = &ac.flight_plan {
            let third = format!("{}-{}", fp.departure, fp.arrival);
            primary.push(third.clone());
            alternate.push(third);
        }
    }

    if format == DataBlockFormat::Full {
        if let Some(ctrl) = ac.tracking_controller.as_ref().and_then(|c| world.get_controller(c)) {
            let line = format!("{}", ctrl.callsign);
            primary.push(line.clone());
            alternate.push(line);
        }
    }

    DataBlock { primary, alternate }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LatLon;
    use crate::world::{FlightPlan, World};

    fn world_with(callsign: &str) -> World {
        let mut world = World::new();
        world.track_received(callsign, LatLon::default(), 10000, 250, 0.0, 1);
        world.track_received(callsign, LatLon::default(), 10600, 250, 0.0, 2);
        world
    }

    #[test]
    fn climb_trend_detected_past_threshold() {
        let world = world_with("AAL123");
        let ac = world.get_aircraft("AAL123").unwrap();
        assert_eq!(vertical_trend(ac), VerticalTrend::Climbing);
    }

    #[test]
    fn flash_variant_alternates_every_period() {
        assert_eq!(flash_variant(0, 1), 0);
        assert_eq!(flash_variant(1, 1), 1);
        assert_eq!(flash_variant(2, 1), 0);
    }

    #[test]
    fn vfr_squawk_adds_v_flag() {
        let mut world = World::new();
        world.track_received("N12345", LatLon::default(), 3500, 90, 0.0, 1);
        world.transponder_squawk_received("N12345", 0o1200);
        let ac = world.get_aircraft("N12345").unwrap();
        let block = build_data_block(ac, &world, DataBlockFormat::Simple, &HashMap::new());
        assert!(block.primary[0].contains('V'));
    }

    #[test]
    fn duplicate_squawk_flags_code() {
        let mut world = World::new();
        world.track_received("AAL1", LatLon::default(), 10000, 250, 0.0, 1);
        world.track_received("AAL2", LatLon::default(), 10000, 250, 0.0, 1);
        world.transponder_squawk_received("AAL1", 0o4321);
        world.transponder_squawk_received("AAL2", 0o4321);
        let aircraft: Vec<&Aircraft> = world.get_filtered_aircraft(|_| true);
        let counts = duplicate_squawk_counts(&aircraft);
        let ac = world.get_aircraft("AAL1").unwrap();
        let block = build_data_block(ac, &world, DataBlockFormat::Simple, &counts);
        assert!(block.primary[0].contains("CODE"));
    }

    #[test]
    fn full_format_includes_departure_arrival_line() {
        let mut world = world_with("AAL123");
        world.flight_plan_amended(
            "AAL123",
            FlightPlan {
                is_ifr: true,
                aircraft_type: "B738".into(),
                cruise_altitude: 35000,
                departure: "KJFK".into(),
                arrival: "KBOS".into(),
                route: String::new(),
                remarks: String::new(),
            },
        );
        let ac = world.get_aircraft("AAL123").unwrap();
        let block = build_data_block(ac, &world, DataBlockFormat::Full, &HashMap::new());
        assert_eq!(block.primary[2], "KJFK-KBOS");
    }
}
