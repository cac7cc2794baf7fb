//! Auto-MIT (miles-in-trail) sequencing (spec.md §4.I.7): pairs arrivals
//! into a configured airport with their preceding same-arrival aircraft and
//! annotates current and 30 s-projected separation.

use crate::geometry::nm_distance;
use crate::world::Aircraft;

const HEADING_AGREEMENT_DEG: f32 = 150.0;
const ALTITUDE_AGREEMENT_FT: i32 = 3000;
const PROJECTION_SECONDS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MitColor {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone)]
pub struct MitPair {
    pub leader: String,
    pub trailer: String,
    pub current_separation_nm: f64,
    pub projected_separation_nm: f64,
    pub color: MitColor,
}

fn color_for(separation_nm: f64) -> MitColor {
    if separation_nm >= 5.0 {
        MitColor::Green
    } else if separation_nm >= 3.0 {
        MitColor::Yellow
    } else {
        MitColor::Red
    }
}

/// Distance an aircraft will close (or open) over `PROJECTION_SECONDS`,
/// assuming straight-line travel at current ground speed along heading.
fn project_separation(leader: &Aircraft, trailer: &Aircraft) -> f64 {
    let nm_per_sec = |gs: u32| gs as f64 / 3600.0;
    let leader_travel = nm_per_sec(leader.ground_speed) * PROJECTION_SECONDS;
    let trailer_travel = nm_per_sec(trailer.ground_speed) * PROJECTION_SECONDS;
    let current = nm_distance(leader.position, trailer.position);
    // Only the trailer is assumed to be gaining on a slower leader; a
    // crude but serviceable same-track closure-rate model.
    (current - (trailer_travel - leader_travel)).max(0.0)
}

/// Sorts `arrivals` by along-approach distance to `airport_position` and
/// pairs each aircraft with its immediate predecessor when heading and
/// altitude agree, per spec.md §4.I.7.
pub fn sequence_arrivals(
    arrivals: &[&Aircraft],
    airport_position: crate::geometry::LatLon,
    already_in_range_warning: &std::collections::HashSet<(String, String)>,
) -> Vec<MitPair> {
    let mut sorted: Vec<&Aircraft> = arrivals.to_vec();
    sorted.sort_by(|a, b| {
        let da = nm_distance(a.position, airport_position);
        let db = nm_distance(b.position, airport_position);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut pairs = Vec::new();
    for i in 1..sorted.len() {
        let trailer = sorted[i];
        let leader = sorted[i - 1];

        if crate::geometry::heading_difference(leader.heading, trailer.heading) >= HEADING_AGREEMENT_DEG {
            continue;
        }
        if (leader.altitude - trailer.altitude).abs() >= ALTITUDE_AGREEMENT_FT {
            continue;
        }
        let key = (leader.callsign.clone(), trailer.callsign.clone());
        if already_in_range_warning.contains(&key) {
            continue;
        }

        let current = nm_distance(leader.position, trailer.position);
        let projected = project_separation(leader, trailer);
        pairs.push(MitPair {
            leader: leader.callsign.clone(),
            trailer: trailer.callsign.clone(),
            current_separation_nm: current,
            projected_separation_nm: projected,
            color: color_for(current.min(projected)),
        });
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LatLon;
    use crate::world::World;

    #[test]
    fn pairs_adjacent_arrivals_with_heading_agreement() {
        let mut world = World::new();
        world.track_received("LEAD", LatLon { lat: 40.5, lon: -73.0 }, 5000, 180, 270.0, 1);
        world.track_received("TRAIL", LatLon { lat: 40.6, lon: -73.0 }, 5200, 180, 270.0, 1);
        let aircraft: Vec<&crate::world::Aircraft> = vec![
            world.get_aircraft("LEAD").unwrap(),
            world.get_aircraft("TRAIL").unwrap(),
        ];
        let pairs = sequence_arrivals(&aircraft, LatLon { lat: 40.0, lon: -73.0 }, &Default::default());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].leader, "LEAD");
        assert_eq!(pairs[0].trailer, "TRAIL");
    }

    #[test]
    fn opposing_headings_are_not_paired() {
        let mut world = World::new();
        world.track_received("A", LatLon { lat: 40.5, lon: -73.0 }, 5000, 180, 0.0, 1);
        world.track_received("B", LatLon { lat: 40.6, lon: -73.0 }, 5000, 180, 180.0, 1);
        let aircraft: Vec<&crate::world::Aircraft> =
            vec![world.get_aircraft("A").unwrap(), world.get_aircraft("B").unwrap()];
        let pairs = sequence_arrivals(&aircraft, LatLon { lat: 40.0, lon: -73.0 }, &Default::default());
        assert!(pairs.is_empty());
    }

    #[test]
    fn color_bands_match_thresholds() {
        assert_eq!(color_for(6.0), MitColor::Green);
        assert_eq!(color_for(4.0), MitColor::Yellow);
        assert_eq!(color_for(1.0), MitColor::Red);
    }
}
