//! CRDA — converging-runway display aid (spec.md §4.I.6). Synthesizes a
//! ghost track on the secondary runway for qualifying aircraft approaching
//! the primary runway, by mirroring the real track about the runways'
//! intersection and rotating by the angle between them.

use crate::geometry::{self, LatLon, Point2D};
use crate::world::Aircraft;

#[derive(Debug, Clone, Copy)]
pub struct Runway {
    pub threshold: LatLon,
    /// Inbound course, degrees true.
    pub heading: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaggerMode {
    Leader,
    Tie,
}

#[derive(Debug, Clone, Copy)]
pub struct CrdaConfig {
    pub source: Runway,
    pub target: Runway,
    pub mode: StaggerMode,
    pub stagger_nm: f64,
    /// Glideslope angle in degrees, used for the vertical spread test.
    pub glideslope_deg: f32,
    pub heading_tolerance_deg: f32,
    pub lateral_spread_nm: f64,
}

const MAX_ELIGIBLE_SPEED_KT: u32 = 350;
/// Added to the pure glideslope-angle spread, per spec.md §4.I.6's
/// `tan(angle)*distance + 100 ft` formula.
const GLIDESLOPE_PAD_FT: f64 = 100.0;

fn runway_points(rw: &Runway, length_nm: f64) -> (Point2D, Point2D) {
    let lat_off = geometry::convert_miles_to_lat(length_nm) * (rw.heading as f64).to_radians().cos();
    let lon_off =
        geometry::convert_miles_to_lon(length_nm, rw.threshold.lat) * (rw.heading as f64).to_radians().sin();
    let far = LatLon {
        lat: rw.threshold.lat + lat_off,
        lon: rw.threshold.lon + lon_off,
    };
    (
        Point2D::new(rw.threshold.lon as f32, rw.threshold.lat as f32),
        Point2D::new(far.lon as f32, far.lat as f32),
    )
}

/// Intersection of the source and target runway centerlines, in lat/long.
pub fn intersection_point(config: &CrdaConfig) -> Option<LatLon> {
    let (a1, a2) = runway_points(&config.source, 20.0);
    let (b1, b2) = runway_points(&config.target, 20.0);
    let hit = geometry::line_line_intersect(
        (a1.x as f64, a1.y as f64),
        (a2.x as f64, a2.y as f64),
        (b1.x as f64, b1.y as f64),
        (b2.x as f64, b2.y as f64),
    )?;
    Some(LatLon { lat: hit.1, lon: hit.0 })
}

/// Vertical glideslope spread in feet at `distance_nm` from the threshold.
fn glideslope_spread_ft(glideslope_deg: f32, distance_nm: f64) -> f64 {
    let distance_ft = distance_nm * 6076.12;
    (glideslope_deg as f64).to_radians().tan() * distance_ft + GLIDESLOPE_PAD_FT
}

/// Whether `ac` qualifies for ghosting onto `config.target` (spec.md
/// §4.I.6, conditions a-d).
pub fn is_eligible(ac: &Aircraft, config: &CrdaConfig) -> bool {
    if ac.ground_speed > MAX_ELIGIBLE_SPEED_KT {
        return false;
    }
    if geometry::heading_difference(ac.heading, config.source.heading) > config.heading_tolerance_deg {
        return false;
    }

    let lateral_nm = geometry::nm_distance(ac.position, config.source.threshold);
    if lateral_nm > config.lateral_spread_nm {
        return false;
    }

    let threshold_altitude_ft = 0.0;
    let spread = glideslope_spread_ft(config.glideslope_deg, lateral_nm);
    let vertical_gap = (ac.altitude as f64 - threshold_altitude_ft).abs();
    vertical_gap <= spread
}

/// Mirrors `tracks` about the runway intersection, rotates by the angle
/// between the two runway headings, and — in [`StaggerMode::Tie`] — adds
/// the configured stagger distance along the target runway's heading.
pub fn synthesize_ghost_tracks(tracks: &[LatLon], config: &CrdaConfig) -> Vec<LatLon> {
    let pivot = match intersection_point(config) {
        Some(p) => p,
        None => return Vec::new(),
    };
    let rotation = geometry::normalize_heading(config.target.heading - config.source.heading);
    let rotation_rad = (rotation as f64).to_radians();

    let stagger = match config.mode {
        StaggerMode::Tie => config.stagger_nm,
        StaggerMode::Leader => 0.0,
    };
    let stagger_lat = geometry::convert_miles_to_lat(stagger) * (config.target.heading as f64).to_radians().cos();
    let stagger_lon = geometry::convert_miles_to_lon(stagger, pivot.lat)
        * (config.target.heading as f64).to_radians().sin();

    tracks
        .iter()
        .map(|t| {
            let dlat = t.lat - pivot.lat;
            let dlon = t.lon - pivot.lon;
            let nm_north = dlat * geometry::nm_per_latitude();
            let nm_east = dlon * geometry::nm_per_longitude(pivot.lat);

            // Mirror about the source runway's own axis, then rotate onto
            // the target runway's axis.
            let mirrored_east = -nm_east;
            let rotated_north = mirrored_east * rotation_rad.sin() + nm_north * rotation_rad.cos();
            let rotated_east = mirrored_east * rotation_rad.cos() - nm_north * rotation_rad.sin();

            LatLon {
                lat: pivot.lat + geometry::convert_miles_to_lat(rotated_north) + stagger_lat,
                lon: pivot.lon + geometry::convert_miles_to_lon(rotated_east, pivot.lat) + stagger_lon,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CrdaConfig {
        CrdaConfig {
            source: Runway {
                threshold: LatLon { lat: 40.0, lon: -73.0 },
                heading: 0.0,
            },
            target: Runway {
                threshold: LatLon { lat: 40.02, lon: -73.02 },
                heading: 90.0,
            },
            mode: StaggerMode::Leader,
            stagger_nm: 1.0,
            glideslope_deg: 3.0,
            heading_tolerance_deg: 30.0,
            lateral_spread_nm: 10.0,
        }
    }

    #[test]
    fn fast_aircraft_is_not_eligible() {
        let mut world = crate::world::World::new();
        world.track_received("AAL1", LatLon { lat: 40.01, lon: -73.0 }, 2000, 400, 0.0, 1);
        let ac = world.get_aircraft("AAL1").unwrap();
        assert!(!is_eligible(ac, &config()));
    }

    #[test]
    fn slow_aligned_aircraft_near_threshold_is_eligible() {
        let mut world = crate::world::World::new();
        world.track_received("AAL1", LatLon { lat: 40.01, lon: -73.0 }, 1500, 140, 0.0, 1);
        let ac = world.get_aircraft("AAL1").unwrap();
        assert!(is_eligible(ac, &config()));
    }

    #[test]
    fn ghost_track_count_matches_source() {
        let tracks = vec![
            LatLon { lat: 40.005, lon: -73.0 },
            LatLon { lat: 40.01, lon: -73.0 },
        ];
        let ghosts = synthesize_ghost_tracks(&tracks, &config());
        assert_eq!(ghosts.len(), tracks.len());
    }
}
