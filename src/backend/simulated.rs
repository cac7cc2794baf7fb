//! An internally driven world with no network transport at all (spec.md
//! §4.D's fifth backend kind): every mutation succeeds directly against the
//! world model, and track projection advances synthetic aircraft each tick
//! instead of waiting on inbound data. Position interpolation is grounded
//! on the teacher's `interpolate.rs` (heading+groundspeed resolved into a
//! lat/lon-per-second vector), reworked to take an explicit elapsed time
//! instead of reading `Instant::now()` internally, so stepping the
//! simulation stays deterministic and testable.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::backend::{ControlBackend, TextTarget};
use crate::error::Error;
use crate::geometry::{self, LatLon};
use crate::world::{FlightPlan, VoiceCapability, World};

fn now_wall_clock() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
struct SimulatedTrack {
    position: LatLon,
    altitude: i32,
    ground_speed: u32,
    heading: f32,
}

/// Advances `position` by `ground_speed` knots on heading `heading_deg` for
/// `elapsed_secs` seconds.
fn project(position: LatLon, heading_deg: f32, ground_speed: u32, elapsed_secs: f64) -> LatLon {
    let distance_nm = ground_speed as f64 * elapsed_secs / 3600.0;
    let heading = (heading_deg as f64).to_radians();
    let lat_nm = distance_nm * heading.cos();
    let lon_nm = distance_nm * heading.sin();

    LatLon {
        lat: position.lat + geometry::convert_miles_to_lat(lat_nm),
        lon: position.lon + geometry::convert_miles_to_lon(lon_nm, position.lat),
    }
}

pub struct SimulatedBackend {
    my_callsign: String,
    aircraft: HashMap<String, SimulatedTrack>,
    sim_time: i64,
    last_tick_wall: Option<i64>,
    connected: bool,
}

impl SimulatedBackend {
    pub fn new(callsign: &str) -> Self {
        Self {
            my_callsign: callsign.to_string(),
            aircraft: HashMap::new(),
            sim_time: now_wall_clock(),
            last_tick_wall: None,
            connected: true,
        }
    }

    /// Injects a new synthetic aircraft, used by the scenario launcher
    /// (Module L) to spawn departures/arrivals/overflights.
    pub fn spawn_aircraft(
        &mut self,
        callsign: &str,
        position: LatLon,
        altitude: i32,
        ground_speed: u32,
        heading: f32,
        world: &mut World,
    ) {
        self.aircraft.insert(
            callsign.to_string(),
            SimulatedTrack {
                position,
                altitude,
                ground_speed,
                heading,
            },
        );
        world.track_received(callsign, position, altitude, ground_speed, heading, self.sim_time);
    }

    pub fn remove_aircraft(&mut self, callsign: &str, world: &mut World) {
        self.aircraft.remove(callsign);
        world.remove_aircraft(callsign);
    }
}

impl ControlBackend for SimulatedBackend {
    fn get_updates(&mut self, world: &mut World) -> Result<(), Error> {
        let wall_now = now_wall_clock();
        let elapsed = match self.last_tick_wall {
            Some(last) => (wall_now - last).max(0),
            None => 0,
        };
        self.last_tick_wall = Some(wall_now);
        self.sim_time += elapsed;

        for (callsign, track) in self.aircraft.iter_mut() {
            track.position = project(track.position, track.heading, track.ground_speed, elapsed as f64);
            world.track_received(
                callsign,
                track.position,
                track.altitude,
                track.ground_speed,
                track.heading,
                self.sim_time,
            );
        }

        Ok(())
    }

    fn current_time(&self) -> i64 {
        self.sim_time
    }

    fn callsign(&self) -> &str {
        &self.my_callsign
    }

    fn connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn set_squawk_manual(&mut self, _callsign: &str, _squawk: u16) -> Result<(), Error> {
        Ok(())
    }

    fn set_squawk_auto(&mut self, _callsign: &str) -> Result<(), Error> {
        Ok(())
    }

    fn set_scratchpad(&mut self, _callsign: &str, _text: &str) -> Result<(), Error> {
        Ok(())
    }

    fn set_temp_altitude(&mut self, _callsign: &str, _altitude: Option<i32>) -> Result<(), Error> {
        Ok(())
    }

    fn amend_flight_plan(&mut self, _callsign: &str, _fp: FlightPlan) -> Result<(), Error> {
        Ok(())
    }

    fn amend_route(&mut self, _callsign: &str, _route: &str) -> Result<(), Error> {
        Ok(())
    }

    fn initiate_track(&mut self, _callsign: &str) -> Result<(), Error> {
        Ok(())
    }

    fn drop_track(&mut self, _callsign: &str) -> Result<(), Error> {
        Ok(())
    }

    fn offer_handoff(&mut self, _callsign: &str, _to_controller: &str) -> Result<(), Error> {
        Ok(())
    }

    fn accept_handoff(&mut self, _callsign: &str) -> Result<(), Error> {
        Ok(())
    }

    fn reject_handoff(&mut self, _callsign: &str) -> Result<(), Error> {
        Ok(())
    }

    fn point_out(&mut self, _callsign: &str, _to_controller: &str) -> Result<(), Error> {
        Ok(())
    }

    fn send_text_message(&mut self, _target: TextTarget, _text: &str) -> Result<(), Error> {
        Ok(())
    }

    fn set_voice_type(&mut self, _callsign: &str, _voice: VoiceCapability) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_along_heading_due_east() {
        let start = LatLon { lat: 40.0, lon: -73.0 };
        let moved = project(start, 90.0, 360, 60.0); // 360kt for 1 minute = 6nm
        assert!(moved.lon > start.lon);
        assert!((moved.lat - start.lat).abs() < 1e-6);
    }

    #[test]
    fn tick_advances_spawned_aircraft_and_posts_modified() {
        let mut backend = SimulatedBackend::new("OBS");
        let mut world = World::new();
        backend.spawn_aircraft(
            "AAL123",
            LatLon { lat: 40.0, lon: -73.0 },
            10000,
            360,
            90.0,
            &mut world,
        );
        backend.last_tick_wall = Some(backend.sim_time - 60);
        backend.get_updates(&mut world).unwrap();
        let ac = world.get_aircraft("AAL123").unwrap();
        assert!(ac.position.lon > -73.0);
    }

    #[test]
    fn all_mutations_succeed() {
        let mut backend = SimulatedBackend::new("OBS");
        assert!(backend.set_squawk_manual("AAL123", 0o1200).is_ok());
        assert!(backend.initiate_track("AAL123").is_ok());
        assert!(backend
            .send_text_message(TextTarget::Broadcast, "hi")
            .is_ok());
    }
}
