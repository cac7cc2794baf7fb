//! Periodic HTTP position ingest (spec.md §4.G), grounded on the teacher's
//! `flightradar.rs`/`flightaware.rs`: a JSON object whose values are
//! heterogeneous, where the array-shaped ones are position reports
//! deserialized positionally into a typed record, the rest (stats,
//! metadata) skipped.
//!
//! Per spec.md §5, the request itself runs on a background task guarded by
//! an atomic in-flight flag; `get_updates` only launches it and drains
//! whatever the previous one produced, never blocking on the socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::ControlBackend;
use crate::error::Error;
use crate::geometry::{Bounds, LatLon};
use crate::world::World;

/// No more than one outbound request per this many seconds.
const MIN_POLL_INTERVAL_SECONDS: i64 = 5;

#[derive(Deserialize, Debug, Clone)]
struct IngestRecord {
    callsign: String,
    latitude: f64,
    longitude: f64,
    altitude: i32,
    ground_speed: u32,
    heading: f32,
    squawk: String,
}

fn now_wall_clock() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn fetch(url: &str) -> Result<String, String> {
    attohttpc::get(url)
        .send()
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?
        .text()
        .map_err(|e| e.to_string())
}

pub struct IngestBackend {
    base_url: String,
    last_request_started: Option<i64>,
    in_flight: Arc<AtomicBool>,
    result_tx: Sender<Result<String, String>>,
    result_rx: Receiver<Result<String, String>>,
    connected: bool,
}

impl IngestBackend {
    pub fn new(endpoint: &str, bounds: &Bounds) -> Self {
        let (result_tx, result_rx) = bounded(1);
        Self {
            base_url: format!(
                "{}&bounds={:.4},{:.4},{:.4},{:.4}",
                endpoint, bounds.lat1, bounds.lat2, bounds.lon1, bounds.lon2
            ),
            last_request_started: None,
            in_flight: Arc::new(AtomicBool::new(false)),
            result_tx,
            result_rx,
            connected: true,
        }
    }

    fn due_to_poll(&self, now: i64) -> bool {
        match self.last_request_started {
            Some(last) => now - last >= MIN_POLL_INTERVAL_SECONDS,
            None => true,
        }
    }

    fn apply_response(body: &str, world: &mut World, now: i64) -> Result<(), Error> {
        let data: Value = serde_json::from_str(body)?;
        let object = match data.as_object() {
            Some(o) => o,
            None => return Ok(()),
        };

        for value in object.values() {
            if !value.is_array() {
                continue;
            }
            let record: IngestRecord = match serde_json::from_value(value.clone()) {
                Ok(r) => r,
                Err(_) => continue,
            };
            let squawk = u16::from_str_radix(&record.squawk, 8).unwrap_or(0);
            world.track_received(
                &record.callsign,
                LatLon {
                    lat: record.latitude,
                    lon: record.longitude,
                },
                record.altitude,
                record.ground_speed,
                record.heading,
                now,
            );
            world.transponder_squawk_received(&record.callsign, squawk);
        }

        Ok(())
    }
}

impl ControlBackend for IngestBackend {
    fn get_updates(&mut self, world: &mut World) -> Result<(), Error> {
        let now = now_wall_clock();

        if let Ok(result) = self.result_rx.try_recv() {
            let body = result.map_err(Error::TransientNetwork)?;
            Self::apply_response(&body, world, now)?;
        }

        if self.due_to_poll(now) && !self.in_flight.load(Ordering::SeqCst) {
            self.last_request_started = Some(now);
            self.in_flight.store(true, Ordering::SeqCst);

            let url = self.base_url.clone();
            let tx = self.result_tx.clone();
            let in_flight = self.in_flight.clone();
            thread::spawn(move || {
                let result = fetch(&url);
                let _ = tx.try_send(result);
                in_flight.store(false, Ordering::SeqCst);
            });
        }

        Ok(())
    }

    fn current_time(&self) -> i64 {
        now_wall_clock()
    }

    fn callsign(&self) -> &str {
        ""
    }

    fn connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_entries_are_applied_and_non_array_entries_are_skipped() {
        let body = r#"{
            "full_count": 42,
            "version": 4,
            "abc123": ["AAL123", 40.5, -73.8, 10000, 250, 90.0, "1200"]
        }"#;
        let mut world = World::new();
        IngestBackend::apply_response(body, &mut world, 1000).unwrap();
        let ac = world.get_aircraft("AAL123").unwrap();
        assert_eq!(ac.altitude, 10000);
        assert_eq!(ac.squawk, 0o1200);
    }

    #[test]
    fn known_callsign_is_modified_not_readded() {
        let body = r#"{"a": ["AAL123", 40.5, -73.8, 10000, 250, 90.0, "1200"]}"#;
        let mut world = World::new();
        let sub = world.subscribe();
        IngestBackend::apply_response(body, &mut world, 1000).unwrap();
        IngestBackend::apply_response(body, &mut world, 1010).unwrap();
        let events = world.drain_events(sub);
        assert_eq!(events.len(), 4); // Added + squawk + Modified + squawk
        use crate::event::Event;
        assert!(matches!(events[0], Event::AddedAircraft(_)));
        assert!(matches!(events[2], Event::ModifiedAircraft(_)));
    }

    #[test]
    fn poll_is_rate_limited_to_five_seconds() {
        let bounds = Bounds {
            lat1: 41.0,
            lon1: -74.0,
            lat2: 40.0,
            lon2: -73.0,
        };
        let mut backend = IngestBackend::new("https://example.invalid/feed", &bounds);
        assert!(backend.due_to_poll(100));
        backend.last_request_started = Some(100);
        assert!(!backend.due_to_poll(104));
        assert!(backend.due_to_poll(105));
    }

    #[test]
    fn in_flight_guard_prevents_overlapping_requests() {
        let bounds = Bounds {
            lat1: 41.0,
            lon1: -74.0,
            lat2: 40.0,
            lon2: -73.0,
        };
        let backend = IngestBackend::new("https://example.invalid/feed", &bounds);
        backend.in_flight.store(true, Ordering::SeqCst);
        assert!(backend.in_flight.load(Ordering::SeqCst));
    }
}
