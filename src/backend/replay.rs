//! Replays a captured session (spec.md §4.F): JSON-lines records of
//! `{Contents, Sent, Time}`, reconciled against wall clock via an
//! offset and rate multiplier. Decoding happens only inside
//! `get_updates`, on the main loop, same as every other backend's poll.

use std::fs::File;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use serde_json::Deserializer as JsonDeserializer;

use crate::backend::live::MESSAGE_TABLE;
use crate::backend::{codec, ControlBackend, TextTarget};
use crate::error::Error;
use crate::world::World;

fn now_wall_clock() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "Contents")]
    contents: String,
    #[serde(rename = "Sent")]
    sent: bool,
    #[serde(rename = "Time")]
    time: String,
}

fn parse_time(raw: &str) -> Result<i64, Error> {
    chrono::DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.timestamp())
        .map_err(|e| Error::ProtocolViolation(format!("bad replay timestamp {:?}: {}", raw, e)))
}

pub struct ReplayBackend {
    my_callsign: String,
    rate: f64,
    /// `now − offsetSeconds/rate`, fixed at open time (spec.md §4.F).
    replay_start: f64,
    /// First record's time; unset until the first record is decoded.
    stream_start: Option<i64>,
    records: Box<dyn Iterator<Item = serde_json::Result<RawRecord>>>,
    pending: Option<(i64, RawRecord)>,
    connected: bool,
}

impl ReplayBackend {
    pub fn open(path: &str, callsign: &str, offset_seconds: f64, rate: f64) -> Result<Self, Error> {
        let file = File::open(path)?;
        let records = JsonDeserializer::from_reader(file).into_iter::<RawRecord>();
        let now = now_wall_clock() as f64;

        Ok(Self {
            my_callsign: callsign.to_string(),
            rate,
            replay_start: now - offset_seconds / rate,
            stream_start: None,
            records: Box::new(records),
            pending: None,
            connected: true,
        })
    }

    fn next_record(&mut self) -> Result<Option<(i64, RawRecord)>, Error> {
        if let Some(r) = self.pending.take() {
            return Ok(Some(r));
        }
        match self.records.next() {
            Some(Ok(raw)) => {
                let time = parse_time(&raw.time)?;
                Ok(Some((time, raw)))
            }
            Some(Err(e)) => Err(Error::from(e)),
            None => Ok(None),
        }
    }
}

impl ControlBackend for ReplayBackend {
    fn get_updates(&mut self, world: &mut World) -> Result<(), Error> {
        if !self.connected {
            return Ok(());
        }

        loop {
            let (time, record) = match self.next_record()? {
                Some(r) => r,
                None => {
                    self.connected = false;
                    break;
                }
            };

            if self.stream_start.is_none() {
                self.stream_start = Some(time);
            }

            if time >= self.current_time() {
                self.pending = Some((time, record));
                break;
            }

            if !record.sent {
                codec::dispatch_line(&record.contents, MESSAGE_TABLE, world, time)?;
            }
        }

        Ok(())
    }

    fn current_time(&self) -> i64 {
        match self.stream_start {
            Some(start) => {
                let now = now_wall_clock() as f64;
                (start as f64 + (now - self.replay_start) * self.rate) as i64
            }
            None => 0,
        }
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

    fn send_text_message(&mut self, _target: TextTarget, _text: &str) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_fixture(lines: &[&str]) -> String {
        let path = std::env::temp_dir().join(format!(
            "replay-test-{}.jsonl",
            std::process::id().wrapping_add(lines.len() as u32)
        ));
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn parses_rfc3339_with_nanos() {
        let t = parse_time("2024-01-01T00:00:05.123456789Z").unwrap();
        assert!(t > 0);
    }

    #[test]
    fn eof_marks_disconnected() {
        let path = write_fixture(&[
            r#"{"Contents":"#DAJFK_TWR","Sent":false,"Time":"2024-01-01T00:00:00Z"}"#,
        ]);
        let mut backend = ReplayBackend::open(&path, "OBS", 1_000_000.0, 1.0).unwrap();
        let mut world = World::new();
        // Force currentTime() far ahead of the single record's stamp so it
        // is immediately due, then drain to EOF.
        backend.get_updates(&mut world).unwrap();
        backend.get_updates(&mut world).unwrap();
        assert!(!backend.connected());
    }

    #[test]
    fn sent_records_are_not_reingested() {
        let path = write_fixture(&[
            r#"{"Contents":"#DAJFK_TWR","Sent":true,"Time":"2024-01-01T00:00:00Z"}"#,
        ]);
        let mut backend = ReplayBackend::open(&path, "OBS", 1_000_000.0, 1.0).unwrap();
        let mut world = World::new();
        use crate::world::{Controller, ControllerRating};
        world.controller_added(Controller {
            callsign: "JFK_TWR".into(),
            frequency: "118.700".into(),
            scope_char: 'T',
            sector: String::new(),
            rating: ControllerRating::C1,
            primary_radar_centers: vec![],
            range: 30,
        });
        backend.get_updates(&mut world).unwrap();
        // A Sent=true record must not be replayed back into the world.
        assert!(world.get_controller("JFK_TWR").is_some());
    }

    #[test]
    fn send_text_message_is_a_no_op() {
        let path = write_fixture(&[]);
        let mut backend = ReplayBackend::open(&path, "OBS", 0.0, 1.0).unwrap();
        assert!(backend
            .send_text_message(TextTarget::Broadcast, "hello")
            .is_ok());
    }
}
