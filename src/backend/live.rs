//! The live protocol backend: a TCP connection to a control server speaking
//! the line protocol of spec.md §4.E. A dedicated reader thread blocks on
//! the socket and feeds a bounded channel; `get_updates` only ever drains
//! that channel, so the main loop never blocks on the network (spec.md §5).
//!
//! Grounded on the teacher's `main.rs` wire-building helpers
//! (`build_aircraft_string`, `build_flightplan_string`, ...), which already
//! assembled colon-delimited `\r\n`-terminated lines; generalized here into
//! a verb/sender/field table instead of one format string per message kind.

use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use log::warn;

use crate::backend::codec::{self, MessageSpec};
use crate::backend::{ControlBackend, TextTarget};
use crate::error::Error;
use crate::geometry::LatLon;
use crate::world::{FlightPlan, VoiceCapability, World};

const INCOMING_QUEUE_CAPACITY: usize = 1024;

fn now_wall_clock() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ---- inbound message handlers ----

fn handle_pilot_position(
    sender: &str,
    fields: &[&str],
    world: &mut World,
    now: i64,
) -> Result<(), Error> {
    let squawk = u16::from_str_radix(fields.get(1).unwrap_or(&"0"), 8).unwrap_or(0);
    let lat: f64 = fields.get(2).and_then(|s| s.parse().ok()).unwrap_or(0.0);
    let lon: f64 = fields.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.0);
    let altitude: i32 = fields.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);
    let ground_speed: u32 = fields.get(5).and_then(|s| s.parse().ok()).unwrap_or(0);
    let heading: f32 = fields.get(6).and_then(|s| s.parse().ok()).unwrap_or(0.0);

    world.track_received(sender, LatLon { lat, lon }, altitude, ground_speed, heading, now);
    world.transponder_squawk_received(sender, squawk);
    Ok(())
}

fn handle_atc_position(
    sender: &str,
    fields: &[&str],
    world: &mut World,
    _now: i64,
) -> Result<(), Error> {
    use crate::world::{Controller, ControllerRating};

    let frequency = fields.first().unwrap_or(&"").to_string();
    let range: u32 = fields.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);

    world.controller_added(Controller {
        callsign: sender.to_string(),
        frequency,
        scope_char: sender.chars().next().unwrap_or('?'),
        sector: String::new(),
        rating: ControllerRating::Observer,
        primary_radar_centers: Vec::new(),
        range,
    });
    Ok(())
}

fn handle_atc_disconnect(
    sender: &str,
    _fields: &[&str],
    world: &mut World,
    _now: i64,
) -> Result<(), Error> {
    world.controller_removed(sender);
    Ok(())
}

fn handle_pilot_disconnect(
    sender: &str,
    _fields: &[&str],
    world: &mut World,
    _now: i64,
) -> Result<(), Error> {
    world.remove_aircraft(sender);
    Ok(())
}

fn handle_flight_plan(
    sender: &str,
    fields: &[&str],
    world: &mut World,
    _now: i64,
) -> Result<(), Error> {
    let is_ifr = fields.first() == Some(&"I");
    let aircraft_type = fields.get(1).unwrap_or(&"").to_string();
    let cruise_altitude: i32 = fields.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);
    let departure = fields.get(3).unwrap_or(&"").to_string();
    let arrival = fields.get(4).unwrap_or(&"").to_string();
    let route = fields.get(5..).map(|r| r.join(":")).unwrap_or_default();

    world.flight_plan_amended(
        sender,
        FlightPlan {
            is_ifr,
            aircraft_type,
            cruise_altitude,
            departure,
            arrival,
            route,
            remarks: String::new(),
        },
    );
    Ok(())
}

fn handle_handoff_offer(
    sender: &str,
    fields: &[&str],
    world: &mut World,
    _now: i64,
) -> Result<(), Error> {
    let to_controller = fields.get(1).unwrap_or(&"");
    let aircraft = fields.get(2).unwrap_or(&"");
    world.handoff_offered(aircraft, sender, to_controller);
    Ok(())
}

fn handle_handoff_accept(
    sender: &str,
    fields: &[&str],
    world: &mut World,
    _now: i64,
) -> Result<(), Error> {
    let from_controller = fields.get(1).unwrap_or(&"");
    let aircraft = fields.get(2).unwrap_or(&"");
    world.handoff_accepted(aircraft, from_controller, sender);
    Ok(())
}

fn handle_handoff_reject(
    sender: &str,
    fields: &[&str],
    world: &mut World,
    _now: i64,
) -> Result<(), Error> {
    let from_controller = fields.get(1).unwrap_or(&"");
    let aircraft = fields.get(2).unwrap_or(&"");
    world.handoff_rejected(aircraft, from_controller, sender);
    Ok(())
}

fn handle_text_message(
    sender: &str,
    fields: &[&str],
    world: &mut World,
    _now: i64,
) -> Result<(), Error> {
    let text = fields.get(1..).map(|r| r.join(":")).unwrap_or_default();
    world.text_message_received(sender, &text);
    Ok(())
}

/// Ordered message-spec table (spec.md §4.E): the first row whose verb
/// prefix and fixed-field matches succeed wins; everything else falls
/// through to the next row, and a line nothing matches is dropped.
pub(crate) static MESSAGE_TABLE: &[MessageSpec] = &[
    MessageSpec {
        verb: "$HO",
        field_matches: &[(1, "OFFER")],
        min_fields: 4,
        handler: handle_handoff_offer,
    },
    MessageSpec {
        verb: "$HO",
        field_matches: &[(1, "ACCEPT")],
        min_fields: 4,
        handler: handle_handoff_accept,
    },
    MessageSpec {
        verb: "$HO",
        field_matches: &[(1, "REJECT")],
        min_fields: 4,
        handler: handle_handoff_reject,
    },
    MessageSpec {
        verb: "$FP",
        field_matches: &[],
        min_fields: 6,
        handler: handle_flight_plan,
    },
    MessageSpec {
        verb: "$TM",
        field_matches: &[],
        min_fields: 2,
        handler: handle_text_message,
    },
    MessageSpec {
        verb: "#AA",
        field_matches: &[],
        min_fields: 3,
        handler: handle_atc_position,
    },
    MessageSpec {
        verb: "#DA",
        field_matches: &[],
        min_fields: 0,
        handler: handle_atc_disconnect,
    },
    MessageSpec {
        verb: "#DP",
        field_matches: &[],
        min_fields: 0,
        handler: handle_pilot_disconnect,
    },
    MessageSpec {
        verb: "@",
        field_matches: &[],
        min_fields: 7,
        handler: handle_pilot_position,
    },
];

pub struct LiveBackend {
    my_callsign: String,
    stream: TcpStream,
    incoming_rx: Receiver<String>,
    connected: Arc<AtomicBool>,
}

impl LiveBackend {
    pub fn connect(addr: &str, callsign: &str) -> Result<Self, Error> {
        let stream = TcpStream::connect(addr)?;
        let reader_stream = stream.try_clone()?;
        let connected = Arc::new(AtomicBool::new(true));

        let (tx, rx): (Sender<String>, Receiver<String>) = bounded(INCOMING_QUEUE_CAPACITY);
        let reader_connected = connected.clone();
        thread::spawn(move || read_loop(reader_stream, tx, reader_connected));

        Ok(Self {
            my_callsign: callsign.to_string(),
            stream,
            incoming_rx: rx,
            connected,
        })
    }

    fn send_line(&mut self, verb: &str, fields: &[&str]) -> Result<(), Error> {
        let msg = codec::encode_message(verb, &self.my_callsign, fields);
        self.stream.write_all(msg.as_bytes())?;
        Ok(())
    }
}

/// Runs on a dedicated thread: blocks on `BufRead::read_line`, never the
/// main loop. Pushes each line onto the bounded channel, dropping it if the
/// channel is full rather than blocking the socket read indefinitely.
fn read_loop(stream: TcpStream, tx: Sender<String>, connected: Arc<AtomicBool>) {
    let mut reader = BufReader::new(stream);
    let mut buf = String::new();
    loop {
        buf.clear();
        match reader.read_line(&mut buf) {
            Ok(0) => {
                connected.store(false, Ordering::SeqCst);
                break;
            }
            Ok(_) => {
                let line = buf.trim_end_matches(|c| c == '\r' || c == '\n');
                if !line.is_empty() {
                    let _ = tx.try_send(line.to_string());
                }
            }
            Err(_) => {
                connected.store(false, Ordering::SeqCst);
                break;
            }
        }
    }
}

fn text_target_fields(target: &TextTarget) -> (&'static str, String) {
    match target {
        TextTarget::Broadcast => ("ALL", String::new()),
        TextTarget::Private(to) => ("PRIVATE", to.clone()),
        TextTarget::Wallop => ("WALLOP", String::new()),
        TextTarget::AtcChannel => ("ATC", String::new()),
        TextTarget::Frequency(freq) => ("FREQ", freq.clone()),
    }
}

impl ControlBackend for LiveBackend {
    fn get_updates(&mut self, world: &mut World) -> Result<(), Error> {
        let now = self.current_time();
        loop {
            match self.incoming_rx.try_recv() {
                Ok(line) => match codec::dispatch_line(&line, MESSAGE_TABLE, world, now) {
                    Ok(true) => {}
                    Ok(false) => warn!("no message spec matched line: {}", line),
                    Err(e) => return Err(e),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.connected.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
        Ok(())
    }

    fn current_time(&self) -> i64 {
        now_wall_clock()
    }

    fn callsign(&self) -> &str {
        &self.my_callsign
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    fn set_squawk_manual(&mut self, callsign: &str, squawk: u16) -> Result<(), Error> {
        self.send_line("$SQ", &[callsign, &codec::format_squawk_octal(squawk)])
    }

    fn set_squawk_auto(&mut self, callsign: &str) -> Result<(), Error> {
        self.send_line("$SQ", &[callsign, "AUTO"])
    }

    fn set_scratchpad(&mut self, callsign: &str, text: &str) -> Result<(), Error> {
        self.send_line("$SP", &[callsign, text])
    }

    fn set_temp_altitude(&mut self, callsign: &str, altitude: Option<i32>) -> Result<(), Error> {
        let text = altitude.map(|a| a.to_string()).unwrap_or_else(|| "0".to_string());
        self.send_line("$TA", &[callsign, &text])
    }

    fn amend_flight_plan(&mut self, callsign: &str, fp: FlightPlan) -> Result<(), Error> {
        let rule = if fp.is_ifr { "I" } else { "V" };
        let cruise = fp.cruise_altitude.to_string();
        self.send_line(
            "$FP",
            &[
                callsign,
                rule,
                &fp.aircraft_type,
                &cruise,
                &fp.departure,
                &fp.arrival,
                &fp.route,
            ],
        )
    }

    fn amend_route(&mut self, callsign: &str, route: &str) -> Result<(), Error> {
        self.send_line("$RT", &[callsign, route])
    }

    fn push_flight_strip(&mut self, callsign: &str, to_controller: &str) -> Result<(), Error> {
        self.send_line("$PS", &[callsign, to_controller])
    }

    fn initiate_track(&mut self, callsign: &str) -> Result<(), Error> {
        self.send_line("$TI", &[callsign])
    }

    fn drop_track(&mut self, callsign: &str) -> Result<(), Error> {
        self.send_line("$TD", &[callsign])
    }

    fn offer_handoff(&mut self, callsign: &str, to_controller: &str) -> Result<(), Error> {
        self.send_line("$HO", &["OFFER", to_controller, callsign])
    }

    fn accept_handoff(&mut self, callsign: &str) -> Result<(), Error> {
        self.send_line("$HO", &["ACCEPT", "", callsign])
    }

    fn reject_handoff(&mut self, callsign: &str) -> Result<(), Error> {
        self.send_line("$HO", &["REJECT", "", callsign])
    }

    fn point_out(&mut self, callsign: &str, to_controller: &str) -> Result<(), Error> {
        self.send_line("$PO", &[callsign, to_controller])
    }

    fn send_text_message(&mut self, target: TextTarget, text: &str) -> Result<(), Error> {
        let (kind, extra) = text_target_fields(&target);
        self.send_line("$TM", &[kind, &extra, text])
    }

    fn set_voice_type(&mut self, callsign: &str, voice: VoiceCapability) -> Result<(), Error> {
        let code = match voice {
            VoiceCapability::Voice => "V",
            VoiceCapability::Receive => "R",
            VoiceCapability::Text => "T",
        };
        self.send_line("$VT", &[callsign, code])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    #[test]
    fn pilot_position_updates_track_and_squawk() {
        let mut world = World::new();
        let fields = ["AAL123", "1200", "40.5", "-73.8", "10000", "250", "090"];
        handle_pilot_position("AAL123", &fields, &mut world, 100).unwrap();
        let ac = world.get_aircraft("AAL123").unwrap();
        assert_eq!(ac.altitude, 10000);
        assert_eq!(ac.squawk, 0o1200);
    }

    #[test]
    fn flight_plan_parses_ifr_and_route() {
        let mut world = World::new();
        let fields = ["I", "B738", "35000", "KJFK", "KLAX", "DCT", "WAVEY"];
        handle_flight_plan("AAL123", &fields, &mut world, 0).unwrap();
        let ac = world.get_aircraft("AAL123").unwrap();
        let fp = ac.flight_plan.as_ref().unwrap();
        assert!(fp.is_ifr);
        assert_eq!(fp.cruise_altitude, 35000);
        assert_eq!(fp.route, "DCT:WAVEY");
    }

    #[test]
    fn handoff_offer_then_accept_sets_tracking() {
        let mut world = World::new();
        world.track_received("AAL123", LatLon::default(), 10000, 250, 0.0, 1);
        let offer_fields = ["OFFER", "JFK_TWR", "AAL123"];
        handle_handoff_offer("N90_APP", &offer_fields, &mut world, 0).unwrap();
        assert_eq!(
            world.get_aircraft("AAL123").unwrap().outbound_handoff.as_deref(),
            Some("JFK_TWR")
        );

        let accept_fields = ["ACCEPT", "N90_APP", "AAL123"];
        handle_handoff_accept("JFK_TWR", &accept_fields, &mut world, 0).unwrap();
        assert_eq!(
            world.get_aircraft("AAL123").unwrap().tracking_controller.as_deref(),
            Some("JFK_TWR")
        );
    }

    #[test]
    fn dispatch_drops_unmatched_line_without_erroring() {
        let mut world = World::new();
        let matched = codec::dispatch_line("!GARBAGE:line", MESSAGE_TABLE, &mut world, 0).unwrap();
        assert!(!matched);
    }

    #[test]
    fn atc_disconnect_removes_controller() {
        use crate::world::{Controller, ControllerRating};
        let mut world = World::new();
        world.controller_added(Controller {
            callsign: "JFK_TWR".into(),
            frequency: "118.700".into(),
            scope_char: 'T',
            sector: String::new(),
            rating: ControllerRating::C1,
            primary_radar_centers: vec![],
            range: 30,
        });
        handle_atc_disconnect("JFK_TWR", &[], &mut world, 0).unwrap();
        assert!(world.get_controller("JFK_TWR").is_none());
    }
}
