//! The canonical aircraft, controller, flight-plan, METAR, and handoff
//! state (spec.md §3, §4.C). The world model is mutated only through the
//! callback surface below; it is read-only everywhere else, including the
//! render path (spec.md §4.C invariant).

use std::collections::{HashMap, VecDeque};

use crate::event::{Event, EventStream, SubscriberId};
use crate::geometry::LatLon;

/// Aircraft whose latest track is older than this many seconds are
/// considered lost, per spec.md §3.
pub const LOST_TRACK_SECONDS: i64 = 30;
/// Minimum number of retained track history entries (spec.md §3: "N >= 10").
pub const MIN_TRACK_HISTORY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransponderMode {
    Standby,
    Charlie,
    Ident,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCapability {
    Voice,
    Receive,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffState {
    Offered,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub position: LatLon,
    pub altitude: i32,
    pub ground_speed: u32,
    pub heading: f32,
    /// Unix epoch seconds. Callers supply `now` rather than this module
    /// reading the clock, so staleness checks stay pure and testable.
    pub time: i64,
}

#[derive(Debug, Clone, Default)]
pub struct FlightPlan {
    pub is_ifr: bool,
    /// Canonical aircraft type, e.g. "B738" or "B738/L".
    pub aircraft_type: String,
    pub cruise_altitude: i32,
    pub departure: String,
    pub arrival: String,
    pub route: String,
    pub remarks: String,
}

impl FlightPlan {
    /// The type code without an equipment suffix (text after `/`).
    pub fn type_without_suffix(&self) -> &str {
        self.aircraft_type
            .split('/')
            .next()
            .unwrap_or(&self.aircraft_type)
    }
}

#[derive(Debug, Clone)]
pub struct Aircraft {
    pub callsign: String,
    pub position: LatLon,
    pub altitude: i32,
    pub ground_speed: u32,
    pub heading: f32,
    pub squawk: u16,
    pub assigned_squawk: u16,
    pub transponder_mode: TransponderMode,
    pub voice_capability: VoiceCapability,
    pub tracking_controller: Option<String>,
    pub inbound_handoff: Option<String>,
    pub outbound_handoff: Option<String>,
    pub temp_altitude: Option<i32>,
    pub scratchpad: String,
    pub flight_plan: Option<FlightPlan>,
    /// Newest first (index 0), capacity `MIN_TRACK_HISTORY` or more.
    pub tracks: VecDeque<Track>,
    track_capacity: usize,
}

impl Aircraft {
    fn new(callsign: String) -> Self {
        Self {
            callsign,
            position: LatLon::default(),
            altitude: 0,
            ground_speed: 0,
            heading: 0.0,
            squawk: 0,
            assigned_squawk: 0,
            transponder_mode: TransponderMode::Standby,
            voice_capability: VoiceCapability::Voice,
            tracking_controller: None,
            inbound_handoff: None,
            outbound_handoff: None,
            temp_altitude: None,
            scratchpad: String::new(),
            flight_plan: None,
            tracks: VecDeque::new(),
            track_capacity: MIN_TRACK_HISTORY,
        }
    }

    fn push_track(&mut self, track: Track) {
        self.position = track.position;
        self.altitude = track.altitude;
        self.ground_speed = track.ground_speed;
        self.heading = track.heading;
        self.tracks.push_front(track);
        while self.tracks.len() > self.track_capacity {
            self.tracks.pop_back();
        }
    }

    pub fn latest_track_time(&self) -> Option<i64> {
        self.tracks.front().map(|t| t.time)
    }

    /// True when `now - latest track time > 30s`, per spec.md §3.
    pub fn lost_track(&self, now: i64) -> bool {
        match self.latest_track_time() {
            Some(t) => now - t > LOST_TRACK_SECONDS,
            None => true,
        }
    }

    /// The effective displayed altitude: temporary clearance altitude if
    /// set, else the flight plan's filed cruise altitude.
    pub fn effective_temp_or_filed_altitude(&self) -> Option<i32> {
        self.temp_altitude
            .or_else(|| self.flight_plan.as_ref().map(|fp| fp.cruise_altitude))
    }

    /// The effective squawk: assigned if set and nonzero, else actual.
    pub fn effective_squawk(&self) -> u16 {
        if self.assigned_squawk != 0 {
            self.assigned_squawk
        } else {
            self.squawk
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerRating {
    Observer,
    S1,
    S2,
    S3,
    C1,
    C2,
    C3,
    Instructor,
    Supervisor,
}

#[derive(Debug, Clone)]
pub struct Controller {
    pub callsign: String,
    pub frequency: String,
    pub scope_char: char,
    pub sector: String,
    pub rating: ControllerRating,
    pub primary_radar_centers: Vec<String>,
    pub range: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Wind {
    /// -1 means variable, per spec.md §3.
    pub direction: i32,
    pub speed: u32,
    pub gust: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Metar {
    pub airport: String,
    pub altimeter: f32,
    pub wind: Wind,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct HandoffRelationship {
    pub aircraft: String,
    pub from: String,
    pub to: String,
    pub state: HandoffState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStyle {
    Regular,
    Emphasized,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConsoleEntry {
    pub text: String,
    pub style: ConsoleStyle,
}

/// Bounded ring of console lines (capacity 250, spec.md §3/§8).
pub struct Console {
    entries: VecDeque<ConsoleEntry>,
    capacity: usize,
    written: u64,
}

impl Console {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: 250,
            written: 0,
        }
    }

    pub fn push(&mut self, text: impl Into<String>, style: ConsoleStyle) {
        self.entries.push_back(ConsoleEntry {
            text: text.into(),
            style,
        });
        self.written += 1;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConsoleEntry> {
        self.entries.iter()
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Set of changes accumulated during one polling cycle (spec.md §3). Reset
/// at the start of each cycle by the caller; never outlives it.
#[derive(Debug, Clone, Default)]
pub struct ControlUpdates {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
    pub point_outs: HashMap<String, String>,
    pub handoffs_offered: HashMap<String, HandoffRelationship>,
    pub handoffs_accepted: HashMap<String, HandoffRelationship>,
    pub handoffs_rejected: HashMap<String, HandoffRelationship>,
    pub messages: Vec<String>,
}

impl ControlUpdates {
    pub fn reset(&mut self) {
        *self = ControlUpdates::default();
    }
}

/// The authoritative world state. Mutated only through the methods below,
/// which are meant to be called exclusively by the active backend (spec.md
/// §4.C). Every mutation both updates state and posts the corresponding
/// event.
pub struct World {
    aircraft: HashMap<String, Aircraft>,
    controllers: HashMap<String, Controller>,
    metars: HashMap<String, Metar>,
    events: EventStream,
}

impl World {
    pub fn new() -> Self {
        Self {
            aircraft: HashMap::new(),
            controllers: HashMap::new(),
            metars: HashMap::new(),
            events: EventStream::new(),
        }
    }

    pub fn subscribe(&mut self) -> SubscriberId {
        self.events.subscribe()
    }

    pub fn drain_events(&mut self, id: SubscriberId) -> Vec<Event> {
        self.events.drain(id)
    }

    // ---- read-only lookups ----

    pub fn get_aircraft(&self, callsign: &str) -> Option<&Aircraft> {
        self.aircraft.get(callsign)
    }

    pub fn get_filtered_aircraft<F>(&self, predicate: F) -> Vec<&Aircraft>
    where
        F: Fn(&Aircraft) -> bool,
    {
        self.aircraft.values().filter(|a| predicate(a)).collect()
    }

    pub fn get_controller(&self, callsign: &str) -> Option<&Controller> {
        self.controllers.get(callsign)
    }

    pub fn get_metar(&self, airport: &str) -> Option<&Metar> {
        self.metars.get(airport)
    }

    pub fn aircraft_count(&self) -> usize {
        self.aircraft.len()
    }

    // ---- mutation callbacks (backend-only) ----

    pub fn track_received(
        &mut self,
        callsign: &str,
        position: LatLon,
        altitude: i32,
        ground_speed: u32,
        heading: f32,
        now: i64,
    ) {
        let is_new = !self.aircraft.contains_key(callsign);
        let ac = self
            .aircraft
            .entry(callsign.to_string())
            .or_insert_with(|| Aircraft::new(callsign.to_string()));
        ac.push_track(Track {
            position,
            altitude,
            ground_speed,
            heading,
            time: now,
        });

        if is_new {
            self.events.post(Event::AddedAircraft(callsign.to_string()));
        } else {
            self.events
                .post(Event::ModifiedAircraft(callsign.to_string()));
        }
    }

    pub fn flight_plan_amended(&mut self, callsign: &str, fp: FlightPlan) {
        let ac = self
            .aircraft
            .entry(callsign.to_string())
            .or_insert_with(|| Aircraft::new(callsign.to_string()));
        ac.flight_plan = Some(fp);
        self.events
            .post(Event::FlightPlanAmended(callsign.to_string()));
    }

    pub fn squawk_assigned(&mut self, callsign: &str, squawk: u16) -> bool {
        let ac = match self.aircraft.get_mut(callsign) {
            Some(a) => a,
            None => return false,
        };
        ac.assigned_squawk = squawk;
        self.events.post(Event::SquawkAssigned(callsign.to_string()));
        true
    }

    pub fn transponder_squawk_received(&mut self, callsign: &str, squawk: u16) -> bool {
        let ac = match self.aircraft.get_mut(callsign) {
            Some(a) => a,
            None => return false,
        };
        ac.squawk = squawk;
        self.events.post(Event::ModifiedAircraft(callsign.to_string()));
        true
    }

    pub fn scratchpad_set(&mut self, callsign: &str, text: &str) -> bool {
        let ac = match self.aircraft.get_mut(callsign) {
            Some(a) => a,
            None => return false,
        };
        ac.scratchpad = text.chars().take(3).collect();
        self.events.post(Event::ScratchpadSet(callsign.to_string()));
        true
    }

    pub fn temp_altitude_set(&mut self, callsign: &str, altitude: Option<i32>) -> bool {
        let ac = match self.aircraft.get_mut(callsign) {
            Some(a) => a,
            None => return false,
        };
        ac.temp_altitude = altitude;
        self.events.post(Event::ModifiedAircraft(callsign.to_string()));
        true
    }

    pub fn track_initiated(&mut self, callsign: &str, controller: &str) -> bool {
        let ac = match self.aircraft.get_mut(callsign) {
            Some(a) => a,
            None => return false,
        };
        ac.tracking_controller = Some(controller.to_string());
        self.events.post(Event::ModifiedAircraft(callsign.to_string()));
        true
    }

    pub fn track_dropped(&mut self, callsign: &str) -> bool {
        let ac = match self.aircraft.get_mut(callsign) {
            Some(a) => a,
            None => return false,
        };
        ac.tracking_controller = None;
        self.events.post(Event::ModifiedAircraft(callsign.to_string()));
        true
    }

    /// Offers a handoff from `from` to `to` for `aircraft`. Clears any
    /// pending handoff in the other direction first, preserving the "at
    /// most one of inbound/outbound" invariant (spec.md §3).
    pub fn handoff_offered(&mut self, aircraft: &str, from: &str, to: &str) -> bool {
        let ac = match self.aircraft.get_mut(aircraft) {
            Some(a) => a,
            None => return false,
        };
        ac.inbound_handoff = None;
        ac.outbound_handoff = Some(to.to_string());
        self.events.post(Event::Handoff {
            callsign: aircraft.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            state: HandoffState::Offered,
        });
        true
    }

    pub fn handoff_accepted(&mut self, aircraft: &str, from: &str, to: &str) -> bool {
        let ac = match self.aircraft.get_mut(aircraft) {
            Some(a) => a,
            None => return false,
        };
        ac.outbound_handoff = None;
        ac.inbound_handoff = None;
        ac.tracking_controller = Some(to.to_string());
        self.events.post(Event::Handoff {
            callsign: aircraft.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            state: HandoffState::Accepted,
        });
        true
    }

    pub fn handoff_rejected(&mut self, aircraft: &str, from: &str, to: &str) -> bool {
        let ac = match self.aircraft.get_mut(aircraft) {
            Some(a) => a,
            None => return false,
        };
        ac.outbound_handoff = None;
        ac.inbound_handoff = None;
        self.events.post(Event::Handoff {
            callsign: aircraft.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            state: HandoffState::Rejected,
        });
        true
    }

    pub fn controller_added(&mut self, controller: Controller) {
        let callsign = controller.callsign.clone();
        self.controllers.insert(callsign.clone(), controller);
        self.events.post(Event::ControllerAdded(callsign));
    }

    pub fn controller_removed(&mut self, callsign: &str) {
        self.controllers.remove(callsign);
        self.events
            .post(Event::ControllerRemoved(callsign.to_string()));
    }

    pub fn text_message_received(&mut self, from: &str, text: &str) {
        self.events.post(Event::TextMessage {
            from: from.to_string(),
            text: text.to_string(),
        });
    }

    pub fn metar_updated(&mut self, metar: Metar) {
        self.metars.insert(metar.airport.clone(), metar.clone());
        self.events.post(Event::MetarUpdated(metar));
    }

    pub fn remove_aircraft(&mut self, callsign: &str) {
        if self.aircraft.remove(callsign).is_some() {
            self.events
                .post(Event::RemovedAircraft(callsign.to_string()));
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_received_creates_and_then_modifies() {
        let mut world = World::new();
        let sub = world.subscribe();

        world.track_received("AAL123", LatLon { lat: 1.0, lon: 2.0 }, 10000, 250, 90.0, 100);
        world.track_received("AAL123", LatLon { lat: 1.1, lon: 2.1 }, 10100, 250, 90.0, 103);

        let events = world.drain_events(sub);
        assert_eq!(events[0], Event::AddedAircraft("AAL123".into()));
        assert_eq!(events[1], Event::ModifiedAircraft("AAL123".into()));

        let ac = world.get_aircraft("AAL123").unwrap();
        assert_eq!(ac.tracks.len(), 2);
        // Newest at front.
        assert_eq!(ac.tracks[0].time, 103);
        assert_eq!(ac.tracks[1].time, 100);
    }

    #[test]
    fn track_history_is_bounded() {
        let mut world = World::new();
        for i in 0..(MIN_TRACK_HISTORY as i64 + 5) {
            world.track_received("AAL123", LatLon::default(), 10000, 250, 0.0, i);
        }
        let ac = world.get_aircraft("AAL123").unwrap();
        assert_eq!(ac.tracks.len(), MIN_TRACK_HISTORY);
        // Newest (highest time) at front.
        assert_eq!(ac.tracks[0].time, MIN_TRACK_HISTORY as i64 + 4);
    }

    #[test]
    fn lost_track_after_30s() {
        let mut world = World::new();
        world.track_received("AAL123", LatLon::default(), 10000, 250, 0.0, 100);
        let ac = world.get_aircraft("AAL123").unwrap();
        assert!(!ac.lost_track(120));
        assert!(ac.lost_track(131));
    }

    #[test]
    fn handoff_offer_accept_clears_outbound_and_sets_tracking() {
        let mut world = World::new();
        world.track_received("AAL123", LatLon::default(), 10000, 250, 0.0, 1);
        world.handoff_offered("AAL123", "N90_APP", "JFK_TWR");
        {
            let ac = world.get_aircraft("AAL123").unwrap();
            assert_eq!(ac.outbound_handoff.as_deref(), Some("JFK_TWR"));
            assert_eq!(ac.inbound_handoff, None);
        }
        world.handoff_accepted("AAL123", "N90_APP", "JFK_TWR");
        let ac = world.get_aircraft("AAL123").unwrap();
        assert_eq!(ac.outbound_handoff, None);
        assert_eq!(ac.tracking_controller.as_deref(), Some("JFK_TWR"));
    }

    #[test]
    fn scratchpad_is_clamped_to_three_chars() {
        let mut world = World::new();
        world.track_received("AAL123", LatLon::default(), 10000, 250, 0.0, 1);
        world.scratchpad_set("AAL123", "ABCDEF");
        assert_eq!(world.get_aircraft("AAL123").unwrap().scratchpad, "ABC");
    }

    #[test]
    fn console_ring_retains_only_last_250() {
        let mut console = Console::new();
        for i in 0..300 {
            console.push(format!("line {}", i), ConsoleStyle::Regular);
        }
        assert_eq!(console.len(), 250);
        assert_eq!(console.written(), 300);
        assert_eq!(console.entries().next().unwrap().text, "line 50");
    }

    #[test]
    fn effective_squawk_prefers_assigned() {
        let mut world = World::new();
        world.track_received("AAL123", LatLon::default(), 10000, 250, 0.0, 1);
        world.transponder_squawk_received("AAL123", 0o1200);
        assert_eq!(world.get_aircraft("AAL123").unwrap().effective_squawk(), 0o1200);
        world.squawk_assigned("AAL123", 0o4321);
        assert_eq!(world.get_aircraft("AAL123").unwrap().effective_squawk(), 0o4321);
    }
}
