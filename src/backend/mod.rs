//! Polymorphic control server (spec.md §4.D): a uniform interface over the
//! live protocol, the replay engine, HTTP ingest, a simulated world, and a
//! disconnected stub. Exactly one is active at a time; switching is a full
//! teardown/setup (a new `Box<dyn ControlBackend>` replaces the old one).
//!
//! Expressed as a capability trait per spec.md §9's design note: five read
//! methods every backend provides, plus the mutation surface, where
//! unsupported mutations return `Error::BackendUnsupported` rather than
//! panicking or silently no-opping.

pub mod codec;
pub mod disconnected;
pub mod ingest;
pub mod live;
pub mod replay;
pub mod simulated;

use crate::error::Error;
use crate::world::{FlightPlan, TransponderMode, VoiceCapability, World};

/// Everything every backend must provide, plus the mutation surface a
/// read-only backend answers with `Error::BackendUnsupported`.
pub trait ControlBackend {
    // ---- common contract (5 methods) ----

    /// Pulls any pending network or timer work and applies it to `world`.
    /// Must be non-blocking: blocking I/O lives in a dedicated task that
    /// feeds a channel this drains.
    fn get_updates(&mut self, world: &mut World) -> Result<(), Error>;

    /// Wall clock for live/ingest backends, stream time for replay,
    /// simulated time for the simulator. Unix epoch seconds.
    fn current_time(&self) -> i64;

    fn callsign(&self) -> &str;

    fn connected(&self) -> bool;

    fn disconnect(&mut self);

    // ---- mutation surface ----

    fn set_squawk_manual(&mut self, _callsign: &str, _squawk: u16) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn set_squawk_auto(&mut self, _callsign: &str) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn set_scratchpad(&mut self, _callsign: &str, _text: &str) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn set_temp_altitude(&mut self, _callsign: &str, _altitude: Option<i32>) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn amend_flight_plan(&mut self, _callsign: &str, _fp: FlightPlan) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn amend_route(&mut self, _callsign: &str, _route: &str) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn push_flight_strip(&mut self, _callsign: &str, _to_controller: &str) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn initiate_track(&mut self, _callsign: &str) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn drop_track(&mut self, _callsign: &str) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn offer_handoff(&mut self, _callsign: &str, _to_controller: &str) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn accept_handoff(&mut self, _callsign: &str) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn reject_handoff(&mut self, _callsign: &str) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn point_out(&mut self, _callsign: &str, _to_controller: &str) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn send_text_message(&mut self, _target: TextTarget, _text: &str) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn set_voice_type(&mut self, _callsign: &str, _voice: VoiceCapability) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }

    fn set_transponder_mode(
        &mut self,
        _callsign: &str,
        _mode: TransponderMode,
    ) -> Result<(), Error> {
        Err(Error::BackendUnsupported)
    }
}

/// Destination of a text message (spec.md §6: "broadcast, private, wallop,
/// ATC-channel, frequency-targeted").
#[derive(Debug, Clone, PartialEq)]
pub enum TextTarget {
    Broadcast,
    Private(String),
    Wallop,
    AtcChannel,
    Frequency(String),
}
