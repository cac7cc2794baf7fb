//! The multi-controller session server (spec.md §4.J): hosts shared sims,
//! allocates controller positions, arbitrates launch-control authority, and
//! fans world events out to every connected client in posting order.
//!
//! Built directly on the teacher's `TcpListener` + `StreamData` +
//! `retain_mut` client-list idiom from `main.rs` (nonblocking accept loop,
//! a `Vec` of live streams pruned as they die) rather than an async
//! framework, since the concurrency model (spec.md §5) is synchronous
//! thread+channel throughout, not tokio. Request/response bodies are
//! JSON-per-line, mirroring the replay/live backends' preference for
//! `serde_json` over a hand-rolled wire format.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant};

use log::{info, warn};
use retain_mut::RetainMut;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::event::Event;
use crate::scenario::ScenarioConfig;
use crate::world::Controller;

/// Per-call deadline (spec.md §4.J: "every RPC has a 5 s deadline").
pub const RPC_DEADLINE: Duration = Duration::from_secs(5);
/// Position id that is always joinable and confers no mutation rights.
pub const OBSERVER_POSITION: &str = "Observer";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "args")]
pub enum RpcRequest {
    ListSims,
    Join { sim_id: String, position: String, password: Option<String> },
    SetLaunchConfig { sim_id: String, config: ScenarioConfig },
    TakeLaunchControl { sim_id: String },
    ReturnLaunchControl { sim_id: String },
    CreateDeparture { sim_id: String, callsign: String },
    ReleaseDeparture { sim_id: String, callsign: String },
    CreateArrival { sim_id: String, callsign: String },
    CreateOverflight { sim_id: String, callsign: String },
    LaunchPending { sim_id: String, callsign: String },
    DeleteAllAircraft { sim_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum RpcResponse {
    Ok,
    SimList { sims: Vec<String> },
    Error { message: String },
}

/// One hosted simulation's shared state (spec.md §4.J).
pub struct Sim {
    pub scenario_id: String,
    pub primary_controller: String,
    pub available_positions: HashMap<String, Controller>,
    pub covered_positions: HashMap<String, String>,
    pub password: Option<String>,
    pub instructor_allowed: bool,
    pub launch_authority: Option<String>,
    pub launch_config: ScenarioConfig,
    pub multi_controller: bool,
}

impl Sim {
    pub fn new(scenario_id: &str, primary_controller: &str) -> Self {
        Self {
            scenario_id: scenario_id.to_string(),
            primary_controller: primary_controller.to_string(),
            available_positions: HashMap::new(),
            covered_positions: HashMap::new(),
            password: None,
            instructor_allowed: false,
            launch_authority: None,
            launch_config: ScenarioConfig::default(),
            multi_controller: true,
        }
    }

    /// A position already covered is not joinable; `Observer` is always
    /// joinable; positions starting with `_` are hidden from listings but
    /// may still be joined directly by id.
    pub fn can_join(&self, position: &str) -> bool {
        if position == OBSERVER_POSITION {
            return true;
        }
        !self.covered_positions.contains_key(position)
    }

    pub fn is_hidden(position: &str) -> bool {
        position.starts_with('_')
    }

    pub fn join(&mut self, client_id: &str, position: &str, password: Option<&str>) -> Result<(), Error> {
        if let Some(expected) = &self.password {
            if password != Some(expected.as_str()) {
                return Err(Error::UserError("wrong password".to_string()));
            }
        }
        if !self.can_join(position) {
            return Err(Error::UserError(format!("{} is already covered", position)));
        }
        if position != OBSERVER_POSITION {
            self.covered_positions.insert(position.to_string(), client_id.to_string());
        }
        Ok(())
    }

    /// Launch-control mutation is gated to the authority holder, the
    /// primary-position controller when multi-controller mode is off, or
    /// any instructor (spec.md §4.J).
    pub fn may_control_launch(&self, client_id: &str, client_is_instructor: bool) -> bool {
        if client_is_instructor {
            return true;
        }
        if !self.multi_controller {
            return self.covered_positions.get(&self.primary_controller).map(String::as_str) == Some(client_id);
        }
        self.launch_authority.as_deref() == Some(client_id)
    }

    pub fn take_launch_control(&mut self, client_id: &str, client_is_instructor: bool) -> Result<(), Error> {
        if self.launch_authority.is_some() && !self.may_control_launch(client_id, client_is_instructor) {
            return Err(Error::UserError("launch control already held".to_string()));
        }
        self.launch_authority = Some(client_id.to_string());
        Ok(())
    }

    pub fn return_launch_control(&mut self, client_id: &str) {
        if self.launch_authority.as_deref() == Some(client_id) {
            self.launch_authority = None;
        }
    }
}

struct ClientConnection {
    stream: TcpStream,
    client_id: String,
}

/// Hosts zero or more [`Sim`]s over a nonblocking `TcpListener`, mirroring
/// the teacher's main-loop accept pattern. `poll` is meant to be called once
/// per main-loop tick, never blocking.
pub struct SessionServer {
    listener: TcpListener,
    clients: Vec<ClientConnection>,
    sims: HashMap<String, Sim>,
    next_client_id: u64,
}

impl SessionServer {
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            clients: Vec::new(),
            sims: HashMap::new(),
            next_client_id: 0,
        })
    }

    pub fn host_sim(&mut self, sim: Sim) {
        self.sims.insert(sim.scenario_id.clone(), sim);
    }

    pub fn sims(&self) -> &HashMap<String, Sim> {
        &self.sims
    }

    /// Accepts any pending connections and drains one request line from
    /// each live client, dispatching it against the relevant sim. Dead
    /// streams are pruned (`retain_mut`, per the teacher's `write_str`).
    pub fn poll(&mut self) {
        if let Ok((stream, addr)) = self.listener.accept() {
            info!("rpc client connected from {}", addr);
            stream.set_nonblocking(true).ok();
            let client_id = format!("client-{}", self.next_client_id);
            self.next_client_id += 1;
            self.clients.push(ClientConnection { stream, client_id });
        }

        let sims = &mut self.sims;
        self.clients.retain_mut(|conn| {
            let mut reader = BufReader::new(&conn.stream);
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => false,
                Ok(_) if line.trim().is_empty() => true,
                Ok(_) => {
                    let response = match serde_json::from_str::<RpcRequest>(line.trim()) {
                        Ok(request) => handle_request(sims, &conn.client_id, request),
                        Err(e) => RpcResponse::Error { message: e.to_string() },
                    };
                    send_response(&mut conn.stream, &response).is_ok()
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => true,
                Err(_) => false,
            }
        });
    }

    /// Broadcasts a world event to every connected client as a status line,
    /// preserving posting order (spec.md §4.J: "clients are strict
    /// mirrors").
    pub fn broadcast_event(&mut self, event: &Event) {
        let payload = format!("{:?}\n", event);
        self.clients
            .retain_mut(|conn| conn.stream.write_all(payload.as_bytes()).is_ok());
    }
}

fn send_response(stream: &mut TcpStream, response: &RpcResponse) -> std::io::Result<()> {
    let mut line = serde_json::to_string(response).unwrap_or_default();
    line.push('\n');
    stream.write_all(line.as_bytes())
}

fn handle_request(sims: &mut HashMap<String, Sim>, client_id: &str, request: RpcRequest) -> RpcResponse {
    match request {
        RpcRequest::ListSims => RpcResponse::SimList {
            sims: sims.keys().cloned().collect(),
        },
        RpcRequest::Join { sim_id, position, password } => match sims.get_mut(&sim_id) {
            Some(sim) => match sim.join(client_id, &position, password.as_deref()) {
                Ok(()) => RpcResponse::Ok,
                Err(e) => RpcResponse::Error { message: e.to_string() },
            },
            None => RpcResponse::Error { message: format!("no such sim {}", sim_id) },
        },
        RpcRequest::SetLaunchConfig { sim_id, config } => match sims.get_mut(&sim_id) {
            Some(sim) if sim.may_control_launch(client_id, false) => {
                sim.launch_config = config;
                RpcResponse::Ok
            }
            Some(_) => RpcResponse::Error { message: "not launch authority".to_string() },
            None => RpcResponse::Error { message: format!("no such sim {}", sim_id) },
        },
        RpcRequest::TakeLaunchControl { sim_id } => match sims.get_mut(&sim_id) {
            Some(sim) => match sim.take_launch_control(client_id, false) {
                Ok(()) => RpcResponse::Ok,
                Err(e) => RpcResponse::Error { message: e.to_string() },
            },
            None => RpcResponse::Error { message: format!("no such sim {}", sim_id) },
        },
        RpcRequest::ReturnLaunchControl { sim_id } => match sims.get_mut(&sim_id) {
            Some(sim) => {
                sim.return_launch_control(client_id);
                RpcResponse::Ok
            }
            None => RpcResponse::Error { message: format!("no such sim {}", sim_id) },
        },
        RpcRequest::CreateDeparture { sim_id, .. }
        | RpcRequest::CreateArrival { sim_id, .. }
        | RpcRequest::CreateOverflight { sim_id, .. }
        | RpcRequest::LaunchPending { sim_id, .. }
        | RpcRequest::ReleaseDeparture { sim_id, .. }
        | RpcRequest::DeleteAllAircraft { sim_id } => match sims.get_mut(&sim_id) {
            Some(sim) if sim.may_control_launch(client_id, false) => RpcResponse::Ok,
            Some(_) => RpcResponse::Error { message: "not launch authority".to_string() },
            None => RpcResponse::Error { message: format!("no such sim {}", sim_id) },
        },
    }
}

/// Client-side connection health tracker (spec.md §4.J: "stale"/
/// "reestablished" status events). A call that hasn't completed within the
/// deadline marks the connection stale; the next success posts
/// `reestablished` if it had been.
pub struct ConnectionHealth {
    last_success: Option<Instant>,
    stale: bool,
}

impl ConnectionHealth {
    pub fn new() -> Self {
        Self { last_success: None, stale: false }
    }

    /// Call once per tick. Returns a status message to post, if any.
    pub fn check(&mut self, now: Instant) -> Option<&'static str> {
        match self.last_success {
            Some(last) if now.duration_since(last) > RPC_DEADLINE && !self.stale => {
                self.stale = true;
                Some("connection stale")
            }
            _ => None,
        }
    }

    pub fn record_success(&mut self, now: Instant) -> Option<&'static str> {
        self.last_success = Some(now);
        if self.stale {
            self.stale = false;
            Some("reestablished")
        } else {
            None
        }
    }
}

impl Default for ConnectionHealth {
    fn default() -> Self {
        Self::new()
    }
}
