use std::fmt::Display;
use std::time::Duration;

use log::{error, info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use atc_scope::airports::Airports;
use atc_scope::backend::disconnected::DisconnectedBackend;
use atc_scope::backend::ingest::IngestBackend;
use atc_scope::backend::live::LiveBackend;
use atc_scope::backend::replay::ReplayBackend;
use atc_scope::backend::simulated::SimulatedBackend;
use atc_scope::backend::ControlBackend;
use atc_scope::cli::ConsoleSession;
use atc_scope::config::{self, BackendKind, ConfigData, AIRPORT_DATA_FILENAME, CONFIG_FILENAME};
use atc_scope::rpc::{Sim, SessionServer};
use atc_scope::world::World;

fn display_msg_and_exit(msg: impl Display) -> ! {
    println!("{}\nPress the enter key to exit.", msg);
    let mut buf = String::new();
    std::io::stdin().read_line(&mut buf).ok();
    std::process::exit(0);
}

fn parse_args() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--replay" {
            return args.next();
        }
    }
    None
}

fn build_backend(config: &ConfigData, replay_override: Option<&str>) -> Result<Box<dyn ControlBackend>, atc_scope::error::Error> {
    if let Some(path) = replay_override {
        return Ok(Box::new(ReplayBackend::open(path, &config.callsign, 0.0, config.replay_rate)?));
    }
    match config.backend {
        BackendKind::Live => Ok(Box::new(LiveBackend::connect(&config.live_address, &config.callsign)?)),
        BackendKind::Replay => Ok(Box::new(ReplayBackend::open(
            &config.replay_path,
            &config.callsign,
            0.0,
            config.replay_rate,
        )?)),
        BackendKind::Ingest => {
            let airports = Airports::new(AIRPORT_DATA_FILENAME)?;
            let bounds = airports
                .get_bounds_from_radius(&config.airport, config.range as f64)
                .ok_or(atc_scope::error::Error::NotFound)?;
            Ok(Box::new(IngestBackend::new(&config.ingest_endpoint, &bounds)))
        }
        BackendKind::Simulated => Ok(Box::new(SimulatedBackend::new(&config.callsign))),
        BackendKind::Disconnected => Ok(Box::new(DisconnectedBackend::new())),
    }
}

fn main() {
    TermLogger::init(LevelFilter::Info, Config::default(), TerminalMode::Stdout, ColorChoice::Auto).ok();

    let config = match config::read_config() {
        Ok(config) => config,
        Err(_) => {
            config::write_default_config().ok();
            display_msg_and_exit(format!(
                "Could not read {}! A default file was created; set an airport ICAO, callsign, and backend before relaunching.",
                CONFIG_FILENAME
            ));
        }
    };

    let airports = match Airports::new(AIRPORT_DATA_FILENAME) {
        Ok(a) => a,
        Err(e) => display_msg_and_exit(format!("Could not read {}! Reason: {}", AIRPORT_DATA_FILENAME, e)),
    };

    let replay_override = parse_args();
    let mut backend = match build_backend(&config, replay_override.as_deref()) {
        Ok(b) => b,
        Err(e) => display_msg_and_exit(format!("Could not start backend! Reason: {}", e)),
    };

    let mut world = World::new();
    let mut session = ConsoleSession::new();
    session.callsign = Some(config.callsign.clone());

    let mut rpc_server = if config.multi_controller {
        match SessionServer::bind(&config.rpc_address) {
            Ok(mut server) => {
                let sim = Sim::new(&config.scenario.name, &config.callsign);
                server.host_sim(sim);
                info!("Session server listening on {}", config.rpc_address);
                Some(server)
            }
            Err(e) => {
                warn!("Could not start session server: {}", e);
                None
            }
        }
    } else {
        None
    };

    info!("Running as {} over {:?} backend", config.callsign, config.backend);

    loop {
        if let Err(e) = backend.get_updates(&mut world) {
            error!("Backend error: {}", e);
        }
        if !backend.connected() {
            warn!("Backend disconnected, exiting main loop.");
            break;
        }

        if let Some(server) = rpc_server.as_mut() {
            server.poll();
        }

        // Reading command text is a frontend concern; a real console feeds
        // `ConsoleSession::type_command` directly instead of stdin here.

        std::thread::sleep(Duration::from_millis(10));
    }

    let _ = session;
}
