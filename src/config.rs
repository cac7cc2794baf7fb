//! Startup configuration (spec.md's ambient-stack section): a single
//! `config.json`, loaded the same way the teacher's `read_config` does,
//! extended with backend selection and the scenario launcher. CLI
//! ergonomics deliberately stay config-file-driven rather than reaching
//! for a flags crate (SPEC_FULL.md's Open Questions): the one runtime
//! switch, `--replay <path>`, is parsed by hand in `main.rs`.

use std::fs::File;

use serde::{Deserialize, Serialize};

use crate::scenario::ScenarioConfig;

pub const CONFIG_FILENAME: &str = "config.json";
pub const AIRPORT_DATA_FILENAME: &str = "airports.csv";

/// Which [`crate::backend::ControlBackend`] to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Connect to a live protocol endpoint (spec.md §4.E).
    Live,
    /// Replay a recorded session from disk (spec.md §4.F).
    Replay,
    /// Poll an HTTP position feed (spec.md §4.G).
    Ingest,
    /// Run entirely from the scenario launcher, no network (spec.md §4.L).
    Simulated,
    /// No backend; console and scope run against an empty world.
    Disconnected,
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Disconnected
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigData {
    pub callsign: String,
    pub airport: String,
    pub range: u32,
    pub floor: i32,
    pub ceiling: i32,
    pub backend: BackendKind,
    /// `host:port` for [`BackendKind::Live`].
    pub live_address: String,
    /// File path for [`BackendKind::Replay`].
    pub replay_path: String,
    pub replay_rate: f64,
    /// Base URL for [`BackendKind::Ingest`].
    pub ingest_endpoint: String,
    pub scenario: ScenarioConfig,
    pub multi_controller: bool,
    pub rpc_address: String,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            callsign: String::new(),
            airport: String::new(),
            range: 30,
            floor: 0,
            ceiling: 99999,
            backend: BackendKind::default(),
            live_address: String::new(),
            replay_path: String::new(),
            replay_rate: 1.0,
            ingest_endpoint: String::new(),
            scenario: ScenarioConfig::default(),
            multi_controller: false,
            rpc_address: "127.0.0.1:6809".to_string(),
        }
    }
}

pub fn read_config() -> Result<ConfigData, std::io::Error> {
    let file = File::open(CONFIG_FILENAME)?;
    serde_json::from_reader(file).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

pub fn write_default_config() -> std::io::Result<ConfigData> {
    let config = ConfigData::default();
    let file = File::create(CONFIG_FILENAME)?;
    serde_json::to_writer_pretty(file, &config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_is_disconnected() {
        assert_eq!(ConfigData::default().backend, BackendKind::Disconnected);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let config = ConfigData::default();
        let text = serde_json::to_string(&config).unwrap();
        let parsed: ConfigData = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.range, config.range);
        assert_eq!(parsed.backend, config.backend);
    }
}
