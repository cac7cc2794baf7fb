//! The backend installed while switching between real backends, or before
//! any backend has been selected. Every mutation is unsupported; every poll
//! is a no-op.

use crate::backend::ControlBackend;
use crate::error::Error;
use crate::world::World;

pub struct DisconnectedBackend;

impl DisconnectedBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DisconnectedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlBackend for DisconnectedBackend {
    fn get_updates(&mut self, _world: &mut World) -> Result<(), Error> {
        Ok(())
    }

    fn current_time(&self) -> i64 {
        0
    }

    fn callsign(&self) -> &str {
        ""
    }

    fn connected(&self) -> bool {
        false
    }

    fn disconnect(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_never_connected() {
        let backend = DisconnectedBackend::new();
        assert!(!backend.connected());
    }
}
