//! The interactive console (spec.md §4.K, supplemented purely from the
//! spec's external-interface description since the teacher has no
//! interactive console of its own): prompt formatting, input history, and
//! the key-binding contract that drives a pending [`crate::command::TemplateState`]
//! between submissions. Holds the long-lived state `CommandEnvironment`
//! borrows each submission: aliases, selected aircraft, MIT targets, drawn
//! routes, and the to-do list.

use std::collections::{HashMap, HashSet};

use crate::command::{self, CommandEnvironment, TemplateResult, TemplateState};
use crate::error::Error;
use crate::world::{Console, ConsoleStyle};

/// Special key bindings the editor recognizes while a template is pending
/// (spec.md §4.H stage 2). Translating actual terminal/GUI key events into
/// these is left to the frontend; this module only defines the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Tab,
    ShiftTab,
    Enter,
    Escape,
}

/// What the editor should do in response to an [`EditorKey`] while a
/// template is pending.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    /// Stay in the editor; the state may have changed (cursor moved,
    /// current marker filled).
    Continue,
    /// All markers are filled; submit the templated text.
    Submit(String),
    /// The user cancelled; discard the pending template.
    Cancel,
}

/// Drives one pending template through its key bindings. The first
/// character typed into a marker should call [`TemplateState::fill_current`]
/// via the frontend's text-insertion path before forwarding navigation keys
/// here; this function only handles the non-text special keys.
pub fn drive_template(state: &mut TemplateState, key: EditorKey) -> EditorAction {
    match key {
        EditorKey::Tab => {
            state.next_marker();
            EditorAction::Continue
        }
        EditorKey::ShiftTab => {
            state.prev_marker();
            EditorAction::Continue
        }
        EditorKey::Escape => EditorAction::Cancel,
        EditorKey::Enter => {
            if state.all_set() {
                EditorAction::Submit(state.text().to_string())
            } else {
                EditorAction::Continue
            }
        }
    }
}

/// Bounded input history (spec.md §4.K: up/down arrow recall). Distinct
/// from [`Console`]'s transcript — history holds only submitted command
/// text, newest last, and never wraps style/error markup.
pub struct History {
    entries: Vec<String>,
    cursor: Option<usize>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Vec::new(), cursor: None, capacity }
    }

    pub fn push(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.entries.last().map(String::as_str) != Some(text.as_str()) {
            self.entries.push(text);
            if self.entries.len() > self.capacity {
                self.entries.remove(0);
            }
        }
        self.cursor = None;
    }

    /// Recall the previous entry (up arrow), stopping at the oldest.
    pub fn prev(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let next_index = match self.cursor {
            None => self.entries.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.cursor = Some(next_index);
        self.entries.get(next_index).map(String::as_str)
    }

    /// Recall the next entry (down arrow), returning to an empty line past
    /// the newest.
    pub fn next(&mut self) -> Option<&str> {
        match self.cursor {
            None => None,
            Some(i) if i + 1 >= self.entries.len() => {
                self.cursor = None;
                None
            }
            Some(i) => {
                self.cursor = Some(i + 1);
                self.entries.get(i + 1).map(String::as_str)
            }
        }
    }
}

/// The console's owning state. `callsign` selects prompt formatting:
/// `CALLSIGN> ` once connected and positioned, `> ` otherwise (spec.md
/// §4.K).
pub struct ConsoleSession {
    pub console: Console,
    pub history: History,
    pub aliases: HashMap<String, String>,
    pub selected_aircraft: Option<String>,
    pub mit_targets: HashMap<String, f64>,
    pub drawn_routes: HashSet<String>,
    pub todo_list: Vec<String>,
    pub callsign: Option<String>,
    pending: Option<TemplateState>,
}

impl ConsoleSession {
    pub fn new() -> Self {
        Self {
            console: Console::new(),
            history: History::new(100),
            aliases: HashMap::new(),
            selected_aircraft: None,
            mit_targets: HashMap::new(),
            drawn_routes: HashSet::new(),
            todo_list: Vec::new(),
            callsign: None,
            pending: None,
        }
    }

    pub fn prompt(&self) -> String {
        match &self.callsign {
            Some(callsign) => format!("{}> ", callsign),
            None => "> ".to_string(),
        }
    }

    pub fn has_pending_template(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_template(&mut self) -> Option<&mut TemplateState> {
        self.pending.as_mut()
    }

    /// Stage 1-2 entry point: expands aliases and applies the parameter
    /// template. A `Pending` result is stashed for [`EditorKey`] handling
    /// and surfaced to the caller for prompting; a `Ready` result falls
    /// straight through to [`ConsoleSession::submit`].
    pub fn type_command(
        &mut self,
        input: &str,
        backend: &mut dyn crate::backend::ControlBackend,
        world: &crate::world::World,
        airports: &crate::airports::Airports,
        preferred_routes: Option<&crate::routes::PreferredRoutes>,
        now: i64,
    ) -> Result<Option<String>, Error> {
        self.history.push(input);
        let env = self.environment(backend, world, airports, preferred_routes, now);
        match command::prepare(input, &env)? {
            TemplateResult::Ready(text) => {
                drop(env);
                self.submit(&text, backend, world, airports, preferred_routes, now).map(Some)
            }
            TemplateResult::Pending(state) => {
                self.pending = Some(state);
                Ok(None)
            }
        }
    }

    /// Submits already-templated text through stages 3-5, logging the
    /// result (or error) to the console transcript.
    pub fn submit(
        &mut self,
        text: &str,
        backend: &mut dyn crate::backend::ControlBackend,
        world: &crate::world::World,
        airports: &crate::airports::Airports,
        preferred_routes: Option<&crate::routes::PreferredRoutes>,
        now: i64,
    ) -> Result<String, Error> {
        self.pending = None;
        let mut env = self.environment(backend, world, airports, preferred_routes, now);
        match command::submit(text, &mut env) {
            Ok(output) => {
                self.console.push(output.clone(), ConsoleStyle::Regular);
                Ok(output)
            }
            Err(e) => {
                self.console.push(e.to_string(), ConsoleStyle::Error);
                Err(e)
            }
        }
    }

    fn environment<'a>(
        &'a mut self,
        backend: &'a mut dyn crate::backend::ControlBackend,
        world: &'a crate::world::World,
        airports: &'a crate::airports::Airports,
        preferred_routes: Option<&'a crate::routes::PreferredRoutes>,
        now: i64,
    ) -> CommandEnvironment<'a> {
        CommandEnvironment {
            backend,
            world,
            selected_aircraft: &mut self.selected_aircraft,
            aliases: &self.aliases,
            airports,
            preferred_routes,
            mit_targets: &mut self.mit_targets,
            drawn_routes: &mut self.drawn_routes,
            todo_list: &mut self.todo_list,
            now,
        }
    }
}

impl Default for ConsoleSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_shows_callsign_once_connected() {
        let mut session = ConsoleSession::new();
        assert_eq!(session.prompt(), "> ");
        session.callsign = Some("JFK_TWR".to_string());
        assert_eq!(session.prompt(), "JFK_TWR> ");
    }

    #[test]
    fn history_recalls_most_recent_first() {
        let mut history = History::new(10);
        history.push("alt AAL1 350");
        history.push("handoff AAL1 N90");
        assert_eq!(history.prev(), Some("handoff AAL1 N90"));
        assert_eq!(history.prev(), Some("alt AAL1 350"));
        assert_eq!(history.prev(), Some("alt AAL1 350"));
        assert_eq!(history.next(), Some("handoff AAL1 N90"));
        assert_eq!(history.next(), None);
    }

    #[test]
    fn history_skips_consecutive_duplicates() {
        let mut history = History::new(10);
        history.push("echo hi");
        history.push("echo hi");
        assert_eq!(history.entries.len(), 1);
    }

    #[test]
    fn drive_template_tab_advances_and_enter_requires_all_set() {
        let mut state = match crate::command::template::apply_template("handoff $_ $_") {
            TemplateResult::Pending(s) => s,
            _ => panic!("expected pending"),
        };
        assert_eq!(drive_template(&mut state, EditorKey::Enter), EditorAction::Continue);
        state.fill_current();
        state.next_marker();
        state.fill_current();
        assert_eq!(
            drive_template(&mut state, EditorKey::Enter),
            EditorAction::Submit("handoff _ _".to_string())
        );
    }

    #[test]
    fn escape_cancels_pending_template() {
        let mut state = match crate::command::template::apply_template("$_ ") {
            TemplateResult::Pending(s) => s,
            _ => panic!("expected pending"),
        };
        assert_eq!(drive_template(&mut state, EditorKey::Escape), EditorAction::Cancel);
    }

    #[test]
    fn type_command_with_no_markers_submits_immediately() {
        use crate::airports::Airports;
        use crate::backend::disconnected::DisconnectedBackend;
        use crate::world::World;

        let mut session = ConsoleSession::new();
        let mut backend = DisconnectedBackend::new();
        let world = World::new();
        let airports = Airports::from_records(vec![]);
        let result = session
            .type_command("echo hi there", &mut backend, &world, &airports, None, 0)
            .unwrap();
        assert_eq!(result, Some("hi there".to_string()));
        assert!(!session.has_pending_template());
    }
}
