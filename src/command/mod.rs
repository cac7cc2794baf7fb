//! The command pipeline (spec.md §4.H): alias expansion, parameter
//! templates, variable/function expansion, dispatch, and the selection
//! shortcut. Any stage failing aborts with no mutation; only a clean run
//! through dispatch touches the backend or world.

pub mod alias;
pub mod dispatch;
pub mod expand;
pub mod template;

use std::collections::{HashMap, HashSet};

use crate::airports::Airports;
use crate::backend::ControlBackend;
use crate::error::Error;
use crate::routes::PreferredRoutes;
use crate::world::World;

pub use dispatch::{CommandSpec, DispatchContext, Modifier, SlotType, COMMAND_TABLE};
pub use template::{TemplateResult, TemplateState};

/// Everything a command submission needs besides the raw text. Owned by
/// the console (Module K), which holds the long-lived `selected_aircraft`,
/// alias table, and peripheral scratch state between submissions.
pub struct CommandEnvironment<'a> {
    pub backend: &'a mut dyn ControlBackend,
    pub world: &'a World,
    pub selected_aircraft: &'a mut Option<String>,
    pub aliases: &'a HashMap<String, String>,
    pub airports: &'a Airports,
    pub preferred_routes: Option<&'a PreferredRoutes>,
    pub mit_targets: &'a mut HashMap<String, f64>,
    pub drawn_routes: &'a mut HashSet<String>,
    pub todo_list: &'a mut Vec<String>,
    pub now: i64,
}

/// Runs stage 1 (alias expansion) and stage 2 (parameter template) only.
/// If the result needs filled-in parameters, the console drives the
/// `TemplateState` via its editor before calling [`submit`].
pub fn prepare(input: &str, env: &CommandEnvironment) -> Result<TemplateResult, Error> {
    let expanded = alias::expand_aliases(input, env.aliases)?;
    Ok(template::apply_template(&expanded))
}

/// Runs stages 3 through 5 on already-templated text: variable/function
/// expansion, dispatch, and the selection-shortcut fallback. Returns the
/// text to print to the console on success.
pub fn submit(text: &str, env: &mut CommandEnvironment) -> Result<String, Error> {
    let expand_ctx = expand::ExpansionContext {
        world: env.world,
        selected_aircraft: env.selected_aircraft.as_deref(),
        airports: env.airports,
        now: env.now,
    };
    let expanded = expand::expand(text, &expand_ctx)?;
    let tokens: Vec<String> = expanded.split_whitespace().map(str::to_string).collect();

    let mut ctx = DispatchContext {
        backend: env.backend,
        world: env.world,
        selected_aircraft: env.selected_aircraft,
        airports: env.airports,
        preferred_routes: env.preferred_routes,
        mit_targets: env.mit_targets,
        drawn_routes: env.drawn_routes,
        todo_list: env.todo_list,
        now: env.now,
    };
    dispatch::dispatch(&tokens, &mut ctx)
}

/// Runs the whole pipeline end to end for text known to have no `$_`
/// markers (the common case: a typed command with no template gaps).
pub fn run(input: &str, env: &mut CommandEnvironment) -> Result<String, Error> {
    let expanded = alias::expand_aliases(input, env.aliases)?;
    match template::apply_template(&expanded) {
        TemplateResult::Ready(text) => submit(&text, env),
        TemplateResult::Pending(state) => Err(Error::UserError(format!(
            "{} parameter(s) still need to be filled in",
            state.marker_count()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::Airports;
    use crate::backend::disconnected::DisconnectedBackend;
    use crate::geometry::LatLon;

    #[test]
    fn full_pipeline_runs_echo_through_all_stages() {
        let world = World::new();
        let mut backend = DisconnectedBackend::new();
        let mut selected = None;
        let aliases = HashMap::new();
        let airports = Airports::from_records(vec![]);
        let mut mit = HashMap::new();
        let mut drawn = HashSet::new();
        let mut todo = Vec::new();
        let mut env = CommandEnvironment {
            backend: &mut backend,
            world: &world,
            selected_aircraft: &mut selected,
            aliases: &aliases,
            airports: &airports,
            preferred_routes: None,
            mit_targets: &mut mit,
            drawn_routes: &mut drawn,
            todo_list: &mut todo,
            now: 0,
        };
        assert_eq!(run("echo hi there", &mut env).unwrap(), "hi there");
    }

    #[test]
    fn alias_then_variable_expansion_then_dispatch() {
        let mut world = World::new();
        world.track_received("AAL123", LatLon::default(), 10000, 250, 0.0, 1);
        let mut backend = DisconnectedBackend::new();
        let mut selected = Some("AAL123".to_string());
        let mut aliases = HashMap::new();
        aliases.insert(".who".to_string(), "echo $aircraft".to_string());
        let airports = Airports::from_records(vec![]);
        let mut mit = HashMap::new();
        let mut drawn = HashSet::new();
        let mut todo = Vec::new();
        let mut env = CommandEnvironment {
            backend: &mut backend,
            world: &world,
            selected_aircraft: &mut selected,
            aliases: &aliases,
            airports: &airports,
            preferred_routes: None,
            mit_targets: &mut mit,
            drawn_routes: &mut drawn,
            todo_list: &mut todo,
            now: 0,
        };
        assert_eq!(run(".who", &mut env).unwrap(), "AAL123");
    }

    #[test]
    fn unfilled_template_is_rejected_before_dispatch() {
        let world = World::new();
        let mut backend = DisconnectedBackend::new();
        let mut selected = None;
        let aliases = HashMap::new();
        let airports = Airports::from_records(vec![]);
        let mut mit = HashMap::new();
        let mut drawn = HashSet::new();
        let mut todo = Vec::new();
        let mut env = CommandEnvironment {
            backend: &mut backend,
            world: &world,
            selected_aircraft: &mut selected,
            aliases: &aliases,
            airports: &airports,
            preferred_routes: None,
            mit_targets: &mut mit,
            drawn_routes: &mut drawn,
            todo_list: &mut todo,
            now: 0,
        };
        assert!(run("handoff $_ $_", &mut env).is_err());
    }
}
