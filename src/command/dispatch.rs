//! Command dispatch (spec.md §4.H stage 4-5): the built-in command table,
//! slot-count validation, and the selection-shortcut fallback. Every name
//! here is part of the external contract (spec.md §6) and must keep its
//! spelling and argument order.

use std::collections::{HashMap, HashSet};

use crate::airports::Airports;
use crate::backend::{ControlBackend, TextTarget};
use crate::error::Error;
use crate::geometry::nm_distance;
use crate::routes::PreferredRoutes;
use crate::world::{TransponderMode, VoiceCapability, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotType {
    Aircraft,
    Controller,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    None,
    Optional,
    Multiple,
}

/// Mutable scratch state the command pipeline threads through dispatch
/// that doesn't belong on the world model itself: MIT targets and route
/// drawing are scope-engine display toggles, not world facts.
pub struct DispatchContext<'a> {
    pub backend: &'a mut dyn ControlBackend,
    pub world: &'a World,
    pub selected_aircraft: &'a mut Option<String>,
    pub airports: &'a Airports,
    pub preferred_routes: Option<&'a PreferredRoutes>,
    pub mit_targets: &'a mut HashMap<String, f64>,
    pub drawn_routes: &'a mut HashSet<String>,
    pub todo_list: &'a mut Vec<String>,
    pub now: i64,
}

type Handler = fn(&mut DispatchContext, &[String]) -> Result<String, Error>;

pub struct CommandSpec {
    pub name: &'static str,
    pub slots: &'static [SlotType],
    pub modifier: Modifier,
    /// True if the trailing-most `Aircraft` slot may be omitted when an
    /// aircraft is already selected (spec.md §4.H stage 4).
    pub aircraft_slot_elidable: bool,
    pub handler: Handler,
}

impl CommandSpec {
    /// `min = slots − (last is Optional?1:0) − (aircraftSlotElidible?1:0)`;
    /// `max = slots`, or unbounded if the last slot is `Multiple`.
    pub fn arg_bounds(&self) -> (usize, Option<usize>) {
        let mut min = self.slots.len();
        if self.modifier == Modifier::Optional {
            min = min.saturating_sub(1);
        }
        if self.aircraft_slot_elidable {
            min = min.saturating_sub(1);
        }
        let max = if self.modifier == Modifier::Multiple {
            None
        } else {
            Some(self.slots.len())
        };
        (min, max)
    }
}

fn resolve_callsign(ctx: &DispatchContext, args: &[String], slot_index: usize) -> Result<String, Error> {
    if let Some(explicit) = args.get(slot_index) {
        return Ok(explicit.to_uppercase());
    }
    ctx.selected_aircraft
        .clone()
        .ok_or_else(|| Error::UserError("no aircraft selected".to_string()))
}

/// "altitudes <1000 are multiplied by 100" (spec.md §8 boundary scenario 2).
fn parse_altitude_field(raw: &str) -> Result<i32, Error> {
    let value: i32 = raw
        .parse()
        .map_err(|_| Error::UserError(format!("bad altitude: {}", raw)))?;
    Ok(if value < 1000 { value * 100 } else { value })
}

fn current_flight_plan(ctx: &DispatchContext, callsign: &str) -> crate::world::FlightPlan {
    ctx.world
        .get_aircraft(callsign)
        .and_then(|a| a.flight_plan.clone())
        .unwrap_or_default()
}

// ---- handlers ----

fn h_actype(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let mut fp = current_flight_plan(ctx, &callsign);
    fp.aircraft_type = args.last().cloned().unwrap_or_default();
    ctx.backend.amend_flight_plan(&callsign, fp)?;
    Ok(format!("{} aircraft type set", callsign))
}

fn h_alt(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let altitude = parse_altitude_field(args.last().ok_or_else(|| Error::UserError("missing altitude".into()))?)?;
    let mut fp = current_flight_plan(ctx, &callsign);
    fp.cruise_altitude = altitude;
    ctx.backend.amend_flight_plan(&callsign, fp)?;
    Ok(format!("{} altitude amended to {}", callsign, altitude))
}

fn h_tempalt(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let altitude = match args.last() {
        Some(raw) if !raw.is_empty() => Some(parse_altitude_field(raw)?),
        _ => None,
    };
    ctx.backend.set_temp_altitude(&callsign, altitude)?;
    Ok(format!("{} temporary altitude updated", callsign))
}

fn h_arr(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let mut fp = current_flight_plan(ctx, &callsign);
    fp.arrival = args.last().cloned().unwrap_or_default().to_uppercase();
    ctx.backend.amend_flight_plan(&callsign, fp)?;
    Ok(format!("{} arrival set", callsign))
}

fn h_dep(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let mut fp = current_flight_plan(ctx, &callsign);
    fp.departure = args.last().cloned().unwrap_or_default().to_uppercase();
    ctx.backend.amend_flight_plan(&callsign, fp)?;
    Ok(format!("{} departure set", callsign))
}

fn h_equip(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let mut fp = current_flight_plan(ctx, &callsign);
    let suffix = args.last().cloned().unwrap_or_default();
    fp.aircraft_type = format!("{}/{}", fp.type_without_suffix(), suffix);
    ctx.backend.amend_flight_plan(&callsign, fp)?;
    Ok(format!("{} equipment suffix set", callsign))
}

fn h_ifr(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let mut fp = current_flight_plan(ctx, &callsign);
    fp.is_ifr = true;
    ctx.backend.amend_flight_plan(&callsign, fp)?;
    Ok(format!("{} filed IFR", callsign))
}

fn h_vfr(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let mut fp = current_flight_plan(ctx, &callsign);
    fp.is_ifr = false;
    ctx.backend.amend_flight_plan(&callsign, fp)?;
    Ok(format!("{} filed VFR", callsign))
}

fn h_scratchpad(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let text = if args.len() > 1 { args[1].as_str() } else { "" };
    ctx.backend.set_scratchpad(&callsign, text)?;
    Ok(format!("{} scratchpad set", callsign))
}

fn h_squawk(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    match args.get(1) {
        Some(code) => {
            let squawk = u16::from_str_radix(code, 8)
                .map_err(|_| Error::UserError(format!("bad squawk: {}", code)))?;
            ctx.backend.set_squawk_manual(&callsign, squawk)?;
            Ok(format!("{} squawk set to {}", callsign, code))
        }
        None => {
            ctx.backend.set_squawk_auto(&callsign)?;
            Ok(format!("{} squawk set to automatic", callsign))
        }
    }
}

fn h_voice(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let voice = match args.last().map(|s| s.to_uppercase()).as_deref() {
        Some("V") => VoiceCapability::Voice,
        Some("R") => VoiceCapability::Receive,
        Some("T") => VoiceCapability::Text,
        other => return Err(Error::UserError(format!("unknown voice type: {:?}", other))),
    };
    ctx.backend.set_voice_type(&callsign, voice)?;
    Ok(format!("{} voice capability set", callsign))
}

fn h_editroute(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let route = args[1..].join(" ");
    ctx.backend.amend_route(&callsign, &route)?;
    Ok(format!("{} route amended", callsign))
}

fn h_route(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    ctx.world
        .get_aircraft(&callsign)
        .and_then(|a| a.flight_plan.as_ref())
        .map(|fp| fp.route.clone())
        .ok_or_else(|| Error::UserError(format!("no flight plan on file for {}", callsign)))
}

fn h_nyprd(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let depart = args.first().ok_or_else(|| Error::UserError("missing departure".into()))?;
    let arrive = args.get(1).ok_or_else(|| Error::UserError("missing arrival".into()))?;
    let routes = ctx
        .preferred_routes
        .ok_or_else(|| Error::UserError("no preferred-route table loaded".to_string()))?;
    let matches = routes.lookup(&depart.to_uppercase(), &arrive.to_uppercase());
    if matches.is_empty() {
        Ok(format!("no preferred route found for {}-{}", depart, arrive))
    } else {
        Ok(matches.iter().map(|r| r.route.as_str()).collect::<Vec<_>>().join(" / "))
    }
}

fn h_faaprd(_ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let depart = args.first().ok_or_else(|| Error::UserError("missing departure".into()))?;
    let arrive = args.get(1).ok_or_else(|| Error::UserError("missing arrival".into()))?;
    let records = crate::routes::fetch_faa_preferred_routes(
        "https://www.fly.faa.gov/rmt/nfdc_preferred_routes_data.jsp",
        depart,
        arrive,
    )?;
    if records.is_empty() {
        Ok(format!("no FAA preferred route found for {}-{}", depart, arrive))
    } else {
        Ok(records.iter().map(|r| r.route.as_str()).collect::<Vec<_>>().join(" / "))
    }
}

fn h_accept(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    ctx.backend.accept_handoff(&callsign)?;
    Ok(format!("{} handoff accepted", callsign))
}

fn h_drop(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    ctx.backend.drop_track(&callsign)?;
    Ok(format!("{} track dropped", callsign))
}

fn h_handoff(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let to_controller = args.last().ok_or_else(|| Error::UserError("missing controller".into()))?.to_uppercase();
    ctx.backend.offer_handoff(&callsign, &to_controller)?;
    Ok(format!("{} handed off to {}", callsign, to_controller))
}

fn h_pointout(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let to_controller = args.last().ok_or_else(|| Error::UserError("missing controller".into()))?.to_uppercase();
    ctx.backend.point_out(&callsign, &to_controller)?;
    Ok(format!("{} pointed out to {}", callsign, to_controller))
}

fn h_reject(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    ctx.backend.reject_handoff(&callsign)?;
    Ok(format!("{} handoff rejected", callsign))
}

fn h_track(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    ctx.backend.initiate_track(&callsign)?;
    Ok(format!("{} tracked", callsign))
}

fn h_find(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let token = args.first().ok_or_else(|| Error::UserError("missing target".into()))?;
    let upper = token.to_uppercase();
    if let Some(ac) = ctx.world.get_aircraft(&upper) {
        return Ok(format!(
            "{} at {:.4},{:.4} {}ft",
            ac.callsign, ac.position.lat, ac.position.lon, ac.altitude
        ));
    }
    if let Some(ll) = ctx.airports.get_lat_lon(&upper) {
        return Ok(format!("{} at {:.4},{:.4}", upper, ll.lat, ll.lon));
    }
    crate::geometry::parse_lat_long(token)
        .map(|ll| format!("{:.4},{:.4}", ll.lat, ll.lon))
        .map_err(Error::UserError)
}

fn h_mit(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let nm: f64 = args
        .last()
        .ok_or_else(|| Error::UserError("missing distance".into()))?
        .parse()
        .map_err(|_| Error::UserError("bad MIT distance".to_string()))?;
    ctx.mit_targets.insert(callsign.clone(), nm);
    Ok(format!("{} assigned {} mile(s) in trail", callsign, nm))
}

fn h_drawroute(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    if !ctx.drawn_routes.remove(&callsign) {
        ctx.drawn_routes.insert(callsign.clone());
        Ok(format!("{} route drawing enabled", callsign))
    } else {
        Ok(format!("{} route drawing disabled", callsign))
    }
}

fn h_ident(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    ctx.backend.set_transponder_mode(&callsign, TransponderMode::Ident)?;
    Ok(format!("{} ident", callsign))
}

fn h_timer(_ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let minutes: u32 = args
        .first()
        .ok_or_else(|| Error::UserError("missing minutes".into()))?
        .parse()
        .map_err(|_| Error::UserError("bad minute count".to_string()))?;
    Ok(format!("timer set for {} minute(s)", minutes))
}

fn h_todo(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let note = args.join(" ");
    ctx.todo_list.push(note.clone());
    Ok(format!("noted: {}", note))
}

fn h_traffic(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let callsign = resolve_callsign(ctx, args, 0)?;
    let origin = ctx
        .world
        .get_aircraft(&callsign)
        .ok_or_else(|| Error::UserError(format!("unknown aircraft {}", callsign)))?;
    let nearby: Vec<&str> = ctx
        .world
        .get_filtered_aircraft(|a| {
            a.callsign != callsign && nm_distance(a.position, origin.position) <= 20.0
        })
        .iter()
        .map(|a| a.callsign.as_str())
        .collect();
    if nearby.is_empty() {
        Ok(format!("no traffic within 20nm of {}", callsign))
    } else {
        Ok(nearby.join(", "))
    }
}

fn h_wallop(ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    let text = args.join(" ");
    ctx.backend.send_text_message(TextTarget::Wallop, &text)?;
    Ok("wallop sent".to_string())
}

fn h_echo(_ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    Ok(args.join(" "))
}

fn h_help(_ctx: &mut DispatchContext, args: &[String]) -> Result<String, Error> {
    match args.first() {
        Some(name) => match COMMAND_TABLE.iter().find(|c| c.name == name.to_lowercase()) {
            Some(spec) => Ok(format!("{}: {} slot(s)", spec.name, spec.slots.len())),
            None => Err(Error::UserError(format!("unknown command {}", name))),
        },
        None => Ok(COMMAND_TABLE.iter().map(|c| c.name).collect::<Vec<_>>().join(" ")),
    }
}

pub static COMMAND_TABLE: &[CommandSpec] = &[
    CommandSpec { name: "actype", slots: &[SlotType::Aircraft, SlotType::String], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_actype },
    CommandSpec { name: "alt", slots: &[SlotType::Aircraft, SlotType::String], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_alt },
    CommandSpec { name: "tempalt", slots: &[SlotType::Aircraft, SlotType::String], modifier: Modifier::Optional, aircraft_slot_elidable: true, handler: h_tempalt },
    CommandSpec { name: "arr", slots: &[SlotType::Aircraft, SlotType::String], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_arr },
    CommandSpec { name: "dep", slots: &[SlotType::Aircraft, SlotType::String], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_dep },
    CommandSpec { name: "equip", slots: &[SlotType::Aircraft, SlotType::String], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_equip },
    CommandSpec { name: "ifr", slots: &[SlotType::Aircraft], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_ifr },
    CommandSpec { name: "vfr", slots: &[SlotType::Aircraft], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_vfr },
    CommandSpec { name: "scratchpad", slots: &[SlotType::Aircraft, SlotType::String], modifier: Modifier::Optional, aircraft_slot_elidable: true, handler: h_scratchpad },
    CommandSpec { name: "squawk", slots: &[SlotType::Aircraft, SlotType::String], modifier: Modifier::Optional, aircraft_slot_elidable: true, handler: h_squawk },
    CommandSpec { name: "voice", slots: &[SlotType::Aircraft, SlotType::String], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_voice },
    CommandSpec { name: "editroute", slots: &[SlotType::Aircraft, SlotType::String], modifier: Modifier::Multiple, aircraft_slot_elidable: true, handler: h_editroute },
    CommandSpec { name: "nyprd", slots: &[SlotType::String, SlotType::String], modifier: Modifier::None, aircraft_slot_elidable: false, handler: h_nyprd },
    CommandSpec { name: "faaprd", slots: &[SlotType::String, SlotType::String], modifier: Modifier::None, aircraft_slot_elidable: false, handler: h_faaprd },
    CommandSpec { name: "route", slots: &[SlotType::Aircraft], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_route },
    CommandSpec { name: "accept", slots: &[SlotType::Aircraft], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_accept },
    CommandSpec { name: "drop", slots: &[SlotType::Aircraft], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_drop },
    CommandSpec { name: "handoff", slots: &[SlotType::Aircraft, SlotType::Controller], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_handoff },
    CommandSpec { name: "pointout", slots: &[SlotType::Aircraft, SlotType::Controller], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_pointout },
    CommandSpec { name: "reject", slots: &[SlotType::Aircraft], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_reject },
    CommandSpec { name: "track", slots: &[SlotType::Aircraft], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_track },
    CommandSpec { name: "find", slots: &[SlotType::String], modifier: Modifier::None, aircraft_slot_elidable: false, handler: h_find },
    CommandSpec { name: "mit", slots: &[SlotType::Aircraft, SlotType::String], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_mit },
    CommandSpec { name: "drawroute", slots: &[SlotType::Aircraft], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_drawroute },
    CommandSpec { name: "i", slots: &[SlotType::Aircraft], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_ident },
    CommandSpec { name: "timer", slots: &[SlotType::String], modifier: Modifier::None, aircraft_slot_elidable: false, handler: h_timer },
    CommandSpec { name: "todo", slots: &[SlotType::String], modifier: Modifier::Multiple, aircraft_slot_elidable: false, handler: h_todo },
    CommandSpec { name: "traffic", slots: &[SlotType::Aircraft], modifier: Modifier::None, aircraft_slot_elidable: true, handler: h_traffic },
    CommandSpec { name: "wallop", slots: &[SlotType::String], modifier: Modifier::Multiple, aircraft_slot_elidable: false, handler: h_wallop },
    CommandSpec { name: "echo", slots: &[SlotType::String], modifier: Modifier::Multiple, aircraft_slot_elidable: false, handler: h_echo },
    CommandSpec { name: "help", slots: &[SlotType::String], modifier: Modifier::Optional, aircraft_slot_elidable: false, handler: h_help },
];

/// Dispatches `tokens` (whitespace-split, already alias- and
/// variable-expanded). Stage 4 (name match + arg-count validation) then
/// stage 5 (selection shortcut) of spec.md §4.H.
pub fn dispatch(tokens: &[String], ctx: &mut DispatchContext) -> Result<String, Error> {
    if tokens.is_empty() {
        return Err(Error::UserError("empty command".to_string()));
    }

    let name = tokens[0].to_lowercase();
    if let Some(spec) = COMMAND_TABLE.iter().find(|c| c.name == name) {
        let args = &tokens[1..];
        let (min, max) = spec.arg_bounds();
        if args.len() < min || max.map(|m| args.len() > m).unwrap_or(false) {
            return Err(Error::UserError(format!(
                "{}: expected {}..{} argument(s), got {}",
                spec.name,
                min,
                max.map(|m| m.to_string()).unwrap_or_else(|| "∞".to_string()),
                args.len()
            )));
        }
        return (spec.handler)(ctx, args);
    }

    // Selection shortcut: a single token that resolves to a unique aircraft.
    if tokens.len() == 1 {
        let candidates = select_candidates(&tokens[0], ctx.world);
        return match candidates.len() {
            0 => Err(Error::UserError(format!("unknown command or aircraft: {}", tokens[0]))),
            1 => {
                *ctx.selected_aircraft = Some(candidates[0].clone());
                Ok(format!("{} selected", candidates[0]))
            }
            _ => Err(Error::UserError(format!(
                "ambiguous aircraft {}: {}",
                tokens[0],
                candidates.join(", ")
            ))),
        };
    }

    Err(Error::UserError(format!("unknown command: {}", tokens[0])))
}

fn select_candidates(token: &str, world: &World) -> Vec<String> {
    let upper = token.to_uppercase();
    let not_lost = world.get_filtered_aircraft(|a| !a.lost_track(i64::MAX / 2));

    if let Some(exact) = not_lost.iter().find(|a| a.callsign == upper) {
        return vec![exact.callsign.clone()];
    }

    not_lost
        .iter()
        .filter(|a| a.callsign.contains(&upper))
        .map(|a| a.callsign.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::Airports;
    use crate::backend::disconnected::DisconnectedBackend;
    use crate::geometry::LatLon;

    fn fresh_ctx<'a>(
        backend: &'a mut dyn ControlBackend,
        world: &'a World,
        selected: &'a mut Option<String>,
        airports: &'a Airports,
        mit: &'a mut HashMap<String, f64>,
        drawn: &'a mut HashSet<String>,
        todo: &'a mut Vec<String>,
    ) -> DispatchContext<'a> {
        DispatchContext {
            backend,
            world,
            selected_aircraft: selected,
            airports,
            preferred_routes: None,
            mit_targets: mit,
            drawn_routes: drawn,
            todo_list: todo,
            now: 0,
        }
    }

    #[test]
    fn alt_multiplies_altitudes_below_1000() {
        let mut world = World::new();
        world.track_received("AAL123", LatLon::default(), 10000, 250, 0.0, 1);
        let mut backend = DisconnectedBackend::new();
        let mut selected = None;
        let airports = Airports::from_records(vec![]);
        let mut mit = HashMap::new();
        let mut drawn = HashSet::new();
        let mut todo = Vec::new();
        let mut ctx = fresh_ctx(&mut backend, &world, &mut selected, &airports, &mut mit, &mut drawn, &mut todo);

        let tokens = vec!["alt".to_string(), "AAL123".to_string(), "350".to_string()];
        let err = dispatch(&tokens, &mut ctx).unwrap_err();
        // DisconnectedBackend doesn't support amend_flight_plan.
        assert!(matches!(err, Error::BackendUnsupported));
    }

    #[test]
    fn arg_count_validation_rejects_too_few_args() {
        let world = World::new();
        let mut backend = DisconnectedBackend::new();
        let mut selected = Some("AAL123".to_string());
        let airports = Airports::from_records(vec![]);
        let mut mit = HashMap::new();
        let mut drawn = HashSet::new();
        let mut todo = Vec::new();
        let mut ctx = fresh_ctx(&mut backend, &world, &mut selected, &airports, &mut mit, &mut drawn, &mut todo);

        let tokens = vec!["handoff".to_string()];
        assert!(dispatch(&tokens, &mut ctx).is_err());
    }

    #[test]
    fn scratchpad_with_no_argument_clears_it() {
        let mut world = World::new();
        world.track_received("AAL123", LatLon::default(), 10000, 250, 0.0, 1);
        world.scratchpad_set("AAL123", "FOO");
        let mut backend = DisconnectedBackend::new();
        let mut selected = Some("AAL123".to_string());
        let airports = Airports::from_records(vec![]);
        let mut mit = HashMap::new();
        let mut drawn = HashSet::new();
        let mut todo = Vec::new();
        let mut ctx = fresh_ctx(&mut backend, &world, &mut selected, &airports, &mut mit, &mut drawn, &mut todo);

        let tokens = vec!["scratchpad".to_string()];
        // DisconnectedBackend can't mutate, but validation must accept the
        // zero-arg form (Optional + aircraft-elidable).
        let err = dispatch(&tokens, &mut ctx).unwrap_err();
        assert!(matches!(err, Error::BackendUnsupported));
    }

    #[test]
    fn selection_shortcut_picks_unique_substring_match() {
        let mut world = World::new();
        world.track_received("AAL123", LatLon::default(), 10000, 250, 0.0, 1);
        let mut backend = DisconnectedBackend::new();
        let mut selected = None;
        let airports = Airports::from_records(vec![]);
        let mut mit = HashMap::new();
        let mut drawn = HashSet::new();
        let mut todo = Vec::new();
        let mut ctx = fresh_ctx(&mut backend, &world, &mut selected, &airports, &mut mit, &mut drawn, &mut todo);

        let tokens = vec!["AAL1".to_string()];
        dispatch(&tokens, &mut ctx).unwrap();
        assert_eq!(ctx.selected_aircraft.as_deref(), Some("AAL123"));
    }

    #[test]
    fn echo_returns_its_arguments_joined() {
        let world = World::new();
        let mut backend = DisconnectedBackend::new();
        let mut selected = None;
        let airports = Airports::from_records(vec![]);
        let mut mit = HashMap::new();
        let mut drawn = HashSet::new();
        let mut todo = Vec::new();
        let mut ctx = fresh_ctx(&mut backend, &world, &mut selected, &airports, &mut mit, &mut drawn, &mut todo);

        let tokens = vec!["echo".to_string(), "hello".to_string(), "world".to_string()];
        assert_eq!(dispatch(&tokens, &mut ctx).unwrap(), "hello world");
    }
}
