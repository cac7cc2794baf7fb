//! Variable & function expansion (spec.md §4.H stage 3). `$name` is a
//! variable; `$name(...)` is a function whose argument text may itself
//! contain whitespace, so tokenizing has to special-case unbalanced
//! parens before the normal whitespace split.

use chrono::NaiveDateTime;

use crate::airports::Airports;
use crate::backend::codec::format_squawk_octal;
use crate::error::Error;
use crate::geometry;
use crate::world::{Aircraft, World};

pub struct ExpansionContext<'a> {
    pub world: &'a World,
    pub selected_aircraft: Option<&'a str>,
    pub airports: &'a Airports,
    pub now: i64,
}

pub fn expand(input: &str, ctx: &ExpansionContext) -> Result<String, Error> {
    let tokens = tokenize(input);
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.starts_with('$') {
            out.push(expand_token(&token, ctx)?);
        } else {
            out.push(token);
        }
    }
    Ok(out.join(" "))
}

/// Splits on whitespace, but a `$func(` token with no closing `)` yet
/// keeps absorbing following tokens until one supplies the `)`.
fn tokenize(input: &str) -> Vec<String> {
    let raw: Vec<&str> = input.split_whitespace().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        let token = raw[i];
        if token.starts_with('$') && token.contains('(') && !token.contains(')') {
            let mut combined = token.to_string();
            i += 1;
            while i < raw.len() && !combined.contains(')') {
                combined.push(' ');
                combined.push_str(raw[i]);
                i += 1;
            }
            out.push(combined);
        } else {
            out.push(token.to_string());
            i += 1;
        }
    }
    out
}

fn selected_aircraft<'a>(ctx: &'a ExpansionContext) -> Result<&'a Aircraft, Error> {
    let callsign = ctx
        .selected_aircraft
        .ok_or_else(|| Error::UserError("no aircraft selected".to_string()))?;
    ctx.world
        .get_aircraft(callsign)
        .ok_or_else(|| Error::UserError(format!("unknown aircraft {}", callsign)))
}

fn format_time(epoch_secs: i64) -> String {
    NaiveDateTime::from_timestamp_opt(epoch_secs, 0)
        .map(|dt| dt.format("%H:%M:%SZ").to_string())
        .unwrap_or_else(|| "00:00:00Z".to_string())
}

fn format_distance(nm: f64) -> String {
    let rounded = nm.round() as i64;
    if rounded <= 1 {
        "1 mile".to_string()
    } else {
        format!("{} miles", rounded)
    }
}

fn format_wind(airport: &str, ctx: &ExpansionContext) -> Result<String, Error> {
    let metar = ctx
        .world
        .get_metar(airport)
        .ok_or_else(|| Error::UserError(format!("no METAR for {}", airport)))?;
    let wind = &metar.wind;
    let direction = if wind.direction < 0 {
        "VRB".to_string()
    } else {
        format!("{:03}", wind.direction)
    };
    match wind.gust {
        Some(gust) => Ok(format!("{}{:02}G{:02}KT", direction, wind.speed, gust)),
        None => Ok(format!("{}{:02}KT", direction, wind.speed)),
    }
}

fn resolve_fix(name: &str, ctx: &ExpansionContext) -> Result<geometry::LatLon, Error> {
    if let Some(ll) = ctx.airports.get_lat_lon(name) {
        return Ok(ll);
    }
    geometry::parse_lat_long(name).map_err(Error::UserError)
}

fn function_call(token: &str) -> Option<(&str, &str)> {
    let open = token.find('(')?;
    let close = token.rfind(')')?;
    if close < open {
        return None;
    }
    Some((&token[1..open], &token[open + 1..close]))
}

fn expand_token(token: &str, ctx: &ExpansionContext) -> Result<String, Error> {
    if let Some((name, arg)) = function_call(token) {
        return expand_function(name, arg.trim(), ctx);
    }

    match token {
        "$aircraft" => Ok(selected_aircraft(ctx)?.callsign.clone()),
        "$alt" => selected_aircraft(ctx)?
            .effective_temp_or_filed_altitude()
            .map(|a| a.to_string())
            .ok_or_else(|| Error::UserError("no altitude on file".to_string())),
        "$arr" => selected_aircraft(ctx)?
            .flight_plan
            .as_ref()
            .map(|fp| fp.arrival.clone())
            .ok_or_else(|| Error::UserError("no flight plan on file".to_string())),
        "$dep" => selected_aircraft(ctx)?
            .flight_plan
            .as_ref()
            .map(|fp| fp.departure.clone())
            .ok_or_else(|| Error::UserError("no flight plan on file".to_string())),
        "$calt" => Ok(selected_aircraft(ctx)?.altitude.to_string()),
        "$cruise" => selected_aircraft(ctx)?
            .flight_plan
            .as_ref()
            .map(|fp| fp.cruise_altitude.to_string())
            .ok_or_else(|| Error::UserError("no flight plan on file".to_string())),
        "$route" => selected_aircraft(ctx)?
            .flight_plan
            .as_ref()
            .map(|fp| fp.route.clone())
            .ok_or_else(|| Error::UserError("no flight plan on file".to_string())),
        "$squawk" => Ok(format_squawk_octal(selected_aircraft(ctx)?.effective_squawk())),
        "$temp" => selected_aircraft(ctx)?
            .temp_altitude
            .map(|a| a.to_string())
            .ok_or_else(|| Error::UserError("no temporary altitude set".to_string())),
        "$time" => Ok(format_time(ctx.now)),
        "$winds" => {
            let ac = selected_aircraft(ctx)?;
            let fp = ac
                .flight_plan
                .as_ref()
                .ok_or_else(|| Error::UserError("no flight plan on file".to_string()))?;
            let airport = if ac.altitude < 50 { &fp.departure } else { &fp.arrival };
            format_wind(airport, ctx)
        }
        _ => Err(Error::UserError(format!("unknown variable {}", token))),
    }
}

fn expand_function(name: &str, arg: &str, ctx: &ExpansionContext) -> Result<String, Error> {
    match name {
        "$altim" => {
            let metar = ctx
                .world
                .get_metar(arg)
                .ok_or_else(|| Error::UserError(format!("no METAR for {}", arg)))?;
            Ok(format!("A{:04}", (metar.altimeter * 100.0).round() as i32))
        }
        "$metar" => ctx
            .world
            .get_metar(arg)
            .map(|m| m.raw.clone())
            .ok_or_else(|| Error::UserError(format!("no METAR for {}", arg))),
        "$wind" => format_wind(arg, ctx),
        "$bear" => {
            let ac = selected_aircraft(ctx)?;
            let fix = resolve_fix(arg, ctx)?;
            let bearing = geometry::heading_between(ac.position, fix);
            Ok(geometry::compass(bearing as f32).to_string())
        }
        "$oclock" => {
            let ac = selected_aircraft(ctx)?;
            let fix = resolve_fix(arg, ctx)?;
            let bearing = geometry::heading_between(ac.position, fix);
            Ok(geometry::heading_as_hour(bearing as f32, ac.heading).to_string())
        }
        "$dist" => {
            let ac = selected_aircraft(ctx)?;
            let fix = resolve_fix(arg, ctx)?;
            let nm = geometry::nm_distance(ac.position, fix);
            Ok(format_distance(nm))
        }
        "$ftime" => {
            let minutes: i64 = arg
                .parse()
                .map_err(|_| Error::UserError(format!("bad minute count: {}", arg)))?;
            Ok(format_time(ctx.now + minutes * 60))
        }
        "$lc" => Ok(arg.to_lowercase()),
        "$uc" => Ok(arg.to_uppercase()),
        _ => Err(Error::UserError(format!("unknown function {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::{AirportRecord, Airports};
    use crate::geometry::LatLon;
    use crate::world::World;

    fn sample_airports() -> Airports {
        Airports::from_records(vec![AirportRecord {
            ident: "KJFK".into(),
            iata_code: "JFK".into(),
            latitude_deg: 40.6398,
            longitude_deg: -73.7789,
        }])
    }

    #[test]
    fn dist_function_rounds_to_integer_miles() {
        let mut world = World::new();
        world.track_received("UAL9", LatLon { lat: 40.7, lon: -73.9 }, 5000, 150, 90.0, 0);
        let airports = sample_airports();
        let ctx = ExpansionContext {
            world: &world,
            selected_aircraft: Some("UAL9"),
            airports: &airports,
            now: 0,
        };
        let result = expand("$dist(KJFK)", &ctx).unwrap();
        assert_eq!(result, "12 miles");
    }

    #[test]
    fn variable_requires_selected_aircraft() {
        let world = World::new();
        let airports = sample_airports();
        let ctx = ExpansionContext {
            world: &world,
            selected_aircraft: None,
            airports: &airports,
            now: 0,
        };
        assert!(expand("$aircraft", &ctx).is_err());
    }

    #[test]
    fn function_argument_may_contain_no_extra_tokens_here() {
        let world = World::new();
        let airports = sample_airports();
        let ctx = ExpansionContext {
            world: &world,
            selected_aircraft: None,
            airports: &airports,
            now: 1_700_000_000,
        };
        let result = expand("$uc(hello)", &ctx).unwrap();
        assert_eq!(result, "HELLO");
    }

    #[test]
    fn non_dollar_tokens_pass_through_unchanged() {
        let world = World::new();
        let airports = sample_airports();
        let ctx = ExpansionContext {
            world: &world,
            selected_aircraft: None,
            airports: &airports,
            now: 0,
        };
        assert_eq!(expand("squawk 1200", &ctx).unwrap(), "squawk 1200");
    }
}
