//! The radar scope engine (spec.md §4.I): a pure per-frame pipeline from
//! world model + view configuration to a vector of `DrawCommand`s. Nothing
//! here touches a rendering backend, font rasterizer, or GPU command
//! buffer — those are external collaborators (spec.md §1 Non-goals); this
//! module only produces the typed draw list they consume.

pub mod conflict;
pub mod crda;
pub mod datablock;
pub mod layout;
pub mod mit;
pub mod transform;

use std::collections::HashMap;

use crate::geometry::{LatLon, Point2D};
use crate::world::{TransponderMode, World};

pub use datablock::DataBlockFormat;
pub use transform::ViewTransform;

/// Number of track points drawn, oldest to newest (spec.md §4.I.2 default).
pub const DEFAULT_TRACK_HISTORY_DEPTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSymbol {
    /// VFR squawk (1200): small open square.
    VfrSquare,
    /// Standby transponder: single point.
    Point,
    /// Tracked aircraft: the tracking controller's scope character.
    Tracked(char),
    /// Untracked, non-VFR, non-standby: a small cross.
    Cross,
}

#[derive(Debug, Clone, Copy)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    Line { from: Point2D, to: Point2D, color: Rgba },
    Circle { center: Point2D, radius_px: f32, color: Rgba },
    Polygon { points: Vec<Point2D>, color: Rgba },
    Text { origin: Point2D, lines: Vec<String>, color: Rgba },
    Point { at: Point2D, symbol: TrackSymbol, color: Rgba },
}

pub struct ViewConfig {
    pub transform: ViewTransform,
    pub min_altitude_ft: i32,
    pub max_altitude_ft: i32,
    pub track_history_depth: usize,
    pub datablock_format: DataBlockFormat,
    pub datablock_frequency_secs: i64,
    pub ghost_callsign_suffix: &'static str,
}

/// Blends `base` toward `background` as `age_index` (0 = newest) grows,
/// per spec.md §4.I.2 ("blending color toward background with age").
fn age_blended(base: Rgba, background: Rgba, age_index: usize, total: usize) -> Rgba {
    if total <= 1 {
        return base;
    }
    let t = age_index as f32 / (total - 1) as f32;
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t) as u8;
    Rgba {
        r: lerp(base.r, background.r),
        g: lerp(base.g, background.g),
        b: lerp(base.b, background.b),
        a: lerp(base.a, background.a),
    }
}

fn symbol_for(ac: &crate::world::Aircraft) -> TrackSymbol {
    if ac.squawk == 0o1200 {
        TrackSymbol::VfrSquare
    } else if ac.transponder_mode == TransponderMode::Standby {
        TrackSymbol::Point
    } else if let Some(_ctrl) = ac.tracking_controller.as_ref() {
        TrackSymbol::Tracked('*')
    } else {
        TrackSymbol::Cross
    }
}

/// Builds the track-history draw commands for one aircraft (spec.md
/// §4.I.2). Oldest point is emitted first so the newest renders on top.
pub fn draw_track_history(
    ac: &crate::world::Aircraft,
    view: &ViewConfig,
    base_color: Rgba,
    background: Rgba,
) -> Vec<DrawCommand> {
    let depth = view.track_history_depth.min(ac.tracks.len());
    let mut out = Vec::with_capacity(depth);
    for age_index in (0..depth).rev() {
        let track = &ac.tracks[age_index];
        let color = age_blended(base_color, background, age_index, depth);
        let pixel = view.transform.project(track.position);
        let symbol = if age_index == 0 { symbol_for(ac) } else { TrackSymbol::Point };
        out.push(DrawCommand::Point { at: pixel, symbol, color });
    }
    out
}

/// Filters the world's aircraft to those eligible for display this frame
/// (spec.md §4.I.2: `!LostTrack ∧ MinAltitude ≤ alt ≤ MaxAltitude`).
pub fn visible_aircraft<'a>(world: &'a World, view: &ViewConfig, now: i64) -> Vec<&'a crate::world::Aircraft> {
    world.get_filtered_aircraft(|ac| {
        !ac.lost_track(now) && ac.altitude >= view.min_altitude_ft && ac.altitude <= view.max_altitude_ft
    })
}

/// Produces the track-history and datablock draw commands for one frame
/// (after layout resolution). Conflict annotations, CRDA ghosts, and
/// auto-MIT pairing are computed separately by callers that hold the
/// relevant runway/airport config (see [`conflict`], [`crda`], [`mit`])
/// and folded into the same vector before handing it to the renderer.
pub fn render_frame(
    world: &World,
    view: &ViewConfig,
    now: i64,
    base_color: Rgba,
    background: Rgba,
) -> Vec<DrawCommand> {
    let aircraft = visible_aircraft(world, view, now);
    let dupe_counts = datablock::duplicate_squawk_counts(&aircraft);

    let mut commands = Vec::new();
    let mut placements = Vec::with_capacity(aircraft.len());
    let mut blocks = HashMap::new();

    for ac in &aircraft {
        commands.extend(draw_track_history(ac, view, base_color, background));

        let block = datablock::build_data_block(ac, world, view.datablock_format, &dupe_counts);
        let text = datablock::select_variant(&block, now, view.datablock_frequency_secs);
        let size = layout::Size2D {
            width: text.iter().map(|l| l.len()).max().unwrap_or(0) as f32 * 7.0,
            height: text.len() as f32 * 12.0,
        };
        let track_px = view.transform.project(ac.position);
        let ideal = layout::self_only_offset(ac.heading, size);
        placements.push(layout::DataBlockPlacement {
            track: track_px,
            size,
            manual_offset: None,
            ideal_offset: ideal,
            auto_offset: ideal,
        });
        blocks.insert(ac.callsign.clone(), block);
    }

    layout::resolve_layout(&mut placements);

    for (ac, placement) in aircraft.iter().zip(placements.iter()) {
        let block = &blocks[&ac.callsign];
        let text = datablock::select_variant(block, now, view.datablock_frequency_secs);
        let offset = placement.manual_offset.unwrap_or(placement.auto_offset);
        commands.push(DrawCommand::Text {
            origin: Point2D::new(placement.track.x + offset.x, placement.track.y + offset.y),
            lines: text.to_vec(),
            color: base_color,
        });
    }

    commands
}

/// Hit-tests a click against visible aircraft tracks within a pixel
/// radius, preferring a datablock hit (spec.md §4.I.9).
pub fn nearest_aircraft_at<'a>(
    world: &'a World,
    view: &ViewConfig,
    now: i64,
    click: Point2D,
    radius_px: f32,
) -> Option<&'a crate::world::Aircraft> {
    visible_aircraft(world, view, now)
        .into_iter()
        .map(|ac| (ac, view.transform.project(ac.position).distance_to(click)))
        .filter(|(_, d)| *d <= radius_px)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(ac, _)| ac)
}
