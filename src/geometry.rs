//! Lat/long and unit conversions, heading arithmetic, and the polygon/line
//! predicates the scope engine and CRDA use. Single precision (`f32`) is the
//! default scalar, matching the teacher's track/pixel-space math; `f64` is
//! used only where the spec calls for it (DMS parsing, line intersections).

use lazy_static::lazy_static;
use regex::Regex;

pub const NM_PER_DEGREE_LAT: f64 = 60.00721;

/// A geographic position in decimal degrees.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// A 2D point in an arbitrary planar space (pixels, or projected nm).
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point2D) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Bounds {
    pub lat1: f32,
    pub lon1: f32,
    pub lat2: f32,
    pub lon2: f32,
}

pub fn nm_per_latitude() -> f64 {
    NM_PER_DEGREE_LAT
}

/// Nautical miles per degree of longitude at a given latitude.
pub fn nm_per_longitude(lat: f64) -> f64 {
    NM_PER_DEGREE_LAT * lat.to_radians().cos()
}

pub fn convert_miles_to_lat(nm: f64) -> f64 {
    nm / nm_per_latitude()
}

pub fn convert_miles_to_lon(nm: f64, lat: f64) -> f64 {
    nm / nm_per_longitude(lat)
}

/// Great-circle distance in nautical miles, double precision per spec.md
/// §4.A ("double precision for angle sums").
pub fn nm_distance(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().asin();
    // mean Earth radius in nautical miles
    const R_NM: f64 = 3440.065;
    R_NM * c
}

/// Initial bearing from `a` to `b`, normalized to [0, 360).
pub fn heading_between(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    normalize_heading_f64(y.atan2(x).to_degrees())
}

pub fn opposite_heading(h: f32) -> f32 {
    normalize_heading(h + 180.0)
}

pub fn normalize_heading(h: f32) -> f32 {
    let r = h % 360.0;
    if r < 0.0 {
        r + 360.0
    } else {
        r
    }
}

fn normalize_heading_f64(h: f64) -> f64 {
    let r = h % 360.0;
    if r < 0.0 {
        r + 360.0
    } else {
        r
    }
}

/// Absolute angular difference between two headings, in [0, 180].
pub fn heading_difference(a: f32, b: f32) -> f32 {
    let d = (normalize_heading(a) - normalize_heading(b)).abs();
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// 16-point compass label for a heading. Bin boundaries fall at 22.5°
/// offsets, per spec.md §4.A.
pub fn compass(heading: f32) -> &'static str {
    const LABELS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    let h = normalize_heading(heading);
    let idx = (((h + 11.25) / 22.5).floor() as usize) % 16;
    LABELS[idx]
}

/// Clock-hour (1..12) of a heading relative to a reference heading. Bin
/// boundaries fall at 15° offsets, per spec.md §4.A.
pub fn heading_as_hour(heading: f32, reference: f32) -> u8 {
    let relative = normalize_heading(heading - reference);
    let hour = (((relative + 15.0) / 30.0).floor() as i32) % 12;
    if hour == 0 {
        12
    } else {
        hour as u8
    }
}

/// Even-odd point-in-polygon test. A point exactly on an edge is treated as
/// outside, per spec.md §4.A.
pub fn point_in_polygon(point: Point2D, polygon: &[Point2D]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];

        if on_segment(pi, pj, point) {
            return false;
        }

        let intersects = (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
        if intersects {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn on_segment(a: Point2D, b: Point2D, p: Point2D) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > 1e-6 {
        return false;
    }
    let within_x = p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x);
    let within_y = p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y);
    within_x && within_y
}

/// Intersection of two infinite lines, each given by two points. Returns
/// `None` when the lines are parallel (cross-product magnitude below the
/// 1e-5 threshold from spec.md §4.A). Uses double precision per spec.
pub fn line_line_intersect(
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    p4: (f64, f64),
) -> Option<(f64, f64)> {
    let (x1, y1) = p1;
    let (x2, y2) = p2;
    let (x3, y3) = p3;
    let (x4, y4) = p4;

    let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if denom.abs() < 1e-5 {
        return None;
    }

    let a = x1 * y2 - y1 * x2;
    let b = x3 * y4 - y3 * x4;

    let x = (a * (x3 - x4) - (x1 - x2) * b) / denom;
    let y = (a * (y3 - y4) - (y1 - y2) * b) / denom;
    Some((x, y))
}

lazy_static! {
    // "N40.37.58.400, W073.46.17.000" style: hemisphere letter, degrees,
    // minutes, seconds, separated by dots, with the second coordinate
    // comma-separated.
    static ref DMS_DOTTED: Regex = Regex::new(
        r"(?i)^([NS])(\d{1,3})\.(\d{1,2})\.(\d{1,2}(?:\.\d+)?)\s*,\s*([EW])(\d{1,3})\.(\d{1,2})\.(\d{1,2}(?:\.\d+)?)$"
    ).unwrap();

    // Decimal degree pair: "40.6328888, -73.771385"
    static ref DECIMAL_PAIR: Regex = Regex::new(
        r"^\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*$"
    ).unwrap();

    // ISO-6709H: "+403758.400-0734617.000"
    static ref ISO6709: Regex = Regex::new(
        r"^([+-])(\d{2})(\d{2})(\d{2}(?:\.\d+)?)([+-])(\d{3})(\d{2})(\d{2}(?:\.\d+)?)$"
    ).unwrap();
}

/// Parses a latitude/longitude pair from one of the three formats spec.md
/// §4.A accepts. Rejects strings with swapped axes or missing fields.
pub fn parse_lat_long(input: &str) -> Result<LatLon, String> {
    let input = input.trim();

    if let Some(caps) = DMS_DOTTED.captures(input) {
        let lat_hemi = &caps[1];
        let lon_hemi = &caps[5];
        if !lat_hemi.eq_ignore_ascii_case("n") && !lat_hemi.eq_ignore_ascii_case("s") {
            return Err(format!("invalid latitude hemisphere: {}", lat_hemi));
        }
        if !lon_hemi.eq_ignore_ascii_case("e") && !lon_hemi.eq_ignore_ascii_case("w") {
            return Err(format!("invalid longitude hemisphere: {}", lon_hemi));
        }
        let lat = dms_to_decimal(&caps[2], &caps[3], &caps[4], lat_hemi.eq_ignore_ascii_case("s"))?;
        let lon = dms_to_decimal(&caps[6], &caps[7], &caps[8], lon_hemi.eq_ignore_ascii_case("w"))?;
        return Ok(LatLon { lat, lon });
    }

    if let Some(caps) = ISO6709.captures(input) {
        let lat_sign = if &caps[1] == "-" { -1.0 } else { 1.0 };
        let lon_sign = if &caps[5] == "-" { -1.0 } else { 1.0 };
        let lat = lat_sign * dms_to_decimal(&caps[2], &caps[3], &caps[4], false)?;
        let lon = lon_sign * dms_to_decimal(&caps[6], &caps[7], &caps[8], false)?;
        return Ok(LatLon { lat, lon });
    }

    if let Some(caps) = DECIMAL_PAIR.captures(input) {
        // First coordinate is latitude, second is longitude.
        let first: f64 = caps[1].parse().map_err(|_| "bad latitude".to_string())?;
        let second: f64 = caps[2].parse().map_err(|_| "bad longitude".to_string())?;
        return Ok(LatLon {
            lat: first,
            lon: second,
        });
    }

    Err(format!("unrecognized lat/long format: {}", input))
}

fn dms_to_decimal(deg: &str, min: &str, sec: &str, negative: bool) -> Result<f64, String> {
    let deg: f64 = deg.parse().map_err(|_| "bad degrees".to_string())?;
    let min: f64 = min.parse().map_err(|_| "bad minutes".to_string())?;
    let sec: f64 = sec.parse().map_err(|_| "bad seconds".to_string())?;
    let value = deg + min / 60.0 + sec / 3600.0;
    Ok(if negative { -value } else { value })
}
