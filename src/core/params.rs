//! Best-effort extraction of plot parameters from free-form user text.
//!
//! Rules are tried in priority order: explicit foot pairs, explicit metric
//! pairs, square-foot areas, square-metre areas. Areas are assumed to
//! describe a square plot.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

pub const FEET_TO_METERS: f64 = 0.3048;
pub const SQFT_PER_SQM: f64 = 10.764;

/// Plot used when the text names no usable dimensions, in metres.
pub const DEFAULT_PLOT_M: (f64, f64) = (12.0, 15.0);

pub const TWO_BHK_ROOMS: &[&str] = &[
    "living_room",
    "kitchen",
    "dining",
    "master_bedroom",
    "bedroom",
    "bathroom",
    "bathroom",
];

pub const THREE_BHK_ROOMS: &[&str] = &[
    "living_room",
    "kitchen",
    "dining",
    "master_bedroom",
    "bedroom",
    "bedroom",
    "bathroom",
    "bathroom",
    "pooja_room",
];

const FEET_UNIT: &str = r"(?:ft\.?|feet|foot|')";
const METER_UNIT: &str = r"(?:m|meters?|metres?)\b";
const NUMBER: &str = r"(\d+(?:\.\d+)?)";
const SEPARATOR: &str = r"\s*(?:x|×|\*|by)\s*";

static FEET_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){NUMBER}\s*({FEET_UNIT})?{SEPARATOR}{NUMBER}\s*({FEET_UNIT})?"
    ))
    .expect("feet pair pattern")
});

static METER_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){NUMBER}\s*({METER_UNIT})?{SEPARATOR}{NUMBER}\s*({METER_UNIT})?"
    ))
    .expect("meter pair pattern")
});

/// Text cut off after "by" and a single digit, e.g. "30 ft by 3". The feet
/// unit on the first value is required.
static TRUNCATED_FEET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){NUMBER}\s*{FEET_UNIT}\s*by\s*\d\s*$"))
        .expect("truncated pattern")
});

static SQFT_AREA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(?:sq\.?\s*(?:ft|feet)|sqft|square\s+f(?:ee|oo)t|ft²|ft2)",
    )
    .expect("sqft pattern")
});

static SQM_AREA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(?:sq\.?\s*m\b|sqm\b|square\s+met(?:er|re)s?|m²|m2\b)",
    )
    .expect("sqm pattern")
});

static FACING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(north|east|south|west)\s*-?\s*facing\b").expect("facing pattern")
});

static CARDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(north|east|south|west)\b").expect("cardinal pattern"));

static BHK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*-?\s*bhk\b").expect("bhk pattern"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    North,
    East,
    South,
    West,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::North => "north",
            Orientation::East => "east",
            Orientation::South => "south",
            Orientation::West => "west",
        }
    }

    /// Accepts "east", "East", "E", "east-facing" and similar.
    pub fn parse(token: &str) -> Option<Self> {
        let lowered = token.trim().to_ascii_lowercase();
        let token = lowered
            .strip_suffix("facing")
            .map(|rest| rest.trim_end_matches(['-', ' ']))
            .unwrap_or(lowered.as_str());
        match token {
            "north" | "n" => Some(Orientation::North),
            "east" | "e" => Some(Orientation::East),
            "south" | "s" => Some(Orientation::South),
            "west" | "w" => Some(Orientation::West),
            _ => None,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedParameters {
    pub width_m: f64,
    pub height_m: f64,
    pub orientation: Orientation,
    pub rooms: Vec<String>,
}

impl GeneratedParameters {
    pub fn area_sqm(&self) -> f64 {
        round_to(self.width_m * self.height_m, 1)
    }

    pub fn describe(&self) -> String {
        format!(
            "{} × {} m plot ({} sq m), {}-facing, {} rooms",
            round_to(self.width_m, 1),
            round_to(self.height_m, 1),
            self.area_sqm(),
            self.orientation,
            self.rooms.len()
        )
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Feet to metres, rounded to 3 decimals.
pub fn feet_to_meters(feet: f64) -> f64 {
    round_to(feet * FEET_TO_METERS, 3)
}

/// Square feet to square metres, rounded to 0.1 for display.
pub fn sqft_to_sqm(sqft: f64) -> f64 {
    round_to(sqft / SQFT_PER_SQM, 1)
}

fn number(captures: &Captures<'_>, index: usize) -> Option<f64> {
    captures
        .get(index)
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .filter(|value| *value > 0.0)
}

/// First pair carrying a unit on either value. A match starting at `skip`
/// is ignored.
fn unit_pair(pattern: &Regex, text: &str, skip: Option<usize>) -> Option<(f64, f64)> {
    pattern.captures_iter(text).find_map(|captures| {
        let has_unit = captures.get(2).is_some() || captures.get(4).is_some();
        let starts_at_skip = captures.get(0).map(|m| m.start()) == skip;
        if !has_unit || starts_at_skip {
            return None;
        }
        Some((number(&captures, 1)?, number(&captures, 3)?))
    })
}

/// Plot width and height in metres, if the text names them.
pub fn extract_dimensions(text: &str) -> Option<(f64, f64)> {
    let truncated = TRUNCATED_FEET.captures(text);
    let truncated_start = truncated
        .as_ref()
        .and_then(|captures| captures.get(0))
        .map(|m| m.start());

    if let Some((width, height)) = unit_pair(&FEET_PAIR, text, truncated_start) {
        return Some((feet_to_meters(width), feet_to_meters(height)));
    }
    if let Some((width, height)) = unit_pair(&METER_PAIR, text, None) {
        return Some((round_to(width, 3), round_to(height, 3)));
    }
    if let Some(side) = truncated.and_then(|captures| number(&captures, 1)) {
        let side = feet_to_meters(side);
        return Some((side, side));
    }
    if let Some(area) = SQFT_AREA.captures(text).and_then(|c| number(&c, 1)) {
        let side = feet_to_meters(area.sqrt());
        return Some((side, side));
    }
    if let Some(area) = SQM_AREA.captures(text).and_then(|c| number(&c, 1)) {
        let side = round_to(area.sqrt(), 3);
        return Some((side, side));
    }
    None
}

/// First cardinal direction, preferring one followed by "facing". North
/// when none is mentioned.
pub fn extract_orientation(text: &str) -> Orientation {
    FACING
        .captures(text)
        .or_else(|| CARDINAL.captures(text))
        .and_then(|captures| captures.get(1))
        .and_then(|m| Orientation::parse(m.as_str()))
        .unwrap_or_default()
}

pub fn extract_bhk(text: &str) -> Option<u32> {
    BHK.captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn rooms_for_bhk(bhk: u32) -> Option<&'static [&'static str]> {
    match bhk {
        2 => Some(TWO_BHK_ROOMS),
        3 => Some(THREE_BHK_ROOMS),
        _ => None,
    }
}

fn owned(rooms: &[&str]) -> Vec<String> {
    rooms.iter().map(|room| room.to_string()).collect()
}

/// Strict extraction: `None` unless the text names plot dimensions. The
/// room list is filled only for a recognised BHK preset.
pub fn normalize(text: &str) -> Option<GeneratedParameters> {
    let (width_m, height_m) = extract_dimensions(text)?;
    Some(GeneratedParameters {
        width_m,
        height_m,
        orientation: extract_orientation(text),
        rooms: extract_bhk(text)
            .and_then(rooms_for_bhk)
            .map(owned)
            .unwrap_or_default(),
    })
}

/// Always produces parameters: default plot when no dimensions are found
/// and the 3BHK preset for any BHK count other than 2.
pub fn heuristic(text: &str) -> GeneratedParameters {
    let (width_m, height_m) = extract_dimensions(text).unwrap_or(DEFAULT_PLOT_M);
    let rooms = extract_bhk(text)
        .and_then(rooms_for_bhk)
        .unwrap_or(THREE_BHK_ROOMS);
    GeneratedParameters {
        width_m,
        height_m,
        orientation: extract_orientation(text),
        rooms: owned(rooms),
    }
}
