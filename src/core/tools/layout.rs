use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::api::backend::{GenerateConstraints, GenerateRequest, RoomSpec};
use crate::core::backend::BackendClient;
use crate::core::params::{self, Orientation, DEFAULT_PLOT_M, SQFT_PER_SQM};
use crate::core::tools::{ToolCallResult, ToolDefinition, ToolExecutor};

pub const LAYOUT_TOOL_NAME: &str = "generate_layout_hybrid";

/// Width and height in metres, semantic type, display name.
struct RoomPreset {
    key: &'static str,
    width: f64,
    height: f64,
    name: &'static str,
}

const ROOM_PRESETS: &[RoomPreset] = &[
    RoomPreset {
        key: "master_bedroom",
        width: 4.0,
        height: 4.5,
        name: "Master Bedroom",
    },
    RoomPreset {
        key: "bedroom",
        width: 3.5,
        height: 3.5,
        name: "Bedroom",
    },
    RoomPreset {
        key: "living_room",
        width: 5.0,
        height: 4.0,
        name: "Living Room",
    },
    RoomPreset {
        key: "kitchen",
        width: 3.0,
        height: 3.5,
        name: "Kitchen",
    },
    RoomPreset {
        key: "dining",
        width: 3.5,
        height: 3.0,
        name: "Dining",
    },
    RoomPreset {
        key: "bathroom",
        width: 2.0,
        height: 2.5,
        name: "Bathroom",
    },
    RoomPreset {
        key: "toilet",
        width: 1.5,
        height: 2.0,
        name: "Toilet",
    },
    RoomPreset {
        key: "pooja_room",
        width: 2.0,
        height: 2.0,
        name: "Pooja Room",
    },
    RoomPreset {
        key: "study",
        width: 3.0,
        height: 3.0,
        name: "Study",
    },
    RoomPreset {
        key: "balcony",
        width: 3.0,
        height: 1.5,
        name: "Balcony",
    },
    RoomPreset {
        key: "utility",
        width: 2.0,
        height: 2.0,
        name: "Utility",
    },
    RoomPreset {
        key: "entrance",
        width: 2.0,
        height: 2.0,
        name: "Entrance",
    },
    RoomPreset {
        key: "staircase",
        width: 3.0,
        height: 2.5,
        name: "Staircase",
    },
    RoomPreset {
        key: "store",
        width: 2.0,
        height: 2.0,
        name: "Store Room",
    },
    RoomPreset {
        key: "parking",
        width: 5.0,
        height: 3.0,
        name: "Parking",
    },
];

const ROOM_ALIASES: &[(&str, &str)] = &[
    ("living", "living_room"),
    ("hall", "living_room"),
    ("drawing_room", "living_room"),
    ("dining_room", "dining"),
    ("master", "master_bedroom"),
    ("bath", "bathroom"),
    ("wc", "toilet"),
    ("pooja", "pooja_room"),
    ("puja", "pooja_room"),
    ("puja_room", "pooja_room"),
    ("store_room", "store"),
    ("garage", "parking"),
];

/// Side of the box used for room types without a preset.
const GENERIC_ROOM_SIDE: f64 = 8.0;

fn canonical_token(token: &str) -> String {
    let key = token
        .trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_");
    ROOM_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, target)| target.to_string())
        .unwrap_or(key)
}

/// Turn room-type tokens into backend room specs. Repeated types get
/// numbered ids and names; unknown types become a generic box carrying the
/// raw token.
pub fn build_rooms<S: AsRef<str>>(tokens: &[S]) -> Vec<RoomSpec> {
    let keys: Vec<String> = tokens
        .iter()
        .map(|token| token.as_ref())
        .filter(|token| !token.trim().is_empty())
        .map(canonical_token)
        .collect();

    let mut totals: HashMap<&str, usize> = HashMap::new();
    for key in &keys {
        *totals.entry(key.as_str()).or_default() += 1;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    tokens
        .iter()
        .map(|token| token.as_ref())
        .filter(|token| !token.trim().is_empty())
        .zip(keys.iter())
        .map(|(raw, key)| {
            let ordinal = {
                let count = seen.entry(key.as_str()).or_default();
                *count += 1;
                *count
            };
            let repeated = totals.get(key.as_str()).copied().unwrap_or(1) > 1;

            let (kind, base_name, width, height) =
                match ROOM_PRESETS.iter().find(|preset| preset.key == key) {
                    Some(preset) => (
                        preset.key.to_string(),
                        preset.name.to_string(),
                        preset.width,
                        preset.height,
                    ),
                    None => {
                        let raw = raw.trim().to_string();
                        (raw.clone(), raw, GENERIC_ROOM_SIDE, GENERIC_ROOM_SIDE)
                    }
                };

            RoomSpec {
                id: format!("{key}_{ordinal}"),
                name: if repeated {
                    format!("{base_name} {ordinal}")
                } else {
                    base_name
                },
                kind,
                width,
                height,
                x: 0.0,
                y: 0.0,
            }
        })
        .collect()
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
    .filter(|number: &f64| number.is_finite() && *number > 0.0)
}

/// `[width, length]` or `{width, length}` in metres.
fn plot_dimensions(arguments: &Map<String, Value>) -> Option<(f64, f64)> {
    match arguments.get("plot_dimensions")? {
        Value::Array(items) if items.len() >= 2 => {
            Some((as_number(&items[0])?, as_number(&items[1])?))
        }
        Value::Object(map) => {
            let width = map.get("width").and_then(as_number)?;
            let length = map
                .get("length")
                .or_else(|| map.get("height"))
                .and_then(as_number)?;
            Some((width, length))
        }
        _ => None,
    }
}

/// Build the generation request from normalized tool arguments.
pub fn request_from_arguments(arguments: &Map<String, Value>) -> GenerateRequest {
    let mut tokens: Vec<String> = arguments
        .get("rooms_needed")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    if tokens.is_empty() {
        warn!("Layout tool called without rooms; using the 3BHK preset");
        tokens = params::THREE_BHK_ROOMS.iter().map(|room| room.to_string()).collect();
    }

    let (plot_width, plot_length) = plot_dimensions(arguments)
        .or_else(|| {
            // total_area is in square feet.
            let area = arguments.get("total_area").and_then(as_number)?;
            let side = (area / SQFT_PER_SQM).sqrt();
            Some((side, side))
        })
        .unwrap_or(DEFAULT_PLOT_M);

    let orientation = arguments
        .get("orientation")
        .and_then(Value::as_str)
        .and_then(Orientation::parse)
        .unwrap_or_default();

    let extra = arguments
        .get("vastu_constraints")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    GenerateRequest::rectangular(
        build_rooms(&tokens),
        plot_width,
        plot_length,
        GenerateConstraints {
            house_facing: Some(orientation.as_str().to_string()),
            extra,
            ..Default::default()
        },
    )
}

pub fn layout_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: LAYOUT_TOOL_NAME.to_string(),
        description: "Generate a Vastu-compliant floor plan layout for a rectangular plot. \
Call this once the user has described the rooms they need and the plot size."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "rooms_needed": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Room types such as master_bedroom, bedroom, living_room, kitchen, dining, bathroom, pooja_room"
                },
                "plot_dimensions": {
                    "type": "array",
                    "items": {"type": "number"},
                    "minItems": 2,
                    "maxItems": 2,
                    "description": "Plot width and length in meters"
                },
                "orientation": {
                    "type": "string",
                    "enum": ["north", "east", "south", "west"],
                    "description": "Direction the house faces"
                },
                "vastu_constraints": {
                    "type": "object",
                    "description": "Optional additional Vastu placement constraints"
                },
                "total_area": {
                    "type": "number",
                    "description": "Optional total plot area in square feet"
                }
            },
            "required": ["rooms_needed", "plot_dimensions", "orientation"]
        }),
    }
}

/// Executor for [`LAYOUT_TOOL_NAME`]. The backend response is passed back
/// untouched.
pub struct LayoutTool {
    backend: BackendClient,
}

impl LayoutTool {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolExecutor for LayoutTool {
    fn definition(&self) -> ToolDefinition {
        layout_tool_definition()
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> ToolCallResult {
        let request = request_from_arguments(arguments);
        debug!(
            rooms = request.rooms.len(),
            plot_width = request.plot_width,
            plot_length = request.plot_length,
            "Executing layout tool"
        );
        match self.backend.generate_with_fallback(&request).await {
            Ok(payload) => ToolCallResult::success(payload),
            Err(err) => {
                warn!(error = %err, "Layout generation failed");
                ToolCallResult::error(err.to_string())
            }
        }
    }
}
