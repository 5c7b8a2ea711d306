//! Request and response bodies for the layout generation backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSpec {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Slower, higher-accuracy constraint solver.
    Constraint,
    /// Faster graph-based solver.
    Graph,
}

impl SolverKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SolverKind::Constraint => "constraint",
            SolverKind::Graph => "graph",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_facing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_polygon: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circle: Option<Value>,
    /// Additional Vastu constraints supplied by the model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub rooms: Vec<RoomSpec>,
    pub plot_width: f64,
    pub plot_length: f64,
    pub plot_shape: String,
    #[serde(rename = "solver_type")]
    pub solver_type: SolverKind,
    pub constraints: GenerateConstraints,
}

impl GenerateRequest {
    pub fn rectangular(
        rooms: Vec<RoomSpec>,
        plot_width: f64,
        plot_length: f64,
        constraints: GenerateConstraints,
    ) -> Self {
        Self {
            rooms,
            plot_width,
            plot_length,
            plot_shape: "rectangular".to_string(),
            solver_type: SolverKind::Constraint,
            constraints,
        }
    }

    pub fn with_solver(&self, solver_type: SolverKind) -> Self {
        Self {
            solver_type,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidateRequest {
    pub rooms: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Value>,
}

/// Scores are percentages.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ValidationReport {
    pub vastu_score: f64,
    #[serde(default)]
    pub entrance_compliance: Option<f64>,
    #[serde(default)]
    pub room_placement_score: Option<f64>,
    #[serde(default)]
    pub direction_alignment_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generate_request_uses_backend_field_names() {
        let mut extra = Map::new();
        extra.insert("kitchen_zone".into(), json!("southeast"));
        let request = GenerateRequest::rectangular(
            vec![RoomSpec {
                id: "kitchen_1".into(),
                name: "Kitchen".into(),
                kind: "kitchen".into(),
                width: 3.0,
                height: 3.5,
                x: 0.0,
                y: 0.0,
            }],
            9.144,
            12.192,
            GenerateConstraints {
                house_facing: Some("east".into()),
                extra,
                ..Default::default()
            },
        );

        let body = serde_json::to_value(request.with_solver(SolverKind::Graph)).expect("serialize");
        assert_eq!(body["plotWidth"], 9.144);
        assert_eq!(body["plotLength"], 12.192);
        assert_eq!(body["plotShape"], "rectangular");
        assert_eq!(body["solver_type"], "graph");
        assert_eq!(body["rooms"][0]["type"], "kitchen");
        assert_eq!(body["constraints"]["house_facing"], "east");
        assert_eq!(body["constraints"]["kitchen_zone"], "southeast");
        assert!(body["constraints"].get("circle").is_none());
    }

    #[test]
    fn validation_report_tolerates_missing_optional_scores() {
        let report: ValidationReport =
            serde_json::from_value(json!({"vastu_score": 82.5})).expect("deserialize");
        assert_eq!(report.vastu_score, 82.5);
        assert!(report.entrance_compliance.is_none());
    }
}
