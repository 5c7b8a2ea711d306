use std::error::Error as StdError;
use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::backend::{GenerateRequest, SolverKind, ValidateRequest, ValidationReport};
use crate::core::chat_stream::format_api_error;
use crate::utils::url::join_endpoint;

pub const GENERATE_PATH: &str = "api/solvers/generate";
pub const VALIDATE_PATH: &str = "api/validation/validate";

#[derive(Debug)]
pub enum BackendError {
    /// The backend answered with a non-success status or a failure body.
    Status { status: StatusCode, body: String },
    Network(reqwest::Error),
    Decode(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Status { status, body } => {
                write!(f, "Layout backend returned {status}: {}", format_api_error(body))
            }
            BackendError::Network(err) => write!(f, "Layout backend unreachable: {err}"),
            BackendError::Decode(err) => {
                write!(f, "Layout backend sent an invalid response: {err}")
            }
        }
    }
}

impl StdError for BackendError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            BackendError::Network(err) => Some(err),
            _ => None,
        }
    }
}

/// Client for the layout generation and Vastu validation service.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One generation attempt with the solver named in `request`.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<Value, BackendError> {
        let url = join_endpoint(&self.base_url, GENERATE_PATH);
        debug!(
            solver = %request.solver_type,
            rooms = request.rooms.len(),
            "Requesting layout generation"
        );

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(BackendError::Network)?;
        let status = response.status();
        let body = response.text().await.map_err(BackendError::Network)?;
        if !status.is_success() {
            return Err(BackendError::Status { status, body });
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|err| BackendError::Decode(err.to_string()))?;
        if reports_failure(&value) {
            return Err(BackendError::Status { status, body });
        }
        Ok(value)
    }

    /// Try the constraint solver, then retry exactly once with the graph
    /// solver if that attempt fails.
    pub async fn generate_with_fallback(
        &self,
        request: &GenerateRequest,
    ) -> Result<Value, BackendError> {
        let primary = request.with_solver(SolverKind::Constraint);
        match self.generate(&primary).await {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(error = %err, "Constraint solver failed; retrying with graph solver");
                self.generate(&request.with_solver(SolverKind::Graph)).await
            }
        }
    }

    pub async fn validate(
        &self,
        request: &ValidateRequest,
    ) -> Result<ValidationReport, BackendError> {
        let url = join_endpoint(&self.base_url, VALIDATE_PATH);
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(BackendError::Network)?;
        let status = response.status();
        let body = response.text().await.map_err(BackendError::Network)?;
        if !status.is_success() {
            return Err(BackendError::Status { status, body });
        }
        serde_json::from_str(&body).map_err(|err| BackendError::Decode(err.to_string()))
    }
}

/// A 2xx body can still carry an explicit failure flag.
fn reports_failure(value: &Value) -> bool {
    value.get("success").and_then(Value::as_bool) == Some(false)
        || value
            .get("status")
            .and_then(Value::as_str)
            .is_some_and(|status| status.eq_ignore_ascii_case("error"))
}
