use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::backend::{GenerateConstraints, GenerateRequest};
use crate::core::backend::BackendClient;
use crate::core::orchestrator::{OrchestratorSettings, TurnEvent};
use crate::core::params;
use crate::core::tools::layout::build_rooms;

/// Turn-level timer that generates a layout straight from the user's text
/// when the model has produced nothing within the budget.
///
/// Disarming stops the timer only. A generation that has already started
/// runs to completion unless the whole turn is cancelled.
pub struct FallbackController {
    disarm: CancellationToken,
    task: Option<JoinHandle<Option<Value>>>,
}

impl FallbackController {
    /// A controller that never fires.
    pub fn inert() -> Self {
        Self {
            disarm: CancellationToken::new(),
            task: None,
        }
    }

    pub fn spawn(
        settings: &OrchestratorSettings,
        backend: BackendClient,
        user_text: String,
        events: UnboundedSender<TurnEvent>,
        turn: &CancellationToken,
    ) -> Self {
        if !settings.fallback_enabled {
            return Self::inert();
        }

        let disarm = turn.child_token();
        let task = tokio::spawn(run(
            settings.fallback_timeout,
            backend,
            user_text,
            events,
            disarm.clone(),
            turn.clone(),
        ));
        Self {
            disarm,
            task: Some(task),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some() && !self.disarm.is_cancelled()
    }

    pub fn disarm(&self) {
        if !self.disarm.is_cancelled() {
            debug!("Disarming fallback layout timer");
            self.disarm.cancel();
        }
    }

    /// Disarm, wait for any generation in flight, and return its layout.
    pub async fn finish(self) -> Option<Value> {
        self.disarm();
        match self.task {
            Some(task) => task.await.ok().flatten(),
            None => None,
        }
    }

    /// Like [`finish`](Self::finish), but a generation still running after
    /// `grace` is aborted and yields nothing.
    pub async fn settle(mut self, grace: Duration) -> Option<Value> {
        self.disarm();
        let mut task = self.task.take()?;
        match tokio::time::timeout(grace, &mut task).await {
            Ok(joined) => joined.ok().flatten(),
            Err(_) => {
                debug!(?grace, "Abandoning fallback layout generation still in flight");
                task.abort();
                None
            }
        }
    }
}

async fn run(
    budget: Duration,
    backend: BackendClient,
    user_text: String,
    events: UnboundedSender<TurnEvent>,
    disarm: CancellationToken,
    turn: CancellationToken,
) -> Option<Value> {
    tokio::select! {
        _ = disarm.cancelled() => return None,
        _ = tokio::time::sleep(budget) => {}
    }

    let parameters = params::heuristic(&user_text);
    info!(parameters = %parameters.describe(), "No model output yet; generating fallback layout");
    let request = GenerateRequest::rectangular(
        build_rooms(&parameters.rooms),
        parameters.width_m,
        parameters.height_m,
        GenerateConstraints {
            house_facing: Some(parameters.orientation.as_str().to_string()),
            ..Default::default()
        },
    );

    let result = tokio::select! {
        _ = turn.cancelled() => return None,
        result = backend.generate_with_fallback(&request) => result,
    };

    match result {
        Ok(payload) => {
            let _ = events.send(TurnEvent::FallbackLayout(payload.clone()));
            Some(payload)
        }
        Err(err) => {
            warn!(error = %err, "Fallback layout generation failed");
            let _ = events.send(TurnEvent::FallbackFailed(format!(
                "Automatic layout generation failed: {err}"
            )));
            None
        }
    }
}
