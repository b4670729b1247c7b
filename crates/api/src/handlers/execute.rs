use axum::{extract::State, http::StatusCode, Json};

use engine::{Engine, ExecutionResult, Workflow};

use crate::AppState;

#[derive(serde::Deserialize)]
pub struct ExecuteRequestDto {
    #[serde(flatten)]
    pub workflow: Workflow,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(serde::Serialize)]
pub struct ExecuteResponseDto {
    #[serde(flatten)]
    pub result: ExecutionResult,
}

pub async fn execute(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteRequestDto>,
) -> Result<Json<ExecuteResponseDto>, StatusCode> {
    let engine = Engine::new((*state.config).clone()).map_err(|e| {
        tracing::error!(error = %e, "failed to build engine from config");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let outcome = if payload.parallel {
        engine.run_parallel(&payload.workflow).await
    } else {
        engine.run_sequential(&payload.workflow).await
    };

    match outcome {
        Ok(result) => Ok(Json(ExecuteResponseDto { result })),
        Err(e) => {
            tracing::warn!(error = %e, "execution rejected before any node ran");
            Err(StatusCode::UNPROCESSABLE_ENTITY)
        }
    }
}
