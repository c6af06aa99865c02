//! `POST /mcp`: the orchestrator's tool envelope.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use service_core::error::AppError;

use crate::tools::ToolEnvelope;
use crate::AppState;

pub async fn handle(
    State(state): State<AppState>,
    payload: Result<Json<ToolEnvelope>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(envelope) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected malformed tool envelope");
        AppError::BadRequest(anyhow::anyhow!(rejection.body_text()))
    })?;

    match envelope.method.as_str() {
        "tools/list" => Ok(Json(json!({ "tools": state.gateway.list_tools() })).into_response()),
        "tools/call" => {
            let params = envelope.params.ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!("tools/call requires params.name"))
            })?;
            let result = state.gateway.invoke(&params.name, params.arguments).await;
            Ok(Json(result).into_response())
        }
        other => Err(AppError::BadRequest(anyhow::anyhow!(
            "Unsupported method: {}",
            other
        ))),
    }
}
