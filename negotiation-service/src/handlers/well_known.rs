use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MandateKeyView {
    pub kid: String,
    pub alg: String,
    pub public_key_pem: String,
}

/// Publishes the mandate verification key so suppliers can check signatures.
pub async fn mandate_key(State(state): State<AppState>) -> impl IntoResponse {
    let keys = state.keys.as_ref();
    let view = MandateKeyView {
        kid: keys.key_id().to_string(),
        alg: format!("{:?}", keys.algorithm()),
        public_key_pem: keys.public_key_pem().to_string(),
    };
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(view),
    )
}
