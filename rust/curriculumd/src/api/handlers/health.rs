use crate::api::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value as JsonValue};

pub async fn health(State(state): State<AppState>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.config().workspace.to_string_lossy(),
    }))
}
