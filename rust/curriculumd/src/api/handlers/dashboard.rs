use crate::api::{AppState, Caller};
use crate::error::{Error, Result};
use crate::schools;
use axum::extract::State;
use axum::{Extension, Json};
use serde_json::Value as JsonValue;

/// The caller's school, serialized as a school retrieve.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<JsonValue>> {
    let school_id = caller.require_school()?;
    let conn = state.db();
    schools::school_json(&conn, school_id)?
        .map(Json)
        .ok_or_else(|| Error::not_found("school not found"))
}
