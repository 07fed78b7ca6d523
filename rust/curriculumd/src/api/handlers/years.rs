use crate::api::params::{opt_str, required_str};
use crate::api::AppState;
use crate::catalog;
use crate::error::{Error, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rusqlite::params;
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub async fn list(State(state): State<AppState>) -> Result<Json<JsonValue>> {
    let conn = state.db();
    Ok(Json(JsonValue::Array(catalog::list_years(&conn)?)))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<JsonValue>)> {
    let name = required_str(&body, "name")?;
    let division = opt_str(&body, "division")?;
    let conn = state.db();
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO years(id, name, division) VALUES(?, ?, ?)",
        params![id, name, division],
    )?;
    let year = catalog::year_json(&conn, &id)?
        .ok_or_else(|| Error::Internal("year missing after insert".into()))?;
    Ok((StatusCode::CREATED, Json(year)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>> {
    let conn = state.db();
    catalog::year_json(&conn, &id)?
        .map(Json)
        .ok_or_else(|| Error::not_found("year not found"))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<JsonValue>> {
    let name = required_str(&body, "name")?;
    let division = opt_str(&body, "division")?;
    let conn = state.db();
    let changed = conn.execute(
        "UPDATE years SET name = ?, division = ? WHERE id = ?",
        params![name, division, id],
    )?;
    if changed == 0 {
        return Err(Error::not_found("year not found"));
    }
    catalog::year_json(&conn, &id)?
        .map(Json)
        .ok_or_else(|| Error::not_found("year not found"))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let conn = state.db();
    let changed = conn.execute("DELETE FROM years WHERE id = ?", [&id])?;
    if changed == 0 {
        return Err(Error::not_found("year not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
