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
    Ok(Json(JsonValue::Array(catalog::list_regions(&conn)?)))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<JsonValue>)> {
    let name = required_str(&body, "name")?;
    let description = opt_str(&body, "description")?;
    let conn = state.db();
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO regions(id, name, description) VALUES(?, ?, ?)",
        params![id, name, description],
    )?;
    let region = catalog::region_json(&conn, &id)?
        .ok_or_else(|| Error::Internal("region missing after insert".into()))?;
    Ok((StatusCode::CREATED, Json(region)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>> {
    let conn = state.db();
    catalog::region_json(&conn, &id)?
        .map(Json)
        .ok_or_else(|| Error::not_found("region not found"))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<JsonValue>> {
    let name = required_str(&body, "name")?;
    let description = opt_str(&body, "description")?;
    let conn = state.db();
    let changed = conn.execute(
        "UPDATE regions SET name = ?, description = ? WHERE id = ?",
        params![name, description, id],
    )?;
    if changed == 0 {
        return Err(Error::not_found("region not found"));
    }
    catalog::region_json(&conn, &id)?
        .map(Json)
        .ok_or_else(|| Error::not_found("region not found"))
}

/// Refused while any school or competence still points at the region.
pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let conn = state.db();
    if !catalog::exists(&conn, "regions", &id)? {
        return Err(Error::not_found("region not found"));
    }
    let (schools, competences): (i64, i64) = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM schools WHERE region_id = ?1),
            (SELECT COUNT(*) FROM specific_competences WHERE region_id = ?1)",
        [&id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    if schools > 0 || competences > 0 {
        return Err(Error::conflict(format!(
            "region is still referenced by {} school(s) and {} competence(s)",
            schools, competences
        )));
    }
    conn.execute("DELETE FROM regions WHERE id = ?", [&id])?;
    Ok(StatusCode::NO_CONTENT)
}
