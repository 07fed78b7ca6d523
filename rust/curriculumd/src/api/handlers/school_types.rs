use crate::api::params::{id_list, required_str, text};
use crate::api::AppState;
use crate::catalog;
use crate::db;
use crate::error::{Error, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rusqlite::{params, Connection};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

fn school_type_with_years(conn: &Connection, id: &str) -> Result<Option<JsonValue>> {
    let Some(mut school_type) = catalog::school_type_json(conn, id)? else {
        return Ok(None);
    };
    school_type["default_years"] = json!(catalog::school_type_default_years(conn, id)?);
    Ok(Some(school_type))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<JsonValue>> {
    let conn = state.db();
    let ids = {
        let mut stmt = conn.prepare("SELECT id FROM school_types ORDER BY name, rowid")?;
        let ids = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids
    };
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(school_type) = school_type_with_years(&conn, &id)? {
            out.push(school_type);
        }
    }
    Ok(Json(JsonValue::Array(out)))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<JsonValue>)> {
    let name = required_str(&body, "name")?;
    let description = text(&body, "description")?;
    let default_years = id_list(&body, "default_years")?;

    let conn = state.db();
    let id = Uuid::new_v4().to_string();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO school_types(id, name, description) VALUES(?, ?, ?)",
        params![id, name, description],
    )?;
    db::replace_links(
        &tx,
        "school_type_default_years",
        "school_type_id",
        "year_id",
        &id,
        &default_years,
    )?;
    tx.commit()?;

    let school_type = school_type_with_years(&conn, &id)?
        .ok_or_else(|| Error::Internal("school type missing after insert".into()))?;
    Ok((StatusCode::CREATED, Json(school_type)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>> {
    let conn = state.db();
    school_type_with_years(&conn, &id)?
        .map(Json)
        .ok_or_else(|| Error::not_found("school type not found"))
}
