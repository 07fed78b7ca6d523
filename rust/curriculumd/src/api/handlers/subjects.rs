use crate::api::params::{id_list, opt_id_list, opt_str, required_str, text};
use crate::api::{AppState, Caller};
use crate::catalog;
use crate::db;
use crate::error::{Error, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rusqlite::{params, OptionalExtension};
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub async fn list(State(state): State<AppState>) -> Result<Json<JsonValue>> {
    let conn = state.db();
    Ok(Json(JsonValue::Array(catalog::list_subjects(&conn)?)))
}

/// The subject lands in the caller's school and region, with the caller on
/// its teaching staff.
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<JsonValue>)> {
    let school_id = caller.require_school()?.to_string();
    let name = required_str(&body, "name")?;
    let description = text(&body, "description")?;
    let year = opt_str(&body, "year")?;
    let mut staff = id_list(&body, "teaching_staff")?;
    if !staff.contains(&caller.user_id) {
        staff.push(caller.user_id.clone());
    }
    let competences = id_list(&body, "specific_competences")?;

    let conn = state.db();
    let region: Option<String> = conn
        .query_row(
            "SELECT region_id FROM schools WHERE id = ?",
            [&school_id],
            |r| r.get(0),
        )
        .optional()?
        .flatten();

    let id = Uuid::new_v4().to_string();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO subjects(id, name, description, year_id, region_id, school_id)
         VALUES(?, ?, ?, ?, ?, ?)",
        params![id, name, description, year, region, school_id],
    )?;
    db::replace_links(&tx, "subject_staff", "subject_id", "user_id", &id, &staff)?;
    db::replace_links(
        &tx,
        "subject_competences",
        "subject_id",
        "competence_id",
        &id,
        &competences,
    )?;
    tx.commit()?;
    tracing::debug!(subject_id = %id, school_id = %school_id, "created subject");

    let subject = catalog::subject_json(&conn, &id)?
        .ok_or_else(|| Error::Internal("subject missing after insert".into()))?;
    Ok((StatusCode::CREATED, Json(subject)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>> {
    let conn = state.db();
    catalog::subject_json(&conn, &id)?
        .map(Json)
        .ok_or_else(|| Error::not_found("subject not found"))
}

/// School stays as created; link sets change only when present.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<JsonValue>> {
    let name = required_str(&body, "name")?;
    let description = text(&body, "description")?;
    let year = opt_str(&body, "year")?;
    let region = opt_str(&body, "region")?;
    let staff = opt_id_list(&body, "teaching_staff")?;
    let competences = opt_id_list(&body, "specific_competences")?;

    let conn = state.db();
    let tx = conn.unchecked_transaction()?;
    let changed = tx.execute(
        "UPDATE subjects SET name = ?, description = ?, year_id = ?, region_id = ? WHERE id = ?",
        params![name, description, year, region, id],
    )?;
    if changed == 0 {
        return Err(Error::not_found("subject not found"));
    }
    if let Some(staff) = staff {
        db::replace_links(&tx, "subject_staff", "subject_id", "user_id", &id, &staff)?;
    }
    if let Some(competences) = competences {
        db::replace_links(
            &tx,
            "subject_competences",
            "subject_id",
            "competence_id",
            &id,
            &competences,
        )?;
    }
    tx.commit()?;

    catalog::subject_json(&conn, &id)?
        .map(Json)
        .ok_or_else(|| Error::not_found("subject not found"))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let conn = state.db();
    let changed = conn.execute("DELETE FROM subjects WHERE id = ?", [&id])?;
    if changed == 0 {
        return Err(Error::not_found("subject not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
