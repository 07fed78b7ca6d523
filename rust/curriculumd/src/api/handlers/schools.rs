use crate::api::params::{opt_id_list, opt_str, required_str};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::schools::{self, SchoolInput};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value as JsonValue;

fn school_input(body: &JsonValue) -> Result<SchoolInput> {
    Ok(SchoolInput {
        name: required_str(body, "name")?,
        region: opt_str(body, "region")?,
        school_type: opt_str(body, "school_type")?,
        address: opt_str(body, "address")?,
        phone_number: opt_str(body, "phone_number")?,
        teaching_staff: opt_id_list(body, "teaching_staff")?,
    })
}

pub async fn list(State(state): State<AppState>) -> Result<Json<JsonValue>> {
    let conn = state.db();
    Ok(Json(JsonValue::Array(schools::list_schools(&conn)?)))
}

/// Creating a school also gives it default years and its academic calendar.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<JsonValue>)> {
    let input = school_input(&body)?;
    let today = state.clock().today();
    let conn = state.db();
    let id = schools::create_school(&conn, &input, today)?;
    let school = schools::school_json(&conn, &id)?
        .ok_or_else(|| Error::Internal("school missing after insert".into()))?;
    Ok((StatusCode::CREATED, Json(school)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>> {
    let conn = state.db();
    schools::school_json(&conn, &id)?
        .map(Json)
        .ok_or_else(|| Error::not_found("school not found"))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<JsonValue>> {
    let input = school_input(&body)?;
    let conn = state.db();
    schools::update_school(&conn, &id, &input)?;
    schools::school_json(&conn, &id)?
        .map(Json)
        .ok_or_else(|| Error::not_found("school not found"))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let conn = state.db();
    schools::delete_school(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
