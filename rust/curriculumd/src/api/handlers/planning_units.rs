use crate::api::params::opt_str;
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::planning::{self, PlanningUnit, UnitDescriptor};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub subject: Option<String>,
}

fn descriptor(value: JsonValue) -> Result<UnitDescriptor> {
    serde_json::from_value(value).map_err(|e| Error::bad_request(format!("invalid unit: {}", e)))
}

fn required_subject(body: &JsonValue) -> Result<String> {
    opt_str(body, "subject")?.ok_or_else(|| Error::bad_request("Subject ID is required"))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PlanningUnit>>> {
    let subject = query.subject.as_deref().filter(|v| !v.trim().is_empty());
    let conn = state.db();
    Ok(Json(planning::list_units(&conn, subject)?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<PlanningUnit>)> {
    let subject = required_subject(&body)?;
    let unit = descriptor(body)?;
    let conn = state.db();
    let created = planning::create_unit(&conn, &subject, &unit)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PlanningUnit>> {
    let conn = state.db();
    Ok(Json(planning::get_unit(&conn, &id)?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<PlanningUnit>> {
    let subject = required_subject(&body)?;
    let unit = descriptor(body)?;
    let conn = state.db();
    Ok(Json(planning::update_unit(&conn, &id, &subject, &unit)?))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let conn = state.db();
    planning::delete_unit(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Body `{subject, units: [{unit_number, learning_situation, start_date,
/// end_date, title, notes}, ...]}`. Answers with every unit of the subject.
pub async fn bulk_update(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<Json<Vec<PlanningUnit>>> {
    let subject = required_subject(&body)?;
    let units = match body.get("units") {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(JsonValue::Array(items)) => items
            .iter()
            .cloned()
            .map(descriptor)
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(Error::bad_request("units must be an array")),
    };

    let conn = state.db();
    Ok(Json(planning::reconcile_planning_units(&conn, &subject, &units)?))
}
