use crate::api::params::{opt_i64, required_date, required_str};
use crate::api::{AppState, Caller};
use crate::error::{Error, Result};
use crate::scheduling::{self, ScheduleInput, ScheduledSituation};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub term: Option<String>,
}

fn schedule_input(body: &JsonValue) -> Result<ScheduleInput> {
    Ok(ScheduleInput {
        learning_situation_id: required_str(body, "learning_situation_id")?,
        term: required_str(body, "term")?,
        start_date: required_date(body, "start_date")?,
        end_date: required_date(body, "end_date")?,
        order: opt_i64(body, "order")?,
    })
}

pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ScheduledSituation>>> {
    let term = query.term.as_deref().filter(|v| !v.trim().is_empty());
    let conn = state.db();
    Ok(Json(scheduling::list_scheduled(&conn, &caller.user_id, term)?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<ScheduledSituation>)> {
    let input = schedule_input(&body)?;
    let conn = state.db();
    let created = scheduling::create_scheduled(&conn, &caller.user_id, &input)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<ScheduledSituation>> {
    let conn = state.db();
    Ok(Json(scheduling::get_scheduled(&conn, &caller.user_id, &id)?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<ScheduledSituation>> {
    let input = schedule_input(&body)?;
    let conn = state.db();
    Ok(Json(scheduling::update_scheduled(
        &conn,
        &caller.user_id,
        &id,
        &input,
    )?))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let conn = state.db();
    scheduling::delete_scheduled(&conn, &caller.user_id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Body `{term_id, new_order: [id, ...]}`.
pub async fn reorder(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<JsonValue>,
) -> Result<Json<JsonValue>> {
    let term_id = required_str(&body, "term_id")?;
    let new_order: Vec<String> = match body.get("new_order") {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| Error::bad_request("new_order must be an array of ids"))
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(Error::bad_request("new_order must be an array of ids")),
    };

    let conn = state.db();
    scheduling::reorder(&conn, &caller.user_id, &term_id, &new_order)?;
    Ok(Json(json!({ "status": "success" })))
}
