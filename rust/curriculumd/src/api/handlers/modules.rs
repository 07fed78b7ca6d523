use crate::api::params::{
    bool_or, json_array, json_object, opt_date, opt_f64, opt_id_list, opt_str, required_str, text,
};
use crate::api::{AppState, Caller};
use crate::error::Result;
use crate::modules::{self, ModuleFilter, ModuleInput};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub year: Option<String>,
    pub subject: Option<String>,
}

fn module_input(body: &JsonValue, caller: &Caller) -> Result<ModuleInput> {
    let school = match opt_str(body, "school")? {
        Some(school) => school,
        None => caller.require_school()?.to_string(),
    };
    Ok(ModuleInput {
        year: required_str(body, "year")?,
        school,
        subject: required_str(body, "subject")?,
        title: required_str(body, "title")?,
        description: text(body, "description")?,
        date_start: opt_date(body, "date_start")?,
        date_end: opt_date(body, "date_end")?,
        session_length: modules::session_hours(opt_f64(body, "session_length")?)?,
        evaluable: bool_or(body, "evaluable", false)?,
        specific_competences: json_array(body, "specific_competences")?,
        selected_criteria: json_object(body, "selected_criteria")?,
        basic_knowledge: json_array(body, "basic_knowledge")?,
        content: json_array(body, "content")?,
        files: json_array(body, "files")?,
        teaching_staff: opt_id_list(body, "teaching_staff")?,
    })
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<JsonValue>> {
    let filter = ModuleFilter {
        year: query.year.filter(|v| !v.trim().is_empty()),
        subject: query.subject.filter(|v| !v.trim().is_empty()),
    };
    let conn = state.db();
    Ok(Json(JsonValue::Array(modules::list_modules(&conn, &filter)?)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<JsonValue>)> {
    let input = module_input(&body, &caller)?;
    let conn = state.db();
    let created = modules::create_module(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>> {
    let conn = state.db();
    Ok(Json(modules::module_json(&conn, &id)?))
}

/// Overwrites the JSON fields; `teaching_staff` changes only when present.
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<JsonValue>> {
    let input = module_input(&body, &caller)?;
    let conn = state.db();
    Ok(Json(modules::update_module(&conn, &id, &input)?))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let conn = state.db();
    modules::delete_module(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
