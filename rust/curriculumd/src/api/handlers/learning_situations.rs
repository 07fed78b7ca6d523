use crate::api::params::{opt_date, opt_id_list, opt_str, required_str, text};
use crate::api::{AppState, Caller};
use crate::error::Result;
use crate::situations::{self, LearningSituation, SituationFilter, SituationInput};
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

fn situation_input(body: &JsonValue, caller: &Caller) -> Result<SituationInput> {
    let school = match opt_str(body, "school")? {
        Some(school) => school,
        None => caller.require_school()?.to_string(),
    };
    Ok(SituationInput {
        year: opt_str(body, "year")?,
        region: opt_str(body, "region")?,
        school,
        subject: required_str(body, "subject")?,
        title: required_str(body, "title")?,
        description: text(body, "description")?,
        date_start: opt_date(body, "date_start")?,
        date_end: opt_date(body, "date_end")?,
        teaching_staff: opt_id_list(body, "teaching_staff")?,
        specific_competences: opt_id_list(body, "specific_competences")?,
        modules: opt_id_list(body, "modules")?,
    })
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<LearningSituation>>> {
    let filter = SituationFilter {
        year: query.year.filter(|v| !v.trim().is_empty()),
        subject: query.subject.filter(|v| !v.trim().is_empty()),
    };
    let conn = state.db();
    Ok(Json(situations::list_situations(&conn, &filter)?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<LearningSituation>)> {
    let input = situation_input(&body, &caller)?;
    let conn = state.db();
    let created = situations::create_situation(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LearningSituation>> {
    let conn = state.db();
    Ok(Json(situations::get_situation(&conn, &id)?))
}

/// `modules`, `teaching_staff` and `specific_competences` are replaced only
/// when the body carries them.
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<LearningSituation>> {
    let input = situation_input(&body, &caller)?;
    let conn = state.db();
    Ok(Json(situations::update_situation(&conn, &id, &input)?))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let conn = state.db();
    situations::delete_situation(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
