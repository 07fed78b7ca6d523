use crate::api::params::{required_date, required_str};
use crate::api::{AppState, Caller};
use crate::calendar::{self, Term};
use crate::error::Result;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::Value as JsonValue;

pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Term>>> {
    let conn = state.db();
    Ok(Json(calendar::list_terms_for_user(&conn, &caller.user_id)?))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Term>> {
    let conn = state.db();
    Ok(Json(calendar::get_term_for_user(&conn, &caller.user_id, &id)?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<Term>> {
    let name = required_str(&body, "name")?;
    let start_date = required_date(&body, "start_date")?;
    let end_date = required_date(&body, "end_date")?;
    let conn = state.db();
    let term = calendar::update_term_for_user(
        &conn,
        &caller.user_id,
        &id,
        &name,
        start_date,
        end_date,
    )?;
    tracing::debug!(term_id = %id, "updated term");
    Ok(Json(term))
}
