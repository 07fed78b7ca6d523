use crate::api::{AppState, Caller};
use crate::calendar::{self, SchoolCalendar};
use crate::error::Result;
use axum::extract::{Path, State};
use axum::{Extension, Json};

pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<SchoolCalendar>>> {
    let conn = state.db();
    Ok(Json(calendar::list_calendars_for_user(&conn, &caller.user_id)?))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<SchoolCalendar>> {
    let conn = state.db();
    Ok(Json(calendar::get_calendar_for_user(&conn, &caller.user_id, &id)?))
}
