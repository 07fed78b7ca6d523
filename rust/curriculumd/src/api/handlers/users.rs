use crate::api::params::{opt_str, required_str, text};
use crate::api::AppState;
use crate::error::Result;
use crate::groups::Role;
use crate::users::{self, User, UserInput};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value as JsonValue;

fn user_input(body: &JsonValue) -> Result<UserInput> {
    Ok(UserInput {
        username: required_str(body, "username")?,
        email: text(body, "email")?,
        first_name: text(body, "first_name")?,
        last_name: text(body, "last_name")?,
        role: Role::parse(&text(body, "role")?)?,
        school: opt_str(body, "school")?,
    })
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    let conn = state.db();
    Ok(Json(users::list_users(&conn)?))
}

/// Group membership follows the role on every save.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<User>)> {
    let input = user_input(&body)?;
    let conn = state.db();
    let user = users::create_user(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<User>> {
    let input = user_input(&body)?;
    let conn = state.db();
    Ok(Json(users::update_user(&conn, &id, &input)?))
}
