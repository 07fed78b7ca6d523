use crate::api::params::{json_array, opt_str, required_str};
use crate::api::AppState;
use crate::catalog::{self, CompetenceFilter, CompetenceInput};
use crate::error::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub region: Option<String>,
    pub subject: Option<String>,
    pub year: Option<String>,
}

/// Filters by `region`, `subject` and `year`. Failures are logged and
/// reported with a generic `detail` body.
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    tracing::debug!(
        region = ?query.region,
        subject = ?query.subject,
        year = ?query.year,
        "fetching competences"
    );
    let filter = CompetenceFilter {
        region: query.region.filter(|v| !v.trim().is_empty()),
        subject: query.subject.filter(|v| !v.trim().is_empty()),
        year: query.year.filter(|v| !v.trim().is_empty()),
    };
    let result = {
        let conn = state.db();
        catalog::list_competences(&conn, &filter)
    };
    match result {
        Ok(rows) => Json(JsonValue::Array(rows)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "error fetching competences");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": format!("Error fetching competences: {}", e) })),
            )
                .into_response()
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<JsonValue>)> {
    let input = CompetenceInput {
        region: required_str(&body, "region")?,
        subject: opt_str(&body, "subject")?,
        year: opt_str(&body, "year")?,
        code: required_str(&body, "code")?,
        description: required_str(&body, "description")?,
        evaluation_criteria: json_array(&body, "evaluation_criteria")?,
    };
    let conn = state.db();
    let created = catalog::create_competence(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(created)))
}
