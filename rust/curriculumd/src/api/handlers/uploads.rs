use crate::api::AppState;
use crate::error::Error;
use crate::uploads::{self, NO_FILE_MESSAGE, TOO_LARGE_MESSAGE};
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

fn upload_rejected(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Only a body-limit rejection is reported as an oversized file.
fn multipart_rejected(e: MultipartError) -> Response {
    tracing::debug!(error = %e, "upload body rejected");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        upload_rejected(TOO_LARGE_MESSAGE)
    } else {
        upload_rejected(&e.body_text())
    }
}

/// Multipart field `file`. Rejections keep the `{"error": <message>}` shape
/// the upload widget expects.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let max_bytes = state.config().max_upload_bytes;
    let mut file = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_rejected(e),
        };
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        match field.bytes().await {
            Ok(bytes) => file = Some((name, content_type, bytes)),
            Err(e) => return multipart_rejected(e),
        }
        break;
    }

    let Some((name, content_type, bytes)) = file else {
        return upload_rejected(NO_FILE_MESSAGE);
    };
    if bytes.len() > max_bytes {
        return upload_rejected(TOO_LARGE_MESSAGE);
    }

    let config = state.config();
    let today = state.clock().today();
    match uploads::store_upload(
        &config.media_root,
        &config.media_url,
        &name,
        &content_type,
        &bytes,
        max_bytes,
        today,
    )
    .await
    {
        Ok(stored) => Json(stored).into_response(),
        Err(Error::BadRequest(message)) => upload_rejected(&message),
        Err(e) => e.into_response(),
    }
}
