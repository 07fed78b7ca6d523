use super::AppState;
use crate::error::{Error, Result};
use crate::groups::Role;
use crate::users;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

/// Header naming the authenticated user. Resolved upstream by the auth layer.
pub const CALLER_HEADER: &str = "x-user-id";

/// The resolved identity behind a request on a protected route.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub school_id: Option<String>,
    pub role: Role,
}

impl Caller {
    pub fn require_school(&self) -> Result<&str> {
        self.school_id
            .as_deref()
            .ok_or_else(|| Error::bad_request("User not associated with any school."))
    }
}

/// Resolves `X-User-Id` to a known user and stores it as an extension.
/// Missing or unknown ids are rejected with 401.
pub async fn require_caller(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let Some(user_id) = req
        .headers()
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    else {
        return Err(Error::Unauthorized);
    };

    let user = {
        let conn = state.db();
        users::get_user(&conn, &user_id)?
    };
    let Some(user) = user else {
        tracing::debug!(user_id = %user_id, "unknown caller");
        return Err(Error::Unauthorized);
    };

    req.extensions_mut().insert(Caller {
        user_id: user.id,
        school_id: user.school,
        role: user.role,
    });
    Ok(next.run(req).await)
}
