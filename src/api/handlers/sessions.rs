//! Session listing and targeted revocation.

use super::{client_meta, require_identity};
use crate::api::error::ErrorBody;
use crate::api::state::ApiState;
use crate::auth::AuthError;
use crate::store::Session;
use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// One active session; the token hash stays server-side.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionSummary {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/auth/sessions",
    responses(
        (status = 200, description = "Active sessions for the caller", body = [SessionSummary]),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn list_sessions(
    headers: HeaderMap,
    state: Extension<Arc<ApiState>>,
) -> impl IntoResponse {
    let now = Utc::now();
    let identity = match require_identity(&state, &headers, now).await {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    match state.auth().sessions_for(identity.user_id, now).await {
        Ok(sessions) => {
            let summaries: Vec<SessionSummary> =
                sessions.into_iter().map(SessionSummary::from).collect();
            (StatusCode::OK, Json(summaries)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/auth/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session revoked"),
        (status = 400, description = "Malformed session id", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Caller is neither the owner nor an admin", body = ErrorBody),
        (status = 404, description = "No such session", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn revoke_session(
    Path(id): Path<String>,
    headers: HeaderMap,
    state: Extension<Arc<ApiState>>,
) -> impl IntoResponse {
    let now = Utc::now();
    let identity = match require_identity(&state, &headers, now).await {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    let Ok(session_id) = Uuid::parse_str(id.trim()) else {
        return AuthError::Validation("invalid session id".to_string()).into_response();
    };

    let meta = client_meta(&headers);
    match state
        .auth()
        .revoke_session(&identity, session_id, &meta, now)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
