//! Session resolution middleware

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::app::{AppState, SharedSession};
use crate::store::RecordStore;

/// Request and response header carrying the session id
pub const SESSION_HEADER: &str = "x-session-id";

/// The caller's session, inserted into request extensions
pub struct ActiveSession<S> {
    pub id: Uuid,
    pub session: SharedSession<S>,
}

impl<S> Clone for ActiveSession<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            session: self.session.clone(),
        }
    }
}

/// Session id from the request headers, if present and well-formed
pub fn requested_session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(SESSION_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

/// Resolve the caller's session, opening a new one (and loading the inventory)
/// when the header is missing or names an unknown session. The session id is
/// echoed back in the response headers.
pub async fn attach_session<S: RecordStore>(
    State(state): State<AppState<S>>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = requested_session_id(request.headers())
        .and_then(|id| state.sessions.get(&id).map(|session| (id, session)));

    let (id, session) = match existing {
        Some(found) => found,
        None => state.sessions.open().await,
    };

    request.extensions_mut().insert(ActiveSession { id, session });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}
