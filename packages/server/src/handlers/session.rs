use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{instrument, warn};

use crate::checkin::{NewSession, SessionManager, TokenSigner};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::session::*;
use crate::state::AppState;

/// Accept either a QR payload or a bare session id in path segments.
fn session_id<'p>(signer: &TokenSigner, token: &'p str) -> &'p str {
    signer.decode(token).unwrap_or(token)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Sessions",
    operation_id = "createSession",
    summary = "Open a check-in session",
    description = "Opens a QR check-in session for a subject period. Any active session for the same `(subject_id, date, period)` is closed first, so at most one stays active. `ttl_minutes` defaults to the configured value and is capped by `checkin.max_ttl_minutes`.",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session opened", body = SessionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Subject not found (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "Store unavailable (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(subject_id = %payload.subject_id, period = payload.period))]
pub async fn create_session(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ttl = validate_create_session(&payload, &state.config.checkin)?;

    let now = chrono::Utc::now();
    let model = SessionManager::new(&state.db)
        .create(
            NewSession {
                subject_id: payload.subject_id.trim().to_string(),
                classrooms: payload.classrooms,
                date: payload.date,
                period: payload.period,
                ttl: chrono::Duration::minutes(ttl),
                location: payload.location,
            },
            now,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new(model, &state.signer, now)),
    ))
}

#[utoipa::path(
    get,
    path = "/{token}",
    tag = "Sessions",
    operation_id = "getSession",
    summary = "Get a session by token",
    params(("token" = String, Path, description = "QR payload or session id")),
    responses(
        (status = 200, description = "Session details", body = SessionResponse),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let model = SessionManager::new(&state.db)
        .get(session_id(&state.signer, &token))
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".into()))?;
    Ok(Json(SessionResponse::new(
        model,
        &state.signer,
        chrono::Utc::now(),
    )))
}

#[utoipa::path(
    post,
    path = "/{token}/cancel",
    tag = "Sessions",
    operation_id = "cancelSession",
    summary = "Cancel a session",
    description = "Closes the session. Cancelling an already closed session returns it unchanged.",
    params(("token" = String, Path, description = "QR payload or session id")),
    responses(
        (status = 200, description = "Session closed", body = SessionResponse),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let model = SessionManager::new(&state.db)
        .cancel(session_id(&state.signer, &token))
        .await?;
    Ok(Json(SessionResponse::new(
        model,
        &state.signer,
        chrono::Utc::now(),
    )))
}

#[utoipa::path(
    post,
    path = "/deactivate",
    tag = "Sessions",
    operation_id = "deactivateSessions",
    summary = "Close every active session of a subject period",
    request_body = DeactivateSessionsRequest,
    responses(
        (status = 200, description = "Sessions closed", body = DeactivateSessionsResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(subject_id = %payload.subject_id))]
pub async fn deactivate_sessions(
    State(state): State<AppState>,
    AppJson(payload): AppJson<DeactivateSessionsRequest>,
) -> Result<Json<DeactivateSessionsResponse>, AppError> {
    crate::models::shared::validate_period(payload.period)?;
    let deactivated = SessionManager::new(&state.db)
        .deactivate_all(payload.subject_id.trim(), payload.date, payload.period)
        .await?;
    Ok(Json(DeactivateSessionsResponse { deactivated }))
}

#[utoipa::path(
    get,
    path = "/{id}/sessions/active",
    tag = "Sessions",
    operation_id = "listActiveSessions",
    summary = "List active sessions of a subject",
    description = "Newest first. Sessions past `expires_at` that no scan has closed yet are included with `is_expired = true`.",
    params(("id" = String, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Active sessions", body = Vec<SessionResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_active_sessions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    let now = chrono::Utc::now();
    let sessions = SessionManager::new(&state.db).list_active(&id).await?;
    Ok(Json(
        sessions
            .into_iter()
            .map(|m| SessionResponse::new(m, &state.signer, now))
            .collect(),
    ))
}

/// Server-sent events with every accepted check-in of one session.
///
/// Each event is named `check_in` and carries a JSON `CheckInEvent`. The
/// stream stays open until the client disconnects.
#[instrument(skip(state))]
pub async fn session_feed(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let id = session_id(&state.signer, &token).to_string();
    SessionManager::new(&state.db)
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".into()))?;

    let rx = state.feed.subscribe();
    let events = stream::unfold((rx, id), |(mut rx, id)| async move {
        loop {
            match rx.recv().await {
                Ok(event) if event.session_id == id => {
                    let sse = Event::default()
                        .event("check_in")
                        .json_data(&event)
                        .unwrap_or_else(|_| Event::default().comment("unserializable event"));
                    return Some((Ok(sse), (rx, id)));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(session_id = %id, skipped, "Live feed subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
