use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};

use presence::data::{
    ActiveSession, ActiveSessionsResponse, LoginRequest, LoginResponse, LogoutRequest,
    MessageResponse, SessionResponse, StatusQuery, UpdateRequest,
};
use presence::id::SessionId;

use super::body::{Payload, PayloadRejection};
use super::error::ApiError;
use crate::network::ClientAddress;
use crate::services::SessionService;

const LOGIN_OK: &str = "Se ha logeado de manera exitosa";
const LOGIN_MISSING_FIELDS: &str = "Se esperan campos requeridos";
const LOGOUT_OK: &str = "Logout exitoso";
const LOGOUT_NOT_FOUND: &str = "No se ha encontrado una sesión activa";
const UPDATE_OK: &str = "Sesión actualizada correctamente.";
const SESSION_NOT_FOUND: &str = "No existe una sesión activa";
const STATUS_OK: &str = "Sesión activa";
const LIST_OK: &str = "Sesiones activas";
const LIST_EMPTY: &str = "No hay sesiones activas";

/// An absent or empty id can never match a session.
fn require_id(session_id: Option<String>, message: &str) -> Result<SessionId, ApiError> {
    session_id
        .filter(|id| !id.is_empty())
        .map(SessionId::from)
        .ok_or_else(|| ApiError::not_found(message))
}

/// Handler for `POST /login`
pub async fn login(
    State(state): State<Arc<crate::AppState>>,
    client: ClientAddress,
    payload: Result<Payload<LoginRequest>, PayloadRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Payload(request) = payload?;

    let session = state
        .sessions
        .create(request, &client)
        .await
        .map_err(|err| ApiError::from_session(err, LOGIN_MISSING_FIELDS))?;

    Ok(Json(LoginResponse {
        message: LOGIN_OK.to_string(),
        session_id: session.session_id,
    }))
}

/// Handler for `POST /logout`
pub async fn logout(
    State(state): State<Arc<crate::AppState>>,
    payload: Result<Payload<LogoutRequest>, PayloadRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Payload(request) =
        payload.map_err(|err| ApiError::unreadable_session_body(err, LOGOUT_NOT_FOUND))?;
    let session_id = require_id(request.session_id, LOGOUT_NOT_FOUND)?;

    state
        .sessions
        .delete(&session_id)
        .await
        .map_err(|err| ApiError::from_session(err, LOGOUT_NOT_FOUND))?;

    Ok(Json(MessageResponse::new(LOGOUT_OK)))
}

/// Handler for `PUT /update`
pub async fn update(
    State(state): State<Arc<crate::AppState>>,
    payload: Result<Payload<UpdateRequest>, PayloadRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Payload(request) =
        payload.map_err(|err| ApiError::unreadable_session_body(err, SESSION_NOT_FOUND))?;
    let session_id = require_id(request.session_id, SESSION_NOT_FOUND)?;

    let session = state
        .sessions
        .update(
            &session_id,
            request.email.as_deref(),
            request.nickname.as_deref(),
        )
        .await
        .map_err(|err| ApiError::from_session(err, SESSION_NOT_FOUND))?;

    Ok(Json(SessionResponse {
        message: UPDATE_OK.to_string(),
        session,
    }))
}

/// Handler for `GET /status`. Checking status touches the session.
pub async fn status(
    State(state): State<Arc<crate::AppState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = require_id(query.session_id, SESSION_NOT_FOUND)?;

    let session = state
        .sessions
        .get(&session_id)
        .await
        .map_err(|err| ApiError::from_session(err, SESSION_NOT_FOUND))?;

    Ok(Json(SessionResponse {
        message: STATUS_OK.to_string(),
        session,
    }))
}

/// Handler for `GET /statusAllActives`
pub async fn status_all_actives(
    State(state): State<Arc<crate::AppState>>,
) -> Result<Json<ActiveSessionsResponse>, ApiError> {
    let sessions = state
        .sessions
        .list()
        .await
        .map_err(|err| ApiError::from_session(err, LIST_EMPTY))?;

    let active_sessions = sessions
        .into_iter()
        .map(|(session_id, session_data)| ActiveSession {
            session_id,
            session_data,
        })
        .collect();

    Ok(Json(ActiveSessionsResponse {
        message: LIST_OK.to_string(),
        active_sessions,
    }))
}
