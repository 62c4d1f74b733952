use super::state::AppState;
use crate::capability::{mailto_url, tel_url, AnswerPrompt, PermissionStatus};
use crate::error::{AlertError, CapabilityError};
use crate::session::SessionSnapshot;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddContactRequest {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answered: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub session: SessionSnapshot,
    /// Question waiting on `POST /emergency/answer`
    pub pending_prompt: Option<AnswerPrompt>,
}

#[derive(Debug, Serialize)]
pub struct MapResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceEntry {
    pub name: String,
    pub number: String,
    pub description: String,
    pub urgent: bool,
    pub tel: String,
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: Vec<ServiceEntry>,
    pub support: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for AlertError {
    fn into_response(self) -> Response {
        let status = match &self {
            AlertError::ValidationRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AlertError::Capability(CapabilityError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            AlertError::Capability(CapabilityError::Unavailable(..)) => StatusCode::SERVICE_UNAVAILABLE,
            AlertError::Storage(e) => {
                error!("Storage failure: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self.to_string())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /contacts
pub async fn list_contacts(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.contacts().list_contacts())
}

/// POST /contacts
pub async fn add_contact(
    State(state): State<AppState>,
    Json(req): Json<AddContactRequest>,
) -> Result<impl IntoResponse, AlertError> {
    let contact = state.controller.contacts().add_contact(&req.name, &req.phone)?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// DELETE /contacts/:id
pub async fn remove_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AlertError> {
    state.controller.contacts().remove_contact(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /emergency/activate
pub async fn activate(State(state): State<AppState>) -> impl IntoResponse {
    info!("Emergency activated over HTTP");
    Json(state.controller.activate().await)
}

/// POST /emergency/deactivate
pub async fn deactivate(State(state): State<AppState>) -> impl IntoResponse {
    info!("Emergency deactivated over HTTP");
    Json(state.controller.deactivate().await)
}

/// GET /emergency/status
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        session: state.controller.snapshot().await,
        pending_prompt: state.answers.pending(),
    })
}

/// POST /emergency/answer
/// Resolve the outstanding "did they answer" / "dial fallback" question
pub async fn answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Response {
    if state.answers.resolve(req.answered) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::CONFLICT, "No question is waiting for an answer")
    }
}

/// GET /permissions
pub async fn permissions(State(state): State<AppState>) -> Json<PermissionStatus> {
    Json(state.controller.permissions().await)
}

/// POST /permissions/refresh
pub async fn refresh_permissions(State(state): State<AppState>) -> Json<PermissionStatus> {
    Json(state.controller.refresh_permissions().await)
}

/// POST /location/refresh
pub async fn refresh_location(State(state): State<AppState>) -> Result<impl IntoResponse, AlertError> {
    Ok(Json(state.controller.refresh_location().await?))
}

/// GET /location/map
pub async fn location_map(State(state): State<AppState>) -> Response {
    match state.controller.map_link().await {
        Some(url) => Json(MapResponse { url }).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No location captured yet"),
    }
}

/// GET /services
pub async fn services(State(state): State<AppState>) -> Json<ServicesResponse> {
    let services = state
        .directory
        .iter()
        .map(|s| ServiceEntry {
            name: s.name.clone(),
            number: s.number.clone(),
            description: s.description.clone(),
            urgent: s.urgent,
            tel: tel_url(&s.number),
        })
        .collect();

    Json(ServicesResponse {
        services,
        support: mailto_url(&state.support_email),
    })
}

/// POST /reset
/// Remove all stored data, contacts included
pub async fn reset(State(state): State<AppState>) -> Result<StatusCode, AlertError> {
    state.controller.deactivate().await;
    state.controller.contacts().reset()?;
    Ok(StatusCode::NO_CONTENT)
}
