use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::remote::models::Credentials;
use crate::remote::RemoteError;
use crate::session::SessionError;
use crate::web::state::AppState;

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub tables: Vec<String>,
}

pub fn session_error(e: SessionError) -> (StatusCode, String) {
    let status = match &e {
        SessionError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        SessionError::InvalidCredentials(_) => StatusCode::BAD_REQUEST,
        SessionError::Remote(RemoteError::Rejected(_)) => StatusCode::UNAUTHORIZED,
        SessionError::Remote(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

pub async fn check_auth(State(state): State<Arc<AppState>>) -> Json<AuthStatus> {
    let authenticated = state.sessions.restore().await;
    Json(AuthStatus { authenticated })
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let session = state.sessions.login(&credentials).await.map_err(|e| {
        error!("Login failed: {}", e);
        session_error(e)
    })?;

    info!("Logged in to '{}'", credentials.db_name.trim());
    Ok(Json(LoginResponse {
        success: true,
        tables: session.tables().to_vec(),
    }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AuthStatus>, (StatusCode, String)> {
    state.sessions.logout().await.map_err(|e| {
        error!("Logout failed: {}", e);
        session_error(e)
    })?;
    Ok(Json(AuthStatus {
        authenticated: false,
    }))
}
