//! Registration, login, logout and session check under `/api/auth`.

use axum::{extract::State, http::header, response::IntoResponse, routing::{get, post}, Router};

use super::extract::{cleared_cookie, session_cookie, AuthUser, JsonBody};
use super::response::ApiResponse;
use super::AppState;
use crate::services::auth::{LoginInput, RegisterInput};
use crate::services::Identity;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/checkAuth", get(check_auth))
}

async fn register(State(s): State<AppState>, JsonBody(input): JsonBody<RegisterInput>) -> Result<ApiResponse<Identity>> {
    let user = s.auth.register(input).await?;
    Ok(ApiResponse::created("Registered successfully", Identity::from(&user)))
}

async fn login(State(s): State<AppState>, JsonBody(input): JsonBody<LoginInput>) -> Result<impl IntoResponse> {
    let (token, identity) = s.auth.login(input).await?;
    let cookie = session_cookie(&token, s.config.token_ttl.as_secs(), s.config.is_production());
    Ok(([(header::SET_COOKIE, cookie)], ApiResponse::created("Logged in successfully", identity)))
}

async fn logout(State(s): State<AppState>) -> impl IntoResponse {
    ([(header::SET_COOKIE, cleared_cookie(s.config.is_production()))], ApiResponse::message("Logged out successfully"))
}

async fn check_auth(AuthUser(user): AuthUser) -> ApiResponse<Identity> {
    ApiResponse::ok("Authenticated user", Identity::from(&user))
}
