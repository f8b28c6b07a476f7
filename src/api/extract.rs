//! Request extractors that reject with the envelope instead of axum's
//! plain-text rejections.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{header, request::Parts, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::AppState;
use crate::domain::aggregates::User;
use crate::{EcommerceError, Result};

pub const TOKEN_COOKIE: &str = "token";

pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = EcommerceError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(EcommerceError::Validation(rejection.body_text())),
        }
    }
}

pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(EcommerceError::Validation(rejection.body_text())),
        }
    }
}

/// Caller identified by the `token` cookie or a bearer token.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        let token = token_from(&parts.headers)
            .ok_or_else(|| EcommerceError::Unauthorized("Unauthorized user! Token Not Found".into()))?;
        Ok(Self(state.auth.authenticate(&token).await?))
    }
}

pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() { return Err(EcommerceError::Forbidden); }
        Ok(Self(user))
    }
}

fn token_from(headers: &HeaderMap) -> Option<String> {
    let bearer = headers.get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    bearer.or_else(|| {
        headers.get_all(header::COOKIE).iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .find_map(|pair| pair.trim().strip_prefix("token=").map(str::to_string))
    })
    .filter(|t| !t.is_empty())
}

/// Parses a path id, naming the entity in the 400 message.
pub fn parse_id(raw: &str, entity: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| EcommerceError::Validation(format!("Invalid {entity} ID")))
}

pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!("{TOKEN_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}");
    if secure { cookie.push_str("; Secure"); }
    cookie
}

pub fn cleared_cookie(secure: bool) -> String { session_cookie("", 0, secure) }
