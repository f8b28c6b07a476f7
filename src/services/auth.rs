//! Registration, login and token handling.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::aggregates::User;
use crate::domain::value_objects::Role;
use crate::storage::UserStore;
use crate::{EcommerceError, Result};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub email: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Identity returned to clients after login and by `checkAuth`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
    pub username: String,
}

impl From<&User> for Identity {
    fn from(u: &User) -> Self { Self { id: u.id, role: u.role, email: u.email.clone(), username: u.username.clone() } }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| EcommerceError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()).unwrap_or(false)
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    secret: String,
    ttl: Duration,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, config: &AppConfig) -> Self {
        Self { users, secret: config.jwt_secret.clone(), ttl: config.token_ttl }
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> Result<User> {
        let (username, email) = (input.username.trim(), input.email.trim());
        if username.is_empty() || email.is_empty() || input.password.is_empty() {
            return Err(EcommerceError::Validation("Please fill all the fields".into()));
        }
        if self.users.username_or_email_taken(username, email).await? {
            return Err(EcommerceError::Validation("Username or email already registered".into()));
        }
        let password = input.password;
        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| EcommerceError::Internal(e.to_string()))??;
        let user = User::register(username, email, hash);
        self.users.insert_user(&user).await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Returns a signed token and the identity it carries.
    #[instrument(skip(self, input))]
    pub async fn login(&self, input: LoginInput) -> Result<(String, Identity)> {
        if input.email.trim().is_empty() || input.password.is_empty() {
            return Err(EcommerceError::Validation("Please fill all the fields".into()));
        }
        let user = self.users.find_user_by_email(input.email.trim()).await?
            .ok_or_else(|| EcommerceError::Validation(INVALID_CREDENTIALS.into()))?;
        let (password, hash) = (input.password, user.password_hash.clone());
        let matched = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| EcommerceError::Internal(e.to_string()))?;
        if !matched { return Err(EcommerceError::Validation(INVALID_CREDENTIALS.into())); }
        Ok((self.issue(&user)?, Identity::from(&user)))
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id, role: user.role, email: user.email.clone(), username: user.username.clone(),
            iat: now, exp: now + self.ttl.as_secs() as i64,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| EcommerceError::Internal(format!("token signing failed: {e}")))
    }

    pub fn decode(&self, token: &str) -> Result<Claims> {
        let data = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_bytes()), &Validation::default())?;
        Ok(data.claims)
    }

    /// Resolves a token to the stored user it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self.decode(token)?;
        self.users.find_user(claims.sub).await?
            .ok_or_else(|| EcommerceError::Unauthorized("Unauthorized user! Account no longer exists".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn service() -> AuthService { AuthService::new(Arc::new(MemoryStore::new()), &AppConfig::for_tests()) }

    fn register_input(username: &str, email: &str) -> RegisterInput {
        RegisterInput { username: username.into(), email: email.into(), password: "hunter22".into() }
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let auth = service();
        let user = auth.register(register_input("ann", "Ann@Example.com")).await.unwrap();
        assert_eq!(user.email, "ann@example.com");
        assert_ne!(user.password_hash, "hunter22");

        let (token, identity) = auth.login(LoginInput { email: "ann@example.com".into(), password: "hunter22".into() }).await.unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(auth.authenticate(&token).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_case_insensitive() {
        let auth = service();
        auth.register(register_input("ann", "ann@example.com")).await.unwrap();
        let err = auth.register(register_input("ANN", "other@example.com")).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let auth = service();
        auth.register(register_input("ann", "ann@example.com")).await.unwrap();
        let err = auth.login(LoginInput { email: "ann@example.com".into(), password: "nope".into() }).await.unwrap_err();
        assert_eq!(err.to_string(), INVALID_CREDENTIALS);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let auth = service();
        let user = User::register("ann", "ann@example.com", "x".into());
        let token = auth.issue(&user).unwrap();
        assert_eq!(auth.decode(&token).unwrap().sub, user.id);
        assert!(matches!(auth.decode(&format!("{token}x")), Err(EcommerceError::Unauthorized(_))));
    }
}
