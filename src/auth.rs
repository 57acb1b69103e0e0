/*!
 * Authentication for the back-office API.
 *
 * Issues and validates HS256 JWTs. Every `/api/v1` route except the
 * status and health probes requires a bearer token; the middleware
 * validates it and stashes the resulting [`AuthUser`] in the request
 * extensions for handlers to extract.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,          // Subject (user ID)
    pub name: Option<String>, // User's display name
    pub roles: Vec<String>,   // User's roles
    pub jti: String,          // JWT ID (unique identifier for this token)
    pub iat: i64,             // Issued at time
    pub exp: i64,             // Expiration time
    pub nbf: i64,             // Not valid before time
    pub iss: String,          // Issuer
    pub aud: String,          // Audience
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the user is an admin
    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Failed to create token: {0}")]
    TokenCreation(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::TokenCreation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            jwt_issuer: "retail-pos-api".to_string(),
            jwt_audience: "retail-pos-backoffice".to_string(),
            token_expiration,
        }
    }
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issue a signed access token for a user
    pub fn generate_token(
        &self,
        user_id: Uuid,
        name: Option<String>,
        roles: Vec<String>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            name,
            roles,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.clone()]);
        validation.set_issuer(&[self.config.jwt_issuer.clone()]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        Ok(claims)
    }
}

/// Extract authentication info from request headers
fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_value) = auth_header.to_str() {
            if auth_value.starts_with("Bearer ") {
                let token = auth_value.trim_start_matches("Bearer ").trim();
                let claims = auth_service.validate_token(token)?;

                return Ok(AuthUser {
                    user_id: claims.sub,
                    name: claims.name,
                    roles: claims.roles,
                    token_id: claims.jti,
                });
            }
        }
    }

    Err(AuthError::MissingAuth)
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let headers = request.headers().clone();

    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    match extract_auth_from_headers(&headers, &auth_service) {
        Ok(user) => {
            debug!(user_id = %user.user_id, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "unit_test_secret_that_is_long_enough_for_hs256".into(),
            Duration::from_secs(3600),
        ))
    }

    #[test]
    fn round_trips_claims() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let token = svc
            .generate_token(user_id, Some("Alice".into()), vec!["admin".into()])
            .unwrap();

        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.roles, vec!["admin".to_string()]);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let other = AuthService::new(AuthConfig::new(
            "a_completely_different_secret_also_long_enough".into(),
            Duration::from_secs(3600),
        ));
        let token = other
            .generate_token(Uuid::new_v4(), None, vec![])
            .unwrap();

        assert!(matches!(
            service().validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }
}
