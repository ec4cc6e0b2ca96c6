use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::handler::AppState;
use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};

/// Identity-provider session claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
}

/// Verifies bearer tokens issued by the identity provider
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let (key, algorithm) = if config.jwt_key.contains("BEGIN PUBLIC KEY") {
            let key = DecodingKey::from_rsa_pem(config.jwt_key.as_bytes())
                .map_err(|e| AppError::Config(format!("Invalid CLERK_JWT_PUBLIC_KEY: {}", e)))?;
            (key, Algorithm::RS256)
        } else {
            (DecodingKey::from_secret(config.jwt_key.as_bytes()), Algorithm::HS256)
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self { key, validation })
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("Token verification failed: {}", e);
            AppError::Unauthorized("Invalid token".to_string())
        })?;

        if data.claims.sub.is_empty() {
            return Err(AppError::Unauthorized("Invalid token payload".to_string()));
        }
        Ok(data.claims)
    }
}

/// Authenticated caller; the id is trusted as-is by the payment services
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Invalid token format".to_string()))?;

        let claims = state.auth.verify(token)?;

        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}
