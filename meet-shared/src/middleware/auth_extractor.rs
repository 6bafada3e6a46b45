use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::errors::AppError;
use crate::types::auth::{AuthUser, Claims};

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_header(&parts.headers)?;
        let claims = decode_jwt(&token)?;

        if claims.is_expired() {
            return Err(AppError::unauthorized("token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_header(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::unauthorized("missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("invalid authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::unauthorized("authorization header must use Bearer scheme"))
}

/// Shared by the `Authorization: Bearer` extractor above and by the
/// WebSocket subprotocol handshake, which carries the same token a
/// different way since browsers cannot set arbitrary headers on upgrade.
pub fn decode_jwt(token: &str) -> Result<Claims, AppError> {
    let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "development-secret-change-in-production".to_string());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| AppError::unauthorized(format!("invalid token: {e}")))?;

    Ok(token_data.claims)
}
