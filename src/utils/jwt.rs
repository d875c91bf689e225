//! Utilidades JWT
//!
//! Los tokens llevan el rol y, para conductores y clientes, el id del
//! registro propio. De ahí sale el `Actor` que consume la política.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::auth::{Actor, UserRole};
use crate::utils::errors::{AppError, AppResult};

/// Claims del JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid, // user_id
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,
    pub exp: usize,
    pub iat: usize,
}

impl JwtClaims {
    pub fn for_actor(actor: &Actor, ttl: Duration) -> Self {
        let now = Utc::now();
        let (driver_id, customer_id) = match actor {
            Actor::Manager { .. } => (None, None),
            Actor::Driver { driver_id, .. } => (Some(*driver_id), None),
            Actor::Customer { customer_id, .. } => (None, Some(*customer_id)),
        };
        Self {
            sub: actor.user_id(),
            role: actor.role().as_str().to_string(),
            driver_id,
            customer_id,
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        }
    }

    /// Un rol sin su registro vinculado no es un actor válido
    pub fn into_actor(self) -> AppResult<Actor> {
        let role = UserRole::from_str(&self.role)
            .ok_or_else(|| AppError::Unauthenticated(format!("Unknown role '{}'", self.role)))?;

        match role {
            UserRole::Manager => Ok(Actor::Manager { user_id: self.sub }),
            UserRole::Driver => self
                .driver_id
                .map(|driver_id| Actor::Driver { user_id: self.sub, driver_id })
                .ok_or_else(|| AppError::Unauthenticated("Token has no driver profile".to_string())),
            UserRole::Customer => self
                .customer_id
                .map(|customer_id| Actor::Customer { user_id: self.sub, customer_id })
                .ok_or_else(|| AppError::Unauthenticated("Token has no customer profile".to_string())),
        }
    }
}

/// Generar JWT token para un actor
pub fn generate_token(actor: &Actor, secret: &str, ttl: Duration) -> AppResult<String> {
    let claims = JwtClaims::for_actor(actor, ttl);
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::Internal(format!("Error generando token: {}", e)))
}

/// Verificar y decodificar JWT token
pub fn verify_token(token: &str, secret: &str) -> AppResult<JwtClaims> {
    decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthenticated(format!("Invalid token: {}", e)))
}

/// Extraer token del header Authorization
pub fn extract_token_from_header(auth_header: &str) -> AppResult<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthenticated("Expected 'Bearer <token>'".to_string()))
}
