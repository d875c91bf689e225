//! Middleware de autenticación JWT
//!
//! Sin header `Authorization` la request sigue sin actor y la política
//! responde 401 en la operación. Un token presente pero inválido se rechaza
//! aquí mismo.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{
    models::Actor,
    state::AppState,
    utils::{
        errors::AppError,
        jwt::{extract_token_from_header, verify_token},
    },
};

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::Unauthenticated("Malformed Authorization header".to_string()))
        })
        .transpose()?;

    if let Some(auth_header) = auth_header {
        let token = extract_token_from_header(auth_header)?;
        let actor = verify_token(token, &state.config.jwt_secret)?.into_actor()?;
        debug!("🔐 {} autenticado como {}", actor.user_id(), actor.role().as_str());
        request.extensions_mut().insert(actor);
    }

    Ok(next.run(request).await)
}

/// Actor de la request, si lo hay
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentActor(pub Option<Actor>);

impl CurrentActor {
    pub fn get(&self) -> Option<&Actor> {
        self.0.as_ref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentActor(parts.extensions.get::<Actor>().copied()))
    }
}
