use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use color_eyre::eyre::eyre;
use pantry::{models::User, Actor};

use crate::AppState;

use super::{errors::ServerError, trace::USER_ID_FIELD};

const SCHEME: &str = "Token ";

/// An authenticated caller. Rejects with 401 when no valid token is sent.
pub(crate) struct CurrentUser(pub Actor);

/// The caller if a token was sent. Anonymous requests get `None`, an unknown
/// token is still a 401.
pub(crate) struct MaybeUser(pub Option<User>);

fn unauthorized(message: &'static str) -> ServerError {
    ServerError(eyre!(message), StatusCode::UNAUTHORIZED)
}

fn token(parts: &Parts) -> Result<Option<&str>, ServerError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(SCHEME))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized("Invalid Authorization header, expected `Token <key>`"))?;

    Ok(Some(token))
}

async fn user_from_parts(parts: &Parts, state: &AppState) -> Result<Option<User>, ServerError> {
    let Some(token) = token(parts)? else {
        return Ok(None);
    };

    let user = state
        .store
        .user_by_token(token)
        .await?
        .ok_or_else(|| unauthorized("Invalid token"))?;
    tracing::Span::current().record(USER_ID_FIELD, tracing::field::display(user.user_id));

    Ok(Some(user))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = user_from_parts(parts, state)
            .await?
            .ok_or_else(|| unauthorized("Authentication credentials were not provided"))?;

        Ok(Self(Actor::new(user)))
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(user_from_parts(parts, state).await?))
    }
}

impl MaybeUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}
