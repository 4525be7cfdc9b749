use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::error::AppError;

/// Authenticated subject resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Token part of a `Bearer <token>` header value.
fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            debug!("missing Authorization header");
            return Err(AppError::Auth("Unauthorized".into()));
        };

        let Some(token) = bearer_token(header) else {
            debug!("invalid auth scheme");
            return Err(AppError::Auth("Unauthorized".into()));
        };

        let keys = Arc::<JwtKeys>::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            AppError::Auth("Invalid or expired token".into())
        })?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use time::{Duration, OffsetDateTime};

    use crate::state::AppState;

    async fn gate(state: &AppState, header: Option<&str>) -> Result<AuthUser, AppError> {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic dXNlcjpwdw=="), None);
        assert_eq!(bearer_token("abc.def.ghi"), None);
    }

    #[tokio::test]
    async fn valid_token_resolves_subject() {
        let state = AppState::fake();
        let id = Uuid::new_v4();
        let token = state.jwt.sign(id, "alice@example.com").unwrap();

        let user = gate(&state, Some(&format!("Bearer {token}"))).await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn every_rejection_is_unauthorized() {
        let state = AppState::fake();
        let token = state.jwt.sign(Uuid::new_v4(), "a@b.io").unwrap();
        let expired = state
            .jwt
            .sign_at(
                Uuid::new_v4(),
                "a@b.io",
                OffsetDateTime::now_utc() - Duration::days(30),
            )
            .unwrap();

        let cases = [
            None,
            Some(token.clone()),                 // no scheme
            Some(format!("Token {token}")),      // wrong scheme
            Some("Bearer nonsense".to_string()), // not a jwt
            Some(format!("Bearer {expired}")),
        ];
        for header in cases {
            let err = gate(&state, header.as_deref()).await.unwrap_err();
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{header:?}");
        }
    }
}
