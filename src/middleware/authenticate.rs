use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;

use crate::auth::token::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// Verified claims for the current request, inserted into request
/// extensions by [`authenticate`]. Proves authenticity only; authorization
/// is the guard's job.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| ApiError::invalid_credentials("Authentication required"))
    }
}

/// Token-verification middleware for the protected routers. Rejections are
/// 401 with distinct codes so clients can tell a missing credential from an
/// expired or revoked one.
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(
        request.headers(),
        &jar,
        &state.config.session.cookie_name,
        state.config.session.prefer_cookie,
    )?;

    let claims = state.codec.verify(&token)?;
    request.extensions_mut().insert(AuthContext { claims });

    Ok(next.run(request).await)
}

/// Pulls the access token from `Authorization: Bearer` or the session
/// cookie. The header wins by default; `AUTH_PREFER_COOKIE=true` flips the
/// precedence for deployments that treat the cookie as canonical.
fn extract_token(
    headers: &HeaderMap,
    jar: &CookieJar,
    cookie_name: &str,
    prefer_cookie: bool,
) -> Result<String, ApiError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let cookie = jar
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty());

    let token = if prefer_cookie {
        cookie.or(bearer)
    } else {
        bearer.or(cookie)
    };

    token.ok_or_else(|| ApiError::invalid_credentials("Missing bearer token or session cookie"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum_extra::extract::cookie::Cookie;

    const COOKIE: &str = "prism_session";

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    fn jar_with_session(token: &str) -> CookieJar {
        CookieJar::new().add(Cookie::new(COOKIE, token.to_string()))
    }

    #[test]
    fn bearer_header_alone_is_used() {
        let token =
            extract_token(&headers_with_bearer("abc"), &CookieJar::new(), COOKIE, false).unwrap();
        assert_eq!(token, "abc");
    }

    #[test]
    fn cookie_alone_is_used() {
        let token =
            extract_token(&HeaderMap::new(), &jar_with_session("xyz"), COOKIE, false).unwrap();
        assert_eq!(token, "xyz");
    }

    #[test]
    fn header_wins_by_default() {
        let token = extract_token(
            &headers_with_bearer("from-header"),
            &jar_with_session("from-cookie"),
            COOKIE,
            false,
        )
        .unwrap();
        assert_eq!(token, "from-header");
    }

    #[test]
    fn cookie_wins_when_preferred() {
        let token = extract_token(
            &headers_with_bearer("from-header"),
            &jar_with_session("from-cookie"),
            COOKIE,
            true,
        )
        .unwrap();
        assert_eq!(token, "from-cookie");
    }

    #[test]
    fn non_bearer_scheme_falls_through_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );

        let token = extract_token(&headers, &jar_with_session("xyz"), COOKIE, false).unwrap();
        assert_eq!(token, "xyz");
    }

    #[test]
    fn empty_bearer_value_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));

        let err = extract_token(&headers, &CookieJar::new(), COOKIE, false).unwrap_err();
        assert_eq!(err.error_code(), "invalid_credentials");
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn nothing_at_all_is_invalid_credentials() {
        let err = extract_token(&HeaderMap::new(), &CookieJar::new(), COOKIE, false).unwrap_err();
        assert_eq!(err.error_code(), "invalid_credentials");
    }
}
