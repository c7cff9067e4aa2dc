//! Request extractors: the authentication gate and lenient JSON bodies

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;

use crate::auth::Presented;
use crate::error::SimError;
use crate::server::state::AppState;
use crate::store::Body;

/// Header carrying a token issued by the login endpoint
pub const AUTH_TOKEN_HEADER: &str = "x-f5-auth-token";

/// Username of a request that passed the authentication gate.
///
/// Checks `X-F5-Auth-Token` first and falls back to basic auth when no
/// token header is present.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = SimError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(token) = auth_token(&parts.headers)? {
            return state.auth.authenticate(Presented::Token(token)).map(AuthenticatedUser);
        }

        match basic_credentials(&parts.headers) {
            Some((username, password)) => state.auth.authenticate(Presented::Basic {
                username: &username,
                password: &password,
            }),
            None => state.auth.authenticate(Presented::Anonymous),
        }
        .map(AuthenticatedUser)
    }
}

fn auth_token(headers: &HeaderMap) -> Result<Option<&str>, SimError> {
    match headers.get(AUTH_TOKEN_HEADER) {
        None => Ok(None),
        Some(value) => {
            let token = value.to_str().map_err(|_| SimError::InvalidToken)?;
            Ok(Some(token).filter(|t| !t.is_empty()))
        }
    }
}

/// Decode `Authorization: Basic base64(user:pass)`
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// A request body parsed as a JSON object.
///
/// Empty, non-JSON, non-object and `{}` bodies all count as absent.
#[derive(Debug, Clone, Default)]
pub struct JsonBody(pub Option<Body>);

impl JsonBody {
    pub fn parse(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) if !map.is_empty() => JsonBody(Some(map)),
            _ => JsonBody(None),
        }
    }

    /// The body, or `EmptyBody` when absent
    pub fn require(self) -> Result<Body, SimError> {
        self.0.ok_or(SimError::EmptyBody)
    }

    /// The body, or an empty patch when absent
    pub fn or_empty(self) -> Body {
        self.0.unwrap_or_default()
    }
}

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = SimError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await?;
        if !bytes.is_empty() {
            tracing::debug!("Body: {}", String::from_utf8_lossy(&bytes));
        }
        Ok(JsonBody::parse(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::DefaultBodyLimit,
        http::{HeaderValue, StatusCode},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    fn basic_header(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(raw));
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        headers
    }

    #[test]
    fn test_basic_credentials() {
        assert_eq!(
            basic_credentials(&basic_header("admin:f5password")),
            Some(("admin".to_string(), "f5password".to_string()))
        );
        // Passwords may contain colons
        assert_eq!(
            basic_credentials(&basic_header("admin:a:b")),
            Some(("admin".to_string(), "a:b".to_string()))
        );
        assert_eq!(basic_credentials(&basic_header("no-colon")), None);
        assert_eq!(basic_credentials(&HeaderMap::new()), None);
    }

    #[test]
    fn test_non_basic_scheme_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(basic_credentials(&headers), None);
    }

    #[test]
    fn test_empty_token_header_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static(""));
        assert_eq!(auth_token(&headers).unwrap(), None);

        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static("ABC"));
        assert_eq!(auth_token(&headers).unwrap(), Some("ABC"));
    }

    #[test]
    fn test_json_body_parsing() {
        assert!(JsonBody::parse(br#"{"name":"p1"}"#).0.is_some());
        assert!(JsonBody::parse(b"").0.is_none());
        assert!(JsonBody::parse(b"{}").0.is_none());
        assert!(JsonBody::parse(b"[1,2]").0.is_none());
        assert!(JsonBody::parse(b"not json").0.is_none());
        assert!(matches!(JsonBody::parse(b"").require(), Err(SimError::EmptyBody)));
        assert!(JsonBody::parse(b"").or_empty().is_empty());
    }

    #[tokio::test]
    async fn test_body_over_limit_keeps_its_status() {
        let app = Router::new()
            .route("/", post(|body: JsonBody| async move { body.require().map(|_| "ok") }))
            .layer(DefaultBodyLimit::max(16));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(r#"{"name":"far-too-long-for-the-limit"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
