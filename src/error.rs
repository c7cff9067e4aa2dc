//! Request-level errors and their iControl-shaped responses

use axum::extract::rejection::BytesRejection;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Endpoints advertised when a request matches no route
pub const AVAILABLE_ENDPOINTS: &[&str] = &[
    "GET /",
    "POST /mgmt/shared/authn/login",
    "GET /mgmt/shared/authz/tokens/{id}",
    "GET /mgmt/tm/sys",
    "GET /mgmt/tm/sys/global-settings",
    "GET /mgmt/tm/ltm/pool",
    "POST /mgmt/tm/ltm/pool",
    "GET /mgmt/tm/ltm/pool/{id}",
    "PUT/PATCH /mgmt/tm/ltm/pool/{id}",
    "DELETE /mgmt/tm/ltm/pool/{id}",
    "GET /mgmt/tm/ltm/pool/{id}/members",
    "POST /mgmt/tm/ltm/pool/{id}/members",
    "GET/PUT/PATCH/DELETE /mgmt/tm/ltm/pool/{id}/members/{member}",
    "GET/POST /mgmt/tm/ltm/virtual",
    "GET/PUT/PATCH/DELETE /mgmt/tm/ltm/virtual/{id}",
];

/// Which collection a lookup missed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Pool,
    Member,
    Virtual,
    Token,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pool => "pool",
            ResourceKind::Member => "member",
            ResourceKind::Virtual => "virtual",
            ResourceKind::Token => "token",
        }
    }
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("empty body")]
    EmptyBody,

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("{} not found", .0.as_str())]
    NotFound(ResourceKind),

    #[error("{}", .0.body_text())]
    BodyRejected(#[from] BytesRejection),

    #[error("Endpoint not found")]
    UnmatchedRoute { method: Method, path: String },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SimError {
    pub fn status(&self) -> StatusCode {
        match self {
            SimError::EmptyBody | SimError::MissingField(_) => StatusCode::BAD_REQUEST,
            SimError::InvalidCredentials
            | SimError::InvalidToken
            | SimError::TokenExpired
            | SimError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            SimError::NotFound(_) | SimError::UnmatchedRoute { .. } => StatusCode::NOT_FOUND,
            SimError::BodyRejected(rejection) => rejection.status(),
            SimError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SimError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        let body = match &self {
            SimError::UnmatchedRoute { method, path } => json!({
                "code": status.as_u16(),
                "message": message,
                "method": method.as_str(),
                "path": path,
                "available_endpoints": AVAILABLE_ENDPOINTS,
            }),
            SimError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                json!({
                    "code": status.as_u16(),
                    "message": "Internal server error",
                    "detail": format!("{:#}", e),
                    "errorStack": [],
                })
            }
            _ => json!({
                "code": status.as_u16(),
                "message": message,
                "errorStack": [],
            }),
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(SimError::MissingField("name").status(), StatusCode::BAD_REQUEST);
        assert_eq!(SimError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            SimError::NotFound(ResourceKind::Pool).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SimError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(SimError::NotFound(ResourceKind::Member).to_string(), "member not found");
        assert_eq!(SimError::MissingField("name").to_string(), "missing name");
    }

    #[test]
    fn test_unauthorized_advertises_basic() {
        for err in [
            SimError::InvalidCredentials,
            SimError::InvalidToken,
            SimError::TokenExpired,
            SimError::AuthenticationFailed,
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Basic");
        }
    }

    #[test]
    fn test_not_found_has_no_auth_header() {
        let response = SimError::NotFound(ResourceKind::Virtual).into_response();
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
