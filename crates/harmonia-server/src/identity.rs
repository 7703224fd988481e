//! Request identity.
//!
//! Authentication happens upstream: a gateway validates the session and
//! forwards the login in `x-user` and the role in `x-role`. This module only
//! performs the capability check — it never sees credentials.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Client,
}

impl Role {
    fn parse(value: &str) -> Option<Role> {
        if value.eq_ignore_ascii_case("admin") {
            Some(Role::Admin)
        } else if value.eq_ignore_ascii_case("client") {
            Some(Role::Client)
        } else {
            None
        }
    }
}

/// Extension type to access the authenticated principal in handlers
#[derive(Clone, Debug)]
pub struct Identity {
    pub login: String,
    pub role: Role,
}

fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let login = headers.get("x-user")?.to_str().ok()?.trim();
    if login.is_empty() {
        return None;
    }
    let role = match headers.get("x-role") {
        Some(value) => Role::parse(value.to_str().ok()?)?,
        None => Role::Client,
    };
    Some(Identity {
        login: login.to_owned(),
        role,
    })
}

/// Middleware: require an authenticated principal of any role
pub async fn require_user(mut request: Request, next: Next) -> Response {
    match identity_from_headers(request.headers()) {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Missing or invalid identity headers" })),
        )
            .into_response(),
    }
}

/// Middleware: require the admin role
pub async fn require_admin(mut request: Request, next: Next) -> Response {
    match identity_from_headers(request.headers()) {
        Some(identity) if identity.role == Role::Admin => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Some(_) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Admin access required" })),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Missing or invalid identity headers" })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("Admin"), Some(Role::Admin));
        assert_eq!(Role::parse("client"), Some(Role::Client));
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_identity_from_headers() {
        let id = identity_from_headers(&headers(&[("x-user", "alice"), ("x-role", "admin")]))
            .unwrap();
        assert_eq!(id.login, "alice");
        assert_eq!(id.role, Role::Admin);
    }

    #[test]
    fn test_role_defaults_to_client() {
        let id = identity_from_headers(&headers(&[("x-user", "bob")])).unwrap();
        assert_eq!(id.role, Role::Client);
    }

    #[test]
    fn test_missing_or_blank_user_is_rejected() {
        assert!(identity_from_headers(&headers(&[])).is_none());
        assert!(identity_from_headers(&headers(&[("x-user", "  ")])).is_none());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(identity_from_headers(&headers(&[("x-user", "alice"), ("x-role", "root")]))
            .is_none());
    }
}
