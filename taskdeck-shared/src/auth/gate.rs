/// Session gate
///
/// Every inbound request passes through the gate before it reaches a route.
/// The gate decides whether the path is public, pulls the bearer credential
/// out of the request, and verifies it with the token codec. A request either
/// goes forward with an [`AuthContext`] attached or is rejected; there is no
/// third outcome and no state carried between requests.
///
/// # Credential Sources
///
/// 1. `authToken` cookie (primary, set by the login route)
/// 2. `Authorization: Bearer <token>` header
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use taskdeck_shared::auth::gate::{classify, AuthGate, RouteAccess, RouteKind};
/// use taskdeck_shared::auth::jwt::{create_token, Claims};
/// use uuid::Uuid;
///
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let gate = AuthGate::new(secret);
///
/// assert_eq!(classify("/api/login"), RouteAccess::Public);
/// assert_eq!(classify("/api/tasks"), RouteAccess::Protected(RouteKind::Api));
///
/// let token = create_token(&Claims::new(Uuid::new_v4(), "a@x.com"), secret).unwrap();
/// let mut headers = HeaderMap::new();
/// headers.insert(
///     header::COOKIE,
///     HeaderValue::from_str(&format!("authToken={}", token)).unwrap(),
/// );
///
/// assert_eq!(gate.require(&headers).unwrap().email, "a@x.com");
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_token, Claims, JwtError};

/// Name of the cookie carrying the session token
pub const AUTH_COOKIE: &str = "authToken";

/// Paths reachable without a credential
///
/// Entries ending in `/` match any path below them; other entries match the
/// path itself and its sub-paths.
const PUBLIC_PATHS: &[&str] = &[
    "/login",
    "/signup",
    "/api/login",
    "/api/signup",
    "/api/logout",
    "/health",
    "/favicon.ico",
    "/static/",
    "/uploads/",
    "/_next/",
];

/// What kind of client a protected route serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Browser page; rejected requests are redirected to the login page
    Page,

    /// JSON API; rejected requests get `401 Unauthorized`
    Api,
}

/// Result of classifying a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// No credential required
    Public,

    /// Credential required
    Protected(RouteKind),
}

/// Classifies a request path against the static allow-list
pub fn classify(path: &str) -> RouteAccess {
    if PUBLIC_PATHS.iter().any(|prefix| path_matches(path, prefix)) {
        return RouteAccess::Public;
    }

    if path_matches(path, "/api") {
        RouteAccess::Protected(RouteKind::Api)
    } else {
        RouteAccess::Protected(RouteKind::Page)
    }
}

fn path_matches(path: &str, prefix: &str) -> bool {
    if prefix.ends_with('/') {
        return path.starts_with(prefix);
    }

    path.strip_prefix(prefix)
        .map_or(false, |rest| rest.is_empty() || rest.starts_with('/'))
}

/// Extracts the bearer credential from request headers
///
/// The `authToken` cookie wins over the `Authorization` header. Empty values
/// are treated as absent.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    cookie_token(headers).or_else(|| bearer_token(headers))
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Builds the `Set-Cookie` value that stores a session token
pub fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        AUTH_COOKIE, token, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds the `Set-Cookie` value that clears the session cookie
pub fn cleared_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Why the gate refused a request
#[derive(Debug, thiserror::Error)]
pub enum GateRejection {
    /// No cookie and no bearer header
    #[error("Missing credentials")]
    MissingCredentials,

    /// Credential present but it failed verification
    #[error("Invalid or expired token")]
    InvalidToken(#[source] JwtError),
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": "unauthorized",
            "message": self.to_string(),
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Authenticated identity attached to a request by the gate
///
/// Handlers take it as an extractor. If the gate did not attach one the
/// extractor itself rejects with `401`, so a handler never runs without an
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID (token subject)
    pub user_id: Uuid,

    /// Email carried in the token
    pub email: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(GateRejection::MissingCredentials)
    }
}

/// The single authentication checkpoint
#[derive(Clone)]
pub struct AuthGate {
    secret: String,
}

impl AuthGate {
    /// Creates a gate verifying tokens with `secret`
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Requires a valid credential in `headers`
    ///
    /// # Errors
    ///
    /// - `MissingCredentials` when neither cookie nor bearer header is present
    /// - `InvalidToken` when verification fails for any reason
    pub fn require(&self, headers: &HeaderMap) -> Result<Claims, GateRejection> {
        let token = extract_credential(headers).ok_or(GateRejection::MissingCredentials)?;

        validate_token(&token, &self.secret).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            GateRejection::InvalidToken(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::create_token;
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_classify_public_paths() {
        for path in [
            "/login",
            "/login/reset",
            "/signup",
            "/api/login",
            "/api/signup",
            "/api/logout",
            "/health",
            "/static/app.js",
            "/uploads/avatar.png",
            "/_next/chunk.js",
            "/favicon.ico",
        ] {
            assert_eq!(classify(path), RouteAccess::Public, "{} should be public", path);
        }
    }

    #[test]
    fn test_classify_protected_paths() {
        assert_eq!(classify("/api/tasks"), RouteAccess::Protected(RouteKind::Api));
        assert_eq!(classify("/api/verifytoken"), RouteAccess::Protected(RouteKind::Api));
        assert_eq!(classify("/api"), RouteAccess::Protected(RouteKind::Api));
        assert_eq!(classify("/"), RouteAccess::Protected(RouteKind::Page));
        assert_eq!(classify("/profile"), RouteAccess::Protected(RouteKind::Page));
        assert_eq!(classify("/taskgroups"), RouteAccess::Protected(RouteKind::Page));
    }

    #[test]
    fn test_classify_does_not_match_partial_segments() {
        assert_eq!(classify("/loginx"), RouteAccess::Protected(RouteKind::Page));
        assert_eq!(classify("/apiary"), RouteAccess::Protected(RouteKind::Page));
        assert_eq!(classify("/api/login-history"), RouteAccess::Protected(RouteKind::Api));
    }

    #[test]
    fn test_extract_credential_from_cookie() {
        let headers = headers_with(header::COOKIE, "theme=dark; authToken=abc.def.ghi; lang=en");
        assert_eq!(extract_credential(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_credential_from_bearer() {
        let headers = headers_with(header::AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(extract_credential(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        for value in ["bearer abc.def.ghi", "BEARER abc.def.ghi", "BeArEr  abc.def.ghi"] {
            let headers = headers_with(header::AUTHORIZATION, value);
            assert_eq!(extract_credential(&headers).as_deref(), Some("abc.def.ghi"));
        }
        assert!(extract_credential(&headers_with(header::AUTHORIZATION, "Bearerabc")).is_none());
    }

    #[test]
    fn test_cookie_wins_over_header() {
        let mut headers = headers_with(header::COOKIE, "authToken=from-cookie");
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_credential(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_empty_credentials_are_missing() {
        assert!(extract_credential(&HeaderMap::new()).is_none());
        assert!(extract_credential(&headers_with(header::COOKIE, "authToken=")).is_none());
        assert!(extract_credential(&headers_with(header::AUTHORIZATION, "Bearer ")).is_none());
        assert!(extract_credential(&headers_with(header::AUTHORIZATION, "Basic abc")).is_none());
    }

    #[test]
    fn test_require_valid_token() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, "a@x.com"), SECRET).unwrap();
        let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", token));

        let claims = AuthGate::new(SECRET).require(&headers).unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn test_require_rejects_missing_and_invalid() {
        let gate = AuthGate::new(SECRET);

        assert!(matches!(
            gate.require(&HeaderMap::new()),
            Err(GateRejection::MissingCredentials)
        ));

        let expired = Claims::with_expiration(Uuid::new_v4(), "a@x.com", Duration::seconds(-60));
        let token = create_token(&expired, SECRET).unwrap();
        let headers = headers_with(header::COOKIE, &format!("authToken={}", token));
        assert!(matches!(
            gate.require(&headers),
            Err(GateRejection::InvalidToken(JwtError::Expired))
        ));

        let headers = headers_with(header::COOKIE, "authToken=garbage");
        assert!(matches!(gate.require(&headers), Err(GateRejection::InvalidToken(_))));
    }

    #[test]
    fn test_session_cookie_format() {
        let cookie = session_cookie("tok", 3600, false);
        assert_eq!(cookie, "authToken=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600");

        let secure = session_cookie("tok", 3600, true);
        assert!(secure.ends_with("; Secure"));

        let cleared = cleared_session_cookie(false);
        assert!(cleared.starts_with("authToken=;"));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[test]
    fn test_rejection_into_response() {
        let response = GateRejection::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
