use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use tracing::{debug, warn};

use crate::AppState;
use crate::envelope::ApiError;

/// The single username/password pair the service accepts.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username.as_bytes() == username.as_bytes()
            && self.password.as_bytes() == password.as_bytes()
    }

    /// True when `headers` carry a basic-auth pair equal to this one.
    pub fn authenticate(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(decode_basic)
            .is_some_and(|(user, pass)| self.matches(&user, &pass))
    }
}

/// Decodes `Basic <base64(user:pass)>`. Any malformation yields `None`.
pub fn decode_basic(header: &str) -> Option<(String, String)> {
    let mut parts = header.split(' ');
    let (scheme, encoded) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Rejects every non-OPTIONS request without valid credentials.
pub async fn auth_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }

    if state.credentials.authenticate(req.headers()) {
        debug!(path = %req.uri().path(), "Request authenticated");
        next.run(req).await
    } else {
        warn!(method = %req.method(), path = %req.uri().path(), "Rejected unauthenticated request");
        state.metrics.inc_auth_failure();
        ApiError::Unauthenticated.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn header(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(raw).unwrap());
        headers
    }

    fn basic(user_pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(user_pass))
    }

    #[test]
    fn decodes_well_formed_header() {
        assert_eq!(
            decode_basic(&basic("admin:password123")),
            Some(("admin".to_string(), "password123".to_string()))
        );
        // Scheme is case-insensitive; the password may itself contain ':'.
        assert_eq!(
            decode_basic(&format!("basic {}", STANDARD.encode("admin:a:b"))),
            Some(("admin".to_string(), "a:b".to_string()))
        );
    }

    #[test]
    fn malformed_headers_decode_to_nothing() {
        assert_eq!(decode_basic("Bearer abc"), None);
        assert_eq!(decode_basic("Basic"), None);
        assert_eq!(decode_basic("Basic !!!not-base64"), None);
        assert_eq!(decode_basic(&basic("no-separator")), None);
        assert_eq!(decode_basic(&format!("{} extra", basic("admin:pw"))), None);
    }

    #[test]
    fn authenticate_compares_both_parts() {
        let creds = Credentials::new("admin", "password123");
        assert!(creds.authenticate(&header(&basic("admin:password123"))));
        assert!(!creds.authenticate(&header(&basic("admin:wrongpass"))));
        assert!(!creds.authenticate(&header(&basic("Admin:password123"))));
        assert!(!creds.authenticate(&HeaderMap::new()));
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials::new("admin", "password123");
        assert!(!format!("{creds:?}").contains("password123"));
    }
}
