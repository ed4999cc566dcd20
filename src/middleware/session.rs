use axum::{extract::Request, middleware::Next, response::Response};

pub const SESSION_ID_HEADER: &str = "x-session-id";
pub const ANONYMOUS_SESSION: &str = "anonymous";

const MAX_SESSION_ID_LEN: usize = 64;

/// Session that per-user state is keyed by
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    /// Parses the `x-session-id` header value
    ///
    /// Missing or unusable values map to the anonymous session. Only ASCII
    /// alphanumerics, `-` and `_` are kept so the id is safe inside store keys.
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= MAX_SESSION_ID_LEN)
            .filter(|v| v.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'))
            .map(|v| Self(v.to_string()))
            .unwrap_or_else(Self::anonymous)
    }

    pub fn anonymous() -> Self {
        Self(ANONYMOUS_SESSION.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub async fn session_id_middleware(mut request: Request, next: Next) -> Response {
    let session = SessionId::from_header(
        request
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|h| h.to_str().ok()),
    );
    request.extensions_mut().insert(session);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_header_is_anonymous() {
        assert_eq!(SessionId::from_header(None), SessionId::anonymous());
        assert_eq!(SessionId::from_header(Some("   ")).as_str(), "anonymous");
    }

    #[test]
    fn test_valid_header_kept() {
        assert_eq!(SessionId::from_header(Some("user_42-a")).as_str(), "user_42-a");
    }

    #[test]
    fn test_unsafe_header_rejected() {
        assert_eq!(SessionId::from_header(Some("a:b")).as_str(), "anonymous");
        assert_eq!(SessionId::from_header(Some(&"s".repeat(65))).as_str(), "anonymous");
    }
}
