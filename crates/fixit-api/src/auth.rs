use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

/// Token from an `Authorization: Bearer <token>` header, if any
///
/// Never rejects; a missing token is reported by the tracker as
/// unauthenticated so that every endpoint answers the same way.
#[derive(Debug, Clone, Default)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token);
        Ok(Self(token))
    }
}

/// Token part of an Authorization header value. The scheme name is
/// case-insensitive.
fn bearer_token(value: &str) -> Option<String> {
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_scheme_any_case() {
        assert_eq!(bearer_token("Bearer fxs_abc"), Some("fxs_abc".to_string()));
        assert_eq!(bearer_token("bearer fxs_abc"), Some("fxs_abc".to_string()));
        assert_eq!(bearer_token("BEARER   fxs_abc "), Some("fxs_abc".to_string()));
    }

    #[test]
    fn test_bearer_rejects_other_schemes() {
        assert_eq!(bearer_token("Basic dXNlcjpwdw=="), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Bearerfxs_abc"), None);
        assert_eq!(bearer_token(""), None);
    }
}
