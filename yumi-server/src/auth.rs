//! Identity provider clients
//!
//! A bearer token is resolved to an external subject id. The subject maps to
//! a local user through `usuarios.external_id`.

use async_trait::async_trait;
use serde::Deserialize;

/// Authentication failure
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,

    #[error("invalid or expired token")]
    Invalid,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Resolves bearer tokens to subject ids
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The external subject the token was issued to.
    async fn subject(&self, token: &str) -> Result<String, AuthError>;
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::Missing)?;
    let (scheme, token) = value.trim().split_once(' ').ok_or(AuthError::Missing)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Missing);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Missing);
    }
    Ok(token)
}

#[derive(Deserialize)]
struct UserInfo {
    sub: Option<String>,
}

/// OpenID userinfo endpoint client
pub struct UserInfoProvider {
    client: reqwest::Client,
    url: String,
}

impl UserInfoProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for UserInfoProvider {
    async fn subject(&self, token: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AuthError::Invalid);
        }
        if !status.is_success() {
            tracing::warn!(%status, "identity provider rejected userinfo request");
            return Err(AuthError::Unavailable(format!("userinfo returned {status}")));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        info.sub
            .filter(|sub| !sub.is_empty())
            .ok_or(AuthError::Invalid)
    }
}

/// Development provider: the token itself is the subject.
///
/// Only used when no identity provider URL is configured.
pub struct TrustedTokenProvider;

#[async_trait]
impl IdentityProvider for TrustedTokenProvider {
    async fn subject(&self, token: &str) -> Result<String, AuthError> {
        let subject = token.trim();
        if subject.is_empty() {
            return Err(AuthError::Invalid);
        }
        Ok(subject.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(Some("bearer   abc ")).unwrap(), "abc");
        assert!(matches!(bearer_token(None), Err(AuthError::Missing)));
        assert!(matches!(bearer_token(Some("Basic abc")), Err(AuthError::Missing)));
        assert!(matches!(bearer_token(Some("Bearer ")), Err(AuthError::Missing)));
    }

    #[tokio::test]
    async fn trusted_provider_echoes_token() {
        let subject = TrustedTokenProvider.subject("user_123").await.unwrap();
        assert_eq!(subject, "user_123");
        assert!(TrustedTokenProvider.subject("  ").await.is_err());
    }

    #[tokio::test]
    async fn userinfo_returns_subject() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sub": "user_42"})))
            .mount(&server)
            .await;

        let provider = UserInfoProvider::new(format!("{}/userinfo", server.uri()));
        assert_eq!(provider.subject("good-token").await.unwrap(), "user_42");
    }

    #[tokio::test]
    async fn userinfo_unauthorized_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = UserInfoProvider::new(format!("{}/userinfo", server.uri()));
        assert!(matches!(provider.subject("bad").await, Err(AuthError::Invalid)));
    }

    #[tokio::test]
    async fn userinfo_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = UserInfoProvider::new(format!("{}/userinfo", server.uri()));
        assert!(matches!(
            provider.subject("any").await,
            Err(AuthError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn userinfo_without_subject_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"email": "a@b.co"})))
            .mount(&server)
            .await;

        let provider = UserInfoProvider::new(server.uri());
        assert!(matches!(provider.subject("any").await, Err(AuthError::Invalid)));
    }
}
