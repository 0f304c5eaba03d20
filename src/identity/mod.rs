//! Identity Verifier.
//!
//! Validates provider-issued bearer id tokens (RS256) against the
//! provider's published JWKS and the configured audience, and drives the
//! authorization-code flow (redirect URL construction plus the code
//! exchange at the token endpoint). Verification never surfaces an error
//! to callers: a token either yields a verified subject or it does not.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::config::OauthConfig;

/// How long a fetched key set is trusted before re-discovery.
const JWKS_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authorization endpoint URL is invalid: {0}")]
    BadEndpoint(#[from] url::ParseError),

    #[error("token response did not include an id token")]
    MissingIdToken,

    #[error("issued id token failed verification")]
    Unverified,
}

/// Claims consumed from a verified id token. Audience, expiry and issuer
/// are enforced by the decoder, not read from here.
#[derive(Debug, Deserialize)]
struct IdClaims {
    sub: String,
    #[serde(default)]
    name: Option<String>,
}

/// Stable identity extracted from a successfully verified token.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub sub: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

struct CachedJwks {
    keys: Vec<Jwk>,
    fetched_at: Instant,
}

/// Successful response from the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenExchange {
    pub id_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Holds the provider configuration, an HTTP client for discovery and
/// code exchange, and the cached key set. Constructed once and injected
/// through application state.
pub struct IdentityVerifier {
    http: reqwest::Client,
    oauth: OauthConfig,
    jwks: RwLock<Option<CachedJwks>>,
}

impl IdentityVerifier {
    pub fn new(oauth: OauthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            oauth,
            jwks: RwLock::new(None),
        }
    }

    /// Verifies a bearer token. Returns None for any failure mode:
    /// malformed token, unknown key, bad signature, expired, wrong
    /// audience or issuer.
    pub async fn verify(&self, token: &str) -> Option<VerifiedIdentity> {
        let header = decode_header(token).ok()?;
        let kid = header.kid?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.oauth.client_id.as_str()]);
        validation.set_issuer(&[self.oauth.issuer.as_str()]);

        match decode::<IdClaims>(token, &key, &validation) {
            Ok(data) => Some(VerifiedIdentity {
                sub: data.claims.sub,
                name: data.claims.name,
            }),
            Err(e) => {
                debug!("id token rejected: {}", e);
                None
            }
        }
    }

    /// Builds the provider authorization URL the login flow redirects to.
    pub fn authorization_url(&self, redirect_uri: &str) -> Result<String, IdentityError> {
        let mut url = Url::parse(&self.oauth.auth_endpoint)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.oauth.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.oauth.scope)
            .append_pair("access_type", "offline")
            .append_pair("include_granted_scopes", "true");
        Ok(url.into())
    }

    /// Exchanges an authorization code for tokens and verifies the issued
    /// id token before handing back the identity.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(VerifiedIdentity, String), IdentityError> {
        let params = [
            ("code", code),
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let exchange: TokenExchange = self
            .http
            .post(&self.oauth.token_endpoint)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let id_token = exchange.id_token.ok_or(IdentityError::MissingIdToken)?;
        let identity = self
            .verify(&id_token)
            .await
            .ok_or(IdentityError::Unverified)?;
        Ok((identity, id_token))
    }

    /// Resolves the decoding key for `kid`, fetching the provider key set
    /// when the cache is cold, stale, or does not know the kid (key
    /// rotation).
    async fn decoding_key(&self, kid: &str) -> Option<DecodingKey> {
        if let Some(key) = self.cached_key(kid).await {
            return Some(key);
        }
        self.refresh_jwks().await?;
        self.cached_key(kid).await
    }

    async fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let guard = self.jwks.read().await;
        let cached = guard.as_ref()?;
        if cached.fetched_at.elapsed() > JWKS_TTL {
            return None;
        }
        cached
            .keys
            .iter()
            .find(|k| k.kid.as_deref() == Some(kid))
            .and_then(|k| DecodingKey::from_rsa_components(&k.n, &k.e).ok())
    }

    async fn refresh_jwks(&self) -> Option<()> {
        let jwks: Jwks = match self
            .http
            .get(&self.oauth.jwks_endpoint)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(resp) => match resp.json().await {
                Ok(jwks) => jwks,
                Err(e) => {
                    warn!("failed to parse provider key set: {}", e);
                    return None;
                }
            },
            Err(e) => {
                warn!("failed to fetch provider key set: {}", e);
                return None;
            }
        };

        let mut guard = self.jwks.write().await;
        *guard = Some(CachedJwks { keys: jwks.keys, fetched_at: Instant::now() });
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> IdentityVerifier {
        IdentityVerifier::new(OauthConfig {
            client_id: "test-client".to_string(),
            client_secret: "secret".to_string(),
            auth_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            jwks_endpoint: "https://www.googleapis.com/oauth2/v3/certs".to_string(),
            issuer: "https://accounts.google.com".to_string(),
            scope: "profile".to_string(),
        })
    }

    #[tokio::test]
    async fn malformed_token_is_not_verified() {
        let v = verifier();
        assert!(v.verify("not-a-jwt").await.is_none());
        assert!(v.verify("").await.is_none());
        // Structurally valid base64 segments, still not a real token.
        assert!(v.verify("aGVhZGVy.Y2xhaW1z.c2ln").await.is_none());
    }

    #[test]
    fn authorization_url_carries_code_flow_params() {
        let v = verifier();
        let url = v
            .authorization_url("http://localhost:3000/oauth")
            .unwrap();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=test-client"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("include_granted_scopes=true"));
    }

    #[test]
    fn jwks_document_parses() {
        let jwks: Jwks = serde_json::from_str(
            r#"{"keys":[{"kty":"RSA","kid":"abc","use":"sig","alg":"RS256","n":"0vx7","e":"AQAB"}]}"#,
        )
        .unwrap();
        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].kid.as_deref(), Some("abc"));
    }
}
