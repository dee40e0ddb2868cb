// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification.
//!
//! Sign-in itself happens in the identity provider; this module only checks
//! the resulting ID token (RS256, signed by the `securetoken` service
//! account) and turns it into an [`Identity`].

use crate::config::Config;
use crate::error::AppError;
use crate::models::Identity;
use anyhow::Context;
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
/// Google rotates the securetoken keys every few hours and publishes each
/// well before use, so an hour-old key set is still current.
const KEY_SET_TTL: Duration = Duration::from_secs(3600);
const CLOCK_SKEW_SECS: u64 = 60;
/// Firebase uids are at most 128 characters.
const MAX_UID_LEN: usize = 128;

/// Identity-boundary failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("API Key is missing. Check configuration.")]
    MissingApiKey,

    #[error("Invalid API Key configuration.")]
    InvalidApiKey,

    #[error("Login popup closed.")]
    PopupClosed,

    #[error("Login cancelled by user.")]
    Cancelled,

    #[error("Invalid ID token: {0}")]
    InvalidToken(String),

    #[error("Identity provider unavailable: {0}")]
    Transient(String),

    #[error("Sign-in failed ({0})")]
    Provider(String),
}

impl AuthError {
    /// Map an identity-provider error code (e.g. `auth/popup-closed-by-user`).
    pub fn from_provider_code(code: &str) -> Self {
        match code {
            "auth/popup-closed-by-user" => AuthError::PopupClosed,
            "auth/cancelled-popup-request" => AuthError::Cancelled,
            "auth/invalid-api-key" => AuthError::InvalidApiKey,
            c if c.starts_with("auth/api-key-not-valid") => AuthError::InvalidApiKey,
            other => AuthError::Provider(other.to_string()),
        }
    }

    /// Text suitable for showing to the person signing in.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidToken(_) => "Your session has expired. Please sign in again.".into(),
            AuthError::Transient(_) => {
                "Unable to reach the sign-in service. Please try again.".into()
            }
            other => other.to_string(),
        }
    }

    /// The user backed out of sign-in; nothing to report as a failure.
    pub fn is_user_declined(&self) -> bool {
        matches!(self, AuthError::PopupClosed | AuthError::Cancelled)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(_) => AppError::InvalidToken,
            AuthError::PopupClosed | AuthError::Cancelled => AppError::Unauthorized,
            AuthError::MissingApiKey | AuthError::InvalidApiKey => {
                AppError::BadRequest(err.to_string())
            }
            AuthError::Transient(_) | AuthError::Provider(_) => AppError::Internal(err.into()),
        }
    }
}

type KeysByKid = HashMap<String, Arc<DecodingKey>>;

/// Where signing keys come from.
enum KeySource {
    /// The `securetoken` JWKS endpoint, cached for [`KEY_SET_TTL`]
    Securetoken {
        http_client: reqwest::Client,
        cached: Mutex<Option<(KeysByKid, Instant)>>,
    },
    /// A fixed key set; no network access
    Pinned(KeysByKid),
}

/// Verifier for Firebase Authentication ID tokens.
pub struct IdTokenVerifier {
    project_id: String,
    keys: KeySource,
}

impl IdTokenVerifier {
    /// Create a verifier that fetches the `securetoken` signing keys.
    ///
    /// Fails with [`AuthError::MissingApiKey`] when no Firebase API key is
    /// configured, since sign-in cannot work without one.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        if config.firebase_api_key.is_none() {
            return Err(AuthError::MissingApiKey.into());
        }

        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        tracing::info!(project = %config.firebase_project_id, "Initialized ID token verifier");
        Ok(Self {
            project_id: config.firebase_project_id.clone(),
            keys: KeySource::Securetoken {
                http_client,
                cached: Mutex::new(None),
            },
        })
    }

    /// Verify against a fixed set of `(kid, key)` pairs instead of fetching
    /// them, e.g. for an emulator-issued or self-signed token.
    pub fn with_pinned_keys<I>(config: &Config, keys: I) -> Self
    where
        I: IntoIterator<Item = (String, DecodingKey)>,
    {
        Self {
            project_id: config.firebase_project_id.clone(),
            keys: KeySource::Pinned(
                keys.into_iter()
                    .map(|(kid, key)| (kid, Arc::new(key)))
                    .collect(),
            ),
        }
    }

    /// Verify an ID token and return the signed-in identity.
    pub async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidToken("token is empty".to_string()));
        }

        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("invalid JWT header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("missing JWT kid".to_string()))?;

        let key = self.signing_key(&kid).await?;

        let issuer = format!("{ISSUER_PREFIX}{}", self.project_id);
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<FirebaseIdTokenClaims>(token, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(format!("JWT validation failed: {e}")))?
            .claims;
        check_issued_at(claims.iat)?;
        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(AuthError::InvalidToken("invalid sub claim".to_string()));
        }

        tracing::info!(uid = %claims.sub, email = ?claims.email, "Verified ID token");

        let mut identity = Identity::new(claims.sub);
        identity.display_name = claims.name;
        identity.email = claims.email;
        identity.photo_url = claims.picture;
        Ok(identity)
    }

    async fn signing_key(&self, kid: &str) -> Result<Arc<DecodingKey>, AuthError> {
        let unknown = || AuthError::InvalidToken(format!("unknown JWT kid: {kid}"));

        let (http_client, cached) = match &self.keys {
            KeySource::Pinned(keys) => return keys.get(kid).cloned().ok_or_else(unknown),
            KeySource::Securetoken {
                http_client,
                cached,
            } => (http_client, cached),
        };

        // Held across the fetch so concurrent verifications share one request.
        let mut cached = cached.lock().await;
        if let Some((keys, fetched_at)) = cached.as_ref() {
            if fetched_at.elapsed() < KEY_SET_TTL {
                if let Some(key) = keys.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        // Stale, empty, or the kid was rotated in since the last fetch
        let keys = fetch_signing_keys(http_client).await?;
        let key = keys.get(kid).cloned();
        *cached = Some((keys, Instant::now()));
        key.ok_or_else(unknown)
    }
}

async fn fetch_signing_keys(http_client: &reqwest::Client) -> Result<KeysByKid, AuthError> {
    tracing::debug!(jwks_uri = JWKS_URL, "Fetching securetoken signing keys");

    let response = http_client
        .get(JWKS_URL)
        .send()
        .await
        .map_err(|e| AuthError::Transient(format!("JWKS request failed: {e}")))?;
    if !response.status().is_success() {
        return Err(AuthError::Transient(format!(
            "JWKS request returned status {}",
            response.status()
        )));
    }

    let set: JwkSet = response
        .json()
        .await
        .map_err(|e| AuthError::Transient(format!("invalid JWKS JSON: {e}")))?;

    let keys = rs256_signing_keys(&set);
    if keys.is_empty() {
        return Err(AuthError::Transient(
            "JWKS response had no RS256 signing keys".to_string(),
        ));
    }
    Ok(keys)
}

/// RSA signature keys with a kid, keyed by it. Everything else is ignored.
fn rs256_signing_keys(set: &JwkSet) -> KeysByKid {
    set.keys
        .iter()
        .filter(|jwk| matches!(jwk.algorithm, AlgorithmParameters::RSA(_)))
        .filter(|jwk| {
            !matches!(
                jwk.common.public_key_use,
                Some(PublicKeyUse::Encryption | PublicKeyUse::Other(_))
            )
        })
        .filter(|jwk| jwk.common.key_algorithm.map_or(true, |alg| alg == KeyAlgorithm::RS256))
        .filter_map(|jwk| {
            let kid = jwk.common.key_id.clone().filter(|kid| !kid.trim().is_empty())?;
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => Some((kid, Arc::new(key))),
                Err(e) => {
                    tracing::warn!(error = %e, kid = %kid, "Skipping invalid JWKS key");
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct FirebaseIdTokenClaims {
    sub: String,
    iat: Option<u64>,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

fn check_issued_at(iat: Option<u64>) -> Result<(), AuthError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    match iat {
        None => Err(AuthError::InvalidToken("missing iat claim".to_string())),
        Some(iat) if iat > now + CLOCK_SKEW_SECS => Err(AuthError::InvalidToken(
            "iat claim is in the future".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_codes_map_to_friendly_errors() {
        assert_eq!(
            AuthError::from_provider_code("auth/popup-closed-by-user"),
            AuthError::PopupClosed
        );
        assert_eq!(
            AuthError::from_provider_code("auth/cancelled-popup-request"),
            AuthError::Cancelled
        );
        assert_eq!(
            AuthError::from_provider_code("auth/api-key-not-valid.-please-pass-a-valid-api-key."),
            AuthError::InvalidApiKey
        );
        assert_eq!(
            AuthError::from_provider_code("auth/network-request-failed"),
            AuthError::Provider("auth/network-request-failed".to_string())
        );
    }

    #[test]
    fn only_rsa_signing_keys_with_kid_are_used() {
        let set: JwkSet = serde_json::from_str(
            r#"{"keys":[
                {"kid":"ec","kty":"EC","crv":"P-256","x":"AQAB","y":"AQAB"},
                {"kid":"enc","kty":"RSA","use":"enc","n":"AQAB","e":"AQAB"},
                {"kid":"","kty":"RSA","use":"sig","n":"AQAB","e":"AQAB"},
                {"kid":"good","kty":"RSA","use":"sig","alg":"RS256","n":"AQAB","e":"AQAB"}
            ]}"#,
        )
        .unwrap();
        let keys = rs256_signing_keys(&set);
        assert_eq!(keys.keys().collect::<Vec<_>>(), ["good"]);
    }

    #[test]
    fn iat_must_not_be_in_the_future() {
        assert!(check_issued_at(None).is_err());
        assert!(check_issued_at(Some(0)).is_ok());
        assert!(check_issued_at(Some(u64::MAX / 2)).is_err());
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let config = Config {
            firebase_api_key: None,
            ..Config::default()
        };
        assert!(matches!(
            IdTokenVerifier::new(&config),
            Err(AppError::BadRequest(_))
        ));
    }
}
