//! Issuer/audience validation against a remote JSON Web Key Set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use jsonwebtoken::jwk::{Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AuthError, ConfigError};

/// Shortest gap between two key set fetches triggered by unknown `kid`s.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
}

/// Validates bearer JWTs with keys fetched from `jwks_endpoint`.
///
/// The key set is cached after the first fetch. A token whose `kid` is not
/// in the cache triggers a refetch, which picks up rotated keys; such
/// refetches happen at most once per `min_refresh_interval`.
///
/// When a key publishes its `alg`, tokens must be signed with exactly that
/// algorithm. The token header only chooses the algorithm for keys that
/// leave it open.
pub struct JwksValidator {
    endpoint: String,
    issuer: Option<String>,
    audience: Option<String>,
    http: reqwest::Client,
    keys: ArcSwapOption<CachedKeys>,
    min_refresh_interval: Duration,
}

impl JwksValidator {
    pub fn new(
        endpoint: &str,
        issuer: Option<String>,
        audience: Option<String>,
    ) -> Result<Self, ConfigError> {
        reqwest::Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
            key: "jwksEndpoint".into(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            issuer,
            audience,
            http: reqwest::Client::new(),
            keys: ArcSwapOption::empty(),
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        })
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Verify signature, expiry, issuer and audience.
    pub async fn validate(&self, token: &str) -> Result<(), AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidCredential(e.to_string()))?;
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AuthError::InvalidCredential("token has no kid".into()))?;

        let jwk = self.find_key(kid).await?;
        let algorithm = match jwk.common.key_algorithm.as_ref() {
            Some(published) => {
                let algorithm = signing_algorithm(published).ok_or_else(|| {
                    AuthError::InvalidCredential(format!("key {kid} is not a signing key"))
                })?;
                if algorithm != header.alg {
                    return Err(AuthError::InvalidCredential(format!(
                        "key {kid} requires {algorithm:?}, token uses {:?}",
                        header.alg
                    )));
                }
                algorithm
            }
            None => header.alg,
        };
        let key =
            DecodingKey::from_jwk(&jwk).map_err(|e| AuthError::KeySetUnavailable(e.to_string()))?;

        let mut validation = Validation::new(algorithm);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<Value>(token, &key, &validation)
            .map(|_| ())
            .map_err(|e| AuthError::InvalidCredential(e.to_string()))
    }

    async fn find_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        let unknown = || AuthError::InvalidCredential(format!("unknown kid {kid}"));

        if let Some(cached) = self.keys.load_full() {
            if let Some(jwk) = cached.set.find(kid) {
                return Ok(jwk.clone());
            }
            if cached.fetched_at.elapsed() < self.min_refresh_interval {
                debug!(kid, "kid not in cached key set; refetch throttled");
                return Err(unknown());
            }
            debug!(kid, "kid not in cached key set; refetching");
        }

        let cached = self.refresh().await?;
        cached.set.find(kid).cloned().ok_or_else(unknown)
    }

    async fn refresh(&self) -> Result<Arc<CachedKeys>, AuthError> {
        let unavailable = |e: reqwest::Error| {
            warn!(endpoint = %self.endpoint, error = %e, "failed to fetch key set");
            AuthError::KeySetUnavailable(e.to_string())
        };
        let set: JwkSet = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)?;

        debug!(endpoint = %self.endpoint, keys = set.keys.len(), "key set fetched");
        let cached = Arc::new(CachedKeys {
            set,
            fetched_at: Instant::now(),
        });
        self.keys.store(Some(cached.clone()));
        Ok(cached)
    }
}

/// The JWS algorithm a key is published for. Encryption algorithms map to `None`.
fn signing_algorithm(published: &KeyAlgorithm) -> Option<Algorithm> {
    match published {
        KeyAlgorithm::HS256 => Some(Algorithm::HS256),
        KeyAlgorithm::HS384 => Some(Algorithm::HS384),
        KeyAlgorithm::HS512 => Some(Algorithm::HS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}
