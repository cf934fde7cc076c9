//! Push delivery authentication.
//!
//! A push endpoint is called by the broker over HTTP with an
//! `Authorization: Bearer <token>` header. When authentication is required
//! exactly one validation path runs per request:
//!
//! 1. the host application's [`TokenValidator`], when one is installed;
//! 2. otherwise the issuer/audience check against a remote key set
//!    ([`JwksValidator`]).
//!
//! Installing a custom validator overrides the key set check even when
//! issuer, audience and JWKS endpoint are all configured.

mod jwks;

use std::sync::Arc;

use tracing::debug;

use crate::config::PushOptions;
use crate::error::{AuthError, ConfigError};

pub use jwks::{JwksValidator, DEFAULT_MIN_REFRESH_INTERVAL};

/// Host-supplied credential check.
///
/// Implemented for any `Fn(&str) -> Result<(), AuthError>`.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<(), AuthError>;
}

impl<F> TokenValidator for F
where
    F: Fn(&str) -> Result<(), AuthError> + Send + Sync,
{
    fn validate(&self, token: &str) -> Result<(), AuthError> {
        self(token)
    }
}

/// Authenticates inbound push requests.
#[derive(Clone, Default)]
pub struct PushAuthenticator {
    required: bool,
    custom: Option<Arc<dyn TokenValidator>>,
    jwks: Option<Arc<JwksValidator>>,
}

impl PushAuthenticator {
    /// An authenticator that accepts every request.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build from push options. A JWKS validator is created when
    /// `jwks_endpoint` is set.
    pub fn from_options(options: &PushOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let jwks = match &options.jwks_endpoint {
            Some(endpoint) => Some(Arc::new(JwksValidator::new(
                endpoint,
                options.issuer.clone(),
                options.audience.clone(),
            )?)),
            None => None,
        };
        Ok(Self {
            required: options.require_auth_validation,
            custom: None,
            jwks,
        })
    }

    /// Install a custom validator. It takes precedence over key set
    /// validation and turns authentication on; call [`require`](Self::require)
    /// afterwards to switch it off again.
    pub fn with_custom_validator(mut self, validator: impl TokenValidator + 'static) -> Self {
        self.custom = Some(Arc::new(validator));
        self.required = true;
        self
    }

    pub fn with_jwks(mut self, validator: JwksValidator) -> Self {
        self.jwks = Some(Arc::new(validator));
        self
    }

    /// Require (or stop requiring) a valid credential on every request.
    pub fn require(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Fails when authentication is required but no validation path exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.required && self.custom.is_none() && self.jwks.is_none() {
            return Err(ConfigError::InvalidValue {
                key: "requireAuthValidation".into(),
                reason: "set a custom validator or a jwksEndpoint".into(),
            });
        }
        Ok(())
    }

    /// Check the raw `Authorization` header value of a push request.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<(), AuthError> {
        if !self.required {
            return Ok(());
        }
        let token = bearer_token(authorization)?;

        if let Some(custom) = &self.custom {
            debug!("validating push credential with custom validator");
            return custom.validate(token);
        }

        match &self.jwks {
            Some(jwks) => jwks.validate(token).await,
            None => Err(AuthError::KeySetUnavailable(
                "no validator configured".into(),
            )),
        }
    }
}

/// Extract the token from `Bearer <token>`. The scheme is case-insensitive.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let header = authorization.ok_or(AuthError::MissingCredential)?.trim();
    let (scheme, token) = header
        .split_once(' ')
        .ok_or(AuthError::MissingCredential)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}
