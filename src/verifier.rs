//! Bearer-token verification against a remote key set.
//!
//! The request pipeline only sees the [`TokenVerifier`] trait; the concrete
//! [`JwksVerifier`] is injected at the composition point so tests can swap
//! in a double without touching the network.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::errors::{AppError, AppResult};

/// Decoded claims of a verified token.
///
/// `scope` is required: a token that verified cryptographically but carries
/// no scope claim is treated as a verification failure, not as an empty
/// grant.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub scope: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Claims {
    /// Union of the whitespace-split scope tokens and the permission entries.
    pub fn granted_scopes(&self) -> HashSet<String> {
        self.scope
            .split_whitespace()
            .map(str::to_owned)
            .chain(self.permissions.iter().cloned())
            .collect()
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` and return its claims, or a distinguishable error.
    ///
    /// This is the pipeline's only suspension point; implementations must
    /// bound their own I/O so a request cannot wait forever.
    async fn verify(&self, token: &str) -> AppResult<Claims>;
}

/// A JWKS document as published at the remote key-set endpoint.
#[derive(Debug, Clone, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Minimal JWK fields for RSA and EC public keys.
#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kty: String,
    kid: Option<String>,
    // RSA
    n: Option<String>,
    e: Option<String>,
    // EC
    x: Option<String>,
    y: Option<String>,
}

/// Verifies tokens against a remote JWKS endpoint.
///
/// The key set is fetched per verification; caching and refresh are
/// deliberately out of scope. The HTTP client carries a 10 second timeout so
/// an unreachable endpoint surfaces as a verification failure instead of a
/// hung request.
pub struct JwksVerifier {
    client: reqwest::Client,
    jwks_uri: String,
    audience: String,
    issuer: String,
    algorithms: Vec<Algorithm>,
}

impl JwksVerifier {
    pub fn new(
        jwks_uri: impl Into<String>,
        audience: impl Into<String>,
        issuer: impl Into<String>,
        algorithms: Vec<Algorithm>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| AppError::configuration(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            jwks_uri: jwks_uri.into(),
            audience: audience.into(),
            issuer: issuer.into(),
            algorithms,
        })
    }

    async fn fetch_keys(&self) -> AppResult<JwkSet> {
        let response = self
            .client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|err| AppError::verification(format!("jwks fetch failed: {err}")))?;

        if !response.status().is_success() {
            return Err(AppError::verification(format!(
                "jwks fetch failed: {}",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|err| AppError::verification(format!("invalid jwks document: {err}")))
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> AppResult<Claims> {
        let header = decode_header(token)
            .map_err(|err| AppError::verification(format!("invalid token header: {err}")))?;

        if !self.algorithms.contains(&header.alg) {
            return Err(AppError::verification(format!(
                "algorithm {:?} not accepted",
                header.alg
            )));
        }

        let jwks = self.fetch_keys().await?;

        // Prefer keys whose kid matches the token header; fall back to
        // trying every published key.
        let mut candidates: Vec<&Jwk> = match header.kid.as_deref() {
            Some(kid) => jwks
                .keys
                .iter()
                .filter(|key| key.kid.as_deref() == Some(kid))
                .collect(),
            None => Vec::new(),
        };
        if candidates.is_empty() {
            candidates = jwks.keys.iter().collect();
        }

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = true;
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let mut last_error: Option<jsonwebtoken::errors::Error> = None;

        for jwk in candidates {
            let Ok(key) = decoding_key(jwk) else { continue };
            match decode::<Claims>(token, &key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(err) => last_error = Some(err),
            }
        }

        match last_error {
            Some(err) => Err(AppError::verification(format!("token rejected: {err}"))),
            None => Err(AppError::verification("no usable key in jwks")),
        }
    }
}

fn decoding_key(jwk: &Jwk) -> AppResult<DecodingKey> {
    match jwk.kty.as_str() {
        "RSA" => {
            let n = jwk
                .n
                .as_deref()
                .ok_or_else(|| AppError::verification("rsa jwk missing n"))?;
            let e = jwk
                .e
                .as_deref()
                .ok_or_else(|| AppError::verification("rsa jwk missing e"))?;
            DecodingKey::from_rsa_components(n, e)
                .map_err(|err| AppError::verification(format!("invalid rsa jwk: {err}")))
        }
        "EC" => {
            let x = jwk
                .x
                .as_deref()
                .ok_or_else(|| AppError::verification("ec jwk missing x"))?;
            let y = jwk
                .y
                .as_deref()
                .ok_or_else(|| AppError::verification("ec jwk missing y"))?;
            DecodingKey::from_ec_components(x, y)
                .map_err(|err| AppError::verification(format!("invalid ec jwk: {err}")))
        }
        other => Err(AppError::verification(format!("unsupported kty: {other}"))),
    }
}
