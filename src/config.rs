//! Startup configuration.
//!
//! One JSON document, loaded once before the listener opens. Anything wrong
//! with it is fatal: the process must not serve requests against a policy it
//! could not fully parse and validate.

use std::path::Path;
use std::str::FromStr;

use axum::http::HeaderName;
use jsonwebtoken::Algorithm;
use serde::Deserialize;

use crate::authz::RoutePolicy;
use crate::errors::{AppError, AppResult};
use crate::logging::Severity;

pub const DEFAULT_METHOD_HEADER: &str = "x-original-method";
pub const DEFAULT_URI_HEADER: &str = "x-original-uri";
pub const DEFAULT_GROUPS_HEADER: &str = "x-groups";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub log_level: Severity,
    pub jwks_uri: String,
    pub audience: String,
    pub issuer: String,
    pub algorithms: Vec<String>,
    pub auth: RoutePolicy,
    #[serde(default)]
    pub header_names: HeaderNames,
}

/// Wire names for the forwarded-request metadata headers.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderNames {
    #[serde(default = "default_method_header")]
    pub method: String,
    #[serde(default = "default_uri_header")]
    pub uri: String,
    #[serde(default = "default_groups_header")]
    pub groups: String,
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self {
            method: default_method_header(),
            uri: default_uri_header(),
            groups: default_groups_header(),
        }
    }
}

fn default_method_header() -> String {
    DEFAULT_METHOD_HEADER.to_string()
}

fn default_uri_header() -> String {
    DEFAULT_URI_HEADER.to_string()
}

fn default_groups_header() -> String {
    DEFAULT_GROUPS_HEADER.to_string()
}

impl Config {
    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AppError::configuration(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> AppResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: Config = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|err| AppError::configuration(format!("invalid configuration: {err}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Accepted signing algorithms, parsed.
    pub fn algorithms(&self) -> AppResult<Vec<Algorithm>> {
        self.algorithms
            .iter()
            .map(|name| {
                Algorithm::from_str(name).map_err(|_| {
                    AppError::configuration(format!("unknown signing algorithm: {name}"))
                })
            })
            .collect()
    }

    fn validate(&self) -> AppResult<()> {
        if self.jwks_uri.is_empty() {
            return Err(AppError::configuration("jwksUri must not be empty"));
        }
        if self.issuer.is_empty() {
            return Err(AppError::configuration("issuer must not be empty"));
        }
        if self.audience.is_empty() {
            return Err(AppError::configuration("audience must not be empty"));
        }
        if self.algorithms.is_empty() {
            return Err(AppError::configuration("algorithms must not be empty"));
        }
        self.algorithms()?;

        for name in [
            &self.header_names.method,
            &self.header_names.uri,
            &self.header_names.groups,
        ] {
            HeaderName::try_from(name.as_str()).map_err(|_| {
                AppError::configuration(format!("invalid header name: {name:?}"))
            })?;
        }

        // Route lookups normalize the request verb to upper case; a
        // lower-case verb key could never match, so reject it outright.
        for (prefix, verbs) in &self.auth {
            for verb in verbs.keys() {
                if verb.chars().any(|c| c.is_ascii_lowercase()) {
                    return Err(AppError::configuration(format!(
                        "route {prefix:?}: verb {verb:?} must be upper case"
                    )));
                }
            }
        }

        Ok(())
    }
}
