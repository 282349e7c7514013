use std::sync::Arc;

use axum::http::HeaderName;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::authz::RoutePolicy;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::logging::{SeverityFilter, TracingSink};
use crate::routes::{authorize, health};
use crate::verifier::TokenVerifier;

/// Process-wide immutable state, shared across in-flight requests without
/// locking.
#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<RoutePolicy>,
    pub headers: Arc<RequestHeaderNames>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub log: Arc<SeverityFilter>,
}

/// Configured metadata header names, parsed once at startup.
#[derive(Debug, Clone)]
pub struct RequestHeaderNames {
    pub method: HeaderName,
    pub uri: HeaderName,
    pub groups: HeaderName,
}

impl RequestHeaderNames {
    fn from_config(config: &Config) -> AppResult<Self> {
        let parse = |name: &str| {
            HeaderName::try_from(name)
                .map_err(|_| AppError::configuration(format!("invalid header name: {name:?}")))
        };

        Ok(Self {
            method: parse(&config.header_names.method)?,
            uri: parse(&config.header_names.uri)?,
            groups: parse(&config.header_names.groups)?,
        })
    }
}

/// Build the router. The verifier is injected here so the decision pipeline
/// never constructs its own collaborators; `main` passes the JWKS verifier,
/// tests pass a double.
pub fn create_app(config: &Config, verifier: Arc<dyn TokenVerifier>) -> AppResult<Router> {
    let state = AppState {
        policy: Arc::new(config.auth.clone()),
        headers: Arc::new(RequestHeaderNames::from_config(config)?),
        verifier,
        log: Arc::new(SeverityFilter::new(Arc::new(TracingSink), config.log_level)),
    };

    // Every inbound request is an authorization question regardless of the
    // path the proxy points at us, hence the fallback route. /healthz is the
    // one carve-out, for liveness probes.
    let router = Router::new()
        .route("/healthz", get(health::health))
        .fallback(authorize::authorize)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
