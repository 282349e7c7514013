//! The forward-authentication decision endpoint.
//!
//! The reverse proxy forwards the original request's verb, URI, and bearer
//! token as headers; the answer is carried entirely by the status code:
//! 200 allow (plus the groups header), 403 deny, 500 error. Error detail
//! never leaves the audit log.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};

use crate::app::AppState;
use crate::authz::{intersect, resolve_roles};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    fn status(self) -> StatusCode {
        match self {
            Decision::Allow => StatusCode::OK,
            Decision::Deny => StatusCode::FORBIDDEN,
        }
    }
}

/// One request, one response, on every path. Failures anywhere in the
/// pipeline collapse to a bare 500 and an error-severity log line; the
/// server keeps serving.
pub async fn authorize(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match decide(&state, &headers).await {
        Ok(response) => response,
        Err(err) => {
            state.log.error(&format!("request failed: {err}"));
            err.into_response()
        }
    }
}

async fn decide(state: &AppState, headers: &HeaderMap) -> AppResult<Response> {
    let verb = header_str(headers, &state.headers.method)?;
    let path = header_str(headers, &state.headers.uri)?;
    let token = bearer_token(headers)?;

    let allowed = resolve_roles(&state.policy, &path, &verb);
    let claims = state.verifier.verify(&token).await?;
    let granted = claims.granted_scopes();
    let matched = intersect(allowed, &granted);

    let decision = if matched.is_empty() {
        Decision::Deny
    } else {
        Decision::Allow
    };

    let mut response = decision.status().into_response();
    if decision == Decision::Allow {
        let groups = HeaderValue::from_str(&matched.join(",")).map_err(|_| {
            AppError::internal("matched roles do not form a valid header value")
        })?;
        response.headers_mut().insert(state.headers.groups.clone(), groups);
    }

    state.log.log(&format!(
        "{}\t{}\t{}\t{}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        decision.status().as_u16(),
        verb,
        path
    ));

    Ok(response)
}

fn header_str(headers: &HeaderMap, name: &HeaderName) -> AppResult<String> {
    headers
        .get(name)
        .ok_or_else(|| AppError::malformed_request(format!("missing {name} header")))?
        .to_str()
        .map(str::to_owned)
        .map_err(|_| AppError::malformed_request(format!("{name} header is not valid utf-8")))
}

/// The credential is the second whitespace-separated segment of the
/// `Authorization` value; the scheme word itself is not inspected.
fn bearer_token(headers: &HeaderMap) -> AppResult<String> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::malformed_request("missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::malformed_request("authorization header is not valid utf-8"))?;

    value
        .split_whitespace()
        .nth(1)
        .map(str::to_owned)
        .ok_or_else(|| AppError::malformed_request("authorization header has no token segment"))
}
