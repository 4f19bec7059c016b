//! HTTP layer of the external-dns webhook contract
//!
//! external-dns negotiates a versioned media type on every request: requests
//! carrying a body must name it in `Content-Type`, requests expecting a body
//! must name it in `Accept`. Anything else is rejected before the provider
//! is invoked. Provider failures map to 500, malformed request bodies to 400.

use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use extdns_core::Provider;
use extdns_core::endpoint::{Changes, Endpoint};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// Versioned media type of the webhook protocol
pub const MEDIA_TYPE: &str = "application/external.dns.webhook+json;version=1";

const CONTENT_TYPE_PLAINTEXT: &str = "text/plain";

const ERROR_ACCEPT_HEADER: &str = "client must provide an accept header";
const ERROR_CONTENT_TYPE: &str = "client must provide a content type";
const ERROR_MEDIA_TYPE: &str = "client must provide a valid versioned media type";

type SharedProvider = Arc<dyn Provider>;

/// Build the webhook route table
pub fn router(provider: SharedProvider, health_path: &str) -> Router {
    Router::new()
        .route("/", get(negotiate))
        .route("/records", get(get_records).post(apply_changes))
        .route("/adjustendpoints", post(adjust_endpoints))
        .route(health_path, get(health))
        .with_state(provider)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({}))
}

async fn negotiate(State(provider): State<SharedProvider>, headers: HeaderMap) -> Response {
    if let Err(rejection) = accept_header_check(&headers) {
        return rejection;
    }

    (
        [(header::CONTENT_TYPE, MEDIA_TYPE)],
        Json(provider.domain_filter()),
    )
        .into_response()
}

async fn get_records(State(provider): State<SharedProvider>, headers: HeaderMap) -> Response {
    if let Err(rejection) = accept_header_check(&headers) {
        return rejection;
    }

    match provider.records().await {
        Ok(records) => media_response(&records),
        Err(err) => {
            error!(error = %err, "error getting records");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn apply_changes(
    State(provider): State<SharedProvider>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(rejection) = content_type_header_check(&headers) {
        return rejection;
    }

    let changes: Changes = match serde_json::from_str(&body) {
        Ok(changes) => changes,
        Err(err) => {
            error!(error = %err, "error decoding changes");
            return error_response(StatusCode::BAD_REQUEST, "error decoding changes");
        }
    };

    debug!(
        create = changes.create.len(),
        update_old = changes.update_old.len(),
        update_new = changes.update_new.len(),
        delete = changes.delete.len(),
        "requesting apply changes"
    );

    match provider.apply_changes(changes).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!(error = %err, "error when applying changes");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, CONTENT_TYPE_PLAINTEXT)],
            )
                .into_response()
        }
    }
}

async fn adjust_endpoints(
    State(provider): State<SharedProvider>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(rejection) = content_type_header_check(&headers) {
        return rejection;
    }
    if let Err(rejection) = accept_header_check(&headers) {
        return rejection;
    }

    let endpoints: Vec<Endpoint> = match serde_json::from_str(&body) {
        Ok(endpoints) => endpoints,
        Err(err) => {
            error!(error = %err, "error decoding request body");
            return error_response(StatusCode::BAD_REQUEST, "error decoding request body");
        }
    };

    debug!(endpoints = endpoints.len(), "webhook adjust endpoints");

    match provider.adjust_endpoints(endpoints).await {
        Ok(adjusted) => media_response(&adjusted),
        Err(err) => {
            error!(error = %err, "error adjusting endpoints");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn accept_header_check(headers: &HeaderMap) -> Result<(), Response> {
    header_check(headers, header::ACCEPT, ERROR_ACCEPT_HEADER)
}

fn content_type_header_check(headers: &HeaderMap) -> Result<(), Response> {
    header_check(headers, header::CONTENT_TYPE, ERROR_CONTENT_TYPE)
}

fn header_check(
    headers: &HeaderMap,
    name: HeaderName,
    missing_message: &'static str,
) -> Result<(), Response> {
    let value = headers
        .get(&name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if value.is_empty() {
        error!(header = %name, "{missing_message}");
        return Err(error_response(StatusCode::NOT_ACCEPTABLE, missing_message));
    }

    if !is_media_type_supported(value) {
        error!(header = %name, value, "{ERROR_MEDIA_TYPE}");
        return Err(error_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ERROR_MEDIA_TYPE,
        ));
    }

    Ok(())
}

/// Accept only version 1 of the webhook media type; `Accept` may carry a
/// comma-separated list
fn is_media_type_supported(header: &str) -> bool {
    header
        .split(',')
        .map(|value| value.replace(' ', ""))
        .any(|value| value.eq_ignore_ascii_case(MEDIA_TYPE))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, CONTENT_TYPE_PLAINTEXT)],
        json!({"error": message}).to_string(),
    )
        .into_response()
}

/// A 200 response carrying the versioned media type
fn media_response<T: Serialize>(body: &T) -> Response {
    (
        [
            (header::CONTENT_TYPE, MEDIA_TYPE),
            (header::VARY, "Content-Type"),
        ],
        Json(body),
    )
        .into_response()
}
