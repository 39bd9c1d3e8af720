//! HTTP request handlers

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::RelayError;
use crate::relay::open_relay;
use crate::state::AppState;

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    StationNotFound(String),
    Resolution(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::StationNotFound(name) => {
                (StatusCode::NOT_FOUND, format!("Station not found: {}", name))
            }
            HttpError::Resolution(msg) => (StatusCode::BAD_GATEWAY, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, body).into_response()
    }
}

impl From<RelayError> for HttpError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::StationNotFound(name) => HttpError::StationNotFound(name),
            RelayError::Resolution(_) => HttpError::Resolution(err.to_string()),
            _ => HttpError::InternalError(err.to_string()),
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("station-relay v", env!("CARGO_PKG_VERSION"))
}

/// Public view of a configured station. Source URLs are left out since they
/// may carry access tokens.
#[derive(Debug, Serialize)]
pub struct StationSummary {
    pub name: String,
    pub format: String,
}

/// Station listing endpoint
/// GET /stations
pub async fn list_stations(State(state): State<Arc<AppState>>) -> Json<Vec<StationSummary>> {
    let stations = state
        .stations
        .iter()
        .map(|(name, spec)| StationSummary {
            name: name.clone(),
            format: spec.format.to_string(),
        })
        .collect();

    Json(stations)
}

/// Live relay endpoint
/// GET /s/{name}
pub async fn stream_station(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, HttpError> {
    let station = state
        .station(&name)
        .ok_or_else(|| RelayError::StationNotFound(name.clone()))?;

    let relay = open_relay(&state, &name, station).await?;

    let mut response = Body::from_stream(relay.into_body_stream()).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(station.format.content_type()),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, max-age=0"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));

    Ok(response)
}
