//! Canned substitutes for the upstream hotel API.
//!
//! When the upstream answers 451 (regional block) or cannot be reached, the
//! proxy answers from a [`FallbackCatalog`] instead. Resolution never fails:
//! every path ends in a well-formed JSON body.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Marker header set on every synthesized response.
pub const MOCK_DATA_HEADER: &str = "x-mock-data";

const BUILTIN_CATALOG: &str = include_str!("../../fixtures/fallback.json");

/// Last-resort body when even the substitute cannot be serialized.
const UNSERIALIZABLE_BODY: &str =
    r#"{"success":false,"error":"Internal Server Error","message":"Fallback response could not be built"}"#;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read fallback catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid fallback catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Static substitute payloads, keyed by endpoint shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackCatalog {
    /// Collection served for hotel searches.
    #[serde(default)]
    pub hotel_search: Vec<Value>,

    /// Hotel id → detail record.
    #[serde(default)]
    pub hotels: HashMap<String, Value>,

    /// Collection served for location lookups.
    #[serde(default)]
    pub locations: Vec<Value>,
}

/// Endpoint shape a request path falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointShape<'a> {
    HotelSearch,
    HotelDetails(&'a str),
    Locations,
    Unmatched,
}

impl<'a> EndpointShape<'a> {
    /// Classify a path (query string allowed, it is ignored).
    ///
    /// Order matters: `/hotels/search` must never be read as hotel id "search",
    /// nor `/hotels/locations` as hotel id "locations".
    pub fn classify(path: &'a str) -> Self {
        let path = strip_query(path);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [.., "hotels", "search"] => Self::HotelSearch,
            [.., "hotels", id] if *id != "locations" => Self::HotelDetails(*id),
            _ if segments.contains(&"locations") => Self::Locations,
            _ => Self::Unmatched,
        }
    }
}

/// A resolved substitute: status plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl FallbackCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(BUILTIN_CATALOG)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Pick the substitute for `path`.
    pub fn resolve(&self, path: &str) -> FallbackResponse {
        match EndpointShape::classify(path) {
            EndpointShape::HotelSearch => collection(&self.hotel_search),
            EndpointShape::HotelDetails(id) => match self.hotels.get(id) {
                Some(hotel) => FallbackResponse {
                    status: StatusCode::OK,
                    body: json!({ "success": true, "data": hotel }),
                },
                None => FallbackResponse {
                    status: StatusCode::NOT_FOUND,
                    body: json!({
                        "success": false,
                        "error": "Hotel not found",
                        "message": format!("No hotel found with id {id}"),
                    }),
                },
            },
            EndpointShape::Locations => collection(&self.locations),
            EndpointShape::Unmatched => FallbackResponse {
                status: StatusCode::NOT_FOUND,
                body: json!({
                    "success": false,
                    "error": "Not Found",
                    "message": format!("No fallback data available for {}", strip_query(path)),
                }),
            },
        }
    }
}

fn collection(items: &[Value]) -> FallbackResponse {
    FallbackResponse {
        status: StatusCode::OK,
        body: json!({ "success": true, "count": items.len(), "data": items }),
    }
}

fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(p, _)| p)
}

impl IntoResponse for FallbackResponse {
    /// Builds a fresh response: nothing from an aborted upstream response
    /// (transfer-encoding, content-length) can leak in.
    fn into_response(self) -> Response {
        let (status, bytes) = match serde_json::to_vec(&self.body) {
            Ok(bytes) => (self.status, bytes),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize fallback body");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    UNSERIALIZABLE_BODY.as_bytes().to_vec(),
                )
            }
        };

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(MOCK_DATA_HEADER, HeaderValue::from_static("true"));
        response
    }
}
