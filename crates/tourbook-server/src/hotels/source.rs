//! Data source abstraction behind the cached hotel read paths.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use tourbook_cache::CacheKey;

use crate::error::ApiError;

const BUILTIN_HOTELS: &str = include_str!("../../fixtures/hotels.json");

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Listing parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HotelQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Field name, `-` prefix for descending.
    pub sort: Option<String>,
    /// Comma-separated projection.
    pub fields: Option<String>,
    pub location: Option<String>,
}

impl HotelQuery {
    /// Clamp pagination and drop empty strings so equivalent requests share a key.
    pub fn normalized(self) -> Self {
        let non_empty = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            page: Some(self.page.unwrap_or(1).max(1)),
            limit: Some(self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)),
            sort: non_empty(self.sort),
            fields: non_empty(self.fields),
            location: non_empty(self.location).map(|l| l.to_lowercase()),
        }
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// `hotels:<page>:<limit>:<sort>:<fields>:<location>`
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new("hotels")
            .part(self.page())
            .part(self.limit())
            .opt_part(self.sort.as_deref())
            .opt_part(self.fields.as_deref())
            .opt_part(self.location.as_deref())
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelPage {
    pub total: usize,
    pub data: Vec<Value>,
}

/// Number of hotels per location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCount {
    pub name: String,
    pub count: usize,
}

/// Where hotel documents come from.
///
/// The server only reads; writes happen elsewhere and are picked up once
/// cached entries expire.
#[async_trait]
pub trait HotelSource: Send + Sync {
    async fn list(&self, query: &HotelQuery) -> Result<HotelPage, ApiError>;

    async fn get(&self, id: &str) -> Result<Option<Value>, ApiError>;

    async fn locations(&self) -> Result<Vec<LocationCount>, ApiError>;
}

/// Hotel documents held in memory, seeded from JSON.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHotelSource {
    hotels: Vec<Value>,
}

impl InMemoryHotelSource {
    pub fn new(hotels: Vec<Value>) -> Self {
        Self { hotels }
    }

    pub fn builtin() -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(BUILTIN_HOTELS)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        Ok(Self::new(serde_json::from_str(&raw)?))
    }

    pub fn len(&self) -> usize {
        self.hotels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hotels.is_empty()
    }
}

fn location_of(hotel: &Value) -> Option<&str> {
    hotel
        .get("location")
        .or_else(|| hotel.get("city"))
        .and_then(Value::as_str)
}

fn id_matches(hotel: &Value, id: &str) -> bool {
    match hotel.get("id") {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

/// Numbers order numerically, everything else by its string form; missing last.
fn compare_field(a: &Value, b: &Value, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn project(hotel: &Value, fields: &[&str]) -> Value {
    let Some(obj) = hotel.as_object() else {
        return hotel.clone();
    };
    let mut out = Map::new();
    // id always survives projection
    for field in std::iter::once(&"id").chain(fields.iter()) {
        if let Some(v) = obj.get(*field) {
            out.insert((*field).to_string(), v.clone());
        }
    }
    Value::Object(out)
}

#[async_trait]
impl HotelSource for InMemoryHotelSource {
    async fn list(&self, query: &HotelQuery) -> Result<HotelPage, ApiError> {
        let mut matched: Vec<&Value> = match query.location.as_deref() {
            Some(wanted) => self
                .hotels
                .iter()
                .filter(|h| location_of(h).is_some_and(|l| l.to_lowercase().contains(wanted)))
                .collect(),
            None => self.hotels.iter().collect(),
        };

        if let Some(sort) = query.sort.as_deref() {
            let (field, descending) = match sort.strip_prefix('-') {
                Some(field) => (field, true),
                None => (sort, false),
            };
            matched.sort_by(|a, b| {
                let ord = compare_field(a, b, field);
                if descending { ord.reverse() } else { ord }
            });
        }

        let total = matched.len();
        let limit = query.limit() as usize;
        let skip = (query.page() as usize).saturating_sub(1).saturating_mul(limit);
        let fields: Vec<&str> = query
            .fields
            .as_deref()
            .map(|f| f.split(',').map(str::trim).filter(|f| !f.is_empty()).collect())
            .unwrap_or_default();

        let data = matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|h| if fields.is_empty() { h.clone() } else { project(h, &fields) })
            .collect();

        Ok(HotelPage { total, data })
    }

    async fn get(&self, id: &str) -> Result<Option<Value>, ApiError> {
        Ok(self.hotels.iter().find(|h| id_matches(h, id)).cloned())
    }

    async fn locations(&self) -> Result<Vec<LocationCount>, ApiError> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for location in self.hotels.iter().filter_map(location_of) {
            *counts.entry(location).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(name, count)| LocationCount {
                name: name.to_string(),
                count,
            })
            .collect())
    }
}
