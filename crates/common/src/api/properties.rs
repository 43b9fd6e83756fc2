use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ListingRecord, NumericArg, SearchCriteria, SearchResult};

/// GET /properties query string. Everything arrives as text.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PropertiesQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Free-text request, e.g. "3 bedroom homes in Austin under 500k".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl PropertiesQuery {
    /// Split into explicit criteria and the optional natural-language query.
    /// Empty query-string values count as not provided.
    pub fn into_parts(self) -> (SearchCriteria, Option<String>) {
        let text = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let num = |v: Option<String>| text(v).map(NumericArg::Text);

        let criteria = SearchCriteria {
            city: text(self.city).unwrap_or_default(),
            state: text(self.state).unwrap_or_default(),
            country: text(self.country),
            min_price: num(self.min_price),
            max_price: num(self.max_price),
            bedrooms: num(self.bedrooms),
            bathrooms: num(self.bathrooms),
            size: num(self.size),
            cursor: text(self.cursor),
        };

        (criteria, text(self.query))
    }
}

/// POST /properties body: criteria fields plus an optional free-text query.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PropertiesRequest {
    #[serde(flatten)]
    pub criteria: SearchCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Outcome tag carried in every /properties response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    /// The free-text query was not a property search; nothing was fetched.
    NotSearch,
}

/// GET/POST /properties response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertiesResponse {
    pub status: ResponseStatus,
    pub data: Vec<ListingRecord>,
    pub count: usize,
    pub cursor: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Criteria actually searched when they came from a free-text query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreted: Option<SearchCriteria>,
}

impl PropertiesResponse {
    pub fn success(result: SearchResult) -> Self {
        Self {
            status: ResponseStatus::Success,
            data: result.data,
            count: result.count,
            cursor: result.cursor,
            message: None,
            interpreted: None,
        }
    }

    pub fn not_search(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::NotSearch,
            data: Vec::new(),
            count: 0,
            cursor: None,
            message: Some(message.into()),
            interpreted: None,
        }
    }
}

/// GET /properties/{id} query string.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PropertyLookupQuery {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

/// Error body for every non-2xx response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}
