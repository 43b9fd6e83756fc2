use serde::{Deserialize, Serialize};

pub const SORT_BY_LAST_UPDATED: &str = "last_updated_time";
pub const ORDER_DESC: &str = "desc";
pub const STATUS_FOR_SALE: &str = "SALE";

/// Canonical request body for the listing API.
///
/// Optional filters are omitted from the serialized body when absent. The
/// listing API treats an explicit `null` differently from a missing key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpstreamPayload {
    pub sort_by: String,
    pub order_by: String,
    /// `"{city}, {state}, USA"` with the caller's casing.
    pub searched_address_formatted: String,
    pub property_status: String,
    pub output: Vec<String>,
    pub image_count: u32,
    pub size: u64,
    pub allowed_mls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedroom: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathroom: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl UpstreamPayload {
    pub fn format_address(city: &str, state: &str) -> String {
        format!("{}, {}, USA", city, state)
    }
}
