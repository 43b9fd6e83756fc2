use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PropSearchError, Result};

/// Keys tried, in order, when looking for a record's identifier.
const ID_KEYS: [&str; 4] = ["id", "property_id", "listing_id", "mls_number"];

/// A single listing as returned by the listing API.
///
/// The upstream shape is not contractually fixed, so the record stays an
/// untyped JSON object and is re-serialized unchanged. Accessors treat a
/// `null` value the same as a missing key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingRecord(pub Map<String, Value>);

impl ListingRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Geocoded address when the listing API supplies one, else the raw address.
    pub fn address(&self) -> Option<&Value> {
        self.get("google_address")
            .filter(|v| v.as_str().is_some_and(|s| !s.trim().is_empty()))
            .or_else(|| self.get("address"))
    }

    pub fn price(&self) -> Option<&Value> {
        self.get("price")
    }

    pub fn bedrooms(&self) -> Option<&Value> {
        self.get("bedroom")
    }

    pub fn bathrooms(&self) -> Option<&Value> {
        self.get("bathroom")
    }

    /// Living area in square feet.
    pub fn area(&self) -> Option<&Value> {
        self.get("area")
    }

    pub fn descriptor(&self) -> Option<&Value> {
        self.get("property_descriptor")
    }

    pub fn id(&self) -> Option<String> {
        ID_KEYS.iter().find_map(|key| match self.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Strict-mode check for the fields every consumer relies on.
    pub fn validate_required(&self) -> Result<()> {
        let missing: Vec<&str> = [("address", self.address()), ("price", self.price())]
            .into_iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PropSearchError::Validation(format!(
                "listing record missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

impl From<Value> for ListingRecord {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                Self(map)
            }
        }
    }
}

/// One page of search results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Records in the order the listing API returned them.
    pub data: Vec<ListingRecord>,
    pub count: usize,
    /// Continuation token for the next page; serialized as `null` when exhausted.
    pub cursor: Option<Value>,
}

impl SearchResult {
    pub fn new(data: Vec<ListingRecord>, cursor: Option<Value>) -> Self {
        Self {
            count: data.len(),
            data,
            cursor: cursor.filter(|c| !c.is_null()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The cursor as a string token, when the listing API sent one.
    pub fn cursor_token(&self) -> Option<&str> {
        self.cursor.as_ref().and_then(Value::as_str)
    }
}
