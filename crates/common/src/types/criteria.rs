use serde::{Deserialize, Serialize};

use crate::error::{PropSearchError, Result};

/// A numeric filter as received from a loosely-typed caller.
///
/// Callers (query strings, LLM tool arguments, JSON bodies) send either native
/// numbers or numeric strings. The value is only interpreted during
/// normalization, so a bad value is reported with the field it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericArg {
    Number(serde_json::Number),
    Text(String),
}

impl NumericArg {
    /// Parse to a non-negative integer, naming `field` on failure.
    pub fn to_u64(&self, field: &str) -> Result<u64> {
        match self {
            Self::Number(n) => {
                if let Some(v) = n.as_u64() {
                    return Ok(v);
                }
                match n.as_f64() {
                    Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
                        Ok(f as u64)
                    }
                    Some(f) if f < 0.0 => Err(PropSearchError::invalid_argument(
                        field,
                        format!("must be a non-negative integer, got {}", n),
                    )),
                    _ => Err(PropSearchError::invalid_argument(
                        field,
                        format!("must be an integer, got {}", n),
                    )),
                }
            }
            Self::Text(s) => {
                let trimmed = s.trim();
                if let Ok(v) = trimmed.parse::<u64>() {
                    return Ok(v);
                }
                if trimmed.parse::<i64>().is_ok() {
                    return Err(PropSearchError::invalid_argument(
                        field,
                        format!("must be a non-negative integer, got {:?}", s),
                    ));
                }
                Err(PropSearchError::invalid_argument(
                    field,
                    format!("must be an integer, got {:?}", s),
                ))
            }
        }
    }
}

impl From<u64> for NumericArg {
    fn from(v: u64) -> Self {
        Self::Number(v.into())
    }
}

impl From<&str> for NumericArg {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for NumericArg {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Loosely-typed search criteria, as accepted from any caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default)]
    pub city: String,
    /// Two-letter state code, any case.
    #[serde(default)]
    pub state: String,
    /// Only USA listings exist upstream; anything else is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<NumericArg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<NumericArg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<NumericArg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<NumericArg>,
    /// Page size.
    #[serde(default, alias = "page_size", skip_serializing_if = "Option::is_none")]
    pub size: Option<NumericArg>,
    /// Opaque continuation token from a previous result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl SearchCriteria {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            ..Default::default()
        }
    }

    /// Criteria used when natural-language extraction yields nothing usable.
    pub fn fallback() -> Self {
        Self {
            country: Some("USA".into()),
            ..Self::new("Seattle", "WA")
        }
    }

    pub fn with_price_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_price = min.map(NumericArg::from);
        self.max_price = max.map(NumericArg::from);
        self
    }

    /// Whether both location fields carry something other than whitespace.
    pub fn has_location(&self) -> bool {
        !self.city.trim().is_empty() && !self.state.trim().is_empty()
    }

    /// Overlay `self` on `base`: every field set here wins, the rest come from `base`.
    pub fn overriding(self, base: SearchCriteria) -> SearchCriteria {
        let pick = |s: String, b: String| if s.trim().is_empty() { b } else { s };
        SearchCriteria {
            city: pick(self.city, base.city),
            state: pick(self.state, base.state),
            country: self.country.or(base.country),
            min_price: self.min_price.or(base.min_price),
            max_price: self.max_price.or(base.max_price),
            bedrooms: self.bedrooms.or(base.bedrooms),
            bathrooms: self.bathrooms.or(base.bathrooms),
            size: self.size.or(base.size),
            cursor: self.cursor.or(base.cursor),
        }
    }
}
