use propsearch_common::config::SearchDefaults;
use propsearch_common::types::{
    NumericArg, SearchCriteria, UpstreamPayload, ORDER_DESC, SORT_BY_LAST_UPDATED,
    STATUS_FOR_SALE,
};
use propsearch_common::{PropSearchError, Result};

/// Build the canonical listing API payload from loosely-typed criteria.
///
/// Optional filters are carried only when provided; a provided `0` is kept.
/// Nothing is sent anywhere, so a bad argument never costs a network call.
pub fn normalize(criteria: &SearchCriteria, defaults: &SearchDefaults) -> Result<UpstreamPayload> {
    let city = required(&criteria.city, "city")?;
    let state = required(&criteria.state, "state")?;

    if let Some(country) = criteria.country.as_deref().map(str::trim) {
        if !country.is_empty()
            && !country.eq_ignore_ascii_case("usa")
            && !country.eq_ignore_ascii_case("us")
        {
            return Err(PropSearchError::invalid_argument(
                "country",
                format!("only USA listings are available, got {:?}", country),
            ));
        }
    }

    let min_price = parse(&criteria.min_price, "min_price")?;
    let max_price = parse(&criteria.max_price, "max_price")?;
    let bedroom = parse(&criteria.bedrooms, "bedrooms")?;
    let bathroom = parse(&criteria.bathrooms, "bathrooms")?;

    let size = match parse(&criteria.size, "size")? {
        Some(0) => {
            return Err(PropSearchError::invalid_argument(
                "size",
                "must be a positive integer",
            ))
        }
        Some(n) => n,
        None => u64::from(defaults.default_page_size),
    };

    if let (Some(min), Some(max)) = (min_price, max_price) {
        if min > max {
            tracing::warn!(min_price = min, max_price = max, "min_price exceeds max_price");
        }
    }

    Ok(UpstreamPayload {
        sort_by: SORT_BY_LAST_UPDATED.into(),
        order_by: ORDER_DESC.into(),
        searched_address_formatted: UpstreamPayload::format_address(city, state),
        property_status: STATUS_FOR_SALE.into(),
        output: defaults.output_fields.clone(),
        image_count: defaults.image_count,
        size,
        allowed_mls: defaults.allowed_mls.clone(),
        min_price,
        max_price,
        bedroom,
        bathroom,
        cursor: criteria.cursor.clone(),
    })
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(PropSearchError::invalid_argument(field, "is required"))
    } else {
        Ok(trimmed)
    }
}

fn parse(value: &Option<NumericArg>, field: &str) -> Result<Option<u64>> {
    value.as_ref().map(|v| v.to_u64(field)).transpose()
}
