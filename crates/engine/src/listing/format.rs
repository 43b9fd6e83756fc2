use std::fmt::Write;

use serde_json::Value;

use propsearch_common::types::SearchResult;

const MISSING: &str = "N/A";

/// Render a search result as a text summary for conversational callers.
///
/// Formatting only: records appear in the order received and none are dropped.
pub fn format_text(result: &SearchResult, city: &str, state: &str) -> String {
    if result.is_empty() {
        return format!(
            "No properties found in {}, {} matching your criteria.",
            city, state
        );
    }

    let mut out = format!("Found {} properties in {}, {}:\n\n", result.count, city, state);

    for record in &result.data {
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "- **{}**\n  - Price: {}\n  - Beds: {} | Baths: {}\n  - Area: {} sqft\n  - Description: {}\n\n",
            field(record.address()),
            format_price(record.price()),
            field(record.bedrooms()),
            field(record.bathrooms()),
            field(record.area()),
            field(record.descriptor()),
        );
    }

    if let Some(cursor) = result.cursor_token() {
        let _ = write!(
            out,
            "More results available. Pass cursor \"{}\" to fetch the next page.",
            cursor
        );
    }

    out
}

/// `$` plus a comma-grouped amount for numeric prices, `N/A` for anything else.
pub fn format_price(price: Option<&Value>) -> String {
    let Some(Value::Number(n)) = price else {
        return MISSING.to_string();
    };

    if let Some(v) = n.as_i64() {
        return format!("${}", group_thousands(v));
    }
    if let Some(v) = n.as_u64() {
        return format!("${}", group_digits(&v.to_string()));
    }

    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            format!("${}", group_thousands(f as i64))
        }
        Some(f) if f.is_finite() => {
            let fixed = format!("{:.2}", f.abs());
            let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
            let sign = if f < 0.0 { "-" } else { "" };
            format!("${}{}.{}", sign, group_digits(whole), cents)
        }
        _ => MISSING.to_string(),
    }
}

fn field(value: Option<&Value>) -> String {
    match value {
        None => MISSING.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn group_thousands(v: i64) -> String {
    let grouped = group_digits(&v.unsigned_abs().to_string());
    if v < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use propsearch_common::types::ListingRecord;
    use serde_json::json;

    fn result(records: Vec<Value>, cursor: Option<Value>) -> SearchResult {
        SearchResult::new(records.into_iter().map(ListingRecord::from).collect(), cursor)
    }

    #[test]
    fn test_empty_result_message() {
        let text = format_text(&result(vec![], None), "Seattle", "WA");
        assert_eq!(text, "No properties found in Seattle, WA matching your criteria.");
    }

    #[test]
    fn test_empty_result_ignores_cursor() {
        let text = format_text(&result(vec![], Some(json!("next"))), "Austin", "TX");
        assert_eq!(text, "No properties found in Austin, TX matching your criteria.");
    }

    #[test]
    fn test_full_record_block() {
        let text = format_text(
            &result(
                vec![json!({
                    "address": "123 Pine St",
                    "price": 450000,
                    "bedroom": 3,
                    "bathroom": 2.5,
                    "area": 1800,
                    "property_descriptor": "Single Family"
                })],
                None,
            ),
            "Seattle",
            "WA",
        );
        assert_eq!(
            text,
            "Found 1 properties in Seattle, WA:\n\n\
             - **123 Pine St**\n  - Price: $450,000\n  - Beds: 3 | Baths: 2.5\n  - Area: 1800 sqft\n  - Description: Single Family\n\n"
        );
    }

    #[test]
    fn test_missing_fields_render_na() {
        let text = format_text(&result(vec![json!({"price": "call for price"})], None), "Seattle", "WA");
        assert!(text.contains("- **N/A**"));
        assert!(text.contains("Price: N/A"));
        assert!(text.contains("Beds: N/A | Baths: N/A"));
        assert!(text.contains("Area: N/A sqft"));
        assert!(text.contains("Description: N/A"));
    }

    #[test]
    fn test_order_preserved_and_cursor_hint() {
        let text = format_text(
            &result(
                vec![json!({"address": "B"}), json!({"address": "A"})],
                Some(json!("tok123")),
            ),
            "Seattle",
            "WA",
        );
        let b = text.find("**B**").unwrap();
        let a = text.find("**A**").unwrap();
        assert!(b < a);
        assert!(text.ends_with("Pass cursor \"tok123\" to fetch the next page."));
    }

    #[test]
    fn test_price_formatting() {
        assert_eq!(format_price(Some(&json!(450000))), "$450,000");
        assert_eq!(format_price(Some(&json!(999))), "$999");
        assert_eq!(format_price(Some(&json!(1234567))), "$1,234,567");
        assert_eq!(format_price(Some(&json!(450000.0))), "$450,000");
        assert_eq!(format_price(Some(&json!(1234.5))), "$1,234.50");
        assert_eq!(format_price(Some(&json!("450000"))), "N/A");
        assert_eq!(format_price(None), "N/A");
    }
}
