//! Record key normalization
//!
//! AWIN returns camelCase keys (`transactionDate`, `advertiserId`); records
//! are emitted with snake_case keys. Conversion is recursive through objects
//! and arrays, leaves scalars untouched, and is idempotent.

use crate::types::{JsonObject, JsonValue};
use regex::Regex;
use std::sync::LazyLock;

/// Splits an acronym from a following capitalized word: `HTTPResponse`
static ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid regex"));

/// Splits a lowercase letter or digit from a following capital: `saleAmount`
static WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z\d])([A-Z])").expect("valid regex"));

/// Convert a single key to snake_case
///
/// Keys that are entirely uppercase or numeric are returned as-is.
pub fn decamelize_key(key: &str) -> String {
    let has_lower = key.chars().any(char::is_lowercase);
    if !has_lower {
        return key.to_string();
    }

    let split = ACRONYM_BOUNDARY.replace_all(key, "${1}_${2}");
    let split = WORD_BOUNDARY.replace_all(&split, "${1}_${2}");
    split.to_lowercase()
}

/// Recursively convert every object key in `value` to snake_case
pub fn decamelize(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| (decamelize_key(&k), decamelize(v)))
                .collect::<JsonObject>(),
        ),
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(decamelize).collect()),
        scalar => scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("transactionDate", "transaction_date" ; "simple camel")]
    #[test_case("advertiserId", "advertiser_id" ; "trailing id")]
    #[test_case("clickRefs", "click_refs" ; "plural")]
    #[test_case("paidToPublisher", "paid_to_publisher" ; "three words")]
    #[test_case("HTTPResponse", "http_response" ; "leading acronym")]
    #[test_case("siteURL", "site_url" ; "trailing acronym")]
    #[test_case("ipHash2Value", "ip_hash2_value" ; "digit boundary")]
    #[test_case("transaction_date", "transaction_date" ; "already snake")]
    #[test_case("ID", "ID" ; "all upper kept")]
    #[test_case("42", "42" ; "numeric kept")]
    #[test_case("", "" ; "empty")]
    fn test_decamelize_key(input: &str, expected: &str) {
        assert_eq!(decamelize_key(input), expected);
    }

    #[test]
    fn test_decamelize_nested() {
        let record = json!({
            "transactionId": 1,
            "saleAmount": {"amount": 10.5, "currencyCode": "EUR"},
            "transactionParts": [
                {"commissionGroupId": 7, "partAmount": 1},
                "scalarValue"
            ],
            "clickRefs": null
        });

        assert_eq!(
            decamelize(record),
            json!({
                "transaction_id": 1,
                "sale_amount": {"amount": 10.5, "currency_code": "EUR"},
                "transaction_parts": [
                    {"commission_group_id": 7, "part_amount": 1},
                    "scalarValue"
                ],
                "click_refs": null
            })
        );
    }

    #[test]
    fn test_decamelize_is_idempotent() {
        let record = json!({
            "accountId": 1,
            "deep": {"deeperStill": [{"deepestKey": {"leafValue": true}}]}
        });

        let once = decamelize(record);
        let twice = decamelize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_decamelize_scalars_pass_through() {
        assert_eq!(decamelize(json!("camelCase")), json!("camelCase"));
        assert_eq!(decamelize(json!(3)), json!(3));
        assert_eq!(decamelize(json!(null)), json!(null));
    }
}
