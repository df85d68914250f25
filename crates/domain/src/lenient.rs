//! Readers for fields that historical documents hold in mixed types.
//!
//! Catalog and order documents were written by several storefront versions,
//! so stock may arrive as `4`, `4.0` or `"4"` and sizes as `38` or `"38"`.
//! These helpers are used through `#[serde(deserialize_with = ...)]`.

use document_store::Document;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Reads a stock count from a JSON value. Fractions round down.
///
/// Returns `None` when the value is not numeric.
pub fn stock_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
        }
        _ => None,
    }
}

/// Reads the `stock` field of a product or variant record.
///
/// Returns `None` when the field is absent or not numeric.
pub fn read_stock(doc: &Document) -> Option<i64> {
    doc.field("stock").and_then(stock_value)
}

fn text_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Stock count; missing or non-numeric values read as zero.
pub fn stock<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(stock_value(&value).unwrap_or(0))
}

/// Discount percentage clamped to 0..=100; unreadable values read as zero.
pub fn percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let percent = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(percent
        .filter(|p| p.is_finite())
        .map_or(0, |p| p.round().clamp(0.0, 100.0) as u8))
}

/// Text field that may be stored as a number or be null.
pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(text_value(value).unwrap_or_default())
}

/// Optional text field that may be stored as a number.
pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(text_value(value))
}
