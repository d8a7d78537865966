//! Request payload validation
//!
//! The validator is a pure function over the decoded JSON payload: it
//! returns every violation it finds, in a stable order, and never touches
//! the filesystem or the browser. An empty list means the payload is safe
//! to hand to the builder.

use serde_json::Value;
use url::Url;

use crate::PaperFormat;

const OUTPUT_TYPES: [&str; 4] = ["pdf", "png", "jpeg", "jpg"];

// Fields that must carry numbers when present. margin.* is handled
// separately because it nests.
const NUMERIC_FIELDS: [&str; 5] = ["timeout", "quality", "deviceScaleFactor", "width", "height"];

const BOOLEAN_FIELDS: [&str; 2] = ["landscape", "fullPage"];

const MARGIN_SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

/// Validate a raw request payload.
///
/// Returns human-readable violations in the order the fields are checked;
/// an empty vector means the request is well-formed.
pub fn validate(payload: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let html = payload.get("html").and_then(Value::as_str).unwrap_or("");
    let url = payload.get("url").and_then(Value::as_str).unwrap_or("");

    if html.is_empty() && url.is_empty() {
        errors.push("param html or url must be provided".to_string());
    }

    if let Some(value) = payload.get("url") {
        if !value.is_null() {
            match value.as_str() {
                // Empty string is covered by the missing-content check above
                Some("") => {}
                Some(raw) => {
                    if Url::parse(raw).is_err() {
                        errors.push("url must be a valid absolute URL".to_string());
                    }
                }
                None => errors.push("url must be a valid absolute URL".to_string()),
            }
        }
    }

    if let Some(value) = present(payload, "type") {
        let ok = value
            .as_str()
            .map(|t| OUTPUT_TYPES.contains(&t))
            .unwrap_or(false);
        if !ok {
            errors.push(format!("type must be one of: {}", OUTPUT_TYPES.join(", ")));
        }
    }

    if let Some(value) = present(payload, "format") {
        let ok = value
            .as_str()
            .map(|f| f.parse::<PaperFormat>().is_ok())
            .unwrap_or(false);
        if !ok {
            errors.push(format!(
                "format must be one of: {}",
                PaperFormat::ALL.join(", ")
            ));
        }
    }

    if let Some(margin) = present(payload, "margin") {
        match margin.as_object() {
            Some(sides) => {
                for side in MARGIN_SIDES {
                    if let Some(value) = sides.get(side) {
                        if !value.is_null() && as_numeric(value).is_none() {
                            errors.push(format!("margin.{side} must be a number"));
                        }
                    }
                }
            }
            None => errors.push("margin must be an object".to_string()),
        }
    }

    for field in NUMERIC_FIELDS {
        if let Some(value) = present(payload, field) {
            if as_numeric(value).is_none() {
                errors.push(format!("{field} must be a number"));
            }
        }
    }

    for field in BOOLEAN_FIELDS {
        if let Some(value) = present(payload, field) {
            if !value.is_boolean() {
                errors.push(format!("{field} must be a boolean (true/false)"));
            }
        }
    }

    errors
}

// A field set to JSON null counts as absent.
fn present<'a>(payload: &'a Value, key: &str) -> Option<&'a Value> {
    payload.get(key).filter(|v| !v.is_null())
}

/// Numeric in the loose sense the original API accepted: a JSON number, or
/// a string that parses as one. Booleans and everything else are rejected.
pub(crate) fn as_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
