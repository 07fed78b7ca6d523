//! Field readers for JSON request bodies. Each returns `Error::BadRequest`
//! naming the offending key.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde_json::Value as JsonValue;

fn field<'a>(body: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    body.get(key).filter(|v| !v.is_null())
}

pub fn required_str(body: &JsonValue, key: &str) -> Result<String> {
    match field(body, key) {
        None => Err(Error::bad_request(format!("missing {}", key))),
        Some(v) => {
            let s = v
                .as_str()
                .ok_or_else(|| Error::bad_request(format!("{} must be string", key)))?
                .trim()
                .to_string();
            if s.is_empty() {
                return Err(Error::bad_request(format!("{} must not be empty", key)));
            }
            Ok(s)
        }
    }
}

/// Missing, null and blank strings all read as `None`.
pub fn opt_str(body: &JsonValue, key: &str) -> Result<Option<String>> {
    match field(body, key) {
        None => Ok(None),
        Some(v) => {
            let s = v
                .as_str()
                .ok_or_else(|| Error::bad_request(format!("{} must be string or null", key)))?
                .trim()
                .to_string();
            Ok(if s.is_empty() { None } else { Some(s) })
        }
    }
}

/// Free text that defaults to the empty string.
pub fn text(body: &JsonValue, key: &str) -> Result<String> {
    match field(body, key) {
        None => Ok(String::new()),
        Some(v) => v
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::bad_request(format!("{} must be string", key))),
    }
}

pub fn parse_date(raw: &str, key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        Error::bad_request(format!("{} must be a YYYY-MM-DD date (got '{}')", key, raw))
    })
}

pub fn opt_date(body: &JsonValue, key: &str) -> Result<Option<NaiveDate>> {
    match opt_str(body, key)? {
        None => Ok(None),
        Some(raw) => parse_date(&raw, key).map(Some),
    }
}

pub fn required_date(body: &JsonValue, key: &str) -> Result<NaiveDate> {
    let raw = required_str(body, key)?;
    parse_date(&raw, key)
}

pub fn opt_i64(body: &JsonValue, key: &str) -> Result<Option<i64>> {
    match field(body, key) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::bad_request(format!("{} must be integer or null", key))),
    }
}

pub fn opt_f64(body: &JsonValue, key: &str) -> Result<Option<f64>> {
    match field(body, key) {
        None => Ok(None),
        Some(JsonValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| Error::bad_request(format!("{} must be a number", key))),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| Error::bad_request(format!("{} must be a number", key))),
    }
}

pub fn bool_or(body: &JsonValue, key: &str, default: bool) -> Result<bool> {
    match field(body, key) {
        None => Ok(default),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| Error::bad_request(format!("{} must be boolean", key))),
    }
}

/// Array of id strings; `None` when the key is absent so callers can tell
/// "leave as is" from "clear".
pub fn opt_id_list(body: &JsonValue, key: &str) -> Result<Option<Vec<String>>> {
    let Some(raw) = body.get(key) else {
        return Ok(None);
    };
    if raw.is_null() {
        return Ok(Some(Vec::new()));
    }
    let arr = raw
        .as_array()
        .ok_or_else(|| Error::bad_request(format!("{} must be array of ids", key)))?;
    let mut out: Vec<String> = Vec::with_capacity(arr.len());
    for item in arr {
        let s = item
            .as_str()
            .ok_or_else(|| Error::bad_request(format!("{} must be array of ids", key)))?
            .trim()
            .to_string();
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    Ok(Some(out))
}

pub fn id_list(body: &JsonValue, key: &str) -> Result<Vec<String>> {
    Ok(opt_id_list(body, key)?.unwrap_or_default())
}

/// Array of arbitrary JSON values, defaulting to `[]`.
pub fn json_array(body: &JsonValue, key: &str) -> Result<JsonValue> {
    match field(body, key) {
        None => Ok(JsonValue::Array(Vec::new())),
        Some(v) if v.is_array() => Ok(v.clone()),
        Some(_) => Err(Error::bad_request(format!("{} must be an array", key))),
    }
}

/// JSON object, defaulting to `{}`.
pub fn json_object(body: &JsonValue, key: &str) -> Result<JsonValue> {
    match field(body, key) {
        None => Ok(JsonValue::Object(Default::default())),
        Some(v) if v.is_object() => Ok(v.clone()),
        Some(_) => Err(Error::bad_request(format!("{} must be an object", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_optional_strings_read_as_none() {
        let body = json!({ "a": "  ", "b": null, "c": "x" });
        assert_eq!(opt_str(&body, "a").expect("a"), None);
        assert_eq!(opt_str(&body, "b").expect("b"), None);
        assert_eq!(opt_str(&body, "c").expect("c"), Some("x".to_string()));
        assert_eq!(opt_str(&body, "missing").expect("missing"), None);
    }

    #[test]
    fn id_lists_distinguish_absent_from_null() {
        let body = json!({ "a": null, "b": ["x", "x", " y "] });
        assert_eq!(opt_id_list(&body, "missing").expect("missing"), None);
        assert_eq!(opt_id_list(&body, "a").expect("a"), Some(vec![]));
        assert_eq!(
            opt_id_list(&body, "b").expect("b"),
            Some(vec!["x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn dates_must_be_iso() {
        let body = json!({ "ok": "2024-09-01", "bad": "01/09/2024" });
        assert!(opt_date(&body, "ok").expect("ok").is_some());
        assert!(matches!(opt_date(&body, "bad"), Err(Error::BadRequest(_))));
    }

    #[test]
    fn session_length_accepts_decimal_strings() {
        let body = json!({ "a": "1.5", "b": 2 });
        assert_eq!(opt_f64(&body, "a").expect("a"), Some(1.5));
        assert_eq!(opt_f64(&body, "b").expect("b"), Some(2.0));
    }
}
