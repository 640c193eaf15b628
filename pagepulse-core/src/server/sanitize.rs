//! Input sanitization for client-supplied fields
//!
//! Every free-text field is passed through [`sanitize_text`] before it is
//! forwarded: markup is stripped, percent-encoded octets are removed, and
//! whitespace is collapsed to single spaces. Numeric fields go through
//! [`non_negative_int`], booleans through [`lenient_bool`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script[^>]*?>.*?</script>|<style[^>]*?>.*?</style>")
        .expect("valid script/style pattern")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\r\n\t ]+").expect("valid whitespace pattern"));

static OCTET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%[a-fA-F0-9]{2}").expect("valid octet pattern"));

/// Sanitize a single-line text field.
pub fn sanitize_text(input: &str) -> String {
    let mut text = input.to_string();

    if text.contains('<') {
        text = SCRIPT_OR_STYLE.replace_all(&text, "").into_owned();
        text = TAG.replace_all(&text, "").into_owned();
        // A stray '<' that opens no tag
        text = text.replace('<', "&lt;");
    }

    let text: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\r' | '\n' | '\t'))
        .collect();
    let text = WHITESPACE.replace_all(&text, " ");

    let mut text = text.trim().to_string();
    // Removing one octet can expose another ("%%4141"), so repeat until stable
    while OCTET.is_match(&text) {
        text = OCTET.replace_all(&text, "").into_owned();
    }
    text.trim().to_string()
}

/// Text view of a JSON value: strings as-is, numbers and booleans rendered,
/// anything else absent.
pub fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Absolute integer value of a JSON number or numeric string; anything
/// unparseable is 0.
pub fn non_negative_int(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i64::unsigned_abs)
            .or_else(|| n.as_u64())
            .or_else(|| n.as_f64().map(|f| f.trunc().abs() as u64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(i64::unsigned_abs)
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc().abs() as u64)
                })
                .unwrap_or(0)
        }
        Value::Bool(b) => u64::from(*b),
        _ => 0,
    }
}

/// Boolean view of a JSON value: `true`, non-zero numbers, and the strings
/// `true`, `1`, `yes`, `on` (any case) are true.
pub fn lenient_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        _ => false,
    }
}
