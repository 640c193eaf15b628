//! Minimal request cookie helpers

use std::collections::HashMap;

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};

/// Cookies sent with a request, values URL-decoded.
///
/// When a name repeats, the first occurrence wins.
pub fn request_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else {
            continue;
        };
        for pair in raw.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            cookies
                .entry(name.to_string())
                .or_insert_with(|| decode(value.trim()));
        }
    }
    cookies
}

fn decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|v| v.into_owned())
        .unwrap_or(raw)
}

/// `Set-Cookie` value for a site-wide cookie living `max_age` from `now`.
///
/// `Expires` is left out when `now + max_age` is not a representable date;
/// `Max-Age` alone still bounds the cookie.
pub fn set_cookie(
    name: &str,
    value: &str,
    now: DateTime<Utc>,
    max_age: Duration,
) -> Option<HeaderValue> {
    let mut cookie = format!("{}={}", name, urlencoding::encode(value));
    if let Some(expires) = now.checked_add_signed(max_age) {
        cookie.push_str(&format!(
            "; Expires={}",
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
    }
    cookie.push_str(&format!("; Max-Age={}; Path=/", max_age.num_seconds()));
    HeaderValue::from_str(&cookie).ok()
}
