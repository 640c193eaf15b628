//! User agent heuristics
//!
//! Three stateless predicates over a user agent string, shared by the client
//! session tracker and the server ingest endpoint:
//!
//! - [`is_bot`]: conservative automated-client filter
//! - [`classify_device`]: ordered first-match-wins device classification
//! - [`browser_name`]: coarse browser family, reported by the client
//!
//! ## Device rule order
//!
//! [`DEVICE_RULES`] is evaluated top to bottom and the first matching rule
//! wins. The order is part of the contract: Android tablets carry "android"
//! without "mobile", so the Tablet rule must run before the Mobile rule, which
//! also matches "android".

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::DeviceClass;

static BOT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bot|crawl|spider|headless").expect("valid bot pattern"));

static TABLET_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"ipad|tablet|kindle|playbook|silk|windows ce|hpwos").expect("valid tablet pattern")
});

static MOBILE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"mobi|iphone|android|blackberry|opera mini|windows phone|iemobile|fennec|minimo|symbian|smartphone|palm|up\.browser|up\.link|wap|midp|mobile",
    )
    .expect("valid mobile pattern")
});

static DESKTOP_KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"windows|macintosh|linux|x11").expect("valid desktop pattern"));

/// Returns true when the user agent looks like an automated client.
///
/// False positives are accepted; a matching visitor is simply not tracked.
pub fn is_bot(user_agent: &str) -> bool {
    BOT_PATTERN.is_match(user_agent)
}

/// One entry of the ordered device classification table.
pub struct DeviceRule {
    pub class: DeviceClass,
    matches: fn(&str) -> bool,
}

impl DeviceRule {
    /// `ua` must already be lowercased.
    pub fn matches(&self, ua: &str) -> bool {
        (self.matches)(ua)
    }
}

/// Device rules in evaluation order. See the module docs before reordering.
pub static DEVICE_RULES: [DeviceRule; 3] = [
    DeviceRule {
        class: DeviceClass::Tablet,
        matches: is_tablet,
    },
    DeviceRule {
        class: DeviceClass::Mobile,
        matches: is_mobile,
    },
    DeviceRule {
        class: DeviceClass::Desktop,
        matches: is_desktop,
    },
];

/// "android" with no "mobile" anywhere after it counts as a tablet.
fn is_tablet(ua: &str) -> bool {
    if TABLET_KEYWORDS.is_match(ua) {
        return true;
    }
    ua.rfind("android")
        .map(|idx| !ua[idx..].contains("mobile"))
        .unwrap_or(false)
}

fn is_mobile(ua: &str) -> bool {
    MOBILE_KEYWORDS.is_match(ua)
}

fn is_desktop(ua: &str) -> bool {
    DESKTOP_KEYWORDS.is_match(ua)
}

/// Classify a user agent into a [`DeviceClass`].
///
/// Empty input and input matching no rule both yield `Unknown`.
pub fn classify_device(user_agent: &str) -> DeviceClass {
    if user_agent.is_empty() {
        return DeviceClass::Unknown;
    }
    let ua = user_agent.to_lowercase();

    DEVICE_RULES
        .iter()
        .find(|rule| rule.matches(&ua))
        .map(|rule| rule.class)
        .unwrap_or(DeviceClass::Unknown)
}

/// Coarse browser family name as reported in `TrackingEvent.browser`.
///
/// Edge is checked first because its user agent also contains "chrome".
pub fn browser_name(user_agent: &str) -> &'static str {
    let ua = user_agent.to_lowercase();
    let chromium = ua.contains("chrome") || ua.contains("crios");

    if ua.contains("edg") {
        "Edge"
    } else if chromium {
        "Chrome"
    } else if ua.contains("firefox") {
        "Firefox"
    } else if ua.contains("safari") {
        "Safari"
    } else {
        "Unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";
    const ANDROID_PHONE: &str = "Mozilla/5.0 (Linux; Android 10; Mobile; rv:68.0) Gecko/68.0 Firefox/68.0";
    const ANDROID_TABLET: &str = "Mozilla/5.0 (Linux; Android 10; Tablet; rv:68.0) Gecko/68.0 Firefox/68.0";
    const ANDROID_NO_HINT: &str = "Mozilla/5.0 (Linux; Android 13; SM-X700) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
    const WINDOWS_CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const WINDOWS_EDGE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const IPHONE_SAFARI: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const MAC_FIREFOX: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.1; rv:121.0) Gecko/20100101 Firefox/121.0";

    #[test]
    fn test_bot_patterns_case_insensitive() {
        assert!(is_bot("Googlebot/2.1 (+http://www.google.com/bot.html)"));
        assert!(is_bot("Mozilla/5.0 (compatible; BOT)"));
        assert!(is_bot("SomeCrawler/1.0"));
        assert!(is_bot("Baiduspider"));
        assert!(is_bot("Mozilla/5.0 HeadlessChrome/120.0"));
        assert!(!is_bot(WINDOWS_CHROME));
        assert!(!is_bot(""));
    }

    #[test]
    fn test_classify_examples() {
        assert_eq!(classify_device(IPAD), DeviceClass::Tablet);
        assert_eq!(classify_device(ANDROID_PHONE), DeviceClass::Mobile);
        assert_eq!(classify_device(ANDROID_TABLET), DeviceClass::Tablet);
        assert_eq!(classify_device(WINDOWS_CHROME), DeviceClass::Desktop);
        assert_eq!(classify_device(""), DeviceClass::Unknown);
    }

    #[test]
    fn test_android_without_mobile_is_tablet() {
        assert_eq!(classify_device(ANDROID_NO_HINT), DeviceClass::Tablet);
    }

    #[test]
    fn test_iphone_is_mobile() {
        assert_eq!(classify_device(IPHONE_SAFARI), DeviceClass::Mobile);
    }

    #[test]
    fn test_unmatched_is_unknown() {
        assert_eq!(classify_device("curl/8.4.0"), DeviceClass::Unknown);
    }

    #[test]
    fn test_tablet_rule_precedes_mobile_rule() {
        // Both rules match an Android tablet UA that carries no "mobile" token
        let ua = ANDROID_NO_HINT.to_lowercase();
        assert!(DEVICE_RULES[0].matches(&ua));
        assert!(DEVICE_RULES[1].matches(&ua));
        assert_eq!(DEVICE_RULES[0].class, DeviceClass::Tablet);
    }

    #[test]
    fn test_browser_names() {
        assert_eq!(browser_name(WINDOWS_EDGE), "Edge");
        assert_eq!(browser_name(WINDOWS_CHROME), "Chrome");
        assert_eq!(browser_name(MAC_FIREFOX), "Firefox");
        assert_eq!(browser_name(IPHONE_SAFARI), "Safari");
        assert_eq!(browser_name("curl/8.4.0"), "Unknown");
    }
}
