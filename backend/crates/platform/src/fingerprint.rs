//! Device signal hashing
//!
//! Reduces browser/environment signals to a short token. The token is a
//! coarse anti-abuse signal only: it is trivially spoofable and must never be
//! used to authenticate anyone.

use axum::http::{HeaderMap, header};
use serde::Deserialize;

const SEPARATOR: &str = "|||";

/// Environment signals describing one browser profile
///
/// Every field is optional at the source; missing values become empty
/// strings so that collection never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSignals {
    pub user_agent: String,
    pub language: String,
    pub color_depth: String,
    /// `{width}x{height}`
    pub screen: String,
    /// Minutes from UTC as reported by the browser (`-480` for UTC+8)
    pub timezone_offset: String,
    /// Canvas rendering artifact (data URL or its digest)
    pub canvas: String,
}

/// Signals reported by the browser itself, merged with request headers
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportedSignals {
    pub color_depth: Option<u32>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub timezone_offset: Option<i32>,
    pub canvas: Option<String>,
}

impl DeviceSignals {
    /// Collect signals from request headers plus client-reported fields
    pub fn collect(headers: &HeaderMap, reported: &ReportedSignals) -> Self {
        let user_agent = header_str(headers, header::USER_AGENT);
        let language = header_str(headers, header::ACCEPT_LANGUAGE)
            .split(',')
            .next()
            .map(|lang| lang.split(';').next().unwrap_or_default().trim().to_string())
            .unwrap_or_default();

        let screen = match (reported.screen_width, reported.screen_height) {
            (Some(w), Some(h)) => format!("{w}x{h}"),
            _ => String::new(),
        };

        Self {
            user_agent,
            language,
            color_depth: reported.color_depth.map(|d| d.to_string()).unwrap_or_default(),
            screen,
            timezone_offset: reported
                .timezone_offset
                .map(|o| o.to_string())
                .unwrap_or_default(),
            canvas: reported.canvas.clone().unwrap_or_default(),
        }
    }

    /// Joined signal string fed to the hash
    pub fn canonical(&self) -> String {
        [
            self.user_agent.as_str(),
            self.language.as_str(),
            self.color_depth.as_str(),
            self.screen.as_str(),
            self.timezone_offset.as_str(),
            self.canvas.as_str(),
        ]
        .join(SEPARATOR)
    }

    /// Short device token derived from the signals
    pub fn token(&self) -> String {
        fingerprint_hash(&self.canonical())
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// 32-bit multiplicative string hash (`h * 31 + c` over UTF-16 units), rendered
/// as the absolute value in lowercase base 36.
///
/// Tokens are compatible with the ones browsers already hold from the
/// storefront's client-side scripts.
pub fn fingerprint_hash(input: &str) -> String {
    let hash = input
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(i32::from(unit))
        });
    to_base36(i64::from(hash).unsigned_abs())
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_hash_known_values() {
        assert_eq!(fingerprint_hash(""), "0");
        assert_eq!(fingerprint_hash("a"), "2p");
        assert_eq!(fingerprint_hash("hello"), "1n1e4y");
        assert_eq!(
            fingerprint_hash("Mozilla/5.0|||zh-TW|||24|||1920x1080|||-480|||"),
            "kjv3xq"
        );
    }

    #[test]
    fn test_hash_handles_negative_wrap() {
        // Long inputs overflow 32 bits; result must still be a plain base-36 token
        let token = fingerprint_hash(&"z".repeat(500));
        assert!(!token.is_empty());
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_collect_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-TW,zh;q=0.9,en;q=0.8"),
        );
        let reported = ReportedSignals {
            color_depth: Some(24),
            screen_width: Some(1920),
            screen_height: Some(1080),
            timezone_offset: Some(-480),
            canvas: None,
        };

        let signals = DeviceSignals::collect(&headers, &reported);
        assert_eq!(signals.language, "zh-TW");
        assert_eq!(
            signals.canonical(),
            "Mozilla/5.0|||zh-TW|||24|||1920x1080|||-480|||"
        );
        assert_eq!(signals.token(), "kjv3xq");
    }

    #[test]
    fn test_collect_never_fails_without_signals() {
        let signals = DeviceSignals::collect(&HeaderMap::new(), &ReportedSignals::default());
        assert_eq!(signals, DeviceSignals::default());
        assert_eq!(signals.canonical(), "|||||||||||||||");
        assert!(!signals.token().is_empty());
    }
}
