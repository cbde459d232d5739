//! Cookie-backed session storage.
//!
//! Each session marker is carried in a cookie of the same name. Reading a
//! request yields a [`CookieSessionStorage`]; writes made through it are
//! turned into `Set-Cookie` headers on the response.

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use domain::services::session::SESSION_KEYS;
use domain::services::SessionStorage;
use std::collections::HashMap;

use crate::config::SessionConfig;

/// Builds and parses session marker cookies.
#[derive(Debug, Clone)]
pub struct CookieHelper {
    config: SessionConfig,
}

impl CookieHelper {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Reads the session markers carried by a request.
    pub fn read_session(&self, headers: &HeaderMap) -> CookieSessionStorage {
        let mut values = HashMap::new();
        for key in SESSION_KEYS {
            if let Some(value) = extract_cookie(headers, key) {
                values.insert(key.to_string(), decode_value(value));
            }
        }
        CookieSessionStorage {
            helper: self.clone(),
            values,
            pending: Vec::new(),
        }
    }

    /// Build a Set-Cookie header value for one marker.
    pub fn build_cookie(&self, name: &str, value: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}",
            name,
            encode_value(value),
            self.config.cookie_path,
            self.config.max_age_secs
        );
        self.push_attributes(&mut cookie);
        cookie
    }

    /// Build a Set-Cookie header value that removes a marker.
    pub fn build_clear_cookie(&self, name: &str) -> String {
        let mut cookie = format!(
            "{}=; Path={}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            name, self.config.cookie_path
        );
        self.push_attributes(&mut cookie);
        cookie
    }

    fn push_attributes(&self, cookie: &mut String) {
        cookie.push_str("; HttpOnly");
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.config.same_site));
    }
}

/// Session storage view over a request's cookies.
#[derive(Debug)]
pub struct CookieSessionStorage {
    helper: CookieHelper,
    values: HashMap<String, String>,
    pending: Vec<String>,
}

impl CookieSessionStorage {
    /// Appends a `Set-Cookie` header for every write made so far.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for cookie in &self.pending {
            if let Ok(value) = HeaderValue::from_str(cookie) {
                headers.append(SET_COOKIE, value);
            }
        }
    }
}

impl SessionStorage for CookieSessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.pending.push(self.helper.build_cookie(key, &value));
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.pending.push(self.helper.build_clear_cookie(key));
        self.values.remove(key);
    }
}

/// Extract a cookie value from request headers by name.
pub fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookie_header| cookie_header.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let (cookie_name, cookie_value) = cookie.split_once('=')?;
            (cookie_name == name).then_some(cookie_value)
        })
}

fn encode_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

fn decode_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                decoded.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::session::{LOGGED_IN_AT_KEY, ROLE_KEY, ROLL_KEY};

    fn test_config() -> SessionConfig {
        SessionConfig {
            secure: true,
            same_site: "Strict".to_string(),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_build_cookie() {
        let helper = CookieHelper::new(test_config());
        let cookie = helper.build_cookie(ROLE_KEY, "admin");

        assert!(cookie.starts_with("campuscareRole=admin"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    #[test]
    fn test_build_clear_cookie() {
        let helper = CookieHelper::new(test_config());
        let cookie = helper.build_clear_cookie(ROLL_KEY);

        assert!(cookie.starts_with("campuscareRoll=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[test]
    fn test_read_session_markers() {
        let helper = CookieHelper::new(test_config());
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static(
                "campuscareRole=user; other=x; campuscareRoll=21CS%20042; campuscareLoggedInAt=1700000000000",
            ),
        );

        let storage = helper.read_session(&headers);
        assert_eq!(storage.get(ROLE_KEY).as_deref(), Some("user"));
        assert_eq!(storage.get(ROLL_KEY).as_deref(), Some("21CS 042"));
        assert_eq!(
            storage.get(LOGGED_IN_AT_KEY).as_deref(),
            Some("1700000000000")
        );
        assert_eq!(storage.get("other"), None);
    }

    #[test]
    fn test_writes_become_set_cookie_headers() {
        let helper = CookieHelper::new(test_config());
        let mut storage = helper.read_session(&HeaderMap::new());

        storage.set(ROLL_KEY, "A; B".to_string());
        storage.remove(ROLE_KEY);

        let mut headers = HeaderMap::new();
        storage.apply(&mut headers);
        let cookies: Vec<_> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();

        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("campuscareRoll=A%3B%20B;"));
        assert!(cookies[1].contains("Max-Age=0"));
        assert_eq!(storage.get(ROLL_KEY).as_deref(), Some("A; B"));
    }

    #[test]
    fn test_malformed_escape_is_kept() {
        assert_eq!(decode_value("50%"), "50%");
        assert_eq!(decode_value("%zz"), "%zz");
        assert_eq!(decode_value(&encode_value("Hostel C/12")), "Hostel C/12");
    }
}
