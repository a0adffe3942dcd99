use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::SecurityConfig;

/// Value of the named cookie from the request's `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

fn build(name: &str, value: &str, max_age_secs: i64, security: &SecurityConfig) -> Option<HeaderValue> {
    let mut cookie = format!("{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax", name, value, max_age_secs);
    if security.secure_cookies {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` remembering the selected organization
pub fn org_cookie(organization_id: &str, security: &SecurityConfig) -> Option<HeaderValue> {
    let max_age = security.org_cookie_max_age_days * 24 * 60 * 60;
    build(&security.org_cookie_name, organization_id, max_age, security)
}

/// `Set-Cookie` carrying the access token for browser sessions
pub fn session_cookie(token: &str, max_age_secs: i64, security: &SecurityConfig) -> Option<HeaderValue> {
    build(&security.session_cookie_name, token, max_age_secs, security)
}

/// `Set-Cookie` that expires the named cookie
pub fn clear_cookie(name: &str, security: &SecurityConfig) -> Option<HeaderValue> {
    build(name, "", 0, security)
}
