//! Admin authentication: a static bearer token, or a signed session cookie
//! obtained by presenting that token once.

use crate::config::AuthConfig;
use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "chambers_session";

fn session_mac(key: &str, expires_at: i64) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).ok()?;
    mac.update(format!("{SESSION_COOKIE}\n{expires_at}\n").as_bytes());
    Some(mac)
}

/// Cookie value `<expiry unix secs>.<hmac-sha256 hex>`.
#[must_use]
pub fn issue_session(key: &str, expires_at: i64) -> Option<String> {
    let mac = session_mac(key, expires_at)?;
    Some(format!(
        "{expires_at}.{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[must_use]
pub fn verify_session(key: &str, value: &str, now: i64) -> bool {
    let Some((expiry, signature)) = value.split_once('.') else {
        return false;
    };
    let Ok(expires_at) = expiry.parse::<i64>() else {
        return false;
    };
    if expires_at <= now {
        return false;
    }
    let Ok(signature) = hex::decode(signature) else {
        return false;
    };
    session_mac(key, expires_at).is_some_and(|mac| mac.verify_slice(&signature).is_ok())
}

/// Compares digests so neither length nor content leaks through timing.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let da = Sha256::digest(a);
    let db = Sha256::digest(b);
    da.iter().zip(db.iter()).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get("authorization")?.to_str().ok()?.trim();
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[must_use]
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
}

#[must_use]
pub fn token_matches(auth: &AuthConfig, candidate: &str) -> bool {
    auth.admin_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .is_some_and(|expected| constant_time_eq(expected.as_bytes(), candidate.as_bytes()))
}

/// True when the request carries the admin token or a live session cookie.
/// Always false when no admin token is configured.
#[must_use]
pub fn is_admin(headers: &HeaderMap, auth: &AuthConfig, now: i64) -> bool {
    if auth.admin_token.as_deref().map_or(true, str::is_empty) {
        return false;
    }
    if let Some(token) = bearer_token(headers) {
        return token_matches(auth, token);
    }
    match (auth.signing_key(), session_cookie(headers)) {
        (Some(key), Some(value)) => verify_session(key, value, now),
        _ => false,
    }
}

#[must_use]
pub fn session_set_cookie(value: &str, max_age_secs: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_secs}{secure}")
}

#[must_use]
pub fn session_clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}
