use chambers_api::SiteIdentity;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

/// Fixed-window limits applied per client.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    /// Hard cap on tracked clients. Expired windows are purged first, then the oldest live ones.
    pub max_tracked_keys: usize,
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
            max_tracked_keys: 10_000,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub max_body_bytes: usize,
    pub max_upload_bytes: usize,
    pub rate_limit: RateLimitConfig,
    pub enable_rate_limit: bool,
    pub cors_allowed_origins: Vec<String>,
    pub enable_audit_log: bool,
    pub enable_response_compression: bool,
    pub compression_min_bytes: usize,
    pub list_cache_ttl: Duration,
    pub image_cache_ttl: Duration,
    pub shutdown_drain: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
            max_upload_bytes: 5 * 1024 * 1024,
            rate_limit: RateLimitConfig::default(),
            enable_rate_limit: true,
            cors_allowed_origins: Vec::new(),
            enable_audit_log: false,
            enable_response_compression: true,
            compression_min_bytes: 4096,
            list_cache_ttl: Duration::from_secs(60),
            image_cache_ttl: Duration::from_secs(31_536_000),
            shutdown_drain: Duration::from_millis(5000),
        }
    }
}

/// Firm identity rendered into every public page.
#[derive(Debug, Clone, Serialize)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    pub description: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Chambers".to_string(),
            base_url: "http://localhost:8080".to_string(),
            description: "Independent law firm advising businesses and individuals.".to_string(),
            contact_email: "contact@example.com".to_string(),
            contact_phone: String::new(),
            address: String::new(),
        }
    }
}

impl SiteConfig {
    #[must_use]
    pub fn identity(&self) -> SiteIdentity {
        SiteIdentity {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/chambers.sqlite"),
            upload_dir: PathBuf::from("data/uploads"),
        }
    }
}

/// Admin credentials. Secrets are never serialized.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub admin_token: Option<String>,
    pub session_secret: Option<String>,
    pub session_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_token: None,
            session_secret: None,
            session_ttl: Duration::from_secs(8 * 3600),
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self {
            admin_token: Some(token.to_string()),
            ..Self::default()
        }
    }

    /// Session cookies are signed with the dedicated secret, or the admin
    /// token when none is configured.
    #[must_use]
    pub fn signing_key(&self) -> Option<&str> {
        self.session_secret
            .as_deref()
            .or(self.admin_token.as_deref())
            .filter(|k| !k.is_empty())
    }
}

pub const MIN_ADMIN_TOKEN_LEN: usize = 16;

pub fn validate_startup_config(
    api: &ApiConfig,
    site: &SiteConfig,
    auth: &AuthConfig,
) -> Result<(), String> {
    if api.max_body_bytes == 0 || api.max_upload_bytes == 0 {
        return Err("body and upload limits must be > 0".to_string());
    }
    if api.rate_limit.max_requests == 0 || api.rate_limit.window.is_zero() {
        return Err("rate limit requires max_requests > 0 and a non-zero window".to_string());
    }
    if api.rate_limit.max_tracked_keys == 0 {
        return Err("rate limit max_tracked_keys must be > 0".to_string());
    }
    if site.name.trim().is_empty() {
        return Err("site name must not be empty".to_string());
    }
    if !(site.base_url.starts_with("http://") || site.base_url.starts_with("https://")) {
        return Err(format!(
            "site base url must be absolute http(s): {}",
            site.base_url
        ));
    }
    if let Some(token) = &auth.admin_token {
        if token.len() < MIN_ADMIN_TOKEN_LEN {
            return Err(format!(
                "admin token must be at least {MIN_ADMIN_TOKEN_LEN} characters"
            ));
        }
    }
    if auth.session_ttl.is_zero() {
        return Err("session ttl must be > 0".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthConfig {
        AuthConfig::with_token("0123456789abcdef")
    }

    #[test]
    fn defaults_pass_validation() {
        validate_startup_config(&ApiConfig::default(), &SiteConfig::default(), &auth())
            .expect("defaults are valid");
        let limits = RateLimitConfig::default();
        assert_eq!(limits.max_requests, 100);
        assert_eq!(limits.window, Duration::from_secs(900));
    }

    #[test]
    fn short_token_and_relative_url_are_rejected() {
        let weak = AuthConfig::with_token("short");
        let err = validate_startup_config(&ApiConfig::default(), &SiteConfig::default(), &weak)
            .expect_err("weak token");
        assert!(err.contains("admin token"));

        let site = SiteConfig {
            base_url: "chambers.example".to_string(),
            ..SiteConfig::default()
        };
        let err = validate_startup_config(&ApiConfig::default(), &site, &auth())
            .expect_err("relative url");
        assert!(err.contains("base url"));
    }

    #[test]
    fn zero_window_is_rejected() {
        let api = ApiConfig {
            rate_limit: RateLimitConfig {
                window: Duration::ZERO,
                ..RateLimitConfig::default()
            },
            ..ApiConfig::default()
        };
        let err = validate_startup_config(&api, &SiteConfig::default(), &auth())
            .expect_err("zero window");
        assert!(err.contains("window"));
    }

    #[test]
    fn signing_key_prefers_session_secret() {
        let mut cfg = auth();
        assert_eq!(cfg.signing_key(), Some("0123456789abcdef"));
        cfg.session_secret = Some("separate-secret".to_string());
        assert_eq!(cfg.signing_key(), Some("separate-secret"));
        assert_eq!(AuthConfig::default().signing_key(), None);
    }
}
