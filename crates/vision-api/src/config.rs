//! API configuration.

use std::path::PathBuf;

use tracing::warn;
use vision_models::{OccurrenceThresholds, SummaryConfig};

/// Credentials guarding the administrative routes.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Rate limit burst
    pub rate_limit_burst: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Base of public image URLs; derived from the request when unset
    pub public_base_url: Option<String>,
    /// Directory of the static web UI
    pub static_dir: PathBuf,
    /// Admin credentials; admin routes are open when unset
    pub admin: Option<AdminCredentials>,
    /// Summary thresholds
    pub summary: SummaryConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            rate_limit_burst: 20,
            max_body_size: 10 * 1024 * 1024, // 10MB
            environment: "development".to_string(),
            public_base_url: None,
            static_dir: PathBuf::from("public"),
            admin: None,
            summary: SummaryConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Read one category of summary thresholds, e.g. `SUMMARY_FACE_*`.
fn thresholds_from_env(prefix: &str, defaults: OccurrenceThresholds) -> OccurrenceThresholds {
    let default_max = defaults.maximum_occurrence_count.unwrap_or(0);
    let max = env_parse(&format!("{}_MAX_COUNT", prefix), default_max);

    OccurrenceThresholds {
        minimum_occurrence: env_parse(&format!("{}_MIN_OCCURRENCE", prefix), defaults.minimum_occurrence),
        minimum_score: env_parse(&format!("{}_MIN_SCORE", prefix), defaults.minimum_score),
        minimum_score_occurrence: env_parse(
            &format!("{}_MIN_SCORE_OCCURRENCE", prefix),
            defaults.minimum_score_occurrence,
        ),
        // 0 lifts the cap
        maximum_occurrence_count: (max > 0).then_some(max),
    }
}

/// Normalize an absolute http(s) base URL without trailing slash.
fn parse_base_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match url::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Some(url.as_str().trim_end_matches('/').to_string())
        }
        _ => {
            warn!("Ignoring invalid PUBLIC_BASE_URL={:?}", raw);
            None
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let admin = std::env::var("ADMIN_USERNAME")
            .ok()
            .filter(|u| !u.is_empty())
            .map(|username| AdminCredentials {
                username,
                password: std::env::var("ADMIN_PASSWORD").unwrap_or_default(),
            });

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT", defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS", defaults.rate_limit_rps),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            max_body_size: env_parse("MAX_BODY_SIZE", defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .ok()
                .and_then(|raw| parse_base_url(&raw)),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            admin,
            summary: SummaryConfig {
                faces: thresholds_from_env("SUMMARY_FACE", OccurrenceThresholds::FACES),
                keywords: thresholds_from_env("SUMMARY_KEYWORD", OccurrenceThresholds::KEYWORDS),
            },
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "API_PORT",
        "ADMIN_USERNAME",
        "ADMIN_PASSWORD",
        "PUBLIC_BASE_URL",
        "STATIC_DIR",
        "SUMMARY_FACE_MIN_OCCURRENCE",
        "SUMMARY_FACE_MIN_SCORE",
        "SUMMARY_FACE_MAX_COUNT",
        "SUMMARY_KEYWORD_MAX_COUNT",
    ];

    fn clear_env() {
        for key in VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ApiConfig::from_env();

        assert_eq!(config.port, 8000);
        assert!(config.admin.is_none());
        assert!(config.public_base_url.is_none());
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.summary, SummaryConfig::default());
    }

    #[test]
    #[serial]
    fn test_summary_thresholds_from_env() {
        clear_env();
        std::env::set_var("SUMMARY_FACE_MIN_OCCURRENCE", "4");
        std::env::set_var("SUMMARY_FACE_MIN_SCORE", "0.9");
        std::env::set_var("SUMMARY_FACE_MAX_COUNT", "not-a-number");
        std::env::set_var("SUMMARY_KEYWORD_MAX_COUNT", "0");

        let config = ApiConfig::from_env();
        assert_eq!(config.summary.faces.minimum_occurrence, 4);
        assert_eq!(config.summary.faces.minimum_score, 0.9);
        assert_eq!(config.summary.faces.minimum_score_occurrence, 2);
        assert_eq!(config.summary.faces.maximum_occurrence_count, Some(5));
        assert_eq!(config.summary.keywords.maximum_occurrence_count, None);
        clear_env();
    }

    #[test]
    fn test_parse_base_url() {
        assert_eq!(parse_base_url("http://localhost:8000/").as_deref(), Some("http://localhost:8000"));
        assert_eq!(
            parse_base_url(" https://cdn.example.com/vision/ ").as_deref(),
            Some("https://cdn.example.com/vision")
        );
        assert_eq!(parse_base_url("ftp://example.com"), None);
        assert_eq!(parse_base_url("not a url"), None);
        assert_eq!(parse_base_url(""), None);
    }

    #[test]
    #[serial]
    fn test_admin_and_public_url() {
        clear_env();
        std::env::set_var("ADMIN_USERNAME", "admin");
        std::env::set_var("ADMIN_PASSWORD", "secret");
        std::env::set_var("PUBLIC_BASE_URL", "https://vision.example.com/");

        let config = ApiConfig::from_env();
        let admin = config.admin.expect("admin credentials");
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.password, "secret");
        assert!(!format!("{:?}", admin).contains("secret"));
        assert_eq!(config.public_base_url.as_deref(), Some("https://vision.example.com"));
        clear_env();
    }
}
