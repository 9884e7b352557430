//! Environment-driven runtime configuration.
//! Everything is read once at startup and carried inside `AppState`;
//! nothing here consults the environment again after boot.

/// Runtime configuration for the librarium server.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port.
    pub http_port: u16,
    /// SQLite database file path, or `sqlite::memory:` for an in-memory store.
    pub db_path: String,
    /// Whether session cookies carry the `Secure` attribute. Off for local dev.
    pub secure_cookies: bool,
    /// Lowest accepted rating value (0 or 1). Upper bound is always 5.
    pub rating_min: i64,
    /// When true, only a book's owner may change its rating; otherwise any
    /// authenticated user may rate.
    pub rate_owner_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 7878,
            db_path: "librarium.db".to_string(),
            secure_cookies: false,
            rating_min: 0,
            rate_owner_only: false,
        }
    }
}

impl Config {
    /// Build a config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Config::default();
        let http_port = std::env::var("LIBRARIUM_HTTP_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(d.http_port);
        let db_path = std::env::var("LIBRARIUM_DB").unwrap_or(d.db_path);
        let secure_cookies = std::env::var("LIBRARIUM_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(d.secure_cookies);
        // Rating policy differs between deployments; surfaced as config rather
        // than hard-coded (0..=5 vs 1..=5, owner-only vs any authenticated user).
        let rating_min = std::env::var("LIBRARIUM_RATING_MIN")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|v| *v == 0 || *v == 1)
            .unwrap_or(d.rating_min);
        let rate_owner_only = std::env::var("LIBRARIUM_RATE_OWNER_ONLY")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(d.rate_owner_only);
        Self { http_port, db_path, secure_cookies, rating_min, rate_owner_only }
    }

    /// Inclusive accepted rating range under this config.
    pub fn rating_range(&self) -> std::ops::RangeInclusive<i64> {
        self.rating_min..=5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rating_range_accepts_zero() {
        let cfg = Config::default();
        assert!(cfg.rating_range().contains(&0));
        assert!(cfg.rating_range().contains(&5));
        assert!(!cfg.rating_range().contains(&6));
    }

    #[test]
    fn one_based_rating_range_rejects_zero() {
        let cfg = Config { rating_min: 1, ..Config::default() };
        assert!(!cfg.rating_range().contains(&0));
        assert!(cfg.rating_range().contains(&1));
        assert!(cfg.rating_range().contains(&5));
    }
}
