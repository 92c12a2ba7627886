use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL; the CLI server registry takes precedence over this.
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// The inference upstream cold-starts, so predictions get a longer budget.
    pub predict_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub poll_interval_secs: u64,
    /// Delay before the reconciling fetch that follows an optimistic
    /// push-driven mutation.
    pub reconcile_delay_ms: u64,
    pub signal_path: PathBuf,
    pub signal_poll_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub enabled: bool,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("AQUA_API_BASE_URL") {
            self.api.base_url = v;
        }
        if let Ok(v) = env::var("AQUA_API_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().unwrap_or(self.api.request_timeout_secs);
        }
        if let Ok(v) = env::var("AQUA_API_PREDICT_TIMEOUT_SECS") {
            self.api.predict_timeout_secs = v.parse().unwrap_or(self.api.predict_timeout_secs);
        }

        // Session overrides
        if let Ok(v) = env::var("AQUA_SESSION_POLL_INTERVAL_SECS") {
            self.session.poll_interval_secs = v.parse().unwrap_or(self.session.poll_interval_secs);
        }
        if let Ok(v) = env::var("AQUA_SESSION_RECONCILE_DELAY_MS") {
            self.session.reconcile_delay_ms = v.parse().unwrap_or(self.session.reconcile_delay_ms);
        }
        if let Ok(v) = env::var("AQUA_SESSION_SIGNAL_PATH") {
            self.session.signal_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("AQUA_SESSION_SIGNAL_POLL_MS") {
            self.session.signal_poll_ms = v.parse().unwrap_or(self.session.signal_poll_ms);
        }

        // Realtime overrides
        if let Ok(v) = env::var("AQUA_REALTIME_ENABLED") {
            self.realtime.enabled = v.parse().unwrap_or(self.realtime.enabled);
        }
        if let Ok(v) = env::var("AQUA_REALTIME_RECONNECT_ATTEMPTS") {
            self.realtime.reconnect_attempts =
                v.parse().unwrap_or(self.realtime.reconnect_attempts);
        }
        if let Ok(v) = env::var("AQUA_REALTIME_RECONNECT_DELAY_MS") {
            self.realtime.reconnect_delay_ms =
                v.parse().unwrap_or(self.realtime.reconnect_delay_ms);
        }

        self
    }

    fn default_signal_path() -> PathBuf {
        env::temp_dir().join("aquawatch-session.signal")
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:4000".to_string(),
                request_timeout_secs: 10,
                predict_timeout_secs: 15,
            },
            session: SessionConfig {
                poll_interval_secs: 3,
                reconcile_delay_ms: 500,
                signal_path: Self::default_signal_path(),
                signal_poll_ms: 200,
            },
            realtime: RealtimeConfig {
                enabled: true,
                reconnect_attempts: 10,
                reconnect_delay_ms: 1000,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging-api.example.com".to_string(),
                request_timeout_secs: 10,
                predict_timeout_secs: 15,
            },
            session: SessionConfig {
                poll_interval_secs: 10,
                reconcile_delay_ms: 500,
                signal_path: Self::default_signal_path(),
                signal_poll_ms: 500,
            },
            realtime: RealtimeConfig {
                enabled: true,
                reconnect_attempts: 10,
                reconnect_delay_ms: 1000,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://api.example.com".to_string(),
                request_timeout_secs: 10,
                predict_timeout_secs: 15,
            },
            session: SessionConfig {
                poll_interval_secs: 30,
                reconcile_delay_ms: 500,
                signal_path: Self::default_signal_path(),
                signal_poll_ms: 1000,
            },
            realtime: RealtimeConfig {
                enabled: true,
                reconnect_attempts: 10,
                reconnect_delay_ms: 1000,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
