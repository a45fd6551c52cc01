//! Configuration handling for the gateway and the one-shot extractor.
//!
//! Everything comes from environment variables with development defaults,
//! so a bare `cargo run --bin gateway` serves on localhost with a browser
//! found on `PATH`.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::extractor::PolicyKind;
use crate::session::RenderMode;
use crate::session::browser::MOBILE_USER_AGENT;

/// Environment variable names.
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_GATEWAY_ORIGIN: &str = "GATEWAY_ORIGIN";
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";
pub const ENV_PROFILE_DIR: &str = "PROFILE_DIR";
pub const ENV_NAVIGATION_TIMEOUT_MS: &str = "NAVIGATION_TIMEOUT_MS";
pub const ENV_SETTLE_DELAY_MS: &str = "SETTLE_DELAY_MS";
pub const ENV_SANITIZE_POLICY: &str = "SANITIZE_POLICY";
pub const ENV_RENDER_MODE: &str = "RENDER_MODE";
pub const ENV_MAX_CONCURRENT_PAGES: &str = "MAX_CONCURRENT_PAGES";
pub const ENV_USER_AGENT: &str = "USER_AGENT";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_GATEWAY_ORIGIN: &str = "http://localhost:5000";
const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 45_000;
const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;
/// Zero leaves concurrent page loads unbounded.
const DEFAULT_MAX_CONCURRENT_PAGES: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Application runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    bind_addr: String,
    gateway_origin: String,
    chromium_path: Option<PathBuf>,
    profile_dir: Option<PathBuf>,
    navigation_timeout: Duration,
    settle_delay: Duration,
    sanitize_policy: PolicyKind,
    render_mode: RenderMode,
    max_concurrent_pages: usize,
    user_agent: String,
    log_format: LogFormat,
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: env::var(ENV_BIND_ADDR).unwrap_or(defaults.bind_addr),
            gateway_origin: parse_origin(ENV_GATEWAY_ORIGIN)?.unwrap_or(defaults.gateway_origin),
            chromium_path: non_empty(ENV_CHROMIUM_PATH).map(PathBuf::from),
            profile_dir: non_empty(ENV_PROFILE_DIR).map(PathBuf::from),
            navigation_timeout: parse_var::<u64>(ENV_NAVIGATION_TIMEOUT_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.navigation_timeout),
            settle_delay: parse_var::<u64>(ENV_SETTLE_DELAY_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            sanitize_policy: parse_var(ENV_SANITIZE_POLICY)?.unwrap_or(defaults.sanitize_policy),
            render_mode: parse_var(ENV_RENDER_MODE)?.unwrap_or(defaults.render_mode),
            max_concurrent_pages: parse_var(ENV_MAX_CONCURRENT_PAGES)?
                .unwrap_or(defaults.max_concurrent_pages),
            user_agent: non_empty(ENV_USER_AGENT).unwrap_or(defaults.user_agent),
            log_format: parse_var(ENV_LOG_FORMAT)?.unwrap_or(defaults.log_format),
        })
    }

    /// TCP bind address (host:port) for the HTTP server.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }
    /// Origin rewritten links point at, without a trailing slash.
    pub fn gateway_origin(&self) -> &str {
        &self.gateway_origin
    }
    pub fn chromium_path(&self) -> Option<&Path> {
        self.chromium_path.as_deref()
    }
    pub fn profile_dir(&self) -> Option<&Path> {
        self.profile_dir.as_deref()
    }
    pub fn navigation_timeout(&self) -> Duration {
        self.navigation_timeout
    }
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }
    pub fn sanitize_policy(&self) -> PolicyKind {
        self.sanitize_policy
    }
    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }
    /// `None` when page loads are not limited.
    pub fn max_concurrent_pages(&self) -> Option<usize> {
        (self.max_concurrent_pages > 0).then_some(self.max_concurrent_pages)
    }
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            gateway_origin: DEFAULT_GATEWAY_ORIGIN.to_string(),
            chromium_path: None,
            profile_dir: None,
            navigation_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            sanitize_policy: PolicyKind::Full,
            render_mode: RenderMode::Browser,
            max_concurrent_pages: DEFAULT_MAX_CONCURRENT_PAGES,
            user_agent: MOBILE_USER_AGENT.to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn non_empty(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    non_empty(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                field: key,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn parse_origin(key: &'static str) -> Result<Option<String>, ConfigError> {
    let Some(raw) = non_empty(key) else {
        return Ok(None);
    };
    let url = url::Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        field: key,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            field: key,
            reason: "gateway origin must be http or https".to_string(),
        });
    }
    Ok(Some(url.origin().ascii_serialization()))
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Environment-variable manipulating tests must run serially.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ALL_KEYS: &[&str] = &[
        ENV_BIND_ADDR,
        ENV_GATEWAY_ORIGIN,
        ENV_CHROMIUM_PATH,
        ENV_PROFILE_DIR,
        ENV_NAVIGATION_TIMEOUT_MS,
        ENV_SETTLE_DELAY_MS,
        ENV_SANITIZE_POLICY,
        ENV_RENDER_MODE,
        ENV_MAX_CONCURRENT_PAGES,
        ENV_USER_AGENT,
        ENV_LOG_FORMAT,
    ];

    fn clear_env() {
        for key in ALL_KEYS {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn defaults_when_env_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.bind_addr(), super::DEFAULT_BIND_ADDR);
        assert_eq!(cfg.gateway_origin(), "http://localhost:5000");
        assert_eq!(cfg.navigation_timeout(), Duration::from_secs(45));
        assert_eq!(cfg.settle_delay(), Duration::from_secs(1));
        assert_eq!(cfg.sanitize_policy(), PolicyKind::Full);
        assert_eq!(cfg.render_mode(), RenderMode::Browser);
        assert_eq!(cfg.max_concurrent_pages(), None);
        assert_eq!(cfg.user_agent(), MOBILE_USER_AGENT);
        assert_eq!(cfg.chromium_path(), None);
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn overrides_when_env_present() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_BIND_ADDR, "0.0.0.0:9000");
            env::set_var(ENV_GATEWAY_ORIGIN, "https://gw.example/ignored/path");
            env::set_var(ENV_CHROMIUM_PATH, "/usr/bin/chromium");
            env::set_var(ENV_NAVIGATION_TIMEOUT_MS, "5000");
            env::set_var(ENV_SETTLE_DELAY_MS, "0");
            env::set_var(ENV_SANITIZE_POLICY, "lean");
            env::set_var(ENV_RENDER_MODE, "static");
            env::set_var(ENV_MAX_CONCURRENT_PAGES, "4");
            env::set_var(ENV_LOG_FORMAT, "json");
        }
        let cfg = Config::from_env().unwrap();
        clear_env();

        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.gateway_origin(), "https://gw.example");
        assert_eq!(cfg.chromium_path(), Some(Path::new("/usr/bin/chromium")));
        assert_eq!(cfg.navigation_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.settle_delay(), Duration::ZERO);
        assert_eq!(cfg.sanitize_policy(), PolicyKind::Lean);
        assert_eq!(cfg.render_mode(), RenderMode::Static);
        assert_eq!(cfg.max_concurrent_pages(), Some(4));
        assert_eq!(cfg.log_format(), LogFormat::Json);
    }

    #[test]
    fn invalid_values_are_reported() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_NAVIGATION_TIMEOUT_MS, "soon");
        }
        let err = Config::from_env().unwrap_err();
        clear_env();
        assert!(err.to_string().contains(ENV_NAVIGATION_TIMEOUT_MS));

        unsafe {
            env::set_var(ENV_SANITIZE_POLICY, "paranoid");
        }
        let err = Config::from_env().unwrap_err();
        clear_env();
        assert!(err.to_string().contains("paranoid"));

        unsafe {
            env::set_var(ENV_GATEWAY_ORIGIN, "ftp://gw.example");
        }
        assert!(Config::from_env().is_err());
        clear_env();
    }
}
