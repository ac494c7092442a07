//! Common types and utilities shared across the easyapply crates.
//!
//! This crate defines the applicant [`Profile`], the engine and browser
//! settings, observability helpers, and the shared error taxonomy used
//! throughout the workspace. It stays dependency‑light so every other crate
//! can depend on it.
//!
//! # Overview
//!
//! - [`EngineSettings`]: bounds and pacing knobs for the workflow engine
//! - [`BrowserSettings`]: WebDriver endpoint and stealth level
//! - [`Profile`]: the applicant's read-only answer bank
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`ApplyError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use easyapply_common::{EngineSettings, StealthLevel, BrowserSettings};
//!
//! let engine = EngineSettings::default();
//! assert_eq!(engine.max_pages_per_job, 10);
//! assert_eq!(engine.actions_per_hour, 30);
//!
//! let mut browser = BrowserSettings::default();
//! browser.stealth = StealthLevel::Maximum;
//! assert_eq!(browser.webdriver_url, "http://localhost:9515");
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub mod lenient;
pub mod observability;
pub mod profile;

pub use observability::{LogConfig, LogFormat, LoggingSettings};
pub use profile::{
    yes_no, Contact, Documents, Eligibility, Experience, Links, Preferences, Profile,
    SelfIdentification,
};

/// Bounds, thresholds and pacing parameters for the workflow engine.
///
/// Every field has a default so a config file only needs to name what it
/// overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Maximum number of application pages processed per job.
    #[serde(deserialize_with = "lenient::scalar")]
    pub max_pages_per_job: u32,
    /// Ceiling on rate-limited step actions per rolling window.
    #[serde(deserialize_with = "lenient::scalar")]
    pub actions_per_hour: u32,
    /// Length of the rolling rate window in seconds.
    #[serde(deserialize_with = "lenient::scalar")]
    pub rate_window_secs: u64,
    /// Median pause between filler operations, in seconds.
    #[serde(deserialize_with = "lenient::scalar")]
    pub base_delay_secs: f64,
    /// Shape parameter of the log-normal pause distribution.
    #[serde(deserialize_with = "lenient::scalar")]
    pub delay_sigma: f64,
    /// Chance of an incidental scroll/pointer action after a pause.
    #[serde(deserialize_with = "lenient::scalar")]
    pub incidental_action_probability: f64,
    /// Consecutive step failures that open a job's breaker.
    #[serde(deserialize_with = "lenient::scalar")]
    pub job_failure_threshold: u32,
    /// Consecutive failed jobs that open the run breaker.
    #[serde(deserialize_with = "lenient::scalar")]
    pub run_failure_threshold: u32,
    /// Initial cooldown before the run breaker admits a probe job.
    #[serde(deserialize_with = "lenient::scalar")]
    pub breaker_cooldown_secs: u64,
    /// Upper bound for the doubled cooldown after failed probes.
    #[serde(deserialize_with = "lenient::scalar")]
    pub max_breaker_cooldown_secs: u64,
    /// Classification attempts before a page is declared unknown.
    #[serde(deserialize_with = "lenient::scalar")]
    pub classify_retries: u32,
    /// Re-fill attempts for mandatory fields that read back empty.
    #[serde(deserialize_with = "lenient::scalar")]
    pub verify_retries: u32,
    /// Advance attempts before navigation is declared stalled.
    #[serde(deserialize_with = "lenient::scalar")]
    pub advance_retries: u32,
    /// Bound on element-appearance waits, in milliseconds.
    #[serde(deserialize_with = "lenient::scalar")]
    pub element_wait_ms: u64,
    /// Poll interval used inside element-appearance waits.
    #[serde(deserialize_with = "lenient::scalar")]
    pub poll_interval_ms: u64,
    /// Fixed seed for the behavior simulator; `None` seeds from the OS.
    #[serde(deserialize_with = "lenient::optional")]
    pub seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_pages_per_job: 10,
            actions_per_hour: 30,
            rate_window_secs: 3600,
            base_delay_secs: 2.0,
            delay_sigma: 0.5,
            incidental_action_probability: 0.3,
            job_failure_threshold: 3,
            run_failure_threshold: 5,
            breaker_cooldown_secs: 300,
            max_breaker_cooldown_secs: 3600,
            classify_retries: 3,
            verify_retries: 2,
            advance_retries: 2,
            element_wait_ms: 5000,
            poll_interval_ms: 250,
            seed: None,
        }
    }
}

impl EngineSettings {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.base_delay_secs.max(0.0)).unwrap_or(Duration::ZERO)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_secs)
    }

    pub fn max_breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.max_breaker_cooldown_secs.max(self.breaker_cooldown_secs))
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_millis(self.element_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Browser automation stealth level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StealthLevel {
    Lightweight,
    #[default]
    Balanced,
    Maximum,
}

/// Where and how the browser session is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// WebDriver endpoint (chromedriver by default).
    pub webdriver_url: String,
    /// Whether to run the browser without a visible window.
    #[serde(deserialize_with = "lenient::scalar")]
    pub headless: bool,
    /// Launch-argument and script evasions applied to the session.
    pub stealth: StealthLevel,
    /// Page opened before the manual login pause.
    pub start_url: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            stealth: StealthLevel::Balanced,
            start_url: "https://www.indeed.com/account/login".to_string(),
        }
    }
}

/// Which circuit breaker rejected an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerScope {
    Job,
    Run,
}

impl fmt::Display for BreakerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerScope::Job => f.write_str("job"),
            BreakerScope::Run => f.write_str("run"),
        }
    }
}

/// Error types used across the easyapply system.
#[derive(thiserror::Error, Debug)]
pub enum ApplyError {
    /// No locator strategy matched a control for the named field.
    #[error("Element not found: {field}")]
    ElementNotFound { field: String },

    /// The page matched no classification predicate.
    #[error("Page could not be classified after {attempts} attempt(s)")]
    ClassificationAmbiguous { attempts: u32 },

    /// A mandatory field stayed empty after every fill attempt.
    #[error("Required field could not be filled: {field}")]
    RequiredFieldUnfillable { field: String },

    /// The advance action did not move the workflow to a new page.
    #[error("Navigation stalled after {attempts} attempt(s)")]
    NavigationStalled { attempts: u32 },

    /// A circuit breaker is open and rejected the attempt.
    #[error("Circuit open for {scope}")]
    CircuitOpen {
        scope: BreakerScope,
        retry_after: Option<Duration>,
    },

    /// An external cancellation was observed at a step boundary.
    #[error("Cancelled")]
    Cancelled,

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The browser driver reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),
}

impl ApplyError {
    /// Taxonomy kind used in logs and job outcomes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplyError::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            ApplyError::ClassificationAmbiguous { .. } => ErrorKind::ClassificationAmbiguous,
            ApplyError::RequiredFieldUnfillable { .. } => ErrorKind::RequiredFieldUnfillable,
            ApplyError::NavigationStalled { .. } => ErrorKind::NavigationStalled,
            ApplyError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            ApplyError::Cancelled => ErrorKind::Cancelled,
            ApplyError::Config(_) => ErrorKind::Config,
            ApplyError::Driver(_) => ErrorKind::Driver,
        }
    }

    /// Whether the failing step may be attempted again within the same job.
    ///
    /// Recoverable errors still count against the job's circuit breaker.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ApplyError::ElementNotFound { .. }
                | ApplyError::ClassificationAmbiguous { .. }
                | ApplyError::NavigationStalled { .. }
                | ApplyError::Driver(_)
        )
    }
}

/// Flat, serialisable view of [`ApplyError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ElementNotFound,
    ClassificationAmbiguous,
    RequiredFieldUnfillable,
    NavigationStalled,
    CircuitOpen,
    Cancelled,
    Config,
    Driver,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ElementNotFound => "element_not_found",
            ErrorKind::ClassificationAmbiguous => "classification_ambiguous",
            ErrorKind::RequiredFieldUnfillable => "required_field_unfillable",
            ErrorKind::NavigationStalled => "navigation_stalled",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Config => "config",
            ErrorKind::Driver => "driver",
        };
        f.write_str(s)
    }
}

/// Convenient alias for results that use [`ApplyError`].
pub type Result<T> = std::result::Result<T, ApplyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_defaults_match_documented_bounds() {
        let s = EngineSettings::default();
        assert_eq!(s.max_pages_per_job, 10);
        assert_eq!(s.actions_per_hour, 30);
        assert_eq!(s.base_delay(), Duration::from_secs(2));
        assert_eq!(s.rate_window(), Duration::from_secs(3600));
    }

    #[test]
    fn base_delay_tolerates_non_finite_values() {
        for secs in [f64::INFINITY, f64::NAN, -1.0] {
            let s = EngineSettings {
                base_delay_secs: secs,
                ..EngineSettings::default()
            };
            assert_eq!(s.base_delay(), Duration::ZERO, "{secs}");
        }
    }

    #[test]
    fn partial_engine_settings_fill_in_defaults() {
        let s: EngineSettings =
            serde_json::from_str(r#"{"max_pages_per_job": 4, "seed": 7}"#).unwrap();
        assert_eq!(s.max_pages_per_job, 4);
        assert_eq!(s.seed, Some(7));
        assert_eq!(s.job_failure_threshold, 3);
    }

    #[test]
    fn recoverability_follows_taxonomy() {
        assert!(ApplyError::ElementNotFound {
            field: "phone".into()
        }
        .is_recoverable());
        assert!(ApplyError::ClassificationAmbiguous { attempts: 1 }.is_recoverable());
        assert!(!ApplyError::RequiredFieldUnfillable {
            field: "resume".into()
        }
        .is_recoverable());
        assert!(!ApplyError::CircuitOpen {
            scope: BreakerScope::Run,
            retry_after: None
        }
        .is_recoverable());
        assert!(!ApplyError::Cancelled.is_recoverable());
    }

    #[test]
    fn max_cooldown_never_below_initial() {
        let s = EngineSettings {
            breaker_cooldown_secs: 600,
            max_breaker_cooldown_secs: 60,
            ..EngineSettings::default()
        };
        assert_eq!(s.max_breaker_cooldown(), Duration::from_secs(600));
    }

    #[test]
    fn error_kind_display_is_snake_case() {
        assert_eq!(ErrorKind::NavigationStalled.to_string(), "navigation_stalled");
        assert_eq!(BreakerScope::Run.to_string(), "run");
    }
}
