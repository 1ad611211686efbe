//! Retry and backoff configuration for manifest and segment fetches.
//!
//! Nothing here performs a fetch. The host's fetch layer reads a
//! [`PlaybackConfig`] once at session start and asks the per-class
//! [`RetryPolicy`] whether to retry and how long to wait.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use castforged_common::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{PlaybackSettings, RetryConfig};

/// Class of request a policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchClass {
    Manifest,
    Segment,
}

impl fmt::Display for FetchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest => write!(f, "manifest"),
            Self::Segment => write!(f, "segment"),
        }
    }
}

impl std::str::FromStr for FetchClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "manifest" => Ok(Self::Manifest),
            "segment" => Ok(Self::Segment),
            other => Err(Error::invalid_input(format!("unknown fetch class: {other}"))),
        }
    }
}

/// Backoff parameters for one fetch class. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub fuzz_factor: f64,
    pub timeout_ms: u64,
    /// Segment fetches only: idle time after which a transfer counts as failed.
    #[serde(default)]
    pub stall_timeout_ms: Option<u64>,
}

impl RetryPolicy {
    /// Manifest fetches: exponential backoff with ±50% jitter.
    pub fn manifest() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 1000,
            backoff_factor: 2.0,
            fuzz_factor: 0.5,
            timeout_ms: 30_000,
            stall_timeout_ms: None,
        }
    }

    /// Segment fetches: constant one second delay, stall detection at 10s.
    pub fn segment() -> Self {
        Self {
            max_attempts: 20,
            base_delay_ms: 1000,
            backoff_factor: 1.0,
            fuzz_factor: 0.0,
            timeout_ms: 30_000,
            stall_timeout_ms: Some(10_000),
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::invalid_input("max_attempts cannot be 0"));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(Error::invalid_input("backoff_factor must be >= 1.0"));
        }
        if !(0.0..1.0).contains(&self.fuzz_factor) {
            return Err(Error::invalid_input("fuzz_factor must be in [0, 1)"));
        }
        if self.timeout_ms == 0 {
            return Err(Error::invalid_input("timeout_ms cannot be 0"));
        }
        if self.stall_timeout_ms == Some(0) {
            return Err(Error::invalid_input("stall_timeout_ms cannot be 0"));
        }
        Ok(())
    }

    /// Whether another attempt is allowed after `attempts_made` failures.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Un-jittered delay before attempt `attempt` (1-based), capped by the
    /// request timeout.
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        self.cap(self.raw_delay_ms(attempt))
    }

    /// Inclusive range the jittered delay for `attempt` falls into.
    pub fn delay_bounds(&self, attempt: u32) -> (Duration, Duration) {
        let nominal = self.raw_delay_ms(attempt);
        (
            self.cap(nominal * (1.0 - self.fuzz_factor)),
            self.cap(nominal * (1.0 + self.fuzz_factor)),
        )
    }

    /// Jittered delay before attempt `attempt`, drawn from `rng`.
    pub fn delay_for_attempt<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let nominal = self.raw_delay_ms(attempt);
        if self.fuzz_factor == 0.0 || nominal == 0.0 {
            return self.cap(nominal);
        }
        let jitter = rng.gen_range(-self.fuzz_factor..=self.fuzz_factor);
        self.cap(nominal * (1.0 + jitter))
    }

    /// Whether a transfer idle for `idle` should be abandoned and retried.
    pub fn is_stalled(&self, idle: Duration) -> bool {
        self.stall_timeout().is_some_and(|limit| idle > limit)
    }

    /// Delay bounds for every allowed attempt, in order.
    pub fn schedule(&self) -> impl Iterator<Item = (u32, Duration, Duration)> + '_ {
        (1..=self.max_attempts).map(move |attempt| {
            let (low, high) = self.delay_bounds(attempt);
            (attempt, low, high)
        })
    }

    /// `base * factor^(attempt-1)` in milliseconds, before jitter and cap.
    fn raw_delay_ms(&self, attempt: u32) -> f64 {
        if attempt == 0 {
            return 0.0;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        self.base_delay_ms as f64 * self.backoff_factor.powi(exponent)
    }

    fn cap(&self, millis: f64) -> Duration {
        let millis = millis.clamp(0.0, self.timeout_ms as f64);
        Duration::from_millis(millis.round() as u64)
    }
}

/// A request about to be issued by the host's fetch layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

/// Playback-engine settings handed to the host once per session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    pub manifest: RetryPolicy,
    pub segment: RetryPolicy,
    pub auto_resume_duration: Duration,
    pub auto_resume_number_of_segments: u32,
}

impl PlaybackConfig {
    pub fn new(retry: &RetryConfig, playback: &PlaybackSettings) -> Self {
        Self {
            manifest: retry.manifest.clone(),
            segment: retry.segment.clone(),
            auto_resume_duration: Duration::from_secs(u64::from(
                playback.auto_resume_duration_secs,
            )),
            auto_resume_number_of_segments: playback.auto_resume_number_of_segments,
        }
    }

    pub fn policy(&self, class: FetchClass) -> &RetryPolicy {
        match class {
            FetchClass::Manifest => &self.manifest,
            FetchClass::Segment => &self.segment,
        }
    }

    /// Hook run by the host before each manifest request; records the URL
    /// and passes the request through unchanged.
    pub fn on_manifest_request(&self, request: RequestInfo) -> RequestInfo {
        tracing::debug!(url = %request.url, "Manifest request");
        request
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self::new(&RetryConfig::default(), &PlaybackSettings::default())
    }
}
