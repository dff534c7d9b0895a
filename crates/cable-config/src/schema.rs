//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::SessionIdentity;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cable: CableConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub graphql: GraphqlConfig,
}

/// Real-time transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CableConfig {
    /// WebSocket URL of the cable endpoint (e.g. `wss://api.example.com/cable`).
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Channel used for GraphQL execution.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Query parameter carrying the session identifier.
    #[serde(default = "default_session_param")]
    pub session_param: String,

    /// `Origin` header sent with the upgrade request.
    #[serde(default)]
    pub origin: Option<String>,

    #[serde(default)]
    pub resubscribe: ResubscribePolicy,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for CableConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            channel: default_channel(),
            session_param: default_session_param(),
            origin: None,
            resubscribe: ResubscribePolicy::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl CableConfig {
    /// Config pointing at `endpoint` with every other setting defaulted.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }
}

fn default_channel() -> String {
    "GraphqlChannel".to_string()
}

fn default_session_param() -> String {
    "userId".to_string()
}

/// What a GraphQL subscription does when its connection drops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResubscribePolicy {
    /// Complete the stream on disconnect.
    #[default]
    None,
    /// Keep the stream open and re-send the query after reconnecting.
    AutoResubscribe,
    /// Surface the disconnect as a terminal error for the caller to retry.
    Manual,
}

/// Socket reconnect behaviour of the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Consecutive failed attempts before giving up (0 = unlimited).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds without a ping before the connection counts as stale (0 = never).
    #[serde(default = "default_stale_threshold_secs")]
    pub stale_threshold_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
            stale_threshold_secs: default_stale_threshold_secs(),
        }
    }
}

impl ReconnectConfig {
    /// Never reconnect and never treat the connection as stale.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            stale_threshold_secs: 0,
            ..Self::default()
        }
    }

    /// Backoff before reconnect attempt `attempt` (1-based), doubling up to the cap.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.initial_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Whether another attempt is allowed after `attempts` consecutive failures.
    pub fn allows_attempt(&self, attempts: u32) -> bool {
        self.enabled && (self.max_attempts == 0 || attempts < self.max_attempts)
    }

    pub fn stale_threshold(&self) -> Option<Duration> {
        (self.stale_threshold_secs > 0).then(|| Duration::from_secs(self.stale_threshold_secs))
    }
}

fn default_true() -> bool {
    true
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_stale_threshold_secs() -> u64 {
    6
}

/// Where the session identifier comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the cookie holding the user JSON.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Raw cookie value, if known up front.
    #[serde(default)]
    pub cookie: Option<String>,

    /// A full `Cookie:` header to pick `cookie_name` out of.
    #[serde(default)]
    pub cookie_header: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie: None,
            cookie_header: None,
        }
    }
}

impl SessionConfig {
    /// Resolve the session identity; `Ok(None)` means an anonymous socket.
    pub fn identity(&self) -> Result<Option<SessionIdentity>, ConfigError> {
        if let Some(cookie) = &self.cookie {
            return SessionIdentity::from_cookie(cookie);
        }
        if let Some(header) = &self.cookie_header {
            return SessionIdentity::from_cookie_header(header, &self.cookie_name);
        }
        Ok(None)
    }
}

fn default_cookie_name() -> String {
    "userData".to_string()
}

/// Plain request/response GraphQL endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphqlConfig {
    #[serde(default)]
    pub http_endpoint: Option<String>,
}
