//! Consumer factory.
//!
//! Resolves the endpoint from configuration, attaches the session
//! identifier and spawns a [`Consumer`].

use std::sync::Arc;

use cable_config::{CableConfig, ConfigError, ConfigValidator, SessionIdentity};
use cable_protocols::Transport;
use tracing::{info, warn};
use url::Url;

use crate::consumer::Consumer;
use crate::transport::WebSocketTransport;

/// Builds consumers over one transport.
#[derive(Clone)]
pub struct ConsumerFactory {
    transport: Arc<dyn Transport>,
}

impl ConsumerFactory {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Factory over a real WebSocket, sending the configured `Origin`.
    pub fn websocket(config: &CableConfig) -> Self {
        let mut transport = WebSocketTransport::new();
        if let Some(origin) = &config.origin {
            transport = transport.with_origin(origin.clone());
        }
        Self::new(Arc::new(transport))
    }

    /// The URL a consumer for `config` connects to.
    ///
    /// Fails fast when no endpoint is configured. With a session the
    /// identifier is appended as `<session_param>=<id>`; without one the
    /// endpoint is used unchanged.
    pub fn endpoint_url(
        config: &CableConfig,
        session: Option<&SessionIdentity>,
    ) -> Result<Url, ConfigError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| ConfigError::NotConfigured("cable.endpoint".to_string()))?;

        let mut url = Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
            field: "cable.endpoint".to_string(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::InvalidValue {
                field: "cable.endpoint".to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        for warning in ConfigValidator::endpoint_warnings(&url) {
            warn!(path = %warning.path, "{}", warning.message);
        }

        if let Some(session) = session {
            url.query_pairs_mut()
                .append_pair(&config.session_param, session.id());
        }

        Ok(url)
    }

    /// Create a consumer and start connecting.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn create(
        &self,
        config: &CableConfig,
        session: Option<&SessionIdentity>,
    ) -> Result<Consumer, ConfigError> {
        let url = Self::endpoint_url(config, session)?;
        info!(
            host = ?url.host_str(),
            path = url.path(),
            authenticated = session.is_some(),
            "Creating cable consumer"
        );
        Ok(Consumer::connect(
            url,
            self.transport.clone(),
            config.reconnect.clone(),
        ))
    }
}

impl std::fmt::Debug for ConsumerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerFactory").finish_non_exhaustive()
    }
}
