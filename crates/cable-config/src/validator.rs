//! Configuration validation.

use url::Url;

use crate::error::ConfigError;
use crate::schema::Config;

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_cable(config, &mut result);
        Self::validate_reconnect(config, &mut result);
        Self::validate_session(config, &mut result);
        Self::validate_graphql(config, &mut result);

        Ok(result)
    }

    /// Soft lint for an endpoint that parsed fine: a missing `cable` path
    /// segment usually means the URL points at the wrong mount.
    pub fn endpoint_warnings(endpoint: &Url) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if !endpoint.path().contains("cable") {
            warnings.push(ValidationWarning::new(
                "cable.endpoint",
                format!("Endpoint '{}' has no 'cable' path segment", endpoint),
            ));
        }
        warnings
    }

    fn validate_cable(config: &Config, result: &mut ValidationResult) {
        match config.cable.endpoint.as_deref().map(str::trim) {
            None | Some("") => result.add_error(ValidationError::new(
                "cable.endpoint",
                "Endpoint is not set (set it in the config file or NEXT_PUBLIC_CABLE_ENDPOINT)",
            )),
            Some(endpoint) => match Url::parse(endpoint) {
                Ok(url) => {
                    if !matches!(url.scheme(), "ws" | "wss") {
                        result.add_error(ValidationError::new(
                            "cable.endpoint",
                            "Endpoint must start with ws:// or wss://",
                        ));
                    }
                    for warning in Self::endpoint_warnings(&url) {
                        result.add_warning(warning);
                    }
                }
                Err(e) => result.add_error(ValidationError::new(
                    "cable.endpoint",
                    format!("Endpoint is not a valid URL: {}", e),
                )),
            },
        }

        if config.cable.channel.trim().is_empty() {
            result.add_error(ValidationError::new(
                "cable.channel",
                "Channel name cannot be empty",
            ));
        }

        if config.cable.session_param.trim().is_empty() {
            result.add_error(ValidationError::new(
                "cable.session_param",
                "Session parameter name cannot be empty",
            ));
        }
    }

    fn validate_reconnect(config: &Config, result: &mut ValidationResult) {
        let reconnect = &config.cable.reconnect;
        if !reconnect.enabled {
            return;
        }

        if reconnect.initial_delay_ms == 0 {
            result.add_error(ValidationError::new(
                "cable.reconnect.initial_delay_ms",
                "initial_delay_ms must be greater than 0",
            ));
        }

        if reconnect.max_delay_ms < reconnect.initial_delay_ms {
            result.add_error(ValidationError::new(
                "cable.reconnect.max_delay_ms",
                "max_delay_ms must not be lower than initial_delay_ms",
            ));
        }

        if reconnect.max_attempts == 0 {
            result.add_warning(ValidationWarning::new(
                "cable.reconnect.max_attempts",
                "max_attempts is 0, the consumer will retry forever",
            ));
        }
    }

    fn validate_session(config: &Config, result: &mut ValidationResult) {
        match config.session.identity() {
            Ok(Some(_)) => {}
            Ok(None) => result.add_warning(ValidationWarning::new(
                "session",
                "No session identifier, the socket will connect anonymously",
            )),
            Err(e) => result.add_error(ValidationError::new("session.cookie", e.to_string())),
        }
    }

    fn validate_graphql(config: &Config, result: &mut ValidationResult) {
        match config.graphql.http_endpoint.as_deref() {
            None => result.add_warning(ValidationWarning::new(
                "graphql.http_endpoint",
                "HTTP endpoint not set, queries and mutations cannot be forwarded",
            )),
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                result.add_error(ValidationError::new(
                    "graphql.http_endpoint",
                    "http_endpoint must start with http:// or https://",
                ));
            }
            Some(_) => {}
        }
    }
}
