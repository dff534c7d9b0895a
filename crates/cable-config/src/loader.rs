//! Configuration loader.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

/// Environment variable overriding `cable.endpoint`.
pub const CABLE_ENDPOINT_ENV: &str = "NEXT_PUBLIC_CABLE_ENDPOINT";

/// Environment variable overriding `graphql.http_endpoint`.
const GRAPHQL_ENDPOINT_ENV: &str = "NEXT_PUBLIC_GRAPHQL_ENDPOINT";

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content, |name| std::env::var(name).ok())?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load the file if it exists (defaults otherwise), then apply
    /// environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Config, ConfigError> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Config::default()
        };
        Self::apply_env(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// Override settings from the environment, looked up through `lookup`.
    pub fn apply_env<F>(config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(CABLE_ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            config.cable.endpoint = Some(endpoint);
        }
        if let Some(endpoint) = lookup(GRAPHQL_ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            config.graphql.http_endpoint = Some(endpoint);
        }
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars<F>(content: &str, lookup: F) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| {
            Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex")
        });

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value =
                lookup(var_name).ok_or_else(|| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ResubscribePolicy;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert!(config.cable.endpoint.is_none());
        assert_eq!(config.cable.channel, "GraphqlChannel");
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [cable]
            endpoint = "wss://api.example.com/cable"
            channel = "ExecutionChannel"
            resubscribe = "auto-resubscribe"

            [cable.reconnect]
            enabled = false
            max_attempts = 3

            [session]
            cookie = '{"id": 42}'

            [graphql]
            http_endpoint = "https://api.example.com/graphql"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.cable.endpoint.as_deref(), Some("wss://api.example.com/cable"));
        assert_eq!(config.cable.channel, "ExecutionChannel");
        assert_eq!(config.cable.resubscribe, ResubscribePolicy::AutoResubscribe);
        assert!(!config.cable.reconnect.enabled);
        assert_eq!(config.cable.reconnect.max_attempts, 3);
        assert_eq!(config.cable.reconnect.initial_delay_ms, 1_000);
        assert_eq!(config.session.identity().unwrap().unwrap().id(), "42");
        assert!(config.graphql.http_endpoint.is_some());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[cable]").unwrap();
        writeln!(file, "endpoint = \"ws://localhost:3000/cable\"").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.cable.endpoint.as_deref(), Some("ws://localhost:3000/cable"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/cable.toml"));
        match result {
            Err(ConfigError::NotFound(path)) => assert!(path.contains("cable.toml")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_with_env_missing_file_uses_defaults() {
        let config = ConfigLoader::load_with_env(Path::new("/nonexistent/path/cable.toml")).unwrap();
        assert_eq!(config.cable.session_param, "userId");
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_apply_env_overrides_endpoint() {
        let mut config = ConfigLoader::load_str("[cable]\nendpoint = \"ws://file/cable\"").unwrap();
        ConfigLoader::apply_env(
            &mut config,
            env(&[
                (CABLE_ENDPOINT_ENV, "wss://env.example.com/cable"),
                (GRAPHQL_ENDPOINT_ENV, "https://env.example.com/graphql"),
            ]),
        );
        assert_eq!(config.cable.endpoint.as_deref(), Some("wss://env.example.com/cable"));
        assert_eq!(
            config.graphql.http_endpoint.as_deref(),
            Some("https://env.example.com/graphql")
        );
    }

    #[test]
    fn test_apply_env_ignores_blank_values() {
        let mut config = ConfigLoader::load_str("[cable]\nendpoint = \"ws://file/cable\"").unwrap();
        ConfigLoader::apply_env(&mut config, env(&[(CABLE_ENDPOINT_ENV, "  ")]));
        assert_eq!(config.cable.endpoint.as_deref(), Some("ws://file/cable"));
    }

    #[test]
    fn test_expand_env_vars() {
        let content = "endpoint = \"wss://${API_HOST}/cable\"";
        let expanded =
            ConfigLoader::expand_env_vars(content, env(&[("API_HOST", "api.example.com")])).unwrap();
        assert_eq!(expanded, "endpoint = \"wss://api.example.com/cable\"");
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_TEST_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content, env(&[]));
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        let expanded = ConfigLoader::expand_env_vars(content, env(&[])).unwrap();
        assert_eq!(expanded, content);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/cable.toml");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/cable.toml"));
    }
}
