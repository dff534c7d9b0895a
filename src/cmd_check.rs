//! `check` subcommand.

use anyhow::bail;

use cable_client::ConsumerFactory;
use cable_config::{Config, ConfigValidator};

/// Validate the configuration and print the findings.
pub(crate) fn handle_check(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config)?;

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error:   {}: {}", error.path, error.message);
    }

    if !result.is_valid() {
        bail!("Configuration has {} error(s)", result.errors.len());
    }

    let session = config.session.identity()?;
    let url = ConsumerFactory::endpoint_url(&config.cable, session.as_ref())?;
    println!("endpoint: {}", url);
    println!("channel:  {}", config.cable.channel);
    println!(
        "session:  {}",
        session.as_ref().map_or("anonymous", |s| s.id())
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cable_config::CableConfig;

    #[test]
    fn test_check_rejects_missing_endpoint() {
        let err = handle_check(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("error"));
    }

    #[test]
    fn test_check_accepts_valid_config() {
        let config = Config {
            cable: CableConfig::with_endpoint("ws://localhost:3000/cable"),
            ..Config::default()
        };
        assert!(handle_check(&config).is_ok());
    }
}
