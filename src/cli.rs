//! CLI definitions for careportal-cable.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use cable_protocols::GraphqlRequest;

/// careportal-cable CLI.
#[derive(Parser)]
#[command(name = "careportal-cable")]
#[command(about = "GraphQL subscriptions over the care portal cable")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/cable.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Load and validate the configuration
    Check,

    /// Run a subscription and print each result as a JSON line
    Subscribe {
        #[command(flatten)]
        operation: OperationArgs,

        /// Channel to execute on (overrides cable.channel)
        #[arg(long)]
        channel: Option<String>,
    },

    /// Run a query or mutation over HTTP
    Request {
        #[command(flatten)]
        operation: OperationArgs,
    },
}

/// Where the GraphQL document and its variables come from.
#[derive(Args, Debug)]
pub(crate) struct OperationArgs {
    /// GraphQL document
    #[arg(short, long, conflicts_with = "query_file")]
    pub query: Option<String>,

    /// File containing the GraphQL document
    #[arg(long)]
    pub query_file: Option<PathBuf>,

    /// Variables as a JSON object
    #[arg(long)]
    pub variables: Option<String>,
}

impl OperationArgs {
    pub(crate) fn to_request(&self) -> anyhow::Result<GraphqlRequest> {
        let query = match (&self.query, &self.query_file) {
            (Some(query), _) => query.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            (None, None) => bail!("Pass --query or --query-file"),
        };
        if query.trim().is_empty() {
            bail!("GraphQL document is empty");
        }

        let mut request = GraphqlRequest::new(query);
        if let Some(variables) = &self.variables {
            let value: Value =
                serde_json::from_str(variables).context("--variables is not valid JSON")?;
            let Value::Object(variables) = value else {
                bail!("--variables must be a JSON object");
            };
            request = request.with_variables(variables);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(query: Option<&str>, variables: Option<&str>) -> OperationArgs {
        OperationArgs {
            query: query.map(str::to_string),
            query_file: None,
            variables: variables.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_subscribe() {
        let cli = Cli::try_parse_from([
            "careportal-cable",
            "--config",
            "other.toml",
            "subscribe",
            "--query",
            "subscription { x }",
            "--channel",
            "ExecutionChannel",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        let Commands::Subscribe { operation, channel } = cli.command else {
            panic!("expected subscribe");
        };
        assert_eq!(operation.query.as_deref(), Some("subscription { x }"));
        assert_eq!(channel.as_deref(), Some("ExecutionChannel"));
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["careportal-cable", "check"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config/cable.toml"));
    }

    #[test]
    fn test_query_and_file_conflict() {
        let result = Cli::try_parse_from([
            "careportal-cable",
            "request",
            "--query",
            "{ a }",
            "--query-file",
            "a.graphql",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_to_request_with_variables() {
        let request = args(Some("query { a }"), Some(r#"{"id": 3}"#))
            .to_request()
            .unwrap();
        assert_eq!(request.query, "query { a }");
        assert_eq!(request.variables["id"], 3);
    }

    #[test]
    fn test_to_request_rejects_bad_input() {
        assert!(args(None, None).to_request().is_err());
        assert!(args(Some("  "), None).to_request().is_err());
        assert!(args(Some("{ a }"), Some("[1]")).to_request().is_err());
        assert!(args(Some("{ a }"), Some("{oops")).to_request().is_err());
    }

    #[test]
    fn test_to_request_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "subscription {{ alerts {{ id }} }}").unwrap();

        let operation = OperationArgs {
            query: None,
            query_file: Some(file.path().to_path_buf()),
            variables: None,
        };
        let request = operation.to_request().unwrap();
        assert!(request.query.starts_with("subscription"));
        assert!(request.variables.is_empty());
    }
}
