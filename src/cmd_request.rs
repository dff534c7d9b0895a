//! `request` subcommand.

use std::sync::Arc;

use anyhow::{anyhow, bail};
use futures::StreamExt;

use cable_client::HttpLink;
use cable_config::Config;
use cable_protocols::{GraphqlRequest, LinkChain, Operation};

/// Run a query or mutation through the HTTP link and print the response.
pub(crate) async fn handle_request(config: &Config, request: GraphqlRequest) -> anyhow::Result<()> {
    let operation = Operation::from(request);
    if operation.is_subscription() {
        bail!("Document contains a subscription; use `subscribe`");
    }

    let mut link = HttpLink::from_config(&config.graphql)?
        .ok_or_else(|| anyhow!("graphql.http_endpoint is not configured"))?;
    if let Some(header) = &config.session.cookie_header {
        link = link.with_header("Cookie", header.clone());
    }

    let chain = LinkChain::default().push(Arc::new(link));
    let mut results = chain.execute(operation);
    while let Some(result) = results.next().await {
        let body = result?;
        println!("{}", serde_json::to_string_pretty(&body)?);
    }
    Ok(())
}
