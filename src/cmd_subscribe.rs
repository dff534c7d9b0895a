//! `subscribe` subcommand.

use std::sync::Arc;

use anyhow::bail;
use futures::StreamExt;
use tracing::{info, warn};

use cable_client::{CableLink, ConsumerFactory};
use cable_config::Config;
use cable_protocols::{GraphqlRequest, LinkChain, Operation};

/// Run a subscription until the server completes it or the user interrupts.
pub(crate) async fn handle_subscribe(
    config: &Config,
    request: GraphqlRequest,
    channel: Option<String>,
) -> anyhow::Result<()> {
    let operation = Operation::from(request);
    if !operation.is_subscription() {
        bail!("Document has no subscription; use `request` for queries and mutations");
    }

    let session = config.session.identity()?;
    let consumer = ConsumerFactory::websocket(&config.cable).create(&config.cable, session.as_ref())?;

    let mut link = CableLink::from_config(Arc::new(consumer), &config.cable);
    if let Some(channel) = channel {
        link = link.with_channel(channel);
    }
    let chain = LinkChain::default().push(Arc::new(link));

    let mut results = chain.execute(operation);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            item = results.next() => match item {
                Some(Ok(value)) => println!("{}", value),
                Some(Err(e)) => return Err(e.into()),
                None => {
                    info!("Subscription completed");
                    return Ok(());
                }
            },
            signal = &mut interrupt => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Interrupted, unsubscribing");
                return Ok(());
            }
        }
    }
}
