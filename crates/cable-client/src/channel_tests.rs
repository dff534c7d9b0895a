use super::*;
use crate::consumer::Consumer;
use crate::transport::{MemoryConnection, MemoryServer, MemoryTransport};
use cable_config::ReconnectConfig;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Connected,
    Disconnected(bool),
    Received(Value),
    Rejected,
}

fn recording_callbacks() -> (ChannelCallbacks, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connected = tx.clone();
    let disconnected = tx.clone();
    let received = tx.clone();
    let callbacks = ChannelCallbacks::new()
        .on_connected(move |_| {
            let _ = connected.send(Event::Connected);
        })
        .on_disconnected(move |_, will_reconnect| {
            let _ = disconnected.send(Event::Disconnected(will_reconnect));
        })
        .on_received(move |_, message| {
            let _ = received.send(Event::Received(message));
        })
        .on_rejected(move |_| {
            let _ = tx.send(Event::Rejected);
        });
    (callbacks, rx)
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for callback")
        .expect("callback channel closed")
}

/// No further event arrives (a dropped handler also counts as quiet).
async fn assert_quiet(events: &mut mpsc::UnboundedReceiver<Event>) {
    let event = tokio::time::timeout(QUIET, events.recv()).await;
    assert!(!matches!(event, Ok(Some(_))), "unexpected event {:?}", event);
}

fn start(reconnect: ReconnectConfig) -> (Consumer, MemoryServer) {
    let (transport, server) = MemoryTransport::pair();
    let url = Url::parse("ws://localhost:3000/cable").unwrap();
    (Consumer::connect(url, Arc::new(transport), reconnect), server)
}

async fn welcome(server: &mut MemoryServer) -> MemoryConnection {
    let connection = server.accept_within(WAIT).await.unwrap();
    connection.welcome();
    connection
}

/// Wait for the subscribe command and confirm it.
async fn confirm_next(connection: &mut MemoryConnection) -> String {
    let command = connection.recv_command_within(WAIT).await.unwrap();
    let ClientCommand::Subscribe { identifier } = command else {
        panic!("expected subscribe, got {:?}", command);
    };
    connection.confirm(&identifier);
    identifier
}

#[tokio::test]
async fn test_subscribe_is_pending_until_confirmed() {
    let (consumer, mut server) = start(ReconnectConfig::disabled());
    let channel = ChannelSubscription::new(consumer.handle());
    assert_eq!(channel.status(), ChannelStatus::Unsubscribed);

    let (callbacks, mut events) = recording_callbacks();
    channel.subscribe("GraphqlChannel", callbacks).unwrap();
    assert_eq!(channel.status(), ChannelStatus::Pending);

    let identifier = ChannelIdentifier::from_wire(&channel.identifier().unwrap()).unwrap();
    assert_eq!(identifier.channel(), "GraphqlChannel");
    assert!(identifier.params().contains_key("channelId"));

    let mut connection = welcome(&mut server).await;
    confirm_next(&mut connection).await;
    assert_eq!(next_event(&mut events).await, Event::Connected);
    assert_eq!(channel.status(), ChannelStatus::Active);
}

#[tokio::test]
async fn test_double_subscribe_is_rejected() {
    let (consumer, _server) = start(ReconnectConfig::disabled());
    let channel = ChannelSubscription::new(consumer.handle());
    channel.subscribe("GraphqlChannel", ChannelCallbacks::new()).unwrap();
    let first = channel.identifier();

    let err = channel
        .subscribe("GraphqlChannel", ChannelCallbacks::new())
        .unwrap_err();
    assert!(matches!(err, ChannelError::AlreadySubscribed));
    assert_eq!(channel.identifier(), first);
}

#[tokio::test]
async fn test_perform_requires_active_channel() {
    let (consumer, mut server) = start(ReconnectConfig::disabled());
    let channel = ChannelSubscription::new(consumer.handle());
    assert!(!channel.perform("execute", json!({})));

    let (callbacks, mut events) = recording_callbacks();
    channel.subscribe("GraphqlChannel", callbacks).unwrap();
    assert!(!channel.perform("execute", json!({})));

    let mut connection = welcome(&mut server).await;
    let identifier = confirm_next(&mut connection).await;
    assert_eq!(next_event(&mut events).await, Event::Connected);

    assert!(channel.perform("execute", json!({ "query": "subscription { x }" })));
    let command = connection.recv_command_within(WAIT).await.unwrap();
    assert_eq!(command.identifier(), identifier);
    assert_eq!(
        command.payload().unwrap().unwrap(),
        json!({ "action": "execute", "query": "subscription { x }" })
    );
}

#[tokio::test]
async fn test_perform_from_connected_callback() {
    let (consumer, mut server) = start(ReconnectConfig::disabled());
    let channel = ChannelSubscription::new(consumer.handle());
    channel
        .subscribe(
            "GraphqlChannel",
            ChannelCallbacks::new().on_connected(|channel| {
                channel.perform("execute", json!({ "n": 1 }));
            }),
        )
        .unwrap();

    let mut connection = welcome(&mut server).await;
    confirm_next(&mut connection).await;
    let command = connection.recv_command_within(WAIT).await.unwrap();
    assert!(matches!(command, ClientCommand::Message { .. }));
    assert_eq!(command.payload().unwrap().unwrap()["action"], "execute");
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent() {
    let (consumer, mut server) = start(ReconnectConfig::disabled());
    let channel = ChannelSubscription::new(consumer.handle());
    channel.unsubscribe();

    let (callbacks, mut events) = recording_callbacks();
    channel.subscribe("GraphqlChannel", callbacks).unwrap();
    let mut connection = welcome(&mut server).await;
    let identifier = confirm_next(&mut connection).await;
    assert_eq!(next_event(&mut events).await, Event::Connected);

    channel.unsubscribe();
    channel.unsubscribe();
    assert_eq!(channel.status(), ChannelStatus::Unsubscribed);
    assert!(channel.identifier().is_none());

    assert_eq!(
        connection.recv_command_within(WAIT).await.unwrap(),
        ClientCommand::unsubscribe(identifier.as_str())
    );
    assert!(connection.recv_command_within(QUIET).await.is_none());
    assert!(!channel.perform("execute", json!({})));
}

#[tokio::test]
async fn test_stale_identifier_frames_are_ignored() {
    let (consumer, mut server) = start(ReconnectConfig::disabled());
    let channel = ChannelSubscription::new(consumer.handle());

    let (first, mut first_events) = recording_callbacks();
    channel.subscribe("GraphqlChannel", first).unwrap();
    let mut connection = welcome(&mut server).await;
    let old = confirm_next(&mut connection).await;
    assert_eq!(next_event(&mut first_events).await, Event::Connected);

    channel.unsubscribe();
    connection.recv_command_within(WAIT).await.unwrap();

    let (second, mut second_events) = recording_callbacks();
    channel.subscribe("GraphqlChannel", second).unwrap();
    let new = confirm_next(&mut connection).await;
    assert_ne!(old, new);
    assert_eq!(next_event(&mut second_events).await, Event::Connected);

    connection.push(&old, json!({ "stale": true }));
    connection.push(&new, json!({ "fresh": true }));
    assert_eq!(
        next_event(&mut second_events).await,
        Event::Received(json!({ "fresh": true }))
    );
    assert_quiet(&mut first_events).await;
}

#[tokio::test]
async fn test_rejection_resets_channel() {
    let (consumer, mut server) = start(ReconnectConfig::disabled());
    let channel = ChannelSubscription::new(consumer.handle());
    let (callbacks, mut events) = recording_callbacks();
    channel.subscribe("Forbidden", callbacks).unwrap();

    let mut connection = welcome(&mut server).await;
    let command = connection.recv_command_within(WAIT).await.unwrap();
    connection.reject(command.identifier());

    assert_eq!(next_event(&mut events).await, Event::Rejected);
    assert_eq!(channel.status(), ChannelStatus::Unsubscribed);
    channel.subscribe("Forbidden", ChannelCallbacks::new()).unwrap();
}

#[tokio::test]
async fn test_disconnect_moves_back_to_pending() {
    let reconnect = ReconnectConfig {
        initial_delay_ms: 10,
        max_delay_ms: 10,
        stale_threshold_secs: 0,
        ..ReconnectConfig::default()
    };
    let (consumer, mut server) = start(reconnect);
    let channel = ChannelSubscription::new(consumer.handle());
    let (callbacks, mut events) = recording_callbacks();
    channel.subscribe("GraphqlChannel", callbacks).unwrap();

    let mut connection = welcome(&mut server).await;
    let identifier = confirm_next(&mut connection).await;
    assert_eq!(next_event(&mut events).await, Event::Connected);

    connection.close();
    assert_eq!(next_event(&mut events).await, Event::Disconnected(true));
    assert_eq!(channel.status(), ChannelStatus::Pending);
    assert_eq!(channel.identifier().as_deref(), Some(identifier.as_str()));

    let mut connection = welcome(&mut server).await;
    assert_eq!(confirm_next(&mut connection).await, identifier);
    assert_eq!(next_event(&mut events).await, Event::Connected);

    consumer.disconnect();
    assert_eq!(next_event(&mut events).await, Event::Disconnected(false));
    assert_eq!(channel.status(), ChannelStatus::Unsubscribed);
}

#[tokio::test]
async fn test_dropping_last_clone_unsubscribes() {
    let (consumer, mut server) = start(ReconnectConfig::disabled());
    let channel = ChannelSubscription::new(consumer.handle());
    let (callbacks, mut events) = recording_callbacks();
    channel.subscribe("GraphqlChannel", callbacks).unwrap();

    let mut connection = welcome(&mut server).await;
    let identifier = confirm_next(&mut connection).await;
    assert_eq!(next_event(&mut events).await, Event::Connected);

    let clone = channel.clone();
    drop(channel);
    assert!(connection.recv_command_within(QUIET).await.is_none());

    drop(clone);
    assert_eq!(
        connection.recv_command_within(WAIT).await.unwrap(),
        ClientCommand::unsubscribe(identifier.as_str())
    );
}

#[tokio::test]
async fn test_subscribe_after_consumer_closed() {
    let (consumer, _server) = start(ReconnectConfig::disabled());
    let handle = consumer.handle();
    let mut state = consumer.watch_state();
    consumer.disconnect();
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == crate::consumer::ConnectionState::Closed))
        .await
        .unwrap()
        .unwrap();

    let channel = ChannelSubscription::new(handle);
    let err = channel
        .subscribe("GraphqlChannel", ChannelCallbacks::new())
        .unwrap_err();
    assert!(matches!(err, ChannelError::Closed));
    assert_eq!(channel.status(), ChannelStatus::Unsubscribed);
}
