#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use casparlink_api::ReconnectConfig;
use casparlink_core::{
    CoreError, DeviceCommand, DeviceSession, EventBroadcaster, EventKind, SessionConfig,
    SessionState,
};
use pretty_assertions::assert_eq;

use common::{FakeConnector, PEER, event_named, next_event, session_config, wait_connected, wait_for_state};

fn session_with(config: SessionConfig) -> (DeviceSession, Arc<FakeConnector>, common::DeviceLinks, EventBroadcaster) {
    let (connector, links) = FakeConnector::new();
    let events = EventBroadcaster::new(64);
    let session = DeviceSession::new(config, connector.clone(), events.clone());
    (session, connector, links, events)
}

fn cmd(line: &str) -> DeviceCommand {
    DeviceCommand::raw(line)
}

#[tokio::test]
async fn submit_while_disconnected_fails_without_touching_the_device() {
    let (session, connector, _links, _events) = session_with(session_config());

    let err = session.submit(&cmd("STOP 1-10")).await.unwrap_err();

    assert_eq!(err, CoreError::NotConnected);
    assert_eq!(connector.attempts(), 0);
    assert_eq!(session.current_state(), SessionState::Disconnected);
    assert_eq!(session.pending_count(), 0);
}

#[tokio::test]
async fn connect_emits_connected_and_commands_are_acknowledged() {
    let (session, _connector, mut links, events) = session_with(session_config());
    let mut sub = events.subscribe();

    session.connect().await.unwrap();
    let mut device = links.accept().await;

    assert!(session.is_connected());
    assert_eq!(
        session.current_state(),
        SessionState::Connected { peer: PEER.into() }
    );
    assert_eq!(
        next_event(&mut sub).await.kind,
        EventKind::Connected { peer: PEER.into() }
    );

    let submit = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(&cmd(r#"PLAY 1-10 "CLIP1""#)).await })
    };
    assert_eq!(device.command().await, r#"PLAY 1-10 "CLIP1""#);
    device.reply("202 PLAY OK").await;

    let receipt = submit.await.unwrap().unwrap();
    assert_eq!(receipt.seq, 1);
    assert_eq!(receipt.reply.code, 202);
    assert_eq!(receipt.reply.message, "PLAY OK");
    assert_eq!(session.pending_count(), 0);

    session.disconnect().await;
}

#[tokio::test]
async fn replies_are_matched_to_the_oldest_outstanding_command() {
    let (session, _connector, mut links, _events) = session_with(session_config());
    session.connect().await.unwrap();
    let mut device = links.accept().await;

    let mut handles = Vec::new();
    for layer in [10, 20, 30] {
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            let line = format!("STOP 1-{layer}");
            let receipt = session.submit(&cmd(&line)).await.unwrap();
            (line, receipt)
        }));
    }

    // Answer in wire order, echoing each line so correlation is visible.
    let mut written = Vec::new();
    for _ in 0..3 {
        written.push(device.command().await);
    }
    for line in &written {
        device.reply(&format!("202 {line}")).await;
    }

    let mut seqs = Vec::new();
    for handle in handles {
        let (line, receipt) = handle.await.unwrap();
        assert_eq!(receipt.reply.message, line);
        seqs.push((receipt.seq, line));
    }

    // Sequence numbers follow wire order.
    seqs.sort();
    let by_seq: Vec<_> = seqs.into_iter().map(|(_, line)| line).collect();
    assert_eq!(by_seq, written);

    session.disconnect().await;
}

#[tokio::test]
async fn device_rejection_is_reported_with_its_code() {
    let (session, _connector, mut links, _events) = session_with(session_config());
    session.connect().await.unwrap();
    let mut device = links.accept().await;

    let submit = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(&cmd(r#"PLAY 1-10 "MISSING""#)).await })
    };
    device.command().await;
    device.reply("404 PLAY FAILED").await;

    assert_eq!(
        submit.await.unwrap().unwrap_err(),
        CoreError::DeviceRejected {
            code: 404,
            message: "PLAY FAILED".into()
        }
    );
    assert!(session.is_connected());

    session.disconnect().await;
}

#[tokio::test]
async fn dropped_link_fails_pending_commands_and_reconnects() {
    let (session, _connector, mut links, events) = session_with(session_config());
    let mut sub = events.subscribe();
    let mut state = session.watch_state();

    session.connect().await.unwrap();
    let mut device = links.accept().await;

    let submit = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(&cmd("STOP 1-10")).await })
    };
    device.command().await;
    drop(device);

    assert_eq!(submit.await.unwrap().unwrap_err(), CoreError::ConnectionLost);
    assert_eq!(event_named(&mut sub, "connected").await.name(), "connected");
    let disconnected = event_named(&mut sub, "disconnected").await;
    assert!(matches!(disconnected.kind, EventKind::Disconnected { .. }));

    // The supervisor comes back on its own.
    let mut device = links.accept().await;
    wait_connected(&mut state).await;
    event_named(&mut sub, "connected").await;

    let submit = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(&cmd("STOP 1-10")).await })
    };
    device.ack_next().await;
    let receipt = submit.await.unwrap().unwrap();
    assert_eq!(receipt.seq, 2, "sequence numbers continue across links");

    session.disconnect().await;
}

#[tokio::test]
async fn ack_timeout_fails_the_command_and_resets_the_link() {
    let mut config = session_config();
    config.ack_timeout = Duration::from_millis(100);
    let (session, _connector, mut links, events) = session_with(config);
    let mut sub = events.subscribe();

    session.connect().await.unwrap();
    let mut device = links.accept().await;

    let submit = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(&cmd("STOP 1-10")).await })
    };
    device.command().await;
    // Never answer.

    let err = submit.await.unwrap().unwrap_err();
    assert!(matches!(err, CoreError::AckTimeout { seq: 1, timeout_ms: 100 }));

    let disconnected = event_named(&mut sub, "disconnected").await;
    assert_eq!(
        disconnected.kind,
        EventKind::Disconnected {
            reason: "link reset".into()
        }
    );
    let _fresh = links.accept().await;

    session.disconnect().await;
}

#[tokio::test]
async fn ack_timeout_without_reset_keeps_the_link() {
    let mut config = session_config();
    config.ack_timeout = Duration::from_millis(100);
    config.reset_on_ack_timeout = false;
    let (session, _connector, mut links, _events) = session_with(config);

    session.connect().await.unwrap();
    let mut device = links.accept().await;

    let late = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(&cmd("STOP 1-10")).await })
    };
    device.command().await;
    assert!(matches!(
        late.await.unwrap(),
        Err(CoreError::AckTimeout { .. })
    ));
    assert!(session.is_connected());

    // The late reply still consumes the timed-out slot, so the next
    // command gets its own reply.
    device.reply("202 STOP OK").await;
    let next = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(&cmd("CLEAR 1-10")).await })
    };
    assert_eq!(device.command().await, "CLEAR 1-10");
    device.reply("202 CLEAR OK").await;
    assert_eq!(next.await.unwrap().unwrap().reply.message, "CLEAR OK");

    session.disconnect().await;
}

#[tokio::test]
async fn failed_first_connect_is_reported_and_retried() {
    let (session, connector, mut links, events) = session_with(session_config());
    let mut sub = events.subscribe();
    let mut state = session.watch_state();
    connector.set_refuse(true);

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, CoreError::ConnectionFailed { .. }));

    connector.set_refuse(false);
    let _device = links.accept().await;
    wait_connected(&mut state).await;

    assert!(connector.attempts() >= 2);
    // Failed attempts are not broadcast; the first event is the connect.
    assert_eq!(next_event(&mut sub).await.name(), "connected");

    session.disconnect().await;
}

#[tokio::test]
async fn retry_limit_stops_the_supervisor() {
    let mut config = session_config();
    config.reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(5),
        max_retries: Some(2),
    };
    let (session, connector, _links, _events) = session_with(config);
    connector.set_refuse(true);

    assert!(session.connect().await.is_err());

    // One initial attempt plus two retries, then nothing more.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(connector.attempts(), 3);
    assert_eq!(session.current_state(), SessionState::Disconnected);

    // A stopped supervisor can be started again.
    connector.set_refuse(false);
    session.connect().await.unwrap();
    assert!(session.is_connected());

    session.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn device_that_hangs_up_at_once_is_redialled_with_growing_delays() {
    let mut config = session_config();
    config.reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_secs(5),
        max_retries: None,
    };
    let (session, connector, _links, _events) = session_with(config);
    connector.set_hang_up(true);

    session.connect().await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    // 20ms doubling reaches 2s after about seven attempts; a delay stuck at
    // 20ms would make about a hundred.
    let attempts = connector.attempts();
    assert!((3..=10).contains(&attempts), "{attempts} attempts in 2s");

    session.disconnect().await;
}

#[tokio::test]
async fn disconnect_closes_the_link_and_rejects_new_commands() {
    let (session, _connector, mut links, events) = session_with(session_config());
    let mut sub = events.subscribe();

    session.connect().await.unwrap();
    let mut device = links.accept().await;
    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(&cmd("STOP 1-10")).await })
    };
    device.command().await;

    session.disconnect().await;

    assert_eq!(pending.await.unwrap().unwrap_err(), CoreError::ConnectionLost);
    assert_eq!(session.current_state(), SessionState::Disconnected);
    assert_eq!(
        event_named(&mut sub, "disconnected").await.kind,
        EventKind::Disconnected {
            reason: "disconnect requested".into()
        }
    );
    assert_eq!(
        session.submit(&cmd("STOP 1-10")).await.unwrap_err(),
        CoreError::NotConnected
    );

    // Disconnecting twice is harmless.
    session.disconnect().await;
}

#[tokio::test]
async fn handshake_sends_version_before_going_live() {
    let mut config = session_config();
    config.handshake = true;
    let (session, _connector, mut links, _events) = session_with(config);
    let mut state = session.watch_state();

    let connect = {
        let session = session.clone();
        tokio::spawn(async move { session.connect().await })
    };
    let mut device = links.accept().await;
    assert_eq!(device.command().await, "VERSION");
    assert!(!session.is_connected());
    device.reply("201 VERSION OK\r\n2.3.3.0 LTS").await;

    connect.await.unwrap().unwrap();
    wait_connected(&mut state).await;

    session.disconnect().await;
}

#[tokio::test]
async fn rejected_handshake_counts_as_a_failed_attempt() {
    let mut config = session_config();
    config.handshake = true;
    let (session, _connector, mut links, _events) = session_with(config);
    let mut state = session.watch_state();

    let connect = {
        let session = session.clone();
        tokio::spawn(async move { session.connect().await })
    };
    let mut device = links.accept().await;
    device.command().await;
    device.reply("500 FAILED").await;

    assert!(matches!(
        connect.await.unwrap(),
        Err(CoreError::ConnectionFailed { .. })
    ));
    wait_for_state(&mut state, |s| matches!(s, SessionState::Connecting { attempt } if *attempt >= 2)).await;

    session.disconnect().await;
}
