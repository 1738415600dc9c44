/*
[INPUT]:  Local WebSocket server scenarios
[OUTPUT]: Test results for the streaming session
[POS]:    Integration tests - WebSocket
[UPDATE]: When the streaming session changes
*/

mod common;

use std::time::Duration;

use common::sample_principals;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tda_client::{StreamEvent, StreamEventKind, Streamer, StreamerOptions, TdaError, Verbosity};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_test::assert_ok;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const EVENT_WAIT: Duration = Duration::from_secs(5);

/// Accepts one session, records the first two frames, pushes one message, then closes
async fn spawn_stream_server() -> (Url, oneshot::Receiver<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("ws://{}/ws", listener.local_addr().unwrap())).unwrap();
    let (frames_tx, frames_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let mut frames = Vec::new();
        while frames.len() < 2 {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    frames.push(serde_json::from_str(text.as_str()).unwrap())
                }
                Some(Ok(_)) => {}
                other => panic!("stream ended early: {other:?}"),
            }
        }
        let _ = frames_tx.send(frames);

        let notify = json!({ "notify": [{ "heartbeat": "1609459200000" }] });
        ws.send(Message::Text(notify.to_string().into())).await.unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    (url, frames_rx)
}

async fn collect_events(rx: &mut mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(EVENT_WAIT, rx.recv())
            .await
            .expect("session should finish");
        match event {
            Some(StreamEvent::Disconnected) => {
                events.push(StreamEvent::Disconnected);
                return events;
            }
            Some(event) => events.push(event),
            None => return events,
        }
    }
}

fn kinds(events: &[StreamEvent]) -> Vec<StreamEventKind> {
    events.iter().map(StreamEvent::kind).collect()
}

#[tokio::test]
async fn test_login_is_first_frame_and_events_are_ordered() {
    let (url, frames_rx) = spawn_stream_server().await;
    let principals = sample_principals("unused.example.test");
    let mut streamer = assert_ok!(Streamer::new(
        &principals,
        StreamerOptions {
            url: Some(url),
            verbosity: Verbosity::Debug,
            ..Default::default()
        },
    ));
    let mut events = streamer.take_receiver().unwrap();

    let subscribe = streamer.service_request("QUOTE", "SUBS").parameter("keys", "AAPL");
    assert_eq!(subscribe.requestid, 1);
    assert_ok!(streamer.request(&json!({ "requests": [subscribe] })).await);

    let frames = assert_ok!(frames_rx.await);
    let login = &frames[0]["requests"][0];
    assert_eq!(login["service"], "ADMIN");
    assert_eq!(login["command"], "LOGIN");
    assert_eq!(login["requestid"], 0);
    assert_eq!(login["account"], "123456789");
    assert_eq!(login["source"], "MYAPP");
    assert_eq!(login["parameters"]["token"], "streamer-token");
    assert_eq!(login["parameters"]["version"], "1.0");
    let credential = login["parameters"]["credential"].as_str().unwrap();
    assert!(credential.starts_with("userid=123456789&token=streamer-token&company=AMER"));
    assert!(credential.contains("timestamp=1609459200000"));
    assert!(credential.contains("authorized=Y"));

    let request = &frames[1]["requests"][0];
    assert_eq!(request["service"], "QUOTE");
    assert_eq!(request["parameters"]["keys"], "AAPL");

    let events = collect_events(&mut events).await;
    assert_eq!(
        kinds(&events),
        vec![
            StreamEventKind::Connected,
            StreamEventKind::Message,
            StreamEventKind::Disconnected,
        ]
    );
    match &events[1] {
        StreamEvent::Message(body) => {
            assert_eq!(body["notify"][0]["heartbeat"], "1609459200000")
        }
        other => panic!("expected message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_failure_reports_error_then_disconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let principals = sample_principals("unused.example.test");
    let mut streamer = assert_ok!(Streamer::new(
        &principals,
        StreamerOptions {
            url: Some(Url::parse(&format!("ws://{addr}/ws")).unwrap()),
            ..Default::default()
        },
    ));
    let mut rx = streamer.take_receiver().unwrap();

    let events = collect_events(&mut rx).await;
    assert_eq!(
        kinds(&events),
        vec![StreamEventKind::Error, StreamEventKind::Disconnected]
    );
    assert!(matches!(events[0], StreamEvent::Error(TdaError::WebSocket(_))));

    let err = streamer.request(&json!({ "requests": [] })).await.unwrap_err();
    assert!(matches!(err, TdaError::SessionClosed));
    assert!(streamer.is_closed());
}

#[tokio::test]
async fn test_receiver_taken_once() {
    let principals = sample_principals("127.0.0.1:1");
    let mut streamer = assert_ok!(Streamer::new(&principals, StreamerOptions::default()));

    assert_eq!(streamer.url().as_str(), "wss://127.0.0.1:1/ws");
    assert!(streamer.take_receiver().is_some());
    assert!(streamer.take_receiver().is_none());
}

#[tokio::test]
async fn test_bad_account_index_is_rejected() {
    let principals = sample_principals("unused.example.test");
    let result = Streamer::new(
        &principals,
        StreamerOptions {
            account_index: 2,
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(TdaError::InvalidResponse(_))));
}
