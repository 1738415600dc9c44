/*
[INPUT]:  User principals, account index, verbosity, caller request bodies
[OUTPUT]: Session events (connected, message, error, disconnected) via channel
[POS]:    WebSocket layer - streaming session with login handshake
[UPDATE]: When changing connection lifecycle or outbound handling
*/

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, error, info};
use url::Url;

use crate::http::{Result, TdaError};
use crate::types::UserPrincipals;
use crate::ws::message::{LOGIN_REQUEST_ID, login_request};
use crate::ws::{CredentialBlock, ServiceRequest, StreamEvent, Verbosity};

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const OUTBOUND_CHANNEL_CAPACITY: usize = 100;
const RAW_LOG_MAX_BYTES: usize = 1024;

/// Options for a streaming session
#[derive(Debug, Clone, Default)]
pub struct StreamerOptions {
    /// Index into `UserPrincipals::accounts`
    pub account_index: usize,
    pub verbosity: Verbosity,
    /// Overrides `wss://<streamerSocketUrl>/ws`
    pub url: Option<Url>,
}

/// One streaming session over a WebSocket.
///
/// The socket is opened as soon as the session is created; the login request
/// is always the first frame written. Requests issued earlier wait behind it.
/// Dropping the session closes the socket. There is no reconnect: create a
/// new session after `Disconnected`.
#[derive(Debug)]
pub struct Streamer {
    url: Url,
    account_index: usize,
    account_id: String,
    source: String,
    outbound_tx: mpsc::Sender<WsMessage>,
    event_rx: Option<mpsc::Receiver<StreamEvent>>,
    next_request_id: AtomicU64,
}

impl Streamer {
    /// Derive the login credentials and start connecting.
    ///
    /// Must be called from within a Tokio runtime. Fails only when the
    /// credentials cannot be derived; connection failures arrive as events.
    pub fn new(principals: &UserPrincipals, options: StreamerOptions) -> Result<Self> {
        let credentials = CredentialBlock::from_principals(principals, options.account_index)?;
        let source = principals.streamer_info.app_id.clone();
        let url = match options.url {
            Some(url) => url,
            None => stream_url(&principals.streamer_info.streamer_socket_url)?,
        };
        let login = serde_json::to_string(&login_request(&credentials, &source))?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);

        tokio::spawn(run_session(
            url.clone(),
            login,
            options.verbosity,
            outbound_rx,
            event_tx,
        ));

        Ok(Self {
            url,
            account_index: options.account_index,
            account_id: credentials.userid,
            source,
            outbound_tx,
            event_rx: Some(event_rx),
            next_request_id: AtomicU64::new(LOGIN_REQUEST_ID + 1),
        })
    }

    /// Take the event receiver; `None` once taken
    pub fn take_receiver(&mut self) -> Option<mpsc::Receiver<StreamEvent>> {
        self.event_rx.take()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn account_index(&self) -> usize {
        self.account_index
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// True once the session task has stopped accepting requests
    pub fn is_closed(&self) -> bool {
        self.outbound_tx.is_closed()
    }

    /// Request id for the next caller command; ids start at 1 (0 is the login)
    pub fn next_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Service request pre-filled with this session's account, source and a fresh id
    pub fn service_request(&self, service: &str, command: &str) -> ServiceRequest {
        ServiceRequest::new(
            service,
            command,
            self.next_request_id(),
            self.account_id.clone(),
            self.source.clone(),
        )
    }

    /// Serialize `body` to JSON and send it as-is.
    ///
    /// No validation or acknowledgment tracking; responses arrive as
    /// `Message` events.
    pub async fn request<T: Serialize + ?Sized>(&self, body: &T) -> Result<()> {
        let payload = serde_json::to_string(body)?;
        self.outbound_tx
            .send(WsMessage::Text(payload.into()))
            .await
            .map_err(|_| TdaError::SessionClosed)
    }
}

/// `wss://<host>/ws`
pub fn stream_url(streamer_socket_url: &str) -> Result<Url> {
    let host = streamer_socket_url.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(TdaError::InvalidResponse(
            "user principals has an empty streamerSocketUrl".to_string(),
        ));
    }
    Ok(Url::parse(&format!("wss://{host}/ws"))?)
}

async fn run_session(
    url: Url,
    login: String,
    verbosity: Verbosity,
    mut outbound_rx: mpsc::Receiver<WsMessage>,
    events: mpsc::Sender<StreamEvent>,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(err) => {
            if verbosity.logs_errors() {
                error!(%url, error = %err, "stream connection failed");
            }
            let _ = events.send(StreamEvent::Error(err.into())).await;
            finish(outbound_rx, &events, verbosity).await;
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    if let Err(err) = write.send(WsMessage::Text(login.into())).await {
        if verbosity.logs_errors() {
            error!(%url, error = %err, "stream login send failed");
        }
        let _ = events.send(StreamEvent::Error(err.into())).await;
        finish(outbound_rx, &events, verbosity).await;
        return;
    }

    if verbosity.logs_frames() {
        info!(%url, "stream connected, login sent");
    }
    if events.send(StreamEvent::Connected).await.is_err() {
        let _ = write.close().await;
        return;
    }

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(message) => {
                        if verbosity.logs_frames() {
                            debug!(message = %preview(&message), "stream request sent");
                        }
                        if let Err(err) = write.send(message).await {
                            if verbosity.logs_errors() {
                                error!(error = %err, "stream send failed");
                            }
                            let _ = events.send(StreamEvent::Error(err.into())).await;
                            break;
                        }
                    }
                    None => {
                        let _ = write.send(WsMessage::Close(None)).await;
                        break;
                    }
                }
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(WsMessage::Close(_))) | None => {
                        let _ = write.close().await;
                        break;
                    }
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                    Some(Ok(message)) => {
                        if events.send(frame_event(message, verbosity)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        let fatal = is_fatal(&err);
                        if verbosity.logs_errors() {
                            error!(error = %err, fatal, "stream transport error");
                        }
                        if events.send(StreamEvent::Error(err.into())).await.is_err() || fatal {
                            break;
                        }
                    }
                }
            }
        }
    }

    finish(outbound_rx, &events, verbosity).await;
}

/// Refuse further requests, then report the close.
async fn finish(
    mut outbound_rx: mpsc::Receiver<WsMessage>,
    events: &mpsc::Sender<StreamEvent>,
    verbosity: Verbosity,
) {
    outbound_rx.close();
    if verbosity.logs_frames() {
        info!("stream disconnected");
    }
    let _ = events.send(StreamEvent::Disconnected).await;
}

/// Decode one inbound frame. Decode failures are frame content, not
/// transport errors, so they are only logged at `debug` verbosity.
fn frame_event(message: WsMessage, verbosity: Verbosity) -> StreamEvent {
    if verbosity.logs_frames() {
        debug!(message = %preview(&message), "stream frame received");
    }
    let event = parse_frame(message);
    if let StreamEvent::Error(err) = &event {
        if verbosity.logs_frames() {
            debug!(error = %err, "stream frame is not valid json");
        }
    }
    event
}

fn parse_frame(message: WsMessage) -> StreamEvent {
    let parsed = match &message {
        WsMessage::Text(text) => serde_json::from_str(text.as_str()),
        WsMessage::Binary(bytes) => serde_json::from_slice(bytes),
        _ => return StreamEvent::Message(serde_json::Value::Null),
    };
    match parsed {
        Ok(value) => StreamEvent::Message(value),
        Err(err) => StreamEvent::Error(err.into()),
    }
}

fn is_fatal(err: &WsError) -> bool {
    !matches!(err, WsError::Capacity(_) | WsError::Utf8 { .. })
}

fn preview(message: &WsMessage) -> String {
    match message {
        WsMessage::Text(text) => truncate_for_log(text.as_str(), RAW_LOG_MAX_BYTES),
        WsMessage::Binary(bytes) => format!("<{} binary bytes>", bytes.len()),
        other => format!("{other:?}"),
    }
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio_tungstenite::tungstenite::error::CapacityError;

    #[test]
    fn test_stream_url() {
        let url = stream_url("streamer-ws.tdameritrade.com").unwrap();
        assert_eq!(url.as_str(), "wss://streamer-ws.tdameritrade.com/ws");
        assert!(stream_url("  ").is_err());
    }

    #[test]
    fn test_parse_frame() {
        match parse_frame(WsMessage::Text(r#"{"notify":[{"heartbeat":"1"}]}"#.into())) {
            StreamEvent::Message(value) => assert_eq!(value["notify"][0]["heartbeat"], "1"),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            parse_frame(WsMessage::Text("not json".into())),
            StreamEvent::Error(TdaError::Serialization(_))
        ));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logs_for_bad_frame(verbosity: Verbosity) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let event = tracing::subscriber::with_default(subscriber, || {
            frame_event(WsMessage::Text("not json".into()), verbosity)
        });
        assert!(matches!(event, StreamEvent::Error(TdaError::Serialization(_))));
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_bad_frame_logged_only_at_debug_verbosity() {
        assert!(logs_for_bad_frame(Verbosity::None).is_empty());
        assert!(logs_for_bad_frame(Verbosity::Error).is_empty());
        assert!(logs_for_bad_frame(Verbosity::Debug).contains("not valid json"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("ééé", 3), "é...");
    }

    #[test]
    fn test_fatal_errors() {
        assert!(is_fatal(&WsError::ConnectionClosed));
        assert!(!is_fatal(&WsError::Capacity(CapacityError::MessageTooLong {
            size: 32,
            max_size: 16,
        })));
    }
}
