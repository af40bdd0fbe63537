//! Integration tests for the connection lifecycle.
//!
//! Each test runs a small WebSocket server on a loopback port and drives a
//! real [`Connection`] against it: connecting, sending, fan-out to handlers,
//! decode failures, and the reconnect supervisor.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use spread_connection::{
    CloseEvent, Connection, ConnectionConfig, ConnectionError, ConnectionState,
};
use spread_protocol::{Message, Path};
use spread_transport::TransportError;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

// =========================================================================
// Helpers
// =========================================================================

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("should have addr");
    (listener, format!("ws://{addr}"))
}

async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.expect("should accept");
    tokio_tungstenite::accept_async(stream)
        .await
        .expect("handshake should succeed")
}

/// Keeps polling the server side so close handshakes get answered.
fn drain(mut ws: ServerWs) {
    tokio::spawn(async move { while let Some(Ok(_)) = ws.next().await {} });
}

fn fast_config() -> ConnectionConfig {
    ConnectionConfig {
        timeout: Duration::from_secs(2),
        auto_reconnect: false,
        reconnect_delay: Duration::from_millis(50),
    }
}

/// Polls `condition` until it holds or two seconds pass.
async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

async fn next_text(ws: &mut ServerWs) -> String {
    loop {
        let msg = ws.next().await.expect("stream open").expect("frame ok");
        if let tungstenite::Message::Text(text) = msg {
            return text.as_str().to_owned();
        }
    }
}

// =========================================================================
// Connecting
// =========================================================================

#[tokio::test]
async fn test_connect_and_state() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(async move { accept(&listener).await });

    let conn = Connection::new(&url, fast_config());
    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert_eq!(conn.url(), url);

    conn.connect().await.expect("should connect");
    assert_eq!(conn.state(), ConnectionState::Connected);
    assert!(conn.is_open());
    drain(server.await.unwrap());
}

#[tokio::test]
async fn test_connect_twice_is_noop() {
    let (listener, url) = listen().await;
    let accepts = Arc::new(Mutex::new(0));
    {
        let accepts = Arc::clone(&accepts);
        tokio::spawn(async move {
            loop {
                let ws = accept(&listener).await;
                *accepts.lock() += 1;
                drain(ws);
            }
        });
    }

    let conn = Connection::new(&url, fast_config());
    let opened = Arc::new(Mutex::new(0));
    {
        let opened = Arc::clone(&opened);
        conn.on_open(move || *opened.lock() += 1);
    }

    conn.connect().await.unwrap();
    conn.connect().await.unwrap();

    assert!(eventually(|| *accepts.lock() == 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*accepts.lock(), 1);
    assert_eq!(*opened.lock(), 1);
}

#[tokio::test]
async fn test_connect_refused_fails() {
    let (listener, url) = listen().await;
    drop(listener);

    let conn = Connection::new(&url, fast_config());
    let result = conn.connect().await;

    assert!(matches!(result, Err(ConnectionError::ConnectFailed { .. })));
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_rejects_invalid_url() {
    let conn = Connection::new("http://127.0.0.1:1", fast_config());
    let result = conn.connect().await;
    assert!(matches!(
        result,
        Err(ConnectionError::ConnectFailed {
            source: TransportError::InvalidUrl { .. },
            ..
        })
    ));
}

#[tokio::test]
async fn test_connect_times_out_when_handshake_never_completes() {
    // Accepts TCP (via the backlog) but never speaks WebSocket.
    let (listener, url) = listen().await;

    let config = ConnectionConfig {
        timeout: Duration::from_millis(200),
        ..fast_config()
    };
    let conn = Connection::new(&url, config);
    let result = conn.connect().await;

    assert!(matches!(result, Err(ConnectionError::Timeout { .. })));
    assert_eq!(conn.state(), ConnectionState::Disconnected);
    drop(listener);
}

#[tokio::test]
async fn test_close_during_dial_stays_closed() {
    // Accepts TCP (via the backlog) but never speaks WebSocket.
    let (listener, url) = listen().await;

    let config = ConnectionConfig {
        timeout: Duration::from_millis(300),
        ..fast_config()
    };
    let conn = Connection::new(&url, config);
    let dialing = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.connect().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    conn.close();
    assert_eq!(conn.state(), ConnectionState::Closed);

    let result = dialing.await.expect("task should complete");
    assert!(matches!(result, Err(ConnectionError::Timeout { .. })));
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(!conn.is_open());
    drop(listener);
}

// =========================================================================
// Sending
// =========================================================================

#[tokio::test]
async fn test_send_before_connect_is_not_connected() {
    let conn = Connection::new("ws://127.0.0.1:1", fast_config());
    let result = conn.send(&Message::ping());
    assert!(matches!(result, Err(ConnectionError::NotConnected)));
}

#[tokio::test]
async fn test_frames_leave_in_submission_order() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(async move { accept(&listener).await });

    let conn = Connection::new(&url, fast_config());
    conn.connect().await.unwrap();
    let mut server_ws = server.await.unwrap();

    for key in ["a", "b", "c"] {
        conn.send(&Message::set(Path::single(key), 1)).unwrap();
    }

    for key in ["a", "b", "c"] {
        let text = next_text(&mut server_ws).await;
        let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(frame["type"], "set");
        assert_eq!(frame["data"]["path"], serde_json::json!([key]));
    }
}

#[tokio::test]
async fn test_send_after_close_is_closed() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(async move { accept(&listener).await });

    let conn = Connection::new(&url, fast_config());
    conn.connect().await.unwrap();
    drain(server.await.unwrap());

    conn.close();
    conn.close();

    assert!(!conn.is_open());
    assert!(matches!(conn.send(&Message::ping()), Err(ConnectionError::Closed)));
    assert!(matches!(conn.connect().await, Err(ConnectionError::Closed)));
    assert!(eventually(|| conn.state() == ConnectionState::Closed).await);
}

// =========================================================================
// Receiving
// =========================================================================

#[tokio::test]
async fn test_messages_fan_out_in_registration_order() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(async move { accept(&listener).await });

    let conn = Connection::new(&url, fast_config());
    let seen = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second"] {
        let seen = Arc::clone(&seen);
        conn.on_message(move |msg| seen.lock().push((tag, msg.clone())));
    }
    conn.connect().await.unwrap();
    let mut server_ws = server.await.unwrap();

    server_ws
        .send(tungstenite::Message::Text(
            r#"{"type":"set","data":{"path":["name"],"value":"Peter"}}"#.into(),
        ))
        .await
        .unwrap();

    assert!(eventually(|| seen.lock().len() == 2).await);
    let expected = Message::set(Path::single("name"), "Peter");
    assert_eq!(
        *seen.lock(),
        vec![("first", expected.clone()), ("second", expected)]
    );
}

#[tokio::test]
async fn test_undecodable_frame_goes_to_error_handlers() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(async move { accept(&listener).await });

    let conn = Connection::new(&url, fast_config());
    let errors = Arc::new(Mutex::new(Vec::new()));
    let messages = Arc::new(Mutex::new(Vec::new()));
    {
        let errors = Arc::clone(&errors);
        conn.on_error(move |e| errors.lock().push(e.to_string()));
        let messages = Arc::clone(&messages);
        conn.on_message(move |msg| messages.lock().push(msg.clone()));
    }
    conn.connect().await.unwrap();
    let mut server_ws = server.await.unwrap();

    for frame in ["not json", r#"{"data":{}}"#, r#"{"type":"ping"}"#] {
        server_ws
            .send(tungstenite::Message::Text(frame.into()))
            .await
            .unwrap();
    }

    assert!(eventually(|| messages.lock().len() == 1).await);
    assert_eq!(errors.lock().len(), 2);
    assert_eq!(messages.lock()[0], Message::ping());
    assert!(conn.is_open());
}

#[tokio::test]
async fn test_unknown_kind_is_delivered_as_unknown() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(async move { accept(&listener).await });

    let conn = Connection::new(&url, fast_config());
    let kinds = Arc::new(Mutex::new(Vec::new()));
    {
        let kinds = Arc::clone(&kinds);
        conn.on_message(move |msg| kinds.lock().push(msg.kind().to_owned()));
    }
    conn.connect().await.unwrap();
    let mut server_ws = server.await.unwrap();

    server_ws
        .send(tungstenite::Message::Text(r#"{"type":"teleport","data":{}}"#.into()))
        .await
        .unwrap();

    assert!(eventually(|| kinds.lock().len() == 1).await);
    assert_eq!(kinds.lock()[0], "teleport");
}

// =========================================================================
// Closing and reconnecting
// =========================================================================

#[tokio::test]
async fn test_server_close_is_reported_without_reconnect_when_disabled() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(async move { accept(&listener).await });

    let conn = Connection::new(&url, fast_config());
    let closes = Arc::new(Mutex::new(Vec::<CloseEvent>::new()));
    {
        let closes = Arc::clone(&closes);
        conn.on_close(move |event| closes.lock().push(event.clone()));
    }
    conn.connect().await.unwrap();

    let mut server_ws = server.await.unwrap();
    server_ws
        .close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "relay restarting".into(),
        }))
        .await
        .unwrap();

    assert!(eventually(|| closes.lock().len() == 1).await);
    assert_eq!(closes.lock()[0].code, 1001);
    assert_eq!(closes.lock()[0].reason, "relay restarting");
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(matches!(conn.send(&Message::ping()), Err(ConnectionError::NotConnected)));
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let (listener, url) = listen().await;
    tokio::spawn(async move {
        // First link: closed by the server straight away.
        let mut first = accept(&listener).await;
        first.close(None).await.ok();
        drain(first);
        // Second link: kept open.
        let second = accept(&listener).await;
        drain(second);
    });

    let config = ConnectionConfig {
        auto_reconnect: true,
        ..fast_config()
    };
    let conn = Connection::new(&url, config);
    let opened = Arc::new(Mutex::new(0));
    {
        let opened = Arc::clone(&opened);
        conn.on_open(move || *opened.lock() += 1);
    }

    conn.connect().await.unwrap();

    assert!(eventually(|| *opened.lock() == 2).await);
    assert!(conn.is_open());
    conn.send(&Message::ping()).expect("reconnected link accepts sends");
}

#[tokio::test]
async fn test_user_close_suppresses_reconnect() {
    let (listener, url) = listen().await;
    let accepts = Arc::new(Mutex::new(0));
    {
        let accepts = Arc::clone(&accepts);
        tokio::spawn(async move {
            loop {
                let ws = accept(&listener).await;
                *accepts.lock() += 1;
                drain(ws);
            }
        });
    }

    let config = ConnectionConfig {
        auto_reconnect: true,
        ..fast_config()
    };
    let conn = Connection::new(&url, config);
    conn.connect().await.unwrap();
    conn.close();

    assert!(eventually(|| conn.state() == ConnectionState::Closed).await);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(*accepts.lock(), 1);
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_close_during_backoff_cancels_reconnect() {
    let (listener, url) = listen().await;
    let accepts = Arc::new(Mutex::new(0));
    {
        let accepts = Arc::clone(&accepts);
        tokio::spawn(async move {
            loop {
                let mut ws = accept(&listener).await;
                *accepts.lock() += 1;
                ws.close(None).await.ok();
                drain(ws);
            }
        });
    }

    let config = ConnectionConfig {
        auto_reconnect: true,
        reconnect_delay: Duration::from_millis(300),
        ..fast_config()
    };
    let conn = Connection::new(&url, config);
    let closed = Arc::new(Mutex::new(0));
    {
        let closed = Arc::clone(&closed);
        conn.on_close(move |_| *closed.lock() += 1);
    }
    conn.connect().await.unwrap();

    assert!(eventually(|| *closed.lock() == 1).await);
    conn.close();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(*accepts.lock(), 1);
    assert_eq!(conn.state(), ConnectionState::Closed);
}
