// Shared primitives for booting an arena server and driving it over WebSocket.
#![allow(dead_code)]

use arena_server::GameRules;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

// Upper bound for any single expected frame.
const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// Address of a running test server, e.g. `127.0.0.1:41234`.
pub struct TestServer {
    pub addr: String,
}

impl TestServer {
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Starts a fresh server with default rules on an ephemeral port.
///
/// The game is a single instance per server, so every test gets its own.
pub async fn spawn_server() -> TestServer {
    spawn_server_with(GameRules::default()).await
}

pub async fn spawn_server_with(rules: GameRules) -> TestServer {
    // Bind to an ephemeral port to avoid collisions with local services.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr").to_string();

    // Serve on the test runtime; the task dies with the test.
    tokio::spawn(async move {
        arena_server::run_with_rules(listener, rules)
            .await
            .expect("server failed");
    });

    TestServer { addr }
}

pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connects and consumes the greeting snapshot, which is returned.
    pub async fn connect(server: &TestServer) -> (Self, Value) {
        let (ws, _response) = connect_async(server.ws_url())
            .await
            .expect("websocket handshake");
        let mut client = Self { ws };
        let greeting = client.expect_type("GAME_STATE_UPDATE").await;
        (client, greeting)
    }

    pub async fn send(&mut self, kind: &str, payload: Value) {
        let frame = json!({ "type": kind, "payload": payload });
        self.send_raw(&frame.to_string()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("send frame");
    }

    /// Next JSON frame from the server, skipping control frames.
    pub async fn recv(&mut self) -> Value {
        loop {
            let msg = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("connection ended")
                .expect("websocket error");
            match msg {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str()).expect("server sent JSON");
                }
                Message::Close(frame) => panic!("server closed the connection: {frame:?}"),
                _ => continue,
            }
        }
    }

    /// Payload of the next frame of `kind`; other frames are skipped.
    pub async fn expect_type(&mut self, kind: &str) -> Value {
        self.expect_where(kind, |_| true).await
    }

    /// Payload of the next frame of `kind` whose payload satisfies `pred`.
    pub async fn expect_where(&mut self, kind: &str, pred: impl Fn(&Value) -> bool) -> Value {
        loop {
            let frame = self.recv().await;
            if frame["type"] == kind && pred(&frame["payload"]) {
                return frame["payload"].clone();
            }
        }
    }

    /// Joins and returns the assigned player id.
    pub async fn join(&mut self, pseudo: &str, grid_size: Option<u32>) -> String {
        self.send(
            "JOIN_GAME",
            json!({ "pseudo": pseudo, "couleur": "#00aaff", "gridSize": grid_size }),
        )
        .await;
        let payload = self.expect_type("JOINED_AS_PLAYER").await;
        payload["playerId"]
            .as_str()
            .expect("player id is a string")
            .to_string()
    }

    pub async fn act(&mut self, action_type: &str, x: i32, y: i32) {
        self.send(
            "REQUEST_ACTION",
            json!({ "actionType": action_type, "target": { "x": x, "y": y } }),
        )
        .await;
    }

    /// Waits for the close frame the server sends before dropping the socket.
    pub async fn expect_close(&mut self) -> Option<u16> {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for close");
            match next {
                Some(Ok(Message::Close(frame))) => return frame.map(|f| u16::from(f.code)),
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return None,
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// Looks up a player entry in a snapshot payload by pseudo.
pub fn player<'a>(snapshot: &'a Value, pseudo: &str) -> &'a Value {
    snapshot["players"]
        .as_array()
        .expect("players array")
        .iter()
        .find(|p| p["pseudo"] == pseudo)
        .expect("player present in snapshot")
}
