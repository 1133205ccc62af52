//! Per-connection lifecycle.
//!
//! Each socket gets its own task: upgrade (validating the query
//! parameters), match resolution, an initial snapshot, then a writer
//! task draining the outbound channel while the read loop feeds moves
//! to the coordinator. Losing the socket is not an error, it arms the
//! grace timer via `detach`.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use fourline_protocol::{encode_reply, parse_client_line, ClientCommand, ServerReply};

use crate::coordinator::Coordinator;

/// Connection-establishment query parameters.
struct ConnectParams {
    username: String,
    game_id: Option<String>,
}

fn parse_query(query: Option<&str>) -> ConnectParams {
    let mut username = String::new();
    let mut game_id = None;
    if let Some(query) = query {
        for pair in query.split('&') {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or_default();
            let value = parts.next().unwrap_or_default();
            match key {
                "username" => username = value.to_string(),
                "gameID" => {
                    if !value.is_empty() {
                        game_id = Some(value.to_string());
                    }
                }
                _ => {}
            }
        }
    }
    ConnectParams { username, game_id }
}

/// Drive one client connection from handshake to detach.
pub(crate) async fn handle(
    stream: TcpStream,
    peer: SocketAddr,
    coordinator: Coordinator,
) -> anyhow::Result<()> {
    // Read the query parameters during the upgrade; without a username
    // the upgrade itself is rejected with a client error.
    let mut params: Option<ConnectParams> = None;
    let ws = accept_hdr_async(stream, |req: &Request, resp: Response| {
        let parsed = parse_query(req.uri().query());
        if parsed.username.is_empty() {
            let mut reject = ErrorResponse::new(Some("username required".to_string()));
            *reject.status_mut() = StatusCode::BAD_REQUEST;
            return Err(reject);
        }
        params = Some(parsed);
        Ok(resp)
    })
    .await?;

    let Some(params) = params else {
        // The callback runs on every successful handshake.
        return Ok(());
    };
    let username = params.username;
    debug!(%peer, %username, "connection established");

    let (match_id, state) = coordinator
        .resolve_session(&username, params.game_id.as_deref())
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    coordinator.attach(&match_id, &username, tx.clone()).await;

    // Initial snapshot straight to this connection.
    let _ = tx.send(ServerReply::state(&state));

    let (mut sink, mut source) = ws.split();

    // Writer task: drain outbound replies into the socket.
    let writer = tokio::spawn(async move {
        while let Some(reply) = rx.recv().await {
            let json = match encode_reply(&reply) {
                Ok(json) => json,
                Err(_) => continue,
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Read loop: anything but a well-formed drop command is ignored.
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Some(ClientCommand::Drop { column }) = parse_client_line(text.as_str()) {
                    coordinator.play_move(&match_id, &username, column).await;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(%peer, %username, error = %err, "socket error");
                break;
            }
        }
    }

    writer.abort();
    coordinator.detach(&match_id, &username).await;
    debug!(%peer, %username, "connection closed");
    Ok(())
}
