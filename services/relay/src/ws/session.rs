use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tracing::warn;

use relay_protocol::{error_codes, CmdFrame, EvtFrame, HbAckFrame, JoinFrame, PcAuthFrame, ServerFrame};

use crate::event::{EventHandle, IncomingFrame, WriterMessage};
use crate::state::AppState;

/// `GET /e/{event}/ws`. If the client advertises a protocol list, prefer
/// `v1` when present, otherwise echo the client's first offered protocol;
/// a client that offers nothing still connects with no negotiated
/// `Sec-WebSocket-Protocol` in the response.
pub async fn ws_upgrade(
    Path(event_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if !relay_protocol::is_valid_event_id(&event_id) {
        return (StatusCode::NOT_FOUND, "unknown event").into_response();
    }

    let handle = state.get_or_create(&event_id).await;
    let chosen = negotiate_subprotocol(&headers);
    match chosen {
        Some(protocol) => ws
            .protocols([protocol])
            .on_upgrade(move |socket| handle_socket(socket, handle)),
        None => ws.on_upgrade(move |socket| handle_socket(socket, handle)),
    }
}

fn negotiate_subprotocol(headers: &HeaderMap) -> Option<String> {
    let offered = headers.get("sec-websocket-protocol")?.to_str().ok()?;
    let mut offered = offered.split(',').map(str::trim).filter(|p| !p.is_empty());
    let first = offered.next()?;
    if first == "v1" {
        return Some("v1".to_owned());
    }
    if offered.clone().any(|p| p == "v1") {
        Some("v1".to_owned())
    } else {
        Some(first.to_owned())
    }
}

async fn handle_socket(mut socket: WebSocket, handle: EventHandle) {
    let (tx, mut rx) = mpsc::unbounded_channel::<WriterMessage>();
    let socket_id = handle.connect(tx.clone()).await;

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match parse_frame(&text) {
                            Ok(frame) => handle.dispatch(socket_id, frame).await,
                            Err(code) => {
                                // A parse-level rejection doesn't depend on any
                                // per-event state, so it's answered directly
                                // rather than round-tripped through the actor.
                                let _ = tx.send(WriterMessage::Frame(ServerFrame::error(code)));
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Binary(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        warn!(error = %err, "websocket read error");
                        break;
                    }
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Some(WriterMessage::Frame(frame)) => {
                        if socket.send(Message::Text(frame.to_json().into())).await.is_err() {
                            break;
                        }
                    }
                    Some(WriterMessage::Close { code, reason }) => {
                        let _ = socket
                            .send(Message::Close(Some(CloseFrame {
                                code,
                                reason: reason.into(),
                            })))
                            .await;
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    handle.disconnect(socket_id).await;
}

/// Classifies a raw text frame by its `type` field, rejecting anything that
/// isn't valid JSON or doesn't carry `v: 1` before the actor ever sees it.
fn parse_frame(text: &str) -> Result<IncomingFrame, &'static str> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|_| error_codes::BAD_JSON)?;

    let version = value.get("v").and_then(serde_json::Value::as_u64);
    if version != Some(u64::from(relay_protocol::PROTOCOL_VERSION)) {
        return Err(error_codes::BAD_VERSION);
    }

    let frame_type = value.get("type").and_then(serde_json::Value::as_str).unwrap_or("");
    match frame_type {
        "pc-auth" => serde_json::from_value::<PcAuthFrame>(value)
            .map(|frame| IncomingFrame::PcAuth { frame, path: None })
            .map_err(|_| error_codes::BAD_JSON),
        "join" => serde_json::from_value::<JoinFrame>(value)
            .map(IncomingFrame::Join)
            .map_err(|_| error_codes::BAD_JSON),
        "cmd" => serde_json::from_value::<CmdFrame>(value)
            .map(IncomingFrame::Cmd)
            .map_err(|_| error_codes::BAD_JSON),
        "evt" => serde_json::from_value::<EvtFrame>(value)
            .map(IncomingFrame::Evt)
            .map_err(|_| error_codes::BAD_JSON),
        "hb-ack" => serde_json::from_value::<HbAckFrame>(value)
            .map(IncomingFrame::HbAck)
            .map_err(|_| error_codes::BAD_JSON),
        _ => Ok(IncomingFrame::Echo(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_version() {
        let err = parse_frame(r#"{"type":"join","sid":"ABCDEFGHIJ"}"#).unwrap_err();
        assert_eq!(err, error_codes::BAD_VERSION);
    }

    #[test]
    fn rejects_wrong_version() {
        let err = parse_frame(r#"{"v":2,"type":"join","sid":"ABCDEFGHIJ"}"#).unwrap_err();
        assert_eq!(err, error_codes::BAD_VERSION);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_frame("{not json").unwrap_err();
        assert_eq!(err, error_codes::BAD_JSON);
    }

    #[test]
    fn parses_join_frame() {
        let frame = parse_frame(r#"{"v":1,"type":"join","sid":"ABCDEFGHIJ"}"#).unwrap();
        assert!(matches!(frame, IncomingFrame::Join(JoinFrame { sid, .. }) if sid == "ABCDEFGHIJ"));
    }

    #[test]
    fn unknown_type_falls_back_to_echo() {
        let frame = parse_frame(r#"{"v":1,"type":"mystery","x":1}"#).unwrap();
        assert!(matches!(frame, IncomingFrame::Echo(_)));
    }
}
