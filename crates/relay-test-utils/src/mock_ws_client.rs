use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::tungstenite::protocol::Message;

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A thin WebSocket client for driving the relay's `/e/{event}/ws` endpoint
/// in integration tests. Frames are plain JSON values — the relay's wire
/// protocol has no single client-side enum to deserialize into, since a
/// test plays both PC and mobile roles.
pub struct MockWsClient {
    write: futures_util::stream::SplitSink<WsStream, Message>,
    read: futures_util::stream::SplitStream<WsStream>,
}

impl MockWsClient {
    pub async fn connect(url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (write, read) = ws_stream.split();
        Ok(Self { write, read })
    }

    pub async fn send_json(&mut self, value: &serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string(value)?;
        self.write.send(Message::Text(json.into())).await?;
        Ok(())
    }

    pub async fn send_text(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.write.send(Message::Text(text.to_owned().into())).await?;
        Ok(())
    }

    /// Receive the next text frame, skipping ping/pong control frames.
    pub async fn recv_json(&mut self) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    let value: serde_json::Value = serde_json::from_str(&text)?;
                    return Ok(value);
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    return Err(format!("connection closed by server: {:?}", frame).into());
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err("connection stream ended".into()),
            }
        }
    }

    /// Receive the next frame with a timeout, for asserting liveness/grace windows.
    pub async fn recv_json_timeout(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        tokio::time::timeout(timeout, self.recv_json())
            .await
            .map_err(|_| "timed out waiting for frame".into())
            .and_then(|inner| inner)
    }

    pub async fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.write.send(Message::Close(None)).await?;
        Ok(())
    }
}
