use crate::ConnectionState;
use crate::request;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use hearth_types::{AudioFrame, FrameQueue, SttReply};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = futures_util::stream::SplitSink<WsStream, Message>;

/// One-time protocol handshake sent as the first text frame of a stream.
const STT_HANDSHAKE: &str = r#"{ "ver": 1 }"#;

/// Notifications the STT client delivers to the orchestration task.
#[derive(Debug)]
pub enum SttLink {
    /// The transport resolved; hand the stream back via
    /// [`SttClient::on_open`].
    Opened(Box<WsStream>),
    /// Connecting failed. No retry is scheduled; the session stays idle
    /// until the next wake event reconnects explicitly.
    ConnectFailed,
    /// Terminal reply: recognized text (wake phrase not yet stripped).
    Recognized(String),
    /// Terminal reply: the service could not recognize the utterance.
    NotRecognized { status: i64 },
    /// The transport closed.
    Closed,
}

#[derive(Debug, Clone)]
pub struct SttConfig {
    base_url: String,
}

impl SttConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Streaming client for the speech-to-text service.
///
/// Strictly one-shot per utterance: connect, stream frames, read the single
/// JSON reply, close. Frames sent before the transport is open are queued
/// and flushed in capture order the moment it opens, so ordering holds
/// across the connect boundary.
pub struct SttClient {
    config: SttConfig,
    state: ConnectionState,
    queue: FrameQueue,
    writer: Option<WsWriter>,
    link_tx: tokio::sync::mpsc::Sender<SttLink>,
}

impl SttClient {
    pub fn new(config: SttConfig, link_tx: tokio::sync::mpsc::Sender<SttLink>) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            queue: FrameQueue::new(),
            writer: None,
            link_tx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn is_open(&self) -> bool {
        self.state == ConnectionState::Open && self.writer.is_some()
    }

    /// Start the transport for the next utterance. Resolution arrives on
    /// the link channel as `Opened` or `ConnectFailed`; frames sent in the
    /// meantime are queued.
    pub fn connect(&mut self) {
        let request = match request::build_stt_request(self.config.base_url()) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("invalid STT endpoint {}: {}", self.config.base_url(), e);
                return;
            }
        };

        tracing::debug!("STT connecting to {}", request.uri());
        self.state = ConnectionState::Connecting;
        self.writer = None;

        let link = self.link_tx.clone();
        tokio::spawn(async move {
            match connect_async(request).await {
                Ok((stream, _)) => {
                    if link.send(SttLink::Opened(Box::new(stream))).await.is_err() {
                        tracing::warn!("STT link channel dropped before open");
                    }
                }
                Err(e) => {
                    tracing::error!("STT connect failed: {}", e);
                    let _ = link.send(SttLink::ConnectFailed).await;
                }
            }
        });
    }

    /// Complete the handshake on a freshly opened transport: send the
    /// protocol header, flush every queued frame in order, and start the
    /// reader that waits for the terminal reply.
    pub async fn on_open(&mut self, stream: WsStream) -> Result<()> {
        let (mut write, mut read) = stream.split();
        write
            .send(Message::Text(STT_HANDSHAKE.to_string()))
            .await
            .context("failed to send STT handshake")?;

        self.writer = Some(write);
        self.state = ConnectionState::Open;
        self.flush_queue().await?;

        let link = self.link_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        tracing::debug!("STT reply: {}", text);
                        let outcome = match serde_json::from_str::<SttReply>(&text) {
                            Ok(reply) => match (reply.is_ok(), reply.text()) {
                                (true, Some(recognized)) => {
                                    SttLink::Recognized(recognized.to_string())
                                }
                                _ => SttLink::NotRecognized {
                                    status: reply.status(),
                                },
                            },
                            Err(e) => {
                                tracing::warn!("malformed STT reply: {}", e);
                                SttLink::NotRecognized { status: -1 }
                            }
                        };
                        if link.send(outcome).await.is_err() {
                            break;
                        }
                        // One reply per stream; anything after it is noise.
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(other) => {
                        tracing::warn!("unexpected STT message: {:?}", other);
                    }
                    Err(e) => {
                        tracing::error!("STT read failed: {}", e);
                        break;
                    }
                }
            }
            let _ = link.send(SttLink::Closed).await;
        });

        Ok(())
    }

    /// Stream one captured frame, or queue it while the transport is not
    /// yet open.
    pub async fn send_frame(&mut self, frame: AudioFrame) -> Result<()> {
        if self.is_open() {
            self.flush_queue().await?;
            self.transmit(frame).await
        } else {
            self.queue.enqueue(frame);
            Ok(())
        }
    }

    /// Mark the end of the utterance with the zero-length terminator. When
    /// the transport is not open, the sentinel is queued so it keeps its
    /// place behind the frames it terminates.
    pub async fn send_done(&mut self) -> Result<()> {
        if self.is_open() {
            self.flush_queue().await?;
            self.transmit(AudioFrame::end_of_utterance()).await
        } else {
            self.queue.enqueue(AudioFrame::end_of_utterance());
            Ok(())
        }
    }

    /// Explicitly close the transport after the terminal reply.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.close().await {
                tracing::debug!("STT close: {}", e);
            }
        }
        self.state = ConnectionState::Closed;
    }

    /// The reader observed the transport closing.
    pub fn on_closed(&mut self) {
        self.writer = None;
        self.state = ConnectionState::Closed;
        tracing::debug!("STT connection closed");
    }

    async fn flush_queue(&mut self) -> Result<()> {
        for message in drain_pending(&mut self.queue) {
            let writer = self.writer.as_mut().context("STT transport not open")?;
            writer
                .send(message)
                .await
                .context("failed to flush queued frame")?;
        }
        Ok(())
    }

    async fn transmit(&mut self, frame: AudioFrame) -> Result<()> {
        let writer = self.writer.as_mut().context("STT transport not open")?;
        writer
            .send(Message::Binary(frame.to_le_bytes()))
            .await
            .context("failed to send audio frame")
    }
}

/// Encode and remove everything queued, oldest first.
fn drain_pending(queue: &mut FrameQueue) -> Vec<Message> {
    queue
        .drain()
        .map(|frame| Message::Binary(frame.to_le_bytes()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SttClient {
        let (tx, _rx) = tokio::sync::mpsc::channel(8);
        SttClient::new(SttConfig::new("https://nl.example.com"), tx)
    }

    #[tokio::test]
    async fn frames_queue_while_disconnected() {
        let mut stt = client();
        assert_eq!(stt.state(), ConnectionState::Disconnected);

        stt.send_frame(AudioFrame::new(vec![1])).await.unwrap();
        stt.send_frame(AudioFrame::new(vec![2])).await.unwrap();
        stt.send_frame(AudioFrame::new(vec![3])).await.unwrap();

        let pending = drain_pending(&mut stt.queue);
        assert_eq!(
            pending,
            vec![
                Message::Binary(vec![1, 0]),
                Message::Binary(vec![2, 0]),
                Message::Binary(vec![3, 0]),
            ]
        );
        assert!(stt.queue.is_empty());
    }

    #[tokio::test]
    async fn done_marker_queues_behind_pending_frames() {
        let mut stt = client();
        stt.send_frame(AudioFrame::new(vec![7])).await.unwrap();
        stt.send_done().await.unwrap();

        let pending = drain_pending(&mut stt.queue);
        assert_eq!(
            pending,
            vec![Message::Binary(vec![7, 0]), Message::Binary(vec![])]
        );
    }
}
