//! End-to-end exercises of both streaming clients against an in-process
//! WebSocket server.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use hearth_client::dialogue::{DialogueClient, DialogueConfig, DialogueLink, DialogueSignal};
use hearth_client::player::AudioPlayer;
use hearth_client::stt::{SttClient, SttConfig, SttLink};
use hearth_types::{AudioFrame, Sound};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct RecordingPlayer {
    said: Vec<String>,
    sounds: Vec<(Sound, bool)>,
    locations: Vec<String>,
}

#[async_trait]
impl AudioPlayer for RecordingPlayer {
    async fn say(&mut self, text: &str) {
        self.said.push(text.to_string());
    }

    async fn play_sound(&mut self, sound: Sound, exclusive: bool) {
        self.sounds.push((sound, exclusive));
    }

    async fn play_location(&mut self, url: &str) {
        self.locations.push(url.to_string());
    }

    async fn clean_queue(&mut self) {}

    async fn resume(&mut self) {}
}

#[tokio::test]
async fn stt_stream_preserves_frame_order_across_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Record every inbound message, answer once the terminator arrives.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut text_messages = Vec::new();
        let mut binary_messages = Vec::new();
        while let Some(message) = ws.next().await {
            match message.unwrap() {
                Message::Text(text) => text_messages.push(text),
                Message::Binary(payload) => {
                    let terminator = payload.is_empty();
                    binary_messages.push(payload);
                    if terminator {
                        ws.send(Message::Text(
                            r#"{"status":0,"result":"ok","text":"computer, turn on the lights"}"#
                                .to_string(),
                        ))
                        .await
                        .unwrap();
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        (text_messages, binary_messages)
    });

    let (link_tx, mut link_rx) = tokio::sync::mpsc::channel(32);
    let mut stt = SttClient::new(SttConfig::new(&format!("http://{addr}")), link_tx);

    // Three frames captured before the transport resolves.
    stt.send_frame(AudioFrame::new(vec![1, 1])).await.unwrap();
    stt.send_frame(AudioFrame::new(vec![2, 2])).await.unwrap();
    stt.send_frame(AudioFrame::new(vec![3, 3])).await.unwrap();
    stt.connect();

    let recognized = tokio::time::timeout(TEST_TIMEOUT, async {
        let mut recognized = None;
        while let Some(link) = link_rx.recv().await {
            match link {
                SttLink::Opened(ws) => {
                    stt.on_open(*ws).await.unwrap();
                    // Live sends interleave after the queued frames.
                    stt.send_frame(AudioFrame::new(vec![4, 4])).await.unwrap();
                    stt.send_done().await.unwrap();
                }
                SttLink::Recognized(text) => {
                    recognized = Some(text);
                    stt.close().await;
                }
                SttLink::Closed => {
                    stt.on_closed();
                    break;
                }
                other => panic!("unexpected link event: {other:?}"),
            }
        }
        recognized
    })
    .await
    .unwrap();

    assert_eq!(recognized.as_deref(), Some("computer, turn on the lights"));

    let (text_messages, binary_messages) = server.await.unwrap();
    // Handshake first, then frames in capture order, then the terminator.
    assert_eq!(text_messages, vec![r#"{ "ver": 1 }"#.to_string()]);
    assert_eq!(
        binary_messages,
        vec![
            vec![1, 0, 1, 0],
            vec![2, 0, 2, 0],
            vec![3, 0, 3, 0],
            vec![4, 0, 4, 0],
            vec![],
        ]
    );
}

#[tokio::test]
async fn dialogue_handshake_pong_and_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // First connection: handshake, ping, one text event, then drop.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(r#"{"type":"id","id":"c-1"}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Text(r#"{"type":"ping","id":1}"#.to_string()))
            .await
            .unwrap();

        let pong = loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => break text,
                _ => continue,
            }
        };

        ws.send(Message::Text(
            r#"{"type":"text","id":2,"text":"hello there"}"#.to_string(),
        ))
        .await
        .unwrap();
        drop(ws);

        // The client must come back on its own after the drop.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(r#"{"type":"id","id":"c-1"}"#.to_string()))
            .await
            .unwrap();
        pong
    });

    let (link_tx, mut link_rx) = tokio::sync::mpsc::channel(32);
    let mut client = DialogueClient::new(
        DialogueConfig::new(&format!("http://{addr}")).with_access_token("tok"),
        link_tx,
    );
    let mut player = RecordingPlayer::default();
    client.connect();

    let (opens, conversation_ids) = tokio::time::timeout(TEST_TIMEOUT, async {
        let mut opens = 0;
        let mut conversation_ids = Vec::new();
        while let Some(link) = link_rx.recv().await {
            match link {
                DialogueLink::Opened(ws) => {
                    opens += 1;
                    client.on_open(*ws);
                }
                DialogueLink::Event(event) => {
                    if let Some(DialogueSignal::ConversationId(id)) =
                        client.handle_event(event, &mut player).await
                    {
                        conversation_ids.push(id);
                        if opens == 2 {
                            break;
                        }
                    }
                }
                DialogueLink::Closed => client.on_closed(),
            }
        }
        (opens, conversation_ids)
    })
    .await
    .unwrap();

    assert_eq!(opens, 2);
    assert_eq!(conversation_ids, vec!["c-1".to_string(), "c-1".to_string()]);
    assert_eq!(player.said, vec!["hello there".to_string()]);

    let pong = server.await.unwrap();
    assert_eq!(pong, r#"{"type":"pong"}"#);
}
