use crate::ConnectionState;
use crate::player::AudioPlayer;
use crate::request;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use hearth_types::events::client::{CommandEvent, PongEvent, ThingtalkEvent};
use hearth_types::{ClientEvent, ServerEvent, Sound};
use secrecy::SecretString;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = futures_util::stream::SplitSink<WsStream, Message>;

/// Notifications the dialogue client delivers to the orchestration task.
#[derive(Debug)]
pub enum DialogueLink {
    Opened(Box<WsStream>),
    Event(ServerEvent),
    Closed,
}

/// Results of handling a server event that the rest of the system must
/// react to.
#[derive(Debug, PartialEq)]
pub enum DialogueSignal {
    /// The handshake assigned (or re-confirmed) a conversation id; persist
    /// it for the next connect.
    ConversationId(String),
    /// Playback of a server-driven text/sound/audio event began.
    SpeechStarted,
}

#[derive(Debug, Clone)]
pub struct DialogueConfig {
    url: String,
    access_token: Option<SecretString>,
    conversation_id: Option<String>,
}

impl DialogueConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            access_token: None,
            conversation_id: None,
        }
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(SecretString::from(token.to_string()));
        self
    }

    pub fn with_conversation_id(mut self, id: &str) -> Self {
        self.conversation_id = Some(id.to_string());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }
}

/// Reconnect delay policy: exponential, capped. The cap bounds how hard a
/// persistently unreachable service is probed (one attempt per minute),
/// and a successful open resets the ladder.
#[derive(Debug)]
pub struct Backoff {
    attempt: u32,
}

impl Backoff {
    const BASE: Duration = Duration::from_millis(500);
    const MAX: Duration = Duration::from_secs(60);

    pub fn new() -> Self {
        Self { attempt: 0 }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = Self::BASE
            .checked_mul(1u32 << self.attempt.min(10))
            .unwrap_or(Self::MAX)
            .min(Self::MAX);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// What applying one inbound event amounts to, before any side effect runs.
#[derive(Debug, PartialEq)]
enum Applied {
    ConversationId(String),
    Say(String),
    PlaySound(Sound),
    PlayUrl(String),
    Pong,
    Nothing,
}

/// Per-connection conversation state: the id handshake gate, the staleness
/// guard for text events, and the shared sequence counter.
#[derive(Debug)]
struct Conversation {
    conversation_id: Option<String>,
    accept_stream: bool,
    last_text_id: i64,
    seq: i64,
}

impl Conversation {
    fn new(conversation_id: Option<String>) -> Self {
        Self {
            conversation_id,
            accept_stream: false,
            last_text_id: -1,
            seq: 0,
        }
    }

    /// A new transport was established; nothing may be applied until the
    /// id handshake is observed again.
    fn on_connected(&mut self) {
        self.accept_stream = false;
    }

    fn next_seq(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    fn apply(&mut self, event: ServerEvent) -> Applied {
        // The id assignment is the handshake itself, so it bypasses the
        // accept gate.
        if let ServerEvent::Id { id } = &event {
            tracing::info!("conversation id set: {}", id);
            self.conversation_id = Some(id.clone());
            self.accept_stream = true;
            return Applied::ConversationId(id.clone());
        }

        if let Some(id) = event.id() {
            self.seq = id;
        }

        if !self.accept_stream {
            tracing::warn!(
                "ignored message id={:?} type={} -- not accepting stream",
                event.id(),
                event.event_type()
            );
            return Applied::Nothing;
        }

        match event {
            ServerEvent::Text(text) => {
                if text.id() <= self.last_text_id {
                    tracing::debug!(
                        "skipping message id={}, already said id={}",
                        text.id(),
                        self.last_text_id
                    );
                    Applied::Nothing
                } else {
                    self.last_text_id = text.id();
                    Applied::Say(text.text().to_string())
                }
            }
            ServerEvent::Sound(sound) => match Sound::from_server_name(sound.name()) {
                Some(cue) => {
                    tracing::info!("playing sound id={} name={}", sound.id(), sound.name());
                    Applied::PlaySound(cue)
                }
                None => {
                    tracing::warn!("sound not recognized id={} name={}", sound.id(), sound.name());
                    Applied::Nothing
                }
            },
            ServerEvent::Audio(audio) => {
                tracing::info!("playing audio id={} url={}", audio.id(), audio.url());
                Applied::PlayUrl(audio.url().to_string())
            }
            ServerEvent::Error(error) => {
                tracing::warn!("server error id={}: {}", error.id(), error.error());
                Applied::Nothing
            }
            ServerEvent::AskSpecial(ask) => {
                tracing::debug!(
                    "ignoring askSpecial id={} ask={:?}",
                    ask.id(),
                    ask.ask()
                );
                Applied::Nothing
            }
            ServerEvent::Ping(_) => Applied::Pong,
            ServerEvent::CommandEcho(e)
            | ServerEvent::NewProgram(e)
            | ServerEvent::Rdl(e)
            | ServerEvent::Link(e)
            | ServerEvent::Button(e)
            | ServerEvent::Video(e)
            | ServerEvent::Picture(e)
            | ServerEvent::Choice(e) => {
                tracing::debug!("ignored message id={}", e.id());
                Applied::Nothing
            }
            ServerEvent::Unknown { event_type, id } => {
                tracing::warn!("unhandled message id={:?} type={}", id, event_type);
                Applied::Nothing
            }
            ServerEvent::Id { .. } => unreachable!("handled above"),
        }
    }
}

/// Long-lived streaming client for the dialogue service.
///
/// Sends commands and programmatic payloads, applies the server-driven
/// event stream to the audio player, and reconnects with capped backoff
/// whenever an established connection drops.
pub struct DialogueClient {
    config: DialogueConfig,
    state: ConnectionState,
    conversation: Conversation,
    writer: Option<WsWriter>,
    backoff: Backoff,
    command_started: Option<Instant>,
    link_tx: tokio::sync::mpsc::Sender<DialogueLink>,
}

impl DialogueClient {
    pub fn new(config: DialogueConfig, link_tx: tokio::sync::mpsc::Sender<DialogueLink>) -> Self {
        let conversation = Conversation::new(config.conversation_id.clone());
        Self {
            config,
            state: ConnectionState::Disconnected,
            conversation,
            writer: None,
            backoff: Backoff::new(),
            command_started: None,
            link_tx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Open the transport. A failed connect is logged without scheduling a
    /// retry; only close of an established connection reconnects.
    pub fn connect(&mut self) {
        self.connect_in(Duration::ZERO);
    }

    fn connect_in(&mut self, delay: Duration) {
        let request = match request::build_dialogue_request(
            &self.config.url,
            self.conversation.conversation_id.as_deref(),
            self.config.access_token.as_ref(),
        ) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("invalid dialogue endpoint {}: {}", self.config.url, e);
                return;
            }
        };

        self.state = ConnectionState::Connecting;
        self.writer = None;

        let link = self.link_tx.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match connect_async(request).await {
                Ok((stream, _)) => {
                    if link.send(DialogueLink::Opened(Box::new(stream))).await.is_err() {
                        tracing::warn!("dialogue link channel dropped before open");
                    }
                }
                Err(e) => {
                    tracing::error!("dialogue connect failed: {}", e);
                }
            }
        });
    }

    /// Register the opened transport and start the reader. Events are not
    /// applied until the id handshake arrives.
    pub fn on_open(&mut self, stream: WsStream) {
        let (write, mut read) = stream.split();
        self.writer = Some(write);
        self.state = ConnectionState::Open;
        self.conversation.on_connected();
        self.backoff.reset();
        tracing::info!("dialogue connection open");

        let link = self.link_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        tracing::debug!("dialogue message: {}", text);
                        match ServerEvent::parse(&text) {
                            Ok(event) => {
                                if link.send(DialogueLink::Event(event)).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                tracing::error!("malformed dialogue message: {}", e);
                            }
                        }
                    }
                    Ok(Message::Binary(bin)) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Ok(Message::Close(reason)) => {
                        tracing::info!("dialogue connection closed: {:?}", reason);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("dialogue read failed: {}", e);
                        break;
                    }
                }
            }
            let _ = link.send(DialogueLink::Closed).await;
        });
    }

    /// An established connection dropped: schedule the reconnect. This is
    /// the dialogue channel's sole retry mechanism.
    pub fn on_closed(&mut self) {
        self.writer = None;
        self.state = ConnectionState::Closed;
        let delay = self.backoff.next_delay();
        tracing::info!("dialogue reconnecting in {:?}", delay);
        self.connect_in(delay);
    }

    /// Apply one inbound event: update conversation state, drive the audio
    /// player, and answer pings.
    pub async fn handle_event<P: AudioPlayer + Send>(
        &mut self,
        event: ServerEvent,
        player: &mut P,
    ) -> Option<DialogueSignal> {
        match self.conversation.apply(event) {
            Applied::ConversationId(id) => {
                self.config.conversation_id = Some(id.clone());
                Some(DialogueSignal::ConversationId(id))
            }
            Applied::Say(text) => {
                if let Some(started) = self.command_started.take() {
                    tracing::debug!("command round trip took {:?}", started.elapsed());
                }
                player.say(&text).await;
                Some(DialogueSignal::SpeechStarted)
            }
            Applied::PlaySound(sound) => {
                player.play_sound(sound, true).await;
                Some(DialogueSignal::SpeechStarted)
            }
            Applied::PlayUrl(url) => {
                player.play_location(&url).await;
                Some(DialogueSignal::SpeechStarted)
            }
            Applied::Pong => {
                if let Err(e) = self.send_event(ClientEvent::Pong(PongEvent::new())).await {
                    tracing::error!("failed to answer ping: {}", e);
                }
                None
            }
            Applied::Nothing => None,
        }
    }

    /// Send one user utterance, wake phrase already stripped.
    pub async fn send_command(&mut self, text: &str) {
        if self.writer.is_none() {
            tracing::warn!("dialogue connection not open, dropping command: {}", text);
            return;
        }
        let event = ClientEvent::Command(CommandEvent::new(text));
        if let Err(e) = self.send_event(event).await {
            tracing::error!("failed to send command: {}", e);
            return;
        }
        self.command_started = Some(Instant::now());
    }

    /// Send a programmatic ThingTalk payload with the next sequence id.
    pub async fn send_thingtalk(&mut self, code: &str) {
        if self.writer.is_none() {
            tracing::warn!("dialogue connection not open, dropping thingtalk");
            return;
        }
        let id = self.conversation.next_seq();
        let event = ClientEvent::Thingtalk(ThingtalkEvent::new(code, id));
        if let Err(e) = self.send_event(event).await {
            tracing::error!("failed to send thingtalk: {}", e);
        }
    }

    async fn send_event(&mut self, event: ClientEvent) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .context("dialogue connection not open")?;
        let text = serde_json::to_string(&event).context("failed to serialize event")?;
        tracing::debug!("dialogue sending: {}", text);
        writer
            .send(Message::Text(text))
            .await
            .context("failed to send message")
    }
}
