pub mod client;
pub mod server;

use client::*;
use server::*;

/// Messages this device sends on the dialogue socket.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "command")]
    Command(CommandEvent),
    #[serde(rename = "tt")]
    Thingtalk(ThingtalkEvent),
    #[serde(rename = "pong")]
    Pong(PongEvent),
}

/// Messages the dialogue service pushes to this device.
///
/// Every variant except `Id` carries a numeric sequence id. Tags outside
/// this set decode to `Unknown` via [`ServerEvent::parse`], keeping the id
/// (when present) so sequence tracking still advances.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Conversation-id assignment handshake; the only event acted on
    /// before the stream is accepted.
    #[serde(rename = "id")]
    Id { id: String },
    #[serde(rename = "text")]
    Text(TextEvent),
    #[serde(rename = "sound")]
    Sound(SoundEvent),
    #[serde(rename = "audio")]
    Audio(AudioEvent),
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "askSpecial")]
    AskSpecial(AskSpecialEvent),
    #[serde(rename = "ping")]
    Ping(PingEvent),
    // Known but inactionable on a speaker-only device.
    #[serde(rename = "command")]
    CommandEcho(IgnoredEvent),
    #[serde(rename = "new-program")]
    NewProgram(IgnoredEvent),
    #[serde(rename = "rdl")]
    Rdl(IgnoredEvent),
    #[serde(rename = "link")]
    Link(IgnoredEvent),
    #[serde(rename = "button")]
    Button(IgnoredEvent),
    #[serde(rename = "video")]
    Video(IgnoredEvent),
    #[serde(rename = "picture")]
    Picture(IgnoredEvent),
    #[serde(rename = "choice")]
    Choice(IgnoredEvent),
    #[serde(rename = "unknown")]
    Unknown {
        event_type: String,
        id: Option<i64>,
    },
}

impl ServerEvent {
    /// Decode one inbound text message.
    ///
    /// Unrecognized `type` tags are not an error: they become
    /// [`ServerEvent::Unknown`] with whatever id the message carried. Only
    /// malformed JSON fails.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        match serde_json::from_value::<Self>(value.clone()) {
            Ok(event) => Ok(event),
            Err(_) => Ok(ServerEvent::Unknown {
                event_type: value
                    .get("type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("<missing>")
                    .to_string(),
                id: value.get("id").and_then(|v| v.as_i64()),
            }),
        }
    }

    /// The numeric sequence id, for every event type that has one.
    pub fn id(&self) -> Option<i64> {
        match self {
            ServerEvent::Id { .. } => None,
            ServerEvent::Text(e) => Some(e.id()),
            ServerEvent::Sound(e) => Some(e.id()),
            ServerEvent::Audio(e) => Some(e.id()),
            ServerEvent::Error(e) => Some(e.id()),
            ServerEvent::AskSpecial(e) => Some(e.id()),
            ServerEvent::Ping(e) => Some(e.id()),
            ServerEvent::CommandEcho(e)
            | ServerEvent::NewProgram(e)
            | ServerEvent::Rdl(e)
            | ServerEvent::Link(e)
            | ServerEvent::Button(e)
            | ServerEvent::Video(e)
            | ServerEvent::Picture(e)
            | ServerEvent::Choice(e) => Some(e.id()),
            ServerEvent::Unknown { id, .. } => *id,
        }
    }

    /// The wire name of the event, for logging.
    pub fn event_type(&self) -> &str {
        match self {
            ServerEvent::Id { .. } => "id",
            ServerEvent::Text(_) => "text",
            ServerEvent::Sound(_) => "sound",
            ServerEvent::Audio(_) => "audio",
            ServerEvent::Error(_) => "error",
            ServerEvent::AskSpecial(_) => "askSpecial",
            ServerEvent::Ping(_) => "ping",
            ServerEvent::CommandEcho(_) => "command",
            ServerEvent::NewProgram(_) => "new-program",
            ServerEvent::Rdl(_) => "rdl",
            ServerEvent::Link(_) => "link",
            ServerEvent::Button(_) => "button",
            ServerEvent::Video(_) => "video",
            ServerEvent::Picture(_) => "picture",
            ServerEvent::Choice(_) => "choice",
            ServerEvent::Unknown { event_type, .. } => event_type,
        }
    }
}
