/// `text` event: speech the assistant should say out loud.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TextEvent {
    id: i64,
    text: String,
}

impl TextEvent {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `sound` event: a named cue from the server's catalog.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SoundEvent {
    id: i64,
    name: String,
}

impl SoundEvent {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// `audio` event: remote audio to stream through the player.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AudioEvent {
    id: i64,
    url: String,
}

impl AudioEvent {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// `error` event: recoverable, server-side failure report.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    id: i64,
    error: String,
}

impl ErrorEvent {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn error(&self) -> &str {
        &self.error
    }
}

/// `askSpecial` event: whether the agent is asking a follow-up.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AskSpecialEvent {
    id: i64,
    ask: Option<String>,
}

impl AskSpecialEvent {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn ask(&self) -> Option<&str> {
        self.ask.as_deref()
    }
}

/// `ping` event: protocol keep-alive, answered with a `pong`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PingEvent {
    id: i64,
}

impl PingEvent {
    pub fn id(&self) -> i64 {
        self.id
    }
}

/// Shape shared by the known-but-inactionable event types (command echo,
/// new-program, rdl, link, button, video, picture, choice). Only the
/// sequence id matters; the payload is dropped.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IgnoredEvent {
    id: i64,
}

impl IgnoredEvent {
    pub fn id(&self) -> i64 {
        self.id
    }
}
