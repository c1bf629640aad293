/// `command` event: one user utterance, wake phrase already stripped.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CommandEvent {
    text: String,
}

impl CommandEvent {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `tt` event: a programmatic ThingTalk payload with a client-assigned
/// monotonic sequence id.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ThingtalkEvent {
    code: String,
    id: i64,
}

impl ThingtalkEvent {
    pub fn new(code: &str, id: i64) -> Self {
        Self {
            code: code.to_string(),
            id,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}

/// `pong` event, sent in reply to a server `ping`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PongEvent {}

impl PongEvent {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for PongEvent {
    fn default() -> Self {
        Self::new()
    }
}
