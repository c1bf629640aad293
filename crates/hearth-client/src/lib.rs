pub mod dialogue;
pub mod player;
mod request;
pub mod stt;

pub use hearth_types as types;

pub use dialogue::{DialogueClient, DialogueConfig, DialogueLink, DialogueSignal};
pub use player::AudioPlayer;
pub use stt::{SttClient, SttConfig, SttLink};

/// Lifecycle of one streaming transport. Frames and messages go out only
/// while the state is `Open`; the STT client redirects early frames to its
/// queue, the dialogue client drops early commands with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}
