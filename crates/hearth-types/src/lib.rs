pub mod events;
pub mod frame;
pub mod sound;
pub mod stt;

pub use events::{ClientEvent, ServerEvent};
pub use frame::{AudioFrame, FrameQueue};
pub use sound::Sound;
pub use stt::SttReply;
