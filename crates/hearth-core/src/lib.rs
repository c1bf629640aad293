pub mod session;
pub mod wake;

pub use session::{Action, Machine, SessionEvent, SessionState};
pub use wake::strip_wake_phrase;
