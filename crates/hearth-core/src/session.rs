use crate::wake;
use hearth_types::{AudioFrame, Sound};

/// Phase of the top-level session. Exactly one is active; transitions run
/// on the single orchestration task, so events apply strictly in arrival
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Idle, waiting for the wake trigger.
    Sleeping,
    /// Capturing and streaming the utterance to the STT service.
    Listening,
    /// Utterance finished; awaiting the STT reply or dialogue result.
    Thinking,
    /// Server-driven playback in progress.
    Speaking,
}

/// Inputs that can advance the session.
#[derive(Debug)]
pub enum SessionEvent {
    /// The wake trigger fired.
    Wake,
    /// One captured audio frame.
    Frame(AudioFrame),
    /// Woke, but no speech followed.
    NoInput,
    /// End of speech detected.
    UtteranceDone,
    /// STT terminal reply with recognized text (wake phrase unstripped).
    Recognized(String),
    /// STT terminal reply reporting failure.
    RecognitionFailed { status: i64 },
    /// A dialogue text/sound/audio event was accepted for playback.
    SpeechStarted,
    /// The player drained its queue.
    PlaybackDone,
}

/// Side effects the machine asks the runtime to perform, in order.
#[derive(Debug, PartialEq)]
pub enum Action {
    ConnectStt,
    ForwardFrame(AudioFrame),
    EndAudioStream,
    CloseStt,
    SendCommand(String),
    PlaySound(Sound),
    CleanPlayerQueue,
    ResumePlayback,
}

/// The session state machine. Decisions only; every side effect is
/// returned as an [`Action`] for the runtime to execute.
#[derive(Debug)]
pub struct Machine {
    state: SessionState,
}

impl Machine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Sleeping,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, to: SessionState) {
        tracing::debug!("session {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Action> {
        match (self.state, event) {
            (SessionState::Sleeping, SessionEvent::Wake) => {
                self.transition(SessionState::Listening);
                vec![Action::PlaySound(Sound::Wake), Action::ConnectStt]
            }
            // Barge-in: a new utterance preempts ongoing playback.
            (SessionState::Speaking, SessionEvent::Wake) => {
                self.transition(SessionState::Listening);
                vec![
                    Action::CleanPlayerQueue,
                    Action::PlaySound(Sound::Wake),
                    Action::ConnectStt,
                ]
            }
            (SessionState::Listening, SessionEvent::Frame(frame)) => {
                vec![Action::ForwardFrame(frame)]
            }
            (state, SessionEvent::Frame(_)) => {
                tracing::trace!("dropping frame while {:?}", state);
                vec![]
            }
            (SessionState::Listening, SessionEvent::UtteranceDone) => {
                self.transition(SessionState::Thinking);
                vec![Action::EndAudioStream]
            }
            (SessionState::Listening, SessionEvent::NoInput) => {
                self.transition(SessionState::Sleeping);
                vec![
                    Action::CloseStt,
                    Action::PlaySound(Sound::NoInput),
                    Action::ResumePlayback,
                ]
            }
            (
                SessionState::Listening | SessionState::Thinking,
                SessionEvent::Recognized(text),
            ) => match wake::strip_wake_phrase(&text) {
                Some(command) => {
                    tracing::info!("recognized command: {}", command);
                    vec![
                        Action::CleanPlayerQueue,
                        Action::SendCommand(command.to_string()),
                    ]
                }
                None => {
                    tracing::info!("wake phrase not found in: {}", text);
                    self.transition(SessionState::Sleeping);
                    vec![Action::PlaySound(Sound::NoMatch), Action::ResumePlayback]
                }
            },
            (
                SessionState::Listening | SessionState::Thinking,
                SessionEvent::RecognitionFailed { status },
            ) => {
                tracing::info!("recognition failed with status {}", status);
                self.transition(SessionState::Sleeping);
                vec![Action::PlaySound(Sound::NoMatch), Action::ResumePlayback]
            }
            (_, SessionEvent::SpeechStarted) => {
                self.transition(SessionState::Speaking);
                vec![]
            }
            (SessionState::Speaking, SessionEvent::PlaybackDone) => {
                self.transition(SessionState::Sleeping);
                vec![Action::PlaySound(Sound::Sleep)]
            }
            (state, event) => {
                tracing::debug!("ignoring {:?} while {:?}", event, state);
                vec![]
            }
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> AudioFrame {
        AudioFrame::new(vec![0; 4])
    }

    #[test]
    fn wake_starts_listening_and_connects_stt() {
        let mut machine = Machine::new();
        let actions = machine.handle(SessionEvent::Wake);
        assert_eq!(machine.state(), SessionState::Listening);
        assert_eq!(
            actions,
            vec![Action::PlaySound(Sound::Wake), Action::ConnectStt]
        );
    }

    #[test]
    fn frames_forward_only_while_listening() {
        let mut machine = Machine::new();
        assert_eq!(machine.handle(SessionEvent::Frame(frame())), vec![]);

        machine.handle(SessionEvent::Wake);
        assert_eq!(
            machine.handle(SessionEvent::Frame(frame())),
            vec![Action::ForwardFrame(frame())]
        );
    }

    #[test]
    fn utterance_end_moves_to_thinking_with_terminator() {
        let mut machine = Machine::new();
        machine.handle(SessionEvent::Wake);
        let actions = machine.handle(SessionEvent::UtteranceDone);
        assert_eq!(machine.state(), SessionState::Thinking);
        assert_eq!(actions, vec![Action::EndAudioStream]);
    }

    #[test]
    fn no_input_returns_to_sleep() {
        let mut machine = Machine::new();
        machine.handle(SessionEvent::Wake);
        let actions = machine.handle(SessionEvent::NoInput);
        assert_eq!(machine.state(), SessionState::Sleeping);
        assert_eq!(
            actions,
            vec![
                Action::CloseStt,
                Action::PlaySound(Sound::NoInput),
                Action::ResumePlayback,
            ]
        );
    }

    #[test]
    fn recognized_command_is_forwarded_with_wake_phrase_stripped() {
        let mut machine = Machine::new();
        machine.handle(SessionEvent::Wake);
        machine.handle(SessionEvent::UtteranceDone);

        let actions = machine.handle(SessionEvent::Recognized(
            "computer, turn on the lights".to_string(),
        ));
        assert_eq!(machine.state(), SessionState::Thinking);
        assert_eq!(
            actions,
            vec![
                Action::CleanPlayerQueue,
                Action::SendCommand("turn on the lights".to_string()),
            ]
        );
    }

    #[test]
    fn missing_wake_phrase_plays_no_match_cue() {
        let mut machine = Machine::new();
        machine.handle(SessionEvent::Wake);
        machine.handle(SessionEvent::UtteranceDone);

        let actions =
            machine.handle(SessionEvent::Recognized("open the pod bay doors".to_string()));
        assert_eq!(machine.state(), SessionState::Sleeping);
        assert_eq!(
            actions,
            vec![Action::PlaySound(Sound::NoMatch), Action::ResumePlayback]
        );
    }

    #[test]
    fn recognition_failure_plays_no_match_cue() {
        let mut machine = Machine::new();
        machine.handle(SessionEvent::Wake);
        machine.handle(SessionEvent::UtteranceDone);

        let actions = machine.handle(SessionEvent::RecognitionFailed { status: 1 });
        assert_eq!(machine.state(), SessionState::Sleeping);
        assert_eq!(
            actions,
            vec![Action::PlaySound(Sound::NoMatch), Action::ResumePlayback]
        );
    }

    #[test]
    fn dialogue_speech_then_playback_done_completes_the_cycle() {
        let mut machine = Machine::new();
        machine.handle(SessionEvent::Wake);
        machine.handle(SessionEvent::UtteranceDone);
        machine.handle(SessionEvent::Recognized("computer, hi".to_string()));

        machine.handle(SessionEvent::SpeechStarted);
        assert_eq!(machine.state(), SessionState::Speaking);

        let actions = machine.handle(SessionEvent::PlaybackDone);
        assert_eq!(machine.state(), SessionState::Sleeping);
        assert_eq!(actions, vec![Action::PlaySound(Sound::Sleep)]);
    }

    #[test]
    fn wake_during_playback_barges_in() {
        let mut machine = Machine::new();
        machine.handle(SessionEvent::SpeechStarted);
        assert_eq!(machine.state(), SessionState::Speaking);

        let actions = machine.handle(SessionEvent::Wake);
        assert_eq!(machine.state(), SessionState::Listening);
        assert_eq!(
            actions,
            vec![
                Action::CleanPlayerQueue,
                Action::PlaySound(Sound::Wake),
                Action::ConnectStt,
            ]
        );
    }

    #[test]
    fn stale_stt_replies_are_ignored_once_asleep() {
        let mut machine = Machine::new();
        let actions = machine.handle(SessionEvent::Recognized("computer, hi".to_string()));
        assert_eq!(actions, vec![]);
        assert_eq!(machine.state(), SessionState::Sleeping);
    }
}
