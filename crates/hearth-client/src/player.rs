use async_trait::async_trait;
use hearth_types::Sound;
#[cfg(test)]
use mockall::automock;

/// Playback surface driven by the streaming clients and the session
/// machine. The production implementation fronts the media pipeline; unit
/// tests substitute `MockAudioPlayer` to assert exactly what reaches it.
///
/// Callers all live on the single orchestration task, so implementations
/// never need internal locking, but call order matters: `clean_queue`
/// before a new utterance's playback, `resume` when a recognition attempt
/// is abandoned.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AudioPlayer {
    /// Synthesize and speak `text`.
    async fn say(&mut self, text: &str);

    /// Play a cue from the local sound catalog. `exclusive` preempts
    /// whatever is currently queued.
    async fn play_sound(&mut self, sound: Sound, exclusive: bool);

    /// Stream remote audio from `url`.
    async fn play_location(&mut self, url: &str);

    /// Drop everything still queued for playback.
    async fn clean_queue(&mut self);

    /// Resume normal output after a paused/ducked stretch.
    async fn resume(&mut self);
}
