//! Playback seam. The real media pipeline is out of scope, so the agent
//! ships a playback task that logs every command and reports completion,
//! behind the same `AudioPlayer` interface the dialogue client drives.

use async_trait::async_trait;
use hearth_client::AudioPlayer;
use hearth_types::Sound;
use tokio::sync::mpsc;

/// Commands accepted by the playback task.
#[derive(Debug)]
pub enum PlayerCommand {
    Say(String),
    PlaySound(Sound, bool),
    PlayLocation(String),
    CleanQueue,
    Resume,
}

/// Start the playback task. Each completed say/play is reported on
/// `done_tx` so the session machine can leave the Speaking state.
pub fn spawn(done_tx: mpsc::Sender<()>) -> mpsc::Sender<PlayerCommand> {
    let (tx, mut rx) = mpsc::channel::<PlayerCommand>(32);
    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                PlayerCommand::Say(text) => {
                    tracing::info!("saying: {}", text);
                    let _ = done_tx.send(()).await;
                }
                PlayerCommand::PlaySound(sound, exclusive) => {
                    tracing::info!("playing sound {:?} (exclusive: {})", sound, exclusive);
                    let _ = done_tx.send(()).await;
                }
                PlayerCommand::PlayLocation(url) => {
                    tracing::info!("playing audio from {}", url);
                    let _ = done_tx.send(()).await;
                }
                PlayerCommand::CleanQueue => {
                    tracing::debug!("clearing playback queue");
                }
                PlayerCommand::Resume => {
                    tracing::debug!("resuming background playback");
                }
            }
        }
    });
    tx
}

/// `AudioPlayer` implementation that forwards to the playback task.
pub struct PipelinePlayer {
    commands: mpsc::Sender<PlayerCommand>,
}

impl PipelinePlayer {
    pub fn new(commands: mpsc::Sender<PlayerCommand>) -> Self {
        Self { commands }
    }

    async fn dispatch(&self, command: PlayerCommand) {
        if self.commands.send(command).await.is_err() {
            tracing::error!("playback task is gone");
        }
    }
}

#[async_trait]
impl AudioPlayer for PipelinePlayer {
    async fn say(&mut self, text: &str) {
        self.dispatch(PlayerCommand::Say(text.to_string())).await;
    }

    async fn play_sound(&mut self, sound: Sound, exclusive: bool) {
        self.dispatch(PlayerCommand::PlaySound(sound, exclusive))
            .await;
    }

    async fn play_location(&mut self, url: &str) {
        self.dispatch(PlayerCommand::PlayLocation(url.to_string()))
            .await;
    }

    async fn clean_queue(&mut self) {
        self.dispatch(PlayerCommand::CleanQueue).await;
    }

    async fn resume(&mut self) {
        self.dispatch(PlayerCommand::Resume).await;
    }
}
