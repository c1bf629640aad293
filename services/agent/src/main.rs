mod capture;
mod config;
mod playback;

use crate::capture::{CaptureEvent, SpeechDetector};
use crate::config::{Config, PersistedState};
use crate::playback::PipelinePlayer;
use anyhow::{Context, Result};
use clap::Parser;
use hearth_client::{
    DialogueClient, DialogueConfig, DialogueLink, DialogueSignal, SttClient, SttConfig, SttLink,
};
use hearth_core::{Action, Machine, SessionEvent};
use hearth_types::AudioFrame;
use tokio::sync::mpsc;

#[derive(Parser)]
struct Cli {
    /// Audio input device name; defaults to the system default.
    #[arg(long)]
    device: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    tracing::info!("Configuration loaded successfully. Starting agent...");

    let args = Cli::parse();

    let mut state = PersistedState::load(&config.state_file);
    if let Some(id) = &state.conversation_id {
        tracing::info!("resuming conversation {}", id);
    }

    // Channels into the single orchestration loop below. Everything the
    // loop reacts to arrives through one of these, in order.
    let (frame_tx, mut frame_rx) = mpsc::channel::<AudioFrame>(64);
    let (stt_tx, mut stt_rx) = mpsc::channel::<SttLink>(16);
    let (dialogue_tx, mut dialogue_rx) = mpsc::channel::<DialogueLink>(64);
    let (done_tx, mut done_rx) = mpsc::channel::<()>(16);

    let mut player = PipelinePlayer::new(playback::spawn(done_tx));

    let mut stt = SttClient::new(SttConfig::new(&config.nl_url), stt_tx);

    let mut dialogue_config = DialogueConfig::new(&config.server_url);
    if let Some(token) = &config.access_token {
        dialogue_config = dialogue_config.with_access_token(token);
    }
    if let Some(id) = &state.conversation_id {
        dialogue_config = dialogue_config.with_conversation_id(id);
    }
    let mut dialogue = DialogueClient::new(dialogue_config, dialogue_tx);
    dialogue.connect();

    // The stream must stay alive for capture to continue.
    let _input_stream =
        capture::start(args.device, frame_tx).context("Failed to start audio capture")?;

    let mut detector = SpeechDetector::new();
    let mut machine = Machine::new();

    loop {
        tokio::select! {
            Some(frame) = frame_rx.recv() => {
                for event in detector.push(frame) {
                    let session_event = match event {
                        CaptureEvent::Wake => SessionEvent::Wake,
                        CaptureEvent::Frame(frame) => SessionEvent::Frame(frame),
                        CaptureEvent::NoInput => SessionEvent::NoInput,
                        CaptureEvent::UtteranceDone => SessionEvent::UtteranceDone,
                    };
                    let actions = machine.handle(session_event);
                    run_actions(actions, &mut stt, &mut dialogue, &mut player).await;
                }
            }
            Some(link) = stt_rx.recv() => match link {
                SttLink::Opened(stream) => {
                    if let Err(e) = stt.on_open(*stream).await {
                        tracing::error!("STT handshake failed: {:#}", e);
                    }
                }
                SttLink::ConnectFailed => {
                    let actions = machine.handle(SessionEvent::RecognitionFailed { status: -1 });
                    run_actions(actions, &mut stt, &mut dialogue, &mut player).await;
                }
                SttLink::Recognized(text) => {
                    stt.close().await;
                    let actions = machine.handle(SessionEvent::Recognized(text));
                    run_actions(actions, &mut stt, &mut dialogue, &mut player).await;
                }
                SttLink::NotRecognized { status } => {
                    stt.close().await;
                    let actions = machine.handle(SessionEvent::RecognitionFailed { status });
                    run_actions(actions, &mut stt, &mut dialogue, &mut player).await;
                }
                SttLink::Closed => stt.on_closed(),
            },
            Some(link) = dialogue_rx.recv() => match link {
                DialogueLink::Opened(stream) => dialogue.on_open(*stream),
                DialogueLink::Event(event) => {
                    match dialogue.handle_event(event, &mut player).await {
                        Some(DialogueSignal::ConversationId(id)) => {
                            state.conversation_id = Some(id);
                            if let Err(e) = state.store(&config.state_file) {
                                tracing::warn!("failed to persist conversation id: {:#}", e);
                            }
                        }
                        Some(DialogueSignal::SpeechStarted) => {
                            let actions = machine.handle(SessionEvent::SpeechStarted);
                            run_actions(actions, &mut stt, &mut dialogue, &mut player).await;
                        }
                        None => {}
                    }
                }
                DialogueLink::Closed => dialogue.on_closed(),
            },
            Some(()) = done_rx.recv() => {
                let actions = machine.handle(SessionEvent::PlaybackDone);
                run_actions(actions, &mut stt, &mut dialogue, &mut player).await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down...");
                break;
            }
        }
    }
    Ok(())
}

/// Execute the side effects the machine decided on, in order.
async fn run_actions(
    actions: Vec<Action>,
    stt: &mut SttClient,
    dialogue: &mut DialogueClient,
    player: &mut PipelinePlayer,
) {
    use hearth_client::AudioPlayer;

    for action in actions {
        match action {
            Action::ConnectStt => stt.connect(),
            Action::ForwardFrame(frame) => {
                if let Err(e) = stt.send_frame(frame).await {
                    tracing::error!("failed to forward frame: {:#}", e);
                }
            }
            Action::EndAudioStream => {
                if let Err(e) = stt.send_done().await {
                    tracing::error!("failed to end audio stream: {:#}", e);
                }
            }
            Action::CloseStt => stt.close().await,
            Action::SendCommand(text) => dialogue.send_command(&text).await,
            Action::PlaySound(sound) => player.play_sound(sound, false).await,
            Action::CleanPlayerQueue => player.clean_queue().await,
            Action::ResumePlayback => player.resume().await,
        }
    }
}
