//! The voice session: orchestrates generation, history, exports and UI
//! preferences around the engine and the transport.

use crate::config::Config;
use crate::decoder::{self, RawAudioPayload};
use crate::engine::SharedEngine;
use crate::event::{Event, EventBus};
use crate::export;
use crate::history::{generate_entry_id, History, HistoryEntry};
use crate::rewrite::RewriteClient;
use crate::sfx::{self, SoundEffect};
use crate::stdin::UiAction;
use crate::synth::SpeechClient;
use crate::transport::{self, SharedTransport, TransportState};
use crate::ui_state::UiState;
use crate::voice::{voice_option, VoiceName, VOICE_OPTIONS};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Debug)]
pub enum SessionAction {
    /// Synthesize speech for the given text with the selected voice
    Generate { text: String },

    /// Select the active voice
    SetVoice { voice: VoiceName },

    /// Print the voice catalog
    ListVoices,

    /// Print the generation history
    ListHistory,

    /// Reload a past generation and play it
    LoadHistory { id: String },

    /// Remove a past generation
    DeleteHistory { id: String },

    /// Write the current audio as a WAV file
    Download,

    /// Write the current audio as a JSON document
    ExportJson,

    /// Print session and transport status
    Status,

    /// Flip and persist the dark mode preference
    ToggleDarkMode,
}

pub struct Session {
    bus: EventBus,
    engine: SharedEngine,
    transport: SharedTransport,
    synth: Arc<SpeechClient>,
    rewrite: Option<Arc<RewriteClient>>,
    history: History,
    voice: VoiceName,

    /// Raw payload of the audio currently loaded for playback and
    /// download. Cleared the moment a new generation starts.
    payload: Option<RawAudioPayload>,

    /// True while a generation is in flight; gates further generations.
    loading: bool,

    /// Bumped whenever new audio is requested. A result arriving with a
    /// stale number lost the race and is discarded.
    request_seq: u64,

    ui_state: UiState,
}

impl Session {
    /// Sends one line of user-facing output.
    fn say(&self, text: impl Into<String>) {
        self.bus.send(Event::Ui(UiAction::Say(text.into())));
    }

    pub fn voice(&self) -> VoiceName {
        self.voice
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn payload(&self) -> Option<&RawAudioPayload> {
        self.payload.as_ref()
    }

    pub fn ui_state(&self) -> UiState {
        self.ui_state
    }
}

pub type SharedSession = Arc<RwLock<Session>>;

/// Builds a session over explicit collaborators. `init` wires this into
/// the bus; tests drive it directly through `handle_incoming_event`.
pub fn build_session(
    bus: &EventBus,
    synth: Arc<SpeechClient>,
    rewrite: Option<Arc<RewriteClient>>,
    engine: SharedEngine,
    transport: SharedTransport,
) -> SharedSession {
    Arc::new(RwLock::new(Session {
        bus: bus.clone(),
        engine,
        transport,
        synth,
        rewrite,
        history: History::new(),
        voice: VoiceName::default(),
        payload: None,
        loading: false,
        request_seq: 0,
        ui_state: UiState::default(),
    }))
}

/// Initialize the session module.
pub async fn init(
    bus: &EventBus,
    config: &Config,
    engine: SharedEngine,
    transport: SharedTransport,
) -> SharedSession {
    let synth = Arc::new(SpeechClient::from_config(&config.synthesis));

    if synth.backend_count() == 0 {
        warn!("No synthesis backends configured, generation will always fail");
    }

    let rewrite = config
        .rewrite
        .as_ref()
        .map(|rewrite| Arc::new(RewriteClient::from_config(rewrite)));

    let session = build_session(bus, synth, rewrite, engine, transport);
    session.write().await.ui_state = UiState::read_or_default().await;

    handle_incoming_event_loop(bus.clone(), session.clone());

    session
}

fn handle_incoming_event_loop(bus: EventBus, session: SharedSession) {
    let mut bus_rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            let event = bus_rx.recv().await;

            if let Event::Session(action) = event {
                let session = session.clone();

                // Session actions can block on the network for a while,
                // so each one runs in its own task.
                tokio::spawn(async move {
                    handle_incoming_event(action, &session).await;
                });
            }
        }
    });
}

pub async fn handle_incoming_event(action: SessionAction, session: &SharedSession) {
    match action {
        SessionAction::Generate { text } => generate(session, text).await,
        SessionAction::SetVoice { voice } => set_voice(session, voice).await,
        SessionAction::ListVoices => list_voices(session).await,
        SessionAction::ListHistory => list_history(session).await,
        SessionAction::LoadHistory { id } => load_history(session, id).await,
        SessionAction::DeleteHistory { id } => delete_history(session, id).await,
        SessionAction::Download => export_artifact(session, false).await,
        SessionAction::ExportJson => export_artifact(session, true).await,
        SessionAction::Status => status(session).await,
        SessionAction::ToggleDarkMode => toggle_dark_mode(session).await,
    }
}

async fn generate(session: &SharedSession, text: String) {
    let text = text.trim().to_string();

    // Claim the generation under the lock and invalidate current audio
    // before the first await, so stale audio is never left playable.
    let (seq, synth, rewrite, context, voice) = {
        let mut locked = session.write().await;

        if text.is_empty() {
            locked.say("Nothing to say. Usage: speak <text>");
            return;
        }

        if locked.loading {
            locked.say("Still generating, hold on...");
            return;
        }

        locked.loading = true;
        locked.request_seq += 1;
        let seq = locked.request_seq;

        locked.payload = None;
        locked.transport.write().await.clear();

        let context = locked.engine.write().await.ensure_context();

        sfx::play(&context, SoundEffect::Click);
        locked.say(format!("Generating with {}...", locked.voice));

        (
            seq,
            locked.synth.clone(),
            locked.rewrite.clone(),
            context,
            locked.voice,
        )
    };

    let speak_text = match &rewrite {
        Some(rewrite) => rewrite.rewrite(&text, voice).await,
        None => text.clone(),
    };

    let payload = match synth.synthesize(&speak_text, voice).await {
        Ok(payload) => payload,
        Err(e) => {
            let message = format!("Speech generation failed: {e}");
            fail_generation(session, message, e.remediation()).await;
            return;
        }
    };

    // Decode on a blocking thread, payloads can be megabytes of base64.
    let decode_payload = payload.clone();
    let decode_context = context.clone();
    let decoded = tokio::task::spawn_blocking(move || {
        decoder::decode_audio_data(&decode_payload, &decode_context)
    })
    .await;

    let buffer = match decoded {
        Ok(Ok(buffer)) => buffer,
        Ok(Err(e)) => {
            let message = format!("Could not decode the generated audio: {e}");
            fail_generation(session, message, None).await;
            return;
        }
        Err(e) => {
            let message = format!("Audio decoding task failed: {e}");
            fail_generation(session, message, None).await;
            return;
        }
    };

    let mut locked = session.write().await;
    locked.loading = false;

    if locked.request_seq != seq {
        debug!("Discarding superseded generation result");
        return;
    }

    locked.payload = Some(payload.clone());

    {
        let mut transport = locked.transport.write().await;
        transport.attach_buffer(buffer.clone(), context.clone());
        transport.play();
    }

    locked.history.push(HistoryEntry {
        id: generate_entry_id(),
        text,
        voice,
        audio: payload,
        created_at: Utc::now(),
    });

    sfx::play(&context, SoundEffect::Success);
    locked.say(format!(
        "Ready: {:.1}s of audio. Playing now.",
        buffer.duration()
    ));

    let transport = locked.transport.clone();
    drop(locked);

    transport::arm_finish_poll(&transport).await;
}

/// Ends a failed generation: clears the loading gate and tells the user
/// what happened, with remediation guidance when there is any.
async fn fail_generation(session: &SharedSession, message: String, hint: Option<&'static str>) {
    let mut locked = session.write().await;
    locked.loading = false;
    locked.say(message);

    if let Some(hint) = hint {
        locked.say(hint);
    }
}

async fn set_voice(session: &SharedSession, voice: VoiceName) {
    let mut locked = session.write().await;
    locked.voice = voice;

    let option = voice_option(voice);
    locked.say(format!("Voice set to {voice} ({})", option.role));
}

async fn list_voices(session: &SharedSession) {
    let locked = session.read().await;

    locked.say("Available voices:");

    for option in VOICE_OPTIONS.iter() {
        let marker = if option.id == locked.voice { "*" } else { " " };
        locked.say(format!(
            "{marker} {} - {}: {}",
            option.id, option.role, option.description
        ));
    }
}

async fn list_history(session: &SharedSession) {
    let locked = session.read().await;

    if locked.history.is_empty() {
        locked.say("History is empty.");
        return;
    }

    locked.say("Recent generations, newest first:");

    for entry in locked.history.iter() {
        locked.say(format!(
            "{} [{}] {}",
            entry.id,
            entry.voice,
            summarize(&entry.text)
        ));
    }
}

async fn load_history(session: &SharedSession, id: String) {
    let (payload, context, seq) = {
        let mut locked = session.write().await;

        let entry = match locked.history.get(&id) {
            Some(entry) => entry.clone(),
            None => {
                locked.say(format!("No history entry with id {id}"));
                return;
            }
        };

        locked.request_seq += 1;
        let seq = locked.request_seq;

        locked.voice = entry.voice;
        locked.payload = Some(entry.audio.clone());
        locked.transport.write().await.clear();

        let context = locked.engine.write().await.ensure_context();

        locked.say(format!(
            "Loading \"{}\" with {}...",
            summarize(&entry.text),
            entry.voice
        ));

        (entry.audio, context, seq)
    };

    let decode_payload = payload.clone();
    let decode_context = context.clone();
    let decoded = tokio::task::spawn_blocking(move || {
        decoder::decode_audio_data(&decode_payload, &decode_context)
    })
    .await;

    let buffer = match decoded {
        Ok(Ok(buffer)) => buffer,
        Ok(Err(e)) => {
            session
                .read()
                .await
                .say(format!("Could not decode this history entry: {e}"));
            return;
        }
        Err(e) => {
            session
                .read()
                .await
                .say(format!("Audio decoding task failed: {e}"));
            return;
        }
    };

    let mut locked = session.write().await;

    if locked.request_seq != seq {
        debug!("Discarding superseded history load");
        return;
    }

    {
        let mut transport = locked.transport.write().await;
        transport.attach_buffer(buffer, context);
        transport.play();
    }

    let transport = locked.transport.clone();
    drop(locked);

    transport::arm_finish_poll(&transport).await;
}

async fn delete_history(session: &SharedSession, id: String) {
    let mut locked = session.write().await;

    match locked.history.remove(&id) {
        Some(entry) => {
            if let Some(context) = locked.engine.read().await.context() {
                sfx::play(&context, SoundEffect::Delete);
            }

            locked.say(format!(
                "Removed \"{}\" from history",
                summarize(&entry.text)
            ));
        }
        None => locked.say(format!("No history entry with id {id}")),
    }
}

/// Writes the current audio into the working directory, as WAV or as the
/// JSON wire document.
async fn export_artifact(session: &SharedSession, as_json: bool) {
    let (payload, voice, context) = {
        let locked = session.read().await;

        let payload = match &locked.payload {
            Some(payload) => payload.clone(),
            None => {
                locked.say("Nothing to download yet. Generate some speech first.");
                return;
            }
        };

        let out = (payload, locked.voice, locked.engine.read().await.context());
        out
    };

    let result = if as_json {
        export::export_json(Path::new("."), voice, &payload).await
    } else {
        export::export_wav(Path::new("."), voice, &payload).await
    };

    let locked = session.read().await;

    match result {
        Ok(path) => {
            if let Some(context) = &context {
                sfx::play(context, SoundEffect::Download);
            }

            locked.say(format!("Wrote {}", path.display()));
        }
        Err(e) => locked.say(format!("Export failed: {e:#}")),
    }
}

async fn status(session: &SharedSession) {
    let locked = session.read().await;
    let transport = locked.transport.read().await;

    let audio = match transport.state() {
        TransportState::Idle => "no audio loaded".to_string(),
        state => format!(
            "{:?} {:.1}s / {:.1}s at {:.1}x",
            state,
            transport.position(),
            transport.duration(),
            transport.rate()
        ),
    };

    let mut line = format!(
        "Voice: {} | {} | history: {} | dark mode: {}",
        locked.voice,
        audio,
        locked.history.len(),
        if locked.ui_state.dark_mode { "on" } else { "off" },
    );

    if locked.loading {
        line.push_str(" | generating...");
    }

    locked.say(line);
}

async fn toggle_dark_mode(session: &SharedSession) {
    let mut locked = session.write().await;
    locked.ui_state.dark_mode = !locked.ui_state.dark_mode;
    locked.ui_state.persist();

    locked.say(format!(
        "Dark mode {}",
        if locked.ui_state.dark_mode { "on" } else { "off" }
    ));
}

/// First characters of the text, ellipsized for display.
fn summarize(text: &str) -> String {
    const LIMIT: usize = 40;

    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{head}...")
    }
}
