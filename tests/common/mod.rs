//! Test infrastructure for funny-voice-rs integration tests.
//!
//! Provides canned audio payloads, a scripted synthesis backend and
//! helper functions for testing the voice session without a real
//! synthesis service.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::RwLock;

// Re-export key types from the main crate
pub use funny_voice_rs::config::{Config, NetConfig, RewriteConfig, SynthesisConfig};
pub use funny_voice_rs::constants::{MAX_TEXT_LEN, SAMPLE_RATE};
pub use funny_voice_rs::decoder::{self, RawAudioPayload};
pub use funny_voice_rs::engine::{self, EngineContext, SharedEngine};
pub use funny_voice_rs::error::SynthError;
pub use funny_voice_rs::event::{Event, EventBus, Subscriber};
pub use funny_voice_rs::rewrite::RewriteClient;
pub use funny_voice_rs::session::{self, SessionAction, SharedSession};
pub use funny_voice_rs::stdin::{line_to_event, UiAction};
pub use funny_voice_rs::synth::{HttpSpeechBackend, SpeechBackend, SpeechClient};
pub use funny_voice_rs::transport::{
    self, SharedTransport, TransportAction, TransportController, TransportState,
};
pub use funny_voice_rs::ui_state::UiState;
pub use funny_voice_rs::voice::VoiceName;

/// Creates a test configuration whose endpoints point at ports nothing
/// listens on, so any network attempt fails fast.
pub fn test_config() -> Config {
    Config {
        synthesis: SynthesisConfig {
            proxy_url: Some(refused_endpoint()),
            direct_url: Some(refused_endpoint()),
            api_key: Some("test-key".to_string()),
            prefer_direct: false,
        },
        rewrite: None,
        net: NetConfig::default(),
    }
}

/// Encodes raw samples the way the synthesis service does: 16-bit
/// little-endian PCM, base64 over the byte stream.
pub fn payload_from_samples(samples: &[i16]) -> RawAudioPayload {
    let mut bytes = Vec::with_capacity(samples.len() * 2);

    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }

    RawAudioPayload::new(STANDARD.encode(bytes))
}

/// A 440 Hz sine payload of the given length at the engine sample rate.
pub fn sine_payload(secs: f64) -> RawAudioPayload {
    let count = (secs * SAMPLE_RATE as f64) as usize;

    let samples: Vec<i16> = (0..count)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE as f64;
            ((TAU * 440.0 * t).sin() * 0.3 * 32767.0) as i16
        })
        .collect();

    payload_from_samples(&samples)
}

/// An all-zero payload of the given length.
pub fn silent_payload(secs: f64) -> RawAudioPayload {
    let count = (secs * SAMPLE_RATE as f64) as usize;

    payload_from_samples(&vec![0i16; count])
}

/// Decodes a sine clip and attaches it to the transport, leaving it
/// stopped at the start.
pub async fn load_clip(
    engine: &SharedEngine,
    transport: &SharedTransport,
    secs: f64,
) -> EngineContext {
    let context = engine.write().await.ensure_context();
    let buffer =
        decoder::decode_audio_data(&sine_payload(secs), &context).expect("test clip should decode");

    transport.write().await.attach_buffer(buffer, context.clone());

    context
}

/// Lets spawned event loops drain the bus without advancing the clock,
/// so paused-time tests keep exact position arithmetic.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// A localhost URL nothing listens on, so connections are refused.
pub fn refused_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    format!("http://127.0.0.1:{port}/api/generate-voice")
}

/// What a scripted backend should answer with.
#[derive(Clone, Debug)]
pub enum MockReply {
    Audio(RawAudioPayload),
    Unavailable(String),
    Upstream { status: u16, message: String },
}

/// Request log shared between a scripted backend and the test.
#[derive(Default)]
pub struct MockStats {
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, VoiceName)>>,
}

impl MockStats {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests seen so far, as (text, voice) pairs.
    pub fn requests(&self) -> Vec<(String, VoiceName)> {
        self.requests.lock().unwrap().clone()
    }
}

/// Synthesis backend that answers from a script instead of the network.
/// Replies are consumed in order; the last one repeats forever.
pub struct MockSpeechBackend {
    name: String,
    script: Mutex<VecDeque<MockReply>>,
    delay: Option<Duration>,
    stats: Arc<MockStats>,
}

#[async_trait]
impl SpeechBackend for MockSpeechBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: VoiceName,
    ) -> Result<RawAudioPayload, SynthError> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        self.stats
            .requests
            .lock()
            .unwrap()
            .push((text.to_string(), voice));

        let reply = {
            let mut script = self.script.lock().unwrap();

            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().expect("mock script is empty")
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Audio(payload) => Ok(payload),
            MockReply::Unavailable(reason) => Err(SynthError::Unavailable(reason)),
            MockReply::Upstream { status, message } => Err(SynthError::Upstream { status, message }),
        }
    }
}

/// Creates a scripted backend that always answers with `reply`.
pub fn mock_backend(name: &str, reply: MockReply) -> (Box<dyn SpeechBackend>, Arc<MockStats>) {
    mock_backend_script(name, vec![reply])
}

/// Creates a scripted backend with one reply per call.
pub fn mock_backend_script(
    name: &str,
    replies: Vec<MockReply>,
) -> (Box<dyn SpeechBackend>, Arc<MockStats>) {
    let stats = Arc::new(MockStats::default());

    let backend = MockSpeechBackend {
        name: name.to_string(),
        script: Mutex::new(replies.into()),
        delay: None,
        stats: stats.clone(),
    };

    (Box::new(backend), stats)
}

/// Creates a scripted backend that waits before answering, for tests
/// that need an in-flight generation.
pub fn mock_backend_with_delay(
    name: &str,
    reply: MockReply,
    delay: Duration,
) -> (Box<dyn SpeechBackend>, Arc<MockStats>) {
    let stats = Arc::new(MockStats::default());

    let backend = MockSpeechBackend {
        name: name.to_string(),
        script: Mutex::new(vec![reply].into()),
        delay: Some(delay),
        stats: stats.clone(),
    };

    (Box::new(backend), stats)
}

/// Test harness wiring a session over scripted synthesis backends.
/// Session actions are driven directly so each test call runs to
/// completion before its assertions.
pub struct TestHarness {
    pub bus: EventBus,
    pub engine: SharedEngine,
    pub transport: SharedTransport,
    pub session: SharedSession,
}

impl TestHarness {
    pub fn with_backends(backends: Vec<Box<dyn SpeechBackend>>) -> Self {
        Self::build(backends, None)
    }

    pub fn with_rewrite(backends: Vec<Box<dyn SpeechBackend>>, rewrite: RewriteClient) -> Self {
        Self::build(backends, Some(rewrite))
    }

    fn build(backends: Vec<Box<dyn SpeechBackend>>, rewrite: Option<RewriteClient>) -> Self {
        let bus = EventBus::new();
        let engine = engine::init();
        let transport: SharedTransport = Arc::new(RwLock::new(TransportController::new()));

        let session = session::build_session(
            &bus,
            Arc::new(SpeechClient::with_backends(backends)),
            rewrite.map(Arc::new),
            engine.clone(),
            transport.clone(),
        );

        Self {
            bus,
            engine,
            transport,
            session,
        }
    }

    pub fn subscribe(&self) -> Subscriber {
        self.bus.subscribe()
    }

    /// Runs one session action to completion.
    pub async fn session_action(&self, action: SessionAction) {
        session::handle_incoming_event(action, &self.session).await;
    }

    pub async fn speak(&self, text: &str) {
        self.session_action(SessionAction::Generate {
            text: text.to_string(),
        })
        .await;
    }

    pub async fn transport_state(&self) -> TransportState {
        self.transport.read().await.state()
    }
}

/// Collects all events from a subscriber within a timeout period.
/// Returns events in the order they were received.
pub async fn collect_events(subscriber: &mut Subscriber, timeout: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match subscriber.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) => {
                if tokio::time::Instant::now() >= deadline {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Err(TryRecvError::Lagged(n)) => {
                eprintln!("Warning: subscriber lagged, missed {n} events");
            }
            Err(TryRecvError::Closed) => break,
        }
    }

    events
}

/// Drains events already delivered to a subscriber, without waiting.
pub fn drain_events(subscriber: &mut Subscriber) -> Vec<Event> {
    let mut events = Vec::new();

    while let Ok(event) = subscriber.try_recv() {
        events.push(event);
    }

    events
}

/// Waits for a Say line containing the substring, within a timeout.
pub async fn wait_for_say(
    subscriber: &mut Subscriber,
    timeout: Duration,
    substring: &str,
) -> Option<String> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match subscriber.try_recv() {
            Ok(Event::Ui(UiAction::Say(text))) if text.contains(substring) => return Some(text),
            Ok(_) => continue,
            Err(TryRecvError::Empty) => {
                if tokio::time::Instant::now() >= deadline {
                    return None;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Closed) => return None,
        }
    }
}

/// Polls until the transport reaches the wanted state. Panics on timeout
/// so a failure points at the state that never arrived.
pub async fn wait_for_transport_state(
    transport: &SharedTransport,
    want: TransportState,
    timeout: Duration,
) {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if transport.read().await.state() == want {
            return;
        }

        if tokio::time::Instant::now() >= deadline {
            panic!("Transport never reached {want:?}");
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Polls until the session finishes its in-flight generation.
pub async fn wait_for_idle_session(session: &SharedSession, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if !session.read().await.is_loading() {
            return;
        }

        if tokio::time::Instant::now() >= deadline {
            panic!("Session never finished loading");
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Extracts the text from Ui::Say events.
pub fn say_lines(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Ui(UiAction::Say(text)) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Checks if any event in the list is a Say containing the substring.
pub fn has_say_containing(events: &[Event], substring: &str) -> bool {
    events
        .iter()
        .any(|e| matches!(e, Event::Ui(UiAction::Say(text)) if text.contains(substring)))
}

/// Asserts that a specific event type was received.
#[macro_export]
macro_rules! assert_event_received {
    ($events:expr, $pattern:pat) => {
        assert!(
            $events.iter().any(|e| matches!(e, $pattern)),
            "Expected event matching {} not found in {:?}",
            stringify!($pattern),
            $events
        );
    };
}

/// Asserts that a specific event type was NOT received.
#[macro_export]
macro_rules! assert_event_not_received {
    ($events:expr, $pattern:pat) => {
        assert!(
            !$events.iter().any(|e| matches!(e, $pattern)),
            "Unexpected event matching {} found in {:?}",
            stringify!($pattern),
            $events
        );
    };
}
