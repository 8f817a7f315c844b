//! Audio engine context: the single audio processing graph.
//!
//! The graph mixes the playback lane and the effects lane, feeds the
//! frequency analyser and publishes paced chunks on a watch channel for
//! any connected sink. The context is created lazily on first use and
//! starts out suspended, mirroring platforms that forbid autonomous audio
//! before a user gesture.

use crate::analyser::Analyser;
use crate::buffer::PlaybackBuffer;
use crate::constants::{ANALYSER_FFT_SIZE, SAMPLE_RATE, TARGET_CHUNK_SIZE};
use crate::decoder::{self, DecodedAudioBuffer, RawAudioPayload};
use crate::error::DecodeError;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, RwLock};

/// One mono audio sample.
pub type Sample = i16;

/// Chunks of mixed output, consumed by the TCP streamer.
pub type EngineOutput = watch::Receiver<Vec<Sample>>;

/// Shared lane renderers push samples into.
pub type Lane = Arc<Mutex<PlaybackBuffer>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not yet running; the graph outputs silence.
    Suspended,
    Running,
}

#[derive(Debug)]
struct ContextInner {
    sample_rate: u32,
    state: Mutex<ContextState>,
    analyser: Mutex<Analyser>,

    /// Lane the transport's playback node renders into.
    main_lane: Lane,

    /// Lane for short UI effect blips, mixed over the main lane.
    sfx_lane: Lane,

    output_tx: watch::Sender<Vec<Sample>>,

    /// Keeps the output channel open while no external sink is connected.
    _output_rx: EngineOutput,
}

/// Handle to the audio processing graph. Cheap to clone; every clone
/// refers to the same graph.
#[derive(Clone, Debug)]
pub struct EngineContext {
    inner: Arc<ContextInner>,
}

impl PartialEq for EngineContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl EngineContext {
    fn new(sample_rate: u32) -> Self {
        let (output_tx, output_rx) = watch::channel(Default::default());

        let inner = Arc::new(ContextInner {
            sample_rate,
            state: Mutex::new(ContextState::Suspended),
            analyser: Mutex::new(Analyser::new(ANALYSER_FFT_SIZE)),
            main_lane: Arc::new(Mutex::new(PlaybackBuffer::new())),
            sfx_lane: Arc::new(Mutex::new(PlaybackBuffer::new())),
            output_tx,
            _output_rx: output_rx,
        });

        let context = Self { inner };
        start_output_pump(context.clone());

        context
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn state(&self) -> ContextState {
        *self
            .inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Moves a suspended context to running. Idempotent.
    fn resume(&self) {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if *state == ContextState::Suspended {
            *state = ContextState::Running;
            debug!("Audio context resumed");
        }
    }

    pub fn main_lane(&self) -> Lane {
        self.inner.main_lane.clone()
    }

    pub fn sfx_lane(&self) -> Lane {
        self.inner.sfx_lane.clone()
    }

    pub fn subscribe_output(&self) -> EngineOutput {
        self.inner.output_tx.subscribe()
    }

    /// Number of frequency bins the analyser exposes.
    pub fn analyser_bin_count(&self) -> usize {
        ANALYSER_FFT_SIZE / 2
    }

    /// Current frequency data from the analyser, one byte per bin.
    pub fn byte_frequency_data(&self) -> Vec<u8> {
        match self.inner.analyser.lock() {
            Ok(mut analyser) => analyser.byte_frequency_data(),
            Err(_) => vec![],
        }
    }

    /// Pulls one chunk from each lane and mixes them with saturation.
    fn mix_chunk(&self, count: usize) -> Vec<Sample> {
        let mut chunk: Vec<Sample> = vec![0; count];

        for lane in [&self.inner.main_lane, &self.inner.sfx_lane] {
            if let Ok(mut lane) = lane.lock() {
                if !lane.has_data() {
                    continue;
                }

                for (mixed, sample) in chunk.iter_mut().zip(lane.pull_samples(count)) {
                    *mixed = mixed.saturating_add(sample);
                }
            }
        }

        chunk
    }
}

/// Owner of the lazily-created engine context.
#[derive(Default)]
pub struct AudioEngine {
    context: Option<EngineContext>,
}

pub type SharedEngine = Arc<RwLock<AudioEngine>>;

impl AudioEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the context on first call and resumes it when suspended.
    /// Calling again returns the same context and raises no error.
    pub fn ensure_context(&mut self) -> EngineContext {
        let context = self
            .context
            .get_or_insert_with(|| {
                info!("Creating audio context at {SAMPLE_RATE} Hz");
                EngineContext::new(SAMPLE_RATE)
            })
            .clone();

        context.resume();

        context
    }

    /// The context, if one has been created yet.
    pub fn context(&self) -> Option<EngineContext> {
        self.context.clone()
    }

    /// Decodes a payload against the engine's context.
    pub fn decode(&self, payload: &RawAudioPayload) -> Result<DecodedAudioBuffer, DecodeError> {
        let context = self.context().ok_or(DecodeError::ContextUnavailable)?;

        decoder::decode_audio_data(payload, &context)
    }
}

pub fn init() -> SharedEngine {
    Arc::new(RwLock::new(AudioEngine::new()))
}

/// Paces mixed output against the wall clock so samples leave the graph
/// at the context's sample rate regardless of scheduling jitter. A
/// suspended context emits silence, keeping connected players fed.
fn start_output_pump(context: EngineContext) {
    tokio::spawn(async move {
        let start_time = std::time::Instant::now();
        let mut sample_send_count: u64 = 0;

        let sample_rate = context.sample_rate();
        let sleep_time = std::time::Duration::from_micros(
            ((TARGET_CHUNK_SIZE as f64 / sample_rate as f64) * 1_000_000.0) as u64,
        );

        loop {
            let expected_sent_samples =
                ((start_time.elapsed() + sleep_time).as_secs_f64() * sample_rate as f64) as u64;

            let chunk_size = (expected_sent_samples - sample_send_count) as usize;

            let chunk = if context.state() == ContextState::Running {
                context.mix_chunk(chunk_size)
            } else {
                vec![0; chunk_size]
            };

            if let Ok(mut analyser) = context.inner.analyser.lock() {
                analyser.push_samples(&chunk);
            }

            context
                .inner
                .output_tx
                .send(chunk)
                .expect("Expected engine output channel to never close");
            sample_send_count += chunk_size as u64;

            tokio::time::sleep(sleep_time).await;
        }
    });
}
