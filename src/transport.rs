//! Playback transport: play, pause, seek and rate control over a loaded
//! audio buffer.
//!
//! Playback nodes are one-shot and expose no position query, so the
//! controller does its own time bookkeeping: each playback segment records
//! a wall-clock anchor and the position is derived from elapsed time and
//! the rate multiplier. While playing, a poll task watches for the
//! position passing the end of the buffer and turns that into a stop.

use crate::constants::{
    FINISH_POLL_INTERVAL, MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE, TARGET_CHUNK_SIZE,
};
use crate::decoder::DecodedAudioBuffer;
use crate::engine::EngineContext;
use crate::event::{Event, EventBus};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub enum TransportAction {
    /// Start or resume playback from the stored offset
    Play,

    /// Pause playback, remembering the position
    Pause,

    /// Play if paused or stopped, pause if playing
    Toggle,

    /// Stop playback and reset the position to the start
    Stop,

    /// Jump to an absolute position in seconds of source audio
    Seek { secs: f64 },

    /// Change the playback-rate multiplier
    SetRate { rate: f64 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    /// No buffer loaded
    #[default]
    Idle,

    /// Buffer loaded, offset at the start
    Stopped,

    Playing,
    Paused,
}

/// Keep roughly this many samples queued ahead in the playback lane.
const LANE_LOW_WATER: usize = 4 * TARGET_CHUNK_SIZE;

/// A live playback segment: one renderer task streaming buffer samples
/// into the engine's playback lane. At most one exists at a time.
struct PlaybackNode {
    rate_tx: watch::Sender<f64>,
    cancel: CancellationToken,
}

/// Aborts the end-of-playback poll task when dropped, so leaving the
/// Playing state always tears the poll down with it.
struct PollGuard {
    handle: JoinHandle<()>,
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct TransportController {
    state: TransportState,
    buffer: Option<DecodedAudioBuffer>,
    context: Option<EngineContext>,

    /// Position to play from, in seconds of source audio. Rate changes
    /// while paused or stopped cannot corrupt it.
    offset: f64,

    /// When the current playback segment started.
    started_at: Option<Instant>,

    /// Head start of the current segment in scaled seconds, offset / rate
    /// at segment start. The position while playing is
    /// (elapsed + anchor_lead) * rate.
    anchor_lead: f64,

    rate: f64,
    node: Option<PlaybackNode>,

    /// Bumped for every new playback segment; stale finish polls compare
    /// against it and quietly exit.
    segment: u64,

    poll: Option<PollGuard>,
}

impl TransportController {
    pub fn new() -> Self {
        Self {
            state: TransportState::default(),
            buffer: None,
            context: None,
            offset: 0.0,
            started_at: None,
            anchor_lead: 0.0,
            rate: 1.0,
            node: None,
            segment: 0,
            poll: None,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Duration of the loaded buffer in seconds, 0 when idle.
    pub fn duration(&self) -> f64 {
        self.buffer
            .as_ref()
            .map(|buffer| buffer.duration())
            .unwrap_or(0.0)
    }

    /// Current position in seconds of source audio, capped at the buffer
    /// duration.
    pub fn position(&self) -> f64 {
        match (self.state, self.started_at) {
            (TransportState::Playing, Some(started_at)) => {
                let elapsed = started_at.elapsed().as_secs_f64();
                ((elapsed + self.anchor_lead) * self.rate).min(self.duration())
            }
            _ => self.offset,
        }
    }

    /// Loads a freshly decoded buffer. Any previous playback is torn down
    /// and the offset starts over at zero.
    pub fn attach_buffer(&mut self, buffer: DecodedAudioBuffer, context: EngineContext) {
        self.teardown_node();
        self.buffer = Some(buffer);
        self.context = Some(context);
        self.offset = 0.0;
        self.set_state(TransportState::Stopped);
    }

    /// Drops the loaded buffer entirely, i.e. a new generation is underway
    /// and stale audio must not remain playable.
    pub fn clear(&mut self) {
        self.teardown_node();
        self.buffer = None;
        self.offset = 0.0;
        self.set_state(TransportState::Idle);
    }

    pub fn play(&mut self) {
        if self.state == TransportState::Playing {
            return;
        }

        if self.buffer.is_none() {
            debug!("Ignoring play without a loaded buffer");
            return;
        }

        self.start_segment();
    }

    /// Pauses playback. The resume point is stored in seconds of source
    /// audio so later rate changes leave it intact.
    pub fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }

        let elapsed = self
            .started_at
            .map(|started_at| started_at.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.offset = ((elapsed + self.anchor_lead) * self.rate).min(self.duration());

        self.teardown_node();
        self.set_state(TransportState::Paused);
    }

    pub fn toggle(&mut self) {
        match self.state {
            TransportState::Playing => self.pause(),
            TransportState::Stopped | TransportState::Paused => self.play(),
            TransportState::Idle => debug!("Ignoring toggle without a loaded buffer"),
        }
    }

    /// Stops playback and resets the offset to the start of the buffer.
    pub fn stop(&mut self) {
        if self.state == TransportState::Idle {
            return;
        }

        self.teardown_node();
        self.offset = 0.0;
        self.set_state(TransportState::Stopped);
    }

    /// Jumps to an absolute position, clamped to the buffer bounds.
    /// Restarts the playback node when playing; otherwise the offset
    /// simply applies on the next play.
    pub fn seek(&mut self, secs: f64) {
        if self.state == TransportState::Idle {
            debug!("Ignoring seek without a loaded buffer");
            return;
        }

        if !secs.is_finite() {
            warn!("Ignoring non-finite seek target");
            return;
        }

        self.offset = secs.clamp(0.0, self.duration());

        match self.state {
            TransportState::Playing => self.start_segment(),
            // A stopped transport always sits at offset zero, so seeking
            // away from the start leaves it paused instead.
            TransportState::Stopped if self.offset > 0.0 => {
                self.set_state(TransportState::Paused)
            }
            _ => {}
        }
    }

    /// Changes the playback-rate multiplier, clamped to 0.5..=2.0. A live
    /// node picks the new rate up without restarting. The segment anchor
    /// is not recomputed, so a mid-playback rate change shifts the
    /// apparent position by the elapsed segment time times the rate delta.
    pub fn set_rate(&mut self, rate: f64) {
        if !rate.is_finite() {
            warn!("Ignoring non-finite playback rate");
            return;
        }

        self.rate = rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE);

        if let Some(node) = &self.node {
            if node.rate_tx.send(self.rate).is_err() {
                trace!("Rate change with no live renderer");
            }
        }
    }

    /// Playback ran past the end of the buffer: same outcome as stop.
    fn finish(&mut self) {
        self.teardown_node();
        self.offset = 0.0;
        self.set_state(TransportState::Stopped);
    }

    /// Starts a fresh playback segment from the stored offset.
    fn start_segment(&mut self) {
        let (buffer, context) = match (&self.buffer, &self.context) {
            (Some(buffer), Some(context)) => (buffer.clone(), context.clone()),
            _ => return,
        };

        self.teardown_node();

        self.segment += 1;
        self.started_at = Some(Instant::now());
        self.anchor_lead = self.offset / self.rate;
        self.node = Some(spawn_playback_node(buffer, context, self.offset, self.rate));

        self.set_state(TransportState::Playing);
    }

    /// Cancels the live node, if any, and flushes samples it already
    /// queued so pause and stop silence the output immediately. Stopping
    /// an already-finished node is not an error.
    fn teardown_node(&mut self) {
        self.poll = None;

        if let Some(node) = self.node.take() {
            node.cancel.cancel();
        }

        if let Some(context) = &self.context {
            if let Ok(mut lane) = context.main_lane().lock() {
                lane.clear();
            }
        }

        self.started_at = None;
        self.anchor_lead = 0.0;
    }

    fn set_state(&mut self, state: TransportState) {
        if self.state != state {
            debug!("Transport transitioning to state: {:?}", state);
        }
        self.state = state;

        // The finish poll lives exactly as long as the Playing state.
        if state != TransportState::Playing {
            self.poll = None;
        }
    }
}

impl Default for TransportController {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedTransport = Arc<RwLock<TransportController>>;

/// Initialize the transport module. Reads transport actions from the bus
/// and applies them in arrival order.
pub fn init(bus: &EventBus) -> SharedTransport {
    let transport = Arc::new(RwLock::new(TransportController::new()));

    handle_incoming_event_loop(bus.clone(), transport.clone());

    transport
}

fn handle_incoming_event_loop(bus: EventBus, transport: SharedTransport) {
    let mut bus_rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            let event = bus_rx.recv().await;

            if let Event::Transport(action) = event {
                // Handled inline: transport commands must apply in the
                // order they arrive.
                handle_incoming_event(action, &transport).await;
            }
        }
    });
}

pub async fn handle_incoming_event(action: TransportAction, transport: &SharedTransport) {
    {
        let mut locked = transport.write().await;

        match action {
            TransportAction::Play => locked.play(),
            TransportAction::Pause => locked.pause(),
            TransportAction::Toggle => locked.toggle(),
            TransportAction::Stop => locked.stop(),
            TransportAction::Seek { secs } => locked.seek(secs),
            TransportAction::SetRate { rate } => locked.set_rate(rate),
        }
    }

    arm_finish_poll(transport).await;
}

/// Arms the end-of-playback poll if the transport is playing, replacing
/// (and thereby aborting) any previous poll.
pub async fn arm_finish_poll(transport: &SharedTransport) {
    let mut locked = transport.write().await;

    if locked.state == TransportState::Playing {
        let segment = locked.segment;
        locked.poll = Some(spawn_finish_poll(transport.clone(), segment));
    }
}

/// Polls the playback position until it passes the end of the buffer,
/// then stops the transport. A poll that outlives its segment must not
/// touch the state.
fn spawn_finish_poll(transport: SharedTransport, segment: u64) -> PollGuard {
    let handle = tokio::spawn(async move {
        loop {
            sleep(FINISH_POLL_INTERVAL).await;

            let mut transport = transport.write().await;

            if transport.segment != segment || transport.state != TransportState::Playing {
                return;
            }

            if transport.position() >= transport.duration() {
                debug!("Playback reached the end of the buffer");
                transport.finish();
                return;
            }
        }
    });

    PollGuard { handle }
}

/// Spawns the renderer for one playback segment. It streams samples from
/// `offset` into the engine's playback lane, resampling by linear
/// interpolation to apply the rate multiplier, and ends when cancelled or
/// when the source buffer runs out.
fn spawn_playback_node(
    buffer: DecodedAudioBuffer,
    context: EngineContext,
    offset: f64,
    rate: f64,
) -> PlaybackNode {
    let (rate_tx, mut rate_rx) = watch::channel(rate);
    let cancel = CancellationToken::new();

    let task_cancel = cancel.clone();
    let src_rate = buffer.sample_rate as f64;

    tokio::spawn(async move {
        let samples = buffer.samples.clone();
        let lane = context.main_lane();
        let mut src_pos = offset * src_rate;

        loop {
            tokio::select! {
                biased;
                _ = task_cancel.cancelled() => {
                    trace!("Playback node cancelled");
                    return;
                }
                _ = sleep(Duration::from_millis(5)) => {}
            }

            let level = match lane.lock() {
                Ok(lane) => lane.buffer_level(),
                Err(_) => return,
            };

            if level >= LANE_LOW_WATER {
                continue;
            }

            let rate = *rate_rx.borrow_and_update();
            let mut chunk = Vec::with_capacity(TARGET_CHUNK_SIZE);
            let mut drained = false;

            for _ in 0..TARGET_CHUNK_SIZE {
                match sample_at(&samples, src_pos) {
                    Some(sample) => {
                        chunk.push((sample * 32767.0).clamp(-32768.0, 32767.0) as i16);
                        src_pos += rate;
                    }
                    None => {
                        drained = true;
                        break;
                    }
                }
            }

            if !chunk.is_empty() {
                if let Ok(mut lane) = lane.lock() {
                    lane.push_samples(chunk);
                }
            }

            if drained {
                trace!("Playback node drained its source buffer");
                // The finish poll owns the transition out of Playing.
                return;
            }
        }
    });

    PlaybackNode { rate_tx, cancel }
}

/// Linearly interpolated sample at a fractional position, None past the
/// end of the buffer.
fn sample_at(samples: &[f32], pos: f64) -> Option<f32> {
    let index = pos as usize;
    let frac = (pos - index as f64) as f32;

    match (samples.get(index), samples.get(index + 1)) {
        (Some(&a), Some(&b)) => Some(a + (b - a) * frac),
        (Some(&a), None) => Some(a),
        _ => None,
    }
}
