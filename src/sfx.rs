//! Short synthesized UI blips.
//!
//! Each effect is a tiny oscillator recipe rendered on demand and queued
//! on the engine's effects lane, mixed over whatever speech is playing.

use crate::engine::EngineContext;
use std::f64::consts::TAU;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundEffect {
    /// Generation kicked off
    Click,

    /// Generation finished
    Success,

    /// Artifact written to disk
    Download,

    /// History entry removed
    Delete,
}

/// Renders an effect and queues it for playback. A lane that cannot be
/// locked just drops the blip.
pub fn play(context: &EngineContext, effect: SoundEffect) {
    let samples = render(effect, context.sample_rate());

    if let Ok(mut lane) = context.sfx_lane().lock() {
        lane.push_samples(samples);
    }
}

/// Renders an effect to mono PCM at the given sample rate.
pub fn render(effect: SoundEffect, sample_rate: u32) -> Vec<i16> {
    match effect {
        SoundEffect::Click => render_click(sample_rate),
        SoundEffect::Success => render_success(sample_rate),
        SoundEffect::Download => render_download(sample_rate),
        SoundEffect::Delete => render_delete(sample_rate),
    }
}

/// A 100 ms sine chirp falling 800 Hz to 100 Hz with a fast fade-out.
fn render_click(sample_rate: u32) -> Vec<i16> {
    render_tone(sample_rate, 0.1, |t| {
        let freq = exp_ramp(800.0, 100.0, t, 0.08);
        let gain = exp_ramp(0.15, 0.001, t, 0.08);
        (freq, gain, Waveform::Sine)
    })
}

/// A rising C major arpeggio: three sine tones staggered by 80 ms, each
/// swelling in over 50 ms and decaying over the next 350 ms.
fn render_success(sample_rate: u32) -> Vec<i16> {
    const CHORD: [f64; 3] = [523.25, 659.25, 783.99];
    const STAGGER: f64 = 0.08;
    const TONE_SECS: f64 = 0.5;

    let dt = 1.0 / sample_rate as f64;
    let total = STAGGER * (CHORD.len() - 1) as f64 + TONE_SECS;
    let length = (total * sample_rate as f64) as usize;
    let mut mix = vec![0.0f64; length];

    for (i, freq) in CHORD.iter().enumerate() {
        let start = i as f64 * STAGGER;
        let mut phase = 0.0;

        for (j, out) in mix.iter_mut().enumerate() {
            let t = j as f64 * dt - start;

            if t < 0.0 || t >= TONE_SECS {
                continue;
            }

            let gain = if t < 0.05 {
                lin_ramp(0.0, 0.1, t, 0.05)
            } else {
                exp_ramp(0.1, 0.001, t - 0.05, 0.35)
            };

            phase += TAU * freq * dt;
            *out += phase.sin() * gain;
        }
    }

    mix.into_iter().map(to_i16).collect()
}

/// A 200 ms triangle sweep falling 400 Hz to 100 Hz.
fn render_download(sample_rate: u32) -> Vec<i16> {
    render_tone(sample_rate, 0.2, |t| {
        let freq = exp_ramp(400.0, 100.0, t, 0.2);
        let gain = lin_ramp(0.1, 0.0, t, 0.2);
        (freq, gain, Waveform::Triangle)
    })
}

/// A 100 ms square thud falling 150 Hz to 50 Hz.
fn render_delete(sample_rate: u32) -> Vec<i16> {
    render_tone(sample_rate, 0.1, |t| {
        let freq = exp_ramp(150.0, 50.0, t, 0.1);
        let gain = lin_ramp(0.05, 0.0, t, 0.1);
        (freq, gain, Waveform::Square)
    })
}

enum Waveform {
    Sine,
    Triangle,
    Square,
}

/// Renders a single oscillator of `secs` length. The recipe maps elapsed
/// time to frequency, gain and waveform; frequency is integrated into
/// phase so sweeps stay click-free.
fn render_tone(
    sample_rate: u32,
    secs: f64,
    recipe: impl Fn(f64) -> (f64, f64, Waveform),
) -> Vec<i16> {
    let dt = 1.0 / sample_rate as f64;
    let length = (secs * sample_rate as f64) as usize;
    let mut phase: f64 = 0.0;
    let mut samples = Vec::with_capacity(length);

    for i in 0..length {
        let t = i as f64 * dt;
        let (freq, gain, waveform) = recipe(t);

        phase += TAU * freq * dt;

        let wave = match waveform {
            Waveform::Sine => phase.sin(),
            Waveform::Triangle => (2.0 / std::f64::consts::PI) * phase.sin().asin(),
            Waveform::Square => {
                if phase.sin() >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
        };

        samples.push(to_i16(wave * gain));
    }

    samples
}

/// Exponential ramp from `v0` to `v1` over `duration`, holding `v1` after.
fn exp_ramp(v0: f64, v1: f64, t: f64, duration: f64) -> f64 {
    if t <= 0.0 {
        v0
    } else if t >= duration {
        v1
    } else {
        v0 * (v1 / v0).powf(t / duration)
    }
}

/// Linear ramp from `v0` to `v1` over `duration`, holding `v1` after.
fn lin_ramp(v0: f64, v1: f64, t: f64, duration: f64) -> f64 {
    if t <= 0.0 {
        v0
    } else if t >= duration {
        v1
    } else {
        v0 + (v1 - v0) * (t / duration)
    }
}

fn to_i16(sample: f64) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}
