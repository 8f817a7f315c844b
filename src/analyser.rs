//! Frequency analyser attached to the engine output.
//!
//! Mirrors the semantics of a Web Audio AnalyserNode: a Blackman-windowed
//! FFT over the most recent samples, magnitudes smoothed over time,
//! converted to dB and mapped into unsigned bytes for the visualizer.

use std::collections::VecDeque;

const SMOOTHING_TIME_CONSTANT: f64 = 0.8;
const MIN_DECIBELS: f64 = -100.0;
const MAX_DECIBELS: f64 = -30.0;

#[derive(Debug)]
pub struct Analyser {
    fft_size: usize,
    /// Most recent `fft_size` samples, oldest first. Starts out silent.
    recent: VecDeque<f32>,
    /// Per-bin magnitudes carried between frames for time smoothing.
    smoothed: Vec<f64>,
}

impl Analyser {
    pub fn new(fft_size: usize) -> Self {
        assert!(fft_size.is_power_of_two(), "FFT size must be a power of two");

        Self {
            fft_size,
            recent: VecDeque::from(vec![0.0; fft_size]),
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    /// Number of frequency bins exposed, `fft_size / 2`.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Feeds played-back samples into the analysis window.
    pub fn push_samples(&mut self, samples: &[i16]) {
        for &sample in samples {
            self.recent.pop_front();
            self.recent.push_back(sample as f32 / 32768.0);
        }
    }

    /// Computes the current frequency data as one byte per bin: dB
    /// magnitudes scaled so that `MIN_DECIBELS` maps to 0 and
    /// `MAX_DECIBELS` to 255. Silence yields all zeros.
    pub fn byte_frequency_data(&mut self) -> Vec<u8> {
        let n = self.fft_size;

        let mut re: Vec<f64> = self
            .recent
            .iter()
            .enumerate()
            .map(|(i, &sample)| sample as f64 * blackman(i, n))
            .collect();
        let mut im = vec![0.0; n];

        fft_in_place(&mut re, &mut im);

        let range = MAX_DECIBELS - MIN_DECIBELS;

        (0..self.bin_count())
            .map(|k| {
                let magnitude = (re[k] * re[k] + im[k] * im[k]).sqrt() / n as f64;

                self.smoothed[k] = SMOOTHING_TIME_CONSTANT * self.smoothed[k]
                    + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;

                let db = 20.0 * self.smoothed[k].log10();
                let scaled = 255.0 * (db - MIN_DECIBELS) / range;

                scaled.clamp(0.0, 255.0) as u8
            })
            .collect()
    }
}

/// Blackman window coefficient for position `i` of `n`.
fn blackman(i: usize, n: usize) -> f64 {
    let x = 2.0 * std::f64::consts::PI * i as f64 / n as f64;

    0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
}

/// In-place iterative radix-2 FFT over `re`/`im`. Length must be a power
/// of two, which `Analyser::new` asserts.
fn fft_in_place(re: &mut [f64], im: &mut [f64]) {
    let n = re.len();

    // Bit-reversal permutation
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;

        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }

    // Butterfly passes
    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let angle = -2.0 * std::f64::consts::PI / len as f64;
        let (step_re, step_im) = (angle.cos(), angle.sin());

        for block in (0..n).step_by(len) {
            let mut w_re = 1.0;
            let mut w_im = 0.0;

            for k in 0..half {
                let even_re = re[block + k];
                let even_im = im[block + k];
                let odd_re = re[block + k + half] * w_re - im[block + k + half] * w_im;
                let odd_im = re[block + k + half] * w_im + im[block + k + half] * w_re;

                re[block + k] = even_re + odd_re;
                im[block + k] = even_im + odd_im;
                re[block + k + half] = even_re - odd_re;
                im[block + k + half] = even_im - odd_im;

                let next_re = w_re * step_re - w_im * step_im;
                w_im = w_re * step_im + w_im * step_re;
                w_re = next_re;
            }
        }

        len <<= 1;
    }
}
