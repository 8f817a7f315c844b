//! Unit tests for the analyser module

#[cfg(test)]
mod tests {
    use crate::analyser::Analyser;
    use std::f64::consts::TAU;

    fn sine_samples(freq: f64, sample_rate: f64, count: usize) -> Vec<i16> {
        (0..count)
            .map(|i| {
                let t = i as f64 / sample_rate;
                ((t * freq * TAU).sin() * 20000.0) as i16
            })
            .collect()
    }

    #[test]
    fn test_bin_count_is_half_fft_size() {
        let analyser = Analyser::new(256);

        assert_eq!(analyser.bin_count(), 128);
    }

    #[test]
    #[should_panic]
    fn test_fft_size_must_be_power_of_two() {
        Analyser::new(100);
    }

    #[test]
    fn test_silence_stays_at_the_floor() {
        let mut analyser = Analyser::new(256);
        analyser.push_samples(&[0; 256]);

        let bins = analyser.byte_frequency_data();

        assert_eq!(bins.len(), 128);
        assert!(bins.iter().all(|&bin| bin == 0));
    }

    #[test]
    fn test_sine_peaks_at_the_expected_bin() {
        let sample_rate = 24000.0;
        let mut analyser = Analyser::new(256);

        // 3 kHz at 24 kHz with 256-point windows lands exactly in bin 32.
        analyser.push_samples(&sine_samples(3000.0, sample_rate, 256));

        let bins = analyser.byte_frequency_data();
        let peak = bins
            .iter()
            .enumerate()
            .max_by_key(|(_, &value)| value)
            .map(|(bin, _)| bin)
            .unwrap();

        let expected = (3000.0 / sample_rate * 256.0) as i64;
        assert!(
            (peak as i64 - expected).abs() <= 1,
            "peak bin {peak}, expected near {expected}"
        );
        assert!(bins[peak] > 100);
    }

    #[test]
    fn test_sustained_tone_climbs_with_smoothing() {
        let mut analyser = Analyser::new(256);
        let samples = sine_samples(1000.0, 24000.0, 256);

        analyser.push_samples(&samples);
        let first = *analyser.byte_frequency_data().iter().max().unwrap();

        analyser.push_samples(&samples);
        let second = *analyser.byte_frequency_data().iter().max().unwrap();

        // Time smoothing keeps the first frame below steady state.
        assert!(second >= first);
        assert!(first > 0);
    }

    #[test]
    fn test_very_quiet_signal_clamps_to_zero() {
        let mut analyser = Analyser::new(256);

        // One-count samples sit far below the -100 dB floor.
        analyser.push_samples(&[1; 256]);

        let bins = analyser.byte_frequency_data();
        assert!(bins.iter().all(|&bin| bin == 0));
    }

    #[test]
    fn test_window_holds_most_recent_samples() {
        let mut analyser = Analyser::new(256);

        // A loud burst followed by more than a window of silence: the
        // analyser only ever sees the silence.
        analyser.push_samples(&sine_samples(2000.0, 24000.0, 256));
        analyser.push_samples(&[0; 512]);

        let bins = analyser.byte_frequency_data();
        assert!(bins.iter().all(|&bin| bin == 0));
    }
}
