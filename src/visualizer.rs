//! Frequency snapshots for a terminal spectrum display.

use crate::engine::SharedEngine;
use crate::transport::{SharedTransport, TransportState};
use tokio::sync::watch;
use tokio::time::{interval, Duration};

/// One analyser snapshot. Empty bins mean nothing is playing.
#[derive(Clone, Debug, Default)]
pub struct VizFrame {
    pub bins: Vec<u8>,
}

/// Initialize the visualizer module. Samples the analyser ten times a
/// second while audio is playing and publishes frames on a watch channel.
/// The sampler stops once every receiver is gone.
pub fn init(engine: SharedEngine, transport: SharedTransport) -> watch::Receiver<VizFrame> {
    let (frame_tx, frame_rx) = watch::channel(VizFrame::default());

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(100));

        loop {
            tick.tick().await;

            let playing = transport.read().await.state() == TransportState::Playing;

            let frame = if playing {
                match engine.read().await.context() {
                    Some(context) => VizFrame {
                        bins: context.byte_frequency_data(),
                    },
                    None => VizFrame::default(),
                }
            } else {
                VizFrame::default()
            };

            if frame_tx.send(frame).is_err() {
                return;
            }
        }
    });

    frame_rx
}

/// Renders a frame as one line of block characters, `width` columns wide.
pub fn render_bars(frame: &VizFrame, width: usize) -> String {
    const RAMP: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

    if frame.bins.is_empty() || width == 0 {
        return " ".repeat(width);
    }

    (0..width)
        .map(|i| {
            let bin = i * frame.bins.len() / width;
            let level = frame.bins[bin] as usize * (RAMP.len() - 1) / 255;
            RAMP[level]
        })
        .collect()
}
