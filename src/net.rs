use std::net::SocketAddr;

use anyhow::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use hound::{SampleFormat, WavSpec};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};

use crate::constants::{BIT_DEPTH, CHANNELS, SAMPLE_RATE};
use crate::engine::{EngineOutput, SharedEngine};

/// Initialize the net module. Serves the engine's live output as an
/// infinite WAV stream, one TCP connection per listener.
pub fn init(engine: SharedEngine, listen_addr: String) {
    tokio::spawn(async move {
        let listener = match TcpListener::bind(&listen_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind audio stream listener on {listen_addr}: {e}");
                return;
            }
        };

        info!("Audio stream listening on {listen_addr}");

        loop {
            match accept(&listener, &engine).await {
                Ok(addr) => info!("Accepted audio stream connection from {addr}"),
                Err(e) => warn!("Failed to accept audio stream connection: {e}"),
            }
        }
    });
}

async fn accept(listener: &TcpListener, engine: &SharedEngine) -> Result<SocketAddr> {
    let (mut stream, addr) = listener.accept().await?;

    let engine = engine.clone();

    tokio::spawn(async move {
        // The engine output only exists once a context has been created;
        // until then there is nothing to stream.
        let mut source = wait_for_output(&engine).await;

        let spec = WavSpec {
            channels: CHANNELS,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: BIT_DEPTH,
            sample_format: SampleFormat::Int,
        };

        // Write the wav header to the stream using the hound crate.
        // This will allow players to recognize the stream as a wav file.
        let header = spec.into_header_for_infinite_file();
        if let Err(e) = stream.write_all(&header[..]).await {
            debug!("Failed to write wav header to {addr}: {e}");
            return;
        }

        loop {
            source
                .changed()
                .await
                .expect("Expected engine output channel to never close");

            let samples = source.borrow_and_update().clone();
            let mut wav_data: Vec<u8> = Vec::with_capacity(samples.len() * 2);

            for sample in samples {
                WriteBytesExt::write_i16::<LittleEndian>(&mut wav_data, sample).unwrap();
            }

            if let Err(e) = stream.write_all(wav_data.as_slice()).await {
                debug!("Audio stream connection {addr} closed: {e}");
                break;
            }
        }
    });

    Ok(addr)
}

async fn wait_for_output(engine: &SharedEngine) -> EngineOutput {
    loop {
        if let Some(context) = engine.read().await.context() {
            return context.subscribe_output();
        }

        sleep(Duration::from_millis(200)).await;
    }
}
