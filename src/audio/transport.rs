use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::devices::AudioDeviceBinding;
use super::vad::{frame_confidence, VadEvent, VadGate, VadParams};
use crate::pipeline::{forward, Frame, FrameProcessor};

/// Audio sample data (16-bit PCM, interleaved).
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Transport tuning.
#[derive(Debug, Clone)]
pub struct TransportParams {
    pub vad: VadParams,
    /// Forward raw audio downstream even while the VAD is still evaluating
    /// it, so the engine can do its own endpointing
    pub vad_passthrough: bool,
    /// Capture and playback rate; the realtime engine consumes and produces
    /// 24 kHz PCM16
    pub sample_rate: u32,
    /// Duration of one captured frame
    pub chunk_ms: u64,
}

impl Default for TransportParams {
    fn default() -> Self {
        Self {
            vad: VadParams::default(),
            vad_passthrough: true,
            sample_rate: 24_000,
            chunk_ms: 20,
        }
    }
}

/// Duplex audio stream over the resolved device binding.
///
/// Hands out the two pipeline stages; each endpoint can be taken exactly
/// once per session.
pub struct AudioTransport {
    input: Option<TransportInput>,
    output: Option<TransportOutput>,
}

impl AudioTransport {
    pub fn new(binding: AudioDeviceBinding, params: TransportParams) -> Self {
        Self {
            input: Some(TransportInput {
                device_index: binding.input_index,
                params: params.clone(),
                stop: Arc::new(AtomicBool::new(false)),
                worker: None,
            }),
            output: Some(TransportOutput {
                device_index: binding.output_index,
                params,
                queue: Arc::new(Mutex::new(VecDeque::new())),
                stop: Arc::new(AtomicBool::new(false)),
                worker: None,
            }),
        }
    }

    pub fn input(&mut self) -> Result<TransportInput> {
        self.input.take().context("transport input already taken")
    }

    pub fn output(&mut self) -> Result<TransportOutput> {
        self.output.take().context("transport output already taken")
    }
}

/// Pipeline stage producing meeting audio frames gated through the VAD.
pub struct TransportInput {
    device_index: Option<usize>,
    params: TransportParams,
    stop: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

#[async_trait::async_trait]
impl FrameProcessor for TransportInput {
    fn name(&self) -> &str {
        "transport-input"
    }

    async fn start(&mut self, output: mpsc::Sender<Frame>) -> Result<()> {
        let device_index = self.device_index;
        let params = self.params.clone();
        let stop = Arc::clone(&self.stop);

        // cpal streams are not Send; the stream lives on a dedicated thread
        // and frames cross into the pipeline over the channel.
        let worker = std::thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                if let Err(e) = capture_loop(device_index, params, output, stop) {
                    error!("Audio capture failed: {}", e);
                }
            })
            .context("Failed to spawn audio capture thread")?;

        self.worker = Some(worker);
        Ok(())
    }

    async fn process(&mut self, frame: Frame, output: &mpsc::Sender<Frame>) -> Result<()> {
        // Injected frames (seeds, End) pass straight through to the engine.
        if matches!(frame, Frame::End) {
            self.stop.store(true, Ordering::SeqCst);
        }
        forward(output, frame).await;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = tokio::task::spawn_blocking(move || worker.join()).await;
        }
        Ok(())
    }
}

fn capture_loop(
    device_index: Option<usize>,
    params: TransportParams,
    output: mpsc::Sender<Frame>,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    let host = cpal::default_host();
    let device = match device_index {
        Some(index) => host
            .devices()
            .context("Failed to enumerate audio devices")?
            .nth(index)
            .context("Bound input device disappeared")?,
        None => host
            .default_input_device()
            .context("No default input device available")?,
    };

    info!(
        "Capturing meeting audio from '{}'",
        device.name().unwrap_or_else(|_| "unknown".to_string())
    );

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(params.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let (raw_tx, raw_rx) = std::sync::mpsc::channel::<Vec<f32>>();
    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = raw_tx.send(data.to_vec());
            },
            |err| error!("Input stream error: {}", err),
            None,
        )
        .context("Failed to build input stream")?;
    stream.play().context("Failed to start input stream")?;

    let chunk_len = (params.sample_rate as u64 * params.chunk_ms / 1000) as usize;
    let chunk_secs = params.chunk_ms as f64 / 1000.0;
    let mut gate = VadGate::new(params.vad);
    let mut pending: Vec<i16> = Vec::with_capacity(chunk_len);
    let mut clock_ms: u64 = 0;

    while !stop.load(Ordering::SeqCst) {
        let samples = match raw_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(samples) => samples,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        for sample in samples {
            pending.push((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
            if pending.len() < chunk_len {
                continue;
            }

            let chunk = std::mem::replace(&mut pending, Vec::with_capacity(chunk_len));
            let confidence = frame_confidence(&chunk);

            match gate.observe(confidence, chunk_secs) {
                Some(VadEvent::SpeechStarted) => {
                    let _ = output.blocking_send(Frame::SpeechStarted);
                }
                Some(VadEvent::SpeechStopped) => {
                    let _ = output.blocking_send(Frame::SpeechStopped);
                }
                None => {}
            }

            if params.vad_passthrough || gate.is_speaking() {
                let frame = AudioFrame {
                    samples: chunk,
                    sample_rate: params.sample_rate,
                    channels: 1,
                    timestamp_ms: clock_ms,
                };
                if output.blocking_send(Frame::Audio(frame)).is_err() {
                    // Pipeline is gone; nothing left to capture for.
                    return Ok(());
                }
            }
            clock_ms += params.chunk_ms;
        }
    }

    Ok(())
}

/// Pipeline stage playing agent speech into the bound output device.
pub struct TransportOutput {
    device_index: Option<usize>,
    params: TransportParams,
    queue: Arc<Mutex<VecDeque<i16>>>,
    stop: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

#[async_trait::async_trait]
impl FrameProcessor for TransportOutput {
    fn name(&self) -> &str {
        "transport-output"
    }

    async fn start(&mut self, _output: mpsc::Sender<Frame>) -> Result<()> {
        let device_index = self.device_index;
        let params = self.params.clone();
        let queue = Arc::clone(&self.queue);
        let stop = Arc::clone(&self.stop);

        let worker = std::thread::Builder::new()
            .name("audio-playback".to_string())
            .spawn(move || {
                if let Err(e) = playback_loop(device_index, params, queue, stop) {
                    error!("Audio playback failed: {}", e);
                }
            })
            .context("Failed to spawn audio playback thread")?;

        self.worker = Some(worker);
        Ok(())
    }

    async fn process(&mut self, frame: Frame, output: &mpsc::Sender<Frame>) -> Result<()> {
        match frame {
            Frame::Audio(frame) => {
                let mut queue = self.queue.lock().unwrap();
                queue.extend(frame.samples);
            }
            Frame::Interrupted => {
                // The human started speaking over us; drop the rest of the
                // utterance instead of talking through them.
                let flushed = {
                    let mut queue = self.queue.lock().unwrap();
                    let len = queue.len();
                    queue.clear();
                    len
                };
                if flushed > 0 {
                    warn!("Interrupted, flushed {} queued samples", flushed);
                }
            }
            Frame::End => {
                self.stop.store(true, Ordering::SeqCst);
                forward(output, Frame::End).await;
            }
            other => forward(output, other).await,
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = tokio::task::spawn_blocking(move || worker.join()).await;
        }
        Ok(())
    }
}

fn playback_loop(
    device_index: Option<usize>,
    params: TransportParams,
    queue: Arc<Mutex<VecDeque<i16>>>,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    let host = cpal::default_host();
    let device = match device_index {
        Some(index) => host
            .devices()
            .context("Failed to enumerate audio devices")?
            .nth(index)
            .context("Bound output device disappeared")?,
        None => host
            .default_output_device()
            .context("No default output device available")?,
    };

    info!(
        "Playing agent audio to '{}'",
        device.name().unwrap_or_else(|_| "unknown".to_string())
    );

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(params.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let callback_queue = Arc::clone(&queue);
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut queue = callback_queue.lock().unwrap();
                for slot in data.iter_mut() {
                    *slot = queue
                        .pop_front()
                        .map(|s| s as f32 / i16::MAX as f32)
                        .unwrap_or(0.0);
                }
            },
            |err| error!("Output stream error: {}", err),
            None,
        )
        .context("Failed to build output stream")?;
    stream.play().context("Failed to start output stream")?;

    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    Ok(())
}
