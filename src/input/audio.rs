use std::sync::atomic::Ordering;
use std::time::Duration;

use crossbeam_channel::Sender;

use super::{InputEvent, Source, SourceError, Worker};

/// Mean absolute amplitude (fraction of full scale) that counts as noise.
pub const NOISE_THRESHOLD: f32 = 0.02;
/// Samples per analysed block.
pub const BLOCK_SIZE: usize = 1024;
const SYNTHETIC_SAMPLE_RATE: u32 = 44_100;

/// Turns blocks of samples into noise/silence events.
#[derive(Debug, Clone, Copy)]
pub struct AmplitudeGate {
    threshold: f32,
}

impl AmplitudeGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Mean absolute amplitude of a block.
    pub fn level(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
    }

    /// One event per block; empty blocks produce nothing.
    pub fn classify(&self, samples: &[f32]) -> Option<InputEvent> {
        if samples.is_empty() {
            return None;
        }
        if Self::level(samples) > self.threshold {
            Some(InputEvent::Noise)
        } else {
            Some(InputEvent::Silence)
        }
    }
}

impl Default for AmplitudeGate {
    fn default() -> Self {
        Self::new(NOISE_THRESHOLD)
    }
}

/// Cuts a sample stream into gate-sized blocks and forwards one event per
/// block. Once the receiver is gone every later sample is dropped.
pub struct BlockSink {
    gate: AmplitudeGate,
    pending: Vec<f32>,
    events: Sender<InputEvent>,
    disconnected: bool,
}

impl BlockSink {
    pub fn new(events: Sender<InputEvent>) -> Self {
        Self {
            gate: AmplitudeGate::default(),
            pending: Vec::with_capacity(BLOCK_SIZE),
            events,
            disconnected: false,
        }
    }

    /// Feed samples. Returns false once the receiver has hung up.
    pub fn push(&mut self, samples: &[f32]) -> bool {
        if self.disconnected {
            return false;
        }
        for &sample in samples {
            self.pending.push(sample);
            if self.pending.len() < BLOCK_SIZE {
                continue;
            }
            let event = self.gate.classify(&self.pending);
            self.pending.clear();
            if let Some(event) = event {
                if self.events.try_send(event).is_err() {
                    log::trace!("Audio events receiver disconnected, dropping samples");
                    self.disconnected = true;
                    return false;
                }
            }
        }
        true
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

/// One stretch of a synthetic soundtrack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Peak sample amplitude during the stretch.
    pub amplitude: f32,
    pub seconds: f32,
}

/// Plays a looping script of loud and quiet stretches through the gate, at
/// real-time block cadence. Stands in for a microphone.
pub struct SyntheticAudio {
    script: Vec<Segment>,
    seed: u64,
    worker: Worker,
}

impl SyntheticAudio {
    pub fn new(script: Vec<Segment>, seed: u64) -> Self {
        Self {
            script,
            seed,
            worker: Worker::idle(),
        }
    }

    /// Loud long enough to fill the screen, anger it and summon the boss,
    /// then quiet long enough to calm and dismiss the boss and thin out.
    pub fn demo() -> Self {
        let loud = 0.1;
        let quiet = 0.005;
        Self::new(
            vec![
                Segment {
                    amplitude: loud,
                    seconds: 16.0,
                },
                Segment {
                    amplitude: quiet,
                    seconds: 4.0,
                },
                Segment {
                    amplitude: loud,
                    seconds: 12.0,
                },
                Segment {
                    amplitude: quiet,
                    seconds: 20.0,
                },
            ],
            fastrand::u64(..),
        )
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }
}

impl Source for SyntheticAudio {
    fn name(&self) -> &'static str {
        "synthetic audio"
    }

    fn start(&mut self, events: Sender<InputEvent>) -> Result<(), SourceError> {
        if self.script.is_empty() {
            return Err(SourceError::DeviceUnavailable("empty audio script".into()));
        }
        let script = self.script.clone();
        let seed = self.seed;
        self.worker.spawn("synthetic-audio", move |stop| {
            let mut rng = fastrand::Rng::with_seed(seed);
            let mut sink = BlockSink::new(events);
            let block_secs = BLOCK_SIZE as f32 / SYNTHETIC_SAMPLE_RATE as f32;
            let mut block = vec![0.0f32; BLOCK_SIZE];

            for segment in script.iter().cycle() {
                let blocks = (segment.seconds / block_secs).ceil() as usize;
                for _ in 0..blocks {
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                    for sample in block.iter_mut() {
                        *sample = (rng.f32() * 2.0 - 1.0) * segment.amplitude;
                    }
                    if !sink.push(&block) {
                        return;
                    }
                    std::thread::sleep(Duration::from_secs_f32(block_secs));
                }
            }
        })?;
        log::info!("Synthetic audio started");
        Ok(())
    }

    fn stop(&mut self) {
        if self.worker.is_running() {
            self.worker.stop();
            log::info!("Synthetic audio stopped");
        }
    }
}

/// Default input device through cpal.
#[cfg(feature = "microphone")]
#[derive(Default)]
pub struct Microphone {
    stream: Option<cpal::Stream>,
}

#[cfg(feature = "microphone")]
impl Microphone {
    pub fn new() -> Self {
        Self { stream: None }
    }
}

#[cfg(feature = "microphone")]
impl Source for Microphone {
    fn name(&self) -> &'static str {
        "microphone"
    }

    fn start(&mut self, events: Sender<InputEvent>) -> Result<(), SourceError> {
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

        if self.stream.is_some() {
            return Err(SourceError::AlreadyRunning);
        }
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| SourceError::DeviceUnavailable("no input device".into()))?;
        let supported = device
            .default_input_config()
            .map_err(|e| SourceError::DeviceUnavailable(e.to_string()))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(SourceError::DeviceUnavailable(format!(
                "unsupported sample format {:?}",
                supported.sample_format()
            )));
        }
        let config: cpal::StreamConfig = supported.config();

        let mut sink = BlockSink::new(events);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    sink.push(data);
                },
                |err| log::warn!("Microphone stream error: {err}"),
                None,
            )
            .map_err(|e| SourceError::Stream(e.to_string()))?;
        stream
            .play()
            .map_err(|e| SourceError::Stream(e.to_string()))?;
        self.stream = Some(stream);
        log::info!(
            "Microphone started: {}",
            device.name().unwrap_or_else(|_| "unknown".into())
        );
        Ok(())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Microphone stopped");
        }
    }
}
