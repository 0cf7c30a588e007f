//! Collaborator seam: capture components run on their own threads and hand
//! events to the frame driver through an [`EventBus`].

pub mod audio;
pub mod gaze;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use glam::Vec2;
use thiserror::Error;

use crate::population::Population;

/// Something a capture collaborator noticed.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// One audio block was above the noise threshold.
    Noise,
    /// One audio block was at or below the noise threshold.
    Silence,
    /// Leftmost face in `[-1, 1]²`, or `detected == false` when none.
    Face { position: Vec2, detected: bool },
    /// Every detected face, sorted left to right.
    Faces(Vec<Vec2>),
}

impl InputEvent {
    /// Deliver to the population at frame time `now`.
    pub fn apply(self, population: &mut Population, now: f64) {
        match self {
            InputEvent::Noise => population.on_noise(now),
            InputEvent::Silence => population.on_silence(now),
            InputEvent::Face { position, detected } => {
                population.on_face_update(position, detected)
            }
            InputEvent::Faces(_) => {}
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source is already running")]
    AlreadyRunning,
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("capture stream failed: {0}")]
    Stream(String),
    #[error("failed to spawn capture thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// A capture collaborator with an explicit lifecycle. Sources are constructed
/// and injected by the driver; nothing here is a process-wide singleton.
pub trait Source {
    fn name(&self) -> &'static str;
    fn start(&mut self, events: Sender<InputEvent>) -> Result<(), SourceError>;
    fn stop(&mut self);
}

/// Multi-producer queue that marshals capture-thread events onto the single
/// frame sequence.
pub struct EventBus {
    tx: Sender<InputEvent>,
    rx: Receiver<InputEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<InputEvent> {
        self.tx.clone()
    }

    /// Apply everything queued so far. Returns how many events were applied.
    pub fn drain_into(&self, population: &mut Population, now: f64) -> usize {
        let mut applied = 0;
        for event in self.rx.try_iter() {
            event.apply(population, now);
            applied += 1;
        }
        applied
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Background thread with a cooperative stop flag.
pub(crate) struct Worker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn idle() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn spawn<F>(&mut self, name: &str, body: F) -> Result<(), SourceError>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        if self.is_running() {
            return Err(SourceError::AlreadyRunning);
        }
        let stop = Arc::new(AtomicBool::new(false));
        self.stop = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(stop))?;
        self.handle = Some(handle);
        Ok(())
    }

    pub(crate) fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Capture thread panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
