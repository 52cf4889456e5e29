use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::VerseError;

/// Capability interface over the audio collaborator. Playback itself runs on
/// the audio backend's own thread; this surface only loads, starts, stops
/// and reads the clock.
pub trait AudioPlayer {
    /// Loads an audio file. Returns false on any failure instead of
    /// propagating an error.
    fn load(&mut self, path: &Path) -> bool;
    /// Idempotent.
    fn play(&mut self);
    /// Idempotent.
    fn stop(&mut self);
    /// Current playback position in seconds, monotonic non-decreasing while
    /// playing.
    fn position(&self) -> f64;
    fn is_playing(&self) -> bool;
    /// Total duration in seconds, 0.0 if the decoder could not determine it.
    fn duration(&self) -> f64;
}

/// Audio playback through rodio's default output stream.
pub struct RodioPlayer {
    stream: OutputStream,
    sink: Option<Sink>,
    duration: Duration,
}

impl RodioPlayer {
    pub fn new() -> Result<Self, VerseError> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| VerseError::Playback(format!("failed to open audio output: {e}")))?;
        Ok(Self {
            stream,
            sink: None,
            duration: Duration::ZERO,
        })
    }
}

impl AudioPlayer for RodioPlayer {
    fn load(&mut self, path: &Path) -> bool {
        self.stop();

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("failed to open {}: {e}", path.display());
                return false;
            }
        };
        let source = match Decoder::new(BufReader::new(file)) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!("failed to decode {}: {e}", path.display());
                return false;
            }
        };

        self.duration = source.total_duration().unwrap_or(Duration::ZERO);

        let sink = Sink::connect_new(self.stream.mixer());
        sink.append(source);
        // Paused until an explicit play()
        sink.pause();
        self.sink = Some(sink);

        tracing::debug!("loaded {}, duration {:?}", path.display(), self.duration);
        true
    }

    fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn position(&self) -> f64 {
        self.sink
            .as_ref()
            .map(|sink| sink.get_pos().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn is_playing(&self) -> bool {
        self.sink
            .as_ref()
            .map(|sink| !sink.empty() && !sink.is_paused())
            .unwrap_or(false)
    }

    fn duration(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}
