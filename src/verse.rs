pub mod scheduler;
pub mod tui;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{ThemeConfiguration, VerseConfig};
use crate::error::VerseError;
use crate::event::{Frame, SongMetadata};
use crate::lyrics::LyricTrack;
use crate::player::{AudioPlayer, RodioPlayer};
use scheduler::{FrameScheduler, SyncMode};
use tui::TerminalUiBackend;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg"];

/// Snapshot of the session, refreshed once per poll tick. Never shared
/// across threads.
#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    pub current_position: f64,
    pub current_lyric: Option<String>,
    pub is_playing: bool,
    pub lyrics_loaded: bool,
    pub audio_loaded: bool,
}

/// A backend that consumes display frames. The terminal UI is the production
/// implementation; tests substitute a collecting fake.
#[async_trait::async_trait]
pub trait RenderBackend {
    async fn run_backend(
        self,
        meta: SongMetadata,
        theme: ThemeConfiguration,
        frames: flume::Receiver<Frame>,
        quit: flume::Sender<()>,
    ) -> anyhow::Result<()>;
}

/// Orchestrates one playback session: validates and loads the input files,
/// then runs the sync loop against the audio clock while a render backend
/// task draws the emitted frames.
pub struct VersePlayer {
    song_path: PathBuf,
    lyrics_path: PathBuf,
    config: VerseConfig,
    state: PlaybackState,
}

impl VersePlayer {
    pub fn new(song_path: PathBuf, lyrics_path: PathBuf, config: VerseConfig) -> Self {
        Self {
            song_path,
            lyrics_path,
            config,
            state: PlaybackState::default(),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        // File-level failures abort before any playback starts
        validate_file(&self.song_path, AUDIO_EXTENSIONS)?;
        validate_file(&self.lyrics_path, &["lrc"])?;

        let track = LyricTrack::load(&self.lyrics_path).await?;
        self.state.lyrics_loaded = true;

        let mut player = RodioPlayer::new()?;
        if !player.load(&self.song_path) {
            return Err(VerseError::Format(format!(
                "failed to load audio file {}",
                self.song_path.display()
            ))
            .into());
        }
        self.state.audio_loaded = true;

        self.run_session(track, &mut player, TerminalUiBackend).await
    }

    async fn run_session<P, B>(
        &mut self,
        track: LyricTrack,
        player: &mut P,
        backend: B,
    ) -> anyhow::Result<()>
    where
        P: AudioPlayer,
        B: RenderBackend + Send + 'static,
    {
        let meta = SongMetadata {
            title: song_title(&self.song_path),
            duration: player.duration(),
        };
        let mode = if self.config.sync.word_level {
            SyncMode::Word
        } else {
            SyncMode::Line
        };
        let interval = Duration::from_millis(match mode {
            SyncMode::Word => self.config.sync.word_interval_ms,
            SyncMode::Line => self.config.sync.line_interval_ms,
        });

        let mut scheduler = FrameScheduler::new(track, meta.duration, mode);
        let (frame_tx, frame_rx) = flume::unbounded();
        let (quit_tx, quit_rx) = flume::bounded(1);

        let theme = self.config.theme.clone();
        let backend_handler =
            tokio::task::spawn(backend.run_backend(meta, theme, frame_rx, quit_tx));

        player.play();
        self.state.is_playing = true;
        scheduler.start();

        let session = self
            .sync_loop(player, &mut scheduler, &frame_tx, &quit_rx, interval)
            .await;

        player.stop();
        self.state.is_playing = false;
        drop(frame_tx);
        backend_handler.await??;
        session
    }

    /// The steady state: poll clock -> query track -> decide frame ->
    /// render -> sleep, until the scheduler leaves `Playing`.
    async fn sync_loop<P: AudioPlayer>(
        &mut self,
        player: &mut P,
        scheduler: &mut FrameScheduler,
        frames: &flume::Sender<Frame>,
        quit: &flume::Receiver<()>,
        interval: Duration,
    ) -> anyhow::Result<()> {
        while scheduler.is_active() {
            if quit.try_recv().is_ok() {
                let frame = scheduler.cancel();
                let _ = frames.send(frame);
                break;
            }

            let position = player.position();
            let playing = player.is_playing();
            self.state.current_position = position;

            if let Some(frame) = scheduler.tick(position, playing) {
                if frames.send(frame).is_err() {
                    let _ = scheduler.fail("render backend disconnected");
                    return Err(VerseError::Playback("render backend disconnected".into()).into());
                }
            }
            self.state.current_lyric = scheduler.current_text().map(str::to_owned);

            if !scheduler.is_active() {
                break;
            }
            tokio::time::sleep(interval).await;
        }
        Ok(())
    }
}

fn validate_file(path: &Path, extensions: &[&str]) -> Result<(), VerseError> {
    let meta = std::fs::metadata(path).map_err(|e| VerseError::from_io(e, path))?;
    if meta.len() == 0 {
        return Err(VerseError::Format(format!("{} is empty", path.display())));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !extensions.contains(&ext.as_str()) {
        return Err(VerseError::Format(format!(
            "unsupported file extension {:?} for {} (expected one of {})",
            ext,
            path.display(),
            extensions.join(", ")
        )));
    }
    // Catches permission problems before playback starts
    std::fs::File::open(path).map_err(|e| VerseError::from_io(e, path))?;
    Ok(())
}

/// Human-readable song title from the audio file stem:
/// `never_gonna-give.mp3` becomes "Never Gonna Give".
fn song_title(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown");
    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::{Arc, Mutex};

    #[test]
    fn song_titles_come_from_the_file_stem() {
        assert_eq!(song_title(Path::new("songs/my_song.mp3")), "My Song");
        assert_eq!(song_title(Path::new("some-other track.wav")), "Some Other Track");
        assert_eq!(song_title(Path::new(".mp3")), "");
    }

    /// Replays a fixed sequence of clock readings, then reports stopped.
    struct ScriptedPlayer {
        script: Vec<f64>,
        cursor: Cell<usize>,
    }

    impl ScriptedPlayer {
        fn new(script: Vec<f64>) -> Self {
            Self {
                script,
                cursor: Cell::new(0),
            }
        }
    }

    impl AudioPlayer for ScriptedPlayer {
        fn load(&mut self, _path: &Path) -> bool {
            true
        }
        fn play(&mut self) {}
        fn stop(&mut self) {}
        fn position(&self) -> f64 {
            let i = self.cursor.get();
            self.cursor.set(i + 1);
            self.script
                .get(i)
                .or(self.script.last())
                .copied()
                .unwrap_or(0.0)
        }
        fn is_playing(&self) -> bool {
            self.cursor.get() <= self.script.len()
        }
        fn duration(&self) -> f64 {
            9.0
        }
    }

    #[derive(Clone)]
    struct CollectingBackend {
        frames: Arc<Mutex<Vec<Frame>>>,
    }

    #[async_trait::async_trait]
    impl RenderBackend for CollectingBackend {
        async fn run_backend(
            self,
            _meta: SongMetadata,
            _theme: ThemeConfiguration,
            frames: flume::Receiver<Frame>,
            _quit: flume::Sender<()>,
        ) -> anyhow::Result<()> {
            while let Ok(frame) = frames.recv_async().await {
                self.frames.lock().unwrap().push(frame);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn session_emits_the_expected_frame_sequence() {
        let mut config = VerseConfig::default();
        config.sync.word_interval_ms = 1;

        let mut verse = VersePlayer::new(
            PathBuf::from("songs/my_song.mp3"),
            PathBuf::from("songs/my_song.lrc"),
            config,
        );
        let track = LyricTrack::parse("[00:01.00]Hello world\n[00:05.00]Goodbye now");
        let mut player = ScriptedPlayer::new(vec![0.5, 1.0, 1.05, 3.5, 5.0]);
        let collected = Arc::new(Mutex::new(Vec::new()));
        let backend = CollectingBackend {
            frames: collected.clone(),
        };

        verse
            .run_session(track, &mut player, backend)
            .await
            .unwrap();

        let frames = collected.lock().unwrap();
        assert_eq!(frames.len(), 4);
        assert!(matches!(
            frames[0],
            Frame::FullContext { ref current, .. } if current == "Hello"
        ));
        assert!(matches!(
            frames[1],
            Frame::IncrementalUpdate { ref current, .. } if current == "Hello world"
        ));
        assert!(matches!(
            frames[2],
            Frame::FullContext { ref current, ref previous, .. }
                if current == "Goodbye" && previous.as_deref() == Some("Hello world")
        ));
        assert_eq!(frames[3], Frame::Clear);

        assert!(!verse.state.is_playing);
        assert_eq!(verse.state.current_lyric, None);
    }

    #[tokio::test]
    async fn lost_renderer_surfaces_a_playback_error() {
        let mut verse = VersePlayer::new(
            PathBuf::from("a.mp3"),
            PathBuf::from("a.lrc"),
            VerseConfig::default(),
        );
        let track = LyricTrack::parse("[00:01.00]Hello world");
        let mut player = ScriptedPlayer::new(vec![1.0, 2.0, 3.0]);

        /// Drops its frame receiver immediately.
        struct VanishingBackend;
        #[async_trait::async_trait]
        impl RenderBackend for VanishingBackend {
            async fn run_backend(
                self,
                _meta: SongMetadata,
                _theme: ThemeConfiguration,
                _frames: flume::Receiver<Frame>,
                _quit: flume::Sender<()>,
            ) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let err = verse
            .run_session(track, &mut player, VanishingBackend)
            .await
            .expect_err("renderer loss should be fatal");
        assert!(err.to_string().contains("render backend disconnected"));
    }

    #[test]
    fn validation_rejects_missing_and_misnamed_files() {
        assert!(matches!(
            validate_file(Path::new("/definitely/not/here.mp3"), AUDIO_EXTENSIONS),
            Err(VerseError::NotFound(_))
        ));

        let dir = std::env::temp_dir().join(format!("verse-validate-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let wrong_ext = dir.join("song.txt");
        std::fs::write(&wrong_ext, b"data").unwrap();
        assert!(matches!(
            validate_file(&wrong_ext, AUDIO_EXTENSIONS),
            Err(VerseError::Format(_))
        ));

        let empty = dir.join("empty.mp3");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            validate_file(&empty, AUDIO_EXTENSIONS),
            Err(VerseError::Format(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
