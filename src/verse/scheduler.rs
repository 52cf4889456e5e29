use crate::event::Frame;
use crate::lyrics::LyricTrack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Whole lines appear at their timestamp.
    Line,
    /// Words within the current line are revealed progressively.
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Playing,
    Finished,
    Errored,
}

/// Decides, for each poll of the playback clock, whether the display needs a
/// full-context redraw, an in-place update of the current line, a clear, or
/// nothing. All of its state is explicit and fed through [`tick`], so the
/// policy is replayable in tests without a real clock.
///
/// [`tick`]: FrameScheduler::tick
#[derive(Debug)]
pub struct FrameScheduler {
    track: LyricTrack,
    total_duration: f64,
    mode: SyncMode,
    state: SchedulerState,
    last_line_index: Option<usize>,
    last_rendered: Option<String>,
}

impl FrameScheduler {
    pub fn new(track: LyricTrack, total_duration: f64, mode: SyncMode) -> Self {
        Self {
            track,
            total_duration,
            mode,
            state: SchedulerState::Idle,
            last_line_index: None,
            last_rendered: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SchedulerState::Playing
    }

    /// Text the display currently shows for the active line, if any.
    pub fn current_text(&self) -> Option<&str> {
        self.last_rendered.as_deref()
    }

    /// Idle -> Playing. Call once audio and lyrics both report loaded.
    pub fn start(&mut self) {
        if self.state == SchedulerState::Idle {
            self.state = SchedulerState::Playing;
        }
    }

    /// One poll of the playback clock. `playing == false` means the audio
    /// ended naturally and yields a final clear.
    pub fn tick(&mut self, position: f64, playing: bool) -> Option<Frame> {
        if self.state != SchedulerState::Playing {
            return None;
        }
        if !playing {
            self.state = SchedulerState::Finished;
            self.last_rendered = None;
            return Some(Frame::Clear);
        }

        let line_index = self.track.current_line_index(position);
        let current = match self.mode {
            SyncMode::Word => self.track.current_word_accumulated(position),
            SyncMode::Line => self.track.current_line_text(position).map(str::to_owned),
        };
        let line_changed = line_index != self.last_line_index && line_index.is_some();

        let frame = if line_changed {
            let ctx = self.track.context(position);
            Some(Frame::FullContext {
                previous: ctx.previous.map(str::to_owned),
                current: current.clone().unwrap_or_default(),
                next: ctx.next.map(str::to_owned),
                position,
                total_duration: self.total_duration,
            })
        } else if let Some(text) = &current {
            (self.last_rendered.as_deref() != Some(text)).then(|| Frame::IncrementalUpdate {
                current: text.clone(),
                position,
                total_duration: self.total_duration,
            })
        } else if self.last_rendered.is_some() {
            // Fell into a gap with no active line
            Some(Frame::Clear)
        } else {
            None
        };

        self.last_line_index = line_index;
        self.last_rendered = current;
        frame
    }

    /// User-initiated stop. Treated like the audio ending: the display is
    /// cleared and no further frames are produced.
    pub fn cancel(&mut self) -> Frame {
        self.state = SchedulerState::Finished;
        self.last_rendered = None;
        Frame::Clear
    }

    /// Fatal collaborator failure mid-session. No retry.
    pub fn fail(&mut self, message: impl Into<String>) -> Frame {
        self.state = SchedulerState::Errored;
        Frame::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> LyricTrack {
        LyricTrack::parse("[00:01.00]Hello world\n[00:05.00]Goodbye now")
    }

    fn word_scheduler() -> FrameScheduler {
        let mut scheduler = FrameScheduler::new(sample_track(), 9.0, SyncMode::Word);
        scheduler.start();
        scheduler
    }

    #[test]
    fn idle_scheduler_emits_nothing() {
        let mut scheduler = FrameScheduler::new(sample_track(), 9.0, SyncMode::Word);
        assert_eq!(scheduler.tick(1.0, true), None);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn full_context_on_each_line_change_and_incremental_within() {
        let mut scheduler = word_scheduler();

        // Before the first line: nothing on screen, nothing to clear
        assert_eq!(scheduler.tick(0.5, true), None);

        // First tick inside line 0: full redraw with the first word visible
        let frame = scheduler.tick(1.0, true).unwrap();
        assert_eq!(
            frame,
            Frame::FullContext {
                previous: None,
                current: "Hello".into(),
                next: Some("Goodbye now".into()),
                position: 1.0,
                total_duration: 9.0,
            }
        );

        // Same line, same visible words: no frame
        assert_eq!(scheduler.tick(1.05, true), None);

        // Second word revealed: in-place update
        assert_eq!(
            scheduler.tick(3.5, true).unwrap(),
            Frame::IncrementalUpdate {
                current: "Hello world".into(),
                position: 3.5,
                total_duration: 9.0,
            }
        );

        // New line: full redraw again
        let frame = scheduler.tick(5.0, true).unwrap();
        assert_eq!(
            frame,
            Frame::FullContext {
                previous: Some("Hello world".into()),
                current: "Goodbye".into(),
                next: None,
                position: 5.0,
                total_duration: 9.0,
            }
        );
    }

    #[test]
    fn line_mode_skips_word_updates() {
        let mut scheduler = FrameScheduler::new(sample_track(), 9.0, SyncMode::Line);
        scheduler.start();

        let frame = scheduler.tick(1.0, true).unwrap();
        assert!(matches!(
            frame,
            Frame::FullContext { ref current, .. } if current == "Hello world"
        ));
        // No word granularity: nothing changes until the next line
        assert_eq!(scheduler.tick(3.5, true), None);
        assert!(matches!(
            scheduler.tick(5.0, true).unwrap(),
            Frame::FullContext { .. }
        ));
    }

    #[test]
    fn clears_when_position_leaves_all_lines() {
        let mut scheduler = word_scheduler();
        scheduler.tick(1.0, true);
        // Non-monotonic query (replay): display cleared, once
        assert_eq!(scheduler.tick(0.5, true), Some(Frame::Clear));
        assert_eq!(scheduler.tick(0.6, true), None);
    }

    #[test]
    fn natural_end_clears_and_finishes() {
        let mut scheduler = word_scheduler();
        scheduler.tick(1.0, true);
        assert_eq!(scheduler.tick(8.0, false), Some(Frame::Clear));
        assert_eq!(scheduler.state(), SchedulerState::Finished);
        assert_eq!(scheduler.tick(8.1, true), None);
    }

    #[test]
    fn cancel_behaves_like_a_stop() {
        let mut scheduler = word_scheduler();
        scheduler.tick(1.0, true);
        assert_eq!(scheduler.cancel(), Frame::Clear);
        assert_eq!(scheduler.state(), SchedulerState::Finished);
        assert_eq!(scheduler.tick(2.0, true), None);
    }

    #[test]
    fn failure_is_terminal() {
        let mut scheduler = word_scheduler();
        let frame = scheduler.fail("audio device lost");
        assert_eq!(
            frame,
            Frame::Error {
                message: "audio device lost".into()
            }
        );
        assert_eq!(scheduler.state(), SchedulerState::Errored);
        assert_eq!(scheduler.tick(2.0, true), None);
    }
}
