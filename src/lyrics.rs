use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::VerseError;

/// Display time given to the last line of a track, which has no successor to
/// bound it.
const LAST_LINE_DURATION: f64 = 4.0;

lazy_static! {
    /// `[mm:ss]text` or `[mm:ss.cc]text`: mm is 1-2 digits, ss exactly 2,
    /// centiseconds optional but exactly 2 when present.
    static ref TIMESTAMP_RE: Regex =
        Regex::new(r"^\[(\d{1,2}):(\d{2})(?:\.(\d{2}))?\](.*)$").expect("valid timestamp pattern");
}

/// One timestamped lyric entry. Immutable once the owning track has derived
/// word timing.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    /// Seconds from the start of the song, never negative.
    pub timestamp: f64,
    /// May be empty: such lines carry timing only (instrumental gaps).
    pub text: String,
    /// Derived word timing, empty for empty-text lines.
    pub words: Vec<LyricWord>,
}

impl LyricLine {
    pub fn new(timestamp: f64, text: impl Into<String>) -> Result<Self, VerseError> {
        if timestamp < 0.0 {
            return Err(VerseError::Format(format!(
                "negative lyric timestamp: {timestamp}"
            )));
        }
        Ok(Self {
            timestamp,
            text: text.into(),
            words: Vec::new(),
        })
    }
}

/// One word within a line, synthesized by [`LyricTrack::parse`]. The word's
/// timestamp is the instant it becomes visible.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricWord {
    pub timestamp: f64,
    pub text: String,
    /// Position of the owning line within the track.
    pub line_index: usize,
}

/// Previous/current/next lyric texts around one playback instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LyricContext<'a> {
    pub previous: Option<&'a str>,
    pub current: Option<&'a str>,
    pub next: Option<&'a str>,
}

/// An ordered, queryable lyric timeline. Lines are sorted ascending by
/// timestamp (stable, so file order breaks ties) and never mutated after
/// construction; every query is a pure function of `(track, timestamp)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricTrack {
    lines: Vec<LyricLine>,
}

impl LyricTrack {
    /// Reads and parses an LRC file. File-level failures (missing file,
    /// permissions, non-UTF-8 content) are fatal; malformed lines are not.
    pub async fn load(path: &Path) -> Result<Self, VerseError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| VerseError::from_io(e, path))?;
        let src = String::from_utf8(bytes).map_err(|_| {
            VerseError::Format(format!("{} is not valid UTF-8 text", path.display()))
        })?;
        Ok(Self::parse(&src))
    }

    /// Parses LRC source text. Lines that do not carry a timestamp are
    /// metadata and skipped silently; lines with out-of-range timestamp
    /// components are warned about and skipped. No line ever aborts the
    /// whole parse.
    pub fn parse(src: &str) -> Self {
        let mut lines = Vec::new();

        for (line_number, raw) in src.lines().enumerate() {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let Some(caps) = TIMESTAMP_RE.captures(raw) else {
                // Metadata such as [ar:Artist] or [ti:Title]
                continue;
            };

            // The regex only admits digit runs of bounded length, so these
            // cannot fail to parse.
            let minutes: u32 = caps[1].parse().unwrap_or(0);
            let seconds: u32 = caps[2].parse().unwrap_or(0);
            let centis: u32 = caps
                .get(3)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);

            if seconds >= 60 || centis >= 100 {
                tracing::warn!(
                    line = line_number + 1,
                    "invalid timestamp in lyric line: {raw}"
                );
                continue;
            }

            let timestamp =
                f64::from(minutes) * 60.0 + f64::from(seconds) + f64::from(centis) / 100.0;
            match LyricLine::new(timestamp, caps[4].trim()) {
                Ok(line) => lines.push(line),
                Err(e) => {
                    tracing::warn!(line = line_number + 1, "skipping lyric line: {e}");
                }
            }
        }

        // Stable: lines sharing a timestamp keep their file order.
        lines.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        derive_word_timing(&mut lines);

        Self { lines }
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the last line whose timestamp is at or before `t`, or `None`
    /// before the first line (and for empty tracks).
    pub fn current_line_index(&self, t: f64) -> Option<usize> {
        match self.lines.partition_point(|line| line.timestamp <= t) {
            0 => None,
            idx => Some(idx - 1),
        }
    }

    pub fn current_line_text(&self, t: f64) -> Option<&str> {
        self.current_line_index(t)
            .map(|idx| self.lines[idx].text.as_str())
    }

    /// All words of the current line visible at `t`, joined by single
    /// spaces. Falls back to the full line text when the line derived no
    /// words; `None` when no line is active.
    pub fn current_word_accumulated(&self, t: f64) -> Option<String> {
        let line = &self.lines[self.current_line_index(t)?];
        if line.words.is_empty() {
            return Some(line.text.clone());
        }
        match line.words.partition_point(|w| w.timestamp <= t) {
            0 => None,
            visible => Some(
                line.words[..visible]
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }

    /// Only the most recently revealed word of the current line, for strict
    /// one-word-at-a-time display modes.
    pub fn current_word_only(&self, t: f64) -> Option<&str> {
        let line = &self.lines[self.current_line_index(t)?];
        if line.words.is_empty() {
            return Some(line.text.as_str());
        }
        match line.words.partition_point(|w| w.timestamp <= t) {
            0 => None,
            visible => Some(line.words[visible - 1].text.as_str()),
        }
    }

    /// The texts surrounding the current line at `t`.
    pub fn context(&self, t: f64) -> LyricContext<'_> {
        let Some(idx) = self.current_line_index(t) else {
            return LyricContext {
                previous: None,
                current: None,
                next: None,
            };
        };
        LyricContext {
            previous: idx
                .checked_sub(1)
                .map(|prev| self.lines[prev].text.as_str()),
            current: Some(self.lines[idx].text.as_str()),
            next: self.lines.get(idx + 1).map(|line| line.text.as_str()),
        }
    }
}

/// Distributes each line's words evenly across its active duration: word `k`
/// of `n` appears at `start + k * duration / n`. A uniform approximation by
/// policy; it does not model speech rhythm.
fn derive_word_timing(lines: &mut [LyricLine]) {
    for i in 0..lines.len() {
        let start = lines[i].timestamp;
        let duration = match lines.get(i + 1) {
            Some(next) => next.timestamp - start,
            None => LAST_LINE_DURATION,
        };

        let tokens: Vec<String> = lines[i]
            .text
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        if tokens.is_empty() {
            continue;
        }

        let step = duration / tokens.len() as f64;
        lines[i].words = tokens
            .into_iter()
            .enumerate()
            .map(|(k, text)| LyricWord {
                timestamp: start + k as f64 * step,
                text,
                line_index: i,
            })
            .collect();
    }
}
