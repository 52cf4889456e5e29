/// A single display instruction emitted by the frame scheduler and consumed
/// by a render backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Redraw from a blank screen: previous/current/next lyric context.
    FullContext {
        previous: Option<String>,
        current: String,
        next: Option<String>,
        position: f64,
        total_duration: f64,
    },
    /// Overwrite only the current-line region in place (word advance).
    IncrementalUpdate {
        current: String,
        position: f64,
        total_duration: f64,
    },
    /// Blank the lyric display.
    Clear,
    /// Display a failure and halt updates until the next `FullContext`.
    Error { message: String },
}

#[derive(Default, Debug, Clone)]
pub struct SongMetadata {
    pub title: String,
    /// Total duration in seconds, 0.0 when the decoder could not tell.
    pub duration: f64,
}
