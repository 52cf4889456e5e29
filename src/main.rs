use std::path::PathBuf;

use clap::Parser;

use crate::config::VerseConfig;
use crate::verse::VersePlayer;

mod config;
mod error;
mod event;
mod lyrics;
mod player;
mod verse;

/// Terminal music player with synchronized LRC lyrics.
#[derive(Parser, Debug)]
#[command(name = "verse", version, about)]
struct Args {
    /// Audio file to play (mp3, wav, flac or ogg)
    song: PathBuf,
    /// LRC lyrics file
    lyrics: PathBuf,
    /// Show whole lines at a time instead of revealing words progressively
    #[arg(long)]
    line_sync: bool,
    /// Override the playback poll interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Alternative config file (default: ~/.config/verse/config.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The TUI owns stdout, so diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = VerseConfig::load(args.config).await?;
    if args.line_sync {
        config.sync.word_level = false;
    }
    if let Some(ms) = args.interval_ms {
        config.sync.word_interval_ms = ms;
        config.sync.line_interval_ms = ms;
    }

    VersePlayer::new(args.song, args.lyrics, config).run().await
}
