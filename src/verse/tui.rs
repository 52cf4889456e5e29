use std::{io::Stdout, time::Duration};

use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Style, Stylize},
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Terminal,
};

use super::RenderBackend;
use crate::config::ThemeConfiguration;
use crate::event::{Frame, SongMetadata};

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Renders frames into the terminal with ratatui. Runs in raw mode on the
/// alternate screen; both are restored on every exit path, so an aborted
/// session never leaves the terminal partially drawn.
#[derive(Debug, Clone, Copy)]
pub struct TerminalUiBackend;

#[async_trait::async_trait]
impl RenderBackend for TerminalUiBackend {
    async fn run_backend(
        self,
        meta: SongMetadata,
        theme: ThemeConfiguration,
        frames: flume::Receiver<Frame>,
        quit: flume::Sender<()>,
    ) -> anyhow::Result<()> {
        let mut terminal = setup_terminal()?;
        let result = ui_loop(&mut terminal, &meta, &theme, frames, quit).await;
        restore_terminal(&mut terminal)?;
        result
    }
}

/// What is currently on screen, folded from the frames applied so far.
#[derive(Debug, Clone, Default)]
struct DisplayState {
    previous: Option<String>,
    current: Option<String>,
    next: Option<String>,
    position: f64,
    total_duration: f64,
    error: Option<String>,
    /// Set by an error frame; only a full-context redraw resumes updates.
    halted: bool,
}

impl DisplayState {
    fn apply(&mut self, frame: Frame) {
        match frame {
            Frame::FullContext {
                previous,
                current,
                next,
                position,
                total_duration,
            } => {
                *self = DisplayState {
                    previous,
                    current: Some(current),
                    next,
                    position,
                    total_duration,
                    error: None,
                    halted: false,
                };
            }
            Frame::IncrementalUpdate {
                current,
                position,
                total_duration,
            } if !self.halted => {
                self.current = Some(current);
                self.position = position;
                self.total_duration = total_duration;
            }
            Frame::Clear if !self.halted => {
                self.previous = None;
                self.current = None;
                self.next = None;
            }
            Frame::Error { message } => {
                self.error = Some(message);
                self.halted = true;
            }
            _ => {}
        }
    }
}

async fn ui_loop(
    terminal: &mut Term,
    meta: &SongMetadata,
    theme: &ThemeConfiguration,
    frames: flume::Receiver<Frame>,
    quit: flume::Sender<()>,
) -> anyhow::Result<()> {
    let mut view = DisplayState {
        total_duration: meta.duration,
        ..Default::default()
    };

    loop {
        terminal.draw(|f| draw_ui(f, meta, theme, &view))?;

        tokio::select! {
            frame = frames.recv_async() => match frame {
                Ok(frame) => view.apply(frame),
                // Sender dropped: the session is over
                Err(_) => break,
            },
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }
        while let Ok(frame) = frames.try_recv() {
            view.apply(frame);
        }

        if event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                let ctrl_c = key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                if key.code == KeyCode::Char('q') || ctrl_c {
                    let _ = quit.try_send(());
                }
            }
        }
    }
    Ok(())
}

fn draw_ui(
    f: &mut ratatui::Frame<CrosstermBackend<Stdout>>,
    meta: &SongMetadata,
    theme: &ThemeConfiguration,
    view: &DisplayState,
) {
    let size = f.size();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)].as_ref())
        .split(size);

    let block = Block::default()
        .title(Line::from(&meta.title as &str))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_color.0))
        .title_alignment(Alignment::Left);

    let error_text = view.error.as_ref().map(|message| format!("Error: {message}"));
    let mut lines: Vec<Line> = vec![Line::from("")];
    if let Some(message) = &error_text {
        lines.push(Line::from(message.as_str().red().bold()));
    } else {
        if let Some(previous) = &view.previous {
            lines.push(Line::from(previous.as_str().fg(theme.inactive_text_color.0)));
        }
        if let Some(current) = &view.current {
            lines.push(Line::from(
                current.as_str().fg(theme.active_text_color.0).bold(),
            ));
        }
        if let Some(next) = &view.next {
            lines.push(Line::from(next.as_str().fg(theme.inactive_text_color.0)));
        }
    }

    let lyrics = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .block(block);
    f.render_widget(lyrics, layout[0]);

    let ratio = if view.total_duration > 0.0 {
        (view.position / view.total_duration).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let label = format!(
        "{} / {}",
        fmt_duration(view.position),
        fmt_duration(view.total_duration)
    );
    let progress = Gauge::default()
        .gauge_style(Style::default().fg(theme.progress_bar_color.0))
        .ratio(ratio)
        .label(label);
    f.render_widget(progress, layout[1]);
}

fn fmt_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:0>2}:{:0>2}", total / 60, total % 60)
}

fn setup_terminal() -> anyhow::Result<Term> {
    let mut stdout = std::io::stdout();
    enable_raw_mode()?;
    crossterm::execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Term) -> anyhow::Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor().map_err(anyhow::Error::from)
}
