use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{format_local_time, DisplayRow, RowStyle, ScreenView, Scoreboard, UPCOMING_LIMIT};
use crate::error::DisplayInitError;

/// How often the wait loop checks for a quit key.
pub const QUIT_POLL: Duration = Duration::from_millis(100);

const LIVE_COLOR: Color = Color::Rgb(0, 220, 90);
const SCHEDULED_COLOR: Color = Color::Rgb(255, 140, 0);
const FINAL_COLOR: Color = Color::Gray;
const FAVORITE_COLOR: Color = Color::Rgb(247, 73, 2);
const HEADER_COLOR: Color = Color::White;
const ERROR_COLOR: Color = Color::Rgb(255, 80, 80);

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Quit,
}

/// Something that can report a quit request within a bounded wait.
pub trait QuitSource {
    /// Wait up to `timeout` for input; `true` if the user asked to quit.
    fn poll_quit(&mut self, timeout: Duration) -> io::Result<bool>;
}

/// Keyboard input through crossterm.
pub struct CrosstermKeys;

impl QuitSource for CrosstermKeys {
    fn poll_quit(&mut self, timeout: Duration) -> io::Result<bool> {
        if !event::poll(timeout)? {
            return Ok(false);
        }
        match event::read()? {
            // Windows reports both press and release
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(is_quit_key(&key)),
            _ => Ok(false),
        }
    }
}

pub fn is_quit_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Sleep until `interval` has elapsed or a quit key arrives, whichever comes
/// first. Input is sampled every [`QUIT_POLL`]; `on_tick` runs each time the
/// whole-second countdown changes so the status line can be redrawn.
pub fn wait_for_refresh<Q, F>(interval: Duration, quit: &mut Q, mut on_tick: F) -> io::Result<WaitOutcome>
where
    Q: QuitSource + ?Sized,
    F: FnMut(Duration) -> io::Result<()>,
{
    let deadline = Instant::now() + interval;
    let mut shown_secs = interval.as_secs();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(WaitOutcome::Elapsed);
        }
        if quit.poll_quit(remaining.min(QUIT_POLL))? {
            return Ok(WaitOutcome::Quit);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.as_secs() != shown_secs {
            shown_secs = remaining.as_secs();
            on_tick(remaining)?;
        }
    }
}

pub fn init_terminal() -> Result<Tui, DisplayInitError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }
    match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => Ok(terminal),
        Err(e) => {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            let _ = disable_raw_mode();
            Err(e.into())
        }
    }
}

pub fn restore_terminal(terminal: &mut Tui) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

/// Interactive mode: repaint the screen every `interval` until the user quits.
/// The terminal is restored whatever the loop returns.
pub async fn run_interactive(scoreboard: &mut Scoreboard, interval: Duration) -> anyhow::Result<()> {
    let mut terminal = init_terminal()?;
    let res = event_loop(&mut terminal, scoreboard, interval, &mut CrosstermKeys).await;
    if let Err(e) = restore_terminal(&mut terminal) {
        warn!("Failed to restore terminal: {}", e);
    }
    res
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    scoreboard: &mut Scoreboard,
    interval: Duration,
    keys: &mut dyn QuitSource,
) -> anyhow::Result<()> {
    loop {
        let date = scoreboard.today();
        scoreboard.refresh(date).await;
        terminal.draw(|f| draw(f, &scoreboard.view(), interval))?;

        let outcome = wait_for_refresh(interval, keys, |remaining| {
            terminal
                .draw(|f| draw(f, &scoreboard.view(), remaining))
                .map(|_| ())
        })?;

        if outcome == WaitOutcome::Quit {
            info!("Quit requested");
            return Ok(());
        }
    }
}

fn row_style(row: &DisplayRow) -> Style {
    let base = match row.style {
        RowStyle::Active => Style::default().fg(LIVE_COLOR).add_modifier(Modifier::BOLD),
        RowStyle::Pending => Style::default().fg(SCHEDULED_COLOR),
        RowStyle::Neutral => Style::default().fg(FINAL_COLOR),
    };
    if row.favorite {
        base.add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        base
    }
}

fn row_line(row: &DisplayRow, with_date: bool) -> Line<'static> {
    let style = row_style(row);
    let mut spans = vec![Span::styled(
        row.marker(),
        Style::default().fg(FAVORITE_COLOR).add_modifier(Modifier::BOLD),
    )];
    if with_date {
        spans.push(Span::styled(format!("{:<11} ", row.date_label), style));
    }
    spans.push(Span::styled(format!("[{:>9}] ", row.state_label()), style));
    spans.push(Span::styled(format!("{:<16} ", row.matchup), style));
    spans.push(Span::styled(row.status.clone(), style));
    Line::from(spans)
}

fn placeholder(text: String, color: Color) -> ListItem<'static> {
    ListItem::new(Line::from(Span::styled(text, Style::default().fg(color))))
}

fn panel(title: String, border: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(title, Style::default().fg(border).add_modifier(Modifier::BOLD)))
}

pub fn draw(f: &mut Frame, view: &ScreenView, countdown: Duration) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(5),
            Constraint::Length(UPCOMING_LIMIT as u16 + 2),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, view, chunks[0]);
    draw_today(f, view, chunks[1]);
    draw_upcoming(f, view, chunks[2]);
    draw_status(f, countdown, chunks[3]);
}

fn draw_header(f: &mut Frame, view: &ScreenView, area: Rect) {
    let title = match view.board {
        Some(board) => format!(
            "NHL SCORES & SCHEDULE  {}  (updated {})",
            board.date.format("%a %b %-d, %Y"),
            format_local_time(board.fetched_at, view.tz)
        ),
        None => "NHL SCORES & SCHEDULE".to_string(),
    };
    let mut lines = vec![Line::from(Span::styled(
        title,
        Style::default().fg(HEADER_COLOR).add_modifier(Modifier::BOLD),
    ))];
    if view.error.is_some() {
        let notice = match view.board {
            Some(board) => format!(
                "data unavailable, showing last update from {}",
                format_local_time(board.fetched_at, view.tz)
            ),
            None => "data unavailable".to_string(),
        };
        lines.push(Line::from(Span::styled(notice, Style::default().fg(ERROR_COLOR))));
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_today(f: &mut Frame, view: &ScreenView, area: Rect) {
    let (title, items) = match view.board {
        Some(board) => {
            let title = format!(
                " Today's Games ({}) | {} games: {} ",
                board.today.len(),
                view.team,
                board.favorite_today
            );
            let items: Vec<ListItem> = if board.today.is_empty() {
                vec![placeholder("No games scheduled today".to_string(), FINAL_COLOR)]
            } else {
                board.today.iter().map(|r| ListItem::new(row_line(r, false))).collect()
            };
            (title, items)
        }
        None => (
            " Today's Games ".to_string(),
            vec![placeholder("data unavailable".to_string(), ERROR_COLOR)],
        ),
    };
    f.render_widget(List::new(items).block(panel(title, HEADER_COLOR)), area);
}

fn draw_upcoming(f: &mut Frame, view: &ScreenView, area: Rect) {
    let title = format!(" Upcoming {} Games ", view.team_name);
    let items: Vec<ListItem> = match view.board {
        Some(board) if !board.upcoming.is_empty() => board
            .upcoming
            .iter()
            .map(|r| ListItem::new(row_line(r, true)))
            .collect(),
        Some(_) => vec![placeholder(format!("No upcoming {} games", view.team), FINAL_COLOR)],
        None => vec![placeholder("data unavailable".to_string(), ERROR_COLOR)],
    };
    f.render_widget(List::new(items).block(panel(title, FAVORITE_COLOR)), area);
}

fn draw_status(f: &mut Frame, countdown: Duration, area: Rect) {
    let secs = countdown.as_secs();
    let line = Line::from(vec![
        Span::styled(
            format!(" Next refresh in {}:{:02}", secs / 60, secs % 60),
            Style::default().fg(HEADER_COLOR),
        ),
        Span::styled("  |  q / Esc to quit", Style::default().fg(FINAL_COLOR)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}
