use std::io::{self, Write};
use std::time::Duration;
use tracing::info;

use super::{format_local_time, DisplayRow, ScreenView, Scoreboard};

const RULE: &str = "============================================================";

fn row_text(row: &DisplayRow, with_date: bool) -> String {
    let date = if with_date {
        format!("{:<11} ", row.date_label)
    } else {
        String::new()
    };
    format!(
        "{}{}[{:>9}] {} - {}",
        row.marker(),
        date,
        row.state_label(),
        row.matchup,
        row.status
    )
}

/// Append one refresh worth of lines to `out`.
pub fn write_board(out: &mut impl Write, view: &ScreenView) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    match view.board {
        Some(board) => writeln!(
            out,
            "NHL Scores - {} (updated {})",
            board.date.format("%Y-%m-%d"),
            format_local_time(board.fetched_at, view.tz)
        )?,
        None => writeln!(out, "NHL Scores")?,
    }
    writeln!(out, "{}", RULE)?;

    let Some(board) = view.board else {
        writeln!(out, "data unavailable")?;
        return writeln!(out, "{}", RULE);
    };
    if view.error.is_some() {
        writeln!(
            out,
            "data unavailable, showing last update from {}",
            format_local_time(board.fetched_at, view.tz)
        )?;
    }

    writeln!(
        out,
        "Today's Games ({}) | {} games: {}",
        board.today.len(),
        view.team,
        board.favorite_today
    )?;
    if board.today.is_empty() {
        writeln!(out, "  No games scheduled today")?;
    }
    for row in &board.today {
        writeln!(out, "  {}", row_text(row, false))?;
    }

    writeln!(out, "Upcoming {} Games", view.team_name)?;
    if board.upcoming.is_empty() {
        writeln!(out, "  No upcoming {} games", view.team)?;
    }
    for row in &board.upcoming {
        writeln!(out, "  {}", row_text(row, true))?;
    }
    writeln!(out, "{}", RULE)
}

/// Fallback mode: print every refresh as scrolling text. Runs until the
/// process is killed, or for a single refresh with `once`.
pub async fn run_plain(
    scoreboard: &mut Scoreboard,
    out: &mut impl Write,
    interval: Duration,
    once: bool,
) -> anyhow::Result<()> {
    loop {
        let date = scoreboard.today();
        scoreboard.refresh(date).await;
        write_board(out, &scoreboard.view())?;
        out.flush()?;

        if once {
            return Ok(());
        }
        info!("Next update in {} seconds", interval.as_secs());
        tokio::time::sleep(interval).await;
    }
}
