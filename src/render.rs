use crate::config::BandsConfig;
use crate::state::{HostState, Phase, SharedHostState};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Constraint;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::{Frame, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Good,
    Warn,
    Bad,
}

impl Band {
    fn color(self) -> Color {
        match self {
            Band::Good => Color::LightGreen,
            Band::Warn => Color::LightYellow,
            Band::Bad => Color::LightRed,
        }
    }
}

pub fn band_latency(latency_ms: Option<f64>, bands: &BandsConfig) -> Band {
    match latency_ms {
        Some(ms) if ms <= bands.latency_warn_ms => Band::Good,
        Some(ms) if ms <= bands.latency_bad_ms => Band::Warn,
        _ => Band::Bad,
    }
}

/// Bands the normalized reply ratio, independent of how many echoes a cycle
/// sends.
pub fn band_loss(received: u32, sent: u32, bands: &BandsConfig) -> Band {
    if sent == 0 {
        return Band::Bad;
    }
    let ratio = f64::from(received) / f64::from(sent);
    if ratio >= bands.loss_good_ratio {
        Band::Good
    } else if ratio >= bands.loss_warn_ratio {
        Band::Warn
    } else {
        Band::Bad
    }
}

/// 2xx is healthy; 404 and the 5xx class mean the service itself is broken;
/// everything else that still answered (1xx/3xx/other 4xx) is a warning.
pub fn band_http(status: Option<u16>) -> Band {
    match status {
        Some(code) if (200..300).contains(&code) => Band::Good,
        Some(404) => Band::Bad,
        Some(code) if code >= 500 => Band::Bad,
        Some(_) => Band::Warn,
        None => Band::Bad,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellValue {
    pub text: String,
    pub band: Option<Band>,
}

impl CellValue {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            band: None,
        }
    }

    fn banded(text: impl Into<String>, band: Band) -> Self {
        Self {
            text: text.into(),
            band: Some(band),
        }
    }

    fn error() -> Self {
        Self::banded("Error", Band::Bad)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusRow {
    pub host: String,
    pub ping: CellValue,
    pub loss: CellValue,
    pub http: CellValue,
    pub next_update: CellValue,
}

/// Formats one host snapshot into display cells. Pure so the banding and
/// countdown rules are testable without a terminal.
pub fn build_row(
    snapshot: &HostState,
    cooldown: Duration,
    now: Instant,
    spinner: &str,
    bands: &BandsConfig,
) -> StatusRow {
    if snapshot.phase == Phase::Pending {
        return StatusRow {
            host: snapshot.host.clone(),
            ping: CellValue::plain(spinner),
            loss: CellValue::plain(spinner),
            http: CellValue::plain(spinner),
            next_update: CellValue::plain(spinner),
        };
    }

    let ping = match snapshot.latency_ms {
        Some(ms) => CellValue::banded(format!("{ms:.1} ms"), band_latency(Some(ms), bands)),
        None => CellValue::error(),
    };

    let loss = if snapshot.packets_sent > 0 {
        CellValue::banded(
            format!("{}/{}", snapshot.packets_received, snapshot.packets_sent),
            band_loss(snapshot.packets_received, snapshot.packets_sent, bands),
        )
    } else {
        CellValue::error()
    };

    let http = match snapshot.http_status {
        Some(code) => CellValue::banded(code.to_string(), band_http(Some(code))),
        None => CellValue::error(),
    };

    let next_update = if snapshot.probing {
        CellValue::plain(spinner)
    } else {
        let remaining = snapshot
            .last_updated
            .map_or(Duration::ZERO, |at| cooldown.saturating_sub(now - at));
        if remaining.is_zero() {
            CellValue::plain(spinner)
        } else {
            CellValue::plain(format!("{}s", remaining.as_secs()))
        }
    };

    StatusRow {
        host: snapshot.host.clone(),
        ping,
        loss,
        http,
        next_update,
    }
}

fn spinner_frame(tick: usize) -> &'static str {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub tick: Duration,
    pub cooldown: Duration,
    pub bands: BandsConfig,
}

/// Tick-driven renderer task. Owns the terminal for the whole run and always
/// restores it before returning, so the process never exits with the screen
/// in raw mode.
pub async fn run_renderer(
    states: Vec<SharedHostState>,
    settings: RenderSettings,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let mut terminal = setup_terminal()?;
    let result = render_loop(&mut terminal, &states, &settings, &mut shutdown).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn render_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    states: &[SharedHostState],
    settings: &RenderSettings,
    shutdown: &mut watch::Receiver<bool>,
) -> io::Result<()> {
    let mut ticker = tokio::time::interval(settings.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frame_count = 0_usize;

    loop {
        tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            _ = ticker.tick() => {}
        }

        if quit_requested()? {
            debug!("quit key pressed");
            return Ok(());
        }

        // One short read-lock scope per host; never blocks on a probe.
        let mut snapshots = Vec::with_capacity(states.len());
        for state in states {
            snapshots.push(state.read().await.clone());
        }

        let now = Instant::now();
        let spinner = spinner_frame(frame_count);
        let rows: Vec<StatusRow> = snapshots
            .iter()
            .map(|snapshot| build_row(snapshot, settings.cooldown, now, spinner, &settings.bands))
            .collect();

        terminal.draw(|frame| draw_table(frame, &rows))?;
        frame_count = frame_count.wrapping_add(1);
    }
}

/// Raw mode swallows SIGINT, so Ctrl+C arrives here as a key event; `q` and
/// `Esc` quit as well.
fn quit_requested() -> io::Result<bool> {
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(true)
                }
                _ => {}
            }
        }
    }
    Ok(false)
}

fn draw_table(frame: &mut Frame, rows: &[StatusRow]) {
    let header = Row::new(vec!["Hostname", "Ping", "Loss", "HTTP", "Next Update"])
        .style(Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD));

    let table_rows: Vec<Row> = rows.iter().map(to_table_row).collect();

    let widths = [
        Constraint::Min(24),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(18),
    ];

    let table = Table::new(table_rows, widths).header(header).block(
        Block::default()
            .title("Host Status")
            .borders(Borders::ALL),
    );

    frame.render_widget(table, frame.size());
}

fn to_table_row(row: &StatusRow) -> Row<'static> {
    Row::new(vec![
        Cell::from(row.host.clone()).style(Style::default().fg(Color::LightCyan)),
        styled_cell(&row.ping),
        styled_cell(&row.loss),
        styled_cell(&row.http),
        styled_cell(&row.next_update),
    ])
}

fn styled_cell(value: &CellValue) -> Cell<'static> {
    let cell = Cell::from(value.text.clone());
    match value.band {
        Some(band) => cell.style(Style::default().fg(band.color())),
        None => cell,
    }
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bands() -> BandsConfig {
        BandsConfig::default()
    }

    fn ok_snapshot(last_updated: Instant) -> HostState {
        HostState {
            host: "example.com".to_string(),
            latency_ms: Some(12.3),
            packets_sent: 3,
            packets_received: 3,
            http_status: Some(200),
            last_updated: Some(last_updated),
            phase: Phase::Ok,
            probing: false,
        }
    }

    #[test]
    fn latency_band_edges() {
        let bands = bands();
        assert_eq!(band_latency(Some(50.0), &bands), Band::Good);
        assert_eq!(band_latency(Some(50.1), &bands), Band::Warn);
        assert_eq!(band_latency(Some(100.0), &bands), Band::Warn);
        assert_eq!(band_latency(Some(100.1), &bands), Band::Bad);
        assert_eq!(band_latency(None, &bands), Band::Bad);
    }

    #[test]
    fn loss_band_uses_normalized_ratio() {
        let bands = bands();
        assert_eq!(band_loss(3, 3, &bands), Band::Good);
        assert_eq!(band_loss(2, 3, &bands), Band::Warn);
        assert_eq!(band_loss(1, 2, &bands), Band::Warn);
        assert_eq!(band_loss(1, 3, &bands), Band::Bad);
        assert_eq!(band_loss(0, 3, &bands), Band::Bad);
        assert_eq!(band_loss(0, 0, &bands), Band::Bad);
    }

    #[test]
    fn http_band_classes() {
        assert_eq!(band_http(Some(200)), Band::Good);
        assert_eq!(band_http(Some(204)), Band::Good);
        assert_eq!(band_http(Some(301)), Band::Warn);
        assert_eq!(band_http(Some(403)), Band::Warn);
        assert_eq!(band_http(Some(404)), Band::Bad);
        assert_eq!(band_http(Some(500)), Band::Bad);
        assert_eq!(band_http(Some(503)), Band::Bad);
        assert_eq!(band_http(None), Band::Bad);
    }

    #[test]
    fn pending_row_shows_spinner_everywhere() {
        let snapshot = HostState::new("example.com");
        let row = build_row(
            &snapshot,
            Duration::from_secs(15),
            Instant::now(),
            "⠋",
            &bands(),
        );
        assert_eq!(row.ping, CellValue::plain("⠋"));
        assert_eq!(row.loss, CellValue::plain("⠋"));
        assert_eq!(row.http, CellValue::plain("⠋"));
        assert_eq!(row.next_update, CellValue::plain("⠋"));
    }

    #[test]
    fn ok_row_formats_values_and_countdown() {
        let published = Instant::now();
        let now = published + Duration::from_secs(2);
        let row = build_row(
            &ok_snapshot(published),
            Duration::from_secs(5),
            now,
            "⠋",
            &bands(),
        );
        assert_eq!(row.ping, CellValue::banded("12.3 ms", Band::Good));
        assert_eq!(row.loss, CellValue::banded("3/3", Band::Good));
        assert_eq!(row.http, CellValue::banded("200", Band::Good));
        assert_eq!(row.next_update, CellValue::plain("3s"));
    }

    #[test]
    fn probing_row_shows_spinner_instead_of_countdown() {
        let published = Instant::now();
        let mut snapshot = ok_snapshot(published);
        snapshot.probing = true;
        let row = build_row(
            &snapshot,
            Duration::from_secs(5),
            published + Duration::from_secs(6),
            "⠙",
            &bands(),
        );
        assert_eq!(row.next_update, CellValue::plain("⠙"));
    }

    #[test]
    fn error_row_shows_placeholders() {
        let snapshot = HostState {
            host: "down.example".to_string(),
            latency_ms: None,
            packets_sent: 0,
            packets_received: 0,
            http_status: None,
            last_updated: Some(Instant::now()),
            phase: Phase::Error,
            probing: false,
        };
        let row = build_row(
            &snapshot,
            Duration::from_secs(15),
            Instant::now(),
            "⠋",
            &bands(),
        );
        assert_eq!(row.ping, CellValue::banded("Error", Band::Bad));
        assert_eq!(row.loss, CellValue::banded("Error", Band::Bad));
        assert_eq!(row.http, CellValue::banded("Error", Band::Bad));
    }

    #[test]
    fn partial_failure_keeps_measured_cells() {
        let published = Instant::now();
        let snapshot = HostState {
            host: "half.example".to_string(),
            latency_ms: Some(140.0),
            packets_sent: 3,
            packets_received: 3,
            http_status: None,
            last_updated: Some(published),
            phase: Phase::Error,
            probing: false,
        };
        let row = build_row(
            &snapshot,
            Duration::from_secs(15),
            published,
            "⠋",
            &bands(),
        );
        assert_eq!(row.ping, CellValue::banded("140.0 ms", Band::Bad));
        assert_eq!(row.http, CellValue::banded("Error", Band::Bad));
    }

    #[test]
    fn spinner_frames_wrap() {
        assert_eq!(spinner_frame(0), spinner_frame(SPINNER_FRAMES.len()));
        assert_ne!(spinner_frame(0), spinner_frame(1));
    }
}
