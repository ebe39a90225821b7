//! Terminal bench panel.
//!
//! Stands in for the serial terminal and the oscilloscope: every key typed
//! goes down the simulated serial line as one byte, and the panel shows the
//! tone table, the live timer registers and the log.

use std::io;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use keypiano_core::timer::{bits, compute_threshold, CompareTimer};
use keypiano_core::{GeneratorState, ToneGenerator, TONE_TABLE};
use log::{Level, LevelFilter, Metadata, Record};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};

use crate::buzzer::SharedTimer;
use crate::serial::ChannelLine;

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

trait LevelExt {
    fn color(&self) -> Color;
    fn prefix(&self) -> &str;
}

impl LevelExt for Level {
    fn color(&self) -> Color {
        match *self {
            Level::Error => Color::Red,
            Level::Warn => Color::Yellow,
            Level::Info => Color::Cyan,
            Level::Debug => Color::Gray,
            Level::Trace => Color::DarkGray,
        }
    }

    fn prefix(&self) -> &str {
        match *self {
            Level::Error => "[ERROR]",
            Level::Warn => "[WARN] ",
            Level::Info => "[INFO] ",
            Level::Debug => "[DEBUG]",
            Level::Trace => "[TRACE]",
        }
    }
}

enum TuiMessage {
    Log(LogEntry),
    Shutdown,
}

struct TuiState {
    timer: SharedTimer,
    line: ChannelLine,
    logs: Vec<LogEntry>,
    rx: Receiver<TuiMessage>,
    max_logs: usize,
    last_key: Option<u8>,
    overruns: u32,
    should_quit: bool,
}

impl TuiState {
    fn new(timer: SharedTimer, line: ChannelLine, rx: Receiver<TuiMessage>) -> Self {
        Self {
            timer,
            line,
            logs: Vec::new(),
            rx,
            max_logs: 100,
            last_key: None,
            overruns: 0,
            should_quit: false,
        }
    }

    fn collect_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                TuiMessage::Log(log) => {
                    self.logs.push(log);
                    if self.logs.len() > self.max_logs {
                        self.logs.remove(0);
                    }
                }
                TuiMessage::Shutdown => {
                    self.should_quit = true;
                }
            }
        }
    }

    fn key_typed(&mut self, byte: u8) {
        self.last_key = Some(byte);
        if !self.line.send(byte) {
            self.overruns += 1;
        }
    }

    fn timer_snapshot(&self) -> CompareTimer {
        match self.timer.lock() {
            Ok(timer) => timer.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

// Forwards log records into the panel
pub struct TuiLogger {
    tx: Sender<TuiMessage>,
}

impl log::Log for TuiLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let entry = LogEntry {
                level: record.level(),
                message: format!("{}", record.args()),
            };
            // panel may already be gone
            let _ = self.tx.send(TuiMessage::Log(entry));
        }
    }

    fn flush(&self) {}
}

/// Handle to the panel thread. Dropping it closes the panel.
pub struct BenchTui {
    tx: Sender<TuiMessage>,
    handle: Option<JoinHandle<()>>,
}

impl BenchTui {
    /// Start the panel. Keys typed in it are sent down `line`; the line is
    /// closed when the panel quits (Esc or Ctrl+C).
    pub fn new(timer: SharedTimer, line: ChannelLine) -> Result<Self, anyhow::Error> {
        let (tx, rx) = channel();

        let logger = TuiLogger { tx: tx.clone() };
        if log::set_boxed_logger(Box::new(logger)).is_ok() {
            log::set_max_level(LevelFilter::Debug);
        }

        let handle = thread::Builder::new()
            .name("bench_tui".to_string())
            .spawn(move || {
                if let Err(e) = run_tui(TuiState::new(timer, line, rx)) {
                    eprintln!("TUI error: {}", e);
                }
            })?;

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    pub fn shutdown(&mut self) {
        let _ = self.tx.send(TuiMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BenchTui {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_tui(mut state: TuiState) -> Result<(), io::Error> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    state.logs.push(LogEntry {
        level: Level::Info,
        message: "bench started, type on the home row".to_string(),
    });

    let result = event_loop(&mut terminal, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut TuiState,
) -> Result<(), io::Error> {
    loop {
        state.collect_messages();
        if state.should_quit {
            return Ok(());
        }

        terminal.draw(|f| ui(f, state))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Esc => return Ok(()),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                log::info!("Ctrl+C pressed, closing the line");
                return Ok(());
            }
            KeyCode::Char(c) if c.is_ascii() => state.key_typed(c as u8),
            KeyCode::Enter => state.key_typed(b'\r'),
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, state: &TuiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Title
            Constraint::Length(10), // Table + timer
            Constraint::Min(6),     // Logs
            Constraint::Length(3),  // Help
        ])
        .split(f.area());

    let title = Paragraph::new("keypiano bench (57600 8N1, 16 MHz timer model)")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, rows[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let timer = state.timer_snapshot();
    render_table(f, middle[0], &timer);
    render_timer(f, middle[1], &timer, state);
    render_logs(f, rows[2], state);

    let help = Paragraph::new("a s d f j k l ; : play | other keys: silent | Esc/Ctrl+C: quit")
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, rows[3]);
}

fn render_table(f: &mut Frame, area: Rect, timer: &CompareTimer) {
    let items: Vec<ListItem> = TONE_TABLE
        .iter()
        .map(|entry| {
            let playing = timer.state() == GeneratorState::Running(entry.frequency);
            let style = if playing {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::styled(
                format!(
                    " {}  {:<3}  {:>3}.{} Hz  OCR={}",
                    entry.symbol as char,
                    entry.note.name(),
                    entry.frequency / 10,
                    entry.frequency % 10,
                    compute_threshold(entry.frequency)
                ),
                style,
            ))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(list, area);
}

fn render_timer(f: &mut Frame, area: Rect, timer: &CompareTimer, state: &TuiState) {
    let regs = timer.registers();

    let status = match timer.state() {
        GeneratorState::Stopped => Span::styled("STOPPED", Style::default().fg(Color::DarkGray)),
        GeneratorState::Running(frequency) => Span::styled(
            format!("RUNNING {}.{} Hz", frequency / 10, frequency % 10),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
    };
    let pin = match timer.output_frequency() {
        Some(output) => format!("{}.{} Hz", output / 10, output % 10),
        None => format!("held {}", if timer.output_high() { "high" } else { "low" }),
    };
    let last_key = match state.last_key {
        Some(byte) if byte.is_ascii_graphic() => format!("'{}'", byte as char),
        Some(byte) => format!("{:#04x}", byte),
        None => "-".to_string(),
    };

    let lines = vec![
        Line::from(vec![Span::raw("state  "), status]),
        Line::raw(format!("OCRA   {}", regs.ocra)),
        Line::raw(format!("TCCRA  {:08b}", regs.tccra)),
        Line::raw(format!(
            "TCCRB  {:08b} (CS {:03b})",
            regs.tccrb,
            regs.tccrb & bits::CS_MASK
        )),
        Line::raw(format!("pin    {}", pin)),
        Line::raw(format!("last   {}  overruns {}", last_key, state.overruns)),
    ];

    let panel =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Timer"));
    f.render_widget(panel, area);
}

fn render_logs(f: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Logs (scrolls automatically)");

    let inner = block.inner(area);
    f.render_widget(block, area);

    let max_logs = inner.height as usize;
    let start_idx = state.logs.len().saturating_sub(max_logs);

    let log_items: Vec<ListItem> = state.logs[start_idx..]
        .iter()
        .map(|log| {
            let content = Line::from(vec![
                Span::styled(log.level.prefix(), Style::default().fg(log.level.color())),
                Span::raw(" "),
                Span::raw(&log.message),
            ]);
            ListItem::new(content)
        })
        .collect();

    f.render_widget(List::new(log_items), inner);
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::serial::channel_serial;

    fn bench_state(timer: SharedTimer) -> TuiState {
        let (line, _serial) = channel_serial();
        let (_tx, rx) = channel();
        TuiState::new(timer, line, rx)
    }

    fn render_timer_text(timer: &CompareTimer, state: &TuiState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();
        terminal
            .draw(|f| render_timer(f, f.area(), timer, state))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_timer_panel_running() {
        let timer = SharedTimer::default();
        let state = bench_state(timer.clone());
        timer.lock().unwrap().set_frequency_and_start(4400).unwrap();

        let text = render_timer_text(&state.timer_snapshot(), &state);
        assert!(text.contains("RUNNING 440.0 Hz"));
        assert!(text.contains("OCRA   34"));
        assert!(text.contains("pin    892.8 Hz"));
    }

    #[test]
    fn test_timer_panel_shows_held_level() {
        let timer = SharedTimer::default();
        let state = bench_state(timer.clone());
        {
            let mut model = timer.lock().unwrap();
            model.set_frequency_and_start(4400).unwrap();
            model.advance(35);
            model.stop().unwrap();
        }

        let text = render_timer_text(&state.timer_snapshot(), &state);
        assert!(text.contains("STOPPED"));
        assert!(text.contains("pin    held high"));
    }

    #[test]
    fn test_keys_past_fifo_count_as_overruns() {
        let (line, _serial) = channel_serial();
        let (_tx, rx) = channel();
        let mut state = TuiState::new(SharedTimer::default(), line, rx);

        for byte in b"asd" {
            state.key_typed(*byte);
        }
        assert_eq!(state.last_key, Some(b'd'));
        assert_eq!(state.overruns, 1);
    }
}
