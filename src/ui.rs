use crate::client::AppSnapshot;
use color_eyre::eyre::Result;
use crossterm::{
    event::{
        Event,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use crypto_wordle::{
    grading::Grade,
    session::{
        Phase,
        Status,
    },
};
use ethers::{
    types::U256,
    utils::format_ether,
};
use itertools::Itertools;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use unicode_width::UnicodeWidthStr;

/// Errors shown in the errors panel, newest last.
const VISIBLE_ERRORS: usize = 5;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UserEvent {
    Quit,
    Start,
    Submit(String),
    IncreaseDifficulty,
    RefreshBalance,
    Confirm(bool),
    Redraw,
}

#[derive(Default)]
pub struct UiState {
    mode: Mode,
    input: String,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
enum Mode {
    #[default]
    Normal,
    ConfirmModal {
        summary: String,
    },
    QuitModal,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

/// Shows the signature prompt for a pending transaction.
pub fn open_confirm(state: &mut UiState, summary: String) {
    if !matches!(state.mode, Mode::ConfirmModal { .. }) {
        state.mode = Mode::ConfirmModal { summary };
    }
}

/// Empties the input box once a guess has been accepted.
pub fn clear_input(state: &mut UiState) {
    state.input.clear();
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Maps a terminal event onto a user intent, updating modal and input state.
pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => interpret_key(state, key),
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn interpret_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }
    match &state.mode {
        Mode::ConfirmModal { .. } => {
            let approved = match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => true,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
                _ => return None,
            };
            state.mode = Mode::Normal;
            return Some(UserEvent::Confirm(approved));
        }
        Mode::QuitModal => {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Normal => {}
    }
    if ctrl {
        return match key.code {
            KeyCode::Char('n') => Some(UserEvent::Start),
            KeyCode::Char('d') => Some(UserEvent::IncreaseDifficulty),
            KeyCode::Char('r') => Some(UserEvent::RefreshBalance),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Enter => Some(UserEvent::Submit(state.input.clone())),
        KeyCode::Backspace => {
            state.input.pop();
            Some(UserEvent::Redraw)
        }
        KeyCode::Char(c) if !c.is_control() => {
            state.input.push(c);
            Some(UserEvent::Redraw)
        }
        _ => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let grid_rows = snap.session.initial_attempts().max(1) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),             // header
            Constraint::Length(grid_rows + 2), // guesses
            Constraint::Length(3),             // input
            Constraint::Length(3),             // status
            Constraint::Length(3),             // difficulty + pool
            Constraint::Length(VISIBLE_ERRORS as u16 + 2),
            Constraint::Length(3), // help
            Constraint::Min(0),
        ])
        .split(f.area());

    draw_header(f, chunks[0], snap);
    draw_grid(f, chunks[1], snap);
    draw_input(f, chunks[2], state, snap);
    draw_status(f, chunks[3], snap);
    draw_controls(f, chunks[4], snap);
    draw_errors(f, chunks[5], snap);
    draw_help(f, chunks[6]);
    draw_modals(f, state, snap);
}

fn draw_header(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let multiplier = snap.session.multiplier();
    let reward = if multiplier.is_set() {
        format!("reward: {multiplier} x the entry fee")
    } else {
        "reward: -".to_string()
    };
    let text = format!(
        "{} | {} | entry fee: {} ETH | {}",
        snap.network,
        snap.account,
        eth_display(snap.entry_fee),
        reward
    );
    let widget = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Crypto Wordle"));
    f.render_widget(widget, area);
}

fn grade_style(grade: Grade) -> Style {
    let bg = match grade {
        Grade::Exact => Color::Green,
        Grade::Present => Color::Yellow,
        Grade::Absent => Color::DarkGray,
    };
    Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD)
}

fn letter_cell(c: char) -> String {
    format!(" {c} ")
}

fn draw_grid(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let session = &snap.session;
    let width = match session.word_length() {
        0 => 5,
        n => n,
    };
    let mut lines: Vec<Line> = session
        .graded_rows()
        .into_iter()
        .map(|row| {
            Line::from(
                row.into_iter()
                    .map(|(c, grade)| Span::styled(letter_cell(c), grade_style(grade)))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    if let Some(word) = session.pending_guess() {
        let dim = Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC);
        lines.push(Line::from(
            word.chars()
                .map(|c| Span::styled(letter_cell(c), dim))
                .collect::<Vec<_>>(),
        ));
    }
    let rows = session.initial_attempts().max(0) as usize;
    while lines.len() < rows {
        lines.push(Line::from(
            std::iter::repeat(" _ ").take(width).collect::<String>(),
        ));
    }
    let title = match session.phase() {
        Phase::Lost { revealed } => format!("Guesses (answer: {revealed})"),
        _ => format!("Guesses ({} left)", session.attempts_remaining().max(0)),
    };
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(widget, area);
}

fn draw_input(f: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let enabled = snap.session.can_submit();
    let style = if enabled {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let widget = Paragraph::new(state.input.as_str())
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Your guess"));
    f.render_widget(widget, area);
    if state.mode == Mode::Normal {
        let x = area.x + 1 + state.input.width() as u16;
        f.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn draw_status(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let status = snap.session.status();
    let color = match status {
        Status::Failed(_) | Status::GameOver { .. } => Color::Red,
        Status::Correct | Status::Started | Status::Escalated { .. } => Color::Green,
        _ => Color::Yellow,
    };
    let text = if snap.session.is_busy() {
        format!("[busy] {status}")
    } else {
        status.to_string()
    };
    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(widget, area);
}

fn draw_controls(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let (label, style) = if snap.session.difficulty_locked() {
        (
            "Increase difficulty: locked",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            "Increase difficulty (Ctrl+D): one attempt fewer, bigger reward",
            Style::default().fg(Color::Cyan),
        )
    };
    let difficulty = Paragraph::new(label)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Difficulty"));
    f.render_widget(difficulty, cols[0]);

    let pool = match snap.session.contract_balance() {
        Some(balance) => format!("unclaimed prize pool: {} ETH", eth_display(balance)),
        None => "unclaimed prize pool: -".to_string(),
    };
    let balance =
        Paragraph::new(pool).block(Block::default().borders(Borders::ALL).title("Contract"));
    f.render_widget(balance, cols[1]);
}

fn draw_errors(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let skip = snap.errors.len().saturating_sub(VISIBLE_ERRORS);
    let lines: Vec<Line> = snap
        .errors
        .iter()
        .skip(skip)
        .map(|e| Line::from(e.clone()))
        .collect();
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::Red))
        .block(Block::default().borders(Borders::ALL).title("Errors"));
    f.render_widget(widget, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = [
        "Enter submit",
        "Ctrl+N new game",
        "Ctrl+D harder",
        "Ctrl+R refresh pool",
        "Esc quit",
    ]
    .iter()
    .join(" | ");
    let widget =
        Paragraph::new(help).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(widget, area);
}

fn draw_modals(f: &mut Frame, state: &UiState, _snap: &AppSnapshot) {
    match &state.mode {
        Mode::ConfirmModal { summary } => {
            let area = centered_rect(60, 25, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Sign transaction");
            let p = Paragraph::new(format!("{summary}\n\nSign and send? (Y/N)"))
                .wrap(Wrap { trim: false });
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit the game? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

/// Ether amount without trailing zero decimals.
pub fn eth_display(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((whole, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{frac}")
            }
        }
        None => formatted,
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}
