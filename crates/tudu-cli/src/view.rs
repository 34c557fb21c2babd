use crate::theme::Palette;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::{Frame, Terminal};
use std::io;
use std::time::{Duration, Instant};
use tudu_core::{ItemId, ListState, Msg, Session};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub trait EventSource {
    fn poll(&mut self, timeout: Duration) -> Result<Option<Event>>;
}
pub struct RealEventSource;
impl EventSource for RealEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<Option<Event>> {
        if crossterm::event::poll(timeout)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Draft,
    Search,
    List,
    /// Inline editor on one row; every keystroke is written through.
    Edit { id: ItemId, buffer: String },
}

/// Widget state that is not part of the list controller.
#[derive(Debug, Default)]
pub struct ViewState {
    pub focus: Focus,
    /// Raw search box text; the committed filter lives in the controller.
    pub search_input: String,
    pub selected: usize,
}

pub fn run_view(session: &mut Session, palette: &Palette, alt_screen: bool) -> Result<()> {
    let mut es = RealEventSource;
    run_view_with(session, &mut es, true, alt_screen, palette)
}

/// Runs the interactive loop until Esc or Ctrl+C. With `draw` off nothing
/// touches the terminal, which is how the loop is driven in tests.
pub fn run_view_with(
    session: &mut Session,
    es: &mut dyn EventSource,
    draw: bool,
    alt_screen: bool,
    palette: &Palette,
) -> Result<()> {
    let mut terminal = if draw {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if alt_screen {
            crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
        }
        Some(Terminal::new(CrosstermBackend::new(stdout))?)
    } else {
        None
    };

    let mut ui = ViewState::default();
    let result = (|| -> Result<()> {
        loop {
            session.process_pending();
            session.tick(Instant::now());
            settle(&mut ui, session.state());

            if let Some(ref mut term) = terminal {
                term.draw(|f| render(f, session.state(), &ui, palette))?;
            }

            let timeout = idle_timeout(session.state(), Instant::now());
            let Some(ev) = es.poll(timeout)? else {
                if terminal.is_none() {
                    // headless source ran dry without a quit key
                    return Ok(());
                }
                continue;
            };
            if let Event::Key(k) = ev {
                if k.kind == KeyEventKind::Press && !handle_key(session, &mut ui, k) {
                    return Ok(());
                }
            }
        }
    })();

    if draw {
        disable_raw_mode()?;
        if alt_screen {
            crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
        }
    }
    result
}

/// Caps the input wait so a pending search commit lands on time.
fn idle_timeout(state: &ListState, now: Instant) -> Duration {
    state.search.deadline().map_or(POLL_INTERVAL, |due| {
        due.saturating_duration_since(now).min(POLL_INTERVAL)
    })
}

/// Keeps the selection in range and leaves the editor if its row vanished.
fn settle(ui: &mut ViewState, state: &ListState) {
    let len = state.visible().len();
    if ui.selected >= len {
        ui.selected = len.saturating_sub(1);
    }
    if let Focus::Edit { id, .. } = &ui.focus {
        if state.item(id).is_none() {
            ui.focus = Focus::List;
        }
    }
}

fn selected_id(state: &ListState, ui: &ViewState) -> Option<ItemId> {
    state.visible().get(ui.selected).map(|item| item.id.clone())
}

/// Returns false when the view should close.
fn handle_key(session: &mut Session, ui: &mut ViewState, k: KeyEvent) -> bool {
    let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);
    match k.code {
        KeyCode::Char('c') if ctrl => return false,
        KeyCode::Char('s') if ctrl => {
            session.dispatch(Msg::SortToggled);
            return true;
        }
        KeyCode::Tab => {
            ui.focus = match ui.focus {
                Focus::Draft => Focus::Search,
                Focus::Search => Focus::List,
                Focus::List | Focus::Edit { .. } => Focus::Draft,
            };
            return true;
        }
        _ => {}
    }

    match &mut ui.focus {
        Focus::Draft => match k.code {
            KeyCode::Esc => return false,
            KeyCode::Enter => session.dispatch(Msg::AddRequested),
            KeyCode::Char(ch) => {
                let mut text = session.state().draft_title.clone();
                text.push(ch);
                session.dispatch(Msg::DraftEdited(text));
            }
            KeyCode::Backspace => {
                let mut text = session.state().draft_title.clone();
                if text.pop().is_some() {
                    session.dispatch(Msg::DraftEdited(text));
                }
            }
            _ => {}
        },
        Focus::Search => match k.code {
            KeyCode::Esc => return false,
            KeyCode::Char(ch) => {
                ui.search_input.push(ch);
                session.dispatch(Msg::SearchEdited {
                    value: ui.search_input.clone(),
                    at: Instant::now(),
                });
            }
            KeyCode::Backspace => {
                if ui.search_input.pop().is_some() {
                    session.dispatch(Msg::SearchEdited {
                        value: ui.search_input.clone(),
                        at: Instant::now(),
                    });
                }
            }
            _ => {}
        },
        Focus::List => match k.code {
            KeyCode::Esc => return false,
            KeyCode::Up | KeyCode::Char('k') => ui.selected = ui.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if ui.selected + 1 < session.state().visible().len() {
                    ui.selected += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(id) = selected_id(session.state(), ui) {
                    let buffer = session
                        .state()
                        .item(&id)
                        .map(|item| item.title.clone())
                        .unwrap_or_default();
                    ui.focus = Focus::Edit { id, buffer };
                }
            }
            KeyCode::Delete | KeyCode::Char('d') => {
                if let Some(id) = selected_id(session.state(), ui) {
                    session.dispatch(Msg::DeleteRequested(id));
                }
            }
            _ => {}
        },
        Focus::Edit { id, buffer } => match k.code {
            KeyCode::Esc | KeyCode::Enter => ui.focus = Focus::List,
            KeyCode::Char(ch) => {
                buffer.push(ch);
                session.dispatch(Msg::ItemEdited {
                    id: id.clone(),
                    title: buffer.clone(),
                });
            }
            KeyCode::Backspace => {
                if buffer.pop().is_some() {
                    session.dispatch(Msg::ItemEdited {
                        id: id.clone(),
                        title: buffer.clone(),
                    });
                }
            }
            _ => {}
        },
    }
    true
}

pub fn render(f: &mut Frame, state: &ListState, ui: &ViewState, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // new item
            Constraint::Length(3), // search
            Constraint::Min(3),    // list
            Constraint::Length(3), // shortcuts
        ])
        .split(f.area());

    let block = |title: String, focused: bool| {
        let color = if focused { palette.highlight } else { palette.border };
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(color))
    };

    let draft = Paragraph::new(state.draft_title.as_str())
        .block(block("New item".into(), ui.focus == Focus::Draft));
    f.render_widget(draft, chunks[0]);

    let mut search_title = String::from("Search");
    if state.search.is_pending() {
        search_title.push_str(" …");
    }
    let search = Paragraph::new(ui.search_input.as_str())
        .block(block(search_title, ui.focus == Focus::Search));
    f.render_widget(search, chunks[1]);

    let visible = state.visible();
    let rows: Vec<ListItem> = visible
        .iter()
        .map(|item| match &ui.focus {
            Focus::Edit { id, buffer } if *id == item.id => {
                ListItem::new(Line::from(format!("✎ {buffer}")))
            }
            _ if item.title.is_empty() => ListItem::new(
                Line::from("(untitled)").style(Style::default().add_modifier(Modifier::DIM)),
            ),
            _ => ListItem::new(Line::from(item.title.clone())),
        })
        .collect();
    let mut list_title = format!("Todos ({}/{})", visible.len(), state.items.len());
    if state.sort_enabled {
        list_title.push_str(" (sorted A-Z)");
    }
    let list_focused = matches!(ui.focus, Focus::List | Focus::Edit { .. });
    let list = List::new(rows)
        .block(block(list_title, list_focused))
        .highlight_style(
            Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::REVERSED),
        );
    let selected = (list_focused && !visible.is_empty()).then_some(ui.selected);
    f.render_stateful_widget(
        list,
        chunks[2],
        &mut ratatui::widgets::ListState::default().with_selected(selected),
    );

    let help = match ui.focus {
        Focus::Draft => "Enter add | Tab focus | Ctrl+S sort | Esc quit",
        Focus::Search => "type to filter | Tab focus | Ctrl+S sort | Esc quit",
        Focus::List => "↑/↓ move | Enter edit | d delete | Tab focus | Ctrl+S sort | Esc quit",
        Focus::Edit { .. } => "typing saves each keystroke | Enter/Esc done",
    };
    let footer = Paragraph::new(help)
        .block(block("Shortcuts".into(), false))
        .style(Style::default().fg(palette.help));
    f.render_widget(footer, chunks[3]);
}
