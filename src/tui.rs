use std::collections::{BTreeSet, VecDeque};
use std::io;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap,
};

use crate::app::{App, Effect, Intent, LoadKind, ProgressEvent, ProgressSink};
use crate::chunk::ChunkSource;
use crate::domain::{ALL_WORKS_LABEL, Entry, EntryId, Theme, WorkFilter};
use crate::error::GlossaryError;
use crate::loader::{LoadOrigin, LoadOutcome, LoadState};
use crate::store::{EntryTable, KeyValueStore};
use crate::theme::Palette;

const EVENTS_MAX: usize = 6;
const LOGS_MAX: usize = 200;
const HINTS: &[&str] = &[
    "Tip: / searches Chinese and English terms",
    "Tip: w picks a novel, type to narrow the list",
    "Tip: h hides an entry for good, u brings them all back",
    "Tip: d marks entries for deletion, x saves glossary_updated.json",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Table,
    Logs,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Browse,
    Search,
    WorkSelector,
    ConfirmDeletion,
}

#[derive(Debug, Default)]
struct ProgressState {
    status: String,
    events: VecDeque<String>,
    logs: VecDeque<String>,
}

struct TuiProgress {
    state: Arc<Mutex<ProgressState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            let message = event.message.trim().to_string();
            state.status = match parse_phase(&message) {
                Some((phase, payload)) => format!("{phase}: {payload}"),
                None => message.clone(),
            };
            let line = match event.elapsed {
                Some(elapsed) => format!("{message} ({} ms)", elapsed.as_millis()),
                None => message,
            };
            push_bounded(&mut state.events, line.clone(), EVENTS_MAX);
            push_bounded(&mut state.logs, format!("[{}] {line}", timestamp()), LOGS_MAX);
        }
    }
}

/// Everything one frame needs, copied out of the app.
struct Snapshot {
    rows: Vec<Entry>,
    total: usize,
    has_more: bool,
    entries: usize,
    origin: Option<LoadOrigin>,
    state: LoadState,
    theme: Theme,
    search: String,
    work: String,
    hidden: usize,
    pending: BTreeSet<EntryId>,
    status: Option<String>,
    selector: Vec<String>,
}

pub struct Tui {
    progress: Arc<Mutex<ProgressState>>,
    view: View,
    mode: InputMode,
    selected: usize,
    selector_query: String,
    selector_index: usize,
    log_scroll: u16,
    hint_index: usize,
    last_hint_update: Instant,
    pending_load: Option<PendingLoad>,
}

struct PendingLoad {
    rx: Receiver<Result<LoadOutcome, GlossaryError>>,
    previous: LoadState,
}

impl Default for Tui {
    fn default() -> Self {
        Self::new()
    }
}

impl Tui {
    pub fn new() -> Self {
        Self {
            progress: Arc::new(Mutex::new(ProgressState::default())),
            view: View::Table,
            mode: InputMode::Browse,
            selected: 0,
            selector_query: String::new(),
            selector_index: 0,
            log_scroll: 0,
            hint_index: 0,
            last_hint_update: Instant::now(),
            pending_load: None,
        }
    }

    /// Runs the browser until the user quits. The initial load starts
    /// in the background right away.
    pub fn run<S, T, K>(&mut self, app: &mut App<S, T, K>) -> miette::Result<()>
    where
        S: ChunkSource + 'static,
        T: EntryTable + 'static,
        K: KeyValueStore + 'static,
    {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        self.start_load(app, LoadKind::Initialize);
        let result = self.event_loop(&mut terminal, app);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop<S, T, K>(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        app: &mut App<S, T, K>,
    ) -> miette::Result<()>
    where
        S: ChunkSource + 'static,
        T: EntryTable + 'static,
        K: KeyValueStore + 'static,
    {
        loop {
            self.poll_load(app);
            self.rotate_hint();
            let snapshot = self.snapshot(app);
            self.selected = self.selected.min(snapshot.rows.len().saturating_sub(1));
            if let Ok(progress) = self.progress.lock() {
                terminal
                    .draw(|frame| draw_ui(frame, self, &progress, &snapshot))
                    .into_diagnostic()?;
            }

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if self.handle_key(key, app, &snapshot) {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn start_load<S, T, K>(&mut self, app: &mut App<S, T, K>, kind: LoadKind)
    where
        S: ChunkSource + 'static,
        T: EntryTable + 'static,
        K: KeyValueStore + 'static,
    {
        // The loader flag is raised by the worker; an unpolled load is still running.
        if self.pending_load.is_some() {
            self.push_log(GlossaryError::LoadInProgress.to_string());
            return;
        }
        let loader = app.loader();
        let previous = app.begin_load();
        let sink = TuiProgress {
            state: self.progress.clone(),
        };
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = match kind {
                LoadKind::Initialize => loader.initialize(&sink),
                LoadKind::Refresh => loader.force_refresh(&sink),
            };
            let _ = tx.send(result);
        });
        self.pending_load = Some(PendingLoad { rx, previous });
    }

    fn poll_load<S, T, K>(&mut self, app: &mut App<S, T, K>)
    where
        S: ChunkSource,
        T: EntryTable,
        K: KeyValueStore,
    {
        let Some(pending) = &self.pending_load else {
            return;
        };
        match pending.rx.try_recv() {
            Ok(Ok(outcome)) => {
                app.apply_load(outcome);
                self.selected = 0;
                self.pending_load = None;
            }
            Ok(Err(err)) => {
                if let Some(pending) = self.pending_load.take() {
                    app.cancel_load(pending.previous, &err);
                }
                self.push_log(err.to_string());
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                app.apply_load(LoadOutcome {
                    entries: Vec::new(),
                    state: LoadState::Error("loader stopped unexpectedly".to_string()),
                    origin: None,
                    error: None,
                });
                self.pending_load = None;
            }
        }
    }

    fn snapshot<S, T, K>(&self, app: &mut App<S, T, K>) -> Snapshot
    where
        S: ChunkSource,
        T: EntryTable,
        K: KeyValueStore,
    {
        let total = app.total_results();
        let rows: Vec<Entry> = app.visible_page().into_iter().cloned().collect();
        let selector = if self.mode == InputMode::WorkSelector {
            app.selector_works(&self.selector_query)
        } else {
            Vec::new()
        };
        Snapshot {
            has_more: app.pagination().has_more(total),
            rows,
            total,
            entries: app.entries().len(),
            origin: app.origin(),
            state: app.state().clone(),
            theme: app.theme(),
            search: app.search().to_string(),
            work: app.work().label().to_string(),
            hidden: app.mutations().hidden().len(),
            pending: app.mutations().pending().clone(),
            status: app.status().map(str::to_string),
            selector,
        }
    }

    fn handle_key<S, T, K>(
        &mut self,
        key: KeyEvent,
        app: &mut App<S, T, K>,
        snapshot: &Snapshot,
    ) -> bool
    where
        S: ChunkSource + 'static,
        T: EntryTable + 'static,
        K: KeyValueStore + 'static,
    {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        match self.mode {
            InputMode::Search => {
                self.handle_search_key(key, app);
                false
            }
            InputMode::WorkSelector => {
                self.handle_selector_key(key, app, snapshot);
                false
            }
            InputMode::ConfirmDeletion => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => {
                        self.dispatch(app, Intent::ConfirmDeletion);
                    }
                    _ => {}
                }
                self.mode = InputMode::Browse;
                false
            }
            InputMode::Browse => self.handle_browse_key(key, app, snapshot),
        }
    }

    fn handle_browse_key<S, T, K>(
        &mut self,
        key: KeyEvent,
        app: &mut App<S, T, K>,
        snapshot: &Snapshot,
    ) -> bool
    where
        S: ChunkSource + 'static,
        T: EntryTable + 'static,
        K: KeyValueStore + 'static,
    {
        let selected_id = snapshot.rows.get(self.selected).map(|entry| entry.id);
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                if self.view == View::Table {
                    return true;
                }
                self.view = View::Table;
            }
            KeyCode::F(1) | KeyCode::Char('?') => self.view = View::Help,
            KeyCode::F(4) => self.view = View::Logs,
            KeyCode::Char('/') => {
                self.view = View::Table;
                self.mode = InputMode::Search;
            }
            KeyCode::Char('w') | KeyCode::Tab => {
                self.selector_query.clear();
                self.selector_index = 0;
                self.mode = InputMode::WorkSelector;
            }
            KeyCode::Char('t') => self.dispatch(app, Intent::ToggleTheme),
            KeyCode::Char('m') => self.dispatch(app, Intent::RequestMore),
            KeyCode::Char('e') => self.dispatch(app, Intent::ExportCsv),
            KeyCode::Char('u') => self.dispatch(app, Intent::UnhideAll),
            KeyCode::Char('c') => self.dispatch(app, Intent::ClearDeletions),
            KeyCode::Char('r') => {
                let intent = if snapshot.state.is_error() && snapshot.entries == 0 {
                    Intent::Retry
                } else {
                    Intent::ForceRefresh
                };
                self.dispatch(app, intent);
            }
            KeyCode::Char('h') => {
                if let Some(id) = selected_id {
                    self.dispatch(app, Intent::Hide(id));
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = selected_id {
                    self.dispatch(app, Intent::ToggleDelete(id));
                }
            }
            KeyCode::Char('x') => {
                if !snapshot.pending.is_empty() {
                    self.mode = InputMode::ConfirmDeletion;
                }
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.move_down(1, app, snapshot),
            KeyCode::PageUp => {
                if self.view == View::Logs {
                    self.scroll_logs(-5);
                } else {
                    self.selected = self.selected.saturating_sub(10);
                }
            }
            KeyCode::PageDown => {
                if self.view == View::Logs {
                    self.scroll_logs(5);
                } else {
                    self.move_down(10, app, snapshot);
                }
            }
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = snapshot.rows.len().saturating_sub(1),
            _ => {}
        }
        false
    }

    fn move_down<S, T, K>(&mut self, step: usize, app: &mut App<S, T, K>, snapshot: &Snapshot)
    where
        S: ChunkSource + 'static,
        T: EntryTable + 'static,
        K: KeyValueStore + 'static,
    {
        let last = snapshot.rows.len().saturating_sub(1);
        let wanted = self.selected.saturating_add(step);
        if wanted > last && snapshot.has_more {
            self.dispatch(app, Intent::RequestMore);
            self.selected = wanted;
        } else {
            self.selected = wanted.min(last);
        }
    }

    fn handle_search_key<S, T, K>(&mut self, key: KeyEvent, app: &mut App<S, T, K>)
    where
        S: ChunkSource + 'static,
        T: EntryTable + 'static,
        K: KeyValueStore + 'static,
    {
        let mut text = app.search().to_string();
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                self.mode = InputMode::Browse;
                return;
            }
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Char(ch) => text.push(ch),
            _ => return,
        }
        self.selected = 0;
        self.dispatch(app, Intent::SetSearch(text));
    }

    fn handle_selector_key<S, T, K>(
        &mut self,
        key: KeyEvent,
        app: &mut App<S, T, K>,
        snapshot: &Snapshot,
    ) where
        S: ChunkSource + 'static,
        T: EntryTable + 'static,
        K: KeyValueStore + 'static,
    {
        // Index 0 is the "All Novels" option.
        let options = snapshot.selector.len() + 1;
        match key.code {
            KeyCode::Esc => self.mode = InputMode::Browse,
            KeyCode::Up => self.selector_index = self.selector_index.saturating_sub(1),
            KeyCode::Down => {
                self.selector_index = (self.selector_index + 1).min(options - 1);
            }
            KeyCode::Enter => {
                let work = match self.selector_index {
                    0 => WorkFilter::All,
                    index => match snapshot.selector.get(index - 1) {
                        Some(name) => WorkFilter::Work(name.clone()),
                        None => WorkFilter::All,
                    },
                };
                self.selected = 0;
                self.dispatch(app, Intent::SelectWork(work));
                self.mode = InputMode::Browse;
            }
            KeyCode::Backspace => {
                self.selector_query.pop();
                self.selector_index = 0;
            }
            KeyCode::Char(ch) => {
                self.selector_query.push(ch);
                self.selector_index = 0;
            }
            _ => {}
        }
    }

    fn dispatch<S, T, K>(&mut self, app: &mut App<S, T, K>, intent: Intent)
    where
        S: ChunkSource + 'static,
        T: EntryTable + 'static,
        K: KeyValueStore + 'static,
    {
        let before = app.status().map(str::to_string);
        match app.dispatch(intent) {
            Effect::None => {}
            Effect::Load(kind) => self.start_load(app, kind),
            Effect::Saved(path) => self.push_log(format!("saved {path}")),
        }
        let after = app.status().map(str::to_string);
        if let Some(status) = after.filter(|status| Some(status) != before.as_ref()) {
            self.push_log(status);
        }
    }

    fn push_log(&self, line: String) {
        if let Ok(mut state) = self.progress.lock() {
            push_bounded(&mut state.logs, format!("[{}] {line}", timestamp()), LOGS_MAX);
        }
    }

    fn scroll_logs(&mut self, delta: i16) {
        let max = self
            .progress
            .lock()
            .map(|state| state.logs.len())
            .unwrap_or(0);
        let max_scroll = max.saturating_sub(1) as i16;
        let next = (self.log_scroll as i16 + delta).clamp(0, max_scroll);
        self.log_scroll = next as u16;
    }

    fn rotate_hint(&mut self) {
        if self.last_hint_update.elapsed() >= Duration::from_secs(5) {
            self.hint_index = (self.hint_index + 1) % HINTS.len().max(1);
            self.last_hint_update = Instant::now();
        }
    }
}

fn draw_ui(frame: &mut ratatui::Frame, tui: &Tui, progress: &ProgressState, snap: &Snapshot) {
    let palette = Palette::for_theme(snap.theme);
    let base = Block::default().style(Style::default().bg(palette.background).fg(palette.text));
    frame.render_widget(base, frame.area());

    match tui.view {
        View::Help => return draw_help(frame, &palette),
        View::Logs => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(4)])
                .split(frame.area());
            frame.render_widget(draw_header(snap, &palette), chunks[0]);
            frame.render_widget(draw_logs_view(progress, tui.log_scroll, &palette), chunks[1]);
            return;
        }
        View::Table => {}
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(4),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(snap, &palette), chunks[0]);

    match &snap.state {
        LoadState::Loading if snap.entries == 0 => {
            frame.render_widget(draw_loading(progress, &palette), chunks[1]);
        }
        LoadState::Error(message) if snap.entries == 0 => {
            frame.render_widget(draw_error(message, &palette), chunks[1]);
        }
        _ => draw_table(frame, tui, snap, &palette, chunks[1]),
    }

    draw_footer(frame, tui, snap, progress, &palette, chunks[2]);

    match tui.mode {
        InputMode::WorkSelector => draw_selector(frame, tui, snap, &palette),
        InputMode::ConfirmDeletion => draw_confirm(frame, snap, &palette),
        InputMode::Browse | InputMode::Search => {}
    }
}

fn draw_header(snap: &Snapshot, palette: &Palette) -> Paragraph<'static> {
    let source = match snap.origin {
        Some(LoadOrigin::Cache) => "cache",
        Some(LoadOrigin::Network) => "network",
        None => "n/a",
    };
    let state_color = match snap.state {
        LoadState::Success => palette.accent,
        LoadState::Loading => palette.hidden,
        LoadState::Error(_) => palette.pending,
    };
    let state_label = match snap.state {
        LoadState::Success => "ready",
        LoadState::Loading => "loading",
        LoadState::Error(_) => "error",
    };
    let title = Line::from(vec![
        Span::styled(
            "GLOSSARY",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(palette.muted)),
        Span::raw("   Data: "),
        Span::styled(state_label, Style::default().fg(state_color)),
        Span::raw(format!("   Theme: {}", snap.theme)),
    ]);
    let counts = Line::from(Span::styled(
        format!(
            "{} entries from {source} · {} hidden · {} pending deletion",
            snap.entries,
            snap.hidden,
            snap.pending.len()
        ),
        Style::default().fg(palette.muted),
    ));
    Paragraph::new(vec![title, counts])
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_loading(progress: &ProgressState, palette: &Palette) -> Paragraph<'static> {
    let mut lines = vec![
        Line::from(Span::styled(
            "LOADING GLOSSARY",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(progress.status.clone()),
        Line::from(""),
    ];
    for event in progress.events.iter().rev() {
        lines.push(Line::from(format!("- {event}")));
    }
    Paragraph::new(lines).wrap(Wrap { trim: true })
}

fn draw_error(message: &str, palette: &Palette) -> Paragraph<'static> {
    Paragraph::new(vec![
        Line::from(Span::styled(
            "Failed to load the glossary",
            Style::default()
                .fg(palette.pending)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(message.to_string()),
        Line::from(""),
        Line::from("Press r to retry, q to quit."),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
}

fn draw_table(
    frame: &mut ratatui::Frame,
    tui: &Tui,
    snap: &Snapshot,
    palette: &Palette,
    area: Rect,
) {
    if snap.rows.is_empty() {
        let empty = Paragraph::new("No results found.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(palette.muted));
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["Chinese", "English", "Novel"]).style(
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD),
    );
    let rows = snap.rows.iter().map(|entry| {
        let style = if snap.pending.contains(&entry.id) {
            Style::default()
                .fg(palette.pending)
                .add_modifier(Modifier::CROSSED_OUT)
        } else {
            Style::default().fg(palette.text)
        };
        Row::new(vec![
            Cell::from(entry.chinese.clone()),
            Cell::from(entry.english.clone()),
            Cell::from(Span::styled(
                entry.novel.clone(),
                Style::default().fg(palette.muted),
            )),
        ])
        .style(style)
    });
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(45),
            Constraint::Percentage(25),
        ],
    )
    .header(header)
    .row_highlight_style(
        Style::default()
            .bg(palette.selection)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = TableState::default().with_selected(Some(tui.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_footer(
    frame: &mut ratatui::Frame,
    tui: &Tui,
    snap: &Snapshot,
    progress: &ProgressState,
    palette: &Palette,
    area: Rect,
) {
    let search_style = if tui.mode == InputMode::Search {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.muted)
    };
    let more = if snap.has_more { " · m for more" } else { "" };
    let status = snap
        .status
        .clone()
        .unwrap_or_else(|| match snap.state {
            LoadState::Loading => progress.status.clone(),
            _ => HINTS[tui.hint_index].to_string(),
        });
    let lines = vec![
        Line::from(vec![
            Span::styled("/ ", search_style),
            Span::raw(snap.search.clone()),
            Span::styled("   Novel: ", Style::default().fg(palette.muted)),
            Span::raw(snap.work.clone()),
            Span::styled(
                format!("   showing {} of {}{more}", snap.rows.len(), snap.total),
                Style::default().fg(palette.muted),
            ),
        ]),
        Line::from(Span::styled(status, Style::default().fg(palette.muted))),
        Line::from(Span::styled(
            "/ search  w novel  h hide  u unhide  d delete  x save  e csv  t theme  r refresh  q quit",
            Style::default().fg(palette.muted),
        )),
    ];
    let para = Paragraph::new(lines).block(Block::default().borders(Borders::TOP));
    frame.render_widget(para, area);

    if tui.mode == InputMode::Search {
        let cursor_x = area
            .x
            .saturating_add(2 + snap.search.chars().count() as u16)
            .min(area.x.saturating_add(area.width.saturating_sub(1)));
        frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
    }
}

fn draw_selector(frame: &mut ratatui::Frame, tui: &Tui, snap: &Snapshot, palette: &Palette) {
    let area = centered(frame.area(), 50, 60);
    frame.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let query = Paragraph::new(Line::from(vec![
        Span::styled("Search novels: ", Style::default().fg(palette.muted)),
        Span::raw(tui.selector_query.clone()),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Novel"));
    frame.render_widget(query, chunks[0]);

    let mut items = vec![ListItem::new(ALL_WORKS_LABEL)];
    items.extend(snap.selector.iter().map(|work| ListItem::new(work.clone())));
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().bg(palette.background).fg(palette.text))
        .highlight_style(
            Style::default()
                .bg(palette.selection)
                .add_modifier(Modifier::BOLD),
        );
    let mut state = ListState::default().with_selected(Some(tui.selector_index));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

fn draw_confirm(frame: &mut ratatui::Frame, snap: &Snapshot, palette: &Palette) {
    let area = centered(frame.area(), 50, 20);
    frame.render_widget(Clear, area);
    let text = Paragraph::new(vec![
        Line::from(format!(
            "Save glossary_updated.json without {} entries?",
            snap.pending.len()
        )),
        Line::from("Press y to confirm, any other key to cancel."),
    ])
    .alignment(Alignment::Center)
    .style(Style::default().bg(palette.background).fg(palette.text))
    .block(Block::default().borders(Borders::ALL).title("Confirm"));
    frame.render_widget(text, area);
}

fn draw_help(frame: &mut ratatui::Frame, palette: &Palette) {
    let block = Block::default().borders(Borders::ALL).title("Help");
    let lines = vec![
        Line::from(Span::styled(
            "Keys",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from("/ search terms (Enter or Esc to finish)"),
        Line::from("w or Tab pick a novel, type to narrow the list"),
        Line::from("Up/Down/PgUp/PgDn move, m or scrolling past the end loads more"),
        Line::from("h hide entry, u unhide all"),
        Line::from("d mark entry for deletion, x save glossary_updated.json, c clear marks"),
        Line::from("e export the current view as CSV"),
        Line::from("t toggle theme, r refresh from network"),
        Line::from("F4 logs, F1 or ? help, Esc back, q quit"),
    ];
    let view = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(view, frame.area());
}

fn draw_logs_view(progress: &ProgressState, scroll: u16, palette: &Palette) -> Paragraph<'static> {
    let total = progress.logs.len();
    let visible = 30usize;
    let start = total.saturating_sub(scroll as usize + visible);
    let mut lines = Vec::with_capacity(visible + 1);
    lines.push(Line::from(Span::styled(
        "LOGS (PgUp/PgDown to scroll, Esc to go back)",
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD),
    )));
    for line in progress.logs.iter().skip(start).take(visible) {
        lines.push(Line::from(line.clone()));
    }
    Paragraph::new(lines).wrap(Wrap { trim: true })
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn parse_phase(message: &str) -> Option<(&str, &str)> {
    let rest = message.strip_prefix("phase=")?;
    let (phase, payload) = rest.split_once(';')?;
    Some((phase.trim(), payload.trim()))
}

fn push_bounded(buffer: &mut VecDeque<String>, item: String, max: usize) {
    buffer.push_back(item);
    while buffer.len() > max {
        buffer.pop_front();
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
