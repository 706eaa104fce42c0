use std::io::Stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};

use crate::application::controller::{Command, Outcome, TodoController};
use crate::domain::storage::KeyValueStorage;
use crate::domain::todo::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode { View, Create, Edit }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow { Continue, Quit }

/// Terminal front end. Holds the selection as a [`RecordId`] and re-derives
/// store positions from the controller on every key press.
pub struct App<S: KeyValueStorage> {
    controller: TodoController<S>,
    mode: Mode,
    cursor: usize,
    selected: Option<RecordId>,
    list_state: ListState,
    draft: String,
    edit_draft: String,
    status: Option<String>,
}

impl<S: KeyValueStorage> App<S> {
    pub fn new(controller: TodoController<S>) -> Self {
        let mut app = Self {
            controller,
            mode: Mode::View,
            cursor: 0,
            selected: None,
            list_state: ListState::default(),
            draft: String::new(),
            edit_draft: String::new(),
            status: None,
        };
        app.resync();
        app
    }

    pub fn controller(&self) -> &TodoController<S> { &self.controller }
    pub fn mode(&self) -> Mode { self.mode }
    /// Text typed for a new item.
    pub fn draft(&self) -> &str { &self.draft }
    /// Text of the open inline editor; survives parking and failed saves.
    pub fn edit_draft(&self) -> &str { &self.edit_draft }
    pub fn status(&self) -> Option<&str> { self.status.as_deref() }

    /// Store position of the highlighted row.
    pub fn selected_position(&self) -> Option<usize> {
        self.controller.visible().get(self.cursor).map(|(position, _)| *position)
    }

    pub async fn handle_key(&mut self, code: KeyCode) -> Flow {
        match self.mode {
            Mode::View => match code {
                KeyCode::Char('q') => return Flow::Quit,
                KeyCode::Up => { self.cursor = self.cursor.saturating_sub(1); self.remember_cursor(); }
                KeyCode::Down => {
                    if self.cursor + 1 < self.controller.visible().len() { self.cursor += 1; }
                    self.remember_cursor();
                }
                KeyCode::Enter => {
                    if let Some(position) = self.selected_position() {
                        self.run(Command::Toggle(position)).await;
                    }
                }
                KeyCode::Char('n') => { self.mode = Mode::Create; self.draft.clear(); }
                KeyCode::Char('e') => self.open_editor().await,
                KeyCode::Char('d') => {
                    if let Some(position) = self.selected_position() {
                        self.run(Command::Delete(position)).await;
                    }
                }
                KeyCode::Char('f') => {
                    let next = self.controller.filter().next();
                    self.run(Command::SetFilter(next)).await;
                }
                _ => {}
            },
            Mode::Create => match code {
                KeyCode::Esc => { self.mode = Mode::View; self.draft.clear(); }
                KeyCode::Enter => {
                    let text = std::mem::take(&mut self.draft);
                    self.mode = Mode::View;
                    if let Some(Outcome::Added(position)) = self.run(Command::Add(text)).await {
                        self.selected = self.controller.store().id_at(position);
                        self.resync();
                    }
                }
                KeyCode::Backspace => { self.draft.pop(); }
                KeyCode::Char(c) => self.draft.push(c),
                _ => {}
            },
            Mode::Edit => match code {
                KeyCode::Esc => {
                    self.mode = Mode::View;
                    self.edit_draft.clear();
                    self.run(Command::CancelEdit).await;
                }
                // Park the editor and go back to browsing; it stays open.
                KeyCode::Tab => self.mode = Mode::View,
                KeyCode::Enter => {
                    if let Some(position) = self.controller.editing() {
                        let text = std::mem::take(&mut self.edit_draft);
                        match self.run(Command::Save(position, text.clone())).await {
                            Some(_) => self.mode = Mode::View,
                            // The editor is still open; keep what was typed.
                            None => self.edit_draft = text,
                        }
                    }
                }
                KeyCode::Backspace => { self.edit_draft.pop(); }
                KeyCode::Char(c) => self.edit_draft.push(c),
                _ => {}
            },
        }
        Flow::Continue
    }

    async fn open_editor(&mut self) {
        let Some(position) = self.selected_position() else { return };
        // Resume a parked editor on the same row.
        if self.controller.editing() == Some(position) {
            self.mode = Mode::Edit;
            return;
        }
        if let Some(Outcome::Editing(position)) = self.run(Command::Edit(position)).await {
            self.edit_draft = self.controller.store().get(position).map(|r| r.text).unwrap_or_default();
            self.mode = Mode::Edit;
        }
    }

    async fn run(&mut self, command: Command) -> Option<Outcome> {
        let result = self.controller.dispatch(command).await;
        let outcome = match result {
            Ok(outcome) => { self.status = None; Some(outcome) }
            Err(e) => {
                tracing::warn!(error = %e, "command failed");
                self.status = Some(e.to_string());
                None
            }
        };
        self.resync();
        outcome
    }

    fn remember_cursor(&mut self) {
        let visible = self.controller.visible();
        self.selected = visible.get(self.cursor).and_then(|(position, _)| self.controller.store().id_at(*position));
        self.list_state.select(if visible.is_empty() { None } else { Some(self.cursor) });
    }

    /// Moves the cursor back onto the selected record, or clamps it when that
    /// record is gone or filtered out.
    fn resync(&mut self) {
        let visible = self.controller.visible();
        let store = self.controller.store();
        let found = self
            .selected
            .and_then(|id| store.position_of(id))
            .and_then(|position| visible.iter().position(|(p, _)| *p == position));
        self.cursor = match found {
            Some(index) => index,
            None if visible.is_empty() => 0,
            None => self.cursor.min(visible.len() - 1),
        };
        self.remember_cursor();
    }
}

pub async fn run<S: KeyValueStorage>(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App<S>) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    loop {
        terminal.draw(|f| draw(f, app))?;
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                // Only act on key presses; ignore repeats and releases to prevent duplicate input
                if key.kind != KeyEventKind::Press { continue; }
                if app.handle_key(key.code).await == Flow::Quit { break; }
            }
        }
    }
    Ok(())
}

fn draw<S: KeyValueStorage>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(3)])
        .split(f.size());

    let header = Paragraph::new("Enter: toggle, n: new, e: edit, d: delete, f: filter, q: quit  |  Edit: Enter save, Esc cancel, Tab park")
        .block(Block::default().borders(Borders::ALL).title("todos"));
    f.render_widget(header, chunks[0]);

    let editing = app.controller.editing();
    let items: Vec<ListItem> = app
        .controller
        .visible()
        .into_iter()
        .map(|(position, record)| {
            let mark = if record.completed { "[x]" } else { "[ ]" };
            let suffix = if editing == Some(position) { "  (editing)" } else { "" };
            let style = if record.completed { Style::default().add_modifier(Modifier::CROSSED_OUT) } else { Style::default() };
            ListItem::new(format!("{mark} {}{suffix}", record.text)).style(style)
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!("items [{}]", app.controller.filter().label())))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED))
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, chunks[1], &mut app.list_state);

    let (title, text) = match (app.mode, &app.status) {
        (Mode::Create, _) => ("new", format!("{}_", app.draft)),
        (Mode::Edit, Some(message)) => ("edit", format!("{}_  ({message})", app.edit_draft)),
        (Mode::Edit, None) => ("edit", format!("{}_", app.edit_draft)),
        (Mode::View, Some(message)) => ("error", message.clone()),
        (Mode::View, None) => ("info", format!("{} item(s)", app.controller.store().count())),
    };
    let footer = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(footer, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::controller::FilterResetPolicy;
    use crate::application::todo_store::TodoStore;
    use crate::domain::filter::Filter;
    use crate::infrastructure::memory_kv::MemoryKeyValueStore;

    async fn app(texts: &[&str]) -> App<MemoryKeyValueStore> {
        let mut store = TodoStore::open(MemoryKeyValueStore::new()).await.unwrap();
        for text in texts {
            store.add(*text).await.unwrap();
        }
        App::new(TodoController::new(store, FilterResetPolicy::Keep))
    }

    fn storage(app: &App<MemoryKeyValueStore>) -> &MemoryKeyValueStore {
        app.controller().store().storage()
    }

    async fn type_text(app: &mut App<MemoryKeyValueStore>, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyCode::Char(c)).await;
        }
    }

    #[tokio::test]
    async fn typing_and_enter_adds_item() {
        let mut app = app(&[]).await;
        app.handle_key(KeyCode::Char('n')).await;
        type_text(&mut app, "buy milk").await;
        app.handle_key(KeyCode::Enter).await;
        assert_eq!(app.mode(), Mode::View);
        assert_eq!(app.controller().store().get(0).unwrap().text, "buy milk");
        assert_eq!(app.selected_position(), Some(0));
    }

    #[tokio::test]
    async fn cursor_clamps_after_deleting_last_row() {
        let mut app = app(&["a", "b", "c"]).await;
        app.handle_key(KeyCode::Down).await;
        app.handle_key(KeyCode::Down).await;
        assert_eq!(app.selected_position(), Some(2));
        // delete "c", cursor clamps onto "b"
        app.handle_key(KeyCode::Char('d')).await;
        assert_eq!(app.selected_position(), Some(1));
        assert_eq!(app.controller().store().count(), 2);
    }

    #[tokio::test]
    async fn parked_editor_blocks_a_second_one() {
        let mut app = app(&["a", "b"]).await;
        app.handle_key(KeyCode::Char('e')).await;
        assert_eq!(app.mode(), Mode::Edit);
        assert_eq!(app.edit_draft(), "a");
        app.handle_key(KeyCode::Tab).await;
        app.handle_key(KeyCode::Down).await;
        app.handle_key(KeyCode::Char('e')).await;
        assert_eq!(app.mode(), Mode::View);
        assert!(app.status().unwrap().contains("one item at a time"));

        app.handle_key(KeyCode::Up).await;
        app.handle_key(KeyCode::Char('e')).await;
        app.handle_key(KeyCode::Char('!')).await;
        app.handle_key(KeyCode::Enter).await;
        assert_eq!(app.controller().store().get(0).unwrap().text, "a!");
        assert_eq!(app.controller().editing(), None);
    }

    #[tokio::test]
    async fn new_item_input_does_not_clobber_parked_editor() {
        let mut app = app(&["buy milk"]).await;
        app.handle_key(KeyCode::Char('e')).await;
        app.handle_key(KeyCode::Tab).await;
        app.handle_key(KeyCode::Char('n')).await;
        app.handle_key(KeyCode::Esc).await;
        app.handle_key(KeyCode::Char('e')).await;
        assert_eq!(app.mode(), Mode::Edit);
        assert_eq!(app.edit_draft(), "buy milk");
        app.handle_key(KeyCode::Enter).await;
        assert_eq!(app.controller().store().get(0).unwrap().text, "buy milk");
    }

    #[tokio::test]
    async fn failed_save_keeps_editor_text() {
        let mut app = app(&["buy milk"]).await;
        app.handle_key(KeyCode::Char('e')).await;
        app.handle_key(KeyCode::Char('!')).await;
        storage(&app).fail_writes(true);
        app.handle_key(KeyCode::Enter).await;

        assert!(app.status().unwrap().contains("storage unavailable"));
        assert_eq!(app.controller().editing(), Some(0));
        assert_eq!(app.mode(), Mode::Edit);
        assert_eq!(app.edit_draft(), "buy milk!");
        assert_eq!(app.controller().store().get(0).unwrap().text, "buy milk");

        // park, then resume and retry once storage is back
        app.handle_key(KeyCode::Tab).await;
        storage(&app).fail_writes(false);
        app.handle_key(KeyCode::Char('e')).await;
        assert_eq!(app.edit_draft(), "buy milk!");
        app.handle_key(KeyCode::Enter).await;
        assert_eq!(app.controller().store().get(0).unwrap().text, "buy milk!");
        assert_eq!(app.mode(), Mode::View);
    }

    #[tokio::test]
    async fn toggle_under_filter_hides_row() {
        let mut app = app(&["a", "b"]).await;
        app.handle_key(KeyCode::Char('f')).await;
        assert_eq!(app.controller().filter(), Filter::NotCompleted);
        app.handle_key(KeyCode::Enter).await;
        assert!(app.controller().store().get(0).unwrap().completed);
        assert_eq!(app.controller().visible().len(), 1);
        assert_eq!(app.selected_position(), Some(1));
    }

    #[tokio::test]
    async fn q_quits_only_in_view_mode() {
        let mut app = app(&[]).await;
        app.handle_key(KeyCode::Char('n')).await;
        assert_eq!(app.handle_key(KeyCode::Char('q')).await, Flow::Continue);
        app.handle_key(KeyCode::Esc).await;
        assert_eq!(app.handle_key(KeyCode::Char('q')).await, Flow::Quit);
    }
}
