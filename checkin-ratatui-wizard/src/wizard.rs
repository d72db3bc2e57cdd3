//! The step-by-step terminal wizard.
//!
//! [`Wizard`] owns the terminal and the event loop. All screen state lives
//! in [`WizardSession`], which can be driven without a terminal: feed it key
//! and mouse events, and draw it into any ratatui backend.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use checkin::{
    Mode, ModeSwitch, Question, Questionnaire, SessionStore, SwitchDirection, TraversalError,
    TraversalState,
};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    prelude::CrosstermBackend,
    style::{Color, Style, Stylize},
    text::Line,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use thiserror::Error;

use crate::editor::{
    ChoiceList, CompoundEditor, Editor, FieldEditor, FieldInput, RANKED_ROW_HEIGHT, RankedList,
    TextInput,
};

/// How often the loop wakes up without input, to arm held presses.
const TICK: Duration = Duration::from_millis(50);

/// Error type for the wizard.
#[derive(Debug, Error)]
pub enum WizardError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The questionnaire rejected an operation.
    #[error(transparent)]
    Traversal(#[from] TraversalError),
}

/// How a wizard run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardOutcome {
    /// The respondent reached the end of the manifest and confirmed.
    Completed,
    /// The respondent left early. Progress is saved.
    Paused,
}

/// Color theme for the TUI.
#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub background: Color,
    pub text: Color,
    pub highlight: Color,
    pub error: Color,
    pub success: Color,
    pub border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color::Cyan,
            secondary: Color::Blue,
            background: Color::Reset,
            text: Color::White,
            highlight: Color::Yellow,
            error: Color::Red,
            success: Color::Green,
            border: Color::Gray,
        }
    }
}

/// Ratatui front end for a [`Questionnaire`].
///
/// Presents one question at a time with progress, section context and
/// keyboard navigation. Ranked questions can also be reordered with the
/// mouse.
#[derive(Debug, Clone, Default)]
pub struct Wizard {
    /// Title shown at the top; defaults to the phase title.
    title: Option<String>,
    theme: Theme,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title shown at the top of the wizard.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set a custom color theme.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Run the wizard until the respondent finishes or leaves.
    ///
    /// Starts the stored mode (or `lite`) if no manifest is active yet.
    pub fn run<S: SessionStore>(
        &self,
        questionnaire: &mut Questionnaire<S>,
    ) -> Result<WizardOutcome, WizardError> {
        if questionnaire.mode().is_none() {
            questionnaire.resume()?;
        }
        let mut session = WizardSession::new(questionnaire);
        if let Some(title) = &self.title {
            session = session.with_title(title.clone());
        }

        let mut terminal = setup_terminal()?;
        let result = event_loop(&mut terminal, &mut session, questionnaire, &self.theme);
        restore_terminal(&mut terminal)?;

        if let Ok(outcome) = &result {
            tracing::info!(phase = %questionnaire.definition().id(), ?outcome, "wizard finished");
        }
        result
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, WizardError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), WizardError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn event_loop<S: SessionStore>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut WizardSession,
    questionnaire: &mut Questionnaire<S>,
    theme: &Theme,
) -> Result<WizardOutcome, WizardError> {
    loop {
        terminal.draw(|frame| session.draw(frame, questionnaire, theme))?;

        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(outcome) = session.handle_key(questionnaire, key)? {
                        return Ok(outcome);
                    }
                }
                Event::Mouse(mouse) => session.handle_mouse(mouse, Instant::now()),
                _ => {}
            }
        }
        session.tick(Instant::now());
    }
}

/// Which screen the wizard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Intro,
    Question,
    Complete,
}

/// A one-line message under the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// Screen state of a running wizard.
#[derive(Debug, Clone)]
pub struct WizardSession {
    title: String,
    screen: Screen,
    editor: Option<Editor>,
    notice: Option<Notice>,
}

impl WizardSession {
    /// Start on the intro for a fresh session, or on the current question.
    pub fn new<S: SessionStore>(questionnaire: &Questionnaire<S>) -> Self {
        let definition = questionnaire.definition();
        let title = if definition.title().is_empty() {
            definition.id().to_string()
        } else {
            definition.title().to_string()
        };
        let fresh = questionnaire.cursor() == 0 && questionnaire.stats().answered == 0;
        let screen = if definition.intro().is_some() && fresh {
            Screen::Intro
        } else {
            Screen::Question
        };

        let mut session = Self {
            title,
            screen,
            editor: None,
            notice: None,
        };
        session.after_move(questionnaire);
        session
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn editor(&self) -> Option<&Editor> {
        self.editor.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Handle one key press. Returns an outcome when the wizard should close.
    ///
    /// | Key        | Action                                  |
    /// |------------|-----------------------------------------|
    /// | Enter      | Save the answer and go on               |
    /// | Ctrl+K     | Skip, unless already answered           |
    /// | Ctrl+B     | Save the answer and go back             |
    /// | Ctrl+U     | Switch between the lite and full sets   |
    /// | Esc        | Leave, keeping progress                 |
    pub fn handle_key<S: SessionStore>(
        &mut self,
        questionnaire: &mut Questionnaire<S>,
        key: KeyEvent,
    ) -> Result<Option<WizardOutcome>, WizardError> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Ok(Some(WizardOutcome::Paused)),
            KeyCode::Char('c') if ctrl => return Ok(Some(WizardOutcome::Paused)),
            KeyCode::Char('u') if ctrl => {
                self.switch_mode(questionnaire)?;
                return Ok(None);
            }
            _ => {}
        }

        match self.screen {
            Screen::Intro => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                    self.screen = Screen::Question;
                }
            }
            Screen::Complete => match key.code {
                KeyCode::Enter => return Ok(Some(WizardOutcome::Completed)),
                KeyCode::Char('b') if ctrl => {
                    questionnaire.previous();
                    self.after_move(questionnaire);
                }
                _ => {}
            },
            Screen::Question => match key.code {
                KeyCode::Enter if !key.modifiers.contains(KeyModifiers::ALT) => {
                    if let Some(editor) = self.editor.as_mut() {
                        editor.prepare_submit();
                    }
                    if self.commit(questionnaire)? {
                        questionnaire.next();
                        self.notice = None;
                        self.after_move(questionnaire);
                    }
                }
                // Answered questions cannot be skipped.
                KeyCode::Char('k') if ctrl && !questionnaire.is_current_answered() => {
                    questionnaire.skip();
                    self.notice = None;
                    self.after_move(questionnaire);
                }
                KeyCode::Char('b') if ctrl => {
                    if self.commit(questionnaire)? {
                        questionnaire.previous();
                        self.notice = None;
                        self.after_move(questionnaire);
                    }
                }
                _ => {
                    if let Some(editor) = self.editor.as_mut() {
                        match editor.handle_key(key) {
                            Ok(()) => {
                                if matches!(self.notice, Some(Notice::Error(_))) {
                                    self.notice = None;
                                }
                            }
                            Err(message) => self.notice = Some(Notice::Error(message)),
                        }
                    }
                }
            },
        }
        Ok(None)
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        if self.screen != Screen::Question {
            return;
        }
        if let Some(editor) = self.editor.as_mut()
            && let Err(message) = editor.handle_mouse(mouse, now)
        {
            self.notice = Some(Notice::Error(message));
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(editor) = self.editor.as_mut() {
            editor.tick(now);
        }
    }

    /// Save the editor's answer for the current question.
    ///
    /// Returns `false` when the input is invalid; the reason becomes the
    /// notice. Empty answers are only written over an existing one.
    fn commit<S: SessionStore>(
        &mut self,
        questionnaire: &mut Questionnaire<S>,
    ) -> Result<bool, WizardError> {
        let (Some(editor), Some(id)) = (&self.editor, questionnaire.current_id().cloned()) else {
            return Ok(true);
        };
        let response = match editor.response() {
            Ok(response) => response,
            Err(message) => {
                self.notice = Some(Notice::Error(message));
                return Ok(false);
            }
        };
        let existing = questionnaire.response(id.as_str());
        let changed = existing != Some(&response);
        if changed && (response.has_content() || existing.is_some()) {
            questionnaire.save_response(id, response)?;
        }
        Ok(true)
    }

    fn switch_mode<S: SessionStore>(
        &mut self,
        questionnaire: &mut Questionnaire<S>,
    ) -> Result<(), WizardError> {
        if self.screen == Screen::Question && !self.commit(questionnaire)? {
            return Ok(());
        }
        let target = match questionnaire.mode() {
            Some(Mode::Full) => Mode::Lite,
            _ => Mode::Full,
        };
        match questionnaire.init_with_upgrade(target) {
            Ok(switch) => {
                self.notice = Some(Notice::Info(describe_switch(&switch)));
                self.screen = Screen::Question;
                self.after_move(questionnaire);
            }
            Err(TraversalError::Schema(err)) => {
                tracing::warn!(%err, "mode switch failed");
                self.notice = Some(Notice::Error(format!("Cannot switch to {target}: {err}")));
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    /// Follow the questionnaire to its current question or completion.
    fn after_move<S: SessionStore>(&mut self, questionnaire: &Questionnaire<S>) {
        if questionnaire.state() == TraversalState::Complete {
            self.screen = Screen::Complete;
            self.editor = None;
            return;
        }
        if self.screen == Screen::Complete {
            self.screen = Screen::Question;
        }
        self.editor = questionnaire.current_question().map(|question| {
            Editor::for_question(question, questionnaire.response(question.id().as_str()))
        });
    }

    /// Draw the current screen.
    pub fn draw<S: SessionStore>(
        &mut self,
        frame: &mut Frame,
        questionnaire: &Questionnaire<S>,
        theme: &Theme,
    ) {
        match self.screen {
            Screen::Intro => draw_intro(frame, questionnaire, theme),
            Screen::Complete => self.draw_completion(frame, questionnaire, theme),
            Screen::Question => self.draw_question(frame, questionnaire, theme),
        }
    }

    fn draw_question<S: SessionStore>(
        &mut self,
        frame: &mut Frame,
        questionnaire: &Questionnaire<S>,
        theme: &Theme,
    ) {
        let area = frame.area();

        // Main layout
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(2), // Progress bar
                Constraint::Min(10),   // Content
                Constraint::Length(3), // Help
            ])
            .split(area);

        let mode = questionnaire.mode().map(|m| m.as_str()).unwrap_or("-");
        let header = Paragraph::new(format!("{}  [{}]", self.title, mode))
            .style(Style::default().fg(theme.primary).bold())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::BOTTOM)
                    .border_style(Style::default().fg(theme.border)),
            );
        frame.render_widget(header, chunks[0]);

        draw_progress(frame, chunks[1], questionnaire, theme);

        let content = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // Question prompt
                Constraint::Min(5),    // Input area
                Constraint::Length(2), // Notice
            ])
            .split(chunks[2]);

        let Some(question) = questionnaire.current_question() else {
            return;
        };
        draw_prompt(frame, content[0], questionnaire, question, theme);

        if let Some(editor) = self.editor.as_mut() {
            match editor {
                Editor::Single(list) => draw_choice(frame, content[1], list, theme, true),
                Editor::Multi(list) => draw_choice(frame, content[1], list, theme, true),
                Editor::Ranked { list, .. } => draw_ranked(frame, content[1], list, theme, true),
                Editor::Text(input) => {
                    let hint = question
                        .examples()
                        .first()
                        .map(|e| format!(" Your answer (e.g. {e}) "))
                        .unwrap_or_else(|| " Your answer ".to_string());
                    draw_text(frame, content[1], input, theme, &hint, true);
                }
                Editor::Compound(compound) => draw_compound(frame, content[1], compound, theme),
            }
        }

        if let Some(notice) = &self.notice {
            let (text, color) = match notice {
                Notice::Info(text) => (text.clone(), theme.success),
                Notice::Error(text) => (text.clone(), theme.error),
            };
            let widget = Paragraph::new(text)
                .style(Style::default().fg(color).bold())
                .alignment(Alignment::Center);
            frame.render_widget(widget, content[2]);
        }

        let help = Paragraph::new(self.help_text(questionnaire))
            .style(Style::default().fg(theme.border))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(theme.border)),
            );
        frame.render_widget(help, chunks[3]);
    }

    /// Key hints for the current question.
    fn help_text<S: SessionStore>(&self, questionnaire: &Questionnaire<S>) -> String {
        let Some(editor) = self.editor.as_ref() else {
            return "Esc: Pause".to_string();
        };
        let mut hints = match editor {
            Editor::Single(_) => vec!["↑/↓: Select"],
            Editor::Multi(_) => vec!["↑/↓: Navigate", "Space: Toggle"],
            Editor::Ranked { .. } => vec!["Space: Rank", "Shift+↑/↓ or drag ≡: Reorder"],
            Editor::Text(_) => vec!["Alt+Enter: New line"],
            Editor::Compound(_) => vec!["Tab: Next field", "Space: Choose"],
        };
        hints.push(if questionnaire.is_last() {
            "Enter: Finish"
        } else {
            "Enter: Next"
        });
        if !questionnaire.is_current_answered() {
            hints.push("Ctrl+K: Skip");
        }
        hints.extend(["Ctrl+B: Back", "Ctrl+U: Lite/Full", "Esc: Pause"]);
        hints.join("  ")
    }

    fn draw_completion<S: SessionStore>(
        &self,
        frame: &mut Frame,
        questionnaire: &Questionnaire<S>,
        theme: &Theme,
    ) {
        let stats = questionnaire.stats();
        let mut text = format!(
            "You reached the end of the {} check-in.\n\n{} answered, {} skipped, {} open.\n\n",
            questionnaire.mode().map(|m| m.as_str()).unwrap_or("-"),
            stats.answered,
            stats.skipped,
            stats.unanswered
        );
        let can_upgrade = questionnaire.mode() == Some(Mode::Lite)
            && questionnaire.definition().manifest(Mode::Full).is_ok();
        if can_upgrade {
            text.push_str("Press Ctrl+U to continue with the full set.\n");
        }
        text.push_str("Press Enter to finish, Ctrl+B to go back.");
        if let Some(Notice::Error(error)) = &self.notice {
            text.push_str(&format!("\n\n{error}"));
        }

        draw_centered(frame, " Complete ", &text, theme.success, theme);
    }
}

/// Text for the notice shown after a mode switch.
pub fn describe_switch(switch: &ModeSwitch) -> String {
    match switch.direction {
        SwitchDirection::Upgrade => format!(
            "Switched to the full set: {} already answered, {} to go.",
            switch.answered_count, switch.unanswered_count
        ),
        SwitchDirection::Downgrade => {
            "Switched to the lite set. Your other answers are kept.".to_string()
        }
        SwitchDirection::Unchanged | SwitchDirection::Fresh => {
            format!("Continuing the {} set.", switch.mode)
        }
    }
}

fn draw_progress<S: SessionStore>(
    frame: &mut Frame,
    area: Rect,
    questionnaire: &Questionnaire<S>,
    theme: &Theme,
) {
    let total = questionnaire.manifest().map_or(0, |m| m.len());
    let current = (questionnaire.cursor() + 1).min(total);
    let answered = questionnaire.stats().answered;
    let progress_text = format!(" {current} / {total}  ({answered} answered) ");

    let bar_width = area.width.saturating_sub(2);
    let text_width = (progress_text.chars().count() as u16).min(bar_width);

    let ratio = if total == 0 {
        0.0
    } else {
        current as f32 / total as f32
    };
    let filled_width = (ratio * bar_width as f32) as u16;

    let bar_y = area.y;
    let bar_x = area.x + 1;

    let track = "─".repeat(bar_width as usize);
    let track_widget = Paragraph::new(track).style(Style::default().fg(theme.border));
    frame.render_widget(track_widget, Rect::new(bar_x, bar_y, bar_width, 1));

    if filled_width > 0 {
        let filled = "━".repeat(filled_width as usize);
        let filled_widget = Paragraph::new(filled).style(Style::default().fg(theme.primary));
        frame.render_widget(filled_widget, Rect::new(bar_x, bar_y, filled_width, 1));
    }

    if area.height > 1 {
        let text_x = bar_x + (bar_width.saturating_sub(text_width)) / 2;
        let text_widget = Paragraph::new(progress_text).style(Style::default().fg(theme.secondary));
        frame.render_widget(text_widget, Rect::new(text_x, bar_y + 1, text_width, 1));
    }
}

fn draw_prompt<S: SessionStore>(
    frame: &mut Frame,
    area: Rect,
    questionnaire: &Questionnaire<S>,
    question: &Question,
    theme: &Theme,
) {
    let section = questionnaire
        .definition()
        .section(question.section_id())
        .map(|s| s.title.as_str())
        .filter(|title| !title.is_empty())
        .unwrap_or(question.section_id());
    let mut title = format!(" {} · {} ", section, question.id());
    if questionnaire.is_current_skipped() {
        title.push_str("(skipped) ");
    }

    let mut lines = vec![Line::from(question.title().to_string()).bold()];
    if !question.prompt().is_empty() {
        lines.push(Line::from(question.prompt().to_string()));
    }
    let prompt = Paragraph::new(lines)
        .style(Style::default().fg(theme.text))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.primary))
                .title(title)
                .title_style(Style::default().fg(theme.highlight)),
        );
    frame.render_widget(prompt, area);
}

fn field_block(title: String, focused: bool, theme: &Theme) -> Block<'static> {
    let border = if focused { theme.highlight } else { theme.border };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
        .title_style(Style::default().fg(theme.secondary))
}

fn draw_choice(frame: &mut Frame, area: Rect, list: &ChoiceList, theme: &Theme, focused: bool) {
    let mut items: Vec<ListItem> = list
        .options()
        .iter()
        .enumerate()
        .map(|(i, opt)| {
            let checked = list.is_checked(i);
            let mark = match (list.is_multiple(), checked) {
                (true, true) => "[✓]",
                (true, false) => "[ ]",
                (false, true) => "(•)",
                (false, false) => "( )",
            };
            let style = if focused && i == list.highlight() {
                Style::default().fg(theme.highlight).bold()
            } else if checked {
                Style::default().fg(theme.secondary)
            } else {
                Style::default().fg(theme.text)
            };
            ListItem::new(format!("  {} {}", mark, opt.label)).style(style)
        })
        .collect();
    if list.shows_other_row() {
        let style = if focused && list.on_other_row() {
            Style::default().fg(theme.highlight).bold()
        } else {
            Style::default().fg(theme.text)
        };
        items.push(ListItem::new(format!("      Other: {}", list.other().text())).style(style));
    }

    let title = if list.is_multiple() {
        match list.max() {
            Some(max) => format!(" Multi-Select ({}/{} selected) ", list.checked_count(), max),
            None => format!(" Multi-Select ({} selected) ", list.checked_count()),
        }
    } else {
        " Select Option ".to_string()
    };
    let widget = List::new(items)
        .block(field_block(title, focused, theme))
        .highlight_symbol("► ");

    let mut list_state = ListState::default();
    if focused {
        list_state.select(Some(list.highlight()));
    }
    frame.render_stateful_widget(widget, area, &mut list_state);
}

fn draw_text(
    frame: &mut Frame,
    area: Rect,
    input: &TextInput,
    theme: &Theme,
    title: &str,
    focused: bool,
) {
    let widget = Paragraph::new(input.text().to_string())
        .style(Style::default().fg(theme.text))
        .block(field_block(title.to_string(), focused, theme));
    frame.render_widget(widget, area);

    if focused {
        let (column, line) = input.cursor_position();
        let cursor_x = area.x + 1 + column as u16;
        let cursor_y = area.y + 1 + line as u16;
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

fn draw_ranked(frame: &mut Frame, area: Rect, list: &mut RankedList, theme: &Theme, focused: bool) {
    let title = format!(" Ranked ({} of {}) ", list.order().len(), list.options().len());
    let block = field_block(title, focused, theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    list.set_area(inner);

    let highlighted = |row: usize| focused && row == list.highlight();
    let mut lines: Vec<Line> = Vec::new();
    for (rank, value) in list.order().iter().enumerate() {
        let label = checkin::label_for(list.options(), value);
        let style = if list.dragged() == Some(rank) {
            Style::default().fg(theme.success).bold()
        } else if highlighted(rank) {
            Style::default().fg(theme.highlight).bold()
        } else {
            Style::default().fg(theme.text)
        };
        lines.push(Line::styled(format!("≡ {}. {}", rank + 1, label), style));
        for _ in 1..RANKED_ROW_HEIGHT {
            lines.push(Line::styled(
                "┄".repeat(usize::from(inner.width)),
                Style::default().fg(theme.border),
            ));
        }
    }

    let unranked = list.unranked();
    if !unranked.is_empty() {
        lines.push(Line::styled("Not ranked:", Style::default().fg(theme.secondary)));
        for (i, opt) in unranked.iter().enumerate() {
            let style = if highlighted(list.order().len() + i) {
                Style::default().fg(theme.highlight).bold()
            } else {
                Style::default().fg(theme.text)
            };
            lines.push(Line::styled(format!("  + {}", opt.label), style));
        }
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

/// Lines a field needs, borders included.
fn field_height(editor: &FieldEditor) -> u16 {
    match &editor.input {
        FieldInput::Text(_) | FieldInput::Number(_) => 3,
        FieldInput::Choice(list) => list.options().len() as u16 + 2 + u16::from(list.shows_other_row()),
        FieldInput::Ranked(list) => {
            let ranked = list.order().len() as u16 * RANKED_ROW_HEIGHT;
            let unranked = list.unranked().len() as u16;
            ranked + unranked + u16::from(unranked > 0) + 2
        }
    }
}

fn draw_compound(frame: &mut Frame, area: Rect, compound: &mut CompoundEditor, theme: &Theme) {
    let visible = compound.visible();
    let focus = compound.focus();
    let mut constraints: Vec<Constraint> = visible
        .iter()
        .map(|&i| Constraint::Length(field_height(&compound.fields()[i])))
        .collect();
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (row, &index) in visible.iter().enumerate() {
        let focused = index == focus;
        let editor = &mut compound.fields_mut()[index];
        let mut label = format!(" {} ", editor.field.display_label());
        if editor.field.optional {
            label.push_str("(optional) ");
        }
        match &mut editor.input {
            FieldInput::Text(input) => draw_text(frame, rows[row], input, theme, &label, focused),
            FieldInput::Number(input) => {
                if let checkin::FieldKind::Number(bounds) = &editor.field.kind {
                    match (bounds.min, bounds.max) {
                        (Some(min), Some(max)) => label.push_str(&format!("({min}-{max}) ")),
                        (Some(min), None) => label.push_str(&format!("(min {min}) ")),
                        (None, Some(max)) => label.push_str(&format!("(max {max}) ")),
                        (None, None) => {}
                    }
                }
                draw_text(frame, rows[row], input, theme, &label, focused);
            }
            FieldInput::Choice(list) => draw_choice(frame, rows[row], list, theme, focused),
            FieldInput::Ranked(list) => draw_ranked(frame, rows[row], list, theme, focused),
        }
    }
}

fn draw_intro<S: SessionStore>(frame: &mut Frame, questionnaire: &Questionnaire<S>, theme: &Theme) {
    let definition = questionnaire.definition();
    let intro = definition.intro();
    let title = intro
        .and_then(|i| i.title.clone())
        .unwrap_or_else(|| definition.title().to_string());
    let mut text = intro.and_then(|i| i.body.clone()).unwrap_or_default();
    if let Some(description) = &definition.display().description {
        text = format!("{description}\n\n{text}");
    }
    text.push_str("\n\nPress Enter to begin, Esc to leave.");

    draw_centered(frame, &format!(" {title} "), &text, theme.primary, theme);
}

fn draw_centered(frame: &mut Frame, title: &str, text: &str, accent: Color, theme: &Theme) {
    let area = frame.area();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent))
        .title(title.to_string())
        .title_style(Style::default().fg(accent).bold());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = Paragraph::new(text.to_string())
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    let centered = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Min(3),
            Constraint::Percentage(30),
        ])
        .split(inner);

    frame.render_widget(paragraph, centered[1]);
}

#[cfg(test)]
mod tests {
    use checkin::{MemoryStore, PhaseDefinition, Response, Selection};
    use ratatui::backend::TestBackend;

    use super::*;

    fn phase() -> PhaseDefinition {
        use checkin::{FreeTextQuestion, QuestionKind, SelectOption, SingleSelectQuestion};

        PhaseDefinition::new("phase_0", "Getting Started")
            .with_question(
                Question::new(
                    "q01",
                    "safety",
                    1,
                    "Bringing things up",
                    QuestionKind::SingleSelect(SingleSelectQuestion::new(vec![
                        SelectOption::new("yes", "Yes"),
                        SelectOption::new("no", "No"),
                    ])),
                )
                .with_prompt("Do you feel safe?"),
            )
            .with_question(
                Question::new(
                    "q02",
                    "safety",
                    2,
                    "A good moment",
                    QuestionKind::FreeText(FreeTextQuestion::new()),
                )
                .with_examples(vec!["We cooked dinner".to_string()]),
            )
            .with_manifest(Mode::Lite, &["q01"])
            .with_manifest(Mode::Full, &["q01", "q02"])
    }

    fn render(session: &mut WizardSession, questionnaire: &Questionnaire<MemoryStore>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|frame| session.draw(frame, questionnaire, &Theme::default()))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn wizard_creation() {
        let _wizard = Wizard::new();
        let _with_title = Wizard::new().with_title("Test");
        let _with_theme = Wizard::new().with_theme(Theme::default());
    }

    #[test]
    fn error_types() {
        let err = WizardError::Traversal(TraversalError::NotStarted);
        assert_eq!(
            err.to_string(),
            "Questionnaire has not been started; call init first"
        );

        let err = WizardError::Io(io::Error::other("broken pipe"));
        assert_eq!(err.to_string(), "I/O error: broken pipe");
    }

    #[test]
    fn theme_default() {
        let theme = Theme::default();
        assert_eq!(theme.primary, Color::Cyan);
        assert_eq!(theme.error, Color::Red);
        assert_eq!(theme.success, Color::Green);
    }

    #[test]
    fn renders_question_with_section_and_progress() {
        let mut questionnaire = Questionnaire::new(phase(), MemoryStore::new());
        questionnaire.init(Mode::Full).unwrap();
        let mut session = WizardSession::new(&questionnaire);

        let screen = render(&mut session, &questionnaire);

        assert!(screen.contains("Getting Started  [full]"));
        assert!(screen.contains("safety · q01"));
        assert!(screen.contains("Do you feel safe?"));
        assert!(screen.contains("1 / 2  (0 answered)"));
        assert!(screen.contains("( ) Yes"));
    }

    #[test]
    fn enter_on_last_question_shows_completion() {
        let mut questionnaire = Questionnaire::new(phase(), MemoryStore::new());
        questionnaire.init(Mode::Lite).unwrap();
        let mut session = WizardSession::new(&questionnaire);

        let outcome = session
            .handle_key(&mut questionnaire, press(KeyCode::Enter, KeyModifiers::NONE))
            .unwrap();

        assert_eq!(outcome, None);
        assert_eq!(session.screen(), Screen::Complete);
        assert_eq!(
            questionnaire.response("q01"),
            Some(&Response::SingleSelect(Selection::new("yes")))
        );
        let screen = render(&mut session, &questionnaire);
        assert!(screen.contains("Press Ctrl+U to continue with the full set."));
    }

    #[test]
    fn answered_question_cannot_be_skipped() {
        let mut questionnaire = Questionnaire::new(phase(), MemoryStore::new());
        questionnaire.init(Mode::Full).unwrap();
        questionnaire
            .save_response("q01", Response::SingleSelect(Selection::new("no")))
            .unwrap();
        let mut session = WizardSession::new(&questionnaire);

        let screen = render(&mut session, &questionnaire);
        assert!(!screen.contains("Ctrl+K: Skip"));
        assert!(screen.contains("Enter: Next"));

        session
            .handle_key(
                &mut questionnaire,
                press(KeyCode::Char('k'), KeyModifiers::CONTROL),
            )
            .unwrap();

        assert_eq!(questionnaire.current_id().unwrap().as_str(), "q01");
        assert_eq!(questionnaire.stats().skipped, 0);
    }

    #[test]
    fn text_input_shows_the_first_example() {
        let mut questionnaire = Questionnaire::new(phase(), MemoryStore::new());
        questionnaire.init(Mode::Full).unwrap();
        questionnaire.jump_to("q02");
        let mut session = WizardSession::new(&questionnaire);

        let screen = render(&mut session, &questionnaire);

        assert!(screen.contains("Your answer (e.g. We cooked dinner)"));
    }

    #[test]
    fn last_question_offers_finish() {
        let mut questionnaire = Questionnaire::new(phase(), MemoryStore::new());
        questionnaire.init(Mode::Lite).unwrap();
        let mut session = WizardSession::new(&questionnaire);

        let screen = render(&mut session, &questionnaire);

        assert!(screen.contains("Enter: Finish"));
        assert!(screen.contains("Ctrl+K: Skip"));
        assert!(!screen.contains("Enter: Next"));
    }

    #[test]
    fn upgrade_from_completion_lands_on_new_question() {
        let mut questionnaire = Questionnaire::new(phase(), MemoryStore::new());
        questionnaire.init(Mode::Lite).unwrap();
        let mut session = WizardSession::new(&questionnaire);
        session
            .handle_key(&mut questionnaire, press(KeyCode::Enter, KeyModifiers::NONE))
            .unwrap();

        session
            .handle_key(
                &mut questionnaire,
                press(KeyCode::Char('u'), KeyModifiers::CONTROL),
            )
            .unwrap();

        assert_eq!(session.screen(), Screen::Question);
        assert_eq!(questionnaire.current_id().unwrap().as_str(), "q02");
        assert_eq!(
            session.notice(),
            Some(&Notice::Info(
                "Switched to the full set: 1 already answered, 1 to go.".to_string()
            ))
        );
    }
}
