//! Answer editors, one per question kind.
//!
//! An [`Editor`] holds the in-progress answer for the question on screen. It
//! is seeded from the stored response, edited with the keyboard (and the
//! mouse, for ranked lists) and turned back into a [`Response`] on submit.

use std::collections::BTreeMap;
use std::time::Instant;

use checkin::ranked::{self, DragGesture, DropTarget, Placement, Point};
use checkin::{
    CompoundQuestion, Field, FieldKind, FieldValue, MultiSelection, Question, QuestionKind,
    RankedAnswer, Response, SelectOption, Selection,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

/// Terminal lines per ranked row: the label and a separator.
pub const RANKED_ROW_HEIGHT: u16 = 2;

/// Columns at the start of a ranked row that act as the drag handle.
pub const HANDLE_WIDTH: u16 = 2;

/// A single- or multi-line text buffer with a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    text: String,
    /// Cursor position in chars.
    cursor: usize,
}

impl TextInput {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The trimmed text, or `None` when blank.
    pub fn value(&self) -> Option<String> {
        (!self.is_blank()).then(|| self.text.trim().to_string())
    }

    /// Cursor as (column, line), for placing the terminal cursor.
    pub fn cursor_position(&self) -> (usize, usize) {
        let before: String = self.text.chars().take(self.cursor).collect();
        let line = before.matches('\n').count();
        let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count());
        (column, line)
    }

    /// Apply an editing key. Returns whether the key was used.
    ///
    /// In multi-line mode Alt+Enter inserts a line break; plain Enter is left
    /// to the caller.
    pub fn handle_key(&mut self, key: KeyEvent, multiline: bool) -> bool {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert(c);
                true
            }
            KeyCode::Enter if multiline && key.modifiers.contains(KeyModifiers::ALT) => {
                self.insert('\n');
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let index = self.byte_index();
                    self.text.remove(index);
                }
                true
            }
            KeyCode::Delete => {
                if self.cursor < self.len() {
                    let index = self.byte_index();
                    self.text.remove(index);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.len());
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.len();
                true
            }
            _ => false,
        }
    }

    fn insert(&mut self, c: char) {
        let index = self.byte_index();
        self.text.insert(index, c);
        self.cursor += 1;
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor)
            .map_or(self.text.len(), |(index, _)| index)
    }
}

/// A checkable list of options, used for single and multi select.
///
/// When the "other" option is checked (and other text is enabled) an extra
/// text row follows the options; while it is highlighted, keys edit the text.
#[derive(Debug, Clone)]
pub struct ChoiceList {
    options: Vec<SelectOption>,
    checked: Vec<bool>,
    highlight: usize,
    multiple: bool,
    min: Option<usize>,
    max: Option<usize>,
    other_row: bool,
    other: TextInput,
    notes: Option<String>,
}

impl ChoiceList {
    pub fn single(options: &[SelectOption], selected: Option<&str>) -> Self {
        let selected: Vec<String> = selected.map(str::to_string).into_iter().collect();
        Self::build(options, false, &selected)
    }

    pub fn multiple(options: &[SelectOption], selected: &[String]) -> Self {
        Self::build(options, true, selected)
    }

    fn build(options: &[SelectOption], multiple: bool, selected: &[String]) -> Self {
        let checked: Vec<bool> = options
            .iter()
            .map(|opt| selected.contains(&opt.value))
            .collect();
        let highlight = checked.iter().position(|&c| c).unwrap_or(0);
        Self {
            options: options.to_vec(),
            checked,
            highlight,
            multiple,
            min: None,
            max: None,
            other_row: false,
            other: TextInput::default(),
            notes: None,
        }
    }

    pub fn with_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Enable the "other" text row, seeded with `text`.
    pub fn with_other_text(mut self, text: Option<&str>) -> Self {
        self.other_row = true;
        self.other = TextInput::new(text.unwrap_or_default());
        self
    }

    /// Notes are not editable here but survive the round trip.
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn is_checked(&self, index: usize) -> bool {
        self.checked.get(index).copied().unwrap_or(false)
    }

    pub fn checked_count(&self) -> usize {
        self.checked.iter().filter(|&&c| c).count()
    }

    pub fn highlight(&self) -> usize {
        self.highlight
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn other(&self) -> &TextInput {
        &self.other
    }

    /// Whether the "other" text row is shown.
    pub fn shows_other_row(&self) -> bool {
        self.other_row
            && self
                .options
                .iter()
                .zip(&self.checked)
                .any(|(opt, &checked)| checked && opt.is_other())
    }

    /// Whether the highlight is on the "other" text row.
    pub fn on_other_row(&self) -> bool {
        self.shows_other_row() && self.highlight == self.options.len()
    }

    fn rows(&self) -> usize {
        self.options.len() + usize::from(self.shows_other_row())
    }

    pub fn selected_values(&self) -> Vec<String> {
        self.options
            .iter()
            .zip(&self.checked)
            .filter(|(_, checked)| **checked)
            .map(|(opt, _)| opt.value.clone())
            .collect()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<(), String> {
        if self.on_other_row() && !matches!(key.code, KeyCode::Up | KeyCode::Down) {
            self.other.handle_key(key, false);
            return Ok(());
        }
        match key.code {
            KeyCode::Up => self.highlight = self.highlight.saturating_sub(1),
            KeyCode::Down => {
                self.highlight = (self.highlight + 1).min(self.rows().saturating_sub(1));
            }
            KeyCode::Char(' ') => self.toggle(self.highlight)?,
            _ => {}
        }
        Ok(())
    }

    /// Check or uncheck option `index`.
    ///
    /// Single select behaves like radio buttons. Multi select refuses to go
    /// past its maximum.
    pub fn toggle(&mut self, index: usize) -> Result<(), String> {
        if index >= self.options.len() {
            return Ok(());
        }
        if !self.multiple {
            for (i, checked) in self.checked.iter_mut().enumerate() {
                *checked = i == index;
            }
            return Ok(());
        }
        if !self.checked[index]
            && let Some(max) = self.max
            && self.checked_count() >= max
        {
            return Err(format!("Choose at most {max}."));
        }
        self.checked[index] = !self.checked[index];
        self.highlight = self.highlight.min(self.rows().saturating_sub(1));
        Ok(())
    }

    /// For single select: check the highlighted option if nothing is checked.
    pub fn choose_highlighted(&mut self) {
        if !self.multiple && self.checked_count() == 0 && self.highlight < self.options.len() {
            self.checked[self.highlight] = true;
        }
    }

    fn other_text(&self) -> Option<String> {
        let has_other_option = self.options.iter().any(SelectOption::is_other);
        if has_other_option && !self.shows_other_row() {
            None
        } else {
            self.other.value()
        }
    }

    pub fn selection(&self) -> Selection {
        Selection {
            selected_value: self.selected_values().into_iter().next().unwrap_or_default(),
            other_text: self.other_text(),
            notes: self.notes.clone(),
        }
    }

    pub fn multi_selection(&self) -> Result<MultiSelection, String> {
        let count = self.checked_count();
        if let Some(min) = self.min
            && count > 0
            && count < min
        {
            return Err(format!("Choose at least {min}."));
        }
        Ok(MultiSelection {
            selected_values: self.selected_values(),
            other_text: self.other_text(),
            notes: self.notes.clone(),
        })
    }
}

/// Where a pointer landed inside a [`RankedList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hit {
    Ranked(usize),
    Header,
    Unranked(usize),
}

/// A ranked-choice list: ranked values first, then the unranked options.
///
/// Each ranked row is [`RANKED_ROW_HEIGHT`] lines tall, followed by a
/// "Not ranked" header line and one line per unranked option. Keyboard and
/// mouse both reorder through [`ranked::move_item`].
#[derive(Debug, Clone)]
pub struct RankedList {
    options: Vec<SelectOption>,
    order: Vec<String>,
    highlight: usize,
    max: Option<usize>,
    gesture: DragGesture,
    area: Option<Rect>,
}

impl RankedList {
    pub fn new(options: &[SelectOption], max: Option<usize>, order: &[String]) -> Self {
        Self {
            options: options.to_vec(),
            order: order.to_vec(),
            highlight: 0,
            max,
            gesture: DragGesture::new().with_tolerance(1.0),
            area: None,
        }
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn unranked(&self) -> Vec<&SelectOption> {
        ranked::unranked(&self.options, &self.order)
    }

    pub fn highlight(&self) -> usize {
        self.highlight
    }

    /// The ranked index being dragged, if any.
    pub fn dragged(&self) -> Option<usize> {
        self.gesture.dragged()
    }

    /// Remember where the list was drawn, for mouse hit testing.
    pub fn set_area(&mut self, area: Rect) {
        self.area = Some(area);
    }

    fn row_count(&self) -> usize {
        self.order.len() + self.unranked().len()
    }

    fn row_value(&self, row: usize) -> Option<String> {
        if let Some(value) = self.order.get(row) {
            return Some(value.clone());
        }
        self.unranked()
            .get(row - self.order.len())
            .map(|opt| opt.value.clone())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<(), String> {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Up if shift => self.move_highlighted(-1),
            KeyCode::Down if shift => self.move_highlighted(1),
            KeyCode::Up => self.highlight = self.highlight.saturating_sub(1),
            KeyCode::Down => {
                self.highlight = (self.highlight + 1).min(self.row_count().saturating_sub(1));
            }
            KeyCode::Char(' ') => self.toggle_highlighted()?,
            _ => {}
        }
        Ok(())
    }

    /// Rank or unrank the highlighted row.
    pub fn toggle_highlighted(&mut self) -> Result<(), String> {
        let Some(value) = self.row_value(self.highlight) else {
            return Ok(());
        };
        if !self.order.contains(&value)
            && let Some(max) = self.max
            && self.order.len() >= max
        {
            return Err(format!("Rank at most {max}."));
        }
        if ranked::toggle(&mut self.order, &value) {
            self.highlight = self.order.len() - 1;
        } else {
            self.highlight = self.highlight.min(self.row_count().saturating_sub(1));
        }
        Ok(())
    }

    fn move_highlighted(&mut self, step: isize) {
        let index = self.highlight;
        let Some(value) = self.order.get(index).cloned() else {
            return;
        };
        let (neighbour, placement) = match step {
            -1 if index > 0 => (index - 1, Placement::Before),
            1 if index + 1 < self.order.len() => (index + 1, Placement::After),
            _ => return,
        };
        let target = DropTarget::Item {
            value: self.order[neighbour].clone(),
            placement,
        };
        if ranked::move_item(&mut self.order, &value, &target) {
            self.highlight = neighbour;
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) -> Result<(), String> {
        let Some(area) = self.area else {
            return Ok(());
        };
        let at = Point::new(f32::from(mouse.column), f32::from(mouse.row));
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => match self.hit(mouse.column, mouse.row) {
                Some(Hit::Ranked(index)) => {
                    self.highlight = index;
                    let on_handle = mouse.column < area.x + HANDLE_WIDTH;
                    self.gesture.press(index, at, on_handle, now);
                }
                Some(Hit::Unranked(index)) => {
                    self.highlight = self.order.len() + index;
                    self.toggle_highlighted()?;
                }
                Some(Hit::Header) | None => {}
            },
            MouseEventKind::Drag(MouseButton::Left) => {
                self.gesture.move_to(at, now);
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(drop) = self.gesture.release(at, now) {
                    self.drop_at(drop.item, mouse.row, area);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Arm a held press once the hold delay has passed.
    pub fn tick(&mut self, now: Instant) {
        self.gesture.tick(now);
    }

    fn hit(&self, column: u16, row: u16) -> Option<Hit> {
        let area = self.area?;
        if column < area.x
            || column >= area.x + area.width
            || row < area.y
            || row >= area.y + area.height
        {
            return None;
        }
        let y = usize::from(row - area.y);
        let ranked_lines = self.order.len() * usize::from(RANKED_ROW_HEIGHT);
        if y < ranked_lines {
            return Some(Hit::Ranked(y / usize::from(RANKED_ROW_HEIGHT)));
        }
        let unranked = self.unranked().len();
        if unranked == 0 {
            return None;
        }
        match y - ranked_lines {
            0 => Some(Hit::Header),
            n if n - 1 < unranked => Some(Hit::Unranked(n - 1)),
            _ => None,
        }
    }

    fn drop_target(&self, row: u16, area: Rect) -> DropTarget {
        let Some(first) = self.order.first() else {
            return DropTarget::End;
        };
        if row < area.y {
            return DropTarget::Item {
                value: first.clone(),
                placement: Placement::Before,
            };
        }
        let index = usize::from((row - area.y) / RANKED_ROW_HEIGHT);
        match self.order.get(index) {
            Some(value) => {
                let top = area.y + index as u16 * RANKED_ROW_HEIGHT;
                DropTarget::Item {
                    value: value.clone(),
                    placement: Placement::from_pointer(
                        f32::from(row),
                        f32::from(top),
                        f32::from(RANKED_ROW_HEIGHT),
                    ),
                }
            }
            None => DropTarget::End,
        }
    }

    fn drop_at(&mut self, item: usize, row: u16, area: Rect) {
        let Some(dragged) = self.order.get(item).cloned() else {
            return;
        };
        let target = self.drop_target(row, area);
        if ranked::move_item(&mut self.order, &dragged, &target) {
            tracing::debug!(value = %dragged, ?target, "reordered by drag");
            if let Some(index) = self.order.iter().position(|v| *v == dragged) {
                self.highlight = index;
            }
        }
    }
}

/// The input widget behind one compound field.
#[derive(Debug, Clone)]
pub enum FieldInput {
    Text(TextInput),
    Number(TextInput),
    Choice(ChoiceList),
    Ranked(RankedList),
}

#[derive(Debug, Clone)]
pub struct FieldEditor {
    pub field: Field,
    pub input: FieldInput,
}

impl FieldEditor {
    fn new(field: &Field, value: Option<&FieldValue>) -> Self {
        let text = value.and_then(FieldValue::as_text);
        let list = value.and_then(FieldValue::as_list).unwrap_or_default();
        let input = match &field.kind {
            FieldKind::SingleSelect(q) => FieldInput::Choice(ChoiceList::single(&q.options, text)),
            FieldKind::MultiSelect(q) => FieldInput::Choice(
                ChoiceList::multiple(&q.options, list)
                    .with_bounds(q.min_selected(), q.max_selected()),
            ),
            FieldKind::RankedSelect(q) => {
                FieldInput::Ranked(RankedList::new(&q.options, q.max_selected(), list))
            }
            FieldKind::FreeText => FieldInput::Text(TextInput::new(text.unwrap_or_default())),
            FieldKind::Number(_) => FieldInput::Number(TextInput::new(match value {
                Some(FieldValue::Number(n)) => n.to_string(),
                Some(FieldValue::Text(t)) => t.clone(),
                _ => String::new(),
            })),
        };
        Self {
            field: field.clone(),
            input,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<(), String> {
        match &mut self.input {
            FieldInput::Text(input) => {
                input.handle_key(key, false);
            }
            FieldInput::Number(input) => {
                if let KeyCode::Char(c) = key.code
                    && !(c.is_ascii_digit() || c == '.' || c == '-')
                {
                    return Ok(());
                }
                input.handle_key(key, false);
            }
            FieldInput::Choice(list) => list.handle_key(key)?,
            FieldInput::Ranked(list) => list.handle_key(key)?,
        }
        Ok(())
    }

    /// The current value, ignoring numbers that do not parse.
    pub fn current(&self) -> Option<FieldValue> {
        match &self.input {
            FieldInput::Text(input) => input.value().map(FieldValue::Text),
            FieldInput::Number(input) => input.text().trim().parse().ok().map(FieldValue::Number),
            FieldInput::Choice(list) if list.is_multiple() => {
                let values = list.selected_values();
                (!values.is_empty()).then_some(FieldValue::List(values))
            }
            FieldInput::Choice(list) => list.selected_values().into_iter().next().map(FieldValue::Text),
            FieldInput::Ranked(list) => {
                (!list.order().is_empty()).then(|| FieldValue::List(list.order().to_vec()))
            }
        }
    }

    /// The value to save, checking numbers against their bounds.
    fn value(&self) -> Result<Option<FieldValue>, String> {
        let label = self.field.display_label();
        match (&self.input, &self.field.kind) {
            (FieldInput::Number(input), FieldKind::Number(bounds)) => {
                let text = input.text().trim();
                if text.is_empty() {
                    return Ok(None);
                }
                let n: f64 = text
                    .parse()
                    .map_err(|_| format!("{label}: enter a number"))?;
                if let Some(min) = bounds.min
                    && n < min
                {
                    return Err(format!("{label}: must be at least {min}"));
                }
                if let Some(max) = bounds.max
                    && n > max
                {
                    return Err(format!("{label}: must be at most {max}"));
                }
                Ok(Some(FieldValue::Number(n)))
            }
            (FieldInput::Choice(list), _) if list.is_multiple() => {
                let selection = list.multi_selection()?;
                Ok((!selection.selected_values.is_empty())
                    .then_some(FieldValue::List(selection.selected_values)))
            }
            _ => Ok(self.current()),
        }
    }
}

/// Editor for a compound question: one [`FieldEditor`] per field, of which
/// only the visible ones are shown and saved.
#[derive(Debug, Clone)]
pub struct CompoundEditor {
    fields: Vec<FieldEditor>,
    focus: usize,
    /// Stored values with no matching field, kept as they were.
    extra: BTreeMap<String, FieldValue>,
}

impl CompoundEditor {
    pub fn new(question: &CompoundQuestion, values: Option<&BTreeMap<String, FieldValue>>) -> Self {
        let fields: Vec<FieldEditor> = question
            .fields
            .iter()
            .map(|field| FieldEditor::new(field, values.and_then(|v| v.get(&field.key))))
            .collect();
        let extra = values
            .map(|values| {
                values
                    .iter()
                    .filter(|(key, _)| question.field(key).is_none())
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let mut editor = Self {
            fields,
            focus: 0,
            extra,
        };
        editor.refocus();
        editor
    }

    pub fn fields(&self) -> &[FieldEditor] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [FieldEditor] {
        &mut self.fields
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focused_mut(&mut self) -> Option<&mut FieldEditor> {
        self.fields.get_mut(self.focus)
    }

    /// Current values of all fields, used for `showWhen`.
    pub fn values(&self) -> BTreeMap<String, FieldValue> {
        self.fields
            .iter()
            .filter_map(|f| f.current().map(|value| (f.field.key.clone(), value)))
            .collect()
    }

    /// Indexes of the currently visible fields.
    pub fn visible(&self) -> Vec<usize> {
        let values = self.values();
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.field.is_visible(&values))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<(), String> {
        match key.code {
            KeyCode::Tab => self.cycle(true),
            KeyCode::BackTab => self.cycle(false),
            _ => {
                let result = match self.fields.get_mut(self.focus) {
                    Some(field) => field.handle_key(key),
                    None => Ok(()),
                };
                self.refocus();
                result?;
            }
        }
        Ok(())
    }

    fn cycle(&mut self, forward: bool) {
        let visible = self.visible();
        if visible.is_empty() {
            return;
        }
        let len = visible.len();
        self.focus = match visible.iter().position(|&i| i == self.focus) {
            Some(pos) if forward => visible[(pos + 1) % len],
            Some(pos) => visible[(pos + len - 1) % len],
            None => visible[0],
        };
    }

    fn refocus(&mut self) {
        let visible = self.visible();
        if !visible.contains(&self.focus)
            && let Some(&first) = visible.first()
        {
            self.focus = first;
        }
    }

    /// Values of the visible fields, plus any unmatched stored values.
    pub fn response(&self) -> Result<BTreeMap<String, FieldValue>, String> {
        let mut values = self.extra.clone();
        for index in self.visible() {
            let editor = &self.fields[index];
            if let Some(value) = editor.value()? {
                values.insert(editor.field.key.clone(), value);
            }
        }
        Ok(values)
    }
}

/// The in-progress answer for one question.
#[derive(Debug, Clone)]
pub enum Editor {
    Single(ChoiceList),
    Multi(ChoiceList),
    Ranked { key: String, list: RankedList },
    Text(TextInput),
    Compound(CompoundEditor),
}

impl Editor {
    /// Build the editor for `question`, seeded from `existing`.
    ///
    /// A response of the wrong shape is ignored.
    pub fn for_question(question: &Question, existing: Option<&Response>) -> Self {
        match question.kind() {
            QuestionKind::SingleSelect(q) => {
                let selection = match existing {
                    Some(Response::SingleSelect(s)) => Some(s),
                    _ => None,
                };
                Self::Single(
                    ChoiceList::single(&q.options, selection.map(|s| s.selected_value.as_str()))
                        .with_other_text(selection.and_then(|s| s.other_text.as_deref()))
                        .with_notes(selection.and_then(|s| s.notes.clone())),
                )
            }
            QuestionKind::MultiSelect(q) => {
                let selection = match existing {
                    Some(Response::MultiSelect(s)) => Some(s),
                    _ => None,
                };
                let values = selection.map_or(&[][..], |s| s.selected_values.as_slice());
                Self::Multi(
                    ChoiceList::multiple(&q.options, values)
                        .with_bounds(q.min_selected(), q.max_selected())
                        .with_other_text(selection.and_then(|s| s.other_text.as_deref()))
                        .with_notes(selection.and_then(|s| s.notes.clone())),
                )
            }
            QuestionKind::RankedSelect(q) => {
                let values = match existing {
                    Some(Response::Ranked(r)) => r.values.as_slice(),
                    _ => &[][..],
                };
                Self::Ranked {
                    key: q.answer_key().to_string(),
                    list: RankedList::new(&q.options, q.max_selected(), values),
                }
            }
            QuestionKind::FreeText(_) => Self::Text(TextInput::new(match existing {
                Some(Response::FreeText(text)) => text.clone(),
                _ => String::new(),
            })),
            QuestionKind::Compound(q) => Self::Compound(CompoundEditor::new(
                q,
                match existing {
                    Some(Response::Compound(values)) => Some(values),
                    _ => None,
                },
            )),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<(), String> {
        match self {
            Self::Single(list) | Self::Multi(list) => list.handle_key(key),
            Self::Ranked { list, .. } => list.handle_key(key),
            Self::Text(input) => {
                input.handle_key(key, true);
                Ok(())
            }
            Self::Compound(compound) => compound.handle_key(key),
        }
    }

    /// The ranked list that takes mouse input, if any.
    pub fn ranked_mut(&mut self) -> Option<&mut RankedList> {
        match self {
            Self::Ranked { list, .. } => Some(list),
            Self::Compound(compound) => match compound.focused_mut() {
                Some(FieldEditor {
                    input: FieldInput::Ranked(list),
                    ..
                }) => Some(list),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) -> Result<(), String> {
        match self.ranked_mut() {
            Some(list) => list.handle_mouse(mouse, now),
            None => Ok(()),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(list) = self.ranked_mut() {
            list.tick(now);
        }
    }

    /// Called before [`response`](Self::response) when the user confirms.
    pub fn prepare_submit(&mut self) {
        if let Self::Single(list) = self {
            list.choose_highlighted();
        }
    }

    /// The edited answer. It may be empty; check [`Response::has_content`].
    pub fn response(&self) -> Result<Response, String> {
        Ok(match self {
            Self::Single(list) => Response::SingleSelect(list.selection()),
            Self::Multi(list) => Response::MultiSelect(list.multi_selection()?),
            Self::Ranked { key, list } => Response::Ranked(RankedAnswer {
                key: key.clone(),
                values: list.order().to_vec(),
            }),
            Self::Text(input) => Response::FreeText(input.text().trim().to_string()),
            Self::Compound(compound) => Response::Compound(compound.response()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use checkin::{Condition, NumberField, RankedSelectQuestion, SingleSelectQuestion};

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn shift(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::SHIFT)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn options(values: &[&str]) -> Vec<SelectOption> {
        values
            .iter()
            .map(|v| SelectOption::new(*v, v.to_uppercase()))
            .collect()
    }

    fn abc() -> RankedList {
        let order: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let mut list = RankedList::new(&options(&["a", "b", "c", "d"]), None, &order);
        list.set_area(Rect::new(0, 0, 30, 12));
        list
    }

    #[test]
    fn text_input_edits_at_cursor() {
        let mut input = TextInput::new("héllo");
        input.handle_key(key(KeyCode::Left), false);
        input.handle_key(key(KeyCode::Backspace), false);
        input.handle_key(key(KeyCode::Char('L')), false);
        assert_eq!(input.text(), "hélLo");

        input.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT), true);
        assert_eq!(input.text(), "hélL\no");
        assert_eq!(input.cursor_position(), (0, 1));
    }

    #[test]
    fn multi_select_enforces_max() {
        let mut list = ChoiceList::multiple(&options(&["a", "b", "c"]), &[]).with_bounds(None, Some(2));
        list.handle_key(key(KeyCode::Char(' '))).unwrap();
        list.handle_key(key(KeyCode::Down)).unwrap();
        list.handle_key(key(KeyCode::Char(' '))).unwrap();
        list.handle_key(key(KeyCode::Down)).unwrap();

        let err = list.handle_key(key(KeyCode::Char(' '))).unwrap_err();
        assert_eq!(err, "Choose at most 2.");
        assert_eq!(list.selected_values(), vec!["a", "b"]);
    }

    #[test]
    fn other_row_edits_other_text() {
        let mut list = ChoiceList::single(&options(&["yes", "other"]), None).with_other_text(None);
        list.handle_key(key(KeyCode::Down)).unwrap();
        list.handle_key(key(KeyCode::Char(' '))).unwrap();
        assert!(list.shows_other_row());

        list.handle_key(key(KeyCode::Down)).unwrap();
        assert!(list.on_other_row());
        for c in "it varies".chars() {
            list.handle_key(key(KeyCode::Char(c))).unwrap();
        }

        let selection = list.selection();
        assert_eq!(selection.selected_value, "other");
        assert_eq!(selection.other_text.as_deref(), Some("it varies"));
    }

    #[test]
    fn single_select_confirms_highlight() {
        let question = Question::new(
            "q01",
            "s",
            1,
            "Safe",
            QuestionKind::SingleSelect(SingleSelectQuestion::new(options(&["yes", "no"]))),
        );
        let mut editor = Editor::for_question(&question, None);
        editor.handle_key(key(KeyCode::Down)).unwrap();
        editor.prepare_submit();

        assert_eq!(
            editor.response().unwrap(),
            Response::SingleSelect(Selection::new("no"))
        );
    }

    #[test]
    fn shift_arrows_reorder_ranked() {
        let mut list = abc();
        list.handle_key(key(KeyCode::Down)).unwrap();
        list.handle_key(shift(KeyCode::Up)).unwrap();
        assert_eq!(list.order(), ["b", "a", "c"]);
        assert_eq!(list.highlight(), 0);

        // The unranked "d" sits after the ranked rows.
        list.handle_key(key(KeyCode::Down)).unwrap();
        list.handle_key(key(KeyCode::Down)).unwrap();
        list.handle_key(key(KeyCode::Down)).unwrap();
        list.handle_key(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(list.order(), ["b", "a", "c", "d"]);
    }

    #[test]
    fn handle_drag_moves_last_to_first() {
        let mut list = abc();
        let now = Instant::now();

        // "c" is the third ranked row, lines 4 and 5; column 0 is its handle.
        list.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 0, 4), now)
            .unwrap();
        assert_eq!(list.dragged(), Some(2));
        list.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 0, 2), now)
            .unwrap();
        list.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 0, 0), now)
            .unwrap();

        assert_eq!(list.order(), ["c", "a", "b"]);
        assert_eq!(list.highlight(), 0);
    }

    #[test]
    fn held_press_drops_after_target() {
        let mut list = abc();
        let now = Instant::now();

        list.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 8, 0), now)
            .unwrap();
        assert_eq!(list.dragged(), None);
        list.tick(now + Duration::from_millis(400));
        assert_eq!(list.dragged(), Some(0));

        // Line 3 is the separator below "b": drop after it.
        list.handle_mouse(
            mouse(MouseEventKind::Up(MouseButton::Left), 8, 3),
            now + Duration::from_millis(500),
        )
        .unwrap();
        assert_eq!(list.order(), ["b", "a", "c"]);
    }

    #[test]
    fn early_movement_is_a_scroll() {
        let mut list = abc();
        let now = Instant::now();

        list.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 8, 0), now)
            .unwrap();
        list.handle_mouse(
            mouse(MouseEventKind::Drag(MouseButton::Left), 8, 4),
            now + Duration::from_millis(50),
        )
        .unwrap();
        list.handle_mouse(
            mouse(MouseEventKind::Up(MouseButton::Left), 8, 5),
            now + Duration::from_millis(600),
        )
        .unwrap();

        assert_eq!(list.order(), ["a", "b", "c"]);
    }

    #[test]
    fn clicking_unranked_option_ranks_it() {
        let mut list = abc();
        // Ranked rows take lines 0..6, line 6 is the header, "d" is line 7.
        list.handle_mouse(
            mouse(MouseEventKind::Down(MouseButton::Left), 5, 7),
            Instant::now(),
        )
        .unwrap();
        assert_eq!(list.order(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn ranked_max_is_enforced() {
        let question = RankedSelectQuestion {
            max: Some(1),
            ..RankedSelectQuestion::new(options(&["a", "b"]))
        };
        let mut list = RankedList::new(&question.options, question.max_selected(), &[]);
        list.toggle_highlighted().unwrap();
        list.handle_key(key(KeyCode::Down)).unwrap();
        assert_eq!(list.toggle_highlighted().unwrap_err(), "Rank at most 1.");
    }

    fn rhythm() -> CompoundQuestion {
        CompoundQuestion::new(vec![
            Field::new(
                "frequency",
                "How often",
                FieldKind::SingleSelect(SingleSelectQuestion::new(options(&["weekly", "never"]))),
            ),
            Field::new(
                "minutes",
                "Minutes",
                FieldKind::Number(NumberField {
                    min: Some(5.0),
                    max: Some(240.0),
                }),
            )
            .with_show_when("frequency", Condition::Equals("weekly".into())),
        ])
    }

    #[test]
    fn compound_reveals_and_validates_fields() {
        let mut editor = CompoundEditor::new(&rhythm(), None);
        assert_eq!(editor.visible(), vec![0]);

        editor.handle_key(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(editor.visible(), vec![0, 1]);

        editor.handle_key(key(KeyCode::Tab)).unwrap();
        assert_eq!(editor.focus(), 1);
        editor.handle_key(key(KeyCode::Char('x'))).unwrap();
        editor.handle_key(key(KeyCode::Char('3'))).unwrap();
        assert_eq!(editor.response().unwrap_err(), "Minutes: must be at least 5");

        editor.handle_key(key(KeyCode::Char('0'))).unwrap();
        let values = editor.response().unwrap();
        assert_eq!(values.get("frequency"), Some(&FieldValue::from("weekly")));
        assert_eq!(values.get("minutes"), Some(&FieldValue::Number(30.0)));
    }

    #[test]
    fn hidden_fields_are_not_saved() {
        let mut stored = BTreeMap::new();
        stored.insert("frequency".to_string(), FieldValue::from("never"));
        stored.insert("minutes".to_string(), FieldValue::Number(30.0));
        stored.insert("legacy".to_string(), FieldValue::from("kept"));

        let editor = CompoundEditor::new(&rhythm(), Some(&stored));
        let values = editor.response().unwrap();

        assert!(!values.contains_key("minutes"));
        assert_eq!(values.get("legacy"), Some(&FieldValue::from("kept")));
    }
}
