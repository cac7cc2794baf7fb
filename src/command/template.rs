//! Parameter templates (spec.md §4.H stage 2): `$_` markers are replaced
//! with a single underscore each, and execution is gated on every marker
//! being filled. Tab/shift-tab navigation between markers and "first
//! insertion at a cursor marks it set" live here; the console glue
//! (Module K) drives this state from key bindings.

const MARKER: &str = "$_";

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateResult {
    /// No markers; the text can proceed straight to expansion.
    Ready(String),
    /// At least one marker; the editor must gather input before dispatch.
    Pending(TemplateState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateState {
    text: String,
    filled: Vec<bool>,
    cursor: usize,
}

impl TemplateState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn marker_count(&self) -> usize {
        self.filled.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn all_set(&self) -> bool {
        self.filled.iter().all(|&f| f)
    }

    /// Marks the marker at the current cursor as filled (first insertion
    /// at that position).
    pub fn fill_current(&mut self) {
        if let Some(slot) = self.filled.get_mut(self.cursor) {
            *slot = true;
        }
    }

    pub fn next_marker(&mut self) -> usize {
        if !self.filled.is_empty() {
            self.cursor = (self.cursor + 1) % self.filled.len();
        }
        self.cursor
    }

    pub fn prev_marker(&mut self) -> usize {
        if !self.filled.is_empty() {
            self.cursor = (self.cursor + self.filled.len() - 1) % self.filled.len();
        }
        self.cursor
    }
}

pub fn apply_template(input: &str) -> TemplateResult {
    let marker_count = input.matches(MARKER).count();
    if marker_count == 0 {
        return TemplateResult::Ready(input.to_string());
    }

    TemplateResult::Pending(TemplateState {
        text: input.replace(MARKER, "_"),
        filled: vec![false; marker_count],
        cursor: 0,
    })
}
