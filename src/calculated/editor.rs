//! Formula text editing with a cursor.

use crate::model::FieldRef;

/// Formula text plus a cursor, measured in characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaEditor {
    text: String,
    cursor: usize,
}

impl FormulaEditor {
    /// Start editing `text` with the cursor at its end.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamped to the text length.
    pub fn set_cursor(&mut self, position: usize) {
        self.cursor = position.min(self.text.chars().count());
    }

    /// Insert raw text at the cursor and move the cursor past it.
    pub fn insert_text(&mut self, s: &str) {
        let at = self.byte_offset();
        self.text.insert_str(at, s);
        self.cursor += s.chars().count();
    }

    /// Insert `[table.column]` (or `[calculated.name]`) at the cursor.
    pub fn insert_field(&mut self, field: &FieldRef) {
        self.insert_text(&field.formula_token());
    }

    pub fn into_text(self) -> String {
        self.text
    }

    fn byte_offset(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}
