//! Single-line text input for the dashboard forms.

/// A text input field. The cursor counts characters, not bytes.
#[derive(Clone, Debug, Default)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
    pub active: bool,
    /// Restrict input to ASCII digits.
    pub numeric: bool,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn numeric() -> Self {
        Self { numeric: true, ..Self::default() }
    }

    #[cfg(test)]
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
            ..Self::default()
        }
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    /// Insert a character at the cursor.
    pub fn handle_char(&mut self, c: char) {
        if self.numeric && !c.is_ascii_digit() {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_index(self.cursor - 1);
            self.value.remove(at);
            self.cursor -= 1;
        }
    }

    /// Delete the character under the cursor.
    pub fn handle_delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.len() {
            self.cursor += 1;
        }
    }

    /// Trimmed value, `None` when blank.
    pub fn trimmed(&self) -> Option<&str> {
        let v = self.value.trim();
        (!v.is_empty()).then_some(v)
    }

    /// Value with a cursor marker, for rendering the active field.
    pub fn display(&self) -> String {
        if !self.active {
            return self.value.clone();
        }
        let at = self.byte_index(self.cursor);
        format!("{}│{}", &self.value[..at], &self.value[at..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multibyte_editing() {
        let mut f = InputField::with_value("Miché");
        f.handle_backspace();
        assert_eq!(f.value, "Mich");
        f.move_cursor_left();
        f.handle_char('é');
        assert_eq!(f.value, "Miché".replace("hé", "éh"));
        f.handle_delete();
        assert_eq!(f.value, "Micé");
    }

    #[test]
    fn test_numeric_rejects_letters() {
        let mut f = InputField::numeric();
        for c in "1a2".chars() {
            f.handle_char(c);
        }
        assert_eq!(f.value, "12");
        assert_eq!(InputField::with_value("  ").trimmed(), None);
    }
}
