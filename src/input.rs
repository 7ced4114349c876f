use unicode_width::UnicodeWidthChar;

/// Editable query text with a cursor counted in chars, not bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        // Terminals deliver pasted newlines as \r or \r\n.
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    chars.next_if_eq(&'\n');
                    self.insert_newline();
                }
                c => self.insert_char(c),
            }
        }
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    /// Start of the current line.
    pub fn move_home(&mut self) {
        let (_, col) = self.cursor_line_col();
        self.cursor -= col;
    }

    /// End of the current line.
    pub fn move_end(&mut self) {
        let rest = self.text.chars().skip(self.cursor).take_while(|&c| c != '\n').count();
        self.cursor += rest;
    }

    /// Empties the buffer and hands back what was typed.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn clear(&mut self) {
        self.take();
    }

    /// Terminal columns between the start of the cursor's line and the cursor.
    pub fn cursor_display_col(&self) -> usize {
        let (_, col) = self.cursor_line_col();
        self.text
            .chars()
            .take(self.cursor)
            .skip(self.cursor - col)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    /// Zero-based (line, column) of the cursor, both in chars.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for c in self.text.chars().take(self.cursor) {
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(s: &str) -> InputBuffer {
        let mut input = InputBuffer::new();
        input.insert_str(s);
        input
    }

    #[test]
    fn editing_handles_multibyte_chars() {
        let mut input = typed("héllo👋");
        assert_eq!(input.cursor, 6);
        input.backspace();
        assert_eq!(input.text(), "héllo");
        input.move_left();
        input.move_left();
        input.move_left();
        input.move_left();
        input.delete();
        assert_eq!(input.text(), "hllo");
        input.insert_char('é');
        assert_eq!(input.text(), "héllo");
    }

    #[test]
    fn newline_and_cursor_position() {
        let mut input = typed("first");
        input.insert_newline();
        input.insert_str("se");
        assert_eq!(input.text(), "first\nse");
        assert_eq!(input.line_count(), 2);
        assert_eq!(input.cursor_line_col(), (1, 2));

        input.move_home();
        assert_eq!(input.cursor_line_col(), (1, 0));
        input.move_left();
        assert_eq!(input.cursor_line_col(), (0, 5));
        input.move_home();
        input.move_end();
        assert_eq!(input.cursor, 5);
    }

    #[test]
    fn paste_drops_carriage_returns() {
        let input = typed("a\r\nb");
        assert_eq!(input.text(), "a\nb");
    }

    #[test]
    fn display_column_counts_wide_chars_twice() {
        let mut input = typed("ab\n你好x");
        assert_eq!(input.cursor_line_col(), (1, 3));
        assert_eq!(input.cursor_display_col(), 5);
        input.move_left();
        assert_eq!(input.cursor_display_col(), 4);
        input.move_home();
        assert_eq!(input.cursor_display_col(), 0);
    }

    #[test]
    fn paste_turns_bare_carriage_returns_into_newlines() {
        let input = typed("fn a() {}\rfn b() {}\r\r");
        assert_eq!(input.text(), "fn a() {}\nfn b() {}\n\n");
        assert_eq!(input.cursor_line_col(), (3, 0));
    }

    #[test]
    fn take_resets() {
        let mut input = typed("  ");
        assert!(input.is_blank());
        input.insert_char('x');
        assert!(!input.is_blank());
        assert_eq!(input.take(), "  x");
        assert_eq!(input.text(), "");
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut input = InputBuffer::new();
        input.backspace();
        input.delete();
        input.move_left();
        input.move_right();
        assert_eq!(input.cursor, 0);
    }
}
