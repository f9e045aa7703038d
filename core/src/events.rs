//! Edit events consumed by the expression buffer.

use std::fmt;

/// Binary operators that can be appended to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Percent,
}

impl Operator {
    /// Glyph written into the buffer for this operator.
    pub fn glyph(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '×',
            Self::Divide => '÷',
            Self::Percent => '%',
        }
    }

    /// Parse a display glyph or its ASCII spelling.
    pub fn from_glyph(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Self::Add),
            '-' | '−' => Some(Self::Subtract),
            '×' | '*' => Some(Self::Multiply),
            '÷' | '/' => Some(Self::Divide),
            '%' => Some(Self::Percent),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// A discrete edit action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditEvent {
    /// Empty the buffer (keypad `AC`)
    Clear,
    /// Append a digit 0-9
    Digit(u8),
    /// Append a decimal point
    DecimalPoint,
    /// Append a binary operator
    Operator(Operator),
    /// Remove the last character (keypad `⌫`)
    Backspace,
    /// Toggle the leading minus sign (keypad `±`)
    SignToggle,
    /// Send the buffer to the evaluator (keypad `=`)
    Commit,
}

impl EditEvent {
    /// Map a keypad label to an event.
    ///
    /// Single-character labels fall through to [`EditEvent::from_char`].
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "AC" | "C" => Some(Self::Clear),
            "⌫" => Some(Self::Backspace),
            "±" => Some(Self::SignToggle),
            _ => {
                let mut chars = label.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Self::from_char(ch),
                    _ => None,
                }
            }
        }
    }

    /// Map a keyboard character to an event.
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '0'..='9' => Some(Self::Digit(ch as u8 - b'0')),
            '.' => Some(Self::DecimalPoint),
            '=' | '\n' | '\r' => Some(Self::Commit),
            '⌫' | '\u{8}' | '\u{7f}' => Some(Self::Backspace),
            '±' => Some(Self::SignToggle),
            '\u{1b}' => Some(Self::Clear),
            _ => Operator::from_glyph(ch).map(Self::Operator),
        }
    }
}

impl From<Operator> for EditEvent {
    fn from(op: Operator) -> Self {
        Self::Operator(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypad_labels() {
        assert_eq!(EditEvent::from_label("AC"), Some(EditEvent::Clear));
        assert_eq!(EditEvent::from_label("⌫"), Some(EditEvent::Backspace));
        assert_eq!(EditEvent::from_label("±"), Some(EditEvent::SignToggle));
        assert_eq!(EditEvent::from_label("="), Some(EditEvent::Commit));
        assert_eq!(EditEvent::from_label("7"), Some(EditEvent::Digit(7)));
        assert_eq!(
            EditEvent::from_label("÷"),
            Some(EditEvent::Operator(Operator::Divide))
        );
        assert_eq!(EditEvent::from_label("sin"), None);
        assert_eq!(EditEvent::from_label(""), None);
    }

    #[test]
    fn test_ascii_operator_spellings() {
        assert_eq!(Operator::from_glyph('*'), Some(Operator::Multiply));
        assert_eq!(Operator::from_glyph('/'), Some(Operator::Divide));
        assert_eq!(Operator::from_glyph('−'), Some(Operator::Subtract));
        assert_eq!(Operator::from_glyph('^'), None);
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(EditEvent::from_char('\n'), Some(EditEvent::Commit));
        assert_eq!(EditEvent::from_char('\u{7f}'), Some(EditEvent::Backspace));
        assert_eq!(EditEvent::from_char('\u{1b}'), Some(EditEvent::Clear));
    }

    #[test]
    fn test_glyph_display() {
        assert_eq!(Operator::Multiply.to_string(), "×");
        assert_eq!(Operator::Subtract.glyph(), '-');
    }
}
