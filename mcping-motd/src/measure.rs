//! Visible-length measurement, centering and MOTD validation.

use serde::Serialize;

use crate::codes::{Scanner, Token};
use crate::error::MotdError;

/// Soft per-line width used by centering and validation.
pub const DEFAULT_LINE_WIDTH: usize = 60;

/// Lines shown by the client's server list.
pub const DEFAULT_MAX_LINES: usize = 2;

/// Hard limit on the raw MOTD, codes included.
pub const MAX_MOTD_LENGTH: usize = 256;

/// Text with every recognised code removed.
pub fn strip_codes(text: &str) -> String {
    Scanner::new(text)
        .filter_map(|token| match token {
            Token::Text(c) => Some(c),
            _ => None,
        })
        .collect()
}

/// Number of characters that would be rendered as glyphs.
pub fn visible_length(text: &str) -> usize {
    Scanner::new(text).filter(Token::is_visible).count()
}

/// Left-pad `text` with spaces so it sits in the middle of `line_width` columns.
pub fn center_text(text: &str, line_width: usize) -> String {
    let padding = line_width.saturating_sub(visible_length(text)) / 2;
    format!("{}{}", " ".repeat(padding), text)
}

/// Reject MOTDs above the hard character limit.
pub fn check_length(text: &str) -> Result<(), MotdError> {
    let actual = text.chars().count();
    if actual > MAX_MOTD_LENGTH {
        return Err(MotdError::TooLong {
            max: MAX_MOTD_LENGTH,
            actual,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct ValidationOptions {
    pub max_line_width: usize,
    pub max_lines: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_line_width: DEFAULT_LINE_WIDTH,
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MotdValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Soft checks for the editor: overlong lines and too many lines.
pub fn validate_motd(text: &str, options: &ValidationOptions) -> MotdValidation {
    let mut errors = Vec::new();

    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() > options.max_lines {
        errors.push(format!(
            "MOTD has {} lines, only {} are shown",
            lines.len(),
            options.max_lines
        ));
    }

    for (index, line) in lines.iter().enumerate() {
        let width = visible_length(line);
        if width > options.max_line_width {
            errors.push(format!(
                "Line {} is too long ({}/{} visible characters)",
                index + 1,
                width,
                options.max_line_width
            ));
        }
    }

    MotdValidation {
        valid: errors.is_empty(),
        errors,
    }
}
