//! Per-character hex color gradients.

use crate::codes::{Rgb, SECTION};
use crate::error::MotdError;

/// Prefix every character of `text` with an interpolated `§x§R§R§G§G§B§B` color.
///
/// The first character gets `start`, the last gets `end`. A single character
/// gets `start`. Empty text returns an empty string without checking colors.
pub fn gradient(text: &str, start: &str, end: &str) -> Result<String, MotdError> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(String::new());
    }

    let from = Rgb::parse_hex(start).ok_or_else(|| MotdError::InvalidColorFormat(start.to_string()))?;
    let to = Rgb::parse_hex(end).ok_or_else(|| MotdError::InvalidColorFormat(end.to_string()))?;

    let last = chars.len() - 1;
    let mut out = String::with_capacity(chars.len() * 16);
    for (i, c) in chars.into_iter().enumerate() {
        let factor = if last == 0 { 0.0 } else { i as f64 / last as f64 };
        push_hex_prefix(&mut out, from.lerp(&to, factor));
        out.push(c);
    }
    Ok(out)
}

/// Append `§x§R§R§G§G§B§B` for `rgb`.
pub fn push_hex_prefix(out: &mut String, rgb: Rgb) {
    out.push(SECTION);
    out.push('x');
    for digit in rgb.hex_digits().chars() {
        out.push(SECTION);
        out.push(digit);
    }
}
