//! HTML preview rendering.

use crate::codes::{Rgb, Scanner, Style, StyleSet, Token};

/// Render formatted text as HTML, one `<span>` per visible character.
///
/// Colors replace each other, styles accumulate until `§r` (which also resets
/// the color to white). Unknown codes are dropped.
pub fn to_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut color = Rgb::WHITE;
    let mut styles = StyleSet::default();
    let mut html = String::with_capacity(text.len() * 32);

    for token in Scanner::new(text) {
        match token {
            Token::Text(c) => push_span(&mut html, c, color, styles),
            Token::Legacy(code) => {
                if let Some(rgb) = crate::codes::legacy_color(code) {
                    color = rgb;
                }
            }
            Token::Hex { rgb, .. } => color = rgb,
            Token::Style(style) => styles.insert(style),
            Token::Reset => {
                color = Rgb::WHITE;
                styles.clear();
            }
            Token::Skipped => {}
        }
    }

    html
}

/// CSS declarations for a color and style set, joined with `; `.
pub fn css_rules(color: Rgb, styles: StyleSet) -> String {
    let mut rules = vec![format!("color: {}", color)];
    if styles.contains(Style::Bold) {
        rules.push("font-weight: bold".to_string());
    }
    if styles.contains(Style::Italic) {
        rules.push("font-style: italic".to_string());
    }
    let decorations: Vec<&str> = [
        (Style::Underline, "underline"),
        (Style::Strikethrough, "line-through"),
    ]
    .iter()
    .filter(|(style, _)| styles.contains(*style))
    .map(|(_, value)| *value)
    .collect();
    if !decorations.is_empty() {
        rules.push(format!("text-decoration: {}", decorations.join(" ")));
    }
    rules.join("; ")
}

fn push_span(html: &mut String, c: char, color: Rgb, styles: StyleSet) {
    html.push_str("<span");
    if styles.contains(Style::Obfuscated) {
        html.push_str(" class=\"mc-obfuscated\"");
    }
    html.push_str(" style=\"");
    html.push_str(&css_rules(color, styles));
    html.push_str("\">");
    push_escaped(html, c);
    html.push_str("</span>");
}

fn push_escaped(html: &mut String, c: char) {
    match c {
        '&' => html.push_str("&amp;"),
        '<' => html.push_str("&lt;"),
        '>' => html.push_str("&gt;"),
        '"' => html.push_str("&quot;"),
        '\'' => html.push_str("&#39;"),
        other => html.push(other),
    }
}
