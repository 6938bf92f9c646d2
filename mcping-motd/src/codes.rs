//! Recognition of Minecraft formatting codes.
//!
//! Every transform in this crate walks text through [`Scanner`], so the HTML
//! renderer, the dialect converter and the length utilities always agree on
//! which characters are codes and which are visible glyphs.
//!
//! Recognised forms (the introducer may be `§` or `&`):
//! - `§0`-`§9`, `§a`-`§f`: legacy palette colors
//! - `§k`, `§l`, `§m`, `§n`, `§o`: obfuscated, bold, strikethrough, underline, italic
//! - `§r`: reset
//! - `§x§R§R§G§G§B§B`: hex color, one nibble per escape (14 chars)
//! - `§#RRGGBB` / `&#RRGGBB`: compact hex color (8 chars)
//!
//! Any other character after `§` is skipped together with the `§`. An `&` only
//! acts as an introducer when followed by a code character; otherwise it is
//! ordinary text.

use std::fmt;

pub const SECTION: char = '§';
pub const AMPERSAND: char = '&';

/// 24-bit color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RRGGBB` string (hex digits are case-insensitive).
    pub fn parse_hex(input: &str) -> Option<Self> {
        let digits = input.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        let chars: Vec<char> = digits.chars().collect();
        Self::from_digits(&chars)
    }

    /// Build a color from six hex digit characters.
    pub fn from_digits(digits: &[char]) -> Option<Self> {
        if digits.len() != 6 {
            return None;
        }
        let mut channels = [0u8; 3];
        for (i, pair) in digits.chunks(2).enumerate() {
            let hi = pair[0].to_digit(16)?;
            let lo = pair[1].to_digit(16)?;
            channels[i] = (hi * 16 + lo) as u8;
        }
        Some(Self::new(channels[0], channels[1], channels[2]))
    }

    /// Uppercase hex digits without the leading `#`.
    pub fn hex_digits(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Linear interpolation towards `other`, rounded and clamped per channel.
    pub fn lerp(&self, other: &Rgb, factor: f64) -> Rgb {
        fn channel(start: u8, end: u8, factor: f64) -> u8 {
            let value = f64::from(start) + (f64::from(end) - f64::from(start)) * factor;
            value.round().clamp(0.0, 255.0) as u8
        }
        Rgb::new(
            channel(self.r, other.r, factor),
            channel(self.g, other.g, factor),
            channel(self.b, other.b, factor),
        )
    }

    fn distance_sq(&self, other: &Rgb) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.hex_digits())
    }
}

/// The 16 legacy colors, indexed by code.
pub const PALETTE: [(char, Rgb); 16] = [
    ('0', Rgb::new(0x00, 0x00, 0x00)),
    ('1', Rgb::new(0x00, 0x00, 0xAA)),
    ('2', Rgb::new(0x00, 0xAA, 0x00)),
    ('3', Rgb::new(0x00, 0xAA, 0xAA)),
    ('4', Rgb::new(0xAA, 0x00, 0x00)),
    ('5', Rgb::new(0xAA, 0x00, 0xAA)),
    ('6', Rgb::new(0xFF, 0xAA, 0x00)),
    ('7', Rgb::new(0xAA, 0xAA, 0xAA)),
    ('8', Rgb::new(0x55, 0x55, 0x55)),
    ('9', Rgb::new(0x55, 0x55, 0xFF)),
    ('a', Rgb::new(0x55, 0xFF, 0x55)),
    ('b', Rgb::new(0x55, 0xFF, 0xFF)),
    ('c', Rgb::new(0xFF, 0x55, 0x55)),
    ('d', Rgb::new(0xFF, 0x55, 0xFF)),
    ('e', Rgb::new(0xFF, 0xFF, 0x55)),
    ('f', Rgb::new(0xFF, 0xFF, 0xFF)),
];

/// Palette color for a legacy code (`0`-`9`, `a`-`f`, case-insensitive).
pub fn legacy_color(code: char) -> Option<Rgb> {
    let code = code.to_ascii_lowercase();
    PALETTE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, rgb)| *rgb)
}

/// Closest legacy code by Euclidean RGB distance. Ties go to the lower code.
pub fn nearest_legacy(rgb: Rgb) -> char {
    let mut best = PALETTE[0];
    for entry in PALETTE.iter().skip(1) {
        if entry.1.distance_sq(&rgb) < best.1.distance_sq(&rgb) {
            best = *entry;
        }
    }
    best.0
}

/// Text decorations toggled by format codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Obfuscated,
}

impl Style {
    pub const ALL: [Style; 5] = [
        Style::Bold,
        Style::Italic,
        Style::Underline,
        Style::Strikethrough,
        Style::Obfuscated,
    ];

    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_lowercase() {
            'l' => Some(Style::Bold),
            'o' => Some(Style::Italic),
            'n' => Some(Style::Underline),
            'm' => Some(Style::Strikethrough),
            'k' => Some(Style::Obfuscated),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Style::Bold => 'l',
            Style::Italic => 'o',
            Style::Underline => 'n',
            Style::Strikethrough => 'm',
            Style::Obfuscated => 'k',
        }
    }

    fn bit(self) -> u8 {
        match self {
            Style::Bold => 1,
            Style::Italic => 1 << 1,
            Style::Underline => 1 << 2,
            Style::Strikethrough => 1 << 3,
            Style::Obfuscated => 1 << 4,
        }
    }
}

/// Set of active styles. Inserting an active style is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleSet(u8);

impl StyleSet {
    pub fn insert(&mut self, style: Style) {
        self.0 |= style.bit();
    }

    pub fn contains(&self, style: Style) -> bool {
        self.0 & style.bit() != 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// One recognised unit of formatted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A visible character.
    Text(char),
    /// Legacy palette color, code normalised to lowercase.
    Legacy(char),
    /// Hex color. `digits` keeps the case the author wrote.
    Hex {
        rgb: Rgb,
        digits: [char; 6],
        compact: bool,
    },
    Style(Style),
    Reset,
    /// Unrecognised or malformed code, dropped silently.
    Skipped,
}

impl Token {
    pub fn is_visible(&self) -> bool {
        matches!(self, Token::Text(_))
    }
}

fn is_code_char(c: char) -> bool {
    matches!(
        c.to_ascii_lowercase(),
        '0'..='9' | 'a'..='f' | 'k'..='o' | 'r' | 'x' | '#'
    )
}

fn is_introducer(c: char) -> bool {
    c == SECTION || c == AMPERSAND
}

/// Iterator over the [`Token`]s of a string.
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// `§x` followed by six `§<hexdigit>` pairs.
    fn expanded_hex(&self) -> Option<[char; 6]> {
        let mut digits = ['0'; 6];
        for (i, digit) in digits.iter_mut().enumerate() {
            let introducer = self.at(2 + i * 2)?;
            let value = self.at(3 + i * 2)?;
            if !is_introducer(introducer) || !value.is_ascii_hexdigit() {
                return None;
            }
            *digit = value;
        }
        Some(digits)
    }

    /// `§#` followed by six hex digits.
    fn compact_hex(&self) -> Option<[char; 6]> {
        let mut digits = ['0'; 6];
        for (i, digit) in digits.iter_mut().enumerate() {
            let value = self.at(2 + i)?;
            if !value.is_ascii_hexdigit() {
                return None;
            }
            *digit = value;
        }
        Some(digits)
    }

    fn hex_token(digits: [char; 6], compact: bool) -> Option<Token> {
        Rgb::from_digits(&digits).map(|rgb| Token::Hex {
            rgb,
            digits,
            compact,
        })
    }
}

impl Iterator for Scanner {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let c = self.at(0)?;
        let next = self.at(1);

        let is_code = match (c, next) {
            (SECTION, _) => true,
            (AMPERSAND, Some(n)) => is_code_char(n),
            _ => false,
        };
        if !is_code {
            self.pos += 1;
            return Some(Token::Text(c));
        }

        // Lone trailing `§`: nothing to apply it to.
        let Some(code) = next else {
            self.pos += 1;
            return Some(Token::Skipped);
        };

        let token = match code.to_ascii_lowercase() {
            'x' => {
                if let Some(token) = self.expanded_hex().and_then(|d| Self::hex_token(d, false)) {
                    self.pos += 14;
                    return Some(token);
                }
                Token::Skipped
            }
            '#' => {
                if let Some(token) = self.compact_hex().and_then(|d| Self::hex_token(d, true)) {
                    self.pos += 8;
                    return Some(token);
                }
                Token::Skipped
            }
            'r' => Token::Reset,
            lower @ ('0'..='9' | 'a'..='f') => Token::Legacy(lower),
            other => Style::from_code(other).map_or(Token::Skipped, Token::Style),
        };
        self.pos += 2;
        Some(token)
    }
}
