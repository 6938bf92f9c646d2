//! Conversion between server-config escape dialects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codes::{Scanner, Token, nearest_legacy};

/// Escape syntax used by a server ecosystem's config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `server.properties`: `§` escapes, legacy colors only.
    Vanilla,
    /// Spigot / Paper: `§` escapes, hex as `§x§R...`.
    Spigot,
    /// BungeeCord / Waterfall: `&` codes, hex as `&x&R...`.
    Bungeecord,
    /// ServerListPlus: `&` codes, hex as `&#RRGGBB`.
    Serverlistplus,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Vanilla,
        Dialect::Spigot,
        Dialect::Bungeecord,
        Dialect::Serverlistplus,
    ];

    fn prefix(self) -> &'static str {
        match self {
            Dialect::Vanilla | Dialect::Spigot => "\\u00A7",
            Dialect::Bungeecord | Dialect::Serverlistplus => "&",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Vanilla => "vanilla",
            Dialect::Spigot => "spigot",
            Dialect::Bungeecord => "bungeecord",
            Dialect::Serverlistplus => "serverlistplus",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown format '{0}' (expected vanilla, spigot, bungeecord or serverlistplus)")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vanilla" => Ok(Dialect::Vanilla),
            "spigot" | "paper" => Ok(Dialect::Spigot),
            "bungeecord" | "bungee" | "waterfall" => Ok(Dialect::Bungeecord),
            "serverlistplus" | "slp" => Ok(Dialect::Serverlistplus),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

/// Re-emit every recognised code in `dialect`'s syntax. Unrecognised codes are dropped.
pub fn convert(text: &str, dialect: Dialect) -> String {
    let prefix = dialect.prefix();
    let mut out = String::with_capacity(text.len() * 2);

    for token in Scanner::new(text) {
        match token {
            Token::Text(c) => out.push(c),
            Token::Legacy(code) => {
                out.push_str(prefix);
                out.push(code);
            }
            Token::Style(style) => {
                out.push_str(prefix);
                out.push(style.code());
            }
            Token::Reset => {
                out.push_str(prefix);
                out.push('r');
            }
            Token::Hex { rgb, digits, .. } => match dialect {
                Dialect::Vanilla => {
                    out.push_str(prefix);
                    out.push(nearest_legacy(rgb));
                }
                Dialect::Spigot | Dialect::Bungeecord => {
                    out.push_str(prefix);
                    out.push('x');
                    for digit in digits {
                        out.push_str(prefix);
                        out.push(digit);
                    }
                }
                Dialect::Serverlistplus => {
                    out.push_str("&#");
                    out.extend(digits);
                }
            },
            Token::Skipped => {}
        }
    }

    out
}
