//! Minecraft MOTD formatting codes.
//!
//! Parses legacy (`§`/`&`) and hex (`§x§R§R§G§G§B§B`, `&#RRGGBB`) codes and
//! provides the transforms used by the editor and export endpoints:
//! HTML preview, dialect conversion, gradients, share-link encoding and
//! visible-length utilities. Everything here is pure and synchronous.

pub mod codes;
mod convert;
mod error;
mod gradient;
mod html;
mod measure;
mod share;

pub use codes::{Rgb, Style};
pub use convert::{Dialect, UnknownDialect, convert};
pub use error::MotdError;
pub use gradient::gradient;
pub use html::to_html;
pub use measure::{
    DEFAULT_LINE_WIDTH, DEFAULT_MAX_LINES, MAX_MOTD_LENGTH, MotdValidation, ValidationOptions,
    center_text, check_length, strip_codes, validate_motd, visible_length,
};
pub use share::{decode_from_url, encode_for_url, try_decode_from_url};
