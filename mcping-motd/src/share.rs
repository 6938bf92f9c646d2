//! URL-safe encoding for share links.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::MotdError;

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Artifacts left behind by older, double-encoded share links.
const LEGACY_ARTIFACTS: [(&str, &str); 3] = [("%C2%A7", "§"), ("%c2%a7", "§"), ("%26", "&")];

pub fn encode_for_url(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

/// Strict decode. Fails on a `%` not followed by two hex digits or on invalid UTF-8.
///
/// Literal `%C2%A7` and `%26` left in the decoded text are rewritten to `§` and
/// `&`, so text that really contains those sequences does not round-trip.
pub fn try_decode_from_url(encoded: &str) -> Result<String, MotdError> {
    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !well_formed {
                return Err(MotdError::MalformedEncoding);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let mut decoded = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|_| MotdError::MalformedEncoding)?
        .into_owned();
    for (artifact, replacement) in LEGACY_ARTIFACTS {
        if decoded.contains(artifact) {
            decoded = decoded.replace(artifact, replacement);
        }
    }
    Ok(decoded)
}

/// Soft decode: a malformed link yields an empty string.
pub fn decode_from_url(encoded: &str) -> String {
    match try_decode_from_url(encoded) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to decode shared MOTD");
            String::new()
        }
    }
}
