/// Input validation for status requests
use std::net::Ipv4Addr;

use thiserror::Error;

const MAX_HOSTNAME_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;
const MAX_TOKEN_LENGTH: usize = 2048;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Hostname cannot be empty")]
    HostnameEmpty,

    #[error("Hostname too long (max 253 characters, got {0})")]
    HostnameTooLong(usize),

    #[error("Hostname contains invalid characters")]
    HostnameInvalidChars,

    #[error("Hostname has invalid format")]
    HostnameInvalidFormat,

    #[error("Port must be between 1 and 65535 (got {0})")]
    PortOutOfRange(i64),

    #[error("Port '{0}' is not a number")]
    PortInvalid(String),

    #[error("Verification token is required")]
    TokenEmpty,

    #[error("Verification token too long (max 2048 characters, got {0})")]
    TokenTooLong(usize),

    #[error("Verification token contains invalid characters")]
    TokenInvalidChars,
}

/// Validates a server hostname
///
/// Rules:
/// - Cannot be empty, max 253 characters
/// - Only ASCII letters, digits, `-`, `_` and `.`
/// - Dot-separated labels of 1-63 characters, not starting or ending with `-`
/// - `localhost`, a dotted-quad IPv4 address, or at least two labels
pub fn validate_hostname(hostname: &str) -> Result<(), ValidationError> {
    if hostname.is_empty() {
        return Err(ValidationError::HostnameEmpty);
    }

    if hostname.len() > MAX_HOSTNAME_LENGTH {
        return Err(ValidationError::HostnameTooLong(hostname.len()));
    }

    if !hostname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::HostnameInvalidChars);
    }

    if hostname.eq_ignore_ascii_case("localhost") {
        return Ok(());
    }

    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 2 {
        return Err(ValidationError::HostnameInvalidFormat);
    }

    for label in &labels {
        if label.is_empty()
            || label.len() > MAX_LABEL_LENGTH
            || label.starts_with('-')
            || label.ends_with('-')
        {
            return Err(ValidationError::HostnameInvalidFormat);
        }
    }

    // All-numeric names must be a real IPv4 address
    if labels.iter().all(|l| l.chars().all(|c| c.is_ascii_digit()))
        && hostname.parse::<Ipv4Addr>().is_err()
    {
        return Err(ValidationError::HostnameInvalidFormat);
    }

    Ok(())
}

/// Validates a port number and narrows it to `u16`
pub fn validate_port(port: i64) -> Result<u16, ValidationError> {
    if !(1..=65535).contains(&port) {
        return Err(ValidationError::PortOutOfRange(port));
    }
    Ok(port as u16)
}

/// Validates the shape of a Turnstile token before it is sent for verification
pub fn validate_turnstile_token(token: &str) -> Result<(), ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::TokenEmpty);
    }

    if token.len() > MAX_TOKEN_LENGTH {
        return Err(ValidationError::TokenTooLong(token.len()));
    }

    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '='))
    {
        return Err(ValidationError::TokenInvalidChars);
    }

    Ok(())
}

/// Splits `host:port` input. IPv6 literals are not accepted.
pub fn split_address(input: &str) -> Result<(&str, Option<u16>), ValidationError> {
    let input = input.trim();
    match input.split_once(':') {
        None => Ok((input, None)),
        Some((_, rest)) if rest.contains(':') => Err(ValidationError::HostnameInvalidChars),
        Some((host, port)) => {
            let port: i64 = port
                .parse()
                .map_err(|_| ValidationError::PortInvalid(port.to_string()))?;
            Ok((host, Some(validate_port(port)?)))
        }
    }
}
