use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidKeyValue(String),

    #[error("Invalid triple '{0}'. Expected three comma-separated values (e.g., '5,5,5').")]
    InvalidTriple(String),

    #[error("Invalid {kind} value for '{key}': '{value}'")]
    InvalidValue {
        key: String,
        value: String,
        kind: &'static str,
    },
}

/// Splits `KEY=VALUE` at the first `=`.
pub fn parse_key_value(pair: &str) -> Result<(&str, &str), ParseError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ParseError::InvalidKeyValue(pair.to_string())),
    }
}

/// Parses `a,b,c` (spaces allowed, optional surrounding brackets).
pub fn parse_triple<T: FromStr>(text: &str) -> Result<[T; 3], ParseError> {
    let inner = text.trim().trim_start_matches('[').trim_end_matches(']');
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(ParseError::InvalidTriple(text.to_string()));
    }
    let parse = |s: &str| {
        s.parse::<T>()
            .map_err(|_| ParseError::InvalidTriple(text.to_string()))
    };
    Ok([parse(parts[0])?, parse(parts[1])?, parse(parts[2])?])
}

pub fn parse_value<T: FromStr>(key: &str, value: &str, kind: &'static str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        kind,
    })
}
