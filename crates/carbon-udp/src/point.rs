// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::errors::ParseError;

/// One parsed plaintext record: `<name> <value> <timestamp>`.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub name: String,
    pub value: f64,
    pub timestamp: i64,
}

impl Point {
    #[must_use]
    pub fn new(name: String, value: f64, timestamp: i64) -> Self {
        Self {
            name,
            value,
            timestamp,
        }
    }
}

/// Parses one line of the Graphite plaintext protocol.
///
/// The line must hold exactly three whitespace-separated fields. The value
/// must be a finite float; the timestamp may be a float and is rounded to
/// whole seconds.
pub fn parse(line: &str) -> Result<Point, ParseError> {
    let trimmed = line.trim();

    let mut fields = trimmed.split_whitespace();
    let (Some(name), Some(value), Some(timestamp), None) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return Err(ParseError::Malformed(trimmed.to_string()));
    };

    let value: f64 = value
        .parse()
        .map_err(|_| ParseError::InvalidValue(trimmed.to_string()))?;
    if !value.is_finite() {
        return Err(ParseError::InvalidValue(trimmed.to_string()));
    }

    let timestamp: f64 = timestamp
        .parse()
        .map_err(|_| ParseError::InvalidTimestamp(trimmed.to_string()))?;
    if !timestamp.is_finite() {
        return Err(ParseError::InvalidTimestamp(trimmed.to_string()));
    }

    Ok(Point::new(name.to_string(), value, timestamp.round() as i64))
}
