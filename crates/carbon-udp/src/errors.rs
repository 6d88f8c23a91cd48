// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors produced while parsing one plaintext protocol line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("'{0}' is not a valid metric line")]
    Malformed(String),

    #[error("invalid value in '{0}'")]
    InvalidValue(String),

    #[error("invalid timestamp in '{0}'")]
    InvalidTimestamp(String),

    #[error("line is not valid utf-8")]
    InvalidUtf8,
}

/// Errors surfaced through the receiver lifecycle. Binding the socket is the
/// only operation that fails by return value; once the loop is running,
/// failures are reported through logs and counters instead.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to bind UDP socket: {0}")]
    Bind(#[from] std::io::Error),

    #[error("Receiver already listening")]
    AlreadyStarted,
}
