// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the SENEC exporter.
//!
//! Failures fall into three tiers, each recovered at a different level:
//! decoding a single field, completing a poll cycle, and starting the
//! process at all.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A tagged value could not be decoded.
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// The appliance could not be reached or answered with garbage.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The exporter could not be started.
    #[error("startup error: {0}")]
    Startup(#[from] StartupError),

    /// The metrics endpoint failed while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding a tagged hex value such as `fl_43DE0000`.
///
/// These are recovered per field: the affected gauge is simply not updated
/// for that cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The value was an empty string.
    #[error("empty value")]
    Empty,

    /// The value has no `<tag>_` prefix.
    #[error("missing type tag in {0:?}")]
    MissingTag(String),

    /// The type tag is not one the appliance is known to emit.
    #[error("unknown type tag {tag:?} in {value:?}")]
    UnknownTag {
        /// The unrecognized tag.
        tag: String,
        /// The full value as received.
        value: String,
    },

    /// The hex payload has the wrong number of digits for its encoding.
    #[error("expected {expected} hex digits, got {actual} in {value:?}")]
    InvalidWidth {
        /// Required digit count.
        expected: usize,
        /// Digit count actually present.
        actual: usize,
        /// The full value as received.
        value: String,
    },

    /// The payload contains characters that are not hex digits.
    #[error("invalid hex digits in {0:?}")]
    InvalidHex(String),

    /// An unsigned payload does not fit into 64 bits.
    #[error("unsigned value {0:?} overflows 64 bits")]
    Overflow(String),

    /// A group or field does not hold the values it should.
    #[error("unexpected value shape: {0}")]
    UnexpectedShape(String),
}

/// Errors related to talking to the appliance.
///
/// These are recovered per poll cycle: nothing is published for the cycle and
/// the next tick proceeds normally.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The appliance answered with a non-success status.
    #[error("appliance answered HTTP {code} - {reason}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Canonical reason phrase.
        reason: String,
    },

    /// The response body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response was JSON but not shaped like a read response.
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors that prevent the exporter from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The metrics listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// The address that could not be bound.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] TransportError),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
