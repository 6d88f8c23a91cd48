// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! UDP receiver for the Graphite plaintext protocol.
//!
//! Datagram boundaries are not record boundaries: a sender's write can be
//! split by its own buffering or by the transport, so the trailing
//! delimiter-less bytes of one datagram are buffered per sender and stitched
//! onto the front of that sender's next datagram. Complete lines are parsed
//! into [`Point`] values and forwarded to an output channel; a periodic
//! reporter emits ingestion counters through the same channel.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod errors;
mod incomplete;
pub mod point;
pub mod stats;
pub mod udp;

pub use config::UdpConfig;
pub use point::Point;
pub use udp::UdpReceiver;
