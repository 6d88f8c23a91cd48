// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion counters shared between the ingestion loop and the stats
/// reporter. Owned by the receiver instance, never process-global.
///
/// [`ReceiverStats::checkpoint`] resets each counter with an atomic swap, so
/// increments landing while a checkpoint is in flight are carried into the
/// next one instead of being lost.
#[derive(Debug, Default)]
pub struct ReceiverStats {
    metrics_received: AtomicU64,
    incomplete_received: AtomicU64,
    errors: AtomicU64,
}

/// Counter values accumulated since the previous checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub metrics_received: u64,
    pub incomplete_received: u64,
    pub errors: u64,
}

impl ReceiverStats {
    pub(crate) fn incr_metrics_received(&self) {
        self.metrics_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_incomplete_received(&self) {
        self.incomplete_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value of the received-records counter.
    pub fn metrics_received(&self) -> u64 {
        self.metrics_received.load(Ordering::Relaxed)
    }

    /// Current value of the incomplete-fragments counter.
    pub fn incomplete_received(&self) -> u64 {
        self.incomplete_received.load(Ordering::Relaxed)
    }

    /// Current value of the error counter.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns the values accumulated since the previous checkpoint and
    /// resets the counters to zero in the same atomic operation.
    pub fn checkpoint(&self) -> StatsSnapshot {
        StatsSnapshot {
            metrics_received: self.metrics_received.swap(0, Ordering::Relaxed),
            incomplete_received: self.incomplete_received.swap(0, Ordering::Relaxed),
            errors: self.errors.swap(0, Ordering::Relaxed),
        }
    }
}
