// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The call gate every remote invocation passes through.
//!
//! ```text
//!   caller ──► CallGate::invoke(object, operation, args, call)
//!                 │
//!                 ├─ trace "Remote call"                (debug)
//!                 ├─ call() ─────────────► server
//!                 │      Ok(value)   ──► trace outcome   (debug) ──► Ok
//!                 │      Err(code)
//!                 │        ├─ transport-fatal
//!                 │        │     trace (error), broadcast health event
//!                 │        │     ──► Err(OpcDaError::Transport)
//!                 │        └─ otherwise
//!                 │              trace (warn) ──► Err(OpcDaError::Remote)
//! ```
//!
//! The gate never retries and never swallows a failure. Trace records are
//! observational only.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use opcda_core::{
    BrowsePage, ItemProperties, NamespaceType, OpcDaError, OpcDaResult, StatusCode, TransportError,
};

use crate::health::{ConnectionHealthEvent, HealthChannel, HealthContext};
use crate::transport::{AvailableProperty, PropertyItemPath, PropertyRead};

// =============================================================================
// TraceSummary
// =============================================================================

/// Short description of a call result for trace records.
pub trait TraceSummary {
    /// Returns the summary.
    fn trace_summary(&self) -> String;
}

impl TraceSummary for () {
    fn trace_summary(&self) -> String {
        "ok".to_string()
    }
}

impl TraceSummary for String {
    fn trace_summary(&self) -> String {
        format!("{self:?}")
    }
}

impl TraceSummary for NamespaceType {
    fn trace_summary(&self) -> String {
        format!("{self:?}")
    }
}

impl TraceSummary for BrowsePage {
    fn trace_summary(&self) -> String {
        format!(
            "{} elements, more_available={}, continuation={}",
            self.elements.len(),
            self.more_available,
            self.continuation.as_ref().map_or(0, |t| t.as_bytes().len())
        )
    }
}

impl TraceSummary for Vec<ItemProperties> {
    fn trace_summary(&self) -> String {
        let failed = self.iter().filter(|item| !item.is_ok()).count();
        format!("{} items, {} failed", self.len(), failed)
    }
}

impl TraceSummary for Vec<String> {
    fn trace_summary(&self) -> String {
        format!("{} names", self.len())
    }
}

impl TraceSummary for Vec<AvailableProperty> {
    fn trace_summary(&self) -> String {
        format!("{} properties", self.len())
    }
}

impl TraceSummary for Vec<PropertyRead> {
    fn trace_summary(&self) -> String {
        let failed = self.iter().filter(|read| read.status.failed()).count();
        format!("{} values, {} failed", self.len(), failed)
    }
}

impl TraceSummary for Vec<PropertyItemPath> {
    fn trace_summary(&self) -> String {
        let failed = self.iter().filter(|path| path.status.failed()).count();
        format!("{} item paths, {} failed", self.len(), failed)
    }
}

// =============================================================================
// GateStats
// =============================================================================

/// Counters for calls through a gate.
#[derive(Debug, Default)]
pub struct GateStats {
    calls: AtomicU64,
    failures: AtomicU64,
    transport_failures: AtomicU64,
    health_events: AtomicU64,
    total_call_time_us: AtomicU64,
}

impl GateStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    fn record_call(&self, duration: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.total_call_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    fn record_failure(&self, fatal: bool) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        if fatal {
            self.transport_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_health_event(&self) {
        self.health_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of calls made.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Returns the number of failed calls.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns the number of transport-fatal failures.
    pub fn transport_failures(&self) -> u64 {
        self.transport_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of health events broadcast.
    pub fn health_events(&self) -> u64 {
        self.health_events.load(Ordering::Relaxed)
    }

    /// Returns the average call duration.
    pub fn average_call_time(&self) -> Duration {
        let calls = self.calls();
        if calls == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.total_call_time_us.load(Ordering::Relaxed) / calls)
    }

    /// Resets all counters.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.transport_failures.store(0, Ordering::Relaxed);
        self.health_events.store(0, Ordering::Relaxed);
        self.total_call_time_us.store(0, Ordering::Relaxed);
    }
}

// =============================================================================
// CallGate
// =============================================================================

/// Classifies call failures and raises health events.
pub struct CallGate {
    health: Arc<HealthChannel>,
    context: HealthContext,
    trace_arguments: bool,
    stats: GateStats,
}

impl CallGate {
    /// Creates a gate broadcasting on `health` with `context`.
    pub fn new(health: Arc<HealthChannel>, context: HealthContext) -> Self {
        Self {
            health,
            context,
            trace_arguments: true,
            stats: GateStats::new(),
        }
    }

    /// Sets whether argument summaries appear in trace records.
    pub fn with_trace_arguments(mut self, trace_arguments: bool) -> Self {
        self.trace_arguments = trace_arguments;
        self
    }

    /// Returns the health channel.
    pub fn health(&self) -> &Arc<HealthChannel> {
        &self.health
    }

    /// Returns the call counters.
    pub fn stats(&self) -> &GateStats {
        &self.stats
    }

    /// Performs one remote call.
    ///
    /// `call` must perform exactly one remote invocation on `object`.
    ///
    /// # Errors
    ///
    /// - [`OpcDaError::Transport`] for transport-fatal statuses, after the
    ///   health event was broadcast
    /// - [`OpcDaError::Remote`] for any other failure status
    pub fn invoke<T, F>(
        &self,
        object: &str,
        operation: &'static str,
        args: &dyn fmt::Debug,
        call: F,
    ) -> OpcDaResult<T>
    where
        T: TraceSummary,
        F: FnOnce() -> Result<T, StatusCode>,
    {
        if self.trace_arguments {
            tracing::debug!(object, operation, args = ?args, "Remote call");
        } else {
            tracing::debug!(object, operation, args = "<omitted>", "Remote call");
        }

        let started = Instant::now();
        let outcome = call();
        let elapsed = started.elapsed();
        self.stats.record_call(elapsed);
        let elapsed_us = elapsed.as_micros() as u64;

        match outcome {
            Ok(value) => {
                tracing::debug!(
                    object,
                    operation,
                    outcome = %value.trace_summary(),
                    elapsed_us,
                    "Remote call completed"
                );
                Ok(value)
            }
            Err(code) if code.is_transport_fatal() => {
                self.stats.record_failure(true);
                let error: OpcDaError = TransportError::from_status(object, operation, code).into();
                error.log(operation);
                self.raise_health_event(object, operation, code);
                Err(error)
            }
            Err(code) => {
                self.stats.record_failure(false);
                let error = OpcDaError::remote(object, operation, code);
                error.log(operation);
                Err(error)
            }
        }
    }

    fn raise_health_event(&self, object: &str, operation: &str, code: StatusCode) {
        let event = ConnectionHealthEvent::new(self.context.clone(), code, object, operation);
        let report = self.health.broadcast(&event);
        self.stats.record_health_event();
        if report.failed > 0 {
            tracing::warn!(
                delivered = report.delivered,
                failed = report.failed,
                "Health event not delivered to every subscriber"
            );
        }
    }
}

// =============================================================================
// RecoverDomain
// =============================================================================

/// Turns a call-level domain failure back into data.
///
/// Batch operations use this so that one failed call for one item becomes a
/// status on that item instead of aborting its siblings. Transport and other
/// errors still propagate.
pub trait RecoverDomain<T> {
    /// Maps `Err(Remote)` to `Ok(Err(status))`.
    fn recover_domain(self) -> OpcDaResult<Result<T, StatusCode>>;
}

impl<T> RecoverDomain<T> for OpcDaResult<T> {
    fn recover_domain(self) -> OpcDaResult<Result<T, StatusCode>> {
        match self {
            Ok(value) => Ok(Ok(value)),
            Err(OpcDaError::Remote(error)) => Ok(Err(error.status)),
            Err(error) => Err(error),
        }
    }
}

impl fmt::Debug for CallGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallGate")
            .field("context", &self.context)
            .field("trace_arguments", &self.trace_arguments)
            .field("calls", &self.stats.calls())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
