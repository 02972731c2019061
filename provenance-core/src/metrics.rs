//! Prometheus metrics for the ledger
//!
//! Counters live in an owned registry so multiple ledgers (tests in
//! particular) never collide on the global default registry.

use crate::error::{Error, Result};
use prometheus::{IntCounter, Registry, TextEncoder};

/// Ledger metrics
pub struct Metrics {
    registry: Registry,

    /// Events appended to the log
    pub events_total: IntCounter,

    /// Transitions rejected by a precondition check
    pub transitions_rejected_total: IntCounter,

    /// Raw diamonds registered
    pub diamonds_registered_total: IntCounter,

    /// Sales completed
    pub sales_completed_total: IntCounter,
}

impl Metrics {
    /// Create metrics with a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let events_total = IntCounter::new(
            "gemtrace_events_total",
            "Events appended to the ledger log",
        )
        .map_err(|e| Error::Config(format!("Metric registration failed: {}", e)))?;
        let transitions_rejected_total = IntCounter::new(
            "gemtrace_transitions_rejected_total",
            "Transitions rejected by a precondition check",
        )
        .map_err(|e| Error::Config(format!("Metric registration failed: {}", e)))?;
        let diamonds_registered_total = IntCounter::new(
            "gemtrace_diamonds_registered_total",
            "Raw diamonds registered",
        )
        .map_err(|e| Error::Config(format!("Metric registration failed: {}", e)))?;
        let sales_completed_total = IntCounter::new(
            "gemtrace_sales_completed_total",
            "Marketplace sales completed",
        )
        .map_err(|e| Error::Config(format!("Metric registration failed: {}", e)))?;

        for collector in [
            &events_total,
            &transitions_rejected_total,
            &diamonds_registered_total,
            &sales_completed_total,
        ] {
            registry
                .register(Box::new(collector.clone()))
                .map_err(|e| Error::Config(format!("Metric registration failed: {}", e)))?;
        }

        Ok(Self {
            registry,
            events_total,
            transitions_rejected_total,
            diamonds_registered_total,
            sales_completed_total,
        })
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather(&self) -> Result<String> {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .map_err(|e| Error::Config(format!("Metric encoding failed: {}", e)))
    }
}
