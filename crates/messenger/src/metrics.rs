//! Metric name definitions, recorded through the `metrics` facade.

/// Webhook ingestion metrics.
pub mod webhook {
    /// Total normalized inbound events emitted.
    pub const EVENTS_TOTAL: &str = "courier_webhook_events_total";
    /// Total entries skipped because no usable message could be extracted.
    /// Payload-shape drift from the provider shows up here first.
    pub const ENTRIES_SKIPPED_TOTAL: &str = "courier_webhook_entries_skipped_total";
}

/// Delivery queue metrics.
pub mod delivery {
    /// Total sends that the provider acknowledged.
    pub const SENT_TOTAL: &str = "courier_delivery_sent_total";
    /// Total sends that failed and were dropped by the queue.
    pub const FAILED_TOTAL: &str = "courier_delivery_failed_total";
}
