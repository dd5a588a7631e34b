use crate::engine::alerts::SourceKind;
use crate::engine::Engine;

/// Seed the asset gauges once the engine is hydrated.
pub fn init_metrics(engine: &Engine) {
    let (detectors, extinguishers, items) = engine.asset_totals();
    set_asset_totals(detectors, extinguishers, items);

    tracing::info!(
        "Initialized metrics: Detectors={}, Extinguishers={}, MaintenanceItems={}",
        detectors,
        extinguishers,
        items
    );
}

pub fn set_asset_totals(detectors: usize, extinguishers: usize, maintenance_items: usize) {
    metrics::gauge!("safetrack_detectors_total").set(detectors as f64);
    metrics::gauge!("safetrack_extinguishers_total").set(extinguishers as f64);
    metrics::gauge!("safetrack_maintenance_items_total").set(maintenance_items as f64);
}

pub fn increment_alerts_raised(source_kind: SourceKind) {
    metrics::counter!("safetrack_alerts_raised_total", "source_kind" => source_kind.to_string())
        .increment(1);
}

pub fn increment_alerts_acknowledged() {
    metrics::counter!("safetrack_alerts_acknowledged_total").increment(1);
}

pub fn increment_transitions(asset: &'static str, action: &'static str) {
    metrics::counter!("safetrack_transitions_total", "asset" => asset, "action" => action)
        .increment(1);
}

pub fn increment_rejections(asset: &'static str, action: &'static str, reason: &'static str) {
    metrics::counter!(
        "safetrack_transitions_rejected_total",
        "asset" => asset,
        "action" => action,
        "reason" => reason
    )
    .increment(1);
}

pub fn increment_storage_errors() {
    metrics::counter!("safetrack_storage_errors_total").increment(1);
}

pub fn record_acknowledgment_time(seconds: f64) {
    metrics::histogram!("safetrack_alert_acknowledgment_duration_seconds").record(seconds);
}
