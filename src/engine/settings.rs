use chrono::Duration;

/// Tunables for due-date arithmetic and the dashboard view.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub refill_interval: Duration,
    pub pressure_test_interval: Duration,
    /// A due flag turns on once the due date is this many days away or closer.
    pub due_lead_days: i64,
    pub dashboard_alert_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            refill_interval: Duration::days(365),
            pressure_test_interval: Duration::days(365 * 3),
            due_lead_days: 30,
            dashboard_alert_limit: 10,
        }
    }
}
