//! Demo inventory for a fresh install.

use chrono::Duration;
use tracing::info;

use crate::engine::detector::NewDetector;
use crate::engine::error::EngineResult;
use crate::engine::extinguisher::NewExtinguisher;
use crate::engine::maintenance::{NewMaintenanceItem, Priority};
use crate::engine::Engine;

const DETECTORS: [(&str, &str, i32); 4] = [
    ("Smoke Detector A1", "Main Office - Floor 1", 85),
    ("Smoke Detector B2", "Kitchen - Floor 2", 92),
    ("Smoke Detector C3", "Server Room - Basement", 78),
    ("Smoke Detector D4", "Conference Room - Floor 3", 95),
];

/// Name, location, days since refill, days since pressure test.
const EXTINGUISHERS: [(&str, &str, i64, i64); 4] = [
    ("Fire Extinguisher FE-001", "Main Lobby - Floor 1", 30, 365),
    ("Fire Extinguisher FE-002", "Kitchen - Floor 2", 350, 730),
    ("Fire Extinguisher FE-003", "Server Room - Basement", 180, 1095),
    ("Fire Extinguisher FE-004", "Emergency Exit - Floor 3", 90, 200),
];

/// Name, description, priority, days until due.
const MAINTENANCE: [(&str, &str, Priority, i64); 3] = [
    (
        "Inspect sprinkler heads",
        "Visual check of every sprinkler head on floors 1-3",
        Priority::High,
        7,
    ),
    (
        "Replace detector batteries",
        "Swap batteries in any detector below 80%",
        Priority::Medium,
        21,
    ),
    (
        "Update evacuation maps",
        "Reprint maps after the floor 2 kitchen refit",
        Priority::Low,
        60,
    ),
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub detectors: usize,
    pub extinguishers: usize,
    pub maintenance_items: usize,
}

/// Insert the demo inventory, but only into an engine with no assets.
/// Returns `None` when anything was already there.
pub async fn seed_sample_data(engine: &Engine) -> EngineResult<Option<SeedSummary>> {
    if !engine.has_no_assets() {
        info!("Skipping sample data: stores are not empty");
        return Ok(None);
    }

    let now = engine.now();
    let mut summary = SeedSummary::default();

    for (name, location, battery) in DETECTORS {
        engine
            .create_detector(NewDetector {
                name: name.to_string(),
                location: location.to_string(),
                battery_level: Some(battery),
            })
            .await?;
        summary.detectors += 1;
    }

    for (name, location, since_refill, since_test) in EXTINGUISHERS {
        engine
            .create_extinguisher(NewExtinguisher {
                name: name.to_string(),
                location: location.to_string(),
                last_refill: now - Duration::days(since_refill),
                last_pressure_test: now - Duration::days(since_test),
            })
            .await?;
        summary.extinguishers += 1;
    }

    for (name, description, priority, due_in) in MAINTENANCE {
        engine
            .create_maintenance_item(NewMaintenanceItem {
                name: name.to_string(),
                description: description.to_string(),
                priority: Some(priority),
                assigned_to: None,
                due_date: Some(now + Duration::days(due_in)),
            })
            .await?;
        summary.maintenance_items += 1;
    }

    info!(
        detectors = summary.detectors,
        extinguishers = summary.extinguishers,
        maintenance_items = summary.maintenance_items,
        "Inserted sample data"
    );
    Ok(Some(summary))
}
