//! Time-derived status.
//!
//! Nothing in here writes. The persisted `stored_status` of an asset is the
//! authoritative state machine value; the due flags computed here are
//! advisory and decide which actions are currently permitted. An extinguisher
//! can be `stored_status = active` and `refill_due = true` at the same time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::extinguisher::{ExtinguisherStatus, FireExtinguisher};
use super::maintenance::{MaintenanceItem, MaintenanceStatus};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Whole days from `now` until `date`, rounded up. Negative once overdue.
pub fn days_until(date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (date - now).num_milliseconds();
    let whole = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        whole
    } else {
        whole + 1
    }
}

/// Display/aggregation bucket for an extinguisher.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EffectiveExtinguisherStatus {
    Active,
    Triggered,
    RefillDue,
    PressureTestDue,
}

/// Due flags for one extinguisher at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DueFlags {
    pub days_until_refill: i64,
    pub days_until_pressure_test: i64,
    pub refill_due: bool,
    pub pressure_test_due: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct StatusDeriver {
    lead_days: i64,
}

impl StatusDeriver {
    pub fn new(lead_days: i64) -> Self {
        Self { lead_days }
    }

    pub fn lead_days(&self) -> i64 {
        self.lead_days
    }

    /// Refill is due inside the lead window or after a discharge. This gates
    /// the refill action, so an explicit `refill_due` flag does not open it.
    pub fn refill_due(&self, ext: &FireExtinguisher, now: DateTime<Utc>) -> bool {
        days_until(ext.next_refill_due, now) <= self.lead_days
            || ext.stored_status == ExtinguisherStatus::Triggered
    }

    pub fn pressure_test_due(&self, ext: &FireExtinguisher, now: DateTime<Utc>) -> bool {
        days_until(ext.next_pressure_test_due, now) <= self.lead_days
    }

    pub fn due_flags(&self, ext: &FireExtinguisher, now: DateTime<Utc>) -> DueFlags {
        DueFlags {
            days_until_refill: days_until(ext.next_refill_due, now),
            days_until_pressure_test: days_until(ext.next_pressure_test_due, now),
            refill_due: self.refill_due(ext, now),
            pressure_test_due: self.pressure_test_due(ext, now),
        }
    }

    /// Triggered wins, then refill, then pressure test. A unit explicitly
    /// flagged with a due status is bucketed there even when its dates are
    /// still far off.
    pub fn extinguisher_status(
        &self,
        ext: &FireExtinguisher,
        now: DateTime<Utc>,
    ) -> EffectiveExtinguisherStatus {
        if ext.stored_status == ExtinguisherStatus::Triggered {
            EffectiveExtinguisherStatus::Triggered
        } else if self.refill_due(ext, now) || ext.stored_status == ExtinguisherStatus::RefillDue {
            EffectiveExtinguisherStatus::RefillDue
        } else if self.pressure_test_due(ext, now)
            || ext.stored_status == ExtinguisherStatus::PressureTestDue
        {
            EffectiveExtinguisherStatus::PressureTestDue
        } else {
            EffectiveExtinguisherStatus::Active
        }
    }

    /// Open items whose due date has arrived read as overdue, unless their
    /// status was set explicitly on or after that date. The stored status is
    /// left alone.
    pub fn maintenance_status(
        &self,
        item: &MaintenanceItem,
        now: DateTime<Utc>,
    ) -> MaintenanceStatus {
        if item.status == MaintenanceStatus::Completed {
            return MaintenanceStatus::Completed;
        }
        match item.due_date {
            Some(due)
                if days_until(due, now) <= 0
                    && item.status_set_at.map_or(true, |at| at < due) =>
            {
                MaintenanceStatus::Overdue
            }
            _ => item.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::extinguisher::DispatchStatus;
    use crate::engine::maintenance::Priority;
    use chrono::{Duration, TimeZone};
    use strum::IntoEnumIterator;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 9, 30, 0).unwrap()
    }

    fn extinguisher(refill_in: Duration, test_in: Duration) -> FireExtinguisher {
        let now = now();
        FireExtinguisher {
            id: Uuid::new_v4(),
            name: "EXT-1".into(),
            location: "Kitchen".into(),
            stored_status: ExtinguisherStatus::Active,
            last_refill: now - Duration::days(100),
            next_refill_due: now + refill_in,
            last_pressure_test: now - Duration::days(100),
            next_pressure_test_due: now + test_in,
            last_triggered: None,
            dispatch_status: DispatchStatus::None,
            dispatch_date: None,
            received_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn days_until_rounds_up() {
        let now = now();
        assert_eq!(days_until(now, now), 0);
        assert_eq!(days_until(now + Duration::hours(1), now), 1);
        assert_eq!(days_until(now + Duration::days(1), now), 1);
        assert_eq!(days_until(now + Duration::hours(25), now), 2);
        assert_eq!(days_until(now - Duration::hours(1), now), 0);
        assert_eq!(days_until(now - Duration::hours(36), now), -1);
        assert_eq!(days_until(now - Duration::days(2), now), -2);
    }

    #[test]
    fn refill_due_matches_window_for_every_offset() {
        let deriver = StatusDeriver::new(30);
        for offset in -365..=365 {
            let mut ext = extinguisher(Duration::days(offset), Duration::days(900));
            for stored in ExtinguisherStatus::iter().filter(|s| *s != ExtinguisherStatus::Triggered) {
                ext.stored_status = stored;
                assert_eq!(
                    deriver.refill_due(&ext, now()),
                    offset <= 30,
                    "{stored} at offset {offset}"
                );
            }

            ext.stored_status = ExtinguisherStatus::Triggered;
            assert!(deriver.refill_due(&ext, now()), "triggered at offset {offset}");
        }
    }

    #[test]
    fn pressure_test_due_matches_window_for_every_offset() {
        let deriver = StatusDeriver::new(30);
        for offset in -365..=365 {
            let mut ext = extinguisher(Duration::days(900), Duration::days(offset));
            for stored in ExtinguisherStatus::iter() {
                ext.stored_status = stored;
                assert_eq!(
                    deriver.pressure_test_due(&ext, now()),
                    offset <= 30,
                    "{stored} at offset {offset}"
                );
            }
        }
    }

    #[test]
    fn flagged_status_buckets_without_opening_the_action() {
        let deriver = StatusDeriver::new(30);
        let mut ext = extinguisher(Duration::days(400), Duration::days(900));

        ext.stored_status = ExtinguisherStatus::RefillDue;
        assert!(!deriver.refill_due(&ext, now()));
        assert_eq!(
            deriver.extinguisher_status(&ext, now()),
            EffectiveExtinguisherStatus::RefillDue
        );

        ext.stored_status = ExtinguisherStatus::PressureTestDue;
        assert!(!deriver.pressure_test_due(&ext, now()));
        assert_eq!(
            deriver.extinguisher_status(&ext, now()),
            EffectiveExtinguisherStatus::PressureTestDue
        );
    }

    #[test]
    fn due_flag_does_not_touch_stored_status() {
        let deriver = StatusDeriver::new(30);
        let ext = extinguisher(Duration::days(5), Duration::days(900));
        assert!(deriver.refill_due(&ext, now()));
        assert_eq!(ext.stored_status, ExtinguisherStatus::Active);
        assert_eq!(
            deriver.extinguisher_status(&ext, now()),
            EffectiveExtinguisherStatus::RefillDue
        );
    }

    #[test]
    fn effective_status_precedence() {
        let deriver = StatusDeriver::new(30);
        let mut ext = extinguisher(Duration::days(5), Duration::days(5));
        assert_eq!(
            deriver.extinguisher_status(&ext, now()),
            EffectiveExtinguisherStatus::RefillDue
        );

        ext.stored_status = ExtinguisherStatus::Triggered;
        assert_eq!(
            deriver.extinguisher_status(&ext, now()),
            EffectiveExtinguisherStatus::Triggered
        );

        let ext = extinguisher(Duration::days(200), Duration::days(10));
        assert_eq!(
            deriver.extinguisher_status(&ext, now()),
            EffectiveExtinguisherStatus::PressureTestDue
        );

        let ext = extinguisher(Duration::days(200), Duration::days(400));
        assert_eq!(
            deriver.extinguisher_status(&ext, now()),
            EffectiveExtinguisherStatus::Active
        );
    }

    fn item(status: MaintenanceStatus, due: Option<DateTime<Utc>>) -> MaintenanceItem {
        MaintenanceItem {
            id: Uuid::new_v4(),
            name: "Replace batteries".into(),
            description: String::new(),
            priority: Priority::Medium,
            assigned_to: None,
            status,
            due_date: due,
            status_set_at: None,
            notes: Vec::new(),
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn maintenance_overdue_is_derived_not_stored() {
        let deriver = StatusDeriver::new(30);
        let past = Some(now() - Duration::days(1));
        let future = Some(now() + Duration::days(3));

        let pending = item(MaintenanceStatus::Pending, past);
        assert_eq!(deriver.maintenance_status(&pending, now()), MaintenanceStatus::Overdue);
        assert_eq!(pending.status, MaintenanceStatus::Pending);

        let running = item(MaintenanceStatus::InProgress, Some(now()));
        assert_eq!(deriver.maintenance_status(&running, now()), MaintenanceStatus::Overdue);

        let done = item(MaintenanceStatus::Completed, past);
        assert_eq!(deriver.maintenance_status(&done, now()), MaintenanceStatus::Completed);

        let upcoming = item(MaintenanceStatus::Pending, future);
        assert_eq!(deriver.maintenance_status(&upcoming, now()), MaintenanceStatus::Pending);

        let undated = item(MaintenanceStatus::InProgress, None);
        assert_eq!(deriver.maintenance_status(&undated, now()), MaintenanceStatus::InProgress);
    }

    #[test]
    fn explicit_status_since_due_date_suppresses_overdue() {
        let deriver = StatusDeriver::new(30);
        let due = now() - Duration::days(1);

        let mut running = item(MaintenanceStatus::InProgress, Some(due));
        running.status_set_at = Some(due - Duration::hours(1));
        assert_eq!(deriver.maintenance_status(&running, now()), MaintenanceStatus::Overdue);

        running.status_set_at = Some(due);
        assert_eq!(deriver.maintenance_status(&running, now()), MaintenanceStatus::InProgress);

        let mut reopened = item(MaintenanceStatus::Pending, Some(due));
        reopened.status_set_at = Some(now());
        assert_eq!(deriver.maintenance_status(&reopened, now()), MaintenanceStatus::Pending);
    }
}
