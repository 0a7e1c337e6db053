//! Scheduling configuration surface.
//!
//! Every hour bound, quota, and service window the behavior strategies and
//! availability policy consume lives here. Values are assumed validated by
//! whatever loads them (UI, mod settings, host config files); the core only
//! applies the wrap-around interval semantics, never range checks.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::open_hours::HoursWindow;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Hour the continuous-day shift begins (single-shift continuous buildings).
pub const CONTINUOUS_DAY_BEGIN: f32 = 8.0;

/// Hour the continuous-day shift ends; the continuous-night shift mirrors it.
pub const CONTINUOUS_DAY_END: f32 = 20.0;

/// Number of service-window classes per category, indexed by building level.
pub const SERVICE_WINDOW_CLASSES: usize = 4;

// ---------------------------------------------------------------------------
// Configuration resource
// ---------------------------------------------------------------------------

/// Quotas are percentages in `[0, 100]` compared against a uniform roll.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Hour most residents get up.
    pub wake_up_hour: f32,
    /// Earliest hour anyone gets up; extended shifts key off this.
    pub earliest_wake_up_hour: f32,
    /// Hour most residents go to bed; second shifts end here.
    pub go_to_sleep_hour: f32,

    pub work_begin: f32,
    pub work_end: f32,
    pub school_begin: f32,
    pub school_end: f32,
    pub lunch_begin: f32,
    pub lunch_end: f32,

    /// Whether weekends exist at all; when false every day is a work day.
    pub is_weekend_enabled: bool,
    pub is_lunch_time_enabled: bool,
    /// When set, a workable building with zero live workers counts as closed.
    pub workforce_matters: bool,

    /// Chance a worker at a 3-shift building draws the night shift.
    pub night_shift_quota: u32,
    /// Chance a worker at a 2+ shift building draws the second shift.
    pub second_shift_quota: u32,
    /// Chance a worker at a continuous building draws the night half.
    pub continuous_night_quota: u32,
    /// Chance a university student is assigned to night classes.
    pub night_class_quota: u32,
    /// Chance a worker goes out for lunch on a given work day.
    pub lunch_quota: u32,
    /// Chance a worker leaves exactly at shift end.
    pub on_time_quota: u32,
    pub max_overtime_hours: f32,

    /// Second-chance quotas for low commercial buildings that did not
    /// qualify for night/weekend activity by category.
    pub commercial_night_quota: u32,
    pub commercial_weekend_quota: u32,

    /// Cap on any single observed travel-time sample, in hours.
    pub max_travel_time_hours: f32,
    /// Duration of one scheduling cycle, subtracted from departure times so
    /// a transition planned this pass is never already late by next pass.
    pub simulation_cycle_hours: f32,

    /// Per-category service windows, indexed by building level class.
    /// `begin == end` means the service runs around the clock.
    pub garbage_hours: [HoursWindow; SERVICE_WINDOW_CLASSES],
    pub mail_hours: [HoursWindow; SERVICE_WINDOW_CLASSES],
    pub park_maintenance_hours: [HoursWindow; SERVICE_WINDOW_CLASSES],
    pub road_maintenance_hours: [HoursWindow; SERVICE_WINDOW_CLASSES],
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            wake_up_hour: 6.0,
            earliest_wake_up_hour: 4.0,
            go_to_sleep_hour: 22.0,
            work_begin: 9.0,
            work_end: 18.0,
            school_begin: 8.0,
            school_end: 14.0,
            lunch_begin: 12.0,
            lunch_end: 13.0,
            is_weekend_enabled: true,
            is_lunch_time_enabled: true,
            workforce_matters: false,
            night_shift_quota: 6,
            second_shift_quota: 25,
            continuous_night_quota: 30,
            night_class_quota: 20,
            lunch_quota: 80,
            on_time_quota: 80,
            max_overtime_hours: 2.0,
            commercial_night_quota: 20,
            commercial_weekend_quota: 35,
            max_travel_time_hours: 4.0,
            simulation_cycle_hours: 0.25,
            // Trucks roll at night for street-level pickup; processing
            // facilities run around the clock.
            garbage_hours: [
                HoursWindow::new(22.0, 6.0),
                HoursWindow::new(22.0, 6.0),
                HoursWindow::new(0.0, 0.0),
                HoursWindow::new(0.0, 0.0),
            ],
            mail_hours: [
                HoursWindow::new(8.0, 18.0),
                HoursWindow::new(8.0, 18.0),
                HoursWindow::new(6.0, 20.0),
                HoursWindow::new(0.0, 0.0),
            ],
            park_maintenance_hours: [
                HoursWindow::new(6.0, 20.0),
                HoursWindow::new(6.0, 20.0),
                HoursWindow::new(6.0, 20.0),
                HoursWindow::new(0.0, 0.0),
            ],
            road_maintenance_hours: [
                HoursWindow::new(20.0, 6.0),
                HoursWindow::new(20.0, 6.0),
                HoursWindow::new(0.0, 0.0),
                HoursWindow::new(0.0, 0.0),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hours_are_ordered() {
        let cfg = SchedulingConfig::default();
        assert!(cfg.earliest_wake_up_hour < cfg.wake_up_hour);
        assert!(cfg.wake_up_hour < cfg.work_begin);
        assert!(cfg.work_begin < cfg.lunch_begin);
        assert!(cfg.lunch_begin < cfg.lunch_end);
        assert!(cfg.lunch_end < cfg.work_end);
        assert!(cfg.work_end < cfg.go_to_sleep_hour);
    }

    #[test]
    fn test_default_quotas_in_range() {
        let cfg = SchedulingConfig::default();
        for quota in [
            cfg.night_shift_quota,
            cfg.second_shift_quota,
            cfg.continuous_night_quota,
            cfg.night_class_quota,
            cfg.lunch_quota,
            cfg.on_time_quota,
            cfg.commercial_night_quota,
            cfg.commercial_weekend_quota,
        ] {
            assert!(quota <= 100);
        }
    }

    #[test]
    fn test_service_window_classes() {
        let cfg = SchedulingConfig::default();
        assert_eq!(cfg.garbage_hours.len(), SERVICE_WINDOW_CLASSES);
        // Top-class facilities run continuously.
        assert!(cfg.garbage_hours[3].is_continuous());
        assert!(cfg.mail_hours[3].is_continuous());
    }
}
