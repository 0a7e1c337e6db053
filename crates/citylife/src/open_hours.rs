//! Building availability policy: pure predicates over a building's
//! `WorkTime`, category, the clock, and the configuration. No state of its
//! own; everything here is a function so callers and tests can probe any
//! hour without touching a world.

use crate::buildings::{is_parking_structure, BuildingId, BuildingKind, BuildingRegistry};
use crate::config::{SchedulingConfig, CONTINUOUS_DAY_BEGIN, CONTINUOUS_DAY_END};
use crate::time_of_day::{hours_to_minutes, wrap_hour, GameClock, SimTime};
use crate::work_time::{BuildingWorkTimeRegistry, WorkTime};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wrap-aware hour window
// ---------------------------------------------------------------------------

/// Half-open `[begin, end)` window over the 24h clock.
///
/// `begin == end` means "always" (a continuous service); `begin > end` wraps
/// past midnight, in which case an hour matches when `h >= begin || h < end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoursWindow {
    pub begin: f32,
    pub end: f32,
}

impl HoursWindow {
    pub fn new(begin: f32, end: f32) -> Self {
        Self { begin, end }
    }

    pub fn is_continuous(&self) -> bool {
        self.begin == self.end
    }

    pub fn contains(&self, hour: f32) -> bool {
        let h = wrap_hour(hour);
        if self.begin == self.end {
            true
        } else if self.begin < self.end {
            self.begin <= h && h < self.end
        } else {
            h >= self.begin || h < self.end
        }
    }
}

// ---------------------------------------------------------------------------
// Departure planning
// ---------------------------------------------------------------------------

/// Plan when to leave for an activity running `[start_hour, end_hour)`,
/// given the lead time (travel plus one scheduling cycle).
///
/// Returns `None` when the citizen should leave immediately: the computed
/// departure is already past, but leaving now still reaches the activity
/// before it ends (wrap-aware). When even that fails, the departure rolls
/// over to the next day's occurrence.
pub fn plan_departure(
    start_hour: f32,
    end_hour: f32,
    lead_hours: f32,
    clock: &GameClock,
) -> Option<SimTime> {
    let lead_min = hours_to_minutes(lead_hours);
    let start_time = clock.future_hour_time(start_hour);
    let now = clock.now();
    let slack = now.minutes_until(start_time);
    if slack > lead_min {
        return Some(SimTime(start_time.0 - lead_min));
    }
    let arrival_hour = wrap_hour(clock.hour + lead_hours);
    if HoursWindow::new(start_hour, end_hour).contains(arrival_hour) {
        None
    } else {
        Some(SimTime(start_time.0 + SimTime::MINUTES_PER_DAY - lead_min))
    }
}

// ---------------------------------------------------------------------------
// Generic open-hours evaluation
// ---------------------------------------------------------------------------

/// Daytime open window implied by a building's shift structure, or `None`
/// for buildings that never close.
pub fn building_open_window(
    work_time: &WorkTime,
    kind: BuildingKind,
    cfg: &SchedulingConfig,
) -> Option<HoursWindow> {
    if work_time.has_continuous_work_shift {
        if work_time.work_shifts == 1 {
            return Some(HoursWindow::new(CONTINUOUS_DAY_BEGIN, CONTINUOUS_DAY_END));
        }
        return None;
    }
    if work_time.work_shifts >= 3 {
        return None;
    }
    let begin = if work_time.has_extended_work_shift {
        let staff_hour = if kind.is_education() {
            cfg.school_begin
        } else {
            cfg.wake_up_hour
        };
        cfg.earliest_wake_up_hour.min(staff_hour)
    } else if kind.is_education() {
        cfg.school_begin
    } else {
        cfg.work_begin
    };
    let end = if work_time.work_shifts >= 2 {
        cfg.go_to_sleep_hour
    } else if kind.is_education() {
        cfg.school_end
    } else {
        cfg.work_end
    };
    Some(HoursWindow::new(begin, end))
}

/// Generic evaluator: is a building with this work time open right now?
pub fn evaluate_work_time(
    work_time: &WorkTime,
    kind: BuildingKind,
    cfg: &SchedulingConfig,
    clock: &GameClock,
) -> bool {
    if clock.is_night_time() {
        if work_time.work_at_night {
            return true;
        }
        // Two-shift buildings keep their evening tail open past sunset.
        if work_time.work_shifts == 2 && !work_time.has_continuous_work_shift {
            let begin = cfg.wake_up_hour.max(cfg.earliest_wake_up_hour);
            return HoursWindow::new(begin, cfg.go_to_sleep_hour).contains(clock.hour);
        }
        return false;
    }
    if cfg.is_weekend_enabled && clock.is_weekend() && !work_time.work_at_weekends {
        return false;
    }
    match building_open_window(work_time, kind, cfg) {
        None => true,
        Some(window) => window.contains(clock.hour),
    }
}

/// Category-aware availability: the special cases first, then the generic
/// evaluator, then the workforce gate.
pub fn is_building_working(
    id: BuildingId,
    buildings: &BuildingRegistry,
    work_times: &BuildingWorkTimeRegistry,
    cfg: &SchedulingConfig,
    clock: &GameClock,
) -> bool {
    let Some(info) = buildings.get(id) else {
        return false;
    };
    if !info.active {
        return false;
    }
    match info.kind {
        BuildingKind::Residential => return true,
        BuildingKind::ChildCare | BuildingKind::ElderCare => return true,
        BuildingKind::AreaMain | BuildingKind::Warehouse => return true,
        BuildingKind::Beautification => {
            if clock.is_night_time() {
                return info.night_tours;
            }
            return true;
        }
        _ => {}
    }
    if cfg.workforce_matters && info.worker_count == 0 {
        return false;
    }
    evaluate_work_time(&work_times.get(id), info.kind, cfg, clock)
}

// ---------------------------------------------------------------------------
// Noise restriction
// ---------------------------------------------------------------------------

/// Leisure venues under a noise ordinance refuse visitors at night. When a
/// journey toward the venue is in progress, the projected arrival hour (now
/// plus the travel estimate) decides, not the current hour.
pub fn is_noise_restricted(
    id: BuildingId,
    buildings: &BuildingRegistry,
    clock: &GameClock,
    travel_in_progress_hours: Option<f32>,
) -> bool {
    let Some(info) = buildings.get(id) else {
        return false;
    };
    if info.kind != BuildingKind::CommercialLeisure || !info.noise_restricted {
        return false;
    }
    let hour = match travel_in_progress_hours {
        Some(travel) => wrap_hour(clock.hour + travel),
        None => clock.hour,
    };
    clock.is_night_hour(hour)
}

// ---------------------------------------------------------------------------
// Service windows
// ---------------------------------------------------------------------------

fn service_window(windows: &[HoursWindow; 4], level: u8) -> HoursWindow {
    windows[(level.clamp(1, 4) - 1) as usize]
}

fn in_service_window(
    id: BuildingId,
    buildings: &BuildingRegistry,
    windows: &[HoursWindow; 4],
    clock: &GameClock,
) -> bool {
    match buildings.get(id) {
        Some(info) if info.active => service_window(windows, info.level).contains(clock.hour),
        _ => false,
    }
}

pub fn is_garbage_hours(
    id: BuildingId,
    buildings: &BuildingRegistry,
    cfg: &SchedulingConfig,
    clock: &GameClock,
) -> bool {
    in_service_window(id, buildings, &cfg.garbage_hours, clock)
}

pub fn is_mail_hours(
    id: BuildingId,
    buildings: &BuildingRegistry,
    cfg: &SchedulingConfig,
    clock: &GameClock,
) -> bool {
    in_service_window(id, buildings, &cfg.mail_hours, clock)
}

pub fn is_park_maintenance_hours(
    id: BuildingId,
    buildings: &BuildingRegistry,
    cfg: &SchedulingConfig,
    clock: &GameClock,
) -> bool {
    in_service_window(id, buildings, &cfg.park_maintenance_hours, clock)
}

pub fn is_road_maintenance_hours(
    id: BuildingId,
    buildings: &BuildingRegistry,
    cfg: &SchedulingConfig,
    clock: &GameClock,
) -> bool {
    in_service_window(id, buildings, &cfg.road_maintenance_hours, clock)
}

// ---------------------------------------------------------------------------
// Visit targets
// ---------------------------------------------------------------------------

fn passes_target_gates(id: BuildingId, buildings: &BuildingRegistry) -> bool {
    let Some(info) = buildings.get(id) else {
        return false;
    };
    if !info.active {
        return false;
    }
    if is_parking_structure(&info.name) {
        return false;
    }
    if info.kind == BuildingKind::Monument && !info.unique_monument {
        return false;
    }
    true
}

pub fn is_entertainment_target(
    id: BuildingId,
    buildings: &BuildingRegistry,
    work_times: &BuildingWorkTimeRegistry,
    cfg: &SchedulingConfig,
    clock: &GameClock,
) -> bool {
    if !passes_target_gates(id, buildings) {
        return false;
    }
    let Some(info) = buildings.get(id) else {
        return false;
    };
    let entertains = matches!(
        info.kind,
        BuildingKind::CommercialLeisure
            | BuildingKind::Beautification
            | BuildingKind::Tourism
            | BuildingKind::Monument
            | BuildingKind::Museum
            | BuildingKind::VarsitySports
    );
    entertains && is_building_working(id, buildings, work_times, cfg, clock)
}

pub fn is_shopping_target(
    id: BuildingId,
    buildings: &BuildingRegistry,
    work_times: &BuildingWorkTimeRegistry,
    cfg: &SchedulingConfig,
    clock: &GameClock,
) -> bool {
    if !passes_target_gates(id, buildings) {
        return false;
    }
    let Some(info) = buildings.get(id) else {
        return false;
    };
    let sells = matches!(
        info.kind,
        BuildingKind::CommercialLow | BuildingKind::CommercialHigh | BuildingKind::CommercialTourist
    );
    sells && is_building_working(id, buildings, work_times, cfg, clock)
}
