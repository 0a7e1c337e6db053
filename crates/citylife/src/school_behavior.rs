//! School behavior strategy: class assignment and the daily go-to-school,
//! lunch, and return-home decisions. Mirrors the work planner, without
//! shifts handoffs or overtime.

use crate::buildings::BuildingRegistry;
use crate::citizens::AgeGroup;
use crate::config::SchedulingConfig;
use crate::open_hours::{plan_departure, HoursWindow};
use crate::schedule::{ResidentState, Schedule, SchoolClass, SchoolStatus};
use crate::sim_rng::SimRng;
use crate::time_of_day::GameClock;
use crate::work_time::school_class_hours;

// ---------------------------------------------------------------------------
// Strategy trait
// ---------------------------------------------------------------------------

pub trait SchoolBehavior: Send + Sync {
    fn begin_new_day(&mut self, clock: &GameClock);

    /// Recompute the cached class assignment and hours. Called when the
    /// school building changes or the assignment was never made.
    fn update_school_class(
        &self,
        schedule: &mut Schedule,
        buildings: &BuildingRegistry,
        cfg: &SchedulingConfig,
        rng: &mut SimRng,
    );

    fn should_schedule_go_to_school(
        &self,
        schedule: &Schedule,
        clock: &GameClock,
        cfg: &SchedulingConfig,
    ) -> bool;

    fn schedule_go_to_school(
        &self,
        schedule: &mut Schedule,
        at_home: bool,
        fresh_travel_estimate: f32,
        clock: &GameClock,
        cfg: &SchedulingConfig,
    );

    /// Campus lunch for day-class students; returns false when none happens.
    fn schedule_lunch(
        &self,
        schedule: &mut Schedule,
        age: AgeGroup,
        buildings: &BuildingRegistry,
        clock: &GameClock,
        cfg: &SchedulingConfig,
        rng: &mut SimRng,
    ) -> bool;

    fn schedule_return_from_school(&self, schedule: &mut Schedule, clock: &GameClock);
}

// ---------------------------------------------------------------------------
// Default implementation
// ---------------------------------------------------------------------------

pub struct SchoolPlanner;

impl SchoolPlanner {
    /// Campus-scale buildings (universities, player campuses) have canteens;
    /// smaller schools keep students in for lunch.
    fn is_campus(schedule: &Schedule, buildings: &BuildingRegistry) -> bool {
        let Some(building) = schedule.school_building else {
            return false;
        };
        match buildings.get(building) {
            Some(info) => info.level >= 3 || info.kind == crate::buildings::BuildingKind::PlayerEducation,
            None => false,
        }
    }
}

impl SchoolBehavior for SchoolPlanner {
    fn begin_new_day(&mut self, _clock: &GameClock) {
        // Stateless planner; nothing carries over between days.
    }

    fn update_school_class(
        &self,
        schedule: &mut Schedule,
        buildings: &BuildingRegistry,
        cfg: &SchedulingConfig,
        rng: &mut SimRng,
    ) {
        let Some(building) = schedule.school_building else {
            schedule.school_status = SchoolStatus::None;
            schedule.school_class_start_hour = 0.0;
            schedule.school_class_end_hour = 0.0;
            return;
        };
        let level = buildings.get(building).map_or(1, |info| info.level);

        // Night classes exist only at university level.
        let class = if level >= 3 && rng.chance(cfg.night_class_quota) {
            SchoolClass::NightClass
        } else {
            SchoolClass::DayClass
        };
        let (start, end) = school_class_hours(class, cfg);
        schedule.school_class = class;
        schedule.school_class_start_hour = start;
        schedule.school_class_end_hour = end;
        if schedule.school_status != SchoolStatus::OnVacation {
            schedule.school_status = SchoolStatus::Studying;
        }
    }

    fn should_schedule_go_to_school(
        &self,
        schedule: &Schedule,
        clock: &GameClock,
        cfg: &SchedulingConfig,
    ) -> bool {
        if schedule.current_state == ResidentState::AtSchool {
            return false;
        }
        if schedule.school_building.is_none() || schedule.school_status != SchoolStatus::Studying {
            return false;
        }
        if cfg.is_weekend_enabled && clock.is_weekend() {
            return false;
        }
        true
    }

    fn schedule_go_to_school(
        &self,
        schedule: &mut Schedule,
        at_home: bool,
        fresh_travel_estimate: f32,
        clock: &GameClock,
        cfg: &SchedulingConfig,
    ) {
        let travel = if at_home && schedule.travel_time_to_work > 0.0 {
            schedule.travel_time_to_work
        } else {
            fresh_travel_estimate
        };
        let departure = plan_departure(
            schedule.school_class_start_hour,
            schedule.school_class_end_hour,
            travel + cfg.simulation_cycle_hours,
            clock,
        );
        schedule.schedule(ResidentState::AtSchool, departure);
    }

    fn schedule_lunch(
        &self,
        schedule: &mut Schedule,
        age: AgeGroup,
        buildings: &BuildingRegistry,
        clock: &GameClock,
        cfg: &SchedulingConfig,
        rng: &mut SimRng,
    ) -> bool {
        if !cfg.is_lunch_time_enabled || !age.takes_lunch() {
            return false;
        }
        if schedule.school_class != SchoolClass::DayClass {
            return false;
        }
        if !Self::is_campus(schedule, buildings) {
            return false;
        }
        let class = HoursWindow::new(
            schedule.school_class_start_hour,
            schedule.school_class_end_hour,
        );
        if !class.contains(cfg.lunch_begin) || clock.hour >= cfg.lunch_begin {
            return false;
        }
        if !rng.chance(cfg.lunch_quota) {
            return false;
        }
        schedule.schedule(
            ResidentState::Lunch,
            Some(clock.future_hour_time(cfg.lunch_begin)),
        );
        true
    }

    fn schedule_return_from_school(&self, schedule: &mut Schedule, clock: &GameClock) {
        let depart = if crate::work_behavior::past_activity_end(
            schedule.school_class_start_hour,
            schedule.school_class_end_hour,
            clock.hour,
        ) {
            clock.now()
        } else {
            clock.future_hour_time(schedule.school_class_end_hour)
        };
        schedule.schedule(ResidentState::AtHome, Some(depart));
    }
}
