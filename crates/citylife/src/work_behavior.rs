//! Work behavior strategy: shift assignment and the daily go-to-work,
//! lunch, and return-home decisions.
//!
//! Kept behind a trait so tests (and hosts with their own labor models) can
//! swap in deterministic implementations; the orchestrator only ever talks
//! to the trait.

use crate::buildings::BuildingRegistry;
use crate::citizens::AgeGroup;
use crate::config::SchedulingConfig;
use crate::open_hours::{plan_departure, HoursWindow};
use crate::schedule::{ResidentState, Schedule, WorkShift, WorkStatus};
use crate::sim_rng::SimRng;
use crate::time_of_day::{hours_to_minutes, wrap_hour, GameClock, SimTime};
use crate::work_time::{shift_hours, BuildingWorkTimeRegistry};

// ---------------------------------------------------------------------------
// Strategy trait
// ---------------------------------------------------------------------------

pub trait WorkBehavior: Send + Sync {
    /// Daily reset hook, called once when the simulated day changes.
    fn begin_new_day(&mut self, clock: &GameClock);

    /// Recompute the cached shift assignment and hours. Called when the work
    /// building changes or the assignment was never made.
    fn update_work_shift(
        &self,
        schedule: &mut Schedule,
        buildings: &BuildingRegistry,
        work_times: &mut BuildingWorkTimeRegistry,
        cfg: &SchedulingConfig,
        rng: &mut SimRng,
    );

    fn should_schedule_go_to_work(
        &self,
        schedule: &Schedule,
        clock: &GameClock,
        cfg: &SchedulingConfig,
    ) -> bool;

    /// Write the go-to-work transition. `at_home` selects the cached travel
    /// estimate; otherwise `fresh_travel_estimate` (from the host's router)
    /// is used.
    fn schedule_go_to_work(
        &self,
        schedule: &mut Schedule,
        at_home: bool,
        fresh_travel_estimate: f32,
        clock: &GameClock,
        cfg: &SchedulingConfig,
    );

    /// Try to plan a lunch break; returns false when no lunch happens today.
    fn schedule_lunch(
        &self,
        schedule: &mut Schedule,
        age: AgeGroup,
        clock: &GameClock,
        cfg: &SchedulingConfig,
        rng: &mut SimRng,
    ) -> bool;

    fn schedule_return_from_lunch(&self, schedule: &mut Schedule, clock: &GameClock, cfg: &SchedulingConfig);

    fn schedule_return_from_work(
        &self,
        schedule: &mut Schedule,
        clock: &GameClock,
        cfg: &SchedulingConfig,
        rng: &mut SimRng,
    );
}

// ---------------------------------------------------------------------------
// Default implementation
// ---------------------------------------------------------------------------

pub struct WorkPlanner;

impl WorkBehavior for WorkPlanner {
    fn begin_new_day(&mut self, _clock: &GameClock) {
        // Stateless planner; nothing carries over between days.
    }

    fn update_work_shift(
        &self,
        schedule: &mut Schedule,
        buildings: &BuildingRegistry,
        work_times: &mut BuildingWorkTimeRegistry,
        cfg: &SchedulingConfig,
        rng: &mut SimRng,
    ) {
        let Some(building) = schedule.work_building else {
            clear_work_assignment(schedule);
            return;
        };
        let Some(info) = buildings.get(building) else {
            clear_work_assignment(schedule);
            return;
        };

        // Jobless labor absorbed by a live event works the event's hours.
        if schedule.work_shift == WorkShift::Unemployed {
            if let Some(event) = info.event {
                schedule.work_shift = WorkShift::Event;
                schedule.work_shift_start_hour = event.start_hour;
                schedule.work_shift_end_hour = event.end_hour;
                schedule.works_on_weekends = true;
                schedule.event_building = Some(building);
                if schedule.work_status != WorkStatus::OnVacation {
                    schedule.work_status = WorkStatus::Working;
                }
                return;
            }
        }

        let work_time = work_times.create(building, info.kind, info.level, cfg, rng);
        let shift = if work_time.has_continuous_work_shift {
            if rng.chance(cfg.continuous_night_quota) {
                WorkShift::ContinuousNight
            } else {
                WorkShift::ContinuousDay
            }
        } else if work_time.work_shifts >= 3 && rng.chance(cfg.night_shift_quota) {
            WorkShift::Night
        } else if work_time.work_shifts >= 2 && rng.chance(cfg.second_shift_quota) {
            WorkShift::Second
        } else {
            WorkShift::First
        };

        let (start, end) = shift_hours(shift, &work_time, info.kind, info.event.as_ref(), cfg);
        schedule.work_shift = shift;
        schedule.work_shift_start_hour = start;
        schedule.work_shift_end_hour = end;
        schedule.works_on_weekends = work_time.work_at_weekends;
        schedule.event_building = None;
        if schedule.work_status != WorkStatus::OnVacation {
            schedule.work_status = WorkStatus::Working;
        }
    }

    fn should_schedule_go_to_work(
        &self,
        schedule: &Schedule,
        clock: &GameClock,
        cfg: &SchedulingConfig,
    ) -> bool {
        if schedule.current_state == ResidentState::AtWork {
            return false;
        }
        if schedule.work_building.is_none() || schedule.work_shift == WorkShift::Unemployed {
            return false;
        }
        if schedule.work_status == WorkStatus::OnVacation {
            return false;
        }
        if cfg.is_weekend_enabled && clock.is_weekend() && !schedule.works_on_weekends {
            return false;
        }
        true
    }

    fn schedule_go_to_work(
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
            schedule.work_shift_start_hour,
            schedule.work_shift_end_hour,
            travel + cfg.simulation_cycle_hours,
            clock,
        );
        schedule.schedule(ResidentState::AtWork, departure);
    }

    fn schedule_lunch(
        &self,
        schedule: &mut Schedule,
        age: AgeGroup,
        clock: &GameClock,
        cfg: &SchedulingConfig,
        rng: &mut SimRng,
    ) -> bool {
        if !cfg.is_lunch_time_enabled || !age.takes_lunch() {
            return false;
        }
        if !matches!(
            schedule.work_shift,
            WorkShift::First | WorkShift::ContinuousDay
        ) {
            return false;
        }
        let shift = HoursWindow::new(
            schedule.work_shift_start_hour,
            schedule.work_shift_end_hour,
        );
        // Lunch only makes sense when the window is still ahead and falls
        // inside today's shift.
        if !shift.contains(cfg.lunch_begin) || clock.hour >= cfg.lunch_begin {
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

    fn schedule_return_from_lunch(
        &self,
        schedule: &mut Schedule,
        clock: &GameClock,
        cfg: &SchedulingConfig,
    ) {
        schedule.schedule(
            ResidentState::AtWork,
            Some(clock.future_hour_time(cfg.lunch_end)),
        );
    }

    fn schedule_return_from_work(
        &self,
        schedule: &mut Schedule,
        clock: &GameClock,
        cfg: &SchedulingConfig,
        rng: &mut SimRng,
    ) {
        // Any lateness already accumulated (a gated handoff, a long lunch)
        // shifts the base departure to now. An early arrival is the other
        // kind of "outside the shift": those wait out the full shift.
        let base = if past_activity_end(
            schedule.work_shift_start_hour,
            schedule.work_shift_end_hour,
            clock.hour,
        ) {
            clock.now()
        } else {
            clock.future_hour_time(schedule.work_shift_end_hour)
        };
        let overtime_minutes = if rng.chance(cfg.on_time_quota) {
            0
        } else {
            hours_to_minutes(cfg.max_overtime_hours * rng.roll(100) as f32 / 100.0)
        };
        schedule.schedule(
            ResidentState::AtHome,
            Some(SimTime(base.0 + overtime_minutes)),
        );
    }
}

/// True when `hour` lies outside the `[start, end)` activity window on the
/// overstay side: closer to the end that just passed than to the next start.
pub(crate) fn past_activity_end(start: f32, end: f32, hour: f32) -> bool {
    if HoursWindow::new(start, end).contains(hour) {
        return false;
    }
    let until_start = wrap_hour(start - hour);
    let since_end = wrap_hour(hour - end);
    since_end < until_start
}

fn clear_work_assignment(schedule: &mut Schedule) {
    schedule.work_shift = WorkShift::Unemployed;
    schedule.work_shift_start_hour = 0.0;
    schedule.work_shift_end_hour = 0.0;
    schedule.works_on_weekends = false;
    schedule.work_status = WorkStatus::None;
    schedule.event_building = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::{BuildingEvent, BuildingId, BuildingInfo, BuildingKind};

    fn worker_at(kind: BuildingKind) -> (Schedule, BuildingRegistry, BuildingWorkTimeRegistry) {
        let mut schedule = Schedule::default();
        schedule.work_building = Some(BuildingId(1));
        let mut buildings = BuildingRegistry::default();
        buildings.register(BuildingId(1), BuildingInfo::new(kind, 1));
        (schedule, buildings, BuildingWorkTimeRegistry::default())
    }

    fn clock_at(hour: f32) -> GameClock {
        GameClock {
            hour,
            ..Default::default()
        }
    }

    #[test]
    fn test_update_work_shift_assigns_hours() {
        let (mut schedule, buildings, mut work_times) = worker_at(BuildingKind::Office);
        let cfg = SchedulingConfig::default();
        let mut rng = SimRng::from_seed_u64(11);

        WorkPlanner.update_work_shift(&mut schedule, &buildings, &mut work_times, &cfg, &mut rng);
        assert_ne!(schedule.work_shift, WorkShift::Unemployed);
        assert_eq!(schedule.work_status, WorkStatus::Working);
        assert!(schedule.work_shift_end_hour != schedule.work_shift_start_hour);
        // Offices rest on weekends.
        assert!(!schedule.works_on_weekends);
    }

    #[test]
    fn test_update_work_shift_without_building_clears() {
        let mut schedule = Schedule::default();
        schedule.work_shift = WorkShift::First;
        schedule.work_status = WorkStatus::Working;
        let buildings = BuildingRegistry::default();
        let mut work_times = BuildingWorkTimeRegistry::default();
        let cfg = SchedulingConfig::default();
        let mut rng = SimRng::from_seed_u64(11);

        WorkPlanner.update_work_shift(&mut schedule, &buildings, &mut work_times, &cfg, &mut rng);
        assert_eq!(schedule.work_shift, WorkShift::Unemployed);
        assert_eq!(schedule.work_status, WorkStatus::None);
    }

    #[test]
    fn test_event_absorbs_jobless_labor() {
        let (mut schedule, mut buildings, mut work_times) = worker_at(BuildingKind::VarsitySports);
        buildings.get_mut(BuildingId(1)).unwrap().event = Some(BuildingEvent {
            start_hour: 19.0,
            end_hour: 23.0,
        });
        let cfg = SchedulingConfig::default();
        let mut rng = SimRng::from_seed_u64(11);

        WorkPlanner.update_work_shift(&mut schedule, &buildings, &mut work_times, &cfg, &mut rng);
        assert_eq!(schedule.work_shift, WorkShift::Event);
        assert_eq!(schedule.work_shift_start_hour, 19.0);
        assert_eq!(schedule.work_shift_end_hour, 23.0);
        assert_eq!(schedule.event_building, Some(BuildingId(1)));
    }

    #[test]
    fn test_continuous_building_assigns_continuous_shift() {
        let (mut schedule, buildings, mut work_times) = worker_at(BuildingKind::Healthcare);
        let cfg = SchedulingConfig::default();
        let mut rng = SimRng::from_seed_u64(11);

        WorkPlanner.update_work_shift(&mut schedule, &buildings, &mut work_times, &cfg, &mut rng);
        assert!(matches!(
            schedule.work_shift,
            WorkShift::ContinuousDay | WorkShift::ContinuousNight
        ));
    }

    #[test]
    fn test_should_not_go_when_already_at_work() {
        let cfg = SchedulingConfig::default();
        let mut schedule = Schedule::default();
        schedule.work_building = Some(BuildingId(1));
        schedule.work_shift = WorkShift::First;
        schedule.current_state = ResidentState::AtWork;
        assert!(!WorkPlanner.should_schedule_go_to_work(&schedule, &clock_at(8.0), &cfg));
    }

    #[test]
    fn test_weekend_keeps_non_weekend_workers_home() {
        let cfg = SchedulingConfig::default();
        let mut schedule = Schedule::default();
        schedule.work_building = Some(BuildingId(1));
        schedule.work_shift = WorkShift::First;
        let saturday = GameClock {
            day: 6,
            hour: 8.0,
            ..Default::default()
        };
        assert!(!WorkPlanner.should_schedule_go_to_work(&schedule, &saturday, &cfg));

        schedule.works_on_weekends = true;
        assert!(WorkPlanner.should_schedule_go_to_work(&schedule, &saturday, &cfg));

        let mut no_weekends = cfg;
        no_weekends.is_weekend_enabled = false;
        schedule.works_on_weekends = false;
        assert!(WorkPlanner.should_schedule_go_to_work(&schedule, &saturday, &no_weekends));
    }

    #[test]
    fn test_vacation_blocks_work() {
        let cfg = SchedulingConfig::default();
        let mut schedule = Schedule::default();
        schedule.work_building = Some(BuildingId(1));
        schedule.work_shift = WorkShift::First;
        schedule.work_status = WorkStatus::OnVacation;
        assert!(!WorkPlanner.should_schedule_go_to_work(&schedule, &clock_at(8.0), &cfg));
    }

    #[test]
    fn test_departure_time_arithmetic() {
        let mut cfg = SchedulingConfig::default();
        cfg.simulation_cycle_hours = 0.5;
        let mut schedule = Schedule::default();
        schedule.work_shift_start_hour = 9.0;
        schedule.work_shift_end_hour = 18.0;
        schedule.travel_time_to_work = 1.0;

        // At home at 6:00 with a cached 1h estimate: depart 9 - 1 - 0.5 = 7:30.
        WorkPlanner.schedule_go_to_work(&mut schedule, true, 2.0, &clock_at(6.0), &cfg);
        assert_eq!(schedule.scheduled_state, ResidentState::AtWork);
        assert_eq!(schedule.scheduled_time, Some(SimTime::from_day_hour(1, 7.5)));

        // Away from home the fresh estimate wins: depart 9 - 2 - 0.5 = 6:30.
        WorkPlanner.schedule_go_to_work(&mut schedule, false, 2.0, &clock_at(6.0), &cfg);
        assert_eq!(schedule.scheduled_time, Some(SimTime::from_day_hour(1, 6.5)));
    }

    #[test]
    fn test_departure_collapse_near_wrapping_shift() {
        let mut cfg = SchedulingConfig::default();
        cfg.simulation_cycle_hours = 0.1;
        let mut schedule = Schedule::default();
        schedule.work_shift_start_hour = 22.0;
        schedule.work_shift_end_hour = 6.0;
        schedule.travel_time_to_work = 0.2;

        // 21:50, naive departure 21:40 already passed, but 22:08 arrival is
        // still within the shift: leave immediately.
        let clock = clock_at(21.0 + 50.0 / 60.0);
        WorkPlanner.schedule_go_to_work(&mut schedule, true, 0.2, &clock, &cfg);
        assert_eq!(schedule.scheduled_state, ResidentState::AtWork);
        assert_eq!(schedule.scheduled_time, None);
    }

    #[test]
    fn test_lunch_rules() {
        let cfg = SchedulingConfig::default();
        let mut rng = SimRng::from_seed_u64(11);
        let mut schedule = Schedule::default();
        schedule.work_shift = WorkShift::First;
        schedule.work_shift_start_hour = 9.0;
        schedule.work_shift_end_hour = 18.0;
        let morning = clock_at(9.5);

        // Children never lunch out.
        assert!(!WorkPlanner.schedule_lunch(&mut schedule, AgeGroup::Child, &morning, &cfg, &mut rng));

        // Night shift workers have no lunch window.
        let mut night = schedule;
        night.work_shift = WorkShift::Night;
        assert!(!WorkPlanner.schedule_lunch(&mut night, AgeGroup::Adult, &morning, &cfg, &mut rng));

        // Past the lunch window nothing is scheduled.
        assert!(!WorkPlanner.schedule_lunch(
            &mut schedule,
            AgeGroup::Adult,
            &clock_at(13.5),
            &cfg,
            &mut rng
        ));

        // A certain quota always lunches.
        let mut always = cfg.clone();
        always.lunch_quota = 100;
        assert!(WorkPlanner.schedule_lunch(&mut schedule, AgeGroup::Adult, &morning, &always, &mut rng));
        assert_eq!(schedule.scheduled_state, ResidentState::Lunch);
        assert_eq!(
            schedule.scheduled_time,
            Some(SimTime::from_day_hour(1, always.lunch_begin))
        );

        // A zero quota never does.
        let mut never = cfg;
        never.lunch_quota = 0;
        let mut other = Schedule::default();
        other.work_shift = WorkShift::First;
        other.work_shift_start_hour = 9.0;
        other.work_shift_end_hour = 18.0;
        assert!(!WorkPlanner.schedule_lunch(&mut other, AgeGroup::Adult, &morning, &never, &mut rng));
    }

    #[test]
    fn test_return_from_lunch() {
        let cfg = SchedulingConfig::default();
        let mut schedule = Schedule::default();
        WorkPlanner.schedule_return_from_lunch(&mut schedule, &clock_at(12.2), &cfg);
        assert_eq!(schedule.scheduled_state, ResidentState::AtWork);
        assert_eq!(
            schedule.scheduled_time,
            Some(SimTime::from_day_hour(1, cfg.lunch_end))
        );
    }

    #[test]
    fn test_return_from_work_on_time() {
        let mut cfg = SchedulingConfig::default();
        cfg.on_time_quota = 100;
        let mut rng = SimRng::from_seed_u64(11);
        let mut schedule = Schedule::default();
        schedule.work_shift_start_hour = 9.0;
        schedule.work_shift_end_hour = 18.0;

        WorkPlanner.schedule_return_from_work(&mut schedule, &clock_at(10.0), &cfg, &mut rng);
        assert_eq!(schedule.scheduled_state, ResidentState::AtHome);
        assert_eq!(
            schedule.scheduled_time,
            Some(SimTime::from_day_hour(1, 18.0))
        );
    }

    #[test]
    fn test_return_from_work_overtime_bounded() {
        let mut cfg = SchedulingConfig::default();
        cfg.on_time_quota = 0;
        cfg.max_overtime_hours = 2.0;
        let mut rng = SimRng::from_seed_u64(11);
        let shift_end = SimTime::from_day_hour(1, 18.0);

        for _ in 0..50 {
            let mut schedule = Schedule::default();
            schedule.work_shift_start_hour = 9.0;
            schedule.work_shift_end_hour = 18.0;
            WorkPlanner.schedule_return_from_work(&mut schedule, &clock_at(10.0), &cfg, &mut rng);
            let depart = schedule.scheduled_time.expect("departure scheduled");
            assert!(depart >= shift_end);
            assert!(depart.0 - shift_end.0 <= 120);
        }
    }

    #[test]
    fn test_return_from_work_lateness_floors_at_now() {
        let mut cfg = SchedulingConfig::default();
        cfg.on_time_quota = 100;
        let mut rng = SimRng::from_seed_u64(11);
        let mut schedule = Schedule::default();
        schedule.work_shift_start_hour = 9.0;
        schedule.work_shift_end_hour = 18.0;

        // Still at work at 19:00 (handoff gate held the worker): the base
        // departure is now, not yesterday's shift end or tomorrow's.
        let clock = clock_at(19.0);
        WorkPlanner.schedule_return_from_work(&mut schedule, &clock, &cfg, &mut rng);
        assert_eq!(schedule.scheduled_time, Some(clock.now()));
    }

    #[test]
    fn test_return_from_work_early_arrival_waits_out_the_shift() {
        let mut cfg = SchedulingConfig::default();
        cfg.on_time_quota = 100;
        let mut rng = SimRng::from_seed_u64(11);
        let mut schedule = Schedule::default();
        schedule.work_shift_start_hour = 9.0;
        schedule.work_shift_end_hour = 18.0;

        // Arrived at 8:40, twenty minutes before the shift: departure is
        // still today's shift end.
        WorkPlanner.schedule_return_from_work(
            &mut schedule,
            &clock_at(8.0 + 40.0 / 60.0),
            &cfg,
            &mut rng,
        );
        assert_eq!(
            schedule.scheduled_time,
            Some(SimTime::from_day_hour(1, 18.0))
        );
    }

    #[test]
    fn test_past_activity_end_sides() {
        // Day shift [9, 18).
        assert!(!past_activity_end(9.0, 18.0, 10.0));
        assert!(!past_activity_end(9.0, 18.0, 8.5), "early arrival");
        assert!(past_activity_end(9.0, 18.0, 19.0), "overstay");
        // Night shift [22, 6).
        assert!(!past_activity_end(22.0, 6.0, 23.0));
        assert!(!past_activity_end(22.0, 6.0, 21.5), "early arrival");
        assert!(past_activity_end(22.0, 6.0, 6.5), "overstay");
    }
}
