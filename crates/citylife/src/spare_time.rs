//! Spare-time behavior strategy: opaque "chance out of 100" values for
//! shopping, relaxing, and business appointments.
//!
//! The orchestrator rolls against these and never looks inside. The default
//! planner conditions on age, current shift, and hour of day; hosts with
//! weather or mood simulation substitute their own implementation through
//! the `BehaviorStrategies` resource.

use crate::citizens::AgeGroup;
use crate::config::SchedulingConfig;
use crate::schedule::WorkShift;
use crate::time_of_day::GameClock;

// ---------------------------------------------------------------------------
// Strategy trait
// ---------------------------------------------------------------------------

pub trait SpareTimeBehavior: Send + Sync {
    fn begin_new_day(&mut self, clock: &GameClock);

    /// Chance (0-100) the citizen goes shopping right now.
    fn shopping_chance(&self, age: AgeGroup, clock: &GameClock, cfg: &SchedulingConfig) -> u32;

    /// Chance (0-100) the citizen heads out to relax right now.
    fn relaxing_chance(
        &self,
        age: AgeGroup,
        shift: WorkShift,
        clock: &GameClock,
        cfg: &SchedulingConfig,
    ) -> u32;

    /// Chance (0-100) of an out-of-hours business appointment.
    fn business_appointment_chance(&self, age: AgeGroup, clock: &GameClock) -> u32;
}

// ---------------------------------------------------------------------------
// Default implementation
// ---------------------------------------------------------------------------

const SHOPPING_BASE_CHANCE: u32 = 12;
const SHOPPING_EVENING_BONUS: u32 = 8;
const RELAXING_BASE_CHANCE: u32 = 10;
const RELAXING_EVENING_BONUS: u32 = 15;
const RELAXING_WEEKEND_BONUS: u32 = 10;
const BUSINESS_APPOINTMENT_CHANCE: u32 = 2;

pub struct LeisurePlanner;

impl SpareTimeBehavior for LeisurePlanner {
    fn begin_new_day(&mut self, _clock: &GameClock) {
        // Stateless planner; nothing carries over between days.
    }

    fn shopping_chance(&self, age: AgeGroup, clock: &GameClock, cfg: &SchedulingConfig) -> u32 {
        // Nobody shops while the city sleeps.
        if clock.hour < cfg.wake_up_hour || clock.hour >= cfg.go_to_sleep_hour {
            return 0;
        }
        let mut chance = SHOPPING_BASE_CHANCE;
        if clock.hour >= cfg.work_end {
            chance += SHOPPING_EVENING_BONUS;
        }
        match age {
            AgeGroup::Child => chance / 4,
            AgeGroup::Teen => chance / 2,
            AgeGroup::Young | AgeGroup::Adult => chance,
            AgeGroup::Senior => chance + chance / 2,
        }
    }

    fn relaxing_chance(
        &self,
        age: AgeGroup,
        shift: WorkShift,
        clock: &GameClock,
        cfg: &SchedulingConfig,
    ) -> u32 {
        if clock.hour < cfg.wake_up_hour || clock.hour >= cfg.go_to_sleep_hour {
            // Night-shift workers unwind off-hours; everyone else is asleep.
            return match shift {
                WorkShift::Night | WorkShift::ContinuousNight => RELAXING_BASE_CHANCE,
                _ => 0,
            };
        }
        let mut chance = RELAXING_BASE_CHANCE;
        if clock.hour >= cfg.work_end {
            chance += RELAXING_EVENING_BONUS;
        }
        if clock.is_weekend() {
            chance += RELAXING_WEEKEND_BONUS;
        }
        match age {
            AgeGroup::Child => chance / 2,
            AgeGroup::Teen => chance + chance / 2,
            AgeGroup::Young => chance + chance / 2,
            AgeGroup::Adult => chance,
            AgeGroup::Senior => chance / 2,
        }
    }

    fn business_appointment_chance(&self, age: AgeGroup, clock: &GameClock) -> u32 {
        if age != AgeGroup::Adult || clock.is_weekend() {
            return 0;
        }
        BUSINESS_APPOINTMENT_CHANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_at(hour: f32) -> GameClock {
        GameClock {
            hour,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_shopping_at_night() {
        let cfg = SchedulingConfig::default();
        let planner = LeisurePlanner;
        assert_eq!(
            planner.shopping_chance(AgeGroup::Adult, &clock_at(2.0), &cfg),
            0
        );
        assert!(planner.shopping_chance(AgeGroup::Adult, &clock_at(12.0), &cfg) > 0);
    }

    #[test]
    fn test_evening_shopping_bonus() {
        let cfg = SchedulingConfig::default();
        let planner = LeisurePlanner;
        let noon = planner.shopping_chance(AgeGroup::Adult, &clock_at(12.0), &cfg);
        let evening = planner.shopping_chance(AgeGroup::Adult, &clock_at(19.0), &cfg);
        assert!(evening > noon);
    }

    #[test]
    fn test_age_scaling() {
        let cfg = SchedulingConfig::default();
        let planner = LeisurePlanner;
        let noon = clock_at(12.0);
        let child = planner.shopping_chance(AgeGroup::Child, &noon, &cfg);
        let adult = planner.shopping_chance(AgeGroup::Adult, &noon, &cfg);
        let senior = planner.shopping_chance(AgeGroup::Senior, &noon, &cfg);
        assert!(child < adult);
        assert!(adult < senior);
    }

    #[test]
    fn test_night_shift_relaxes_off_hours() {
        let cfg = SchedulingConfig::default();
        let planner = LeisurePlanner;
        let late = clock_at(23.0);
        assert!(planner.relaxing_chance(AgeGroup::Adult, WorkShift::Night, &late, &cfg) > 0);
        assert_eq!(
            planner.relaxing_chance(AgeGroup::Adult, WorkShift::First, &late, &cfg),
            0
        );
    }

    #[test]
    fn test_weekend_relaxing_bonus() {
        let cfg = SchedulingConfig::default();
        let planner = LeisurePlanner;
        let weekday = clock_at(10.0);
        let saturday = GameClock {
            day: 6,
            hour: 10.0,
            ..Default::default()
        };
        let on_weekday =
            planner.relaxing_chance(AgeGroup::Adult, WorkShift::Unemployed, &weekday, &cfg);
        let on_weekend =
            planner.relaxing_chance(AgeGroup::Adult, WorkShift::Unemployed, &saturday, &cfg);
        assert!(on_weekend > on_weekday);
    }

    #[test]
    fn test_business_appointments_are_adult_weekday_things() {
        let planner = LeisurePlanner;
        let weekday = clock_at(10.0);
        assert!(planner.business_appointment_chance(AgeGroup::Adult, &weekday) > 0);
        assert_eq!(planner.business_appointment_chance(AgeGroup::Teen, &weekday), 0);
        let saturday = GameClock {
            day: 6,
            hour: 10.0,
            ..Default::default()
        };
        assert_eq!(
            planner.business_appointment_chance(AgeGroup::Adult, &saturday),
            0
        );
    }
}
