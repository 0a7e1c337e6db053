//! Travel-time learning through host arrival/departure notifications.

use super::TestTown;
use crate::citizens::{AgeGroup, CitizenId, CitizenInfo, CitizenLocation, CitizenRegistry};
use crate::resident_ai::{CitizenArrived, CitizenDeparted};
use crate::schedule::{ResidentState, Schedule, ScheduleStore};
use crate::time_of_day::SimTime;

const TRAVELER: CitizenId = CitizenId(4);

/// Parked far out so the orchestrator leaves the schedule alone.
const FAR_FUTURE: SimTime = SimTime(10_000_000);

fn traveling_town() -> TestTown {
    let mut town = TestTown::new();
    let mut info = CitizenInfo::new(AgeGroup::Adult, None);
    info.location = CitizenLocation::Moving;
    town.add_citizen(TRAVELER, info);

    let mut schedule = Schedule::default();
    schedule.schedule(ResidentState::AtWork, Some(FAR_FUTURE));
    town.set_schedule(TRAVELER, schedule);
    town
}

fn complete_journey(town: &mut TestTown, minutes: u32) {
    {
        let mut citizens = town.app.world_mut().resource_mut::<CitizenRegistry>();
        citizens.get_mut(TRAVELER).unwrap().location = CitizenLocation::Moving;
    }
    town.app.world_mut().send_event(CitizenDeparted { citizen: TRAVELER });
    town.tick(1);
    assert!(
        town.schedule_of(TRAVELER).departure_time.is_some(),
        "departure should be stamped while moving"
    );

    town.tick(minutes);
    {
        let mut citizens = town.app.world_mut().resource_mut::<CitizenRegistry>();
        citizens.get_mut(TRAVELER).unwrap().location = CitizenLocation::Work;
    }
    town.app.world_mut().send_event(CitizenArrived { citizen: TRAVELER });
    town.tick(1);
}

#[test]
fn first_sample_is_taken_exactly() {
    let mut town = traveling_town();
    complete_journey(&mut town, 60);
    let schedule = town.schedule_of(TRAVELER);
    assert!(schedule.departure_time.is_none(), "cleared on arrival");
    // 61 ticks elapsed between the notifications: the stamped journey spans
    // the ticks between the two handler runs.
    assert!((schedule.travel_time_to_work - 61.0 / 60.0).abs() < 0.05);
}

#[test]
fn second_sample_averages() {
    let mut town = traveling_town();
    complete_journey(&mut town, 60);
    let first = town.schedule_of(TRAVELER).travel_time_to_work;
    complete_journey(&mut town, 120);
    let second = town.schedule_of(TRAVELER).travel_time_to_work;
    // Roughly (1h + 2h) / 2, allowing for tick rounding.
    assert!((second - (first + 121.0 / 60.0) / 2.0).abs() < 0.05);
}

#[test]
fn samples_clamp_at_the_travel_cap() {
    let mut town = traveling_town();
    town.configure(|cfg| cfg.max_travel_time_hours = 1.0);
    // A 3-hour crawl records as the 1-hour cap.
    complete_journey(&mut town, 180);
    let schedule = town.schedule_of(TRAVELER);
    assert!((schedule.travel_time_to_work - 1.0).abs() < 1e-3);
}

#[test]
fn departure_not_stamped_when_stationary() {
    let mut town = traveling_town();
    {
        let mut citizens = town.app.world_mut().resource_mut::<CitizenRegistry>();
        citizens.get_mut(TRAVELER).unwrap().location = CitizenLocation::Home;
    }
    town.app.world_mut().send_event(CitizenDeparted { citizen: TRAVELER });
    town.tick(1);
    let store = town.app.world_mut().resource::<ScheduleStore>();
    assert!(store.get(TRAVELER).departure_time.is_none());
}
