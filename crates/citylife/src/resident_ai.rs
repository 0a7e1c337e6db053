//! The citizen schedule state machine.
//!
//! One pass per simulation tick over a frame-partitioned slice of the
//! population: incapacitated citizens are redirected, citizens whose pending
//! transition time has arrived execute it through the movement collaborator,
//! and citizens with nothing pending ask the behavior strategies what to do
//! next. A failed transition resets to `Unknown` and is retried on the next
//! eligible tick; nothing ever stalls silently.

use bevy::prelude::*;

use crate::buildings::{BuildingId, BuildingRegistry};
use crate::citizens::{
    CitizenId, CitizenLocation, CitizenMovement, CitizenRegistry, MoveTarget, MovementService,
};
use crate::config::SchedulingConfig;
use crate::open_hours::{is_entertainment_target, is_noise_restricted, is_shopping_target};
use crate::schedule::{
    ResidentState, Schedule, ScheduleHint, ScheduleStore, SchoolStatus, WorkShift, WorkStatus,
};
use crate::school_behavior::{SchoolBehavior, SchoolPlanner};
use crate::sim_rng::SimRng;
use crate::spare_time::{LeisurePlanner, SpareTimeBehavior};
use crate::time_of_day::GameClock;
use crate::work_behavior::{WorkBehavior, WorkPlanner};
use crate::work_time::{BuildingWorkTimeRegistry, WorkTime};
use crate::{frame_due, TickCounter};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Travel estimate used before any real sample has been observed, in hours.
pub const DEFAULT_TRAVEL_ESTIMATE_HOURS: f32 = 0.5;

/// Failed visit-place searches before the citizen gives up and stays put.
pub const MAX_FIND_VISIT_ATTEMPTS: u8 = 3;

/// Upper bound on a worker-roster scan. Rosters come from host storage; a
/// corrupted chain must not hang the tick.
pub const MAX_WORKER_SCAN: usize = 4096;

/// Shortest and longest spontaneous outing, in whole hours.
const OUTING_MIN_HOURS: u32 = 1;
const OUTING_EXTRA_HOURS: u32 = 2;

// ---------------------------------------------------------------------------
// Strategy and collaborator resources
// ---------------------------------------------------------------------------

/// The three behavior strategies, swappable for tests or host overrides.
#[derive(Resource)]
pub struct BehaviorStrategies {
    pub work: Box<dyn WorkBehavior>,
    pub school: Box<dyn SchoolBehavior>,
    pub spare_time: Box<dyn SpareTimeBehavior>,
}

impl Default for BehaviorStrategies {
    fn default() -> Self {
        Self {
            work: Box::new(WorkPlanner),
            school: Box::new(SchoolPlanner),
            spare_time: Box::new(LeisurePlanner),
        }
    }
}

/// Seam to the host's spatial queries ("find nearest shop"). The default
/// scans the registry in id order; proximity is a host concern.
pub trait VisitPlaceFinder: Send + Sync {
    fn find_shopping_place(
        &mut self,
        hint: ScheduleHint,
        buildings: &BuildingRegistry,
        work_times: &BuildingWorkTimeRegistry,
        cfg: &SchedulingConfig,
        clock: &GameClock,
    ) -> Option<BuildingId>;

    fn find_leisure_place(
        &mut self,
        hint: ScheduleHint,
        buildings: &BuildingRegistry,
        work_times: &BuildingWorkTimeRegistry,
        cfg: &SchedulingConfig,
        clock: &GameClock,
    ) -> Option<BuildingId>;
}

pub struct RegistryScanFinder;

impl VisitPlaceFinder for RegistryScanFinder {
    fn find_shopping_place(
        &mut self,
        _hint: ScheduleHint,
        buildings: &BuildingRegistry,
        work_times: &BuildingWorkTimeRegistry,
        cfg: &SchedulingConfig,
        clock: &GameClock,
    ) -> Option<BuildingId> {
        buildings
            .sorted_ids()
            .into_iter()
            .find(|&id| is_shopping_target(id, buildings, work_times, cfg, clock))
    }

    fn find_leisure_place(
        &mut self,
        _hint: ScheduleHint,
        buildings: &BuildingRegistry,
        work_times: &BuildingWorkTimeRegistry,
        cfg: &SchedulingConfig,
        clock: &GameClock,
    ) -> Option<BuildingId> {
        buildings.sorted_ids().into_iter().find(|&id| {
            is_entertainment_target(id, buildings, work_times, cfg, clock)
                && !is_noise_restricted(id, buildings, clock, None)
        })
    }
}

#[derive(Resource)]
pub struct VisitPlaceService(pub Box<dyn VisitPlaceFinder>);

impl Default for VisitPlaceService {
    fn default() -> Self {
        Self(Box::new(RegistryScanFinder))
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Sent by the host when a citizen's journey completes.
#[derive(Event, Debug, Clone, Copy)]
pub struct CitizenArrived {
    pub citizen: CitizenId,
}

/// Sent by the host when a citizen's location turns to "moving."
#[derive(Event, Debug, Clone, Copy)]
pub struct CitizenDeparted {
    pub citizen: CitizenId,
}

// ---------------------------------------------------------------------------
// Shift handoff
// ---------------------------------------------------------------------------

/// The shift that relieves `shift` at a building with this work time, if any.
pub fn successor_shift(shift: WorkShift, work_time: &WorkTime) -> Option<WorkShift> {
    match shift {
        WorkShift::First
            if work_time.work_shifts >= 2 && !work_time.has_continuous_work_shift =>
        {
            Some(WorkShift::Second)
        }
        WorkShift::Second if work_time.work_shifts >= 3 => Some(WorkShift::Night),
        WorkShift::Night => Some(WorkShift::First),
        WorkShift::ContinuousDay
            if work_time.has_continuous_work_shift && work_time.work_shifts == 2 =>
        {
            Some(WorkShift::ContinuousNight)
        }
        WorkShift::ContinuousNight
            if work_time.has_continuous_work_shift && work_time.work_shifts == 2 =>
        {
            Some(WorkShift::ContinuousDay)
        }
        _ => None,
    }
}

/// Essential-service gate: a worker whose shift is ending may only leave once
/// every coworker on the relieving shift who is not on vacation has actually
/// arrived at work. Non-essential buildings never gate.
pub fn should_return_from_work(
    id: CitizenId,
    schedule: &Schedule,
    buildings: &BuildingRegistry,
    work_times: &BuildingWorkTimeRegistry,
    store: &ScheduleStore,
) -> bool {
    let Some(building) = schedule.work_building else {
        return true;
    };
    let Some(info) = buildings.get(building) else {
        return true;
    };
    if !info.kind.is_essential_service() {
        return true;
    }
    let work_time = work_times.get(building);
    let Some(next) = successor_shift(schedule.work_shift, &work_time) else {
        return true;
    };
    let mut scanned = 0usize;
    for &worker in &info.workers {
        scanned += 1;
        if scanned > MAX_WORKER_SCAN {
            error!(
                "building {}: worker roster exceeds {} entries, aborting handoff scan",
                building.0, MAX_WORKER_SCAN
            );
            break;
        }
        if worker == id || worker.0 == 0 {
            continue;
        }
        let coworker = store.get(worker);
        if coworker.work_shift == next
            && coworker.work_status != WorkStatus::OnVacation
            && coworker.current_state != ResidentState::AtWork
        {
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Core pass
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub fn process_resident_schedules(
    tick: Res<TickCounter>,
    clock: Res<GameClock>,
    cfg: Res<SchedulingConfig>,
    buildings: Res<BuildingRegistry>,
    mut work_times: ResMut<BuildingWorkTimeRegistry>,
    mut citizens: ResMut<CitizenRegistry>,
    mut store: ResMut<ScheduleStore>,
    mut rng: ResMut<SimRng>,
    strategies: Res<BehaviorStrategies>,
    mut movement: ResMut<MovementService>,
    mut finder: ResMut<VisitPlaceService>,
) {
    let now = clock.now();
    // Keep the record codec inputs fresh for whoever saves next.
    store.reference_time = now;
    store.max_travel_hours = cfg.max_travel_time_hours;

    for id in citizens.sorted_ids() {
        if !frame_due(id.0, tick.0) {
            continue;
        }
        let Some(info) = citizens.get(id).copied() else {
            continue;
        };

        if info.dead {
            if store.contains(id) {
                store.remove(id);
                info!("citizen {}: deceased, schedule released", id.0);
            }
            continue;
        }
        if info.sick || info.arrested {
            let mut schedule = store.get(id);
            schedule.current_state = ResidentState::Unknown;
            schedule.schedule(ResidentState::Unknown, None);
            schedule.departure_time = None;
            store.set(id, schedule);

            let (target, destination) = if info.sick {
                (MoveTarget::Hospital, CitizenLocation::Hospital)
            } else {
                (MoveTarget::Jail, CitizenLocation::Jail)
            };
            if info.location != destination
                && !movement.0.try_move_to(&mut citizens, id, target)
            {
                warn!("citizen {}: incapacitated redirect failed, will retry", id.0);
            }
            continue;
        }

        let mut schedule = store.get(id);
        if !schedule.is_due(now) {
            continue; // still in transition, waiting
        }

        if schedule.scheduled_state == ResidentState::Unknown {
            decide_next_activity(
                &mut schedule,
                &info,
                &clock,
                &cfg,
                &buildings,
                &mut work_times,
                &mut rng,
                &strategies,
            );
        } else {
            execute_transition(
                id,
                &mut schedule,
                &clock,
                &cfg,
                &buildings,
                &work_times,
                &mut citizens,
                &store,
                &mut rng,
                &strategies,
                movement.0.as_mut(),
                finder.0.as_mut(),
            );
        }
        store.set(id, schedule);
    }
}

#[allow(clippy::too_many_arguments)]
fn decide_next_activity(
    schedule: &mut Schedule,
    info: &crate::citizens::CitizenInfo,
    clock: &GameClock,
    cfg: &SchedulingConfig,
    buildings: &BuildingRegistry,
    work_times: &mut BuildingWorkTimeRegistry,
    rng: &mut SimRng,
    strategies: &BehaviorStrategies,
) {
    // Assignments made by the host before this citizen's first pass.
    if schedule.work_building.is_some()
        && schedule.work_shift == WorkShift::Unemployed
        && info.age_group.can_work()
    {
        strategies
            .work
            .update_work_shift(schedule, buildings, work_times, cfg, rng);
    }
    if schedule.school_building.is_some()
        && schedule.school_status == SchoolStatus::None
        && info.age_group.attends_school()
    {
        strategies
            .school
            .update_school_class(schedule, buildings, cfg, rng);
    }

    match schedule.current_state {
        ResidentState::AtWork => {
            if !strategies
                .work
                .schedule_lunch(schedule, info.age_group, clock, cfg, rng)
            {
                strategies
                    .work
                    .schedule_return_from_work(schedule, clock, cfg, rng);
            }
        }
        ResidentState::AtSchool => {
            if !strategies
                .school
                .schedule_lunch(schedule, info.age_group, buildings, clock, cfg, rng)
            {
                strategies.school.schedule_return_from_school(schedule, clock);
            }
        }
        ResidentState::Lunch => {
            schedule_after_lunch(schedule, clock, cfg, strategies);
        }
        ResidentState::Evacuation
        | ResidentState::InShelter
        | ResidentState::InTransition
        | ResidentState::Ignored => {
            // Host-managed states; the scheduler keeps its hands off.
        }
        _ => {
            if strategies.work.should_schedule_go_to_work(schedule, clock, cfg) {
                let at_home = info.location == CitizenLocation::Home;
                strategies.work.schedule_go_to_work(
                    schedule,
                    at_home,
                    DEFAULT_TRAVEL_ESTIMATE_HOURS,
                    clock,
                    cfg,
                );
                return;
            }
            if strategies
                .school
                .should_schedule_go_to_school(schedule, clock, cfg)
            {
                let at_home = info.location == CitizenLocation::Home;
                strategies.school.schedule_go_to_school(
                    schedule,
                    at_home,
                    DEFAULT_TRAVEL_ESTIMATE_HOURS,
                    clock,
                    cfg,
                );
                return;
            }

            let shopping = strategies.spare_time.shopping_chance(info.age_group, clock, cfg);
            if rng.chance(shopping) {
                schedule.schedule(ResidentState::Shopping, None);
                return;
            }
            let relaxing =
                strategies
                    .spare_time
                    .relaxing_chance(info.age_group, schedule.work_shift, clock, cfg);
            if rng.chance(relaxing) {
                schedule.schedule(ResidentState::Relaxing, None);
                return;
            }
            let business = strategies
                .spare_time
                .business_appointment_chance(info.age_group, clock);
            if rng.chance(business) {
                schedule.schedule(ResidentState::Visiting, None);
                return;
            }
            if schedule.current_state != ResidentState::AtHome {
                schedule.schedule(ResidentState::AtHome, None);
            }
        }
    }
}

fn schedule_after_lunch(
    schedule: &mut Schedule,
    clock: &GameClock,
    cfg: &SchedulingConfig,
    strategies: &BehaviorStrategies,
) {
    if schedule.work_building.is_some() && schedule.work_shift != WorkShift::Unemployed {
        strategies
            .work
            .schedule_return_from_lunch(schedule, clock, cfg);
    } else {
        schedule.schedule(
            ResidentState::AtSchool,
            Some(clock.future_hour_time(cfg.lunch_end)),
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn execute_transition(
    id: CitizenId,
    schedule: &mut Schedule,
    clock: &GameClock,
    cfg: &SchedulingConfig,
    buildings: &BuildingRegistry,
    work_times: &BuildingWorkTimeRegistry,
    citizens: &mut CitizenRegistry,
    store: &ScheduleStore,
    rng: &mut SimRng,
    strategies: &BehaviorStrategies,
    movement: &mut dyn CitizenMovement,
    finder: &mut dyn VisitPlaceFinder,
) {
    // Essential-service handoff: hold the departing worker until the next
    // shift is actually on duty. The pending transition stays due, so this
    // re-checks every pass and cannot flap back once satisfied.
    if schedule.scheduled_state == ResidentState::AtHome
        && schedule.current_state == ResidentState::AtWork
        && !should_return_from_work(id, schedule, buildings, work_times, store)
    {
        return;
    }

    let target = match schedule.scheduled_state {
        ResidentState::AtHome => MoveTarget::Home,
        ResidentState::AtWork => match schedule.work_building {
            Some(building) => MoveTarget::Work(building),
            None => {
                schedule.schedule(ResidentState::Unknown, None);
                return;
            }
        },
        ResidentState::AtSchool => match schedule.school_building {
            Some(building) => MoveTarget::School(building),
            None => {
                schedule.schedule(ResidentState::Unknown, None);
                return;
            }
        },
        ResidentState::Lunch | ResidentState::Shopping => {
            match finder.find_shopping_place(schedule.hint, buildings, work_times, cfg, clock) {
                Some(building) => {
                    schedule.find_visit_place_attempts = 0;
                    schedule.hint = ScheduleHint::None;
                    MoveTarget::Visit(building)
                }
                None => {
                    fail_visit_search(id, schedule);
                    return;
                }
            }
        }
        ResidentState::Relaxing | ResidentState::Visiting => {
            match finder.find_leisure_place(schedule.hint, buildings, work_times, cfg, clock) {
                Some(building) => {
                    schedule.find_visit_place_attempts = 0;
                    schedule.hint = ScheduleHint::None;
                    MoveTarget::Visit(building)
                }
                None => {
                    fail_visit_search(id, schedule);
                    return;
                }
            }
        }
        ResidentState::Evacuation
        | ResidentState::InShelter
        | ResidentState::InTransition
        | ResidentState::Ignored
        | ResidentState::Unknown => {
            // Host-managed states commit without a movement request.
            schedule.current_state = schedule.scheduled_state;
            schedule.scheduled_state = ResidentState::Unknown;
            schedule.scheduled_time = None;
            return;
        }
    };

    if movement.try_move_to(citizens, id, target) {
        let committed = schedule.scheduled_state;
        schedule.current_state = committed;
        schedule.scheduled_state = ResidentState::Unknown;
        schedule.scheduled_time = None;

        // Departure notification, inline for synchronous movement layers.
        if citizens
            .get(id)
            .is_some_and(|info| info.location == CitizenLocation::Moving)
        {
            schedule.departure_time = Some(clock.now());
        }

        match committed {
            ResidentState::Shopping | ResidentState::Relaxing | ResidentState::Visiting => {
                // Outings are bounded; plan the way home up front.
                let stay = OUTING_MIN_HOURS + rng.roll(OUTING_EXTRA_HOURS);
                schedule.schedule(
                    ResidentState::AtHome,
                    Some(clock.now().plus_hours(stay as f32)),
                );
            }
            ResidentState::Lunch => {
                schedule_after_lunch(schedule, clock, cfg, strategies);
            }
            _ => {}
        }
    } else {
        warn!(
            "citizen {}: transition to {:?} failed, rescheduling from scratch",
            id.0, schedule.scheduled_state
        );
        schedule.schedule(ResidentState::Unknown, None);
    }
}

fn fail_visit_search(id: CitizenId, schedule: &mut Schedule) {
    schedule.find_visit_place_attempts = schedule.find_visit_place_attempts.saturating_add(1);
    if schedule.find_visit_place_attempts >= MAX_FIND_VISIT_ATTEMPTS {
        info!(
            "citizen {}: no visit place found after {} attempts, staying put",
            id.0, schedule.find_visit_place_attempts
        );
        schedule.find_visit_place_attempts = 0;
        schedule.hint = ScheduleHint::None;
        schedule.schedule(ResidentState::Unknown, None);
    } else {
        // Widen the search on the next try.
        schedule.hint = ScheduleHint::CitywideSearch;
    }
}

// ---------------------------------------------------------------------------
// Arrival / departure notifications
// ---------------------------------------------------------------------------

pub fn handle_citizen_arrivals(
    mut events: EventReader<CitizenArrived>,
    clock: Res<GameClock>,
    cfg: Res<SchedulingConfig>,
    mut store: ResMut<ScheduleStore>,
) {
    for event in events.read() {
        if event.citizen.0 == 0 {
            continue;
        }
        let now = clock.now();
        let schedule = store.get_mut(event.citizen);
        if let Some(departed) = schedule.departure_time {
            let sample_hours = departed.minutes_until(now) as f32 / 60.0;
            schedule.update_travel_time(sample_hours, cfg.max_travel_time_hours);
        }
        schedule.departure_time = None;
    }
}

pub fn handle_citizen_departures(
    mut events: EventReader<CitizenDeparted>,
    clock: Res<GameClock>,
    citizens: Res<CitizenRegistry>,
    mut store: ResMut<ScheduleStore>,
) {
    for event in events.read() {
        if event.citizen.0 == 0 {
            continue;
        }
        let moving = citizens
            .get(event.citizen)
            .is_some_and(|info| info.location == CitizenLocation::Moving);
        if moving {
            store.get_mut(event.citizen).departure_time = Some(clock.now());
        }
    }
}

// ---------------------------------------------------------------------------
// Day change
// ---------------------------------------------------------------------------

#[derive(Resource, Default)]
pub struct DayChangeLatch {
    pub last_day: u32,
}

/// Coarse day-boundary latch: strategies reset and vacations count down once
/// per simulated day, whatever the real-time/sim-time ratio of the frames.
pub fn begin_new_day(
    clock: Res<GameClock>,
    mut latch: ResMut<DayChangeLatch>,
    mut strategies: ResMut<BehaviorStrategies>,
    mut store: ResMut<ScheduleStore>,
) {
    if latch.last_day == clock.day {
        return;
    }
    latch.last_day = clock.day;
    strategies.work.begin_new_day(&clock);
    strategies.school.begin_new_day(&clock);
    strategies.spare_time.begin_new_day(&clock);

    for (_, schedule) in store.iter_mut() {
        if schedule.vacation_days_left > 0 {
            schedule.vacation_days_left -= 1;
            if schedule.vacation_days_left == 0 {
                if schedule.work_status == WorkStatus::OnVacation {
                    schedule.work_status = WorkStatus::Working;
                }
                if schedule.school_status == SchoolStatus::OnVacation {
                    schedule.school_status = SchoolStatus::Studying;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Assignment helpers (host-facing)
// ---------------------------------------------------------------------------

/// Point a citizen at a new workplace (or `None` for unemployment) and
/// recompute the cached shift. Keeps the building roster in sync.
#[allow(clippy::too_many_arguments)]
pub fn assign_work_building(
    id: CitizenId,
    building: Option<BuildingId>,
    store: &mut ScheduleStore,
    buildings: &mut BuildingRegistry,
    work_times: &mut BuildingWorkTimeRegistry,
    cfg: &SchedulingConfig,
    rng: &mut SimRng,
    work: &dyn WorkBehavior,
) {
    let mut schedule = store.get(id);
    if let Some(old) = schedule.work_building {
        buildings.remove_worker(old, id);
    }
    schedule.work_building = building;
    schedule.work_shift = WorkShift::Unemployed;
    if let Some(new) = building {
        buildings.add_worker(new, id);
    }
    work.update_work_shift(&mut schedule, buildings, work_times, cfg, rng);
    store.set(id, schedule);
}

/// Point a citizen at a new school (or `None`) and recompute the class.
pub fn assign_school_building(
    id: CitizenId,
    building: Option<BuildingId>,
    store: &mut ScheduleStore,
    buildings: &BuildingRegistry,
    cfg: &SchedulingConfig,
    rng: &mut SimRng,
    school: &dyn SchoolBehavior,
) {
    let mut schedule = store.get(id);
    schedule.school_building = building;
    school.update_school_class(&mut schedule, buildings, cfg, rng);
    store.set(id, schedule);
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct ResidentAiPlugin;

impl Plugin for ResidentAiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BehaviorStrategies>()
            .init_resource::<VisitPlaceService>()
            .init_resource::<DayChangeLatch>()
            .add_event::<CitizenArrived>()
            .add_event::<CitizenDeparted>()
            .add_systems(
                FixedUpdate,
                (
                    begin_new_day,
                    handle_citizen_departures,
                    handle_citizen_arrivals,
                    process_resident_schedules,
                )
                    .chain(),
            );
    }
}
