//! Integration tests driving a headless Bevy app with `SimulationPlugin`.
//!
//! `TestTown` wraps `App` + `MinimalPlugins` and advances the simulation by
//! running the `FixedUpdate` schedule directly, so a tick is always exactly
//! one simulated minute regardless of wall-clock time.

mod travel_time_tests;

use bevy::prelude::*;

use crate::buildings::{BuildingId, BuildingInfo, BuildingRegistry};
use crate::citizens::{CitizenId, CitizenInfo, CitizenRegistry};
use crate::config::SchedulingConfig;
use crate::schedule::{Schedule, ScheduleStore};
use crate::sim_rng::SimRng;
use crate::time_of_day::GameClock;
use crate::SimulationPlugin;

pub struct TestTown {
    pub app: App,
}

impl TestTown {
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(SimulationPlugin);
        // Deterministic randomness for every scenario.
        app.insert_resource(SimRng::from_seed_u64(1234));
        Self { app }
    }

    /// Advance `n` simulation ticks (one simulated minute each).
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    pub fn configure(&mut self, f: impl FnOnce(&mut SchedulingConfig)) {
        let mut cfg = self.app.world_mut().resource_mut::<SchedulingConfig>();
        f(&mut cfg);
    }

    pub fn add_building(&mut self, id: BuildingId, info: BuildingInfo) {
        self.app
            .world_mut()
            .resource_mut::<BuildingRegistry>()
            .register(id, info);
    }

    pub fn add_citizen(&mut self, id: CitizenId, info: CitizenInfo) {
        self.app
            .world_mut()
            .resource_mut::<CitizenRegistry>()
            .register(id, info);
    }

    pub fn set_schedule(&mut self, id: CitizenId, schedule: Schedule) {
        self.app
            .world_mut()
            .resource_mut::<ScheduleStore>()
            .set(id, schedule);
    }

    pub fn schedule_of(&mut self, id: CitizenId) -> Schedule {
        self.app.world_mut().resource::<ScheduleStore>().get(id)
    }

    pub fn citizen(&mut self, id: CitizenId) -> CitizenInfo {
        *self
            .app
            .world_mut()
            .resource::<CitizenRegistry>()
            .get(id)
            .expect("citizen should exist")
    }

    pub fn clock(&mut self) -> GameClock {
        self.app.world_mut().resource::<GameClock>().clone()
    }
}
