//! Per-building fire timers.
//!
//! A deliberately simple duration model: when a building catches fire the
//! host records the start time and how long the blaze should last; the fire
//! service asks `should_extinguish` before putting it out. Everything else
//! about fires (spread, damage, response) lives with the host.

use std::collections::HashMap;

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::buildings::BuildingId;
use crate::time_of_day::{GameClock, SimTime};
use crate::SaveableAppExt;

// ---------------------------------------------------------------------------
// BurnTime record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct BurnTime {
    pub start_day: u32,
    pub start_hour: f32,
    pub duration_hours: f32,
}

impl BurnTime {
    pub fn start_time(&self) -> SimTime {
        SimTime::from_day_hour(self.start_day, self.start_hour)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Resource, Default)]
pub struct BurnTimeRegistry {
    fires: HashMap<BuildingId, BurnTime>,
}

impl BurnTimeRegistry {
    pub fn start(&mut self, id: BuildingId, clock: &GameClock, duration_hours: f32) {
        self.fires.insert(
            id,
            BurnTime {
                start_day: clock.day,
                start_hour: clock.hour,
                duration_hours,
            },
        );
    }

    pub fn get(&self, id: BuildingId) -> Option<BurnTime> {
        self.fires.get(&id).copied()
    }

    /// True once the fire has burned its configured duration. Buildings with
    /// no recorded fire read as ready so a stale extinguish request is a
    /// no-op rather than an error.
    pub fn should_extinguish(&self, id: BuildingId, clock: &GameClock) -> bool {
        match self.fires.get(&id) {
            None => true,
            Some(burn) => {
                let elapsed = burn.start_time().minutes_until(clock.now());
                elapsed >= crate::time_of_day::hours_to_minutes(burn.duration_hours)
            }
        }
    }

    pub fn remove(&mut self, id: BuildingId) {
        self.fires.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.fires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fires.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Saveable implementation
// ---------------------------------------------------------------------------

#[derive(Encode, Decode, Default)]
struct BurnTimeSnapshot {
    entries: Vec<(BuildingId, BurnTime)>,
}

impl crate::Saveable for BurnTimeRegistry {
    const SAVE_KEY: &'static str = "burn_times";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.fires.is_empty() {
            return None;
        }
        let mut entries: Vec<(BuildingId, BurnTime)> =
            self.fires.iter().map(|(id, burn)| (*id, *burn)).collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        Some(bitcode::encode(&BurnTimeSnapshot { entries }))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        let snapshot: BurnTimeSnapshot = crate::decode_or_warn(Self::SAVE_KEY, bytes);
        Self {
            fires: snapshot.entries.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct BurnTimePlugin;

impl Plugin for BurnTimePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BurnTimeRegistry>()
            .register_saveable::<BurnTimeRegistry>();
    }
}
