use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::SaveableAppExt;

// ---------------------------------------------------------------------------
// Absolute simulation time
// ---------------------------------------------------------------------------

/// Whole minutes elapsed since day 1, 00:00. All schedule timestamps use this
/// unit so they can be stored as small deltas against a reference time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
    Serialize, Deserialize, Encode, Decode,
)]
pub struct SimTime(pub u32);

impl SimTime {
    pub const MINUTES_PER_DAY: u32 = 24 * 60;

    pub fn from_day_hour(day: u32, hour: f32) -> Self {
        let day_index = day.saturating_sub(1);
        Self(day_index * Self::MINUTES_PER_DAY + (hour * 60.0) as u32)
    }

    /// 1-based day this timestamp falls on.
    pub fn day(self) -> u32 {
        self.0 / Self::MINUTES_PER_DAY + 1
    }

    pub fn hour_of_day(self) -> f32 {
        (self.0 % Self::MINUTES_PER_DAY) as f32 / 60.0
    }

    pub fn plus_hours(self, hours: f32) -> Self {
        Self(self.0 + hours_to_minutes(hours))
    }

    pub fn plus_minutes(self, minutes: u32) -> Self {
        Self(self.0 + minutes)
    }

    /// Minutes from `self` to `later`, zero if `later` is in the past.
    pub fn minutes_until(self, later: SimTime) -> u32 {
        later.0.saturating_sub(self.0)
    }
}

/// Convert a duration in hours to whole minutes, rounding to the nearest.
pub fn hours_to_minutes(hours: f32) -> u32 {
    (hours.max(0.0) * 60.0).round() as u32
}

/// Normalize an hour value into `[0, 24)`, wrapping past midnight.
pub fn wrap_hour(hour: f32) -> f32 {
    hour.rem_euclid(24.0)
}

// ---------------------------------------------------------------------------
// Day of week
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn from_day(day: u32) -> Self {
        match day.saturating_sub(1) % 7 {
            0 => Self::Monday,
            1 => Self::Tuesday,
            2 => Self::Wednesday,
            3 => Self::Thursday,
            4 => Self::Friday,
            5 => Self::Saturday,
            _ => Self::Sunday,
        }
    }

    pub fn is_weekend(self) -> bool {
        matches!(self, Self::Saturday | Self::Sunday)
    }
}

// ---------------------------------------------------------------------------
// Game clock
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct GameClock {
    /// 1-based simulated day. Day 1 is a Monday.
    pub day: u32,
    /// Hour of day in `[0, 24)`.
    pub hour: f32,
    pub speed: f32,
    pub paused: bool,
    /// Daylight bounds; hours outside `[sunrise, sunset)` count as night.
    pub sunrise_hour: f32,
    pub sunset_hour: f32,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            day: 1,
            hour: 6.0, // start at 6 AM
            speed: 1.0,
            paused: false,
            sunrise_hour: 6.0,
            sunset_hour: 20.0,
        }
    }
}

impl GameClock {
    /// Minutes per sim tick at 1x speed
    const MINUTES_PER_TICK: f32 = 1.0;

    pub fn tick(&mut self) {
        if self.paused {
            return;
        }
        // Speed is handled by scaling the FixedUpdate timestep (sync_fixed_timestep),
        // so each tick always advances by the same amount of game time.
        self.hour += Self::MINUTES_PER_TICK / 60.0;
        if self.hour >= 24.0 {
            self.hour -= 24.0;
            self.day += 1;
        }
    }

    pub fn now(&self) -> SimTime {
        SimTime::from_day_hour(self.day, self.hour)
    }

    pub fn weekday(&self) -> Weekday {
        Weekday::from_day(self.day)
    }

    pub fn is_weekend(&self) -> bool {
        self.weekday().is_weekend()
    }

    pub fn is_work_day(&self) -> bool {
        !self.is_weekend()
    }

    pub fn is_night_time(&self) -> bool {
        self.is_night_hour(self.hour)
    }

    /// Night test for an arbitrary hour, used for projected arrival times.
    pub fn is_night_hour(&self, hour: f32) -> bool {
        let h = wrap_hour(hour);
        h < self.sunrise_hour || h >= self.sunset_hour
    }

    /// Next absolute time at which the clock reads `hour` of day. Always
    /// `>= now()`, adding a day when the hour has already passed today.
    pub fn future_hour_time(&self, hour: f32) -> SimTime {
        let now = self.now().0;
        let day_start = now - now % SimTime::MINUTES_PER_DAY;
        let target_min = (wrap_hour(hour) * 60.0).round() as u32 % SimTime::MINUTES_PER_DAY;
        let today = day_start + target_min;
        if today >= now {
            SimTime(today)
        } else {
            SimTime(today + SimTime::MINUTES_PER_DAY)
        }
    }

    pub fn time_in_hours(&self, hours: f32) -> SimTime {
        self.now().plus_hours(hours)
    }

    pub fn formatted(&self) -> String {
        let h = self.hour as u32;
        let m = ((self.hour - h as f32) * 60.0) as u32;
        format!("Day {} {:02}:{:02}", self.day, h, m)
    }
}

pub fn tick_game_clock(mut clock: ResMut<GameClock>) {
    clock.tick();
}

/// Scales the FixedUpdate timestep based on GameClock speed.
/// Base rate is 10 Hz (100 ms). At 2x speed it becomes 50 ms, at 4x -> 25 ms, etc.
pub fn sync_fixed_timestep(clock: Res<GameClock>, mut time: ResMut<Time<Fixed>>) {
    let base_hz = std::time::Duration::from_millis(100); // 10 Hz
    let effective = if clock.paused || clock.speed <= 0.0 {
        // When paused, keep the timestep but tick_game_clock won't advance
        base_hz
    } else {
        base_hz.div_f32(clock.speed.clamp(0.25, 16.0))
    };
    time.set_timestep(effective);
}

// ---------------------------------------------------------------------------
// Saveable implementation
// ---------------------------------------------------------------------------

impl crate::Saveable for GameClock {
    const SAVE_KEY: &'static str = "game_clock";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct TimeOfDayPlugin;

impl Plugin for TimeOfDayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameClock>()
            .register_saveable::<GameClock>()
            .add_systems(FixedUpdate, tick_game_clock)
            .add_systems(Update, sync_fixed_timestep);
    }
}
