//! The per-citizen schedule record, its fixed 8-byte serialized form, and
//! the store keyed by citizen id.
//!
//! The record is deliberately small: state nibbles, a minute-granularity
//! delta against a reference time, and a scaled travel estimate. Shift and
//! class hour fields are NOT stored; they are re-derived from the live
//! configuration and the building's work time after load, so saves never go
//! stale when the player retunes the city's hours.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::buildings::{BuildingId, BuildingRegistry};
use crate::citizens::CitizenId;
use crate::config::SchedulingConfig;
use crate::time_of_day::SimTime;
use crate::work_time::{school_class_hours, shift_hours, BuildingWorkTimeRegistry};
use crate::SaveableAppExt;

// ---------------------------------------------------------------------------
// State enums (nibble-packed in the record; discriminants are stable)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ResidentState {
    #[default]
    Unknown = 0,
    AtHome = 1,
    AtSchool = 2,
    AtWork = 3,
    Shopping = 4,
    Lunch = 5,
    Relaxing = 6,
    Visiting = 7,
    Evacuation = 8,
    InShelter = 9,
    InTransition = 10,
    Ignored = 11,
}

impl ResidentState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::AtHome,
            2 => Self::AtSchool,
            3 => Self::AtWork,
            4 => Self::Shopping,
            5 => Self::Lunch,
            6 => Self::Relaxing,
            7 => Self::Visiting,
            8 => Self::Evacuation,
            9 => Self::InShelter,
            10 => Self::InTransition,
            11 => Self::Ignored,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum WorkShift {
    #[default]
    Unemployed = 0,
    First = 1,
    Second = 2,
    Night = 3,
    ContinuousDay = 4,
    ContinuousNight = 5,
    /// Hired for a building event; works exactly the event hours.
    Event = 6,
}

impl WorkShift {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::First,
            2 => Self::Second,
            3 => Self::Night,
            4 => Self::ContinuousDay,
            5 => Self::ContinuousNight,
            6 => Self::Event,
            _ => Self::Unemployed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum WorkStatus {
    #[default]
    None = 0,
    Working = 1,
    OnVacation = 2,
}

impl WorkStatus {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Working,
            2 => Self::OnVacation,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SchoolClass {
    #[default]
    DayClass = 0,
    NightClass = 1,
}

impl SchoolClass {
    pub fn from_u8(value: u8) -> Self {
        if value == 1 {
            Self::NightClass
        } else {
            Self::DayClass
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SchoolStatus {
    #[default]
    None = 0,
    Studying = 1,
    OnVacation = 2,
}

impl SchoolStatus {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Studying,
            2 => Self::OnVacation,
            _ => Self::None,
        }
    }
}

/// Search-scope hint for visit-place queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleHint {
    #[default]
    None,
    LocalSearch,
    CitywideSearch,
}

// ---------------------------------------------------------------------------
// Schedule record
// ---------------------------------------------------------------------------

pub const SCHEDULE_RECORD_BYTES: usize = 8;

/// Highest vacation-day count the record's nibble can carry.
pub const MAX_VACATION_DAYS: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub current_state: ResidentState,
    pub scheduled_state: ResidentState,
    pub last_scheduled_state: ResidentState,
    /// Next transition time; `None` means "execute as soon as possible."
    pub scheduled_time: Option<SimTime>,

    pub work_building: Option<BuildingId>,
    pub work_shift: WorkShift,
    pub work_shift_start_hour: f32,
    pub work_shift_end_hour: f32,
    pub works_on_weekends: bool,
    pub work_status: WorkStatus,

    pub school_building: Option<BuildingId>,
    pub school_class: SchoolClass,
    pub school_class_start_hour: f32,
    pub school_class_end_hour: f32,
    pub school_status: SchoolStatus,

    pub vacation_days_left: u8,
    /// Smoothed home-to-work travel estimate, in hours.
    pub travel_time_to_work: f32,
    /// When the current journey started; cleared on arrival.
    pub departure_time: Option<SimTime>,
    pub find_visit_place_attempts: u8,
    pub event_building: Option<BuildingId>,
    pub hint: ScheduleHint,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            current_state: ResidentState::Unknown,
            scheduled_state: ResidentState::Unknown,
            last_scheduled_state: ResidentState::Unknown,
            scheduled_time: None,
            work_building: None,
            work_shift: WorkShift::Unemployed,
            work_shift_start_hour: 0.0,
            work_shift_end_hour: 0.0,
            works_on_weekends: false,
            work_status: WorkStatus::None,
            school_building: None,
            school_class: SchoolClass::DayClass,
            school_class_start_hour: 0.0,
            school_class_end_hour: 0.0,
            school_status: SchoolStatus::None,
            vacation_days_left: 0,
            travel_time_to_work: 0.0,
            departure_time: None,
            find_visit_place_attempts: 0,
            event_building: None,
            hint: ScheduleHint::None,
        }
    }
}

impl Schedule {
    /// Commit the next transition. `None` means "as soon as possible."
    pub fn schedule(&mut self, state: ResidentState, time: Option<SimTime>) {
        self.last_scheduled_state = self.scheduled_state;
        self.scheduled_state = state;
        self.scheduled_time = time;
    }

    /// True when the pending transition should run now.
    pub fn is_due(&self, now: SimTime) -> bool {
        match self.scheduled_time {
            None => true,
            Some(t) => t <= now,
        }
    }

    /// Fold one observed travel sample into the smoothed estimate: the first
    /// sample is taken as-is, later samples average with the running value.
    /// No single sample may exceed `max_hours`.
    pub fn update_travel_time(&mut self, sample_hours: f32, max_hours: f32) {
        let sample = sample_hours.clamp(0.0, max_hours);
        self.travel_time_to_work = if self.travel_time_to_work == 0.0 {
            sample
        } else {
            (self.travel_time_to_work + sample) / 2.0
        };
    }

    // -- Fixed 8-byte record ------------------------------------------------

    /// Pack into the fixed record. `reference` must not be later than any
    /// stored transition time; deltas saturate at `u16::MAX` minutes.
    pub fn write_record(&self, reference: SimTime, max_travel_hours: f32) -> [u8; SCHEDULE_RECORD_BYTES] {
        let mut bytes = [0u8; SCHEDULE_RECORD_BYTES];
        bytes[0] = (self.work_shift as u8 & 0x0F) | ((self.work_status as u8) << 4);
        bytes[1] = (self.scheduled_state as u8 & 0x0F)
            | ((self.vacation_days_left.min(MAX_VACATION_DAYS)) << 4);

        let delta: u16 = match self.scheduled_time {
            None => 0,
            Some(t) => reference.minutes_until(t).min(u16::MAX as u32) as u16,
        };
        bytes[2..4].copy_from_slice(&delta.to_le_bytes());

        let scale = if max_travel_hours > 0.0 {
            (self.travel_time_to_work.clamp(0.0, max_travel_hours) / max_travel_hours
                * u16::MAX as f32)
                .round() as u16
        } else {
            0
        };
        bytes[4..6].copy_from_slice(&scale.to_le_bytes());

        bytes[6] = (self.school_class as u8 & 0x0F) | ((self.school_status as u8) << 4);
        bytes[7] = self.find_visit_place_attempts;
        bytes
    }

    /// Unpack a record. Fields the record does not carry (current state,
    /// building assignments, hour fields) come back as defaults; callers
    /// restore assignments from their own storage and then run
    /// `rederive_hours`.
    pub fn read_record(
        bytes: &[u8; SCHEDULE_RECORD_BYTES],
        reference: SimTime,
        max_travel_hours: f32,
    ) -> Self {
        let mut schedule = Self::default();
        schedule.work_shift = WorkShift::from_u8(bytes[0] & 0x0F);
        schedule.work_status = WorkStatus::from_u8(bytes[0] >> 4);
        schedule.scheduled_state = ResidentState::from_u8(bytes[1] & 0x0F);
        schedule.vacation_days_left = bytes[1] >> 4;

        let delta = u16::from_le_bytes([bytes[2], bytes[3]]);
        schedule.scheduled_time = if delta == 0 {
            None
        } else {
            Some(reference.plus_minutes(delta as u32))
        };

        let scale = u16::from_le_bytes([bytes[4], bytes[5]]);
        schedule.travel_time_to_work = scale as f32 / u16::MAX as f32 * max_travel_hours;

        schedule.school_class = SchoolClass::from_u8(bytes[6] & 0x0F);
        schedule.school_status = SchoolStatus::from_u8(bytes[6] >> 4);
        schedule.find_visit_place_attempts = bytes[7];
        schedule
    }

    /// Rebuild the shift/class hour fields from the live configuration and
    /// the assigned buildings' work times.
    pub fn rederive_hours(
        &mut self,
        cfg: &SchedulingConfig,
        buildings: &BuildingRegistry,
        work_times: &BuildingWorkTimeRegistry,
    ) {
        if let Some(work) = self.work_building {
            let work_time = work_times.get(work);
            let (kind, event) = match buildings.get(work) {
                Some(info) => (info.kind, info.event),
                None => (crate::buildings::BuildingKind::Office, None),
            };
            let (start, end) = shift_hours(self.work_shift, &work_time, kind, event.as_ref(), cfg);
            self.work_shift_start_hour = start;
            self.work_shift_end_hour = end;
            self.works_on_weekends = work_time.work_at_weekends;
        }
        if self.school_building.is_some() {
            let (start, end) = school_class_hours(self.school_class, cfg);
            self.school_class_start_hour = start;
            self.school_class_end_hour = end;
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Resource, Default)]
pub struct ScheduleStore {
    schedules: HashMap<CitizenId, Schedule>,
    /// Reference epoch used when packing records; refreshed every pass so
    /// deltas stay small.
    pub reference_time: SimTime,
    /// Travel scale mirrored from the configuration for the record codec.
    pub max_travel_hours: f32,
    /// Set after a load; a follow-up system re-derives hour fields.
    pub needs_rederive: bool,
}

impl ScheduleStore {
    fn guard(id: CitizenId) {
        assert!(id.0 != 0, "citizen id 0 is out of range");
    }

    /// Copy of the citizen's schedule; unknown citizens read as default.
    pub fn get(&self, id: CitizenId) -> Schedule {
        Self::guard(id);
        self.schedules.get(&id).copied().unwrap_or_default()
    }

    pub fn get_mut(&mut self, id: CitizenId) -> &mut Schedule {
        Self::guard(id);
        self.schedules.entry(id).or_default()
    }

    pub fn set(&mut self, id: CitizenId, schedule: Schedule) {
        Self::guard(id);
        self.schedules.insert(id, schedule);
    }

    pub fn contains(&self, id: CitizenId) -> bool {
        self.schedules.contains_key(&id)
    }

    pub fn remove(&mut self, id: CitizenId) {
        self.schedules.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&CitizenId, &mut Schedule)> {
        self.schedules.iter_mut()
    }
}

// ---------------------------------------------------------------------------
// Saveable implementation (hand-rolled: reference time + packed records)
// ---------------------------------------------------------------------------

/// Bytes per stored citizen: id + work building + school building + record.
const STORE_ENTRY_BYTES: usize = 4 + 4 + 4 + SCHEDULE_RECORD_BYTES;

impl crate::Saveable for ScheduleStore {
    const SAVE_KEY: &'static str = "schedule_store";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.schedules.is_empty() {
            return None;
        }
        let mut ids: Vec<CitizenId> = self.schedules.keys().copied().collect();
        ids.sort_unstable();

        let mut buf = Vec::with_capacity(12 + ids.len() * STORE_ENTRY_BYTES);
        buf.extend_from_slice(&self.reference_time.0.to_le_bytes());
        buf.extend_from_slice(&self.max_travel_hours.to_le_bytes());
        buf.extend_from_slice(&(ids.len() as u32).to_le_bytes());
        for id in ids {
            let schedule = &self.schedules[&id];
            buf.extend_from_slice(&id.0.to_le_bytes());
            buf.extend_from_slice(&schedule.work_building.map_or(0, |b| b.0).to_le_bytes());
            buf.extend_from_slice(&schedule.school_building.map_or(0, |b| b.0).to_le_bytes());
            buf.extend_from_slice(&schedule.write_record(self.reference_time, self.max_travel_hours));
        }
        Some(buf)
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        let mut store = Self::default();
        if bytes.len() < 12 {
            warn!(
                "ScheduleStore: truncated save data ({} bytes), starting empty",
                bytes.len()
            );
            return store;
        }
        let read_u32 = |b: &[u8], at: usize| u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]]);
        store.reference_time = SimTime(read_u32(bytes, 0));
        store.max_travel_hours = f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let count = read_u32(bytes, 8) as usize;
        if bytes.len() < 12 + count * STORE_ENTRY_BYTES {
            warn!(
                "ScheduleStore: save data claims {} entries but holds {} bytes, starting empty",
                count,
                bytes.len()
            );
            return Self::default();
        }
        for i in 0..count {
            let at = 12 + i * STORE_ENTRY_BYTES;
            let id = CitizenId(read_u32(bytes, at));
            if id.0 == 0 {
                warn!("ScheduleStore: skipping reserved citizen id 0 in save data");
                continue;
            }
            let work = read_u32(bytes, at + 4);
            let school = read_u32(bytes, at + 8);
            let mut record = [0u8; SCHEDULE_RECORD_BYTES];
            record.copy_from_slice(&bytes[at + 12..at + 12 + SCHEDULE_RECORD_BYTES]);
            let mut schedule =
                Schedule::read_record(&record, store.reference_time, store.max_travel_hours);
            schedule.work_building = (work != 0).then_some(BuildingId(work));
            schedule.school_building = (school != 0).then_some(BuildingId(school));
            store.schedules.insert(id, schedule);
        }
        store.needs_rederive = true;
        store
    }
}

// ---------------------------------------------------------------------------
// Post-load re-derivation
// ---------------------------------------------------------------------------

/// After a load, hour fields are rebuilt from the current configuration so
/// saves made under different settings fall in line with the live ones.
pub fn rederive_loaded_schedules(
    cfg: Res<SchedulingConfig>,
    buildings: Res<BuildingRegistry>,
    work_times: Res<BuildingWorkTimeRegistry>,
    mut store: ResMut<ScheduleStore>,
) {
    if !store.needs_rederive {
        return;
    }
    store.needs_rederive = false;
    let mut count = 0usize;
    for (_, schedule) in store.iter_mut() {
        schedule.rederive_hours(&cfg, &buildings, &work_times);
        count += 1;
    }
    info!("re-derived shift hours for {} restored schedules", count);
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct SchedulePlugin;

impl Plugin for SchedulePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SchedulingConfig>()
            .init_resource::<ScheduleStore>()
            .register_saveable::<ScheduleStore>()
            .add_systems(FixedUpdate, rederive_loaded_schedules);
    }
}
