//! Per-building operating-hours records and their derivation rules.
//!
//! A `WorkTime` is created lazily the first time something asks about a
//! building's hours. Derivation is keyed purely on the building category
//! tables below plus configured randomization quotas, so the same category
//! always starts from the same flags and only the quota rolls differ.

use std::collections::HashMap;

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::buildings::{BuildingEvent, BuildingId, BuildingKind, BuildingRegistry};
use crate::config::{SchedulingConfig, CONTINUOUS_DAY_BEGIN, CONTINUOUS_DAY_END};
use crate::schedule::{SchoolClass, WorkShift};
use crate::sim_rng::SimRng;
use crate::{SaveableAppExt, SlowTickTimer};

// ---------------------------------------------------------------------------
// WorkTime record
// ---------------------------------------------------------------------------

/// Operating-hours flags for one building.
///
/// The zero value (all flags off, one shift) is what registry lookups return
/// for buildings that never had a record created; callers treat it as
/// "unconfigured" and re-derive via `create` when it matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct WorkTime {
    pub work_at_night: bool,
    pub work_at_weekends: bool,
    pub has_extended_work_shift: bool,
    pub has_continuous_work_shift: bool,
    /// 1-3 staffed shifts per day.
    pub work_shifts: u8,
}

impl Default for WorkTime {
    fn default() -> Self {
        Self {
            work_at_night: false,
            work_at_weekends: false,
            has_extended_work_shift: false,
            has_continuous_work_shift: false,
            work_shifts: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Category tables
// ---------------------------------------------------------------------------

pub fn works_at_night(kind: BuildingKind) -> bool {
    use BuildingKind::*;
    matches!(
        kind,
        IndustrialOil
            | IndustrialOre
            | Tourism
            | Hotel
            | CommercialTourist
            | CommercialLeisure
            | Police
            | Fire
            | Disaster
            | PublicTransport
            | Electricity
            | Water
            | Healthcare
            | Garbage
            | Road
    )
}

pub fn works_at_weekends(kind: BuildingKind) -> bool {
    use BuildingKind::*;
    matches!(
        kind,
        CommercialTourist
            | CommercialLeisure
            | IndustrialFarming
            | IndustrialForestry
            | IndustrialOil
            | IndustrialOre
            | PlayerIndustry
            | Tourism
            | Hotel
            | Electricity
            | Water
            | Beautification
            | Healthcare
            | Police
            | Fire
            | PublicTransport
            | Disaster
            | Monument
            | Garbage
            | Road
            | Museum
            | VarsitySports
            | Fishing
    )
}

/// First shift starts before patrons arrive (staff opening the building).
pub fn has_extended_shift(kind: BuildingKind) -> bool {
    use BuildingKind::*;
    matches!(
        kind,
        Beautification
            | Education
            | PlayerEducation
            | PlayerIndustry
            | Fishing
            | IndustrialFarming
            | IndustrialForestry
    )
}

/// No lunch break, 1-2 shifts covering the whole day.
pub fn has_continuous_shift(kind: BuildingKind) -> bool {
    use BuildingKind::*;
    matches!(kind, Healthcare | Police | Fire | Disaster)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Resource, Default)]
pub struct BuildingWorkTimeRegistry {
    records: HashMap<BuildingId, WorkTime>,
}

impl BuildingWorkTimeRegistry {
    /// Never fails; absent buildings read as the zero-value default.
    pub fn get(&self, id: BuildingId) -> WorkTime {
        self.records.get(&id).copied().unwrap_or_default()
    }

    pub fn contains(&self, id: BuildingId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn set(&mut self, id: BuildingId, work_time: WorkTime) {
        self.records.insert(id, work_time);
    }

    pub fn remove(&mut self, id: BuildingId) {
        self.records.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Derive and insert a record for a building, or return the existing one
    /// untouched. Quota rolls only happen on the first call.
    pub fn create(
        &mut self,
        id: BuildingId,
        kind: BuildingKind,
        level: u8,
        cfg: &SchedulingConfig,
        rng: &mut SimRng,
    ) -> WorkTime {
        if let Some(existing) = self.records.get(&id) {
            return *existing;
        }

        let mut wt = WorkTime {
            work_at_night: works_at_night(kind),
            work_at_weekends: works_at_weekends(kind),
            has_extended_work_shift: has_extended_shift(kind),
            has_continuous_work_shift: has_continuous_shift(kind),
            work_shifts: 1,
        };

        // Low commercial gets a second chance at night/weekend activity via
        // independently configured quotas.
        if kind == BuildingKind::CommercialLow {
            if !wt.work_at_night && rng.chance(cfg.commercial_night_quota) {
                wt.work_at_night = true;
            }
            if !wt.work_at_weekends && rng.chance(cfg.commercial_weekend_quota) {
                wt.work_at_weekends = true;
            }
        }

        // Commercial buildings with no shift type decided yet: 50% extended,
        // otherwise a further 50% continuous.
        if kind.is_commercial() && !wt.has_extended_work_shift && !wt.has_continuous_work_shift {
            if rng.chance(50) {
                wt.has_extended_work_shift = true;
            } else if rng.chance(50) {
                wt.has_continuous_work_shift = true;
            }
        }

        wt.work_shifts = if wt.has_continuous_work_shift && !wt.work_at_night {
            1
        } else if wt.work_at_night && !wt.has_continuous_work_shift {
            3
        } else {
            2
        };

        // Education staffing follows class structure, not the generic rule.
        if kind.is_education() {
            wt.work_shifts = if level >= 3 { 2 } else { 1 };
        }

        // Area hubs and storage never close.
        if kind.is_always_on_hub() {
            wt.work_at_night = true;
            wt.work_at_weekends = true;
            wt.has_continuous_work_shift = false;
            wt.work_shifts = 3;
        }

        self.records.insert(id, wt);
        wt
    }
}

// ---------------------------------------------------------------------------
// Shift and class hour resolution
// ---------------------------------------------------------------------------

/// Resolve the `[start, end)` hours a citizen on `shift` works, given the
/// building's work time and category. This is the single source of truth:
/// both shift assignment and record re-derivation after load go through it.
pub fn shift_hours(
    shift: WorkShift,
    work_time: &WorkTime,
    kind: BuildingKind,
    event: Option<&BuildingEvent>,
    cfg: &SchedulingConfig,
) -> (f32, f32) {
    match shift {
        WorkShift::Unemployed => (0.0, 0.0),
        WorkShift::First => {
            if kind.is_education() {
                // Teachers on extended shifts open the building well before
                // the first class.
                let begin = if work_time.has_extended_work_shift {
                    cfg.earliest_wake_up_hour
                } else {
                    cfg.school_begin
                };
                (begin, cfg.school_end)
            } else {
                let begin = if work_time.has_extended_work_shift {
                    cfg.wake_up_hour.min(cfg.school_begin)
                } else {
                    cfg.work_begin
                };
                (begin, cfg.work_end)
            }
        }
        WorkShift::Second => (cfg.work_end, cfg.go_to_sleep_hour),
        WorkShift::Night => (cfg.go_to_sleep_hour, cfg.work_begin),
        WorkShift::ContinuousDay => (CONTINUOUS_DAY_BEGIN, CONTINUOUS_DAY_END),
        WorkShift::ContinuousNight => (CONTINUOUS_DAY_END, CONTINUOUS_DAY_BEGIN),
        WorkShift::Event => event
            .map(|e| (e.start_hour, e.end_hour))
            .unwrap_or((cfg.work_begin, cfg.work_end)),
    }
}

pub fn school_class_hours(class: SchoolClass, cfg: &SchedulingConfig) -> (f32, f32) {
    match class {
        SchoolClass::DayClass => (cfg.school_begin, cfg.school_end),
        // Evening students share the second-shift rhythm of the city.
        SchoolClass::NightClass => (cfg.work_end, cfg.go_to_sleep_hour),
    }
}

// ---------------------------------------------------------------------------
// Saveable implementation
// ---------------------------------------------------------------------------

#[derive(Encode, Decode, Default)]
struct WorkTimeSnapshot {
    entries: Vec<(BuildingId, WorkTime)>,
}

impl crate::Saveable for BuildingWorkTimeRegistry {
    const SAVE_KEY: &'static str = "building_work_times";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.records.is_empty() {
            return None;
        }
        let mut entries: Vec<(BuildingId, WorkTime)> =
            self.records.iter().map(|(id, wt)| (*id, *wt)).collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        Some(bitcode::encode(&WorkTimeSnapshot { entries }))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        let snapshot: WorkTimeSnapshot = crate::decode_or_warn(Self::SAVE_KEY, bytes);
        Self {
            records: snapshot.entries.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

/// Care facilities are always open; any record derived for them by category
/// is stripped so nothing downstream gates on it. Residential buildings
/// likewise have no meaningful operating hours.
pub fn strip_meaningless_work_times(
    slow_timer: Res<SlowTickTimer>,
    buildings: Res<BuildingRegistry>,
    mut work_times: ResMut<BuildingWorkTimeRegistry>,
) {
    if !slow_timer.should_run() {
        return;
    }
    for id in buildings.sorted_ids() {
        let Some(info) = buildings.get(id) else {
            continue;
        };
        if (info.kind.is_care_facility() || !info.kind.has_operating_hours())
            && work_times.contains(id)
        {
            work_times.remove(id);
        }
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct WorkTimePlugin;

impl Plugin for WorkTimePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BuildingWorkTimeRegistry>()
            .register_saveable::<BuildingWorkTimeRegistry>()
            .add_systems(FixedUpdate, strip_meaningless_work_times);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SchedulingConfig {
        SchedulingConfig::default()
    }

    #[test]
    fn test_get_absent_returns_default() {
        let registry = BuildingWorkTimeRegistry::default();
        let wt = registry.get(BuildingId(404));
        assert_eq!(wt, WorkTime::default());
        assert!(!registry.contains(BuildingId(404)));
    }

    #[test]
    fn test_create_is_idempotent() {
        let cfg = cfg();
        let mut rng = SimRng::from_seed_u64(1);
        let mut registry = BuildingWorkTimeRegistry::default();

        let first = registry.create(BuildingId(1), BuildingKind::Police, 1, &cfg, &mut rng);
        let mut changed = first;
        changed.work_shifts = 1;
        registry.set(BuildingId(1), changed);

        let second = registry.create(BuildingId(1), BuildingKind::Police, 1, &cfg, &mut rng);
        assert_eq!(second, changed, "existing records are returned untouched");
    }

    #[test]
    fn test_police_is_continuous_night_weekend() {
        let cfg = cfg();
        let mut rng = SimRng::from_seed_u64(1);
        let mut registry = BuildingWorkTimeRegistry::default();
        let wt = registry.create(BuildingId(2), BuildingKind::Police, 1, &cfg, &mut rng);
        assert!(wt.work_at_night);
        assert!(wt.work_at_weekends);
        assert!(wt.has_continuous_work_shift);
        // Continuous + night -> 2 shifts.
        assert_eq!(wt.work_shifts, 2);
    }

    #[test]
    fn test_healthcare_shifts() {
        let cfg = cfg();
        let mut rng = SimRng::from_seed_u64(1);
        let mut registry = BuildingWorkTimeRegistry::default();
        let wt = registry.create(BuildingId(3), BuildingKind::Healthcare, 1, &cfg, &mut rng);
        assert!(wt.has_continuous_work_shift && wt.work_at_night);
        assert_eq!(wt.work_shifts, 2);
    }

    #[test]
    fn test_oil_industry_is_three_shift() {
        let cfg = cfg();
        let mut rng = SimRng::from_seed_u64(1);
        let mut registry = BuildingWorkTimeRegistry::default();
        let wt = registry.create(BuildingId(4), BuildingKind::IndustrialOil, 1, &cfg, &mut rng);
        assert!(wt.work_at_night && !wt.has_continuous_work_shift);
        assert_eq!(wt.work_shifts, 3);
    }

    #[test]
    fn test_low_commercial_zero_quotas() {
        let mut cfg = cfg();
        cfg.commercial_night_quota = 0;
        cfg.commercial_weekend_quota = 0;
        let mut rng = SimRng::from_seed_u64(1);
        let mut registry = BuildingWorkTimeRegistry::default();
        let wt = registry.create(BuildingId(5), BuildingKind::CommercialLow, 1, &cfg, &mut rng);
        assert!(!wt.work_at_night);
        assert!(!wt.work_at_weekends);
        // Baseline shift count when neither continuous-without-night nor
        // night-without-continuous applies.
        if !wt.has_continuous_work_shift {
            assert_eq!(wt.work_shifts, 2);
        } else {
            assert_eq!(wt.work_shifts, 1);
        }
    }

    #[test]
    fn test_education_levels_override_shifts() {
        let cfg = cfg();
        let mut rng = SimRng::from_seed_u64(1);
        let mut registry = BuildingWorkTimeRegistry::default();

        let school = registry.create(BuildingId(6), BuildingKind::Education, 1, &cfg, &mut rng);
        assert_eq!(school.work_shifts, 1);
        let high = registry.create(BuildingId(7), BuildingKind::Education, 2, &cfg, &mut rng);
        assert_eq!(high.work_shifts, 1);
        let university = registry.create(BuildingId(8), BuildingKind::Education, 3, &cfg, &mut rng);
        assert_eq!(university.work_shifts, 2);
        assert!(university.has_extended_work_shift);
    }

    #[test]
    fn test_hub_forced_around_the_clock() {
        let cfg = cfg();
        let mut rng = SimRng::from_seed_u64(1);
        let mut registry = BuildingWorkTimeRegistry::default();
        let wt = registry.create(BuildingId(9), BuildingKind::Warehouse, 1, &cfg, &mut rng);
        assert!(wt.work_at_night && wt.work_at_weekends);
        assert_eq!(wt.work_shifts, 3);
    }

    #[test]
    fn test_shift_hours_standard() {
        let cfg = cfg();
        let wt = WorkTime {
            work_shifts: 3,
            work_at_night: true,
            ..Default::default()
        };
        let (b, e) = shift_hours(WorkShift::First, &wt, BuildingKind::Office, None, &cfg);
        assert_eq!((b, e), (cfg.work_begin, cfg.work_end));
        let (b, e) = shift_hours(WorkShift::Second, &wt, BuildingKind::Office, None, &cfg);
        assert_eq!((b, e), (cfg.work_end, cfg.go_to_sleep_hour));
        let (b, e) = shift_hours(WorkShift::Night, &wt, BuildingKind::Office, None, &cfg);
        assert_eq!((b, e), (cfg.go_to_sleep_hour, cfg.work_begin));
    }

    #[test]
    fn test_shift_hours_extended_teacher_starts_earliest() {
        let cfg = cfg();
        let wt = WorkTime {
            has_extended_work_shift: true,
            ..Default::default()
        };
        let (teacher_begin, teacher_end) =
            shift_hours(WorkShift::First, &wt, BuildingKind::Education, None, &cfg);
        let (staff_begin, _) =
            shift_hours(WorkShift::First, &wt, BuildingKind::Beautification, None, &cfg);
        assert_eq!(teacher_begin, cfg.earliest_wake_up_hour);
        assert_eq!(teacher_end, cfg.school_end);
        assert!(teacher_begin < staff_begin);
        assert_eq!(staff_begin, cfg.wake_up_hour.min(cfg.school_begin));
    }

    #[test]
    fn test_shift_hours_event() {
        let cfg = cfg();
        let wt = WorkTime::default();
        let event = BuildingEvent {
            start_hour: 19.0,
            end_hour: 23.0,
        };
        let (b, e) = shift_hours(
            WorkShift::Event,
            &wt,
            BuildingKind::VarsitySports,
            Some(&event),
            &cfg,
        );
        assert_eq!((b, e), (19.0, 23.0));
        // Without a live event the generic work hours apply.
        let (b, e) = shift_hours(WorkShift::Event, &wt, BuildingKind::VarsitySports, None, &cfg);
        assert_eq!((b, e), (cfg.work_begin, cfg.work_end));
    }

    #[test]
    fn test_school_class_hours() {
        let cfg = cfg();
        assert_eq!(
            school_class_hours(SchoolClass::DayClass, &cfg),
            (cfg.school_begin, cfg.school_end)
        );
        assert_eq!(
            school_class_hours(SchoolClass::NightClass, &cfg),
            (cfg.work_end, cfg.go_to_sleep_hour)
        );
    }

    #[test]
    fn test_saveable_roundtrip() {
        use crate::Saveable;
        let cfg = cfg();
        let mut rng = SimRng::from_seed_u64(77);
        let mut registry = BuildingWorkTimeRegistry::default();
        registry.create(BuildingId(1), BuildingKind::Police, 1, &cfg, &mut rng);
        registry.create(BuildingId(2), BuildingKind::CommercialLow, 1, &cfg, &mut rng);
        registry.create(BuildingId(3), BuildingKind::Education, 3, &cfg, &mut rng);

        let bytes = registry.save_to_bytes().expect("should serialize");
        let restored = BuildingWorkTimeRegistry::load_from_bytes(&bytes);
        assert_eq!(restored.len(), 3);
        for id in [BuildingId(1), BuildingId(2), BuildingId(3)] {
            assert_eq!(restored.get(id), registry.get(id));
        }
    }

    #[test]
    fn test_empty_registry_skips_save() {
        use crate::Saveable;
        let registry = BuildingWorkTimeRegistry::default();
        assert!(registry.save_to_bytes().is_none());
    }
}
