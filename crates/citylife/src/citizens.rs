//! Citizen identity, age groups, and the movement collaborator seam.
//!
//! The host simulation owns the real citizen storage; this module keeps the
//! minimal per-citizen facts the scheduler needs (age group, home, location,
//! incapacitation flags) in an explicit registry keyed by `CitizenId`.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::buildings::BuildingId;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Numeric citizen identifier. Id 0 is reserved and never issued; passing it
/// to a schedule accessor is a programming error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CitizenId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    Child,  // 0-12   (stays home or attends school)
    Teen,   // 13-18  (school)
    Young,  // 19-25  (university or first job)
    Adult,  // 26-64
    Senior, // 65+
}

impl AgeGroup {
    pub fn from_age(age: u8) -> Self {
        match age {
            0..=12 => Self::Child,
            13..=18 => Self::Teen,
            19..=25 => Self::Young,
            26..=64 => Self::Adult,
            _ => Self::Senior,
        }
    }

    pub fn can_work(self) -> bool {
        matches!(self, Self::Young | Self::Adult | Self::Senior)
    }

    pub fn attends_school(self) -> bool {
        matches!(self, Self::Child | Self::Teen | Self::Young)
    }

    /// Lunch trips are an adult habit; kids eat at school, seniors at home.
    pub fn takes_lunch(self) -> bool {
        matches!(self, Self::Young | Self::Adult)
    }
}

// ---------------------------------------------------------------------------
// Location and per-citizen facts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitizenLocation {
    Home,
    Work,
    School,
    Visiting(BuildingId),
    Moving,
    Evacuated,
    Hospital,
    Jail,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CitizenInfo {
    pub age_group: AgeGroup,
    pub home_building: Option<BuildingId>,
    pub location: CitizenLocation,
    pub dead: bool,
    pub sick: bool,
    pub arrested: bool,
}

impl CitizenInfo {
    pub fn new(age_group: AgeGroup, home_building: Option<BuildingId>) -> Self {
        Self {
            age_group,
            home_building,
            location: CitizenLocation::Home,
            dead: false,
            sick: false,
            arrested: false,
        }
    }

    pub fn is_incapacitated(&self) -> bool {
        self.dead || self.sick || self.arrested
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Resource, Default)]
pub struct CitizenRegistry {
    citizens: HashMap<CitizenId, CitizenInfo>,
}

impl CitizenRegistry {
    pub fn register(&mut self, id: CitizenId, info: CitizenInfo) {
        self.citizens.insert(id, info);
    }

    pub fn remove(&mut self, id: CitizenId) {
        self.citizens.remove(&id);
    }

    pub fn get(&self, id: CitizenId) -> Option<&CitizenInfo> {
        self.citizens.get(&id)
    }

    pub fn get_mut(&mut self, id: CitizenId) -> Option<&mut CitizenInfo> {
        self.citizens.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.citizens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citizens.is_empty()
    }

    /// Ids in ascending order, so per-tick passes visit citizens in a
    /// deterministic sequence regardless of map iteration order.
    pub fn sorted_ids(&self) -> Vec<CitizenId> {
        let mut ids: Vec<CitizenId> = self.citizens.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

// ---------------------------------------------------------------------------
// Movement collaborator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTarget {
    Home,
    Work(BuildingId),
    School(BuildingId),
    Visit(BuildingId),
    Shelter(BuildingId),
    Hospital,
    Jail,
}

/// Seam to the host's pathfinding/vehicle layer. Returning `false` means the
/// journey could not be started; the orchestrator reschedules and retries.
pub trait CitizenMovement: Send + Sync {
    fn try_move_to(
        &mut self,
        citizens: &mut CitizenRegistry,
        id: CitizenId,
        target: MoveTarget,
    ) -> bool;
}

/// Trivial adapter: relocates the citizen immediately, no journey. Hosts with
/// a real movement layer swap this out and deliver `CitizenArrived`/
/// `CitizenDeparted` events as journeys progress.
pub struct DirectMovement;

impl CitizenMovement for DirectMovement {
    fn try_move_to(
        &mut self,
        citizens: &mut CitizenRegistry,
        id: CitizenId,
        target: MoveTarget,
    ) -> bool {
        let Some(info) = citizens.get_mut(id) else {
            return false;
        };
        info.location = match target {
            MoveTarget::Home => CitizenLocation::Home,
            MoveTarget::Work(_) => CitizenLocation::Work,
            MoveTarget::School(_) => CitizenLocation::School,
            MoveTarget::Visit(building) => CitizenLocation::Visiting(building),
            MoveTarget::Shelter(_) => CitizenLocation::Evacuated,
            MoveTarget::Hospital => CitizenLocation::Hospital,
            MoveTarget::Jail => CitizenLocation::Jail,
        };
        true
    }
}

/// Resource wrapper so the movement impl can be swapped per app.
#[derive(Resource)]
pub struct MovementService(pub Box<dyn CitizenMovement>);

impl Default for MovementService {
    fn default() -> Self {
        Self(Box::new(DirectMovement))
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct CitizensPlugin;

impl Plugin for CitizensPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CitizenRegistry>()
            .init_resource::<MovementService>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_groups() {
        assert_eq!(AgeGroup::from_age(5), AgeGroup::Child);
        assert_eq!(AgeGroup::from_age(16), AgeGroup::Teen);
        assert_eq!(AgeGroup::from_age(21), AgeGroup::Young);
        assert_eq!(AgeGroup::from_age(40), AgeGroup::Adult);
        assert_eq!(AgeGroup::from_age(70), AgeGroup::Senior);

        assert!(AgeGroup::Adult.can_work());
        assert!(AgeGroup::Senior.can_work());
        assert!(!AgeGroup::Child.can_work());
        assert!(AgeGroup::Teen.attends_school());
        assert!(!AgeGroup::Senior.attends_school());
        assert!(AgeGroup::Adult.takes_lunch());
        assert!(!AgeGroup::Teen.takes_lunch());
    }

    #[test]
    fn test_registry_sorted_ids() {
        let mut registry = CitizenRegistry::default();
        for raw in [30u32, 7, 19] {
            registry.register(
                CitizenId(raw),
                CitizenInfo::new(AgeGroup::Adult, Some(BuildingId(1))),
            );
        }
        assert_eq!(
            registry.sorted_ids(),
            vec![CitizenId(7), CitizenId(19), CitizenId(30)]
        );
    }

    #[test]
    fn test_direct_movement_relocates() {
        let mut registry = CitizenRegistry::default();
        let id = CitizenId(1);
        registry.register(id, CitizenInfo::new(AgeGroup::Adult, None));

        let mut movement = DirectMovement;
        assert!(movement.try_move_to(&mut registry, id, MoveTarget::Work(BuildingId(9))));
        assert_eq!(registry.get(id).unwrap().location, CitizenLocation::Work);

        assert!(movement.try_move_to(&mut registry, id, MoveTarget::Visit(BuildingId(4))));
        assert_eq!(
            registry.get(id).unwrap().location,
            CitizenLocation::Visiting(BuildingId(4))
        );
    }

    #[test]
    fn test_direct_movement_unknown_citizen_fails() {
        let mut registry = CitizenRegistry::default();
        let mut movement = DirectMovement;
        assert!(!movement.try_move_to(&mut registry, CitizenId(99), MoveTarget::Home));
    }

    #[test]
    fn test_incapacitated() {
        let mut info = CitizenInfo::new(AgeGroup::Adult, None);
        assert!(!info.is_incapacitated());
        info.sick = true;
        assert!(info.is_incapacitated());
    }
}
