//! Building identity, categories, and the registry the availability policy
//! and behavior strategies read.
//!
//! Categories are a flattened service/sub-service enum; every special-case
//! rule elsewhere in the crate goes through the set-membership helpers here
//! instead of long match chains at each call site, so the tables stay the
//! single source of truth.

use std::collections::HashMap;

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::citizens::CitizenId;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Numeric building identifier. Id 0 is reserved and never issued.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, Encode, Decode,
)]
pub struct BuildingId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    Residential,
    CommercialLow,
    CommercialHigh,
    CommercialTourist,
    CommercialLeisure,
    IndustrialGeneric,
    IndustrialFarming,
    IndustrialForestry,
    IndustrialOil,
    IndustrialOre,
    Office,
    Tourism,
    Hotel,
    Police,
    Fire,
    Disaster,
    Healthcare,
    ChildCare,
    ElderCare,
    Education,
    PlayerEducation,
    PlayerIndustry,
    Warehouse,
    AreaMain,
    PublicTransport,
    Electricity,
    Water,
    Garbage,
    Road,
    Beautification,
    Monument,
    Museum,
    VarsitySports,
    Fishing,
    ServicePoint,
}

impl BuildingKind {
    pub fn is_commercial(self) -> bool {
        matches!(
            self,
            Self::CommercialLow
                | Self::CommercialHigh
                | Self::CommercialTourist
                | Self::CommercialLeisure
        )
    }

    pub fn is_education(self) -> bool {
        matches!(self, Self::Education | Self::PlayerEducation)
    }

    pub fn is_care_facility(self) -> bool {
        matches!(self, Self::ChildCare | Self::ElderCare)
    }

    /// Buildings that must never lapse during a shift handoff: a worker on an
    /// ending shift waits for the next shift to actually arrive.
    pub fn is_essential_service(self) -> bool {
        matches!(
            self,
            Self::Electricity
                | Self::Water
                | Self::Healthcare
                | Self::Police
                | Self::Fire
                | Self::Disaster
                | Self::PublicTransport
                | Self::Road
                | Self::Hotel
                | Self::ServicePoint
        )
    }

    /// Area hubs and storage run 24/7 regardless of their derived work time.
    pub fn is_always_on_hub(self) -> bool {
        matches!(self, Self::AreaMain | Self::Warehouse)
    }

    /// Operating hours are meaningless for purely residential buildings;
    /// their `WorkTime` records are removed rather than evaluated.
    pub fn has_operating_hours(self) -> bool {
        self != Self::Residential
    }
}

// ---------------------------------------------------------------------------
// Per-building facts
// ---------------------------------------------------------------------------

/// An event (concert, match, fair) currently hosted by a building. Workers
/// hired for the event work exactly its hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingEvent {
    pub start_hour: f32,
    pub end_hour: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingInfo {
    pub kind: BuildingKind,
    /// Prefab level, 1-based. Education: 1-2 = school, 3 = university.
    pub level: u8,
    pub name: String,
    /// False for abandoned/collapsed/unpowered buildings.
    pub active: bool,
    /// NIMBY flag from the district policy layer.
    pub noise_restricted: bool,
    /// True only for the real instance of a unique building; clones spawned
    /// by assets sharing the prefab stay false.
    pub unique_monument: bool,
    /// District policy: parks stay open to visitors after dark.
    pub night_tours: bool,
    /// Live worker headcount, maintained by the host.
    pub worker_count: u32,
    /// Citizens employed here. Drives the shift-handoff coworker scan.
    pub workers: Vec<CitizenId>,
    pub event: Option<BuildingEvent>,
}

impl BuildingInfo {
    pub fn new(kind: BuildingKind, level: u8) -> Self {
        Self {
            kind,
            level,
            name: String::new(),
            active: true,
            noise_restricted: false,
            unique_monument: false,
            night_tours: false,
            worker_count: 0,
            workers: Vec::new(),
            event: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Resource, Default)]
pub struct BuildingRegistry {
    buildings: HashMap<BuildingId, BuildingInfo>,
}

impl BuildingRegistry {
    pub fn register(&mut self, id: BuildingId, info: BuildingInfo) {
        self.buildings.insert(id, info);
    }

    pub fn remove(&mut self, id: BuildingId) {
        self.buildings.remove(&id);
    }

    pub fn get(&self, id: BuildingId) -> Option<&BuildingInfo> {
        self.buildings.get(&id)
    }

    pub fn get_mut(&mut self, id: BuildingId) -> Option<&mut BuildingInfo> {
        self.buildings.get_mut(&id)
    }

    pub fn kind_of(&self, id: BuildingId) -> Option<BuildingKind> {
        self.buildings.get(&id).map(|info| info.kind)
    }

    pub fn add_worker(&mut self, id: BuildingId, citizen: CitizenId) {
        if let Some(info) = self.buildings.get_mut(&id) {
            if !info.workers.contains(&citizen) {
                info.workers.push(citizen);
            }
        }
    }

    pub fn remove_worker(&mut self, id: BuildingId, citizen: CitizenId) {
        if let Some(info) = self.buildings.get_mut(&id) {
            info.workers.retain(|&w| w != citizen);
        }
    }

    /// Ids in ascending order for deterministic sweeps.
    pub fn sorted_ids(&self) -> Vec<BuildingId> {
        let mut ids: Vec<BuildingId> = self.buildings.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Named-structure deny list
// ---------------------------------------------------------------------------

/// Parking assets are modeled as buildings by some packs but are never a
/// shopping or entertainment destination.
const PARKING_NAME_MARKERS: &[&str] = &["Parking", "Garage", "Car Park", "Park & Ride"];

pub fn is_parking_structure(name: &str) -> bool {
    PARKING_NAME_MARKERS
        .iter()
        .any(|marker| name.contains(marker))
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct BuildingsPlugin;

impl Plugin for BuildingsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BuildingRegistry>();
    }
}
