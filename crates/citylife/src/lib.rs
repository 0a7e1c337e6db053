use bevy::prelude::*;
use std::collections::BTreeMap;

pub mod buildings;
pub mod burn_time;
pub mod citizens;
pub mod config;
pub mod open_hours;
pub mod resident_ai;
pub mod schedule;
pub mod school_behavior;
pub mod sim_rng;
pub mod spare_time;
pub mod time_of_day;
pub mod work_behavior;
pub mod work_time;

#[cfg(test)]
mod integration_tests;

// ---------------------------------------------------------------------------
// Saveable trait + registry for the extension map save pattern
// ---------------------------------------------------------------------------

/// Trait for resources that can be saved/loaded via the extension map.
///
/// Each implementing resource provides its own serialization logic, so adding a new
/// saveable feature requires ZERO changes to any save system file -- the feature
/// plugin just calls `app.register_saveable::<T>()` in its `build()`.
pub trait Saveable: Resource + Default + Send + Sync + 'static {
    /// Unique key for this resource in the save file's extension map.
    /// Must be stable across versions (used for deserialization lookup).
    const SAVE_KEY: &'static str;

    /// Serialize this resource to bytes.
    /// Return `None` to skip saving (e.g. when the resource is at its default state).
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    /// Deserialize from bytes, returning the restored resource.
    fn load_from_bytes(bytes: &[u8]) -> Self;
}

/// Decode bytes via `bitcode::decode`, logging a warning and returning `Default` on failure.
/// Use this in `Saveable::load_from_bytes` implementations to surface decode errors.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    match bitcode::decode(bytes) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Saveable {}: failed to decode {} bytes, falling back to default: {}",
                key,
                bytes.len(),
                e
            );
            T::default()
        }
    }
}

/// Type alias for the save function stored in a `SaveableEntry`.
pub type SaveFn = Box<dyn Fn(&World) -> Option<Vec<u8>> + Send + Sync>;
/// Type alias for the load function stored in a `SaveableEntry`.
pub type LoadFn = Box<dyn Fn(&mut World, &[u8]) + Send + Sync>;
/// Type alias for the reset function stored in a `SaveableEntry`.
pub type ResetFn = Box<dyn Fn(&mut World) + Send + Sync>;

/// Type-erased save/load/reset operations for a single registered resource.
pub struct SaveableEntry {
    pub key: String,
    pub save_fn: SaveFn,
    pub load_fn: LoadFn,
    pub reset_fn: ResetFn,
}

/// Registry of all saveable resources, populated during plugin setup.
///
/// The host's save system iterates this registry to persist/restore extension
/// map entries without needing to know about individual feature types.
#[derive(Resource, Default)]
pub struct SaveableRegistry {
    pub entries: Vec<SaveableEntry>,
}

impl SaveableRegistry {
    /// Register a resource type that implements `Saveable`.
    ///
    /// Panics in debug builds if a resource with the same `SAVE_KEY` is already
    /// registered, preventing silent data loss from duplicate registrations.
    pub fn register<T: Saveable>(&mut self) {
        let key = T::SAVE_KEY.to_string();
        if self.entries.iter().any(|e| e.key == key) {
            warn!(
                "SaveableRegistry: duplicate key '{}' — ignoring second registration",
                key
            );
            debug_assert!(false, "SaveableRegistry: duplicate key '{}'", key);
            return;
        }
        self.entries.push(SaveableEntry {
            key,
            save_fn: Box::new(|world: &World| {
                world.get_resource::<T>().and_then(|r| r.save_to_bytes())
            }),
            load_fn: Box::new(|world: &mut World, bytes: &[u8]| {
                let value = T::load_from_bytes(bytes);
                world.insert_resource(value);
            }),
            reset_fn: Box::new(|world: &mut World| {
                world.insert_resource(T::default());
            }),
        });
    }

    /// Save all registered resources into an extension map.
    pub fn save_all(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        let mut extensions = BTreeMap::new();
        for entry in &self.entries {
            if let Some(bytes) = (entry.save_fn)(world) {
                extensions.insert(entry.key.clone(), bytes);
            }
        }
        extensions
    }

    /// Load registered resources from an extension map.
    /// Resources whose key is absent are left unchanged (they keep their init_resource default).
    pub fn load_all(&self, world: &mut World, extensions: &BTreeMap<String, Vec<u8>>) {
        for entry in &self.entries {
            if let Some(bytes) = extensions.get(&entry.key) {
                (entry.load_fn)(world, bytes);
            }
        }
    }

    /// Reset all registered resources to their defaults (used by new-game).
    pub fn reset_all(&self, world: &mut World) {
        for entry in &self.entries {
            (entry.reset_fn)(world);
        }
    }
}

/// Extension trait on `App` for one-line saveable registration.
///
/// # Example
///
/// ```ignore
/// fn build(&self, app: &mut App) {
///     app.init_resource::<MyFeatureState>()
///        .register_saveable::<MyFeatureState>();
/// }
/// ```
pub trait SaveableAppExt {
    fn register_saveable<T: Saveable>(&mut self) -> &mut Self;
}

impl SaveableAppExt for App {
    fn register_saveable<T: Saveable>(&mut self) -> &mut Self {
        // Ensure the registry exists (idempotent).
        self.init_resource::<SaveableRegistry>();
        // Register the type.
        self.world_mut()
            .resource_mut::<SaveableRegistry>()
            .register::<T>();
        self
    }
}

// ---------------------------------------------------------------------------
// Core resources
// ---------------------------------------------------------------------------

/// Global tick counter incremented each FixedUpdate, used for frame
/// partitioning and throttling.
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

/// Shared throttle timer for registry-wide maintenance that doesn't need to
/// run every tick.
#[derive(Resource, Default)]
pub struct SlowTickTimer {
    pub counter: u32,
}

impl SlowTickTimer {
    pub const INTERVAL: u32 = 100; // run slow systems every 100 ticks

    pub fn tick(&mut self) {
        self.counter += 1;
    }

    pub fn should_run(&self) -> bool {
        self.counter.is_multiple_of(Self::INTERVAL)
    }
}

/// Number of frames a full schedule pass is spread across. Each citizen is
/// revisited once per window, so per-frame work stays O(citizens / steps).
pub const SCHEDULE_FRAME_STEPS: u32 = 16;

/// True when `index` falls in the slice of work assigned to this tick.
pub fn frame_due(index: u32, tick: u64) -> bool {
    index % SCHEDULE_FRAME_STEPS == (tick % SCHEDULE_FRAME_STEPS as u64) as u32
}

pub fn tick_counters(mut timer: ResMut<SlowTickTimer>, mut tick: ResMut<TickCounter>) {
    timer.tick();
    tick.0 = tick.0.wrapping_add(1);
}

// ---------------------------------------------------------------------------
// Top-level plugin
// ---------------------------------------------------------------------------

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TickCounter>()
            .init_resource::<SlowTickTimer>()
            .init_resource::<SaveableRegistry>()
            .add_systems(FixedUpdate, tick_counters);

        app.add_plugins((
            sim_rng::SimRngPlugin,
            time_of_day::TimeOfDayPlugin,
            buildings::BuildingsPlugin,
            citizens::CitizensPlugin,
            work_time::WorkTimePlugin,
            schedule::SchedulePlugin,
            resident_ai::ResidentAiPlugin,
            burn_time::BurnTimePlugin,
        ));
    }
}
