pub mod mock;
#[cfg(target_arch = "wasm32")]
pub mod memory_helper;
#[cfg(target_arch = "wasm32")]
pub mod live;

use crate::error::ActionError;
use crate::features::FeatureFlags;
use crate::roles::actions::CreepAction;
use crate::world::*;
use screeps::{Part, Position, StructureType};
use shrinkwraprs::*;
use std::sync::Arc;

/// The durable store has been requested but is not readable until a later tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StorageNotReady;

/// Everything the scheduler consumes from the game engine. Commands return the engine's closed set of
/// result codes; world queries come through the per-tick snapshot.
pub trait GameHost: Send + Sync {
    fn time(&self) -> u32;

    fn snapshot(&self) -> WorldState;

    fn features(&self) -> FeatureFlags;

    /// Resets one-shot feature flags once they have been observed.
    fn clear_one_shot_features(&self);

    fn load_memory(&self) -> Result<Option<String>, StorageNotReady>;

    fn store_memory(&self, data: &str);

    fn spawn_creep(&self, spawn: &SpawnState, body: &[Part], name: &str) -> Result<(), ActionError>;

    fn execute(&self, creep: &CreepState, action: &CreepAction) -> Result<(), ActionError>;

    fn create_construction_site(&self, pos: Position, structure_type: StructureType) -> Result<(), ActionError>;

    /// Path cost between two positions, or `None` when no path exists.
    fn path_cost(&self, from: Position, to: Position) -> Option<u32>;

    fn notify(&self, message: &str);
}

#[derive(Shrinkwrap, Clone)]
pub struct HostHandle(pub Arc<dyn GameHost>);

impl HostHandle {
    pub fn new(host: Arc<dyn GameHost>) -> HostHandle {
        HostHandle(host)
    }

    pub fn as_host(&self) -> &dyn GameHost {
        &*self.0
    }
}
