use super::memory_helper;
use super::*;
use crate::constants::*;
use crate::features::ONE_SHOT_FLAG_PATHS;
use crate::serialize::split_segments;
use log::*;
use screeps::{
    find, game, pathfinder, Creep, Direction, ErrorCode, HasPosition, MaybeHasId, RawMemory, RawObjectId, ResourceType, Room,
    RoomName, SearchOptions, Source, StructureController, StructureObject, StructureSpawn, Terrain,
};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Mutex;
use wasm_bindgen::JsCast;

/// Tracks which memory segments are readable this tick and which should be active next tick.
pub struct MemoryArbiter {
    active: Option<HashSet<u8>>,
    requests: HashSet<u8>,
}

impl MemoryArbiter {
    pub fn new() -> MemoryArbiter {
        MemoryArbiter {
            active: None,
            requests: HashSet::new(),
        }
    }

    pub fn request(&mut self, segment: u8) {
        self.requests.insert(segment);
    }

    pub fn is_active(&mut self, segment: u8) -> bool {
        self.active
            .get_or_insert_with(|| RawMemory::segments().keys().collect())
            .contains(&segment)
    }

    pub fn get(&self, segment: u8) -> Option<String> {
        RawMemory::segments().get(segment)
    }

    pub fn set(&mut self, segment: u8, data: String) {
        if data.len() > MEMORY_SEGMENT_SIZE {
            error!("Memory segment too large - Segment: {} - Length: {}", segment, data.len());
        }

        RawMemory::segments().set(segment, data);
    }

    /// Commits requested segments for next tick and forgets what was active this tick.
    pub fn commit(&mut self) {
        let segments: Vec<_> = self.requests.iter().cloned().collect();

        RawMemory::set_active_segments(&segments);

        self.requests.clear();
        self.active = None;
    }
}

impl Default for MemoryArbiter {
    fn default() -> MemoryArbiter {
        MemoryArbiter::new()
    }
}

fn error_code<E: Into<ErrorCode>>(err: E) -> ActionError {
    match err.into() {
        ErrorCode::NotInRange => ActionError::NotInRange,
        ErrorCode::NoPath => ActionError::NoPath,
        ErrorCode::Busy => ActionError::Busy,
        ErrorCode::NotEnough => ActionError::NotEnoughResources,
        ErrorCode::InvalidTarget | ErrorCode::NotFound => ActionError::InvalidTarget,
        ErrorCode::Full => ActionError::Full,
        ErrorCode::NameExists => ActionError::NameExists,
        ErrorCode::NotOwner => ActionError::NotOwner,
        ErrorCode::Tired => ActionError::Tired,
        other => ActionError::Other(other as i32),
    }
}

fn resolve<T: JsCast>(id: &str) -> Result<T, ActionError> {
    let id = RawObjectId::from_str(id).map_err(|_| ActionError::InvalidTarget)?;

    game::get_object_by_id_erased(&id)
        .map(|object| object.unchecked_into::<T>())
        .ok_or(ActionError::InvalidTarget)
}

fn resolve_structure(id: &str) -> Result<StructureObject, ActionError> {
    resolve::<screeps::Structure>(id).map(StructureObject::from)
}

fn open_positions(room_name: RoomName, pos: screeps::Position) -> Vec<screeps::Position> {
    let terrain = match game::map::get_room_terrain(room_name) {
        Some(terrain) => terrain,
        None => return Vec::new(),
    };

    let mut positions = Vec::new();

    for dx in -1..=1 {
        for dy in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }

            if let Some(candidate) = offset_position(pos, dx, dy) {
                if terrain.get(candidate.x().u8(), candidate.y().u8()) != Terrain::Wall {
                    positions.push(candidate);
                }
            }
        }
    }

    positions
}

fn controller_state(controller: &StructureController) -> ControllerState {
    ControllerState {
        id: controller.id().to_string(),
        pos: controller.pos(),
        my: controller.my(),
        level: controller.level(),
        progress: controller.progress().unwrap_or(0),
        progress_total: controller.progress_total().unwrap_or(0),
    }
}

fn source_state(room_name: RoomName, source: &Source) -> SourceState {
    SourceState {
        id: source.id().to_string(),
        pos: source.pos(),
        energy: source.energy(),
        energy_capacity: source.energy_capacity(),
        open_positions: open_positions(room_name, source.pos()),
    }
}

fn spawn_state(spawn: &StructureSpawn) -> SpawnState {
    SpawnState {
        id: spawn.id().to_string(),
        name: spawn.name(),
        pos: spawn.pos(),
        spawning: spawn.spawning().is_some(),
        active: spawn.is_active(),
        energy: spawn.store().get_used_capacity(Some(ResourceType::Energy)),
        energy_capacity: spawn.store().get_capacity(Some(ResourceType::Energy)),
    }
}

fn structure_state(structure: &StructureObject) -> Option<StructureState> {
    let base = structure.as_structure();

    let (energy, energy_capacity) = structure
        .as_has_store()
        .map(|store| {
            let store = store.store();

            (
                store.get_used_capacity(Some(ResourceType::Energy)),
                store.get_capacity(Some(ResourceType::Energy)),
            )
        })
        .unwrap_or((0, 0));

    Some(StructureState {
        id: base.try_raw_id()?.to_string(),
        structure_type: base.structure_type(),
        pos: base.pos(),
        hits: base.hits(),
        hits_max: base.hits_max(),
        energy,
        energy_capacity,
    })
}

fn room_state(room: &Room) -> RoomState {
    let name = room.name();

    let mut state = RoomState::new(name);

    state.energy_available = room.energy_available();
    state.energy_capacity_available = room.energy_capacity_available();
    state.controller = room.controller().as_ref().map(controller_state);
    state.sources = room.find(find::SOURCES, None).iter().map(|source| source_state(name, source)).collect();
    state.spawns = room.find(find::MY_SPAWNS, None).iter().map(spawn_state).collect();

    //
    // NOTE: Spawns are tracked separately so they are not double counted as energy sinks.
    //
    state.structures = room
        .find(find::STRUCTURES, None)
        .iter()
        .filter(|structure| !matches!(structure, StructureObject::StructureSpawn(_)))
        .filter_map(structure_state)
        .collect();

    state.construction_sites = room
        .find(find::MY_CONSTRUCTION_SITES, None)
        .iter()
        .filter_map(|site| {
            Some(ConstructionSiteState {
                id: site.try_raw_id()?.to_string(),
                structure_type: site.structure_type(),
                pos: site.pos(),
                progress: site.progress(),
                progress_total: site.progress_total(),
            })
        })
        .collect();

    state.dropped_energy = room
        .find(find::DROPPED_RESOURCES, None)
        .iter()
        .filter(|resource| resource.resource_type() == ResourceType::Energy)
        .map(|resource| DroppedEnergyState {
            id: resource.id().to_string(),
            pos: resource.pos(),
            amount: resource.amount(),
        })
        .collect();

    state
}

fn creep_state(creep: &Creep) -> CreepState {
    CreepState {
        name: creep.name(),
        pos: creep.pos(),
        spawning: creep.spawning(),
        ticks_to_live: creep.ticks_to_live(),
        energy: creep.store().get_used_capacity(Some(ResourceType::Energy)),
        energy_capacity: creep.store().get_capacity(Some(ResourceType::Energy)),
        body: creep.body().iter().map(|part| part.part()).collect(),
    }
}

/// The game engine as seen from inside the Screeps VM.
pub struct ScreepsHost {
    memory_arbiter: Mutex<MemoryArbiter>,
}

impl ScreepsHost {
    pub fn new() -> ScreepsHost {
        ScreepsHost {
            memory_arbiter: Mutex::new(MemoryArbiter::new()),
        }
    }

    fn with_arbiter<R>(&self, f: impl FnOnce(&mut MemoryArbiter) -> R) -> R {
        let mut arbiter = self.memory_arbiter.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        f(&mut arbiter)
    }
}

impl Default for ScreepsHost {
    fn default() -> ScreepsHost {
        ScreepsHost::new()
    }
}

impl GameHost for ScreepsHost {
    fn time(&self) -> u32 {
        game::time()
    }

    fn snapshot(&self) -> WorldState {
        let rooms = game::rooms().values().map(|room| (room.name(), room_state(&room))).collect();
        let creeps = game::creeps().values().map(|creep| (creep.name(), creep_state(&creep))).collect();

        WorldState {
            time: game::time(),
            rooms,
            creeps,
        }
    }

    fn features(&self) -> FeatureFlags {
        serde_wasm_bindgen::from_value(memory_helper::path_get("_features")).unwrap_or_default()
    }

    fn clear_one_shot_features(&self) {
        for path in ONE_SHOT_FLAG_PATHS {
            memory_helper::path_set(path, false);
        }
    }

    fn load_memory(&self) -> Result<Option<String>, StorageNotReady> {
        self.with_arbiter(|arbiter| {
            for segment in MEMORY_SEGMENTS {
                arbiter.request(*segment);
            }

            let ready = MEMORY_SEGMENTS.iter().all(|segment| arbiter.is_active(*segment));

            let data = if ready {
                let data: String = MEMORY_SEGMENTS.iter().filter_map(|segment| arbiter.get(*segment)).collect();

                Ok(Some(data))
            } else {
                Err(StorageNotReady)
            };

            arbiter.commit();

            data
        })
    }

    fn store_memory(&self, data: &str) {
        let chunks = split_segments(data, MEMORY_SEGMENT_SIZE);

        if chunks.len() > MEMORY_SEGMENTS.len() {
            error!(
                "Memory does not fit in segments - Required: {} - Available: {}",
                chunks.len(),
                MEMORY_SEGMENTS.len()
            );

            return;
        }

        self.with_arbiter(|arbiter| {
            for (index, segment) in MEMORY_SEGMENTS.iter().enumerate() {
                let chunk = chunks.get(index).copied().unwrap_or("");

                arbiter.set(*segment, chunk.to_string());
                arbiter.request(*segment);
            }

            arbiter.commit();
        });
    }

    fn spawn_creep(&self, spawn: &SpawnState, body: &[Part], name: &str) -> Result<(), ActionError> {
        let spawn = game::spawns().get(spawn.name.clone()).ok_or(ActionError::InvalidTarget)?;

        spawn.spawn_creep(body, name).map_err(error_code)
    }

    fn execute(&self, creep: &CreepState, action: &CreepAction) -> Result<(), ActionError> {
        let creep = game::creeps().get(creep.name.clone()).ok_or(ActionError::InvalidTarget)?;

        match action {
            CreepAction::MoveTo { pos, range } => {
                if creep.pos().get_range_to(*pos) <= *range {
                    return Ok(());
                }

                creep.move_to(*pos).map_err(error_code)
            }
            CreepAction::Flee { pos, .. } => {
                let away = pos.get_direction_to(creep.pos()).unwrap_or(Direction::Top);

                creep.move_direction(away).map_err(error_code)
            }
            CreepAction::Harvest { target, .. } => creep.harvest(&resolve::<Source>(target)?).map_err(error_code),
            CreepAction::Pickup { target, .. } => creep.pickup(&resolve::<screeps::Resource>(target)?).map_err(error_code),
            CreepAction::Transfer { target, .. } => {
                let structure = resolve_structure(target)?;
                let transferable = structure.as_transferable().ok_or(ActionError::InvalidTarget)?;

                creep.transfer(transferable, ResourceType::Energy, None).map_err(error_code)
            }
            CreepAction::Withdraw { target, .. } => {
                let structure = resolve_structure(target)?;
                let withdrawable = structure.as_withdrawable().ok_or(ActionError::InvalidTarget)?;

                creep.withdraw(withdrawable, ResourceType::Energy, None).map_err(error_code)
            }
            CreepAction::Build { target, .. } => creep.build(&resolve::<screeps::ConstructionSite>(target)?).map_err(error_code),
            CreepAction::Repair { target, .. } => {
                let structure = resolve_structure(target)?;
                let repairable = structure.as_repairable().ok_or(ActionError::InvalidTarget)?;

                creep.repair(repairable).map_err(error_code)
            }
            CreepAction::UpgradeController { target, .. } => {
                creep.upgrade_controller(&resolve::<StructureController>(target)?).map_err(error_code)
            }
            CreepAction::Recycle { spawn, .. } => resolve::<StructureSpawn>(spawn)?.recycle_creep(&creep).map_err(error_code),
        }
    }

    fn create_construction_site(&self, pos: Position, structure_type: StructureType) -> Result<(), ActionError> {
        pos.create_construction_site(structure_type, None).map_err(error_code)
    }

    fn path_cost(&self, from: Position, to: Position) -> Option<u32> {
        let result = pathfinder::search(from, to, 1, Some(SearchOptions::default()));

        if result.incomplete() {
            None
        } else {
            Some(result.cost())
        }
    }

    fn notify(&self, message: &str) {
        game::notify(message, None);
    }
}
