use super::*;
use crate::constants::*;
use crate::creep::{body_cost, carry_capacity};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Clone, Debug, PartialEq)]
pub struct SpawnRecord {
    pub time: u32,
    pub spawn: String,
    pub name: String,
    pub body: Vec<Part>,
}

#[derive(Default)]
pub struct MockState {
    pub time: u32,
    pub world: WorldState,
    pub features: FeatureFlags,
    pub memory: Option<String>,
    pub memory_ready: bool,
    pub spawns: Vec<SpawnRecord>,
    pub actions: Vec<(u32, String, CreepAction)>,
    pub sites: Vec<(Position, StructureType)>,
    pub notifications: Vec<String>,
    /// Forced results for the next command issued by a creep.
    pub action_results: HashMap<String, ActionError>,
}

/// In-process host that records every command. Clones share state so a test can keep a handle while the
/// environment owns another.
#[derive(Clone, Default)]
pub struct MockHost {
    state: Arc<Mutex<MockState>>,
}

impl MockHost {
    pub fn new(world: WorldState) -> MockHost {
        let state = MockState {
            time: world.time,
            world,
            memory_ready: true,
            ..Default::default()
        };

        MockHost {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn handle(&self) -> HostHandle {
        HostHandle::new(Arc::new(self.clone()))
    }

    /// Moves the clock forward, finishing any spawn whose duration has elapsed.
    pub fn advance(&self, ticks: u32) {
        let mut state = self.state();

        for _ in 0..ticks {
            state.time += 1;

            let time = state.time;
            state.world.time = time;

            let finished: Vec<SpawnRecord> = state
                .spawns
                .iter()
                .filter(|record| record.time + record.body.len() as u32 * CREEP_SPAWN_TIME == time)
                .cloned()
                .collect();

            for record in finished {
                if let Some(creep) = state.world.creeps.get_mut(&record.name) {
                    creep.spawning = false;
                    creep.ticks_to_live = Some(CREEP_LIFE_TIME);
                }

                for room in state.world.rooms.values_mut() {
                    for spawn in room.spawns.iter_mut().filter(|s| s.id == record.spawn) {
                        spawn.spawning = false;
                    }
                }
            }

            for creep in state.world.creeps.values_mut().filter(|c| !c.spawning) {
                if let Some(ttl) = creep.ticks_to_live.as_mut() {
                    *ttl = ttl.saturating_sub(1);
                }
            }

            state.world.creeps.retain(|_, creep| creep.ticks_to_live != Some(0));
        }
    }

    pub fn spawned_names(&self) -> Vec<String> {
        self.state().spawns.iter().map(|record| record.name.clone()).collect()
    }
}

impl GameHost for MockHost {
    fn time(&self) -> u32 {
        self.state().time
    }

    fn snapshot(&self) -> WorldState {
        self.state().world.clone()
    }

    fn features(&self) -> FeatureFlags {
        self.state().features.clone()
    }

    fn clear_one_shot_features(&self) {
        let mut state = self.state();

        state.features.reset.environment = false;
        state.features.reset.memory = false;
        state.features.spawn_queue.clear = false;
    }

    fn load_memory(&self) -> Result<Option<String>, StorageNotReady> {
        let state = self.state();

        if state.memory_ready {
            Ok(state.memory.clone())
        } else {
            Err(StorageNotReady)
        }
    }

    fn store_memory(&self, data: &str) {
        self.state().memory = Some(data.to_string());
    }

    fn spawn_creep(&self, spawn: &SpawnState, body: &[Part], name: &str) -> Result<(), ActionError> {
        let mut state = self.state();

        if state.world.creeps.contains_key(name) {
            return Err(ActionError::NameExists);
        }

        let cost = body_cost(body);
        let pos = spawn.pos;
        let time = state.time;

        let room = state.world.room_mut(pos.room_name()).ok_or(ActionError::InvalidTarget)?;

        let spawn_state = room
            .spawns
            .iter_mut()
            .find(|s| s.id == spawn.id)
            .ok_or(ActionError::InvalidTarget)?;

        if spawn_state.spawning {
            return Err(ActionError::Busy);
        }

        if room.energy_available < cost {
            return Err(ActionError::NotEnoughResources);
        }

        spawn_state.spawning = true;
        room.energy_available -= cost;

        let energy_capacity = carry_capacity(body);

        state.world.creeps.insert(
            name.to_string(),
            CreepState {
                name: name.to_string(),
                pos,
                spawning: true,
                ticks_to_live: None,
                energy: 0,
                energy_capacity,
                body: body.to_vec(),
            },
        );

        state.spawns.push(SpawnRecord {
            time,
            spawn: spawn.id.clone(),
            name: name.to_string(),
            body: body.to_vec(),
        });

        Ok(())
    }

    fn execute(&self, creep: &CreepState, action: &CreepAction) -> Result<(), ActionError> {
        let mut state = self.state();

        let time = state.time;

        state.actions.push((time, creep.name.clone(), action.clone()));

        match state.action_results.remove(&creep.name) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn create_construction_site(&self, pos: Position, structure_type: StructureType) -> Result<(), ActionError> {
        let mut state = self.state();

        let site_count = state.sites.len();

        let room = state.world.room_mut(pos.room_name()).ok_or(ActionError::InvalidTarget)?;

        if room.is_occupied(pos) {
            return Err(ActionError::InvalidTarget);
        }

        room.construction_sites.push(ConstructionSiteState {
            id: format!("site{}", site_count),
            structure_type,
            pos,
            progress: 0,
            progress_total: if structure_type == StructureType::Container { 5000 } else { 3000 },
        });

        state.sites.push((pos, structure_type));

        Ok(())
    }

    fn path_cost(&self, from: Position, to: Position) -> Option<u32> {
        Some(from.get_range_to(to))
    }

    fn notify(&self, message: &str) {
        self.state().notifications.push(message.to_string());
    }
}
