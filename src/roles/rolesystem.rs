use super::actions::*;
use super::data::*;
use crate::error::{ActionError, RoleError};
use crate::findnearest::*;
use crate::host::*;
use crate::memory::{CreepMemory, Memory};
use crate::world::*;
use itertools::Itertools;
use log::*;
use screeps::RoomName;
use specs::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Live creeps per home room and role tag.
#[derive(Default)]
pub struct RoleCensus {
    counts: HashMap<(String, String), u32>,
}

impl RoleCensus {
    pub fn new(world: &WorldState, creeps: &BTreeMap<String, CreepMemory>) -> RoleCensus {
        let mut counts = HashMap::new();

        for (name, creep_memory) in creeps.iter() {
            if !world.creeps.contains_key(name) {
                continue;
            }

            if let (Some(home_room), Some(role)) = (&creep_memory.home_room, &creep_memory.role) {
                *counts.entry((home_room.clone(), role.clone())).or_insert(0) += 1;
            }
        }

        RoleCensus { counts }
    }

    pub fn count(&self, home_room: &str, role: &str) -> u32 {
        self.counts
            .get(&(home_room.to_string(), role.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn has_role(&self, home_room: &str, role: &str) -> bool {
        self.count(home_room, role) > 0
    }
}

pub struct RoleContext<'a> {
    pub time: u32,
    pub world: &'a WorldState,
    pub creep: &'a CreepState,
    pub memory: &'a mut CreepMemory,
    pub census: &'a RoleCensus,
    pub recorder: &'a mut ActionRecorder,
}

impl<'a> RoleContext<'a> {
    /// The room the creep is standing in.
    pub fn room(&self) -> Option<&'a RoomState> {
        self.world.room(self.creep.pos.room_name())
    }

    pub fn home_room(&self) -> Option<&'a RoomState> {
        let world = self.world;

        self.memory
            .home_room
            .as_ref()
            .and_then(|name| name.parse().ok())
            .and_then(|name| world.room(name))
            .or_else(|| self.room())
    }

    pub fn source(&self) -> Option<&'a SourceState> {
        let world = self.world;

        self.memory
            .source
            .as_ref()
            .and_then(|id| world.find_source(id))
            .map(|(_, source)| source)
    }

    pub fn container(&self) -> Option<&'a StructureState> {
        let id = self.memory.container.as_ref()?;

        self.world.rooms.values().find_map(|room| room.structure(id))
    }

    pub fn record(&mut self, action: CreepAction) -> bool {
        self.recorder.record(action)
    }
}

pub trait Role {
    fn name(&self) -> &'static str;

    fn run(&self, context: &mut RoleContext);
}

pub type RoleConstructor = fn() -> RoleData;

pub struct RoleRegistry {
    roles: BTreeMap<&'static str, RoleConstructor>,
}

impl RoleRegistry {
    pub fn new() -> RoleRegistry {
        RoleRegistry { roles: BTreeMap::new() }
    }

    pub fn with_default_roles() -> RoleRegistry {
        let mut registry = RoleRegistry::new();

        registry.register("boot", || RoleData::Boot(super::boot::BootRole));
        registry.register("harvester", || RoleData::Harvester(super::harvester::HarvesterRole));
        registry.register("hauler", || RoleData::Hauler(super::hauler::HaulerRole));
        registry.register("builder", || RoleData::Builder(super::worker::WorkerRole::new(super::worker::BuildPolicy)));
        registry.register("upgrader", || RoleData::Upgrader(super::worker::WorkerRole::new(super::worker::UpgradePolicy)));

        registry
    }

    pub fn register(&mut self, name: &'static str, constructor: RoleConstructor) {
        self.roles.insert(name, constructor);
    }

    pub fn get(&self, name: &str) -> Result<RoleData, RoleError> {
        self.roles
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| RoleError::UnknownRole(name.to_string()))
    }

    /// Decides and executes actions for every live, non-spawning creep with a role tag, in name order.
    pub fn run_all(&self, world: &WorldState, memory: &mut Memory, host: &dyn GameHost) {
        let census = RoleCensus::new(world, &memory.creeps);

        for name in world.creeps.keys().sorted() {
            let creep = match world.creep(name) {
                Some(creep) if !creep.spawning => creep,
                _ => continue,
            };

            let creep_memory = match memory.creeps.get_mut(name) {
                Some(creep_memory) => creep_memory,
                None => continue,
            };

            let role_name = match creep_memory.role.clone() {
                Some(role_name) => role_name,
                None => continue,
            };

            let mut recorder = ActionRecorder::new();

            if creep_memory.recycle {
                if let Some(action) = recycle_action(world, creep, creep_memory) {
                    recorder.record(action);
                }
            } else {
                let role = match self.get(&role_name) {
                    Ok(role) => role,
                    Err(err) => {
                        error!("[Role] {} - {}", name, err);
                        continue;
                    }
                };

                let mut context = RoleContext {
                    time: world.time,
                    world,
                    creep,
                    memory: &mut *creep_memory,
                    census: &census,
                    recorder: &mut recorder,
                };

                role.as_role().run(&mut context);
            }

            execute_actions(host, creep, creep_memory, recorder);
        }
    }
}

impl Default for RoleRegistry {
    fn default() -> RoleRegistry {
        RoleRegistry::with_default_roles()
    }
}

fn recycle_action(world: &WorldState, creep: &CreepState, creep_memory: &CreepMemory) -> Option<CreepAction> {
    let home_room: Option<RoomName> = creep_memory.home_room.as_ref().and_then(|name| name.parse().ok());

    let spawn = world
        .spawns()
        .filter(|(room, _)| home_room.map(|home_room| home_room == room.name).unwrap_or(true))
        .map(|(_, spawn)| spawn)
        .find_nearest_linear(creep.pos)?;

    Some(CreepAction::Recycle {
        spawn: spawn.id.clone(),
        pos: spawn.pos,
    })
}

/// Issues recorded actions. Out of range targets are approached, transient results are ignored and
/// anything else is logged with the creep's context.
pub fn execute_actions(host: &dyn GameHost, creep: &CreepState, creep_memory: &mut CreepMemory, recorder: ActionRecorder) {
    let mut moved = recorder.has_move();

    for action in recorder.into_actions() {
        match host.execute(creep, &action) {
            Ok(()) => {
                creep_memory.last_action = Some(action.describe());
            }
            Err(ActionError::NotInRange) => {
                if moved {
                    continue;
                }

                if let Some((pos, range)) = action.required_range() {
                    let approach = CreepAction::MoveTo { pos, range };

                    match host.execute(creep, &approach) {
                        Ok(()) | Err(ActionError::Tired) => {
                            creep_memory.last_action = Some(approach.describe());
                        }
                        Err(err) => {
                            warn!("[Role] {} ({}) - Failed to approach for {}: {}", creep.name, creep_memory.task.as_deref().unwrap_or("-"), action.describe(), err);
                        }
                    }

                    moved = true;
                }
            }
            Err(ActionError::Tired) | Err(ActionError::Busy) => {}
            Err(err) => {
                error!(
                    "[Role] {} ({}) - {} failed: {}",
                    creep.name,
                    creep_memory.task.as_deref().unwrap_or("-"),
                    action.describe(),
                    err
                );
            }
        }
    }
}

#[derive(SystemData)]
pub struct RoleSystemData<'a> {
    world: ReadExpect<'a, WorldState>,
    memory: WriteExpect<'a, Memory>,
    host: ReadExpect<'a, HostHandle>,
    registry: ReadExpect<'a, RoleRegistry>,
}

pub struct RunRoleSystem;

impl<'a> System<'a> for RunRoleSystem {
    type SystemData = RoleSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        data.registry.run_all(&data.world, &mut data.memory, data.host.as_host());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;
    use screeps::{Part, Position};

    fn room_name() -> RoomName {
        "W1N1".parse().unwrap()
    }

    fn pos(x: u8, y: u8) -> Position {
        position(x, y, room_name()).unwrap()
    }

    fn world() -> WorldState {
        let mut room = RoomState::new(room_name());

        room.controller = Some(ControllerState {
            id: "ctrl".into(),
            pos: pos(40, 40),
            my: true,
            level: 1,
            progress: 0,
            progress_total: 200,
        });
        room.sources.push(SourceState {
            id: "src1".into(),
            pos: pos(20, 20),
            energy: 3000,
            energy_capacity: 3000,
            open_positions: vec![pos(21, 21)],
        });
        room.spawns.push(SpawnState {
            id: "spawn0".into(),
            name: "Spawn0".into(),
            pos: pos(25, 25),
            spawning: false,
            active: true,
            energy: 100,
            energy_capacity: 300,
        });

        let mut world = WorldState::default();

        world.rooms.insert(room_name(), room);

        world
    }

    fn creep(name: &str, at: Position, energy: u32, spawning: bool) -> CreepState {
        CreepState {
            name: name.into(),
            pos: at,
            spawning,
            ticks_to_live: if spawning { None } else { Some(1000) },
            energy,
            energy_capacity: 50,
            body: vec![Part::Work, Part::Carry, Part::Move, Part::Move],
        }
    }

    fn boot_memory() -> CreepMemory {
        CreepMemory::with_role("boot").task("BootSource.src1").home_room("W1N1").source("src1")
    }

    #[test]
    fn spawning_and_untagged_creeps_are_skipped() {
        let mut world = world();

        world.creeps.insert("a".into(), creep("a", pos(21, 21), 0, true));
        world.creeps.insert("b".into(), creep("b", pos(21, 21), 0, false));

        let host = MockHost::new(world.clone());
        let mut memory = Memory::new();

        memory.creeps.insert("a".into(), boot_memory());

        RoleRegistry::with_default_roles().run_all(&world, &mut memory, &host);

        assert!(host.state().actions.is_empty());
    }

    #[test]
    fn unknown_role_is_contained() {
        let mut world = world();

        world.creeps.insert("a".into(), creep("a", pos(21, 21), 0, false));
        world.creeps.insert("b".into(), creep("b", pos(21, 21), 0, false));

        let host = MockHost::new(world.clone());
        let mut memory = Memory::new();

        memory.creeps.insert("a".into(), CreepMemory::with_role("wizard"));
        memory.creeps.insert("b".into(), boot_memory());

        RoleRegistry::with_default_roles().run_all(&world, &mut memory, &host);

        let actions = host.state().actions.clone();

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].1, "b");
    }

    #[test]
    fn out_of_range_action_approaches_target() {
        let mut world = world();

        world.creeps.insert("a".into(), creep("a", pos(30, 30), 0, false));

        let host = MockHost::new(world.clone());

        host.state().action_results.insert("a".into(), ActionError::NotInRange);

        let mut memory = Memory::new();

        memory.creeps.insert("a".into(), boot_memory());

        RoleRegistry::with_default_roles().run_all(&world, &mut memory, &host);

        let actions: Vec<CreepAction> = host.state().actions.iter().map(|(_, _, action)| action.clone()).collect();

        assert_eq!(
            actions,
            vec![
                CreepAction::Harvest { target: "src1".into(), pos: pos(20, 20) },
                CreepAction::MoveTo { pos: pos(20, 20), range: 1 },
            ]
        );
        assert_eq!(memory.creeps["a"].last_action, Some(format!("move {}", pos(20, 20))));
    }

    #[test]
    fn recycle_flag_overrides_role() {
        let mut world = world();

        world.creeps.insert("a".into(), creep("a", pos(30, 30), 0, false));

        let host = MockHost::new(world.clone());
        let mut memory = Memory::new();
        let mut creep_memory = boot_memory();

        creep_memory.recycle = true;
        memory.creeps.insert("a".into(), creep_memory);

        RoleRegistry::with_default_roles().run_all(&world, &mut memory, &host);

        let actions = host.state().actions.clone();

        assert_eq!(
            actions[0].2,
            CreepAction::Recycle {
                spawn: "spawn0".into(),
                pos: pos(25, 25)
            }
        );
    }

    #[test]
    fn census_counts_only_live_creeps() {
        let mut world = world();

        world.creeps.insert("h".into(), creep("h", pos(21, 21), 0, false));

        let mut creeps = BTreeMap::new();

        creeps.insert("h".to_string(), CreepMemory::with_role("hauler").home_room("W1N1"));
        creeps.insert("dead".to_string(), CreepMemory::with_role("builder").home_room("W1N1"));

        let census = RoleCensus::new(&world, &creeps);

        assert!(census.has_role("W1N1", "hauler"));
        assert!(!census.has_role("W1N1", "builder"));
    }
}
