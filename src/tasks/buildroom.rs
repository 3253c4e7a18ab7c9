use super::data::*;
use super::tasksystem::*;
use super::utility::*;
use crate::constants::*;
use crate::creep::BodyTemplate;
use crate::creeppair::CreepPair;
use crate::error::TaskError;
use crate::memory::CreepMemory;
use crate::spawnsystem::*;
use crate::world::*;
use log::*;
use screeps::{Position, RoomName, StructureType};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const CLASS_NAME: &str = "BuildRoom";

const EXTENSION_MIN_RANGE: i32 = 2;
const EXTENSION_MAX_RANGE: i32 = 6;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildRoomMemory {
    pub last_run: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuildRoomTask {
    sub_id: String,
    room_name: RoomName,
    memory: BuildRoomMemory,
}

/// Builders wanted for the outstanding construction work.
pub fn desired_builders(backlog: u32) -> u32 {
    if backlog <= BUILD_RECYCLE_BACKLOG {
        return 0;
    }

    let needed = (backlog + BUILD_POINTS_PER_BUILDER - 1) / BUILD_POINTS_PER_BUILDER;

    needed.min(MAX_BUILDERS)
}

/// Checkerboard tiles in rings around `center`, nearest ring first.
fn extension_candidates(room: &RoomState, center: Position) -> Vec<Position> {
    let mut candidates = Vec::new();

    for range in EXTENSION_MIN_RANGE..=EXTENSION_MAX_RANGE {
        for dy in -range..=range {
            for dx in -range..=range {
                if dx.abs().max(dy.abs()) != range || (dx + dy) % 2 != 0 {
                    continue;
                }

                let pos = match offset_position(center, dx, dy) {
                    Some(pos) => pos,
                    None => continue,
                };

                let near_source = room.sources.iter().any(|source| source.pos.get_range_to(pos) <= 1);

                if !near_source && !room.is_occupied(pos) {
                    candidates.push(pos);
                }
            }
        }
    }

    candidates
}

impl BuildRoomTask {
    pub fn load(sub_id: &str, value: &serde_json::Value, _world: &WorldState) -> Result<TaskData, TaskError> {
        let room_name = RoomName::from_str(sub_id).map_err(|_| TaskError::MalformedId(task_id(CLASS_NAME, sub_id)))?;

        let memory = decode_task_memory(&task_id(CLASS_NAME, sub_id), value)?;

        Ok(TaskData::BuildRoom(BuildRoomTask {
            sub_id: sub_id.to_string(),
            room_name,
            memory,
        }))
    }

    fn staff_builders(&self, context: &mut TaskContext, room: &RoomState) {
        let backlog = room.construction_backlog();
        let desired = desired_builders(backlog);

        let work_pos = room
            .construction_sites
            .first()
            .map(|site| site.pos)
            .or_else(|| room.controller.as_ref().map(|controller| controller.pos));

        for index in 0..MAX_BUILDERS {
            let name = builder_creep_name(self.room_name, index);

            if index < desired {
                let work_pos = match work_pos {
                    Some(pos) => pos,
                    None => continue,
                };

                let creep_memory = CreepMemory::with_role("builder")
                    .task(&context.task_id)
                    .home_room(&self.sub_id);

                keep_creep_pair(context, self.room_name, &name, work_pos, |spawn_name, time| {
                    SpawnRequest::new(spawn_name, BodyTemplate::Builder, SpawnPriority::Builder, work_pos, time).memory(creep_memory)
                });
            } else {
                for creep in CreepPair::new(&name).live_creeps(context.world) {
                    if let Some(creep_memory) = context.memory.creep_mut(&creep.name) {
                        if !creep_memory.recycle {
                            info!("[Task] {} - Recycling {} - Backlog: {}", context.task_id, creep.name, backlog);

                            creep_memory.recycle = true;
                        }
                    }
                }
            }
        }
    }

    fn place_extensions(&self, context: &mut TaskContext, room: &RoomState) {
        if !context.features.construction.execute {
            return;
        }

        let allowed = EXTENSIONS_PER_LEVEL
            .get(room.controller_level() as usize)
            .copied()
            .unwrap_or(0);

        let existing = room.structures_of_type(StructureType::Extension).count()
            + room
                .construction_sites
                .iter()
                .filter(|site| site.structure_type == StructureType::Extension)
                .count();

        if existing as u32 >= allowed {
            return;
        }

        let ratio = room.stored_energy_ratio();

        if ratio < BUILD_ENERGY_RATIO {
            debug!("[Task] {} - Holding construction - Energy ratio: {:.2}", context.task_id, ratio);

            return;
        }

        let center = match room.spawns.first() {
            Some(spawn) => spawn.pos,
            None => return,
        };

        let mut remaining = allowed - existing as u32;

        let rejected = context
            .memory
            .rooms
            .get(&self.sub_id)
            .map(|room_memory| room_memory.rejected_extension_sites.clone())
            .unwrap_or_default();

        let candidates = extension_candidates(room, center)
            .into_iter()
            .filter(|pos| !rejected.contains(&pos.packed_repr()))
            .take(EXTENSION_SITE_ATTEMPTS);

        for pos in candidates {
            if remaining == 0 {
                break;
            }

            match context.host.create_construction_site(pos, StructureType::Extension) {
                Ok(()) => {
                    info!("[Task] {} - Placed extension site at {}", context.task_id, pos);

                    remaining -= 1;
                }
                Err(err) => {
                    context.memory.room_mut(&self.sub_id).rejected_extension_sites.push(pos.packed_repr());

                    debug!("[Task] {} - Extension site rejected at {}: {}", context.task_id, pos, err);
                }
            }
        }
    }
}

impl Task for BuildRoomTask {
    fn class_name(&self) -> &'static str {
        CLASS_NAME
    }

    fn sub_id(&self) -> &str {
        &self.sub_id
    }

    fn run(&mut self, context: &mut TaskContext) -> Result<(), TaskError> {
        let world = context.world;

        let room = match world.room(self.room_name) {
            Some(room) => room,
            None => return Ok(()),
        };

        if !room.is_owned() {
            context.remove_self();

            return Ok(());
        }

        if !is_due(self.memory.last_run, context.time, BUILD_ROOM_INTERVAL) {
            return Ok(());
        }

        self.memory.last_run = Some(context.time);

        context.store_memory(&self.memory)?;

        self.staff_builders(context, room);

        self.place_extensions(context, room);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ServerCache;
    use crate::features::FeatureFlags;
    use crate::host::mock::MockHost;
    use crate::memory::Memory;
    use screeps::Part;

    fn room_name() -> RoomName {
        "W1N1".parse().unwrap()
    }

    fn world(level: u8, energy: u32, capacity: u32) -> WorldState {
        let mut room = RoomState::new(room_name());

        room.energy_available = energy;
        room.energy_capacity_available = capacity;
        room.controller = Some(ControllerState {
            id: "ctrl".into(),
            pos: position(40, 40, room_name()).unwrap(),
            my: true,
            level,
            progress: 0,
            progress_total: 45000,
        });
        room.spawns.push(SpawnState {
            id: "spawn0".into(),
            name: "Spawn0".into(),
            pos: position(25, 25, room_name()).unwrap(),
            spawning: false,
            active: true,
            energy: energy.min(300),
            energy_capacity: 300,
        });

        let mut world = WorldState::default();

        world.rooms.insert(room_name(), room);

        world
    }

    fn site(id: &str, x: u8, remaining: u32) -> ConstructionSiteState {
        ConstructionSiteState {
            id: id.into(),
            structure_type: StructureType::Road,
            pos: position(x, 30, room_name()).unwrap(),
            progress: 0,
            progress_total: remaining,
        }
    }

    fn run_once(world: &WorldState, memory: &mut Memory, host: &MockHost) {
        let registry = TaskRegistry::with_default_tasks();
        let mut cache = ServerCache::new();

        let mut task = registry.load("BuildRoom.W1N1", memory, world).unwrap();

        let mut context = TaskContext {
            time: world.time,
            world,
            memory,
            cache: &mut cache,
            host,
            features: &FeatureFlags::default(),
            registry: &registry,
            task_id: "BuildRoom.W1N1".to_string(),
        };

        task.as_task().run(&mut context).unwrap();
    }

    #[test]
    fn builder_count_scales_with_backlog() {
        assert_eq!(desired_builders(0), 0);
        assert_eq!(desired_builders(1), 1);
        assert_eq!(desired_builders(BUILD_POINTS_PER_BUILDER), 1);
        assert_eq!(desired_builders(BUILD_POINTS_PER_BUILDER + 1), 2);
        assert_eq!(desired_builders(1_000_000), MAX_BUILDERS);
    }

    #[test]
    fn backlog_queues_builders() {
        let mut world = world(1, 300, 300);

        if let Some(room) = world.room_mut(room_name()) {
            room.construction_sites.push(site("a", 10, 5000));
            room.construction_sites.push(site("b", 12, 3000));
        }

        let host = MockHost::new(world.clone());
        let mut memory = Memory::new();

        memory.tasks.insert("BuildRoom.W1N1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory, &host);

        let mut queued: Vec<_> = memory.spawn_queue.iter().map(|entry| entry.name.clone()).collect();
        queued.sort();

        assert_eq!(queued, vec!["build-W1N1-0".to_string(), "build-W1N1-1".to_string()]);
    }

    #[test]
    fn empty_backlog_recycles_builders() {
        let mut world = world(1, 300, 300);

        world.creeps.insert(
            "build-W1N1-0".into(),
            CreepState {
                name: "build-W1N1-0".into(),
                pos: position(30, 30, room_name()).unwrap(),
                spawning: false,
                ticks_to_live: Some(900),
                energy: 0,
                energy_capacity: 50,
                body: vec![Part::Work, Part::Carry, Part::Move, Part::Move],
            },
        );

        let host = MockHost::new(world.clone());
        let mut memory = Memory::new();

        memory.creeps.insert("build-W1N1-0".into(), CreepMemory::with_role("builder"));
        memory.tasks.insert("BuildRoom.W1N1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory, &host);

        assert!(memory.creeps["build-W1N1-0"].recycle);
        assert!(memory.spawn_queue.is_empty());
    }

    #[test]
    fn extensions_wait_for_spare_energy() {
        let world = world(2, 100, 300);
        let host = MockHost::new(world.clone());
        let mut memory = Memory::new();

        memory.tasks.insert("BuildRoom.W1N1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory, &host);

        assert!(host.state().sites.is_empty());
    }

    #[test]
    fn extensions_placed_on_checkerboard() {
        let world = world(2, 300, 300);
        let host = MockHost::new(world.clone());
        let mut memory = Memory::new();

        memory.tasks.insert("BuildRoom.W1N1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory, &host);

        let sites = host.state().sites.clone();
        let center = position(25, 25, room_name()).unwrap();

        assert_eq!(sites.len(), EXTENSION_SITE_ATTEMPTS);

        for (pos, structure_type) in sites {
            assert_eq!(structure_type, StructureType::Extension);
            assert_eq!(center.get_range_to(pos), 2);
            assert_eq!((pos.x().u8() + pos.y().u8()) % 2, 0);
        }
    }

    #[test]
    fn rejected_extension_tile_is_not_retried() {
        let mut world = world(2, 300, 300);
        let blocked = position(23, 23, room_name()).unwrap();
        let host = MockHost::new(world.clone());

        //
        // The server knows about a wall the snapshot does not.
        //
        host.state().world.room_mut(room_name()).unwrap().structures.push(StructureState {
            id: "wall".into(),
            structure_type: StructureType::Wall,
            pos: blocked,
            hits: 1,
            hits_max: 1,
            energy: 0,
            energy_capacity: 0,
        });

        let mut memory = Memory::new();

        memory.tasks.insert("BuildRoom.W1N1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory, &host);

        assert_eq!(memory.rooms["W1N1"].rejected_extension_sites, vec![blocked.packed_repr()]);
        assert_eq!(host.state().sites.len(), EXTENSION_SITE_ATTEMPTS - 1);

        world.time = BUILD_ROOM_INTERVAL;

        let retry_host = MockHost::new(world.clone());

        run_once(&world, &mut memory, &retry_host);

        let sites = retry_host.state().sites.clone();

        assert_eq!(sites.len(), EXTENSION_SITE_ATTEMPTS);
        assert!(sites.iter().all(|(pos, _)| *pos != blocked));
    }
}
