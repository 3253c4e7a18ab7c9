use super::data::*;
use super::tasksystem::*;
use super::utility::*;
use crate::constants::*;
use crate::creeppair::CreepPair;
use crate::error::TaskError;
use crate::events::*;
use crate::world::*;
use log::*;
use screeps::RoomName;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const CLASS_NAME: &str = "BootRoom";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootRoomMemory {
    pub last_run: Option<u32>,
}

/// Owns the bring-up of one room: a mining task per source, then upgrading and building once every source
/// is staffed.
#[derive(Clone, Debug, PartialEq)]
pub struct BootRoomTask {
    sub_id: String,
    room_name: RoomName,
    memory: BootRoomMemory,
}

impl BootRoomTask {
    pub fn load(sub_id: &str, value: &serde_json::Value, _world: &WorldState) -> Result<TaskData, TaskError> {
        let room_name = RoomName::from_str(sub_id).map_err(|_| TaskError::MalformedId(task_id(CLASS_NAME, sub_id)))?;

        let memory = decode_task_memory(&task_id(CLASS_NAME, sub_id), value)?;

        Ok(TaskData::BootRoom(BootRoomTask {
            sub_id: sub_id.to_string(),
            room_name,
            memory,
        }))
    }

    fn source_is_staffed(world: &WorldState, source: &SourceState) -> bool {
        [boot_creep_name(&source.id), harvester_creep_name(&source.id)]
            .iter()
            .any(|name| CreepPair::new(name).has_live_creep(world))
    }

    fn ensure_source_tasks(context: &mut TaskContext, room: &RoomState, source: &SourceState) -> Result<(), TaskError> {
        let static_mining = room.container_near(source.pos, 1).is_some() && room.energy_capacity_available >= HARVEST_SOURCE_MIN_CAPACITY;

        if static_mining {
            context.ensure_task(super::harvestsource::CLASS_NAME, &source.id)?;

            if context.remove_task(super::bootsource::CLASS_NAME, &source.id) {
                info!("[Task] {} - Source {} moved to static harvesting", context.task_id, source.id);
            }
        } else if !context.task_exists(super::harvestsource::CLASS_NAME, &source.id) {
            context.ensure_task(super::bootsource::CLASS_NAME, &source.id)?;
        }

        Ok(())
    }
}

impl Task for BootRoomTask {
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
            info!("[Task] {} - Room is no longer owned", context.task_id);

            context.remove_self();

            return Ok(());
        }

        if !is_due(self.memory.last_run, context.time, BOOT_ROOM_INTERVAL) {
            return Ok(());
        }

        self.memory.last_run = Some(context.time);

        context.store_memory(&self.memory)?;

        for source in room.sources.iter() {
            Self::ensure_source_tasks(context, room, source)?;
        }

        //
        // NOTE: Upgrading and building compete with mining for spawn time, so they wait for every source.
        //
        if room.sources.iter().all(|source| Self::source_is_staffed(world, source)) {
            let room_key = self.room_name.to_string();

            context.ensure_task(super::upgradecontroller::CLASS_NAME, &room_key)?;
            context.ensure_task(super::buildroom::CLASS_NAME, &room_key)?;
        }

        Ok(())
    }
}

/// Newly owned rooms are recorded and handed a BootRoom task.
pub fn register_boot_room_hooks(bus: &mut EventBus) {
    bus.subscribe(EventKind::RoomDiscovered, "boot_room_discovery", |event, context| {
        let room_name = match event {
            LifecycleEvent::RoomDiscovered(room_name) => *room_name,
            _ => return,
        };

        let room_key = room_name.to_string();

        context.memory.room_mut(&room_key).discovered_at = Some(context.time);

        match context
            .tasks
            .create(context.memory, context.world, CLASS_NAME, &room_key, serde_json::Value::Null)
        {
            Ok(_) => info!("[Task] Discovered room {} - Created {}", room_name, task_id(CLASS_NAME, &room_key)),
            Err(TaskError::NameExists(_)) => {}
            Err(err) => error!("[Task] Failed to boot discovered room {}: {}", room_name, err),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ServerCache;
    use crate::features::FeatureFlags;
    use crate::host::mock::MockHost;
    use crate::memory::Memory;
    use screeps::{Part, StructureType};

    fn room_name() -> RoomName {
        "W1N1".parse().unwrap()
    }

    fn world(capacity: u32, container: bool) -> WorldState {
        let mut room = RoomState::new(room_name());

        room.energy_available = capacity;
        room.energy_capacity_available = capacity;
        room.controller = Some(ControllerState {
            id: "ctrl".into(),
            pos: position(40, 40, room_name()).unwrap(),
            my: true,
            level: 2,
            progress: 0,
            progress_total: 45000,
        });
        room.sources.push(SourceState {
            id: "src1".into(),
            pos: position(20, 20, room_name()).unwrap(),
            energy: 3000,
            energy_capacity: 3000,
            open_positions: vec![position(21, 21, room_name()).unwrap()],
        });
        room.spawns.push(SpawnState {
            id: "spawn0".into(),
            name: "Spawn0".into(),
            pos: position(25, 25, room_name()).unwrap(),
            spawning: false,
            active: true,
            energy: 300,
            energy_capacity: 300,
        });

        if container {
            room.structures.push(StructureState {
                id: "cont1".into(),
                structure_type: StructureType::Container,
                pos: position(21, 21, room_name()).unwrap(),
                hits: 250000,
                hits_max: 250000,
                energy: 0,
                energy_capacity: CONTAINER_CAPACITY,
            });
        }

        let mut world = WorldState::default();

        world.rooms.insert(room_name(), room);

        world
    }

    fn run_once(world: &WorldState, memory: &mut Memory) {
        let registry = TaskRegistry::with_default_tasks();
        let host = MockHost::new(world.clone());
        let mut cache = ServerCache::new();

        let mut task = registry.load("BootRoom.W1N1", memory, world).unwrap();

        let mut context = TaskContext {
            time: world.time,
            world,
            memory,
            cache: &mut cache,
            host: &host,
            features: &FeatureFlags::default(),
            registry: &registry,
            task_id: "BootRoom.W1N1".to_string(),
        };

        task.as_task().run(&mut context).unwrap();
    }

    #[test]
    fn new_source_gets_boot_task() {
        let world = world(300, false);
        let mut memory = Memory::new();

        memory.tasks.insert("BootRoom.W1N1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory);

        assert!(memory.tasks.contains_key("BootSource.src1"));
        assert!(!memory.tasks.contains_key("HarvestSource.src1"));
        assert!(!memory.tasks.contains_key("UpgradeController.W1N1"));
    }

    #[test]
    fn container_and_capacity_switch_to_static_mining() {
        let world = world(HARVEST_SOURCE_MIN_CAPACITY, true);
        let mut memory = Memory::new();

        memory.tasks.insert("BootRoom.W1N1".into(), serde_json::Value::Null);
        memory.tasks.insert("BootSource.src1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory);

        assert!(memory.tasks.contains_key("HarvestSource.src1"));
        assert!(!memory.tasks.contains_key("BootSource.src1"));
    }

    #[test]
    fn staffed_room_starts_upgrading_and_building() {
        let mut world = world(300, false);

        world.creeps.insert(
            "boot-src1".into(),
            CreepState {
                name: "boot-src1".into(),
                pos: position(21, 21, room_name()).unwrap(),
                spawning: false,
                ticks_to_live: Some(1000),
                energy: 0,
                energy_capacity: 50,
                body: vec![Part::Work, Part::Carry, Part::Move, Part::Move],
            },
        );

        let mut memory = Memory::new();

        memory.tasks.insert("BootRoom.W1N1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory);

        assert!(memory.tasks.contains_key("UpgradeController.W1N1"));
        assert!(memory.tasks.contains_key("BuildRoom.W1N1"));
    }

    #[test]
    fn unowned_room_removes_task() {
        let mut world = world(300, false);

        if let Some(controller) = world.room_mut(room_name()).and_then(|room| room.controller.as_mut()) {
            controller.my = false;
        }

        let mut memory = Memory::new();

        memory.tasks.insert("BootRoom.W1N1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory);

        assert!(memory.tasks.is_empty());
    }
}
