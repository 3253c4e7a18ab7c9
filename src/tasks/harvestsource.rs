use super::data::*;
use super::tasksystem::*;
use super::utility::*;
use crate::constants::*;
use crate::creep::BodyTemplate;
use crate::error::TaskError;
use crate::memory::CreepMemory;
use crate::spawnsystem::*;
use crate::world::*;
use log::*;
use serde::{Deserialize, Serialize};

pub const CLASS_NAME: &str = "HarvestSource";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestSourceMemory {
    pub last_run: Option<u32>,
}

/// Static mining: a harvester parked on the source container and a hauler moving its output to the room's
/// energy sinks.
#[derive(Clone, Debug, PartialEq)]
pub struct HarvestSourceTask {
    source_id: String,
    memory: HarvestSourceMemory,
}

impl HarvestSourceTask {
    pub fn load(sub_id: &str, value: &serde_json::Value, _world: &WorldState) -> Result<TaskData, TaskError> {
        let memory = decode_task_memory(&task_id(CLASS_NAME, sub_id), value)?;

        Ok(TaskData::HarvestSource(HarvestSourceTask {
            source_id: sub_id.to_string(),
            memory,
        }))
    }
}

impl Task for HarvestSourceTask {
    fn class_name(&self) -> &'static str {
        CLASS_NAME
    }

    fn sub_id(&self) -> &str {
        &self.source_id
    }

    fn run(&mut self, context: &mut TaskContext) -> Result<(), TaskError> {
        let world = context.world;

        let (room, source) = match world.find_source(&self.source_id) {
            Some(found) => found,
            None => return Ok(()),
        };

        if !room.is_owned() {
            info!("[Task] {} - Source room {} is no longer owned", context.task_id, room.name);

            context.remove_self();

            return Ok(());
        }

        if !is_due(self.memory.last_run, context.time, HARVEST_SOURCE_INTERVAL) {
            return Ok(());
        }

        self.memory.last_run = Some(context.time);

        context.store_memory(&self.memory)?;

        //
        // NOTE: Without its container the source falls back to boot mining, which the room task restores.
        //
        let container = match room.container_near(source.pos, 1) {
            Some(container) => container,
            None => {
                warn!("[Task] {} - Container for source {} is gone", context.task_id, source.id);

                context.remove_self();

                return Ok(());
            }
        };

        let room_key = room.name.to_string();
        let container_pos = container.pos;

        let harvester_memory = CreepMemory::with_role("harvester")
            .task(&context.task_id)
            .home_room(&room_key)
            .source(&source.id)
            .container(Some(container.id.as_str()));

        keep_creep_pair(context, room.name, &harvester_creep_name(&source.id), container_pos, |name, time| {
            SpawnRequest::new(name, BodyTemplate::Harvester, SpawnPriority::Harvester, container_pos, time).memory(harvester_memory)
        });

        let hauler_memory = CreepMemory::with_role("hauler")
            .task(&context.task_id)
            .home_room(&room_key)
            .source(&source.id)
            .container(Some(container.id.as_str()));

        keep_creep_pair(context, room.name, &hauler_creep_name(&source.id), container_pos, |name, time| {
            SpawnRequest::new(name, BodyTemplate::Hauler, SpawnPriority::Hauler, container_pos, time).memory(hauler_memory)
        });

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
    use screeps::{Part, RoomName, StructureType};

    fn room_name() -> RoomName {
        "W1N1".parse().unwrap()
    }

    fn world(container: bool) -> WorldState {
        let mut room = RoomState::new(room_name());

        room.energy_available = 550;
        room.energy_capacity_available = 550;
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

        let mut task = registry.load("HarvestSource.src1", memory, world).unwrap();

        let mut context = TaskContext {
            time: world.time,
            world,
            memory,
            cache: &mut cache,
            host: &host,
            features: &FeatureFlags::default(),
            registry: &registry,
            task_id: "HarvestSource.src1".to_string(),
        };

        task.as_task().run(&mut context).unwrap();
    }

    #[test]
    fn queues_harvester_and_hauler_at_container() {
        let world = world(true);
        let mut memory = Memory::new();

        memory.tasks.insert("HarvestSource.src1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory);

        let queued: Vec<_> = memory.spawn_queue.iter().map(|entry| entry.name.clone()).collect();

        assert_eq!(queued.len(), 2);
        assert!(queued.contains(&"harvest-src1".to_string()));
        assert!(queued.contains(&"haul-src1".to_string()));

        let harvester = memory.spawn_queue.iter().find(|entry| entry.name == "harvest-src1").unwrap();

        assert_eq!(harvester.body.iter().filter(|part| **part == Part::Work).count(), 5);
        assert_eq!(harvester.memory.container.as_deref(), Some("cont1"));
        assert_eq!(harvester.pos(), position(21, 21, room_name()).unwrap());
    }

    #[test]
    fn lost_container_removes_task() {
        let world = world(false);
        let mut memory = Memory::new();

        memory.tasks.insert("HarvestSource.src1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory);

        assert!(memory.tasks.is_empty());
        assert!(memory.spawn_queue.is_empty());
    }

    #[test]
    fn rejected_harvester_still_requests_hauler() {
        let mut world = world(true);

        //
        // Enough for a hauler body but not for a harvester.
        //
        world.rooms.get_mut(&room_name()).unwrap().energy_capacity_available = 120;

        let mut memory = Memory::new();

        memory.tasks.insert("HarvestSource.src1".into(), serde_json::Value::Null);

        run_once(&world, &mut memory);

        let queued: Vec<_> = memory.spawn_queue.iter().map(|entry| entry.name.clone()).collect();

        assert_eq!(queued, vec!["haul-src1".to_string()]);

        let stored: HarvestSourceMemory = serde_json::from_value(memory.tasks["HarvestSource.src1"].clone()).unwrap();

        assert_eq!(stored.last_run, Some(0));
    }
}
