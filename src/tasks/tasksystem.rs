use super::data::*;
use crate::cache::ServerCache;
use crate::error::TaskError;
use crate::features::FeatureFlags;
use crate::host::*;
use crate::memory::Memory;
use crate::spawnsystem::*;
use crate::world::WorldState;
use log::*;
use screeps::RoomName;
use serde::de::DeserializeOwned;
use serde::Serialize;
use specs::prelude::*;
use std::collections::BTreeMap;

pub struct TaskContext<'a> {
    pub time: u32,
    pub world: &'a WorldState,
    pub memory: &'a mut Memory,
    pub cache: &'a mut ServerCache,
    pub host: &'a dyn GameHost,
    pub features: &'a FeatureFlags,
    pub registry: &'a TaskRegistry,
    pub task_id: String,
}

impl<'a> TaskContext<'a> {
    pub fn store_memory<T>(&mut self, value: &T) -> Result<(), TaskError>
    where
        T: Serialize,
    {
        let value = serde_json::to_value(value).map_err(|source| TaskError::Memory {
            id: self.task_id.clone(),
            source,
        })?;

        //
        // NOTE: A task removed during its own run must stay removed.
        //
        if let Some(entry) = self.memory.tasks.get_mut(&self.task_id) {
            *entry = value;
        }

        Ok(())
    }

    pub fn task_exists(&self, class_name: &str, sub_id: &str) -> bool {
        self.memory.tasks.contains_key(&task_id(class_name, sub_id))
    }

    pub fn create_task(&mut self, class_name: &str, sub_id: &str) -> Result<TaskData, TaskError> {
        self.registry.create(self.memory, self.world, class_name, sub_id, serde_json::Value::Null)
    }

    /// Creates the task unless it already exists. Returns whether it was created.
    pub fn ensure_task(&mut self, class_name: &str, sub_id: &str) -> Result<bool, TaskError> {
        match self.create_task(class_name, sub_id) {
            Ok(_) => {
                info!("[Task] {} created {}", self.task_id, task_id(class_name, sub_id));

                Ok(true)
            }
            Err(TaskError::NameExists(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn remove_task(&mut self, class_name: &str, sub_id: &str) -> bool {
        TaskRegistry::remove(self.memory, &task_id(class_name, sub_id))
    }

    pub fn remove_self(&mut self) {
        TaskRegistry::remove(self.memory, &self.task_id);
    }

    /// Queues a creep unless the name is already queued or alive.
    pub fn request_spawn<F>(&mut self, room: RoomName, name: &str, builder: F) -> Result<bool, TaskError>
    where
        F: FnOnce() -> SpawnRequest,
    {
        let mut queue = SpawnQueue::new(&mut self.memory.spawn_queue);

        let queued = request_creep_spawn(room, name, builder, &mut queue, self.world, self.host, self.cache)?;

        Ok(queued)
    }

    pub fn spawn_queued(&mut self, name: &str) -> bool {
        SpawnQueue::new(&mut self.memory.spawn_queue).has(name)
    }
}

pub trait Task {
    fn class_name(&self) -> &'static str;

    fn sub_id(&self) -> &str;

    fn id(&self) -> String {
        task_id(self.class_name(), self.sub_id())
    }

    fn run(&mut self, context: &mut TaskContext) -> Result<(), TaskError>;
}

/// Typed view of a task's durable blob. A sentinel entry reads as the default record.
pub fn decode_task_memory<T>(id: &str, value: &serde_json::Value) -> Result<T, TaskError>
where
    T: DeserializeOwned + Default,
{
    match value {
        serde_json::Value::Null => Ok(T::default()),
        value => serde_json::from_value(value.clone()).map_err(|source| TaskError::Memory {
            id: id.to_string(),
            source,
        }),
    }
}

pub fn task_id(class_name: &str, sub_id: &str) -> String {
    format!("{}.{}", class_name, sub_id)
}

/// True when an every-N-ticks check should run again.
pub fn is_due(last_run: Option<u32>, now: u32, interval: u32) -> bool {
    last_run.map(|last| now >= last + interval || now < last).unwrap_or(true)
}

/// Rebuilds a task from its instance key, its durable blob and the visible world.
pub type TaskConstructor = fn(&str, &serde_json::Value, &WorldState) -> Result<TaskData, TaskError>;

pub struct TaskRegistry {
    classes: BTreeMap<&'static str, TaskConstructor>,
}

impl TaskRegistry {
    pub fn new() -> TaskRegistry {
        TaskRegistry { classes: BTreeMap::new() }
    }

    pub fn with_default_tasks() -> TaskRegistry {
        let mut registry = TaskRegistry::new();

        registry.register(super::bootroom::CLASS_NAME, super::bootroom::BootRoomTask::load);
        registry.register(super::bootsource::CLASS_NAME, super::bootsource::BootSourceTask::load);
        registry.register(super::harvestsource::CLASS_NAME, super::harvestsource::HarvestSourceTask::load);
        registry.register(super::buildroom::CLASS_NAME, super::buildroom::BuildRoomTask::load);
        registry.register(super::upgradecontroller::CLASS_NAME, super::upgradecontroller::UpgradeControllerTask::load);

        registry
    }

    pub fn register(&mut self, class_name: &'static str, constructor: TaskConstructor) {
        self.classes.insert(class_name, constructor);
    }

    /// Writes the task's durable record and returns the live task. Fails if the id already exists.
    pub fn create(&self, memory: &mut Memory, world: &WorldState, class_name: &str, sub_id: &str, initial: serde_json::Value) -> Result<TaskData, TaskError> {
        let id = task_id(class_name, sub_id);

        if memory.tasks.contains_key(&id) {
            return Err(TaskError::NameExists(id));
        }

        let constructor = self.classes.get(class_name).ok_or_else(|| TaskError::UnknownClass(class_name.to_string()))?;

        let task = constructor(sub_id, &initial, world)?;

        memory.tasks.insert(id, initial);

        Ok(task)
    }

    pub fn load(&self, id: &str, memory: &Memory, world: &WorldState) -> Result<TaskData, TaskError> {
        let (class_name, sub_id) = id.split_once('.').ok_or_else(|| TaskError::MalformedId(id.to_string()))?;

        let constructor = self.classes.get(class_name).ok_or_else(|| TaskError::UnknownClass(class_name.to_string()))?;

        let value = memory.tasks.get(id).cloned().unwrap_or(serde_json::Value::Null);

        constructor(sub_id, &value, world)
    }

    pub fn remove(memory: &mut Memory, id: &str) -> bool {
        memory.tasks.remove(id).is_some()
    }

    /// Loads and runs every persisted task. A task that fails to load or run is logged and skipped.
    pub fn run_all(&self, time: u32, world: &WorldState, memory: &mut Memory, cache: &mut ServerCache, host: &dyn GameHost, features: &FeatureFlags) {
        let ids: Vec<String> = memory.tasks.keys().cloned().collect();

        for id in ids {
            if !memory.tasks.contains_key(&id) {
                continue;
            }

            let mut task = match self.load(&id, memory, world) {
                Ok(task) => task,
                Err(err) => {
                    error!("[Task] Failed to load {}: {}", id, err);
                    continue;
                }
            };

            let mut context = TaskContext {
                time,
                world,
                memory: &mut *memory,
                cache: &mut *cache,
                host,
                features,
                registry: self,
                task_id: id.clone(),
            };

            if let Err(err) = task.as_task().run(&mut context) {
                error!("[Task] {} failed: {}", id, err);
            }
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> TaskRegistry {
        TaskRegistry::with_default_tasks()
    }
}

#[derive(SystemData)]
pub struct TaskSystemData<'a> {
    world: ReadExpect<'a, WorldState>,
    memory: WriteExpect<'a, Memory>,
    cache: WriteExpect<'a, ServerCache>,
    host: ReadExpect<'a, HostHandle>,
    features: ReadExpect<'a, FeatureFlags>,
    registry: ReadExpect<'a, TaskRegistry>,
}

pub struct RunTaskSystem;

impl<'a> System<'a> for RunTaskSystem {
    type SystemData = TaskSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let time = data.world.time;

        data.registry.run_all(time, &data.world, &mut data.memory, &mut data.cache, data.host.as_host(), &data.features);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;
    use crate::world::*;

    fn world() -> WorldState {
        let room_name: RoomName = "W1N1".parse().unwrap();

        let mut room = RoomState::new(room_name);

        room.controller = Some(ControllerState {
            id: "ctrl".into(),
            pos: position(40, 40, room_name).unwrap(),
            my: true,
            level: 1,
            progress: 0,
            progress_total: 200,
        });

        let mut world = WorldState::default();

        world.rooms.insert(room_name, room);

        world
    }

    #[test]
    fn create_twice_fails_with_name_exists() {
        let registry = TaskRegistry::with_default_tasks();
        let world = world();
        let mut memory = Memory::new();

        registry.create(&mut memory, &world, "BootRoom", "W1N1", serde_json::Value::Null).unwrap();

        let second = registry.create(&mut memory, &world, "BootRoom", "W1N1", serde_json::Value::Null);

        assert!(matches!(second, Err(TaskError::NameExists(ref id)) if id == "BootRoom.W1N1"));
        assert_eq!(memory.tasks.len(), 1);
    }

    #[test]
    fn unknown_class_is_a_hard_error() {
        let registry = TaskRegistry::with_default_tasks();
        let world = world();
        let mut memory = Memory::new();

        memory.tasks.insert("Nonsense.abc".to_string(), serde_json::Value::Null);

        assert!(matches!(registry.load("Nonsense.abc", &memory, &world), Err(TaskError::UnknownClass(_))));
        assert!(matches!(registry.load("NoSeparator", &memory, &world), Err(TaskError::MalformedId(_))));
        assert!(matches!(
            registry.create(&mut memory, &world, "Nonsense", "x", serde_json::Value::Null),
            Err(TaskError::UnknownClass(_))
        ));
    }

    #[test]
    fn id_splits_on_first_separator() {
        let registry = TaskRegistry::with_default_tasks();
        let world = world();
        let mut memory = Memory::new();

        registry.create(&mut memory, &world, "BootSource", "5bbcaf.a9", serde_json::Value::Null).unwrap();

        let task = registry.load("BootSource.5bbcaf.a9", &memory, &world).unwrap();

        assert_eq!(task.id(), "BootSource.5bbcaf.a9");
    }

    #[test]
    fn run_all_continues_past_broken_task() {
        let registry = TaskRegistry::with_default_tasks();
        let world = world();
        let host = MockHost::new(world.clone());
        let mut memory = Memory::new();
        let mut cache = ServerCache::new();

        memory.tasks.insert("Broken.x".to_string(), serde_json::Value::Null);
        registry.create(&mut memory, &world, "BootRoom", "W1N1", serde_json::Value::Null).unwrap();

        registry.run_all(0, &world, &mut memory, &mut cache, &host, &FeatureFlags::default());

        assert!(memory.tasks.contains_key("Broken.x"));
        assert_ne!(memory.tasks.get("BootRoom.W1N1"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn removal_is_lazy_deletion_of_the_key() {
        let registry = TaskRegistry::with_default_tasks();
        let world = world();
        let mut memory = Memory::new();

        registry.create(&mut memory, &world, "UpgradeController", "W1N1", serde_json::Value::Null).unwrap();

        assert!(TaskRegistry::remove(&mut memory, "UpgradeController.W1N1"));
        assert!(!TaskRegistry::remove(&mut memory, "UpgradeController.W1N1"));
        assert!(memory.tasks.is_empty());
    }

    #[test]
    fn cadence_gate() {
        assert!(is_due(None, 10, 5));
        assert!(!is_due(Some(10), 14, 5));
        assert!(is_due(Some(10), 15, 5));
    }
}
