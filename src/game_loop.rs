use crate::cache::*;
use crate::cleanup::*;
use crate::error::TickError;
use crate::events::*;
use crate::features::FeatureFlags;
use crate::host::*;
use crate::memory::Memory;
use crate::roles::rolesystem::*;
use crate::serialize::*;
use crate::spawnsystem::*;
use crate::tasks::bootroom::register_boot_room_hooks;
use crate::tasks::tasksystem::*;
use crate::world::WorldState;
use itertools::Itertools;
use log::*;
use screeps::RoomName;
use specs::prelude::*;

/// Lifecycle bookkeeping carried between dispatches.
#[derive(Default)]
pub struct TickInfo {
    /// Memory was (re)loaded into a fresh environment and subscribers have not been told yet.
    pub hard_reset: bool,
}

#[derive(SystemData)]
pub struct LifecycleSystemData<'a> {
    tick: WriteExpect<'a, TickInfo>,
    world: ReadExpect<'a, WorldState>,
    memory: WriteExpect<'a, Memory>,
    cache: WriteExpect<'a, ServerCache>,
    features: ReadExpect<'a, FeatureFlags>,
    tasks: ReadExpect<'a, TaskRegistry>,
    bus: WriteExpect<'a, EventBus>,
}

impl<'a> LifecycleSystemData<'a> {
    fn publish(&mut self, event: LifecycleEvent) {
        let mut context = EventContext {
            time: self.world.time,
            world: &self.world,
            memory: &mut self.memory,
            cache: &mut self.cache,
            features: &self.features,
            tasks: &self.tasks,
        };

        self.bus.publish(&event, &mut context);
    }
}

pub struct TickStartSystem;

impl<'a> System<'a> for TickStartSystem {
    type SystemData = LifecycleSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        if data.tick.hard_reset {
            data.tick.hard_reset = false;

            data.publish(LifecycleEvent::HardReset);
        }

        data.publish(LifecycleEvent::TickStart);

        let discovered: Vec<RoomName> = data
            .world
            .owned_rooms()
            .filter(|room| {
                data.memory
                    .rooms
                    .get(&room.name.to_string())
                    .and_then(|room_memory| room_memory.discovered_at)
                    .is_none()
            })
            .map(|room| room.name)
            .sorted_by_key(|room_name| room_name.to_string())
            .collect();

        for room_name in discovered {
            data.publish(LifecycleEvent::RoomDiscovered(room_name));
        }
    }
}

pub struct TickEndSystem;

impl<'a> System<'a> for TickEndSystem {
    type SystemData = LifecycleSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        data.publish(LifecycleEvent::TickEnd);
    }
}

/// Everything that lives for the lifetime of the server process. Dropping it is a hard reset.
pub struct Environment {
    world: World,
    dispatcher: Dispatcher<'static, 'static>,
    loaded: bool,
    tick: Option<u32>,
}

impl Environment {
    pub fn new(host: HostHandle) -> Environment {
        info!("Initializing game environment");

        let mut world = World::new();

        world.insert(host);
        world.insert(WorldState::default());
        world.insert(Memory::new());
        world.insert(ServerCache::new());
        world.insert(FeatureFlags::default());
        world.insert(TaskRegistry::with_default_tasks());
        world.insert(RoleRegistry::with_default_roles());
        world.insert(TickInfo::default());

        let mut bus = EventBus::new();

        register_cache_hooks(&mut bus);
        register_spawn_queue_hooks(&mut bus);
        register_boot_room_hooks(&mut bus);
        register_cleanup_hooks(&mut bus);

        world.insert(bus);

        let mut dispatcher = DispatcherBuilder::new()
            .with(TickStartSystem, "tick_start", &[])
            .with_barrier()
            .with(RunTaskSystem, "run_tasks", &[])
            .with_barrier()
            .with(RunRoleSystem, "run_roles", &[])
            .with_barrier()
            .with(SpawnQueueSystem, "spawn_queue", &[])
            .with_barrier()
            .with(TickEndSystem, "tick_end", &[])
            .build();

        dispatcher.setup(&mut world);

        Environment {
            world,
            dispatcher,
            loaded: false,
            tick: None,
        }
    }

    pub fn tick(&self) -> Option<u32> {
        self.tick
    }

    pub fn memory(&self) -> Memory {
        (*self.world.read_resource::<Memory>()).clone()
    }

    /// Runs one tick. Returns false when execution was delayed waiting on durable storage.
    pub fn run(&mut self, features: FeatureFlags) -> Result<bool, TickError> {
        let host: HostHandle = (*self.world.read_resource::<HostHandle>()).clone();

        if !self.loaded {
            let data = match host.load_memory() {
                Ok(data) => data,
                Err(StorageNotReady) => {
                    info!("Memory is not ready, delaying execution");

                    return Ok(false);
                }
            };

            info!("Deserializing memory to environment");

            let memory = data
                .map(|data| {
                    decode_memory(&data).unwrap_or_else(|err| {
                        error!("Failed deserialization: {} - Starting with fresh memory", err);

                        Memory::new()
                    })
                })
                .unwrap_or_else(Memory::new);

            self.world.insert(memory);
            self.world.write_resource::<TickInfo>().hard_reset = true;

            self.loaded = true;
        }

        self.tick = Some(host.time());

        self.world.insert(host.snapshot());
        self.world.insert(features);

        self.dispatcher.dispatch(&self.world);
        self.world.maintain();

        let encoded = encode_memory(&self.world.read_resource::<Memory>())?;

        host.store_memory(&encoded);

        Ok(true)
    }
}

pub fn tick(environment: &mut Option<Environment>, host: &HostHandle) -> Result<(), TickError> {
    let current_time = host.time();
    let features = host.features();

    let discontinuous = environment
        .as_ref()
        .and_then(|environment| environment.tick())
        .map(|tick| tick + 1 != current_time)
        .unwrap_or(false);

    if features.reset.environment || discontinuous {
        info!("Resetting environment");

        *environment = None;
    }

    if features.reset.memory {
        info!("Resetting memory");

        host.store_memory("");

        *environment = None;
    }

    if features.has_one_shot_flags() {
        host.clear_one_shot_features();
    }

    environment
        .get_or_insert_with(|| Environment::new(host.clone()))
        .run(features)?;

    Ok(())
}

/// Runs a tick, containing any failure to a log line and an operator notification.
pub fn run_tick(environment: &mut Option<Environment>, host: &HostHandle) {
    if let Err(err) = tick(environment, host) {
        error!("Tick failed: {}", err);

        if host.features().notify.errors {
            host.notify(&format!("Tick failed: {}", err));
        }
    }
}
