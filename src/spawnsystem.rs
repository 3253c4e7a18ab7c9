use crate::cache::ServerCache;
use crate::constants::*;
use crate::creep::*;
use crate::creeppair::CreepPair;
use crate::error::SpawnQueueError;
use crate::events::*;
use crate::heap::*;
use crate::host::*;
use crate::memory::*;
use crate::world::*;
use log::*;
use screeps::{Part, Position, RoomName};
use serde::{Deserialize, Serialize};
use specs::prelude::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpawnPriority {
    Worker,
    Hauler,
    Harvester,
    Builder,
    Upgrader,
    Boot,
    Attack,
}

/// A task's ask for a creep. `time` is the tick the creep should arrive ready at `pos`.
#[derive(Clone, Debug)]
pub struct SpawnRequest {
    name: String,
    body: BodyTemplate,
    priority: SpawnPriority,
    pos: Position,
    time: u32,
    max_energy: Option<u32>,
    memory: CreepMemory,
}

impl SpawnRequest {
    pub fn new(name: &str, body: BodyTemplate, priority: SpawnPriority, pos: Position, time: u32) -> SpawnRequest {
        SpawnRequest {
            name: name.to_string(),
            body,
            priority,
            pos,
            time,
            max_energy: None,
            memory: CreepMemory::default(),
        }
    }

    /// Caps the energy the body may be built with.
    pub fn max_energy(mut self, energy: u32) -> SpawnRequest {
        self.max_energy = Some(energy);
        self
    }

    /// Initial memory stamped onto the creep when it spawns.
    pub fn memory(mut self, memory: CreepMemory) -> SpawnRequest {
        self.memory = memory;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> SpawnPriority {
        self.priority
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequestMemory {
    pub name: String,
    pub template: BodyTemplate,
    pub body: Vec<Part>,
    pub priority: SpawnPriority,
    /// Packed target position.
    pub pos: u32,
    pub time: u32,
    pub start_time: u32,
    pub end_time: u32,
    pub cost: u32,
    #[serde(default)]
    pub memory: CreepMemory,
}

impl SpawnRequestMemory {
    pub fn pos(&self) -> Position {
        Position::from_packed(self.pos)
    }
}

fn is_later(a: &SpawnRequestMemory, b: &SpawnRequestMemory) -> bool {
    a.start_time > b.end_time
}

/// True when `a` must be spawned before `b`. Disjoint spawn windows keep temporal order regardless of
/// priority; overlapping windows are decided by priority, then earliest start.
pub fn spawn_request_before(a: &SpawnRequestMemory, b: &SpawnRequestMemory) -> bool {
    if is_later(b, a) {
        return true;
    }

    if is_later(a, b) {
        return false;
    }

    (a.priority, a.start_time) < (b.priority, b.start_time)
}

fn spawn_request_key(entry: &SpawnRequestMemory) -> &str {
    &entry.name
}

type SpawnRequestComparator = fn(&SpawnRequestMemory, &SpawnRequestMemory) -> bool;

/// Travel cost from a spawn to a request target. Cross-room costs come from the path finder and are cached.
pub fn spawn_travel_cost(from: Position, to: Position, host: &dyn GameHost, cache: &mut ServerCache) -> Option<u32> {
    if from.room_name() == to.room_name() {
        return Some(from.get_range_to(to));
    }

    let key = format!("spawn_travel:{}:{}", from.packed_repr(), to.packed_repr());

    cache.get_or_insert_with(&key, SPAWN_TRAVEL_CACHE_TTL, || host.path_cost(from, to))
}

struct ReachableSpawn {
    room: RoomName,
    spawn_index: usize,
    travel: u32,
}

fn reachable_spawns(world: &WorldState, target: Position, host: &dyn GameHost, cache: &mut ServerCache) -> Vec<ReachableSpawn> {
    let mut reachable = Vec::new();

    for room in world.owned_rooms() {
        for (spawn_index, spawn) in room.spawns.iter().enumerate() {
            if !spawn.active {
                continue;
            }

            if let Some(travel) = spawn_travel_cost(spawn.pos, target, host, cache) {
                if travel <= MAX_SPAWN_TRAVEL {
                    reachable.push(ReachableSpawn {
                        room: room.name,
                        spawn_index,
                        travel,
                    });
                }
            }
        }
    }

    reachable
}

fn reachable_capacity(world: &WorldState, reachable: &[ReachableSpawn]) -> Option<u32> {
    reachable
        .iter()
        .filter_map(|spawn| world.room(spawn.room))
        .map(|room| room.energy_capacity_available)
        .max()
}

/// The process-wide spawn queue, attached to its durable memory block.
pub struct SpawnQueue<'a> {
    memory: &'a mut HeapMemory<SpawnRequestMemory>,
}

impl<'a> SpawnQueue<'a> {
    pub fn new(memory: &'a mut HeapMemory<SpawnRequestMemory>) -> SpawnQueue<'a> {
        SpawnQueue { memory }
    }

    fn queue(&mut self) -> PriorityQueue<'_, SpawnRequestMemory, SpawnRequestComparator> {
        PriorityQueue::with_key(&mut *self.memory, spawn_request_before as SpawnRequestComparator, spawn_request_key)
    }

    pub fn has(&self, name: &str) -> bool {
        self.memory.index.as_ref().map(|index| index.contains_key(name)).unwrap_or_else(|| {
            self.memory.iter().any(|entry| entry.name == name)
        })
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn peek(&self) -> Option<&SpawnRequestMemory> {
        self.memory.array.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpawnRequestMemory> {
        self.memory.iter()
    }

    pub fn clear(&mut self) {
        self.memory.clear();
    }

    /// Resolves the request body against the best energy capacity any reachable spawn offers (or the
    /// request's cap) and queues it.
    pub fn push(&mut self, request: SpawnRequest, world: &WorldState, host: &dyn GameHost, cache: &mut ServerCache) -> Result<(), SpawnQueueError> {
        if self.has(&request.name) {
            return Err(SpawnQueueError::NameExists(request.name));
        }

        let reachable = reachable_spawns(world, request.pos, host, cache);

        let capacity = reachable_capacity(world, &reachable).ok_or_else(|| SpawnQueueError::Unreachable(request.name.clone()))?;

        let energy = request.max_energy.map(|cap| cap.min(capacity)).unwrap_or(capacity);

        let body = request.body.resolve(energy).ok_or_else(|| SpawnQueueError::NoBody(request.name.clone()))?;

        let cost = body_cost(&body);
        let spawn_duration = body.len() as u32 * CREEP_SPAWN_TIME;

        let entry = SpawnRequestMemory {
            start_time: request.time.saturating_sub(spawn_duration),
            end_time: request.time,
            name: request.name,
            template: request.body,
            body,
            priority: request.priority,
            pos: request.pos.packed_repr(),
            time: request.time,
            cost,
            memory: request.memory,
        };

        debug!(
            "[SpawnQueue] Queued {} - Priority: {:?} - Cost: {} - Window: {}..{}",
            entry.name, entry.priority, entry.cost, entry.start_time, entry.end_time
        );

        self.queue().push(entry)?;

        Ok(())
    }

    /// Commits queued requests to idle spawns. Each spawn takes at most one request per tick.
    pub fn run(&mut self, world: &mut WorldState, creeps: &mut std::collections::BTreeMap<String, CreepMemory>, host: &dyn GameHost, cache: &mut ServerCache) {
        let now = world.time;

        loop {
            let (target, cost, start_time, name) = match self.peek() {
                Some(head) => (head.pos(), head.cost, head.start_time, head.name.clone()),
                None => return,
            };

            if start_time > now {
                return;
            }

            let reachable = reachable_spawns(world, target, host, cache);

            let capacity = reachable_capacity(world, &reachable).unwrap_or(0);

            if capacity < cost {
                self.queue().pop();

                error!(
                    "[SpawnQueue] Dropping unsatisfiable request {} - Cost: {} - Best reachable capacity: {}",
                    name, cost, capacity
                );

                continue;
            }

            //
            // NOTE: Rooms are visited in hash order, so equal travel is settled by room name and spawn order.
            //
            let selected = reachable
                .iter()
                .filter(|candidate| {
                    world
                        .room(candidate.room)
                        .map(|room| room.spawns[candidate.spawn_index].is_idle() && room.energy_available >= cost)
                        .unwrap_or(false)
                })
                .min_by_key(|candidate| (candidate.travel, candidate.room.to_string(), candidate.spawn_index))
                .map(|candidate| (candidate.room, candidate.spawn_index));

            let (room_name, spawn_index) = match selected {
                Some(selected) => selected,
                None => {
                    let key = format!("spawn_defer:{}", name);

                    if !cache.contains(&key) {
                        warn!("[SpawnQueue] Deferring {} - No idle spawn with {} energy available", name, cost);

                        cache.insert(&key, SPAWN_DEFER_WARNING_TTL, ());
                    }

                    return;
                }
            };

            let entry = match self.queue().pop() {
                Some(entry) => entry,
                None => return,
            };

            Self::commit(entry, room_name, spawn_index, world, creeps, host);
        }
    }

    fn commit(
        entry: SpawnRequestMemory,
        room_name: RoomName,
        spawn_index: usize,
        world: &mut WorldState,
        creeps: &mut std::collections::BTreeMap<String, CreepMemory>,
        host: &dyn GameHost,
    ) {
        let runtime_name = if world.creeps.contains_key(&entry.name) {
            CreepPair::other(&entry.name)
        } else {
            entry.name.clone()
        };

        let room = match world.room_mut(room_name) {
            Some(room) => room,
            None => {
                error!("[SpawnQueue] Dropping {} - Room {} is no longer visible - Request consumed", runtime_name, room_name);

                return;
            }
        };

        let spawn = room.spawns[spawn_index].clone();

        match host.spawn_creep(&spawn, &entry.body, &runtime_name) {
            Ok(()) => {
                info!(
                    "[SpawnQueue] Spawning {} at {} - Parts: {} - Cost: {}",
                    runtime_name,
                    spawn.name,
                    entry.body.len(),
                    entry.cost
                );

                room.spawns[spawn_index].spawning = true;
                room.energy_available = room.energy_available.saturating_sub(entry.cost);

                let energy_capacity = carry_capacity(&entry.body);

                world.creeps.insert(
                    runtime_name.clone(),
                    CreepState {
                        name: runtime_name.clone(),
                        pos: spawn.pos,
                        spawning: true,
                        ticks_to_live: None,
                        energy: 0,
                        energy_capacity,
                        body: entry.body.clone(),
                    },
                );

                creeps.insert(runtime_name, entry.memory);
            }
            Err(err) => {
                error!(
                    "[SpawnQueue] Failed to spawn {} at {} - Error: {} - Request consumed",
                    runtime_name, spawn.name, err
                );
            }
        }
    }
}

/// Queues a spawn request built on demand, unless `name` is already queued or alive. Returns whether a
/// request was queued.
pub fn request_creep_spawn<F>(
    room: RoomName,
    name: &str,
    builder: F,
    queue: &mut SpawnQueue,
    world: &WorldState,
    host: &dyn GameHost,
    cache: &mut ServerCache,
) -> Result<bool, SpawnQueueError>
where
    F: FnOnce() -> SpawnRequest,
{
    if queue.has(name) || world.creeps.contains_key(name) {
        return Ok(false);
    }

    let request = builder();

    trace!("[SpawnQueue] Request from {} for {}", room, name);

    queue.push(request, world, host, cache)?;

    Ok(true)
}

pub fn register_spawn_queue_hooks(bus: &mut EventBus) {
    bus.subscribe(EventKind::HardReset, "spawn_queue_reset", |_, context| {
        if !context.memory.spawn_queue.is_empty() {
            info!("[SpawnQueue] Discarding {} queued requests after reset", context.memory.spawn_queue.len());
        }

        context.memory.spawn_queue = HeapMemory::default();
        context.memory.spawn_queue.rebuild_index(spawn_request_key);
    });

    bus.subscribe(EventKind::TickStart, "spawn_queue_clear", |_, context| {
        if context.features.spawn_queue.clear {
            info!("[SpawnQueue] Clearing spawn queue by request");

            context.memory.spawn_queue.clear();
        }
    });
}

#[derive(SystemData)]
pub struct SpawnQueueSystemData<'a> {
    world: WriteExpect<'a, WorldState>,
    memory: WriteExpect<'a, Memory>,
    cache: WriteExpect<'a, ServerCache>,
    host: ReadExpect<'a, HostHandle>,
}

pub struct SpawnQueueSystem;

impl<'a> System<'a> for SpawnQueueSystem {
    type SystemData = SpawnQueueSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let memory = &mut *data.memory;

        let mut queue = SpawnQueue::new(&mut memory.spawn_queue);

        queue.run(&mut data.world, &mut memory.creeps, data.host.as_host(), &mut data.cache);
    }
}
