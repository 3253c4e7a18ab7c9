use super::tasksystem::*;
use crate::constants::*;
use crate::creeppair::CreepPair;
use crate::error::TaskError;
use crate::spawnsystem::*;
use crate::world::*;
use log::*;
use screeps::{Position, RoomName, StructureType};

pub fn boot_creep_name(source_id: &str) -> String {
    format!("boot-{}", source_id)
}

pub fn harvester_creep_name(source_id: &str) -> String {
    format!("harvest-{}", source_id)
}

pub fn hauler_creep_name(source_id: &str) -> String {
    format!("haul-{}", source_id)
}

pub fn upgrader_creep_name(room_name: RoomName) -> String {
    format!("upgrade-{}", room_name)
}

pub fn builder_creep_name(room_name: RoomName, index: u32) -> String {
    format!("build-{}-{}", room_name, index)
}

/// Shortest travel from any owned spawn to `pos`.
pub fn nearest_spawn_travel(context: &mut TaskContext, pos: Position) -> Option<u32> {
    let spawn_positions: Vec<Position> = context.world.spawns().map(|(_, spawn)| spawn.pos).collect();

    spawn_positions
        .into_iter()
        .filter_map(|from| spawn_travel_cost(from, pos, context.host, context.cache))
        .min()
}

/// Keeps one creep alive under `base_name`, queuing the pair's secondary name early enough that it arrives
/// as the active creep expires. `builder` receives the name to spawn and the tick it should be ready.
pub fn ensure_creep_pair<F>(context: &mut TaskContext, room: RoomName, base_name: &str, pos: Position, builder: F) -> Result<bool, TaskError>
where
    F: FnOnce(&str, u32) -> SpawnRequest,
{
    let pair = CreepPair::new(base_name);

    if context.spawn_queued(pair.name()) || context.spawn_queued(pair.alt_name()) {
        return Ok(false);
    }

    let now = context.time;

    if !pair.has_live_creep(context.world) {
        let name = pair.active_creep_name(context.world).to_string();

        return context.request_spawn(room, &name, || builder(&name, now));
    }

    let (ttl, spawn_duration) = match pair.active_creep(context.world) {
        Some(creep) if !creep.spawning => (pair.active_creep_ttl(context.world), creep.body.len() as u32 * CREEP_SPAWN_TIME),
        _ => return Ok(false),
    };

    //
    // NOTE: Only one successor at a time. A secondary that is already alive takes over once the active
    //       creep expires.
    //
    if pair.live_creeps(context.world).len() > 1 {
        return Ok(false);
    }

    let travel = nearest_spawn_travel(context, pos).unwrap_or(0);

    if ttl > spawn_duration + travel + PRESPAWN_MARGIN {
        return Ok(false);
    }

    let name = pair.secondary_creep_name(context.world).to_string();
    let ready_time = now + ttl.saturating_sub(travel);

    debug!("[Task] {} pre-spawning {} - Active ttl: {} - Travel: {}", context.task_id, name, ttl, travel);

    context.request_spawn(room, &name, || builder(&name, ready_time))
}

/// Runs `ensure_creep_pair` for a task that has more work to do this run. A rejected request is logged and
/// the task carries on, retrying on its next scheduled run.
pub fn keep_creep_pair<F>(context: &mut TaskContext, room: RoomName, base_name: &str, pos: Position, builder: F) -> bool
where
    F: FnOnce(&str, u32) -> SpawnRequest,
{
    match ensure_creep_pair(context, room, base_name, pos, builder) {
        Ok(queued) => queued,
        Err(err) => {
            warn!("[Task] {} - Failed to request {}: {}", context.task_id, base_name, err);

            false
        }
    }
}

/// Makes sure a container exists next to the source, placing a construction site when neither a container
/// nor a site is present. Returns the container id once it is built.
pub fn ensure_source_container(context: &mut TaskContext, room: &RoomState, source: &SourceState) -> Option<String> {
    if let Some(container) = room.container_near(source.pos, 1) {
        context.memory.room_mut(&room.name.to_string()).storage_container_pos = Some(container.pos.packed_repr());

        return Some(container.id.clone());
    }

    if room.site_near(source.pos, 1, StructureType::Container).is_some() {
        return None;
    }

    if !context.features.construction.execute {
        return None;
    }

    let remembered = context
        .memory
        .rooms
        .get(&room.name.to_string())
        .and_then(|room_memory| room_memory.storage_container_pos)
        .map(Position::from_packed)
        .filter(|pos| source.open_positions.contains(pos) && !room.is_occupied(*pos));

    let site_pos = match remembered {
        Some(pos) => pos,
        None => {
            let spawn_pos = room.spawns.first().map(|spawn| spawn.pos);

            source
                .open_positions
                .iter()
                .filter(|pos| !room.is_occupied(**pos))
                .min_by_key(|pos| spawn_pos.map(|spawn| spawn.get_range_to(**pos)).unwrap_or(0))
                .copied()?
        }
    };

    match context.host.create_construction_site(site_pos, StructureType::Container) {
        Ok(()) => {
            info!("[Task] {} placed container site at {}", context.task_id, site_pos);

            context.memory.room_mut(&room.name.to_string()).storage_container_pos = Some(site_pos.packed_repr());
        }
        Err(err) => {
            warn!("[Task] {} failed to place container site at {}: {}", context.task_id, site_pos, err);
        }
    }

    None
}
