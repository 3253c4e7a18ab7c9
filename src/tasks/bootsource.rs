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
use screeps::RoomName;
use serde::{Deserialize, Serialize};

pub const CLASS_NAME: &str = "BootSource";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootSourceMemory {
    pub last_run: Option<u32>,
}

/// Early game mining: general purpose boot creeps harvest the source, build its container and carry
/// energy home until the room can afford static harvesting.
#[derive(Clone, Debug, PartialEq)]
pub struct BootSourceTask {
    source_id: String,
    memory: BootSourceMemory,
}

impl BootSourceTask {
    pub fn load(sub_id: &str, value: &serde_json::Value, _world: &WorldState) -> Result<TaskData, TaskError> {
        let memory = decode_task_memory(&task_id(CLASS_NAME, sub_id), value)?;

        Ok(TaskData::BootSource(BootSourceTask {
            source_id: sub_id.to_string(),
            memory,
        }))
    }
}

/// True when no boot creep calling `room_name` home is alive.
fn room_needs_recovery(context: &TaskContext, room_name: RoomName) -> bool {
    let room_key = room_name.to_string();

    !context.memory.creeps.iter().any(|(name, creep_memory)| {
        creep_memory.role.as_deref() == Some("boot")
            && creep_memory.home_room.as_deref() == Some(room_key.as_str())
            && context.world.creeps.contains_key(name)
    })
}

impl Task for BootSourceTask {
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

        if !is_due(self.memory.last_run, context.time, BOOT_SOURCE_INTERVAL) {
            return Ok(());
        }

        self.memory.last_run = Some(context.time);

        context.store_memory(&self.memory)?;

        ensure_source_container(context, room, source);

        //
        // NOTE: With no boot creeps left the room may never refill to full capacity, so the body is built
        //       from what a bare spawn can always reach.
        //
        let recovery_energy = if room_needs_recovery(context, room.name) {
            Some(room.energy_available.max(SPAWN_ENERGY_CAPACITY))
        } else {
            None
        };

        let creep_memory = CreepMemory::with_role("boot")
            .task(&context.task_id)
            .home_room(&room.name.to_string())
            .source(&source.id);

        let source_pos = source.pos;

        keep_creep_pair(context, room.name, &boot_creep_name(&source.id), source_pos, |name, time| {
            let request = SpawnRequest::new(name, BodyTemplate::Boot, SpawnPriority::Boot, source_pos, time).memory(creep_memory);

            match recovery_energy {
                Some(energy) => request.max_energy(energy),
                None => request,
            }
        });

        Ok(())
    }
}
