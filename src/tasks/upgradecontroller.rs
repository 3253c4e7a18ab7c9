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
use screeps::RoomName;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const CLASS_NAME: &str = "UpgradeController";

const CONTROLLER_CONTAINER_RANGE: u32 = 3;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeControllerMemory {
    pub last_run: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpgradeControllerTask {
    sub_id: String,
    room_name: RoomName,
    memory: UpgradeControllerMemory,
}

impl UpgradeControllerTask {
    pub fn load(sub_id: &str, value: &serde_json::Value, _world: &WorldState) -> Result<TaskData, TaskError> {
        let room_name = RoomName::from_str(sub_id).map_err(|_| TaskError::MalformedId(task_id(CLASS_NAME, sub_id)))?;

        let memory = decode_task_memory(&task_id(CLASS_NAME, sub_id), value)?;

        Ok(TaskData::UpgradeController(UpgradeControllerTask {
            sub_id: sub_id.to_string(),
            room_name,
            memory,
        }))
    }
}

impl Task for UpgradeControllerTask {
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

        let controller = match room.controller.as_ref().filter(|controller| controller.my) {
            Some(controller) => controller,
            None => {
                context.remove_self();

                return Ok(());
            }
        };

        if !is_due(self.memory.last_run, context.time, UPGRADE_CONTROLLER_INTERVAL) {
            return Ok(());
        }

        self.memory.last_run = Some(context.time);

        context.store_memory(&self.memory)?;

        let container_id = room
            .container_near(controller.pos, CONTROLLER_CONTAINER_RANGE)
            .map(|container| container.id.clone());

        let name = upgrader_creep_name(self.room_name);

        //
        // NOTE: A container may be built after the upgrader spawned.
        //
        for creep in CreepPair::new(&name).live_creeps(world) {
            if let Some(creep_memory) = context.memory.creep_mut(&creep.name) {
                creep_memory.container = container_id.clone();
            }
        }

        let controller_pos = controller.pos;

        let creep_memory = CreepMemory::with_role("upgrader")
            .task(&context.task_id)
            .home_room(&self.sub_id)
            .container(container_id.as_deref());

        keep_creep_pair(context, self.room_name, &name, controller_pos, |spawn_name, time| {
            SpawnRequest::new(spawn_name, BodyTemplate::Upgrader, SpawnPriority::Upgrader, controller_pos, time).memory(creep_memory)
        });

        Ok(())
    }
}
