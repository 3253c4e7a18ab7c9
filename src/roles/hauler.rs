use super::actions::*;
use super::rolesystem::*;
use crate::findnearest::*;

/// Moves energy from a source container to the home room's spawns and extensions.
pub struct HaulerRole;

fn collect(context: &RoleContext) -> Option<CreepAction> {
    let container = context.container()?;
    let room = context.world.room(container.pos.room_name())?;

    if let Some(dropped) = room.dropped_energy.iter().find_in_range(container.pos, 1) {
        return Some(CreepAction::Pickup {
            target: dropped.id.clone(),
            pos: dropped.pos,
        });
    }

    if container.energy > 0 {
        return Some(CreepAction::Withdraw {
            target: container.id.clone(),
            pos: container.pos,
        });
    }

    if context.creep.pos.get_range_to(container.pos) > 1 {
        return Some(CreepAction::MoveTo {
            pos: container.pos,
            range: 1,
        });
    }

    None
}

fn deliver(context: &RoleContext) -> Option<CreepAction> {
    let home_room = context.home_room()?;

    let (target, pos) = home_room.energy_sinks().into_iter().find_nearest_linear(context.creep.pos)?;

    Some(CreepAction::Transfer { target, pos })
}

impl Role for HaulerRole {
    fn name(&self) -> &'static str {
        "hauler"
    }

    fn run(&self, context: &mut RoleContext) {
        //
        // NOTE: Hysteresis keeps a partially filled hauler collecting until full, and delivering until empty.
        //
        if context.memory.working && context.creep.is_empty() {
            context.memory.working = false;
        } else if !context.memory.working && context.creep.is_full() {
            context.memory.working = true;
        }

        let action = if context.memory.working {
            deliver(context)
        } else {
            collect(context)
        };

        if let Some(action) = action {
            context.record(action);
        }
    }
}
