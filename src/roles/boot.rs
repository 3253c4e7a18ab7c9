use super::actions::*;
use super::rolesystem::*;
use crate::constants::*;
use crate::findnearest::*;
use screeps::StructureType;

const REPOSITION_RANGE: u32 = 2;

/// General purpose early game creep: harvests its source, builds and fills the source container, and carries
/// energy home while the room has no hauler.
pub struct BootRole;

fn pickup_adjacent_energy(context: &RoleContext) -> Option<CreepAction> {
    if context.creep.free_capacity() == 0 {
        return None;
    }

    let dropped = context.room()?.dropped_energy.iter().find_in_range(context.creep.pos, 1)?;

    Some(CreepAction::Pickup {
        target: dropped.id.clone(),
        pos: dropped.pos,
    })
}

fn harvest_adjacent_source(context: &RoleContext) -> Option<CreepAction> {
    if context.creep.free_capacity() == 0 {
        return None;
    }

    let source = context
        .room()?
        .sources
        .iter()
        .filter(|source| source.energy > 0)
        .find_in_range(context.creep.pos, 1)?;

    Some(CreepAction::Harvest {
        target: source.id.clone(),
        pos: source.pos,
    })
}

fn deliver_to_energy_sink(context: &RoleContext) -> Option<CreepAction> {
    if context.creep.is_empty() {
        return None;
    }

    let home_room = context.home_room()?;

    if context.census.has_role(&home_room.name.to_string(), "hauler") {
        return None;
    }

    let (target, pos) = home_room.energy_sinks().into_iter().find_nearest_linear(context.creep.pos)?;

    Some(CreepAction::Transfer { target, pos })
}

fn maintain_container(context: &RoleContext) -> Option<CreepAction> {
    if context.creep.is_empty() {
        return None;
    }

    let source = context.source()?;
    let room = context.world.room(source.pos.room_name())?;

    if let Some(site) = room.site_near(source.pos, 1, StructureType::Container) {
        return Some(CreepAction::Build {
            target: site.id.clone(),
            pos: site.pos,
        });
    }

    let container = room.container_near(source.pos, 1)?;

    if container.is_damaged(DAMAGED_CONTAINER_RATIO) {
        return Some(CreepAction::Repair {
            target: container.id.clone(),
            pos: container.pos,
        });
    }

    if container.free_capacity() > 0 {
        return Some(CreepAction::Transfer {
            target: container.id.clone(),
            pos: container.pos,
        });
    }

    None
}

fn harvest_source(context: &RoleContext) -> Option<CreepAction> {
    if context.creep.free_capacity() == 0 {
        return None;
    }

    let source = context.source().filter(|source| source.energy > 0)?;

    Some(CreepAction::Harvest {
        target: source.id.clone(),
        pos: source.pos,
    })
}

fn reposition(context: &RoleContext) -> Option<CreepAction> {
    let source = context.source()?;

    if context.creep.pos.get_range_to(source.pos) >= REPOSITION_RANGE {
        return None;
    }

    Some(CreepAction::Flee {
        pos: source.pos,
        range: REPOSITION_RANGE,
    })
}

impl Role for BootRole {
    fn name(&self) -> &'static str {
        "boot"
    }

    fn run(&self, context: &mut RoleContext) {
        let action = pickup_adjacent_energy(context)
            .or_else(|| harvest_adjacent_source(context))
            .or_else(|| deliver_to_energy_sink(context))
            .or_else(|| maintain_container(context))
            .or_else(|| harvest_source(context))
            .or_else(|| reposition(context));

        if let Some(action) = action {
            context.record(action);
        }
    }
}
