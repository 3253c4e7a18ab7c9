use super::actions::*;
use super::rolesystem::*;
use crate::constants::*;
use crate::findnearest::*;

/// Minimum pile worth walking to.
const MIN_PICKUP_AMOUNT: u32 = 50;

/// What a worker spends its energy on.
pub trait WorkPolicy {
    fn name(&self) -> &'static str;

    fn work(&self, context: &RoleContext) -> Option<CreepAction>;
}

fn upgrade_controller(context: &RoleContext) -> Option<CreepAction> {
    let controller = context.home_room()?.controller.as_ref().filter(|controller| controller.my)?;

    Some(CreepAction::UpgradeController {
        target: controller.id.clone(),
        pos: controller.pos,
    })
}

/// Build sites first, then repair, then fall back to upgrading.
pub struct BuildPolicy;

impl WorkPolicy for BuildPolicy {
    fn name(&self) -> &'static str {
        "builder"
    }

    fn work(&self, context: &RoleContext) -> Option<CreepAction> {
        let room = context.home_room()?;

        room.construction_sites
            .iter()
            .find_nearest_linear(context.creep.pos)
            .map(|site| CreepAction::Build {
                target: site.id.clone(),
                pos: site.pos,
            })
            .or_else(|| {
                room.structures
                    .iter()
                    .filter(|structure| structure.is_damaged(DAMAGED_CONTAINER_RATIO))
                    .find_nearest_linear(context.creep.pos)
                    .map(|structure| CreepAction::Repair {
                        target: structure.id.clone(),
                        pos: structure.pos,
                    })
            })
            .or_else(|| upgrade_controller(context))
    }
}

pub struct UpgradePolicy;

impl WorkPolicy for UpgradePolicy {
    fn name(&self) -> &'static str {
        "upgrader"
    }

    fn work(&self, context: &RoleContext) -> Option<CreepAction> {
        upgrade_controller(context)
    }
}

fn withdraw_from_container(context: &RoleContext) -> Option<CreepAction> {
    let container = context.container().filter(|container| container.energy > 0)?;

    Some(CreepAction::Withdraw {
        target: container.id.clone(),
        pos: container.pos,
    })
}

fn pickup_dropped_energy(context: &RoleContext) -> Option<CreepAction> {
    let dropped = context
        .home_room()?
        .dropped_energy
        .iter()
        .filter(|dropped| dropped.amount >= MIN_PICKUP_AMOUNT)
        .find_nearest_linear(context.creep.pos)?;

    Some(CreepAction::Pickup {
        target: dropped.id.clone(),
        pos: dropped.pos,
    })
}

fn harvest_nearest_source(context: &RoleContext) -> Option<CreepAction> {
    let source = context
        .home_room()?
        .sources
        .iter()
        .filter(|source| source.energy > 0)
        .find_nearest_linear(context.creep.pos)?;

    Some(CreepAction::Harvest {
        target: source.id.clone(),
        pos: source.pos,
    })
}

/// Gathers energy until full, then works until empty.
pub struct WorkerRole<P: WorkPolicy> {
    policy: P,
}

impl<P: WorkPolicy> WorkerRole<P> {
    pub fn new(policy: P) -> WorkerRole<P> {
        WorkerRole { policy }
    }
}

impl<P: WorkPolicy> Role for WorkerRole<P> {
    fn name(&self) -> &'static str {
        self.policy.name()
    }

    fn run(&self, context: &mut RoleContext) {
        if context.memory.working && context.creep.is_empty() {
            context.memory.working = false;
        } else if !context.memory.working && context.creep.is_full() {
            context.memory.working = true;
        }

        let action = if context.memory.working {
            self.policy.work(context)
        } else {
            withdraw_from_container(context)
                .or_else(|| pickup_dropped_energy(context))
                .or_else(|| harvest_nearest_source(context))
        };

        if let Some(action) = action {
            context.record(action);
        }
    }
}
