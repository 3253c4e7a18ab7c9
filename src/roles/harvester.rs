use super::actions::*;
use super::rolesystem::*;

/// Static miner. Parks on the source container so harvested energy drops straight into it.
pub struct HarvesterRole;

impl Role for HarvesterRole {
    fn name(&self) -> &'static str {
        "harvester"
    }

    fn run(&self, context: &mut RoleContext) {
        let source = match context.source() {
            Some(source) => source,
            None => return,
        };

        if let Some(container) = context.container() {
            if context.creep.pos != container.pos {
                context.record(CreepAction::MoveTo {
                    pos: container.pos,
                    range: 0,
                });
            }
        }

        if source.energy > 0 {
            context.record(CreepAction::Harvest {
                target: source.id.clone(),
                pos: source.pos,
            });
        }
    }
}
