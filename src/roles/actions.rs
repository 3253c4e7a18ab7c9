use bitflags::*;
use screeps::Position;

// Screeps simultaneous action pipelines (from docs.screeps.com/simultaneous-actions.html):
//
// Pipeline A (work):     harvest, build, repair
// Pipeline D (transfer): withdraw, transfer, pickup
// Pipeline E:            upgradeController
//
// Actions within the same pipeline are mutually exclusive (share the same bit).
// Actions in different pipelines can coexist (different bits).

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct SimultaneousActionFlags: u16 {
        const UNSET = 0;

        const MOVE = 1;

        const HARVEST = 1 << 1;
        const BUILD   = 1 << 1;
        const REPAIR  = 1 << 1;

        const WITHDRAW = 1 << 4;
        const TRANSFER = 1 << 4;
        const PICKUP   = 1 << 4;

        const UPGRADE_CONTROLLER = 1 << 5;

        // Recycling consumes the creep; nothing else may be issued alongside it.
        const RECYCLE = 0b11_1111;
    }
}

impl SimultaneousActionFlags {
    pub fn consume(&mut self, flags: SimultaneousActionFlags) -> bool {
        if !self.intersects(flags) {
            self.insert(flags);

            true
        } else {
            false
        }
    }
}

/// A single command for one creep. Targets are object ids plus the target position so execution can fall
/// back to moving into range.
#[derive(Clone, Debug, PartialEq)]
pub enum CreepAction {
    MoveTo { pos: Position, range: u32 },
    /// Step away from `pos` until at least `range` tiles from it.
    Flee { pos: Position, range: u32 },
    Harvest { target: String, pos: Position },
    Pickup { target: String, pos: Position },
    Transfer { target: String, pos: Position },
    Withdraw { target: String, pos: Position },
    Build { target: String, pos: Position },
    Repair { target: String, pos: Position },
    UpgradeController { target: String, pos: Position },
    Recycle { spawn: String, pos: Position },
}

impl CreepAction {
    pub fn name(&self) -> &'static str {
        match self {
            CreepAction::MoveTo { .. } => "move",
            CreepAction::Flee { .. } => "flee",
            CreepAction::Harvest { .. } => "harvest",
            CreepAction::Pickup { .. } => "pickup",
            CreepAction::Transfer { .. } => "transfer",
            CreepAction::Withdraw { .. } => "withdraw",
            CreepAction::Build { .. } => "build",
            CreepAction::Repair { .. } => "repair",
            CreepAction::UpgradeController { .. } => "upgrade",
            CreepAction::Recycle { .. } => "recycle",
        }
    }

    pub fn flags(&self) -> SimultaneousActionFlags {
        match self {
            CreepAction::MoveTo { .. } | CreepAction::Flee { .. } => SimultaneousActionFlags::MOVE,
            CreepAction::Harvest { .. } => SimultaneousActionFlags::HARVEST,
            CreepAction::Pickup { .. } => SimultaneousActionFlags::PICKUP,
            CreepAction::Transfer { .. } => SimultaneousActionFlags::TRANSFER,
            CreepAction::Withdraw { .. } => SimultaneousActionFlags::WITHDRAW,
            CreepAction::Build { .. } => SimultaneousActionFlags::BUILD,
            CreepAction::Repair { .. } => SimultaneousActionFlags::REPAIR,
            CreepAction::UpgradeController { .. } => SimultaneousActionFlags::UPGRADE_CONTROLLER,
            CreepAction::Recycle { .. } => SimultaneousActionFlags::RECYCLE,
        }
    }

    /// Where the creep has to be, and how close, for the command to succeed.
    pub fn required_range(&self) -> Option<(Position, u32)> {
        match self {
            CreepAction::MoveTo { .. } | CreepAction::Flee { .. } => None,
            CreepAction::Harvest { pos, .. }
            | CreepAction::Pickup { pos, .. }
            | CreepAction::Transfer { pos, .. }
            | CreepAction::Withdraw { pos, .. }
            | CreepAction::Recycle { pos, .. } => Some((*pos, 1)),
            CreepAction::Build { pos, .. } | CreepAction::Repair { pos, .. } | CreepAction::UpgradeController { pos, .. } => {
                Some((*pos, 3))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CreepAction::MoveTo { pos, .. } | CreepAction::Flee { pos, .. } => format!("{} {}", self.name(), pos),
            CreepAction::Harvest { target, .. }
            | CreepAction::Pickup { target, .. }
            | CreepAction::Transfer { target, .. }
            | CreepAction::Withdraw { target, .. }
            | CreepAction::Build { target, .. }
            | CreepAction::Repair { target, .. }
            | CreepAction::UpgradeController { target, .. } => format!("{} {}", self.name(), target),
            CreepAction::Recycle { spawn, .. } => format!("{} {}", self.name(), spawn),
        }
    }
}

/// Collects the actions a role decides on for one creep this tick, rejecting any that would collide with
/// an already recorded action in the same pipeline.
#[derive(Default)]
pub struct ActionRecorder {
    flags: SimultaneousActionFlags,
    actions: Vec<CreepAction>,
}

impl ActionRecorder {
    pub fn new() -> ActionRecorder {
        ActionRecorder::default()
    }

    pub fn record(&mut self, action: CreepAction) -> bool {
        if self.flags.consume(action.flags()) {
            self.actions.push(action);

            true
        } else {
            false
        }
    }

    pub fn has_move(&self) -> bool {
        self.flags.contains(SimultaneousActionFlags::MOVE)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[CreepAction] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<CreepAction> {
        self.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::position;

    fn pos() -> Position {
        position(10, 10, "W1N1".parse().unwrap()).unwrap()
    }

    #[test]
    fn same_pipeline_actions_are_exclusive() {
        let mut recorder = ActionRecorder::new();

        assert!(recorder.record(CreepAction::Harvest { target: "s".into(), pos: pos() }));
        assert!(!recorder.record(CreepAction::Build { target: "b".into(), pos: pos() }));
        assert!(recorder.record(CreepAction::Transfer { target: "t".into(), pos: pos() }));
        assert!(recorder.record(CreepAction::MoveTo { pos: pos(), range: 1 }));

        assert_eq!(recorder.actions().len(), 3);
        assert!(recorder.has_move());
    }

    #[test]
    fn recycle_excludes_everything() {
        let mut recorder = ActionRecorder::new();

        assert!(recorder.record(CreepAction::Recycle { spawn: "sp".into(), pos: pos() }));
        assert!(!recorder.record(CreepAction::MoveTo { pos: pos(), range: 1 }));
        assert!(!recorder.record(CreepAction::UpgradeController { target: "c".into(), pos: pos() }));
    }
}
