use crate::constants::*;
use crate::events::*;
use log::*;

/// Drops memory of creeps that no longer exist. Creeps still queued or spawning are alive in the snapshot.
pub fn cleanup_creep_memory(context: &mut EventContext) -> usize {
    let world = context.world;
    let before = context.memory.creeps.len();

    context.memory.creeps.retain(|name, _| {
        let alive = world.creeps.contains_key(name);

        if !alive {
            debug!("cleaning up creep memory of dead creep {}", name);
        }

        alive
    });

    before - context.memory.creeps.len()
}

pub fn register_cleanup_hooks(bus: &mut EventBus) {
    bus.subscribe(EventKind::TickEnd, "creep_memory_cleanup", |_, context| {
        if context.time % CREEP_CLEANUP_INTERVAL == 0 {
            cleanup_creep_memory(context);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ServerCache;
    use crate::features::FeatureFlags;
    use crate::memory::{CreepMemory, Memory};
    use crate::tasks::tasksystem::TaskRegistry;
    use crate::world::*;
    use screeps::RoomName;

    #[test]
    fn dead_creeps_are_forgotten_on_cadence() {
        let room: RoomName = "W1N1".parse().unwrap();
        let mut world = WorldState::default();

        world.creeps.insert(
            "alive".into(),
            CreepState {
                name: "alive".into(),
                pos: position(10, 10, room).unwrap(),
                spawning: true,
                ticks_to_live: None,
                energy: 0,
                energy_capacity: 50,
                body: Vec::new(),
            },
        );

        let mut memory = Memory::new();

        memory.creeps.insert("alive".into(), CreepMemory::with_role("boot"));
        memory.creeps.insert("dead".into(), CreepMemory::with_role("boot"));

        let mut cache = ServerCache::new();
        let features = FeatureFlags::default();
        let tasks = TaskRegistry::with_default_tasks();
        let mut bus = EventBus::new();

        register_cleanup_hooks(&mut bus);

        for time in [CREEP_CLEANUP_INTERVAL - 1, CREEP_CLEANUP_INTERVAL] {
            let mut context = EventContext {
                time,
                world: &world,
                memory: &mut memory,
                cache: &mut cache,
                features: &features,
                tasks: &tasks,
            };

            bus.publish(&LifecycleEvent::TickEnd, &mut context);

            if time == CREEP_CLEANUP_INTERVAL - 1 {
                assert_eq!(context.memory.creeps.len(), 2);
            }
        }

        assert_eq!(memory.creeps.keys().collect::<Vec<_>>(), vec!["alive"]);
    }
}
