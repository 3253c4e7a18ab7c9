use screeps::{Part, Position, RoomName, StructureType};
use screeps_overseer::cache::ServerCache;
use screeps_overseer::constants::*;
use screeps_overseer::creep::BodyTemplate;
use screeps_overseer::error::TaskError;
use screeps_overseer::game_loop::*;
use screeps_overseer::host::mock::MockHost;
use screeps_overseer::host::HostHandle;
use screeps_overseer::memory::{CreepMemory, Memory};
use screeps_overseer::serialize::*;
use screeps_overseer::spawnsystem::*;
use screeps_overseer::tasks::tasksystem::TaskRegistry;
use screeps_overseer::world::*;

fn room_name() -> RoomName {
    "W1N1".parse().unwrap()
}

fn pos(x: u8, y: u8) -> Position {
    position(x, y, room_name()).unwrap()
}

fn boot_world(time: u32, energy: u32) -> WorldState {
    let mut room = RoomState::new(room_name());

    room.energy_available = energy;
    room.energy_capacity_available = SPAWN_ENERGY_CAPACITY;
    room.controller = Some(ControllerState {
        id: "ctrl".into(),
        pos: pos(40, 40),
        my: true,
        level: 1,
        progress: 0,
        progress_total: 200,
    });
    room.sources.push(SourceState {
        id: "src1".into(),
        pos: pos(20, 20),
        energy: 3000,
        energy_capacity: 3000,
        open_positions: vec![pos(21, 21), pos(19, 21)],
    });
    room.spawns.push(SpawnState {
        id: "spawn0".into(),
        name: "Spawn0".into(),
        pos: pos(25, 25),
        spawning: false,
        active: true,
        energy: 300,
        energy_capacity: 300,
    });

    let mut world = WorldState {
        time,
        ..Default::default()
    };

    world.rooms.insert(room_name(), room);

    world
}

fn stored_memory(host: &MockHost) -> Memory {
    let data = host.state().memory.clone().unwrap_or_default();

    decode_memory(&data).unwrap()
}

fn run_ticks(environment: &mut Option<Environment>, host: &MockHost, handle: &HostHandle, ticks: u32) {
    for _ in 0..ticks {
        tick(environment, handle).unwrap();

        host.advance(1);
    }
}

#[test]
fn fresh_room_boots_without_double_spawning() {
    let host = MockHost::new(boot_world(100, 300));
    let handle = host.handle();
    let mut environment = None;

    run_ticks(&mut environment, &host, &handle, 41);

    assert_eq!(host.spawned_names(), vec!["boot-src1".to_string()]);

    let sites = host.state().sites.clone();

    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].1, StructureType::Container);

    let memory = stored_memory(&host);

    for id in ["BootRoom.W1N1", "BootSource.src1", "UpgradeController.W1N1", "BuildRoom.W1N1"] {
        assert!(memory.tasks.contains_key(id), "missing task {}", id);
    }

    assert_eq!(memory.rooms.get("W1N1").and_then(|room| room.discovered_at), Some(100));

    let boot_memory = memory.creeps.get("boot-src1").unwrap();

    assert_eq!(boot_memory.role.as_deref(), Some("boot"));
    assert_eq!(boot_memory.task.as_deref(), Some("BootSource.src1"));
    assert_eq!(boot_memory.source.as_deref(), Some("src1"));
}

#[test]
fn expiring_creep_is_succeeded_by_its_pair() {
    let mut world = boot_world(100, 300);

    world.rooms.get_mut(&room_name()).unwrap().structures.push(StructureState {
        id: "cont1".into(),
        structure_type: StructureType::Container,
        pos: pos(21, 21),
        hits: 250000,
        hits_max: 250000,
        energy: 0,
        energy_capacity: CONTAINER_CAPACITY,
    });

    world.creeps.insert(
        "boot-src1".into(),
        CreepState {
            name: "boot-src1".into(),
            pos: pos(21, 20),
            spawning: false,
            ticks_to_live: Some(20),
            energy: 0,
            energy_capacity: 50,
            body: vec![Part::Work, Part::Carry, Part::Move, Part::Move],
        },
    );

    let mut memory = Memory::new();

    memory.tasks.insert("BootSource.src1".into(), serde_json::Value::Null);
    memory.room_mut("W1N1").discovered_at = Some(1);
    memory.creeps.insert(
        "boot-src1".into(),
        CreepMemory::with_role("boot").task("BootSource.src1").home_room("W1N1").source("src1"),
    );

    let host = MockHost::new(world);

    host.state().memory = Some(encode_memory(&memory).unwrap());

    let handle = host.handle();
    let mut environment = None;

    run_ticks(&mut environment, &host, &handle, 1);

    //
    // Queued ahead of time, but not spawned until its window opens.
    //
    let queued = stored_memory(&host);

    assert!(queued.spawn_queue.iter().any(|entry| entry.name == "boot-src1_alt"));
    assert!(host.spawned_names().is_empty());

    run_ticks(&mut environment, &host, &handle, 30);

    assert_eq!(host.spawned_names(), vec!["boot-src1_alt".to_string()]);

    let state = host.state();

    assert!(!state.world.creeps.contains_key("boot-src1"));
    assert!(state.world.creeps.contains_key("boot-src1_alt"));
}

#[test]
fn reload_depends_only_on_memory_and_world() {
    let seed = MockHost::new(boot_world(100, 300));
    let seed_handle = seed.handle();
    let mut seed_environment = None;

    run_ticks(&mut seed_environment, &seed, &seed_handle, 3);

    let memory = seed.state().memory.clone();
    let world = seed.state().world.clone();

    let run_fresh = || {
        let host = MockHost::new(world.clone());

        host.state().memory = memory.clone();

        let handle = host.handle();
        let mut environment = None;

        run_ticks(&mut environment, &host, &handle, 10);

        let memory = stored_memory(&host);
        let state = host.state();

        (memory, state.spawns.clone(), state.actions.clone(), state.sites.clone())
    };

    assert_eq!(run_fresh(), run_fresh());
}

#[test]
fn memory_survives_environment_reset() {
    let host = MockHost::new(boot_world(100, 300));
    let handle = host.handle();
    let mut environment = None;

    run_ticks(&mut environment, &host, &handle, 3);

    let mut before = stored_memory(&host);

    //
    // A request left over from the previous process must not survive the restart.
    //
    {
        let world = host.state().world.clone();
        let mut cache = ServerCache::new();
        let mut queue = SpawnQueue::new(&mut before.spawn_queue);

        queue
            .push(SpawnRequest::new("stale", BodyTemplate::Boot, SpawnPriority::Boot, pos(25, 26), 10_000), &world, &host, &mut cache)
            .unwrap();
    }

    host.state().memory = Some(encode_memory(&before).unwrap());

    //
    // Skipped ticks mean the server process was restarted.
    //
    host.advance(5);

    run_ticks(&mut environment, &host, &handle, 1);

    let after = stored_memory(&host);

    assert_eq!(after.tasks.keys().collect::<Vec<_>>(), before.tasks.keys().collect::<Vec<_>>());
    assert_eq!(after.rooms, before.rooms);
    assert!(!after.spawn_queue.iter().any(|entry| entry.name == "stale"));
    assert_eq!(environment.as_ref().and_then(|environment| environment.tick()), Some(108));
}

#[test]
fn memory_reset_flag_starts_over() {
    let host = MockHost::new(boot_world(100, 300));
    let handle = host.handle();
    let mut environment = None;

    run_ticks(&mut environment, &host, &handle, 3);

    let before = stored_memory(&host);

    assert!(before.creeps.contains_key("boot-src1"));
    assert_eq!(before.rooms.get("W1N1").and_then(|room| room.discovered_at), Some(100));

    host.state().features.reset.memory = true;

    run_ticks(&mut environment, &host, &handle, 1);

    let memory = stored_memory(&host);

    assert!(!host.state().features.reset.memory);
    assert!(memory.creeps.is_empty());
    assert!(memory.tasks.contains_key("BootRoom.W1N1"));
    assert_eq!(memory.rooms.get("W1N1").and_then(|room| room.discovered_at), Some(103));
}

#[test]
fn execution_waits_for_durable_storage() {
    let host = MockHost::new(boot_world(100, 300));
    let handle = host.handle();
    let mut environment = None;

    host.state().memory_ready = false;

    run_ticks(&mut environment, &host, &handle, 2);

    assert!(host.state().memory.is_none());
    assert!(host.spawned_names().is_empty());

    host.state().memory_ready = true;

    run_ticks(&mut environment, &host, &handle, 1);

    assert!(stored_memory(&host).tasks.contains_key("BootRoom.W1N1"));
}

#[test]
fn corrupt_store_recovers_with_fresh_memory() {
    let host = MockHost::new(boot_world(100, 300));

    host.state().memory = Some("definitely not memory".to_string());

    let handle = host.handle();
    let mut environment = None;

    run_ticks(&mut environment, &host, &handle, 1);

    let memory = stored_memory(&host);

    assert_eq!(memory.version, MEMORY_VERSION);
    assert!(memory.tasks.contains_key("BootRoom.W1N1"));
}

#[test]
fn repeated_task_creation_is_rejected() {
    let world = boot_world(100, 300);
    let registry = TaskRegistry::with_default_tasks();
    let mut memory = Memory::new();

    registry
        .create(&mut memory, &world, "BootRoom", "W1N1", serde_json::Value::Null)
        .unwrap();

    let result = registry.create(&mut memory, &world, "BootRoom", "W1N1", serde_json::Value::Null);

    assert!(matches!(result, Err(TaskError::NameExists(id)) if id == "BootRoom.W1N1"));
    assert_eq!(memory.tasks.len(), 1);
}
