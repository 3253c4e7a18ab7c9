/// Ticks per body part for spawn duration (Screeps constant).
pub const CREEP_SPAWN_TIME: u32 = 3;
/// Lifetime of a creep without claim parts (Screeps constant).
pub const CREEP_LIFE_TIME: u32 = 1500;
pub const MAX_CREEP_SIZE: usize = 50;
pub const CONTAINER_CAPACITY: u32 = 2000;
/// Energy a spawn holds on its own, without extensions.
pub const SPAWN_ENERGY_CAPACITY: u32 = 300;

//
// Durable storage.
//

pub const MEMORY_VERSION: u32 = 2;
pub const MEMORY_SEGMENTS: &[u8] = &[50, 51, 52];
pub const MEMORY_SEGMENT_SIZE: usize = 1024 * 50;

//
// Task cadences (ticks between expensive checks).
//

pub const BOOT_ROOM_INTERVAL: u32 = 20;
pub const BOOT_SOURCE_INTERVAL: u32 = 5;
pub const HARVEST_SOURCE_INTERVAL: u32 = 10;
pub const BUILD_ROOM_INTERVAL: u32 = 25;
pub const UPGRADE_CONTROLLER_INTERVAL: u32 = 15;

//
// Task tuning.
//

/// Energy capacity at which a source moves from boot creeps to static mining.
pub const HARVEST_SOURCE_MIN_CAPACITY: u32 = 550;
/// Extra ticks of overlap added when pre-spawning a successor.
pub const PRESPAWN_MARGIN: u32 = 20;
pub const MAX_BUILDERS: u32 = 3;
pub const BUILD_POINTS_PER_BUILDER: u32 = 5000;
/// Spare storage ratio required before new construction is authorized.
pub const BUILD_ENERGY_RATIO: f32 = 0.5;
/// Backlog at or below which builders are sent to recycle.
pub const BUILD_RECYCLE_BACKLOG: u32 = 0;
pub const EXTENSION_SITE_ATTEMPTS: usize = 3;
/// Extensions allowed per controller level, indexed by level.
pub const EXTENSIONS_PER_LEVEL: [u32; 9] = [0, 0, 5, 10, 20, 30, 40, 50, 60];
pub const DAMAGED_CONTAINER_RATIO: f32 = 0.8;

//
// Spawn queue.
//

/// Maximum path cost from a spawn to a request target for the spawn to be eligible.
pub const MAX_SPAWN_TRAVEL: u32 = 200;
pub const SPAWN_TRAVEL_CACHE_TTL: u32 = 1500;
pub const SPAWN_DEFER_WARNING_TTL: u32 = 50;

//
// Cleanup.
//

pub const CREEP_CLEANUP_INTERVAL: u32 = 50;
pub const CACHE_EVICT_INTERVAL: u32 = 100;
