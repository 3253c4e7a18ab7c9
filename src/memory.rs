use crate::constants::*;
use crate::heap::HeapMemory;
use crate::spawnsystem::SpawnRequestMemory;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

//
// NOTE: Memory is the only state that survives between ticks. Everything else (world snapshot, tasks,
//       roles, cache) is rebuilt from it. Every record defaults missing fields so older persisted data
//       always loads.
//

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Memory {
    pub version: u32,
    /// Task id to task blob. `Null` marks a task that exists but stores no data.
    pub tasks: BTreeMap<String, serde_json::Value>,
    pub creeps: BTreeMap<String, CreepMemory>,
    pub spawn_queue: HeapMemory<SpawnRequestMemory>,
    pub rooms: BTreeMap<String, RoomMemory>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            version: MEMORY_VERSION,
            ..Default::default()
        }
    }

    /// Upgrades memory loaded from an older version in place.
    pub fn migrate(&mut self) {
        if self.version == MEMORY_VERSION {
            return;
        }

        info!("Migrating memory from version {} to {}", self.version, MEMORY_VERSION);

        //
        // NOTE: Version 1 stored the spawn queue without a name index.
        //
        if self.version < 2 {
            self.spawn_queue.rebuild_index(|entry| entry.name.as_str());
        }

        self.version = MEMORY_VERSION;
    }

    pub fn creep(&self, name: &str) -> Option<&CreepMemory> {
        self.creeps.get(name)
    }

    pub fn creep_mut(&mut self, name: &str) -> Option<&mut CreepMemory> {
        self.creeps.get_mut(name)
    }

    pub fn room_mut(&mut self, name: &str) -> &mut RoomMemory {
        self.rooms.entry(name.to_string()).or_default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreepMemory {
    pub role: Option<String>,
    pub task: Option<String>,
    pub home_room: Option<String>,
    pub source: Option<String>,
    pub container: Option<String>,
    pub working: bool,
    pub recycle: bool,
    pub last_action: Option<String>,
    /// Keys written by older code or by hand from the console.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CreepMemory {
    pub fn with_role(role: &str) -> CreepMemory {
        CreepMemory {
            role: Some(role.to_string()),
            ..Default::default()
        }
    }

    pub fn task(mut self, task: &str) -> CreepMemory {
        self.task = Some(task.to_string());
        self
    }

    pub fn home_room(mut self, room: &str) -> CreepMemory {
        self.home_room = Some(room.to_string());
        self
    }

    pub fn source(mut self, source: &str) -> CreepMemory {
        self.source = Some(source.to_string());
        self
    }

    pub fn container(mut self, container: Option<&str>) -> CreepMemory {
        self.container = container.map(|c| c.to_string());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomMemory {
    pub discovered_at: Option<u32>,
    /// Packed position of the source container or its site, so a rebuilt container lands on the same tile.
    pub storage_container_pos: Option<u32>,
    /// Packed tiles the server refused an extension site on.
    pub rejected_extension_sites: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_creep_keys_survive_round_trip() {
        let json = r#"{ "role": "boot", "highway": "W1N1", "working": true }"#;

        let memory: CreepMemory = serde_json::from_str(json).unwrap();

        assert_eq!(memory.role.as_deref(), Some("boot"));
        assert!(memory.working);
        assert_eq!(memory.extra.get("highway"), Some(&serde_json::Value::from("W1N1")));

        let encoded = serde_json::to_value(&memory).unwrap();

        assert_eq!(encoded["highway"], "W1N1");
    }

    #[test]
    fn empty_document_loads_as_default() {
        let memory: Memory = serde_json::from_str("{}").unwrap();

        assert_eq!(memory.version, 0);
        assert!(memory.tasks.is_empty());
        assert!(memory.spawn_queue.is_empty());
    }

    #[test]
    fn migrate_stamps_version() {
        let mut memory: Memory = serde_json::from_str(r#"{ "version": 1 }"#).unwrap();

        memory.migrate();

        assert_eq!(memory.version, MEMORY_VERSION);
    }
}
