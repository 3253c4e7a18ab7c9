use screeps::{Part, Position, RoomCoordinate, RoomName, StructureType};
use std::collections::HashMap;

//
// NOTE: The world state is a plain-data snapshot of everything visible this tick. It is rebuilt by the
//       host at the start of every tick and is never persisted. Spawning creeps are inserted by the spawn
//       queue as it commits so later readers in the same tick observe the change.
//

pub fn position(x: u8, y: u8, room_name: RoomName) -> Option<Position> {
    let x = RoomCoordinate::new(x).ok()?;
    let y = RoomCoordinate::new(y).ok()?;

    Some(Position::new(x, y, room_name))
}

pub fn offset_position(pos: Position, dx: i32, dy: i32) -> Option<Position> {
    let x = pos.x().u8() as i32 + dx;
    let y = pos.y().u8() as i32 + dy;

    if !(0..50).contains(&x) || !(0..50).contains(&y) {
        return None;
    }

    position(x as u8, y as u8, pos.room_name())
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControllerState {
    pub id: String,
    pub pos: Position,
    pub my: bool,
    pub level: u8,
    pub progress: u32,
    pub progress_total: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceState {
    pub id: String,
    pub pos: Position,
    pub energy: u32,
    pub energy_capacity: u32,
    /// Walkable tiles adjacent to the source.
    pub open_positions: Vec<Position>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpawnState {
    pub id: String,
    pub name: String,
    pub pos: Position,
    pub spawning: bool,
    pub active: bool,
    pub energy: u32,
    pub energy_capacity: u32,
}

impl SpawnState {
    pub fn is_idle(&self) -> bool {
        self.active && !self.spawning
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructureState {
    pub id: String,
    pub structure_type: StructureType,
    pub pos: Position,
    pub hits: u32,
    pub hits_max: u32,
    pub energy: u32,
    pub energy_capacity: u32,
}

impl StructureState {
    pub fn free_capacity(&self) -> u32 {
        self.energy_capacity.saturating_sub(self.energy)
    }

    pub fn is_damaged(&self, ratio: f32) -> bool {
        self.hits_max > 0 && (self.hits as f32) < (self.hits_max as f32) * ratio
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstructionSiteState {
    pub id: String,
    pub structure_type: StructureType,
    pub pos: Position,
    pub progress: u32,
    pub progress_total: u32,
}

impl ConstructionSiteState {
    pub fn remaining(&self) -> u32 {
        self.progress_total.saturating_sub(self.progress)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DroppedEnergyState {
    pub id: String,
    pub pos: Position,
    pub amount: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreepState {
    pub name: String,
    pub pos: Position,
    pub spawning: bool,
    pub ticks_to_live: Option<u32>,
    pub energy: u32,
    pub energy_capacity: u32,
    pub body: Vec<Part>,
}

impl CreepState {
    pub fn free_capacity(&self) -> u32 {
        self.energy_capacity.saturating_sub(self.energy)
    }

    pub fn is_full(&self) -> bool {
        self.energy_capacity > 0 && self.energy >= self.energy_capacity
    }

    pub fn is_empty(&self) -> bool {
        self.energy == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoomState {
    pub name: RoomName,
    pub energy_available: u32,
    pub energy_capacity_available: u32,
    pub controller: Option<ControllerState>,
    pub sources: Vec<SourceState>,
    pub spawns: Vec<SpawnState>,
    pub structures: Vec<StructureState>,
    pub construction_sites: Vec<ConstructionSiteState>,
    pub dropped_energy: Vec<DroppedEnergyState>,
}

impl RoomState {
    pub fn new(name: RoomName) -> RoomState {
        RoomState {
            name,
            energy_available: 0,
            energy_capacity_available: 0,
            controller: None,
            sources: Vec::new(),
            spawns: Vec::new(),
            structures: Vec::new(),
            construction_sites: Vec::new(),
            dropped_energy: Vec::new(),
        }
    }

    pub fn is_owned(&self) -> bool {
        self.controller.as_ref().map(|c| c.my).unwrap_or(false)
    }

    pub fn controller_level(&self) -> u8 {
        self.controller.as_ref().filter(|c| c.my).map(|c| c.level).unwrap_or(0)
    }

    pub fn source(&self, id: &str) -> Option<&SourceState> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn structures_of_type(&self, structure_type: StructureType) -> impl Iterator<Item = &StructureState> {
        self.structures.iter().filter(move |s| s.structure_type == structure_type)
    }

    pub fn structure(&self, id: &str) -> Option<&StructureState> {
        self.structures.iter().find(|s| s.id == id)
    }

    pub fn container_near(&self, pos: Position, range: u32) -> Option<&StructureState> {
        self.structures_of_type(StructureType::Container)
            .find(|s| s.pos.get_range_to(pos) <= range)
    }

    pub fn site_near(&self, pos: Position, range: u32, structure_type: StructureType) -> Option<&ConstructionSiteState> {
        self.construction_sites
            .iter()
            .find(|s| s.structure_type == structure_type && s.pos.get_range_to(pos) <= range)
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.structures.iter().any(|s| s.pos == pos)
            || self.construction_sites.iter().any(|s| s.pos == pos)
            || self.spawns.iter().any(|s| s.pos == pos)
            || self.sources.iter().any(|s| s.pos == pos)
            || self.controller.as_ref().map(|c| c.pos == pos).unwrap_or(false)
    }

    pub fn construction_backlog(&self) -> u32 {
        self.construction_sites.iter().map(|s| s.remaining()).sum()
    }

    /// Spawns and extensions that can still accept energy.
    pub fn energy_sinks(&self) -> Vec<(String, Position)> {
        let spawns = self
            .spawns
            .iter()
            .filter(|s| s.energy < s.energy_capacity)
            .map(|s| (s.id.clone(), s.pos));

        let extensions = self
            .structures_of_type(StructureType::Extension)
            .filter(|s| s.free_capacity() > 0)
            .map(|s| (s.id.clone(), s.pos));

        spawns.chain(extensions).collect()
    }

    /// Fraction of container and storage capacity currently holding energy. Falls back to spawn and extension
    /// energy when the room has no storage structures yet.
    pub fn stored_energy_ratio(&self) -> f32 {
        let (stored, capacity) = self
            .structures
            .iter()
            .filter(|s| s.structure_type == StructureType::Container || s.structure_type == StructureType::Storage)
            .fold((0u32, 0u32), |(stored, capacity), s| (stored + s.energy, capacity + s.energy_capacity));

        if capacity > 0 {
            stored as f32 / capacity as f32
        } else if self.energy_capacity_available > 0 {
            self.energy_available as f32 / self.energy_capacity_available as f32
        } else {
            0.0
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldState {
    pub time: u32,
    pub rooms: HashMap<RoomName, RoomState>,
    pub creeps: HashMap<String, CreepState>,
}

impl WorldState {
    pub fn room(&self, name: RoomName) -> Option<&RoomState> {
        self.rooms.get(&name)
    }

    pub fn room_mut(&mut self, name: RoomName) -> Option<&mut RoomState> {
        self.rooms.get_mut(&name)
    }

    pub fn owned_rooms(&self) -> impl Iterator<Item = &RoomState> {
        self.rooms.values().filter(|r| r.is_owned())
    }

    pub fn creep(&self, name: &str) -> Option<&CreepState> {
        self.creeps.get(name)
    }

    pub fn find_source(&self, id: &str) -> Option<(&RoomState, &SourceState)> {
        self.rooms
            .values()
            .find_map(|room| room.source(id).map(|source| (room, source)))
    }

    pub fn spawns(&self) -> impl Iterator<Item = (&RoomState, &SpawnState)> {
        self.rooms
            .values()
            .filter(|room| room.is_owned())
            .flat_map(|room| room.spawns.iter().map(move |spawn| (room, spawn)))
    }
}
