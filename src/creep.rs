use crate::constants::*;
use screeps::{Part, CARRY_CAPACITY};
use serde::{Deserialize, Serialize};

pub struct SpawnBodyDefinition<'a> {
    pub maximum_energy: u32,
    pub minimum_repeat: Option<usize>,
    pub maximum_repeat: Option<usize>,
    pub pre_body: &'a [Part],
    pub repeat_body: &'a [Part],
    pub post_body: &'a [Part],
}

pub fn body_cost(body: &[Part]) -> u32 {
    body.iter().map(|p| p.cost()).sum()
}

pub fn carry_capacity(body: &[Part]) -> u32 {
    body.iter().filter(|p| **p == Part::Carry).count() as u32 * CARRY_CAPACITY
}

pub mod spawning {
    use super::*;

    /// Builds the largest body fitting the energy budget and creep size limit, or `None` if not even the
    /// minimum repeat count fits.
    pub fn create_body(definition: &SpawnBodyDefinition) -> Option<Vec<Part>> {
        let fixed_body_cost = body_cost(definition.pre_body) + body_cost(definition.post_body);

        if fixed_body_cost > definition.maximum_energy {
            return None;
        }

        let fixed_body_length = definition.pre_body.len() + definition.post_body.len();

        if fixed_body_length > MAX_CREEP_SIZE {
            return None;
        }

        let repeat_body_cost = body_cost(definition.repeat_body);

        let remaining_available_energy = definition.maximum_energy - fixed_body_cost;

        let max_possible_repeat_parts_by_cost = if repeat_body_cost > 0 {
            (remaining_available_energy / repeat_body_cost) as usize
        } else {
            0
        };

        let max_possible_repeat_parts_by_length = if !definition.repeat_body.is_empty() {
            (MAX_CREEP_SIZE - fixed_body_length) / definition.repeat_body.len()
        } else {
            0
        };

        let max_possible_repeat_parts = max_possible_repeat_parts_by_cost.min(max_possible_repeat_parts_by_length);

        let minimum_repeat = definition.minimum_repeat.unwrap_or(0);

        if max_possible_repeat_parts < minimum_repeat {
            return None;
        }

        let repeat_parts = max_possible_repeat_parts.min(definition.maximum_repeat.unwrap_or(usize::MAX));

        let full_repeat_body = definition
            .repeat_body
            .iter()
            .cycle()
            .take(repeat_parts * definition.repeat_body.len());

        let body = definition
            .pre_body
            .iter()
            .chain(full_repeat_body)
            .chain(definition.post_body.iter())
            .cloned()
            .collect::<Vec<Part>>();

        if body.is_empty() {
            None
        } else {
            Some(body)
        }
    }
}

/// Registered body builders. The tag is persisted with queued spawn requests.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyTemplate {
    Boot,
    Harvester,
    Hauler,
    Builder,
    Upgrader,
}

impl BodyTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            BodyTemplate::Boot => "boot",
            BodyTemplate::Harvester => "harvester",
            BodyTemplate::Hauler => "hauler",
            BodyTemplate::Builder => "builder",
            BodyTemplate::Upgrader => "upgrader",
        }
    }

    fn definition(&self, maximum_energy: u32) -> SpawnBodyDefinition<'static> {
        match self {
            BodyTemplate::Boot => SpawnBodyDefinition {
                maximum_energy,
                minimum_repeat: Some(1),
                maximum_repeat: Some(3),
                pre_body: &[],
                repeat_body: &[Part::Work, Part::Carry, Part::Move, Part::Move],
                post_body: &[],
            },
            BodyTemplate::Harvester => SpawnBodyDefinition {
                maximum_energy,
                minimum_repeat: Some(1),
                maximum_repeat: Some(5),
                pre_body: &[Part::Move],
                repeat_body: &[Part::Work],
                post_body: &[],
            },
            BodyTemplate::Hauler => SpawnBodyDefinition {
                maximum_energy,
                minimum_repeat: Some(1),
                maximum_repeat: Some(8),
                pre_body: &[],
                repeat_body: &[Part::Carry, Part::Move],
                post_body: &[],
            },
            BodyTemplate::Builder => SpawnBodyDefinition {
                maximum_energy,
                minimum_repeat: Some(1),
                maximum_repeat: Some(4),
                pre_body: &[],
                repeat_body: &[Part::Work, Part::Carry, Part::Move, Part::Move],
                post_body: &[],
            },
            BodyTemplate::Upgrader => SpawnBodyDefinition {
                maximum_energy,
                minimum_repeat: Some(1),
                maximum_repeat: Some(5),
                pre_body: &[],
                repeat_body: &[Part::Work, Part::Carry, Part::Move],
                post_body: &[],
            },
        }
    }

    pub fn resolve(&self, available_energy: u32) -> Option<Vec<Part>> {
        spawning::create_body(&self.definition(available_energy))
    }
}
