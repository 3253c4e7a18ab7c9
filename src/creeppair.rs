use crate::constants::*;
use crate::world::*;

const ALT_SUFFIX: &str = "_alt";

/// Two creep names sharing one job so a successor can be spawned before the current holder expires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreepPair {
    name: String,
    alt_name: String,
}

impl CreepPair {
    pub fn new(base: &str) -> CreepPair {
        let base = CreepPair::base_name(base);

        CreepPair {
            name: base.to_string(),
            alt_name: format!("{}{}", base, ALT_SUFFIX),
        }
    }

    pub fn base_name(name: &str) -> &str {
        name.strip_suffix(ALT_SUFFIX).unwrap_or(name)
    }

    /// The other member of the pair `name` belongs to.
    pub fn other(name: &str) -> String {
        match name.strip_suffix(ALT_SUFFIX) {
            Some(base) => base.to_string(),
            None => format!("{}{}", name, ALT_SUFFIX),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alt_name(&self) -> &str {
        &self.alt_name
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name == name || self.alt_name == name
    }

    fn remaining_life(creep: &CreepState) -> u32 {
        //
        // NOTE: Lifetime does not count down until spawning completes.
        //
        if creep.spawning {
            CREEP_LIFE_TIME
        } else {
            creep.ticks_to_live.unwrap_or(CREEP_LIFE_TIME)
        }
    }

    pub fn active_creep_name(&self, world: &WorldState) -> &str {
        let main = world.creep(&self.name);
        let alt = world.creep(&self.alt_name);

        match (main, alt) {
            (None, Some(_)) => &self.alt_name,
            (Some(main), Some(alt)) => {
                let prefer_alt = match (main.spawning, alt.spawning) {
                    (true, false) => true,
                    (false, false) => Self::remaining_life(alt) > Self::remaining_life(main),
                    _ => false,
                };

                if prefer_alt {
                    &self.alt_name
                } else {
                    &self.name
                }
            }
            _ => &self.name,
        }
    }

    pub fn secondary_creep_name(&self, world: &WorldState) -> &str {
        if self.active_creep_name(world) == self.name {
            &self.alt_name
        } else {
            &self.name
        }
    }

    pub fn active_creep<'w>(&self, world: &'w WorldState) -> Option<&'w CreepState> {
        world.creep(self.active_creep_name(world))
    }

    pub fn active_creep_ttl(&self, world: &WorldState) -> u32 {
        self.active_creep(world).map(Self::remaining_life).unwrap_or(0)
    }

    pub fn live_creeps<'w>(&self, world: &'w WorldState) -> Vec<&'w CreepState> {
        [&self.name, &self.alt_name]
            .iter()
            .filter_map(|name| world.creep(name))
            .collect()
    }

    pub fn has_live_creep(&self, world: &WorldState) -> bool {
        world.creep(&self.name).is_some() || world.creep(&self.alt_name).is_some()
    }
}
