use serde::{Deserialize, Serialize};

//
// NOTE: Flags are read from `Memory._features` every tick so an operator can
//       toggle them from the console. One-shot flags are cleared by the host
//       once observed.
//

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub reset: ResetFeatures,
    pub spawn_queue: SpawnQueueFeatures,
    pub construction: ConstructionFeatures,
    pub notify: NotifyFeatures,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetFeatures {
    pub environment: bool,
    pub memory: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnQueueFeatures {
    pub clear: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionFeatures {
    pub execute: bool,
}

impl Default for ConstructionFeatures {
    fn default() -> ConstructionFeatures {
        ConstructionFeatures { execute: true }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyFeatures {
    pub errors: bool,
}

impl Default for NotifyFeatures {
    fn default() -> NotifyFeatures {
        NotifyFeatures { errors: true }
    }
}

impl FeatureFlags {
    pub fn has_one_shot_flags(&self) -> bool {
        self.reset.environment || self.reset.memory || self.spawn_queue.clear
    }
}

/// Paths of flags that are reset to `false` after being observed.
pub const ONE_SHOT_FLAG_PATHS: &[&str] = &[
    "_features.reset.environment",
    "_features.reset.memory",
    "_features.spawn_queue.clear",
];
