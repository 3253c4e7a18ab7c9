use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    #[error("Duplicate heap key: {0}")]
    DuplicateKey(String),

    #[error("Heap was not constructed with a key function")]
    Unkeyed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnQueueError {
    #[error("Spawn request name already queued: {0}")]
    NameExists(String),

    #[error("No body could be resolved for spawn request: {0}")]
    NoBody(String),

    #[error("No spawn can reach the target of spawn request: {0}")]
    Unreachable(String),

    #[error(transparent)]
    Heap(#[from] HeapError),
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task already exists: {0}")]
    NameExists(String),

    #[error("Unknown task class: {0}")]
    UnknownClass(String),

    #[error("Malformed task id: {0}")]
    MalformedId(String),

    #[error("Task memory for {id} is corrupt: {source}")]
    Memory {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Spawn(#[from] SpawnQueueError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

/// Result codes of atomic engine commands, minus success.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ActionError {
    #[error("not in range")]
    NotInRange,

    #[error("no path")]
    NoPath,

    #[error("busy")]
    Busy,

    #[error("not enough resources")]
    NotEnoughResources,

    #[error("invalid target")]
    InvalidTarget,

    #[error("full")]
    Full,

    #[error("name exists")]
    NameExists,

    #[error("not owner")]
    NotOwner,

    #[error("tired")]
    Tired,

    #[error("engine error code {0}")]
    Other(i32),
}

#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Compression error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Error, Debug)]
pub enum TickError {
    #[error("Failed to persist memory: {0}")]
    Persist(#[from] SerializeError),
}
