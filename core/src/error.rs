use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("capacity exceeded for {what}: needed {needed}, available {available}")]
    CapacityExceeded {
        what:      &'static str,
        needed:    usize,
        available: usize,
    },

    #[error("no snapshot resident for tick {tick}")]
    SnapshotNotFound { tick: u64 },

    #[error("a snapshot for tick {tick} already exists")]
    SnapshotExists { tick: u64 },

    #[error("entity {0} is not alive")]
    EntityNotAlive(crate::types::EntityId),

    #[error("type '{0}' is not registered for snapshots")]
    TypeNotRegistered(&'static str),

    #[error("missing precondition: {0}")]
    MissingPrecondition(&'static str),

    #[error("determinism violation: snapshots for ticks {tick_a} and {tick_b} differ")]
    DeterminismViolation { tick_a: u64, tick_b: u64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
