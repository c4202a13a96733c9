// Domain-level errors for protocol workflows.

#[derive(Debug)]
pub enum StoreError {
    SessionNotFound,
    SessionAlreadyExists,
    SessionFull,
    Backend(String),
}

#[derive(Debug)]
pub enum EngineError {
    NotEntitled,
    NoSnapshotYet,
    Store(StoreError),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::SessionNotFound => write!(f, "session not found"),
            StoreError::SessionAlreadyExists => write!(f, "session already exists"),
            StoreError::SessionFull => write!(f, "session full"),
            StoreError::Backend(message) => write!(f, "backend error: {message}"),
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotEntitled => write!(f, "not entitled"),
            EngineError::NoSnapshotYet => write!(f, "no snapshot yet"),
            EngineError::Store(error) => write!(f, "store error: {error}"),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        EngineError::Store(error)
    }
}
