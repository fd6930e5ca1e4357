use thiserror::Error;

/// Reading the current scope failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnknownScope {
    #[error("no scope has been entered yet")]
    Unset,

    #[error("scope `{0}` has no registered states")]
    Unregistered(&'static str),

    #[error("scope registry has been torn down")]
    TornDown,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown scope: {0}")]
    UnknownScope(#[from] UnknownScope),

    #[error("State value could not be narrowed to `{expected}`")]
    Narrowing { expected: &'static str },

    /// Raised by a registered handler, passed through untouched.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl DispatchError {
    pub fn unknown_scope(&self) -> Option<UnknownScope> {
        match self {
            DispatchError::UnknownScope(reason) => Some(*reason),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Watcher task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("Event buffer is full")]
    Full,

    #[error("Event source is closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Configuration error: {key}={value:?} is not valid")]
    Invalid { key: &'static str, value: String },
}
