use tracing::info;

use crate::error::ConfigError;
use crate::lifecycle::LifecycleState;

const ACTIVE_STATE_VAR: &str = "SCOPED_STATE_ACTIVE_STATE";
const BUFFER_CAPACITY_VAR: &str = "SCOPED_STATE_BUFFER_CAPACITY";

/// Watcher settings: when events are consumed, and how many may wait while paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Events are consumed only while the lifecycle is at least this state.
    pub active_state: LifecycleState,
    /// Capacity of the channel built by [`StateWatcher::channel`](crate::StateWatcher::channel).
    pub buffer_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            active_state: LifecycleState::Started,
            buffer_capacity: 64,
        }
    }
}

impl WatcherConfig {
    /// Load from environment variables (and a `.env` file, if present).
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        info!(
            active_state = %config.active_state,
            buffer_capacity = config.buffer_capacity,
            "Loaded watcher config"
        );
        Ok(config)
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ACTIVE_STATE_VAR) {
            config.active_state = value.parse().map_err(|_| ConfigError::Invalid {
                key: ACTIVE_STATE_VAR,
                value,
            })?;
        }

        if let Some(value) = lookup(BUFFER_CAPACITY_VAR) {
            config.buffer_capacity = match value.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: BUFFER_CAPACITY_VAR,
                        value,
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn with_active_state(mut self, state: LifecycleState) -> Self {
        self.active_state = state;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }
}
