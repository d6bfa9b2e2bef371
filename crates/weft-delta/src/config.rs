//! Replica configuration.

/// Configuration for a delta replica.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaConfig {
    /// Deltas held before the oldest are dropped in favour of full-state sync.
    pub buffer_size: usize,
    /// Re-buffer deltas received from peers so they reach replicas this one
    /// syncs with. Sequence types need this unless every replica talks to
    /// every other one directly.
    pub forward_remote_deltas: bool,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            forward_remote_deltas: true,
        }
    }
}

impl ReplicaConfig {
    pub fn builder() -> ReplicaConfigBuilder {
        ReplicaConfigBuilder::new()
    }
}

/// Builder for replica configuration.
pub struct ReplicaConfigBuilder {
    config: ReplicaConfig,
}

impl ReplicaConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ReplicaConfig::default(),
        }
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn forward_remote_deltas(mut self, enabled: bool) -> Self {
        self.config.forward_remote_deltas = enabled;
        self
    }

    pub fn build(self) -> ReplicaConfig {
        self.config
    }
}

impl Default for ReplicaConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
