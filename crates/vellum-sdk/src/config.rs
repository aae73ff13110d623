//! Session configuration.

use std::time::Duration;

/// Configuration for an editor session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Buffered steps required before `sync` submits a batch. 1 submits
    /// whenever the wire is free.
    pub flush_threshold: usize,
    /// How often the session should heartbeat to stay un-evicted.
    pub heartbeat_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            flush_threshold: 1,
            heartbeat_interval: Duration::from_secs(10),
        }
    }
}

/// Builder for session configuration.
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    pub fn flush_threshold(mut self, steps: usize) -> Self {
        self.config.flush_threshold = steps.max(1);
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = SessionConfigBuilder::new()
            .flush_threshold(4)
            .heartbeat_interval(Duration::from_secs(3))
            .build();
        assert_eq!(config.flush_threshold, 4);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_flush_threshold_floor() {
        let config = SessionConfigBuilder::new().flush_threshold(0).build();
        assert_eq!(config.flush_threshold, 1);
    }
}
