//! Realtime channel configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Websocket chat configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound queue length per connected channel. A channel whose queue
    /// is full misses broadcasts until it drains.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Send an `error` event back to the sender when a message is dropped.
    /// Off by default: rejected messages are only logged.
    #[serde(default)]
    pub error_events: bool,
}

impl RealtimeConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.outbound_buffer == 0 || self.outbound_buffer > 10_000 {
            return Err(ValidationError::InvalidOutboundBuffer);
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: default_outbound_buffer(),
            error_events: false,
        }
    }
}

fn default_outbound_buffer() -> usize {
    64
}
