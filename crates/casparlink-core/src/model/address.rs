use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A `channel-layer` pair on the playout device.
///
/// The device keeps independent foreground/background state per address,
/// which is why the dispatcher serializes commands per address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelLayerAddress {
    /// 1-based output channel.
    pub channel: u32,
    /// Layer within the channel. `0` is a valid layer.
    pub layer: u32,
}

impl ChannelLayerAddress {
    pub const fn new(channel: u32, layer: u32) -> Self {
        Self { channel, layer }
    }

    /// Channels are numbered from 1 on the device.
    pub fn validate(self) -> Result<Self, CoreError> {
        if self.channel == 0 {
            return Err(CoreError::invalid("channel must be 1 or greater"));
        }
        Ok(self)
    }
}

impl fmt::Display for ChannelLayerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.channel, self.layer)
    }
}
