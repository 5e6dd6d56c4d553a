// ── Command API ──
//
// High-level playout intents. A `Command` is built per request, validated,
// rendered to a device line by `amcp`, and dropped once its outcome has
// been reported.

pub mod amcp;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::ChannelLayerAddress;

pub use amcp::DeviceCommand;

/// A playout intent against one channel-layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Start playing `locator` in the foreground.
    Play {
        address: ChannelLayerAddress,
        locator: String,
        #[serde(default, rename = "loop")]
        looping: bool,
    },
    /// Stop foreground playback.
    Stop { address: ChannelLayerAddress },
    /// Remove everything from the layer.
    Clear { address: ChannelLayerAddress },
    /// Cue `locator` in the background, optionally taking it on end-of-clip.
    LoadBackground {
        address: ChannelLayerAddress,
        locator: String,
        #[serde(default)]
        auto: bool,
    },
    /// Play a named input from the routing config.
    Route {
        address: ChannelLayerAddress,
        input_id: String,
    },
}

/// Discriminant of a [`Command`], carried on events.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    Play,
    Stop,
    Clear,
    LoadBackground,
    Route,
}

/// What a command carries besides its address, as reported on events.
/// Only the fields its kind uses are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub looping: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_id: Option<String>,
}

impl Command {
    pub fn address(&self) -> ChannelLayerAddress {
        match self {
            Self::Play { address, .. }
            | Self::Stop { address }
            | Self::Clear { address }
            | Self::LoadBackground { address, .. }
            | Self::Route { address, .. } => *address,
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Play { .. } => CommandKind::Play,
            Self::Stop { .. } => CommandKind::Stop,
            Self::Clear { .. } => CommandKind::Clear,
            Self::LoadBackground { .. } => CommandKind::LoadBackground,
            Self::Route { .. } => CommandKind::Route,
        }
    }

    pub fn params(&self) -> CommandParams {
        match self {
            Self::Play {
                locator, looping, ..
            } => CommandParams {
                locator: Some(locator.clone()),
                looping: Some(*looping),
                ..CommandParams::default()
            },
            Self::LoadBackground { locator, auto, .. } => CommandParams {
                locator: Some(locator.clone()),
                auto: Some(*auto),
                ..CommandParams::default()
            },
            Self::Route { input_id, .. } => CommandParams {
                input_id: Some(input_id.clone()),
                ..CommandParams::default()
            },
            Self::Stop { .. } | Self::Clear { .. } => CommandParams::default(),
        }
    }

    /// Shape checks that need no config or device state.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.address().validate()?;
        match self {
            Self::Play { locator, .. } | Self::LoadBackground { locator, .. } => {
                if locator.trim().is_empty() {
                    return Err(CoreError::invalid("file is required"));
                }
            }
            Self::Route { input_id, .. } => {
                if input_id.trim().is_empty() {
                    return Err(CoreError::invalid("source is required"));
                }
            }
            Self::Stop { .. } | Self::Clear { .. } => {}
        }
        Ok(())
    }
}
