// AMCP rendering.
//
// Turns a validated `Command` into the single line written to the device.
// Route commands need their input resolved first; the resolved expression
// is emitted verbatim after the address.

use std::fmt;

use super::Command;
use crate::error::CoreError;
use crate::routing::RouteExpression;

/// One rendered AMCP command line, without the line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand(String);

impl DeviceCommand {
    /// Render `command`. `route` must be `Some` for `Command::Route`.
    pub fn render(command: &Command, route: Option<&RouteExpression>) -> Result<Self, CoreError> {
        let line = match command {
            Command::Play {
                address,
                locator,
                looping,
            } => {
                let mut line = format!("PLAY {address} {}", quote(locator));
                if *looping {
                    line.push_str(" LOOP");
                }
                line
            }
            Command::Stop { address } => format!("STOP {address}"),
            Command::Clear { address } => format!("CLEAR {address}"),
            Command::LoadBackground {
                address,
                locator,
                auto,
            } => {
                let mut line = format!("LOADBG {address} {}", quote(locator));
                if *auto {
                    line.push_str(" AUTO");
                }
                line
            }
            Command::Route { address, input_id } => {
                let route = route.ok_or_else(|| {
                    CoreError::Internal(format!("route for input {input_id} was not resolved"))
                })?;
                format!("PLAY {address} {}", route.as_str())
            }
        };

        if line.contains(['\r', '\n']) {
            return Err(CoreError::invalid("command text must not contain line breaks"));
        }
        Ok(Self(line))
    }

    /// Wrap a raw line, e.g. for handshakes.
    pub fn raw(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
