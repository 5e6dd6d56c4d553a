//! Line framing for AMCP.
//!
//! Commands go out as one `\r\n`-terminated line. Replies come back as a
//! status line `<code> <text>`, optionally followed by data lines:
//!
//! - `201` carries exactly one data line,
//! - `200` carries data lines up to an empty line,
//! - every other code is a single line.
//!
//! That is all the protocol knowledge this crate has. Payload meaning is
//! left to the caller.

use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, LinesCodec};

use crate::connector::DeviceIo;
use crate::error::Error;

/// Longest reply line accepted before the link is considered corrupt.
const MAX_LINE_LENGTH: usize = 64 * 1024;

// ── Reply ────────────────────────────────────────────────────────────

/// One complete reply from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit status code, e.g. `202`.
    pub code: u16,
    /// Status text after the code, e.g. `"PLAY OK"`.
    pub message: String,
    /// Data lines for `200` / `201` replies.
    pub data: Vec<String>,
}

impl Reply {
    /// `2xx` replies mean the device applied the command.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Parse a status line into `(code, message)`.
    pub fn parse_status(line: &str) -> Result<(u16, String), Error> {
        let line = line.trim();
        let (code, message) = line.split_once(' ').unwrap_or((line, ""));

        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::MalformedReply { line: line.into() });
        }

        let code = code
            .parse::<u16>()
            .map_err(|_| Error::MalformedReply { line: line.into() })?;
        Ok((code, message.trim().to_owned()))
    }
}

// ── CommandWriter ────────────────────────────────────────────────────

/// Write half of a device link.
pub struct CommandWriter {
    inner: WriteHalf<Box<dyn DeviceIo>>,
}

impl CommandWriter {
    pub(crate) fn new(inner: WriteHalf<Box<dyn DeviceIo>>) -> Self {
        Self { inner }
    }

    /// Write one command line and flush it.
    pub async fn send(&mut self, command: &str) -> Result<(), Error> {
        if command.contains(['\r', '\n']) {
            return Err(Error::InvalidCommand {
                reason: "command must be a single line".into(),
            });
        }

        let mut frame = Vec::with_capacity(command.len() + 2);
        frame.extend_from_slice(command.as_bytes());
        frame.extend_from_slice(b"\r\n");

        self.inner.write_all(&frame).await?;
        self.inner.flush().await?;
        tracing::trace!(command, "command written");
        Ok(())
    }

    /// Close the write side. Errors are ignored; the link is going away.
    pub async fn shutdown(&mut self) {
        let _ = self.inner.shutdown().await;
    }
}

// ── ReplyReader ──────────────────────────────────────────────────────

/// Read half of a device link.
pub struct ReplyReader {
    lines: FramedRead<ReadHalf<Box<dyn DeviceIo>>, LinesCodec>,
}

impl ReplyReader {
    pub(crate) fn new(inner: ReadHalf<Box<dyn DeviceIo>>) -> Self {
        Self {
            lines: FramedRead::new(inner, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
        }
    }

    /// Read the next complete reply.
    ///
    /// Returns `Ok(None)` when the device closes the connection cleanly
    /// between replies.
    pub async fn next_reply(&mut self) -> Result<Option<Reply>, Error> {
        let status = loop {
            match self.next_line().await? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => {}
                Some(line) => break line,
            }
        };

        let (code, message) = Reply::parse_status(&status)?;
        let mut data = Vec::new();

        match code {
            201 => data.push(self.next_line().await?.ok_or(Error::Closed)?),
            200 => loop {
                let line = self.next_line().await?.ok_or(Error::Closed)?;
                if line.is_empty() {
                    break;
                }
                data.push(line);
            },
            _ => {}
        }

        Ok(Some(Reply {
            code,
            message,
            data,
        }))
    }

    async fn next_line(&mut self) -> Result<Option<String>, Error> {
        match self.lines.next().await {
            None => Ok(None),
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e.into()),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
