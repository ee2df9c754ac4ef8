// Length-delimited JSON framing.
//
// Each frame is a 4-byte big-endian length followed by that many bytes of
// JSON. `write_frame`/`read_frame` serialize and deserialize protocol
// messages directly; errors are reported through `FrameError` so callers can
// tell a clean disconnect (`is_disconnect`) apart from a protocol violation.
//
// Battle envelopes are small (a few hundred bytes), so the frame limit is
// 1 MiB. Anything larger is a malformed or hostile length prefix.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Maximum accepted frame payload, in bytes.
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("frame too large: {len} bytes (max {MAX_FRAME_SIZE})")]
    TooLarge { len: usize },
    #[error("frame payload is not a valid message: {0}")]
    Json(#[from] serde_json::Error),
}

impl FrameError {
    /// True when the peer simply went away (EOF, reset, broken pipe).
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// Serialize `msg` and write it as one frame, then flush.
pub fn write_frame<W: Write, M: Serialize>(writer: &mut W, msg: &M) -> Result<(), FrameError> {
    let payload = serde_json::to_vec(msg)?;
    if payload.len() > MAX_FRAME_SIZE as usize {
        return Err(FrameError::TooLarge { len: payload.len() });
    }
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        len: payload.len(),
    })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame and deserialize it.
pub fn read_frame<R: Read, M: DeserializeOwned>(reader: &mut R) -> Result<M, FrameError> {
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix)?;
    let len = u32::from_be_bytes(prefix);
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge { len: len as usize });
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(serde_json::from_slice(&payload)?)
}
