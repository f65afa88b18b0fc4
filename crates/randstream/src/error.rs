//! Error types for stream sessions.
//!
//! None of these errors escape a session: the session loop maps each one to a
//! [`SessionEnd`](crate::SessionEnd) and releases its address. The
//! distinction between an expected disconnect and any other channel failure
//! only decides how loudly the end of a session is logged.

use crate::frame::close_code;
use std::io;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Failure reported by a [`FrameChannel`](crate::FrameChannel).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ChannelError {
    /// The peer closed the channel, with or without a close frame.
    #[error("channel closed (code: {code:?}, reason: {reason:?})")]
    Closed { code: Option<u16>, reason: String },

    /// The underlying connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Any other transport or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChannelError {
    /// End of stream without a close frame.
    pub fn eof() -> Self {
        Self::Closed {
            code: None,
            reason: String::new(),
        }
    }

    /// Returns `true` for the ordinary ways a client goes away: a close frame
    /// with normal, going-away, no-status or abnormal code, a stream that ends
    /// without a close frame, or a connection that is reset mid-stream.
    pub fn is_expected_disconnect(&self) -> bool {
        match self {
            Self::Closed { code: None, .. } => true,
            // 1005 and 1006 are reserved and never valid on the wire; a peer
            // sending them only changes how loudly its exit is logged.
            Self::Closed {
                code: Some(code), ..
            } => matches!(
                *code,
                close_code::NORMAL
                    | close_code::AWAY
                    | close_code::NO_STATUS
                    | close_code::ABNORMAL
            ),
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            Self::Transport(_) => false,
        }
    }
}

/// Unified error type for the streaming core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}
