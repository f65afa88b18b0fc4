use crate::{ChannelError, CloseFrame};
use core::future::Future;

/// A bidirectional framed connection to one client.
///
/// This is the seam between the streaming core and a transport. A transport
/// adapter owns the protocol upgrade and hands the core an implementation of
/// this trait; the core never sees sockets or HTTP types. Ping/pong and other
/// control traffic are the transport's business and are not surfaced as
/// frames.
///
/// The returned futures are `Send` so a session can run on a multi-threaded
/// runtime.
pub trait FrameChannel: Send {
    /// Waits for the next inbound data frame. Its payload is discarded; the
    /// frame only signals that the client wants another value.
    ///
    /// A peer close or end of stream is reported as [`ChannelError::Closed`].
    fn recv(&mut self) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Sends one text frame.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Closes the channel, first sending `frame` if one is given.
    fn close(
        &mut self,
        frame: Option<CloseFrame>,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;
}
