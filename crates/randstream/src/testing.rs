//! In-memory [`FrameChannel`] used by the session and service tests.

use crate::{ChannelError, CloseFrame, FrameChannel};
use tokio::sync::mpsc;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outbound {
    Text(String),
    Close(Option<CloseFrame>),
}

pub(crate) struct MemoryChannel {
    inbound: mpsc::UnboundedReceiver<Result<(), ChannelError>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    fail_sends: bool,
}

/// The client end of a [`MemoryChannel`].
pub(crate) struct Peer {
    pub inbound: mpsc::UnboundedSender<Result<(), ChannelError>>,
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
}

impl Peer {
    /// Sends one data frame.
    pub fn request(&self) {
        self.inbound.send(Ok(())).unwrap();
    }

    pub fn fail(&self, err: ChannelError) {
        self.inbound.send(Err(err)).unwrap();
    }

    /// Receives the next outbound frame.
    pub async fn next(&mut self) -> Option<Outbound> {
        self.outbound.recv().await
    }

    /// Receives the next frame and expects it to be a value frame.
    pub async fn next_text(&mut self) -> String {
        match self.next().await {
            Some(Outbound::Text(text)) => text,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

pub(crate) fn pair() -> (MemoryChannel, Peer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let channel = MemoryChannel {
        inbound: inbound_rx,
        outbound: outbound_tx,
        fail_sends: false,
    };
    let peer = Peer {
        inbound: inbound_tx,
        outbound: outbound_rx,
    };
    (channel, peer)
}

impl MemoryChannel {
    /// Makes every `send_text` fail, as if the client stopped reading.
    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }
}

impl FrameChannel for MemoryChannel {
    async fn recv(&mut self) -> Result<(), ChannelError> {
        self.inbound.recv().await.unwrap_or_else(|| Err(ChannelError::eof()))
    }

    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        if self.fail_sends {
            return Err(ChannelError::Transport("send failed".into()));
        }
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_| ChannelError::Transport("peer gone".into()))
    }

    async fn close(&mut self, frame: Option<CloseFrame>) -> Result<(), ChannelError> {
        self.inbound.close();
        self.outbound
            .send(Outbound::Close(frame))
            .map_err(|_| ChannelError::Transport("peer gone".into()))
    }
}
