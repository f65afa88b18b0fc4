use axum::extract::ws::{self, Message, WebSocket};
use futures::SinkExt;
use randstream::{ChannelError, CloseFrame, FrameChannel};
use std::io;

/// A [`FrameChannel`] over an upgraded axum [`WebSocket`].
///
/// Text and binary messages count as inbound frames. Ping and pong are
/// answered by the WebSocket layer itself and are skipped here.
pub struct WsChannel {
    socket: WebSocket,
    /// Set once the peer's close frame has been read. The WebSocket layer has
    /// queued the reply by then; it goes out on the next flush.
    peer_closed: bool,
}

impl WsChannel {
    pub fn new(socket: WebSocket) -> Self {
        Self {
            socket,
            peer_closed: false,
        }
    }
}

impl FrameChannel for WsChannel {
    async fn recv(&mut self) -> Result<(), ChannelError> {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Text(_) | Message::Binary(_))) => return Ok(()),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    self.peer_closed = true;
                    return Err(peer_closed(frame));
                }
                Some(Err(err)) => return Err(classify(err)),
                None => return Err(ChannelError::eof()),
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .map_err(classify)
    }

    async fn close(&mut self, frame: Option<CloseFrame>) -> Result<(), ChannelError> {
        // A second close frame after the peer's would be refused, and the
        // queued reply would never be flushed. Closing the sink flushes it, and
        // without a frame of our own it sends an empty close.
        match frame {
            Some(frame) if !self.peer_closed => {
                let frame = ws::CloseFrame {
                    code: frame.code,
                    reason: frame.reason.into_owned().into(),
                };
                self.socket
                    .send(Message::Close(Some(frame)))
                    .await
                    .map_err(classify)
            }
            _ => SinkExt::close(&mut self.socket).await.map_err(classify),
        }
    }
}

fn peer_closed(frame: Option<ws::CloseFrame>) -> ChannelError {
    match frame {
        Some(frame) => ChannelError::Closed {
            code: Some(frame.code),
            reason: frame.reason.to_string(),
        },
        None => ChannelError::Closed {
            code: None,
            reason: String::new(),
        },
    }
}

/// Maps an axum WebSocket error onto the core taxonomy.
///
/// The WebSocket error type is not public, so connection-level failures are
/// recognized by the `io::Error` somewhere in the source chain.
fn classify(err: axum::Error) -> ChannelError {
    let inner = err.into_inner();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&*inner);
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return ChannelError::Io(io::Error::new(io_err.kind(), io_err.to_string()));
        }
        source = err.source();
    }
    ChannelError::Transport(inner.to_string())
}
