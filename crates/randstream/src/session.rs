//! Per-connection streaming loop.
//!
//! A [`StreamSession`] is created only after its address has been admitted.
//! It answers every inbound frame with one freshly drawn value and, however
//! the loop ends, gives its address back to the registry before closing the
//! channel.

use crate::{
    Address, Admission, FrameChannel, NumberPool, RandSource, Result, ThreadRandom, U256,
    ValueFrame,
};
use std::sync::Arc;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Lifecycle of a [`StreamSession`].
///
/// `Connected -> Streaming -> Closing -> Closed`. A rejected connection never
/// gets a session, so there is no rejected state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Streaming,
    Closing,
    Closed,
}

/// Why a session stopped streaming.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed the channel or went away.
    Disconnected,
    /// Reading the next frame failed in an unexpected way.
    ReadFailed,
    /// A value frame could not be encoded or sent.
    SendFailed,
}

/// Receives session events as they happen.
///
/// Transport adapters implement this to keep live counters; every method
/// defaults to doing nothing. Calls happen on the session's task, so they
/// should return quickly.
pub trait SessionObserver: Send + Sync {
    /// The address was admitted and a session is about to stream.
    fn on_admitted(&self, _address: &Address) {}

    /// The address already had a stream and the connection was turned away.
    fn on_rejected(&self, _address: &Address) {}

    /// One value frame was delivered to the channel.
    fn on_value_sent(&self, _address: &Address) {}
}

impl SessionObserver for () {}

/// Summary of a finished session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub address: Address,
    /// Number of value frames delivered to the channel.
    pub sent: u64,
    pub end: SessionEnd,
}

/// The streaming loop for one admitted connection.
pub struct StreamSession<C, R = ThreadRandom>
where
    C: FrameChannel,
    R: RandSource<U256>,
{
    channel: C,
    address: Address,
    admission: Option<Admission>,
    pool: Arc<NumberPool<R>>,
    state: SessionState,
    sent: u64,
}

impl<C, R> StreamSession<C, R>
where
    C: FrameChannel,
    R: RandSource<U256> + Send + Sync,
{
    /// Binds an admitted address and its channel to the shared pool.
    pub fn new(channel: C, admission: Admission, pool: Arc<NumberPool<R>>) -> Self {
        Self {
            channel,
            address: admission.address().clone(),
            admission: Some(admission),
            pool,
            state: SessionState::Connected,
            sent: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Streams values until the channel fails or closes, then releases the
    /// address and closes the channel.
    ///
    /// Every failure is contained here. Whatever ended the loop, the address
    /// is admittable again by the time this returns. The session is consumed,
    /// so it can never stream again for an address it no longer holds:
    ///
    /// ```compile_fail
    /// use randstream::{FrameChannel, StreamSession};
    ///
    /// async fn twice<C: FrameChannel>(session: StreamSession<C>) {
    ///     session.run().await;
    ///     session.run().await;
    /// }
    /// ```
    pub async fn run(self) -> SessionReport {
        self.run_observed(&()).await
    }

    /// Like [`Self::run`], reporting each delivered value to `observer`.
    #[cfg_attr(feature = "tracing", instrument(skip_all, fields(address = %self.address)))]
    pub async fn run_observed<O>(mut self, observer: &O) -> SessionReport
    where
        O: SessionObserver + ?Sized,
    {
        self.state = SessionState::Streaming;
        #[cfg(feature = "tracing")]
        tracing::info!("Client connected");

        let end = self.stream(observer).await;
        self.close().await;

        SessionReport {
            address: self.address.clone(),
            sent: self.sent,
            end,
        }
    }

    async fn stream<O>(&mut self, observer: &O) -> SessionEnd
    where
        O: SessionObserver + ?Sized,
    {
        loop {
            if let Err(err) = self.channel.recv().await {
                if err.is_expected_disconnect() {
                    #[cfg(feature = "tracing")]
                    tracing::info!("Client disconnected: {err}");
                    return SessionEnd::Disconnected;
                }
                #[cfg(feature = "tracing")]
                tracing::warn!("Read failed: {err}");
                return SessionEnd::ReadFailed;
            }

            if let Err(_e) = self.send_next().await {
                #[cfg(feature = "tracing")]
                tracing::debug!("Send failed: {_e}");
                return SessionEnd::SendFailed;
            }
            observer.on_value_sent(&self.address);
        }
    }

    async fn send_next(&mut self) -> Result<()> {
        let number = self.pool.next();
        #[cfg(feature = "tracing")]
        tracing::trace!(%number, "Generated number");

        let text = ValueFrame::new(number).to_json()?;
        self.channel.send_text(text).await?;
        self.sent += 1;
        Ok(())
    }

    async fn close(&mut self) {
        self.state = SessionState::Closing;

        // Release before closing so a reconnect is not locked out while the
        // close handshake is still in flight.
        if let Some(admission) = self.admission.take() {
            admission.release();
        }

        if let Err(_e) = self.channel.close(None).await {
            #[cfg(feature = "tracing")]
            tracing::debug!("Close failed: {_e}");
        }

        self.state = SessionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Outbound, pair};
    use crate::{ChannelError, ConnectionRegistry, close_code};

    fn admit(registry: &Arc<ConnectionRegistry>, host: &str) -> Admission {
        registry.admit(Address::from(host)).expect("address should be free")
    }

    #[tokio::test]
    async fn answers_each_frame_with_one_distinct_value() {
        let registry = Arc::new(ConnectionRegistry::new());
        let pool = Arc::new(NumberPool::new(ThreadRandom));
        let (channel, mut peer) = pair();
        let session = StreamSession::new(channel, admit(&registry, "10.0.0.1"), pool);
        assert_eq!(session.state(), SessionState::Connected);

        let task = tokio::spawn(session.run());

        peer.request();
        let first: ValueFrame = serde_json::from_str(&peer.next_text().await).unwrap();
        peer.request();
        let second: ValueFrame = serde_json::from_str(&peer.next_text().await).unwrap();
        assert_ne!(first.number, second.number);

        drop(peer.inbound);
        let report = task.await.unwrap();
        assert_eq!(report.sent, 2);
        assert_eq!(report.end, SessionEnd::Disconnected);
        assert_eq!(report.address.as_str(), "10.0.0.1");
        assert_eq!(peer.outbound.recv().await, Some(Outbound::Close(None)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn going_away_is_an_expected_disconnect() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (channel, peer) = pair();
        let session = StreamSession::new(
            channel,
            admit(&registry, "10.0.0.1"),
            Arc::new(NumberPool::new(ThreadRandom)),
        );

        peer.fail(ChannelError::Closed {
            code: Some(close_code::AWAY),
            reason: String::new(),
        });
        let report = session.run().await;
        assert_eq!(report.end, SessionEnd::Disconnected);
        assert_eq!(report.sent, 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn unexpected_read_error_ends_session_and_releases_address() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (channel, peer) = pair();
        let session = StreamSession::new(
            channel,
            admit(&registry, "10.0.0.1"),
            Arc::new(NumberPool::new(ThreadRandom)),
        );

        peer.fail(ChannelError::Transport("protocol violation".into()));
        let report = session.run().await;
        assert_eq!(report.end, SessionEnd::ReadFailed);
        assert!(registry.try_admit(&Address::from("10.0.0.1")));
    }

    #[tokio::test]
    async fn send_failure_ends_session_and_releases_address() {
        let registry = Arc::new(ConnectionRegistry::new());
        let pool = Arc::new(NumberPool::new(ThreadRandom));
        let (channel, peer) = pair();
        let session = StreamSession::new(
            channel.failing_sends(),
            admit(&registry, "10.0.0.1"),
            Arc::clone(&pool),
        );

        peer.request();
        let report = session.run().await;
        assert_eq!(report.end, SessionEnd::SendFailed);
        assert_eq!(report.sent, 0);
        assert!(registry.is_empty());
        // The value was drawn before the send failed and stays retired.
        assert_eq!(pool.len(), 1);
    }
}
