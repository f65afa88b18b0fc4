use crate::{
    Address, CloseFrame, ConnectionRegistry, FrameChannel, NumberPool, RandSource,
    SessionObserver, SessionReport, StreamSession, ThreadRandom, U256,
};
use std::sync::Arc;

/// How a connection handed to [`StreamService::serve`] was dealt with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The address already had a stream. The client got a close frame and no
    /// values.
    Rejected { address: Address },
    /// The connection was admitted and its session has finished.
    Completed(SessionReport),
}

/// Entry point for transport adapters.
///
/// Holds the two pieces of shared state, the admission registry and the
/// number pool, and applies the admission policy to each new channel. Both
/// are injected, so independent services (for example one per test) never
/// share state.
pub struct StreamService<R = ThreadRandom>
where
    R: RandSource<U256>,
{
    registry: Arc<ConnectionRegistry>,
    pool: Arc<NumberPool<R>>,
}

impl<R> Clone for StreamService<R>
where
    R: RandSource<U256>,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            pool: Arc::clone(&self.pool),
        }
    }
}

impl<R> StreamService<R>
where
    R: RandSource<U256> + Send + Sync,
{
    pub fn new(registry: Arc<ConnectionRegistry>, pool: Arc<NumberPool<R>>) -> Self {
        Self { registry, pool }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn pool(&self) -> &Arc<NumberPool<R>> {
        &self.pool
    }

    /// Admits `address` and streams to `channel` until it closes, or rejects
    /// the channel if `address` already has a stream.
    ///
    /// The future resolves when the connection is finished either way.
    pub async fn serve<C>(&self, channel: C, address: Address) -> ServeOutcome
    where
        C: FrameChannel,
    {
        self.serve_observed(channel, address, &()).await
    }

    /// Like [`Self::serve`], reporting the admission decision and every
    /// delivered value to `observer` as they happen.
    pub async fn serve_observed<C, O>(
        &self,
        mut channel: C,
        address: Address,
        observer: &O,
    ) -> ServeOutcome
    where
        C: FrameChannel,
        O: SessionObserver + ?Sized,
    {
        let Some(admission) = self.registry.admit(address.clone()) else {
            #[cfg(feature = "tracing")]
            tracing::info!(%address, "Connection already established");
            observer.on_rejected(&address);
            reject(&mut channel).await;
            return ServeOutcome::Rejected { address };
        };

        observer.on_admitted(&address);
        let session = StreamSession::new(channel, admission, Arc::clone(&self.pool));
        ServeOutcome::Completed(session.run_observed(observer).await)
    }
}

/// Sends the duplicate-address close frame and closes the channel.
pub async fn reject<C>(channel: &mut C)
where
    C: FrameChannel,
{
    if let Err(_e) = channel.close(Some(CloseFrame::duplicate_address())).await {
        #[cfg(feature = "tracing")]
        tracing::debug!("Failed to send rejection: {_e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Outbound, pair};
    use crate::{SessionEnd, ValueFrame};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        admitted: AtomicUsize,
        rejected: AtomicUsize,
        sent: AtomicUsize,
    }

    impl SessionObserver for Counters {
        fn on_admitted(&self, _address: &Address) {
            self.admitted.fetch_add(1, Ordering::SeqCst);
        }

        fn on_rejected(&self, _address: &Address) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }

        fn on_value_sent(&self, _address: &Address) {
            self.sent.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn service() -> StreamService {
        StreamService::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(NumberPool::new(ThreadRandom)),
        )
    }

    #[tokio::test]
    async fn duplicate_address_is_rejected_while_first_session_streams() {
        let service = service();

        // Client A connects and receives two distinct values.
        let (channel_a, mut peer_a) = pair();
        let session_a = tokio::spawn({
            let service = service.clone();
            async move { service.serve(channel_a, Address::from("10.0.0.1")).await }
        });
        peer_a.request();
        let first: ValueFrame = serde_json::from_str(&peer_a.next_text().await).unwrap();
        peer_a.request();
        let second: ValueFrame = serde_json::from_str(&peer_a.next_text().await).unwrap();
        assert_ne!(first.number.to_string(), second.number.to_string());

        // Client B from the same address gets a close frame and nothing else.
        let (channel_b, mut peer_b) = pair();
        let outcome = service.serve(channel_b, Address::from("10.0.0.1")).await;
        assert_eq!(
            outcome,
            ServeOutcome::Rejected {
                address: Address::from("10.0.0.1")
            }
        );
        assert_eq!(
            peer_b.next().await,
            Some(Outbound::Close(Some(CloseFrame::duplicate_address())))
        );
        assert_eq!(peer_b.next().await, None);

        // A is unaffected by the rejection.
        peer_a.request();
        peer_a.next_text().await;

        drop(peer_a.inbound);
        match session_a.await.unwrap() {
            ServeOutcome::Completed(report) => {
                assert_eq!(report.sent, 3);
                assert_eq!(report.end, SessionEnd::Disconnected);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn observer_sees_events_while_session_is_open() {
        let service = service();
        let counters = Arc::new(Counters::default());

        let (channel, mut peer) = pair();
        let task = tokio::spawn({
            let service = service.clone();
            let counters = Arc::clone(&counters);
            async move {
                service
                    .serve_observed(channel, Address::from("10.0.0.1"), &*counters)
                    .await
            }
        });

        peer.request();
        peer.next_text().await;
        peer.request();
        peer.next_text().await;

        // The session is still streaming; nothing waits for it to end.
        assert!(!task.is_finished());
        assert_eq!(counters.admitted.load(Ordering::SeqCst), 1);
        assert_eq!(counters.sent.load(Ordering::SeqCst), 2);

        let (duplicate, _peer_b) = pair();
        let outcome = service
            .serve_observed(duplicate, Address::from("10.0.0.1"), &*counters)
            .await;
        assert!(matches!(outcome, ServeOutcome::Rejected { .. }));
        assert_eq!(counters.rejected.load(Ordering::SeqCst), 1);

        drop(peer.inbound);
        task.await.unwrap();
        assert_eq!(counters.admitted.load(Ordering::SeqCst), 1);
        assert_eq!(counters.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn address_is_admittable_again_after_disconnect() {
        let service = service();
        let address = Address::from("10.0.0.1");

        for _ in 0..3 {
            let (channel, mut peer) = pair();
            let task = tokio::spawn({
                let service = service.clone();
                let address = address.clone();
                async move { service.serve(channel, address).await }
            });
            peer.request();
            peer.next_text().await;
            drop(peer.inbound);
            assert!(matches!(task.await.unwrap(), ServeOutcome::Completed(_)));
            assert!(!service.registry().is_active(&address));
        }
        assert_eq!(service.pool().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_admissions_from_one_address_admit_at_most_one() {
        const ATTEMPTS: usize = 16;
        let service = service();

        let mut peers = Vec::with_capacity(ATTEMPTS);
        let mut tasks = Vec::with_capacity(ATTEMPTS);
        for _ in 0..ATTEMPTS {
            let (channel, peer) = pair();
            peers.push(peer);
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service.serve(channel, Address::from("10.0.0.1")).await
            }));
        }

        // Losers finish right away; the winner streams until its peer leaves.
        while tasks.iter().filter(|t| t.is_finished()).count() < ATTEMPTS - 1 {
            tokio::task::yield_now().await;
        }
        assert_eq!(tasks.iter().filter(|t| !t.is_finished()).count(), 1);

        for (peer, task) in peers.iter_mut().zip(&tasks) {
            if task.is_finished() {
                assert_eq!(
                    peer.outbound.try_recv().ok(),
                    Some(Outbound::Close(Some(CloseFrame::duplicate_address())))
                );
            }
        }
        drop(peers);

        let mut completed = 0;
        for task in tasks {
            if let ServeOutcome::Completed(report) = task.await.unwrap() {
                assert_eq!(report.sent, 0);
                completed += 1;
            }
        }
        assert_eq!(completed, 1);
        assert!(service.registry().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn values_are_unique_across_concurrent_sessions() {
        const CLIENTS: usize = 8;
        const REQUESTS: usize = 200;
        let service = service();

        let mut clients = Vec::with_capacity(CLIENTS);
        for i in 0..CLIENTS {
            let (channel, mut peer) = pair();
            let service = service.clone();
            let address = Address::new(format!("10.0.0.{i}"));
            tokio::spawn(async move { service.serve(channel, address).await });
            clients.push(tokio::spawn(async move {
                let mut numbers = Vec::with_capacity(REQUESTS);
                for _ in 0..REQUESTS {
                    peer.request();
                    let frame: ValueFrame = serde_json::from_str(&peer.next_text().await).unwrap();
                    numbers.push(frame.number.to_string());
                }
                numbers
            }));
        }

        let mut seen = HashSet::with_capacity(CLIENTS * REQUESTS);
        for client in clients {
            for number in client.await.unwrap() {
                assert!(seen.insert(number));
            }
        }
        assert_eq!(seen.len(), CLIENTS * REQUESTS);
    }
}
