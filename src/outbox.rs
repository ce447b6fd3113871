//! Non-blocking send queues between the capture pipelines and the session.
//!
//! A capture tick must never wait on the network. Each pipeline owns an
//! [`Outbox`] in front of a writer task, and at most one item is outstanding
//! at a time: from the moment an offer is accepted until the writer's send
//! returns, every further offer is dropped and counted.

use crate::events::{AudioChunk, VideoFrame};
use crate::gemini::GeminiError;
use crate::transport::Session;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Producer side of a bounded send queue.
#[derive(Debug)]
pub struct Outbox<T> {
    tx: mpsc::Sender<T>,
    busy: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl<T> Clone for Outbox<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            busy: self.busy.clone(),
            dropped: self.dropped.clone(),
        }
    }
}

/// Consumer side of an [`Outbox`].
#[derive(Debug)]
pub struct OutboxReceiver<T> {
    rx: mpsc::Receiver<T>,
    busy: Arc<AtomicBool>,
}

impl<T> OutboxReceiver<T> {
    /// Takes the outstanding item and frees the slot.
    pub async fn recv(&mut self) -> Option<T> {
        let item = self.rx.recv().await;
        self.release();
        item
    }

    pub fn try_recv(&mut self) -> Result<T, mpsc::error::TryRecvError> {
        let item = self.rx.try_recv()?;
        self.release();
        Ok(item)
    }

    fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl<T> Outbox<T> {
    pub fn channel() -> (Self, OutboxReceiver<T>) {
        let (tx, rx) = mpsc::channel(1);
        let busy = Arc::new(AtomicBool::new(false));
        (
            Self {
                tx,
                busy: busy.clone(),
                dropped: Arc::new(AtomicU64::new(0)),
            },
            OutboxReceiver { rx, busy },
        )
    }

    /// Queues `item` if nothing is outstanding. Returns false when it was dropped.
    pub fn offer(&self, item: T) -> bool {
        if self.busy.swap(true, Ordering::AcqRel) {
            self.count_drop();
            return false;
        }
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.count_drop();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.busy.store(false, Ordering::Release);
                false
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn count_drop(&self) {
        let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        if total.is_power_of_two() {
            debug!("Send still in flight, {} items dropped so far", total);
        }
    }
}

/// Media the capture pipelines hand to the session.
#[async_trait]
pub trait Outgoing: Send + 'static {
    const KIND: &'static str;

    async fn send_via(self, session: &dyn Session) -> Result<(), GeminiError>;
}

#[async_trait]
impl Outgoing for AudioChunk {
    const KIND: &'static str = "audio";

    async fn send_via(self, session: &dyn Session) -> Result<(), GeminiError> {
        session.send_audio(&self).await
    }
}

#[async_trait]
impl Outgoing for VideoFrame {
    const KIND: &'static str = "video";

    async fn send_via(self, session: &dyn Session) -> Result<(), GeminiError> {
        session.send_image(&self).await
    }
}

/// Drains `rx` into the session until the token fires or every producer is gone.
///
/// The slot stays claimed while a send is pending, so a stalled socket holds
/// exactly one item.
pub fn spawn_writer<T: Outgoing>(
    mut rx: OutboxReceiver<T>,
    session: Arc<dyn Session>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("{} writer task started", T::KIND);
        let mut sent: u64 = 0;
        loop {
            let item = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                item = rx.rx.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };
            let outcome = item.send_via(session.as_ref()).await;
            rx.release();
            match outcome {
                Ok(()) => sent += 1,
                Err(e) => warn!("Failed to send {}: {}", T::KIND, e),
            }
        }
        info!("{} writer task stopped after {} sends", T::KIND, sent);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSession, StalledSession};

    #[test]
    fn test_offer_drops_when_slot_taken() {
        let (outbox, _rx) = Outbox::<u32>::channel();
        assert!(outbox.offer(1));
        assert!(!outbox.offer(2));
        assert!(!outbox.offer(3));
        assert_eq!(outbox.dropped(), 2);
    }

    #[test]
    fn test_taking_the_item_frees_the_slot() {
        let (outbox, mut rx) = Outbox::<u32>::channel();
        assert!(outbox.offer(1));
        assert_eq!(rx.try_recv().unwrap(), 1);
        assert!(outbox.offer(2));
        assert!(!outbox.clone().offer(3));
        assert_eq!(outbox.dropped(), 1);
    }

    #[tokio::test]
    async fn test_stalled_send_holds_a_single_item() {
        let session = Arc::new(StalledSession::default());
        let (outbox, rx) = Outbox::channel();
        let token = CancellationToken::new();
        let handle = spawn_writer(rx, session.clone() as Arc<dyn Session>, token.clone());

        let mut accepted = 0;
        for _ in 0..5 {
            if outbox.offer(AudioChunk { pcm: vec![0, 0] }) {
                accepted += 1;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(session.attempts(), 1);
        assert_eq!(accepted, 1);
        assert_eq!(outbox.dropped(), 4);
        token.cancel();
        handle.abort();
    }

    #[tokio::test]
    async fn test_completed_send_frees_the_slot() {
        let session = Arc::new(FakeSession::default());
        let (outbox, rx) = Outbox::channel();
        let token = CancellationToken::new();
        let handle = spawn_writer(rx, session.clone() as Arc<dyn Session>, token.clone());

        for _ in 0..3 {
            assert!(outbox.offer(AudioChunk { pcm: vec![0, 0] }));
            while outbox.busy.load(Ordering::Acquire) {
                tokio::task::yield_now().await;
            }
        }
        drop(outbox);
        handle.await.unwrap();

        assert_eq!(session.audio_sent(), 3);
    }

    #[tokio::test]
    async fn test_offer_after_receiver_gone_is_not_counted() {
        let (outbox, rx) = Outbox::<u32>::channel();
        drop(rx);
        assert!(!outbox.offer(1));
        assert_eq!(outbox.dropped(), 0);
    }

    #[tokio::test]
    async fn test_writer_forwards_to_session() {
        let session = Arc::new(FakeSession::default());
        let (outbox, rx) = Outbox::channel();
        let token = CancellationToken::new();
        let handle = spawn_writer(rx, session.clone() as Arc<dyn Session>, token.clone());

        assert!(outbox.offer(AudioChunk { pcm: vec![0, 0] }));
        drop(outbox);
        handle.await.unwrap();

        assert_eq!(session.audio_sent(), 1);
    }
}
