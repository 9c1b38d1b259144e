//! In-flight fill registry
//!
//! While a query misses the cache and computes its answer, its embedding is
//! registered here. Equivalent queries arriving meanwhile subscribe to the
//! fill instead of starting their own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::domain::embedding::Embedding;
use crate::domain::semantic_cache::CachedAnswer;

type FillSlot = Option<Arc<CachedAnswer>>;

#[derive(Debug)]
struct InFlight {
    id: u64,
    embedding: Embedding,
    receiver: watch::Receiver<FillSlot>,
}

/// Registry of fills currently in progress
#[derive(Debug, Default)]
pub struct FillRegistry {
    in_flight: Mutex<Vec<InFlight>>,
    next_id: AtomicU64,
}

/// Result of trying to become the filler for an embedding
#[derive(Debug)]
pub enum FillClaim {
    /// No equivalent fill is running; the caller must compute the answer
    Leader(FillPermit),
    /// An equivalent fill is running; wait for its answer
    Follower(FillWaiter),
}

impl FillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the most similar in-flight fill at or above `threshold`, or start one
    pub fn claim(self: &Arc<Self>, embedding: &Embedding, threshold: f32) -> FillClaim {
        let mut in_flight = self.lock();

        let joined = in_flight
            .iter()
            .filter_map(|fill| {
                embedding
                    .cosine_similarity(&fill.embedding)
                    .ok()
                    .filter(|similarity| *similarity >= threshold)
                    .map(|similarity| (fill, similarity))
            })
            .max_by(|(_, a), (_, b)| a.total_cmp(b));

        if let Some((fill, similarity)) = joined {
            return FillClaim::Follower(FillWaiter {
                receiver: fill.receiver.clone(),
                similarity,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = watch::channel(None);
        in_flight.push(InFlight {
            id,
            embedding: embedding.clone(),
            receiver,
        });

        FillClaim::Leader(FillPermit {
            registry: Arc::clone(self),
            id,
            sender,
        })
    }

    /// Number of fills in progress
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, id: u64) {
        self.lock().retain(|fill| fill.id != id);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The right to fill the cache for an embedding
///
/// Dropping the permit unregisters the fill. Waiters that have not received
/// an answer by then see the fill as abandoned.
#[derive(Debug)]
pub struct FillPermit {
    registry: Arc<FillRegistry>,
    id: u64,
    sender: watch::Sender<FillSlot>,
}

impl FillPermit {
    /// Hand the answer to every current and future waiter
    ///
    /// The fill stays registered until the permit is dropped, so queries
    /// arriving while the answer is being stored still join it.
    pub fn publish(&self, answer: Arc<CachedAnswer>) {
        self.sender.send_replace(Some(answer));
    }
}

impl Drop for FillPermit {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

/// A subscription to somebody else's fill
#[derive(Debug)]
pub struct FillWaiter {
    receiver: watch::Receiver<FillSlot>,
    similarity: f32,
}

impl FillWaiter {
    /// Similarity between the waiting query and the one being filled
    pub fn similarity(&self) -> f32 {
        self.similarity
    }

    /// Wait for the fill; `None` means it was abandoned
    pub async fn wait(mut self) -> Option<Arc<CachedAnswer>> {
        let published = self
            .receiver
            .wait_for(Option::is_some)
            .await
            .map(|slot| slot.clone());

        match published {
            Ok(answer) => answer,
            Err(_) => self.receiver.borrow().clone(),
        }
    }
}
