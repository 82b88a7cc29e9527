//! # BoundedChannel: fixed-capacity FIFO with fair backpressure.
//!
//! One exclusive section guards the buffer. Two FIFO wait queues sit in front of
//! it, both [`tokio::sync::Semaphore`]s:
//!
//! ```text
//!   put/offer ──► [slots: space-available waiters] ──┐
//!                                                    ├──► Mutex<VecDeque<T>>
//!   take/poll ──► [items: data-available waiters]  ──┘
//!
//! put:  acquire slot ─► lock { push_back; items += 1 }   (wakes one taker)
//! take: acquire item ─► lock { pop_front; slots += 1 }   (wakes one putter)
//! ```
//!
//! ## Rules
//! - `slots + items-in-flight + len == capacity` at every point, so `0 <= len <= capacity`.
//! - Permits are only released while the buffer lock is held.
//! - Tokio semaphores hand released permits to the **oldest** waiter first and never
//!   let a newcomer barge past queued waiters: service is first-blocked, first-served.
//! - Every operation is cancel-safe. A dropped `put`/`take`/`offer`/`poll` future either
//!   never obtained its permit (no change) or already completed (nothing is split across
//!   an await point).

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::error::{ChannelError, ConfigError};

/// Fixed-capacity FIFO channel shared by producers and consumers.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use queuevisor::BoundedChannel;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let chan = BoundedChannel::new(2).unwrap();
/// chan.put("A").await.unwrap();
/// chan.put("B").await.unwrap();
/// assert!(!chan.offer("C", Duration::from_millis(10)).await.unwrap());
/// assert_eq!(chan.take().await, "A");
/// assert!(chan.offer("C", Duration::from_millis(10)).await.unwrap());
/// # }
/// ```
#[derive(Debug)]
pub struct BoundedChannel<T> {
    buf: Mutex<VecDeque<T>>,
    slots: Semaphore,
    items: Semaphore,
    capacity: usize,
}

impl<T> BoundedChannel<T> {
    /// Creates an empty channel holding at most `capacity` items.
    ///
    /// Fails with [`ConfigError::NonPositive`] for `0` and
    /// [`ConfigError::CapacityTooLarge`] above [`Semaphore::MAX_PERMITS`].
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::NonPositive {
                field: "queue_capacity",
                value: capacity,
            });
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(ConfigError::CapacityTooLarge {
                capacity,
                max: Semaphore::MAX_PERMITS,
            });
        }
        Ok(Self {
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            slots: Semaphore::new(capacity),
            items: Semaphore::new(0),
            capacity,
        })
    }

    /// Appends `item` at the tail, waiting for space if the channel is full.
    ///
    /// Absent items (`None`) are rejected with [`ChannelError::InvalidItem`]
    /// before any waiting.
    pub async fn put<I: Into<Option<T>>>(&self, item: I) -> Result<(), ChannelError> {
        let item = item.into().ok_or(ChannelError::InvalidItem)?;
        acquire(&self.slots).await;
        self.push(item);
        Ok(())
    }

    /// Removes and returns the head, waiting for data if the channel is empty.
    pub async fn take(&self) -> T {
        acquire(&self.items).await;
        self.pop()
    }

    /// Like [`put`](Self::put), but gives up after `timeout`.
    ///
    /// Returns `Ok(false)` if no space was freed in time; the item is dropped and the
    /// channel is unchanged. A zero timeout still succeeds when space is available.
    pub async fn offer<I: Into<Option<T>>>(
        &self,
        item: I,
        timeout: Duration,
    ) -> Result<bool, ChannelError> {
        let item = item.into().ok_or(ChannelError::InvalidItem)?;
        match tokio::time::timeout(timeout, acquire(&self.slots)).await {
            Ok(()) => {
                self.push(item);
                Ok(true)
            }
            Err(_elapsed) => Ok(false),
        }
    }

    /// Like [`take`](Self::take), but returns `None` if nothing arrives within `timeout`.
    pub async fn poll(&self, timeout: Duration) -> Option<T> {
        match tokio::time::timeout(timeout, acquire(&self.items)).await {
            Ok(()) => Some(self.pop()),
            Err(_elapsed) => None,
        }
    }

    /// Current occupancy (snapshot).
    pub fn size(&self) -> usize {
        self.buf.lock().len()
    }

    /// Maximum occupancy.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Occupancy divided by capacity, in `[0.0, 1.0]`.
    #[inline]
    pub fn load(&self) -> f64 {
        self.size() as f64 / self.capacity as f64
    }

    /// Caller must own a forgotten slot permit.
    fn push(&self, item: T) {
        let mut buf = self.buf.lock();
        buf.push_back(item);
        self.items.add_permits(1);
    }

    /// Caller must own a forgotten item permit.
    fn pop(&self) -> T {
        let mut buf = self.buf.lock();
        let Some(item) = buf.pop_front() else {
            unreachable!("item permit granted for an empty buffer");
        };
        self.slots.add_permits(1);
        item
    }
}

/// Waits for one permit and consumes it; the permit is returned by the opposite operation.
async fn acquire(sem: &Semaphore) {
    match sem.acquire().await {
        Ok(permit) => permit.forget(),
        Err(_closed) => unreachable!("channel semaphores are never closed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::{Instant, sleep};

    #[test]
    fn test_zero_capacity_rejected() {
        let err = BoundedChannel::<u32>::new(0).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositive { value: 0, .. }));
    }

    #[test]
    fn test_capacity_above_permit_limit_rejected() {
        let err = BoundedChannel::<u32>::new(Semaphore::MAX_PERMITS + 1).unwrap_err();
        assert_eq!(err.as_label(), "config_capacity_too_large");
    }

    #[tokio::test]
    async fn test_fifo_order_single_producer_single_consumer() {
        let chan = BoundedChannel::new(8).unwrap();
        for i in 0..8 {
            chan.put(i).await.unwrap();
        }
        for i in 0..8 {
            assert_eq!(chan.take().await, i);
        }
        assert!(chan.is_empty());
    }

    #[tokio::test]
    async fn test_absent_item_rejected_without_state_change() {
        let chan = BoundedChannel::<u32>::new(1).unwrap();
        assert_eq!(chan.put(None).await, Err(ChannelError::InvalidItem));
        assert_eq!(chan.size(), 0);

        chan.put(1).await.unwrap();
        // Rejected immediately even though the channel is full.
        let started = Instant::now();
        let res = chan.offer(None, Duration::from_secs(5)).await;
        assert_eq!(res, Err(ChannelError::InvalidItem));
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(chan.size(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offer_times_out_on_full_channel() {
        let chan = BoundedChannel::new(1).unwrap();
        chan.put("A").await.unwrap();

        let started = Instant::now();
        let ok = chan.offer("B", Duration::from_millis(500)).await.unwrap();
        let waited = started.elapsed();

        assert!(!ok);
        assert!(waited >= Duration::from_millis(500), "waited {waited:?}");
        assert!(waited < Duration::from_millis(600), "waited {waited:?}");
        assert_eq!(chan.size(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_on_empty_channel() {
        let chan = BoundedChannel::<u32>::new(1).unwrap();

        let started = Instant::now();
        assert_eq!(chan.poll(Duration::from_millis(500)).await, None);
        let waited = started.elapsed();

        assert!(waited >= Duration::from_millis(500), "waited {waited:?}");
        assert!(waited < Duration::from_millis(600), "waited {waited:?}");
        assert_eq!(chan.size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_two_offer_scenario() {
        let chan = BoundedChannel::new(2).unwrap();
        chan.put("A").await.unwrap();
        chan.put("B").await.unwrap();
        assert_eq!(chan.size(), 2);

        let started = Instant::now();
        assert!(!chan.offer("C", Duration::from_millis(500)).await.unwrap());
        assert!(started.elapsed() >= Duration::from_millis(500));

        assert_eq!(chan.take().await, "A");
        assert_eq!(chan.size(), 1);

        let started = Instant::now();
        assert!(chan.offer("C", Duration::from_millis(500)).await.unwrap());
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(chan.size(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_blocks_until_item_arrives() {
        let chan = Arc::new(BoundedChannel::new(1).unwrap());
        let taker = {
            let chan = Arc::clone(&chan);
            tokio::spawn(async move {
                let started = Instant::now();
                let item = chan.take().await;
                (item, started.elapsed())
            })
        };

        sleep(Duration::from_millis(300)).await;
        assert!(!taker.is_finished());
        chan.put(42).await.unwrap();

        let (item, waited) = taker.await.unwrap();
        assert_eq!(item, 42);
        assert!(waited >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_blocks_until_space_is_freed() {
        let chan = Arc::new(BoundedChannel::new(1).unwrap());
        chan.put(1).await.unwrap();

        let putter = {
            let chan = Arc::clone(&chan);
            tokio::spawn(async move {
                let started = Instant::now();
                chan.put(2).await.unwrap();
                started.elapsed()
            })
        };

        sleep(Duration::from_millis(300)).await;
        assert!(!putter.is_finished());
        assert_eq!(chan.size(), 1);

        assert_eq!(chan.take().await, 1);
        let waited = putter.await.unwrap();
        assert!(waited >= Duration::from_millis(300));
        assert_eq!(chan.take().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_takers_served_in_arrival_order() {
        let chan = Arc::new(BoundedChannel::new(4).unwrap());
        let mut takers = Vec::new();
        for id in 0..4u32 {
            let chan = Arc::clone(&chan);
            takers.push(tokio::spawn(async move { (id, chan.take().await) }));
            sleep(Duration::from_millis(1)).await;
        }

        for item in 0..4u32 {
            chan.put(item).await.unwrap();
            sleep(Duration::from_millis(1)).await;
        }

        for t in takers {
            let (id, item) = t.await.unwrap();
            assert_eq!(id, item, "taker {id} was overtaken");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_putters_served_in_arrival_order() {
        let chan = Arc::new(BoundedChannel::new(1).unwrap());
        chan.put(0u32).await.unwrap();

        let mut putters = Vec::new();
        for id in 1..=4u32 {
            let chan = Arc::clone(&chan);
            putters.push(tokio::spawn(async move { chan.put(id).await.unwrap() }));
            sleep(Duration::from_millis(1)).await;
        }

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(chan.take().await);
            sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        for p in putters {
            p.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_take_leaves_channel_untouched() {
        let chan = BoundedChannel::new(1).unwrap();
        let res = tokio::time::timeout(Duration::from_millis(10), chan.take()).await;
        assert!(res.is_err());

        chan.put(7).await.unwrap();
        assert_eq!(chan.size(), 1);
        assert_eq!(chan.poll(Duration::ZERO).await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_put_leaves_channel_untouched() {
        let chan = BoundedChannel::new(1).unwrap();
        chan.put(1).await.unwrap();

        let res = tokio::time::timeout(Duration::from_millis(10), chan.put(2)).await;
        assert!(res.is_err());
        assert_eq!(chan.size(), 1);

        assert_eq!(chan.take().await, 1);
        assert_eq!(chan.size(), 0);
        assert_eq!(chan.poll(Duration::from_millis(10)).await, None);
    }

    #[tokio::test]
    async fn test_load_ratio() {
        let chan = BoundedChannel::new(4).unwrap();
        assert_eq!(chan.load(), 0.0);
        chan.put(1).await.unwrap();
        chan.put(2).await.unwrap();
        chan.put(3).await.unwrap();
        assert_eq!(chan.load(), 0.75);
        assert_eq!(chan.capacity(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_size_stays_within_capacity_under_contention() {
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

        const WORKERS: usize = 4;
        const ITEMS: usize = 2_000;

        let chan = Arc::new(BoundedChannel::new(3).unwrap());
        let done = Arc::new(AtomicBool::new(false));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let watcher = tokio::spawn({
            let (chan, done, max_seen) = (chan.clone(), done.clone(), max_seen.clone());
            async move {
                while !done.load(Ordering::Acquire) {
                    let size = chan.size();
                    assert!(size <= chan.capacity(), "size {size} over capacity");
                    max_seen.fetch_max(size, Ordering::Relaxed);
                    tokio::task::yield_now().await;
                }
            }
        });

        let putters: Vec<_> = (0..WORKERS)
            .map(|w| {
                let chan = chan.clone();
                tokio::spawn(async move {
                    for i in 0..ITEMS {
                        chan.put(w * ITEMS + i).await.unwrap();
                    }
                })
            })
            .collect();
        let takers: Vec<_> = (0..WORKERS)
            .map(|_| {
                let chan = chan.clone();
                tokio::spawn(async move {
                    for _ in 0..ITEMS {
                        chan.take().await;
                    }
                })
            })
            .collect();

        for h in putters.into_iter().chain(takers) {
            h.await.unwrap();
        }
        done.store(true, Ordering::Release);
        watcher.await.unwrap();

        assert_eq!(chan.size(), 0);
        assert!(max_seen.load(Ordering::Relaxed) <= 3);
    }
}
