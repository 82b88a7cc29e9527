//! # Live status: snapshots and the console dashboard.
//!
//! [`StatusProbe`] reads the channel, pool and metrics without taking part in the
//! pipeline. [`Dashboard`] renders a probe on a fixed interval:
//!
//! ```text
//!  [SYSTEM STATUS] Queue: [########------------]   4/10 | Producers: 4 | Consumers: 2 | Total In: 31 | Total Out: 27
//! ```
//!
//! Frames start with `\r` and no newline, so each one overwrites the last.

use std::io::Write;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::WorkerPool;

const BAR_LEN: usize = 20;

/// Point-in-time view of the running system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub size: usize,
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    pub emergency_consumers: usize,
    pub produced: u64,
    pub consumed: u64,
}

impl StatusSnapshot {
    /// Renders one dashboard frame.
    ///
    /// # Example
    /// ```
    /// use queuevisor::StatusSnapshot;
    ///
    /// let s = StatusSnapshot {
    ///     size: 5, capacity: 10, producers: 2, consumers: 1,
    ///     emergency_consumers: 0, produced: 7, consumed: 2,
    /// };
    /// assert!(s.render().contains("[##########----------]   5/10"));
    /// ```
    pub fn render(&self) -> String {
        let fill = if self.capacity == 0 {
            0
        } else {
            (self.size * BAR_LEN / self.capacity).min(BAR_LEN)
        };
        let bar = format!("[{}{}]", "#".repeat(fill), "-".repeat(BAR_LEN - fill));
        format!(
            "\r [SYSTEM STATUS] Queue: {bar:<22} {:>3}/{} | Producers: {} | Consumers: {} | Total In: {} | Total Out: {}",
            self.size, self.capacity, self.producers, self.consumers, self.produced, self.consumed
        )
    }
}

/// Read-only view over a running pool.
#[derive(Clone)]
pub struct StatusProbe {
    pool: WorkerPool,
}

impl StatusProbe {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let deps = self.pool.deps();
        StatusSnapshot {
            size: deps.channel.size(),
            capacity: deps.channel.capacity(),
            producers: self.pool.producer_count(),
            consumers: self.pool.consumer_count(),
            emergency_consumers: self.pool.emergency_consumer_count(),
            produced: deps.metrics.total_produced(),
            consumed: deps.metrics.total_consumed(),
        }
    }
}

/// Console dashboard task.
pub struct Dashboard {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Dashboard {
    /// Starts printing a frame every `interval` (first frame immediately).
    pub fn spawn(probe: StatusProbe, interval: Duration) -> Self {
        let token = CancellationToken::new();
        let stop = token.clone();
        let handle = tokio::spawn(async move {
            println!("\n\n");
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => print_frame(&probe.snapshot()),
                }
            }
            print_frame(&probe.snapshot());
            println!("\n=== DASHBOARD CLOSED ===");
        });
        Self { token, handle }
    }

    /// Stops the ticker, prints the final frame and waits for the task.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

fn print_frame(snapshot: &StatusSnapshot) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(snapshot.render().as_bytes());
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Message;
    use crate::config::Tuning;
    use crate::workers::{Record, test_support::deps};

    #[test]
    fn test_bar_bounds() {
        let mut s = StatusSnapshot {
            size: 0,
            capacity: 3,
            producers: 0,
            consumers: 0,
            emergency_consumers: 0,
            produced: 0,
            consumed: 0,
        };
        assert!(s.render().contains("[--------------------]   0/3 |"));
        s.size = 3;
        assert!(s.render().contains("[####################]   3/3 |"));
        s.size = 1;
        // 1/3 of 20 truncates to 6.
        assert!(s.render().contains("[######--------------]"));
    }

    #[tokio::test]
    async fn test_snapshot_reflects_pool() {
        let pool = WorkerPool::new(deps(4), &Tuning::immediate());
        pool.deps()
            .channel
            .put(Message::Payload(Record::new(1, 1)))
            .await
            .unwrap();
        pool.deps().metrics.record_production();

        let snap = StatusProbe::new(pool).snapshot();
        assert_eq!(snap.size, 1);
        assert_eq!(snap.capacity, 4);
        assert_eq!(snap.produced, 1);
        assert_eq!(snap.consumers, 0);
    }
}
