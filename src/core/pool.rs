//! # Worker pool - per-role groups of spawned workers.
//!
//! The pool owns three groups (producers, consumers, monitors). Each group has:
//! - its own [`CancellationToken`] (force-stop for that role only)
//! - a [`TaskTracker`] used to await the group
//! - a live count, decremented by a drop guard on every exit path (ok, cancel, panic, abort)
//! - a handle registry `id → (name, AbortHandle)` used for stuck-worker reports and aborts
//!
//! ## Architecture
//! ```text
//! spawn(worker) ──► group(role)
//!                     ├─ closed?  ─► SpawnRejected, false
//!                     └─ open     ─► live += 1, register, tracker.spawn(supervise(worker))
//!
//! supervise: WorkerStarted ─► worker.run(child token) ─► WorkerStopped | WorkerCanceled
//!            (drop guard)  ─► live -= 1, unregister
//!
//! drain(group, timeout, grace):
//!   close ─► wait(timeout) ─ ok ─► graceful
//!                         └ elapsed ─► PhaseTimedOut ─► cancel token ─► wait(grace)
//!                                                          └ elapsed ─► abort survivors
//! ```
//!
//! ## Rules
//! - A closed group rejects every new spawn; the rejection is published, never panics.
//! - Emergency consumers are capped with an atomic compare-and-update, never by check-then-act.
//! - Counts only ever go down after a group is closed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    config::Tuning,
    error::{ShutdownError, WorkerError},
    events::{Bus, Event, EventKind},
    workers::{Consumer, LatencyRange, Producer, Role, WorkerDeps, WorkerRef},
};

/// How a drained group ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    /// Group that was drained (`"producers"`, `"consumers"`, `"autoscaler"`).
    pub phase: &'static str,
    /// Set when the group overran its timeout and had to be force-cancelled.
    pub timed_out: Option<ShutdownError>,
    /// Workers that ignored cancellation and were aborted.
    pub aborted: Vec<String>,
}

impl PhaseOutcome {
    fn graceful(phase: &'static str) -> Self {
        Self {
            phase,
            timed_out: None,
            aborted: Vec::new(),
        }
    }

    /// True when every worker exited within the bound on its own.
    pub fn is_graceful(&self) -> bool {
        self.timed_out.is_none()
    }
}

struct Handle {
    name: Arc<str>,
    abort: Option<AbortHandle>,
}

struct Group {
    role: Role,
    token: CancellationToken,
    tracker: TaskTracker,
    live: AtomicUsize,
    accepting: AtomicBool,
    handles: Mutex<HashMap<u64, Handle>>,
}

impl Group {
    fn new(role: Role) -> Self {
        Self {
            role,
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            live: AtomicUsize::new(0),
            accepting: AtomicBool::new(true),
            handles: Mutex::new(HashMap::new()),
        }
    }

    fn close(&self) {
        self.accepting.store(false, Ordering::Release);
        self.tracker.close();
    }

    /// Sorted names of workers still registered.
    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handles
            .lock()
            .values()
            .map(|h| h.name.to_string())
            .collect();
        names.sort_unstable();
        names
    }

    fn abort_all(&self) -> Vec<String> {
        let handles = self.handles.lock();
        let mut aborted = Vec::with_capacity(handles.len());
        for h in handles.values() {
            if let Some(abort) = &h.abort {
                abort.abort();
            }
            aborted.push(h.name.to_string());
        }
        aborted.sort_unstable();
        aborted
    }
}

/// Decrements the live count and unregisters the worker, whatever the exit path.
struct LiveGuard {
    group: Arc<Group>,
    id: u64,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.group.handles.lock().remove(&self.id);
        self.group.live.fetch_sub(1, Ordering::AcqRel);
    }
}

struct Inner {
    deps: WorkerDeps,
    offer_timeout: Duration,
    producer_latency: LatencyRange,
    consumer_latency: LatencyRange,
    scaler_stop_timeout: Duration,
    producer_force_grace: Duration,
    consumer_force_grace: Duration,
    producers: Arc<Group>,
    consumers: Arc<Group>,
    monitors: Arc<Group>,
    next_id: AtomicUsize,
    next_producer: AtomicUsize,
    next_consumer: AtomicUsize,
    emergency: AtomicUsize,
}

/// Shared handle to the running workers. Cloning is cheap.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

impl WorkerPool {
    /// Creates an empty pool that builds workers from `deps` and `tuning`.
    pub fn new(deps: WorkerDeps, tuning: &Tuning) -> Self {
        Self {
            inner: Arc::new(Inner {
                deps,
                offer_timeout: tuning.offer_timeout,
                producer_latency: tuning.producer_latency,
                consumer_latency: tuning.consumer_latency,
                scaler_stop_timeout: tuning.scaler_stop_timeout,
                producer_force_grace: tuning.producer_force_grace,
                consumer_force_grace: tuning.consumer_force_grace,
                producers: Arc::new(Group::new(Role::Producer)),
                consumers: Arc::new(Group::new(Role::Consumer)),
                monitors: Arc::new(Group::new(Role::Monitor)),
                next_id: AtomicUsize::new(0),
                next_producer: AtomicUsize::new(1),
                next_consumer: AtomicUsize::new(1),
                emergency: AtomicUsize::new(0),
            }),
        }
    }

    /// Dependencies handed to every worker built by this pool.
    pub fn deps(&self) -> &WorkerDeps {
        &self.inner.deps
    }

    fn bus(&self) -> &Bus {
        &self.inner.deps.bus
    }

    fn group(&self, role: Role) -> &Arc<Group> {
        match role {
            Role::Producer => &self.inner.producers,
            Role::Consumer => &self.inner.consumers,
            Role::Monitor => &self.inner.monitors,
        }
    }

    /// Spawns `worker` into the group of its role.
    ///
    /// Returns `false` (and publishes `SpawnRejected`) once that group is closed.
    pub fn spawn(&self, worker: WorkerRef) -> bool {
        let group = self.group(worker.role()).clone();
        if !group.accepting.load(Ordering::Acquire) {
            self.bus().publish(
                Event::new(EventKind::SpawnRejected)
                    .with_component(worker.name())
                    .with_message(format!("{} pool is shut down; not started", group.role)),
            );
            return false;
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) as u64;
        let name: Arc<str> = Arc::from(worker.name());
        group.live.fetch_add(1, Ordering::AcqRel);
        group.handles.lock().insert(
            id,
            Handle {
                name,
                abort: None,
            },
        );

        let guard = LiveGuard {
            group: group.clone(),
            id,
        };
        let ctx = group.token.child_token();
        let bus = self.bus().clone();
        let join = group.tracker.spawn(async move {
            let _guard = guard;
            supervise(worker, ctx, bus).await
        });

        // The guard may already have unregistered a fast worker; only fill in live entries.
        if let Some(h) = group.handles.lock().get_mut(&id) {
            h.abort = Some(join.abort_handle());
        }
        true
    }

    /// Starts `n` producers with `items_each` records apiece.
    pub fn start_producers(&self, n: usize, items_each: usize) -> usize {
        (0..n)
            .filter(|_| {
                let id = self.inner.next_producer.fetch_add(1, Ordering::Relaxed);
                self.spawn(Arc::new(Producer::new(
                    id,
                    items_each,
                    self.inner.producer_latency,
                    self.inner.offer_timeout,
                    self.inner.deps.clone(),
                )))
            })
            .count()
    }

    /// Starts `n` regular consumers named `Consumer-<k>`.
    pub fn start_consumers(&self, n: usize) -> usize {
        (0..n)
            .filter(|_| {
                let k = self.inner.next_consumer.fetch_add(1, Ordering::Relaxed);
                self.start_single_consumer(format!("Consumer-{k}"))
            })
            .count()
    }

    /// Starts one consumer with an explicit name.
    pub fn start_single_consumer(&self, name: impl Into<String>) -> bool {
        self.spawn(Arc::new(Consumer::new(
            name,
            self.inner.consumer_latency,
            self.inner.deps.clone(),
        )))
    }

    /// Starts an emergency consumer unless `max` were already started.
    ///
    /// Returns the 1-based emergency id on success.
    pub fn try_start_emergency_consumer(&self, max: usize) -> Option<usize> {
        let prev = self
            .inner
            .emergency
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .ok()?;
        let id = prev + 1;
        if self.start_single_consumer(format!("EmergencyConsumer-{id}")) {
            Some(id)
        } else {
            self.inner.emergency.fetch_sub(1, Ordering::AcqRel);
            None
        }
    }

    /// Cancels every running producer without closing the group.
    ///
    /// Used when a run is interrupted: phase 1 then only waits for the producers to
    /// unwind instead of letting them finish their quota.
    pub fn cancel_producers(&self) {
        self.inner.producers.token.cancel();
    }

    /// Producers currently alive.
    pub fn producer_count(&self) -> usize {
        self.inner.producers.live.load(Ordering::Acquire)
    }

    /// Consumers currently alive (regular and emergency).
    pub fn consumer_count(&self) -> usize {
        self.inner.consumers.live.load(Ordering::Acquire)
    }

    /// Emergency consumers started so far (never decremented).
    pub fn emergency_consumer_count(&self) -> usize {
        self.inner.emergency.load(Ordering::Acquire)
    }

    /// Monitors currently alive.
    pub fn monitor_count(&self) -> usize {
        self.inner.monitors.live.load(Ordering::Acquire)
    }

    /// Phase 1: stops the auto-scaler, then lets producers finish within `timeout`.
    ///
    /// Producers still running at the bound are cancelled, given the force grace, and
    /// finally aborted. Returns the producer outcome; the scaler outcome is only logged.
    pub async fn stop_producers_and_autoscaler(&self, timeout: Duration) -> PhaseOutcome {
        let monitors = &self.inner.monitors;
        monitors.close();
        monitors.token.cancel();
        let scaler = self
            .drain(monitors, "autoscaler", self.inner.scaler_stop_timeout, Duration::ZERO)
            .await;
        if !scaler.aborted.is_empty() {
            self.bus().log(
                "WorkerPool",
                format!("AutoScaler did not stop in time; aborted {:?}", scaler.aborted),
            );
        }

        self.bus().log("WorkerPool", "Waiting for producers to finish...");
        let outcome = self
            .drain(
                &self.inner.producers,
                "producers",
                timeout,
                self.inner.producer_force_grace,
            )
            .await;
        self.bus()
            .log("WorkerPool", "All producers finished. Queue can only shrink now.");
        outcome
    }

    /// Phase 3: waits up to `timeout` for consumers to drain and exit.
    pub async fn wait_for_consumers(&self, timeout: Duration) -> PhaseOutcome {
        self.bus().log(
            "WorkerPool",
            format!("Waiting up to {timeout:?} for consumers to drain queue..."),
        );
        let outcome = self
            .drain(
                &self.inner.consumers,
                "consumers",
                timeout,
                self.inner.consumer_force_grace,
            )
            .await;
        self.bus().log("WorkerPool", "All consumers have shut down.");
        outcome
    }

    async fn drain(
        &self,
        group: &Arc<Group>,
        phase: &'static str,
        timeout: Duration,
        grace: Duration,
    ) -> PhaseOutcome {
        group.close();
        if tokio::time::timeout(timeout, group.tracker.wait()).await.is_ok() {
            return PhaseOutcome::graceful(phase);
        }

        let err = ShutdownError::PhaseTimeout {
            phase,
            timeout,
            stuck: group.names(),
        };
        self.bus().publish(
            Event::new(EventKind::PhaseTimedOut)
                .with_component("WorkerPool")
                .with_message(err.to_string())
                .with_timeout(timeout),
        );
        group.token.cancel();

        let mut outcome = PhaseOutcome {
            phase,
            timed_out: Some(err),
            aborted: Vec::new(),
        };
        if tokio::time::timeout(grace, group.tracker.wait()).await.is_ok() {
            return outcome;
        }

        outcome.aborted = group.abort_all();
        for name in &outcome.aborted {
            self.bus().publish(
                Event::new(EventKind::WorkerAborted)
                    .with_component(name.as_str())
                    .with_message("did not terminate gracefully; aborted"),
            );
        }
        group.tracker.wait().await;
        outcome
    }
}

/// Runs one worker and publishes its lifecycle.
async fn supervise(worker: WorkerRef, ctx: CancellationToken, bus: Bus) {
    let name = worker.name();
    bus.publish(
        Event::new(EventKind::WorkerStarted)
            .with_component(name)
            .with_message("STARTED."),
    );

    let ev = match worker.run(ctx).await {
        Ok(()) => Event::new(EventKind::WorkerStopped).with_message(match worker.role() {
            Role::Producer => "FINISHED work.",
            _ => "SHUTDOWN complete.",
        }),
        Err(WorkerError::Canceled) => {
            Event::new(EventKind::WorkerCanceled).with_message("INTERRUPTED.")
        }
        Err(e) => Event::new(EventKind::WorkerStopped).with_message(format!("FAILED: {e}")),
    };
    bus.publish(ev.with_component(name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Message;
    use crate::workers::{Worker, test_support::deps};
    use async_trait::async_trait;

    /// Monitor that ignores its token.
    struct Stubborn;

    #[async_trait]
    impl Worker for Stubborn {
        fn name(&self) -> &str {
            "Stubborn"
        }
        fn role(&self) -> Role {
            Role::Monitor
        }
        async fn run(&self, _ctx: CancellationToken) -> Result<(), WorkerError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    struct Panicky;

    #[async_trait]
    impl Worker for Panicky {
        fn name(&self) -> &str {
            "Panicky"
        }
        fn role(&self) -> Role {
            Role::Monitor
        }
        async fn run(&self, _ctx: CancellationToken) -> Result<(), WorkerError> {
            panic!("boom")
        }
    }

    fn pool(capacity: usize) -> WorkerPool {
        WorkerPool::new(deps(capacity), &Tuning::immediate())
    }

    #[tokio::test]
    async fn test_producers_run_to_completion() {
        let pool = pool(64);
        assert_eq!(pool.start_producers(3, 5), 3);

        let out = pool.stop_producers_and_autoscaler(Duration::from_secs(5)).await;
        assert!(out.is_graceful());
        assert_eq!(pool.producer_count(), 0);
        assert_eq!(pool.deps().channel.size(), 15);
    }

    #[tokio::test]
    async fn test_closed_group_rejects_spawn() {
        let pool = pool(4);
        let mut rx = pool.deps().bus.subscribe();

        pool.stop_producers_and_autoscaler(Duration::from_millis(10)).await;
        assert_eq!(pool.start_producers(2, 1), 0);
        assert_eq!(pool.producer_count(), 0);

        let mut rejected = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::SpawnRejected {
                rejected += 1;
            }
        }
        assert_eq!(rejected, 2);
    }

    #[tokio::test]
    async fn test_emergency_cap_holds_under_contention() {
        let pool = pool(4);
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let p = pool.clone();
            tasks.push(tokio::spawn(async move { p.try_start_emergency_consumer(3) }));
        }
        let mut ids: Vec<usize> = Vec::new();
        for t in tasks {
            if let Some(id) = t.await.unwrap() {
                ids.push(id);
            }
        }
        ids.sort_unstable();

        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(pool.emergency_consumer_count(), 3);
        assert_eq!(pool.consumer_count(), 3);

        pool.deps().channel.put(Message::Shutdown).await.unwrap();
        assert!(pool.wait_for_consumers(Duration::from_secs(5)).await.is_graceful());
        assert_eq!(pool.consumer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_consumers_are_force_cancelled() {
        let pool = pool(4);
        pool.start_consumers(2);
        tokio::task::yield_now().await;

        // No sentinel: both consumers wait on an empty channel until cancelled.
        let out = pool.wait_for_consumers(Duration::from_millis(200)).await;
        match &out.timed_out {
            Some(ShutdownError::PhaseTimeout { phase, stuck, .. }) => {
                assert_eq!(*phase, "consumers");
                assert_eq!(stuck, &vec!["Consumer-1".to_string(), "Consumer-2".to_string()]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(out.aborted.is_empty());
        assert_eq!(pool.consumer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_ignoring_cancel_is_aborted() {
        let pool = pool(4);
        assert!(pool.spawn(Arc::new(Stubborn)));
        tokio::task::yield_now().await;
        assert_eq!(pool.monitor_count(), 1);

        pool.stop_producers_and_autoscaler(Duration::from_millis(10)).await;
        assert_eq!(pool.monitor_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_worker_is_still_counted_down() {
        let pool = pool(4);
        assert!(pool.spawn(Arc::new(Panicky)));

        pool.stop_producers_and_autoscaler(Duration::from_secs(1)).await;
        assert_eq!(pool.monitor_count(), 0);
    }
}
