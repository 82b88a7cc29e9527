use std::time::Duration;

use tokio_util::sync::CancellationToken;

use queuevisor::{
    Completion, Config, EngineBuilder, LatencyRange, ShutdownError, ShutdownState, Tuning,
};

fn config(p: usize, i: usize, c: usize, q: usize, tuning: Tuning) -> Config {
    Config::new(p, i, c, q).unwrap().with_tuning(tuning).unwrap()
}

fn cancel_after(d: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let t = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(d).await;
        t.cancel();
    });
    token
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn early_stop_drains_everything_that_was_produced() {
    let tuning = Tuning {
        producer_latency: LatencyRange::fixed(Duration::from_millis(1)),
        consumer_latency: LatencyRange::fixed(Duration::from_millis(2)),
        ..Tuning::immediate()
    };
    let engine = EngineBuilder::new(config(3, 10_000, 1, 4, tuning))
        .build()
        .unwrap();

    let summary = engine.run(&cancel_after(Duration::from_millis(300))).await;
    engine.close().await;

    assert_eq!(summary.completion, Completion::Cancelled);
    assert!(!summary.is_success());
    // Producers were stopped mid-run; consumers still drained every item ahead of the sentinel.
    assert_eq!(summary.consumed, summary.produced);
    assert_eq!(summary.final_size, 1);
    assert_eq!(summary.producers_alive, 0);
    assert_eq!(summary.consumers_alive, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn autoscaler_never_exceeds_three_emergency_consumers() {
    let tuning = Tuning {
        consumer_latency: LatencyRange::fixed(Duration::from_millis(20)),
        scale_interval: Duration::from_millis(25),
        ..Tuning::immediate()
    };
    let engine = EngineBuilder::new(config(4, 60, 1, 4, tuning))
        .build()
        .unwrap();

    let summary = engine.run(&CancellationToken::new()).await;
    engine.close().await;

    assert!(summary.emergency_consumers >= 1);
    assert!(summary.emergency_consumers <= 3);
    assert_eq!(summary.consumed, summary.produced);
    assert_eq!(summary.consumers_alive, 0);
    assert_eq!(summary.final_size, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_shutdown_calls_share_one_report() {
    let engine = EngineBuilder::new(config(2, 20, 2, 4, Tuning::immediate()))
        .build()
        .unwrap();
    engine.start();

    let (a, b) = tokio::join!(engine.shutdown(), engine.shutdown());
    let c = engine.shutdown().await;

    assert_eq!(a.elapsed, b.elapsed);
    assert_eq!(a.elapsed, c.elapsed);
    assert_eq!(engine.shutdown_state(), ShutdownState::Terminated);
    assert_eq!(engine.pool().producer_count(), 0);
    assert_eq!(engine.pool().consumer_count(), 0);
    assert_eq!(engine.pool().deps().channel.size(), 1);
    engine.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_consumer_is_force_cancelled_after_drain_timeout() {
    let tuning = Tuning {
        consumer_latency: LatencyRange::fixed(Duration::from_secs(60)),
        consumer_drain_timeout: Duration::from_millis(200),
        consumer_force_grace: Duration::from_secs(1),
        ..Tuning::immediate()
    };
    let engine = EngineBuilder::new(config(1, 3, 1, 10, tuning))
        .build()
        .unwrap();

    let summary = engine.run(&cancel_after(Duration::from_millis(100))).await;
    engine.close().await;

    let report = &summary.shutdown;
    assert!(report.producers.is_graceful());
    assert!(report.sentinel.is_none());
    assert!(matches!(
        report.consumers.timed_out,
        Some(ShutdownError::PhaseTimeout { phase: "consumers", .. })
    ));
    assert!(report.consumers.aborted.is_empty());
    assert!(!summary.is_clean_shutdown());
    assert_eq!(summary.consumers_alive, 0);
    assert_eq!(summary.consumed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dropped_items_end_the_run_once_producers_finish() {
    let tuning = Tuning {
        offer_timeout: Duration::from_millis(5),
        consumer_latency: LatencyRange::fixed(Duration::from_millis(50)),
        max_emergency_consumers: 0,
        ..Tuning::immediate()
    };
    let engine = EngineBuilder::new(config(2, 20, 1, 1, tuning))
        .build()
        .unwrap();

    let summary = engine.run(&CancellationToken::new()).await;
    engine.close().await;

    assert_eq!(summary.completion, Completion::ProducersDone);
    assert!(summary.produced < summary.expected);
    assert_eq!(summary.consumed, summary.produced);
    assert_eq!(summary.final_size, 1);
    assert_eq!(summary.emergency_consumers, 0);
    assert!(!summary.is_success());
    assert!(summary.is_clean_shutdown());
}
