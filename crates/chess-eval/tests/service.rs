//! End-to-end behaviour of `EvalService` over a fake engine.

mod common;

use async_trait::async_trait;
use chess_eval::{cache_key, CacheBackend, CacheError, Depth, Fault, InvalidInput};
use common::{service, service_with_backend, AFTER_E4, SICILIAN, START};
use futures_util::future::join_all;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use uci::Score;

#[tokio::test]
async fn test_fresh_evaluation_then_cache_hit() {
    let (service, stats, _) = service();
    stats.script(SICILIAN, Score::Cp(34), &["g1f3", "d7d6", "d2d4", "c5d4", "f3d4"]);

    let first = service.evaluate(SICILIAN, 12).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.fault, None);
    assert_eq!(first.result.score_cp, 34);
    assert_eq!(first.result.pv, "Nf3 d6 d4 cxd4");

    let second = service.evaluate(SICILIAN, 12).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.result, first.result);
    assert_eq!(stats.calls(), 1);
}

#[tokio::test]
async fn test_black_to_move_score_is_white_relative() {
    let (service, stats, _) = service();
    stats.script(AFTER_E4, Score::Cp(-25), &["c7c5", "g1f3"]);

    let evaluation = service.evaluate(AFTER_E4, 10).await.unwrap();
    assert_eq!(evaluation.result.score_cp, 25);
    assert_eq!(evaluation.result.pv, "c5 Nf3");
}

#[tokio::test]
async fn test_depth_is_part_of_the_key() {
    let (service, stats, cache) = service();

    let shallow = service.evaluate(START, 5).await.unwrap();
    let deep = service.evaluate(START, 20).await.unwrap();
    assert!(!shallow.cached);
    assert!(!deep.cached);
    assert_eq!(stats.calls(), 2);

    let depth = Depth::new(20).unwrap();
    assert!(cache.get(&cache_key(START, depth)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_invalid_input_never_reaches_engine() {
    let (service, stats, _) = service();

    let err = service.evaluate("8/8/8/8 w", 10).await.unwrap_err();
    assert!(matches!(err, InvalidInput::Fen(_)));

    for depth in [0, 31, -1] {
        let err = service.evaluate(START, depth).await.unwrap_err();
        assert_eq!(err, InvalidInput::Depth(depth));
    }

    assert_eq!(stats.calls(), 0);
    assert_eq!(stats.launches(), 0);
}

#[tokio::test]
async fn test_unavailable_engine_is_reported_and_not_cached() {
    let (service, stats, cache) = service();
    stats.unavailable.store(true, Ordering::SeqCst);

    let evaluation = service.evaluate(START, 8).await.unwrap();
    assert_eq!(evaluation.fault, Some(Fault::EngineUnavailable));
    assert_eq!(evaluation.result.score_cp, 0);
    assert_eq!(evaluation.result.pv, "ERROR:ENGINE_UNAVAILABLE");
    assert!(!evaluation.cached);
    assert!(cache.is_empty().await);

    // Once the engine can start, the same request is computed for real.
    stats.unavailable.store(false, Ordering::SeqCst);
    let evaluation = service.evaluate(START, 8).await.unwrap();
    assert_eq!(evaluation.fault, None);
    assert!(!evaluation.cached);
}

#[tokio::test]
async fn test_engine_restarts_after_termination() {
    let (service, stats, cache) = service();

    service.evaluate(START, 3).await.unwrap();
    assert_eq!(stats.launches(), 1);

    stats.crash_next.store(true, Ordering::SeqCst);
    let crashed = service.evaluate(START, 4).await.unwrap();
    assert_eq!(crashed.fault, Some(Fault::EngineTerminated));
    assert_eq!(crashed.result.pv, "ERROR:ENGINE_TERMINATED");
    assert!(cache
        .get(&cache_key(START, Depth::new(4).unwrap()))
        .await
        .unwrap()
        .is_none());

    // No retry inside the failed request; the next one gets a new process.
    assert_eq!(stats.calls(), 2);
    let recovered = service.evaluate(START, 4).await.unwrap();
    assert_eq!(recovered.fault, None);
    assert_eq!(stats.launches(), 2);
    assert_eq!(service.engine_launches(), 2);
}

#[tokio::test]
async fn test_missing_score_is_tagged_and_not_cached() {
    let (service, stats, cache) = service();
    stats.no_score.store(true, Ordering::SeqCst);

    let evaluation = service.evaluate(START, 6).await.unwrap();
    assert_eq!(evaluation.fault, Some(Fault::NoScore));
    assert_eq!(evaluation.result.score_cp, 0);
    assert_eq!(evaluation.result.pv, "ERROR:NO_SCORE e4");
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_partial_pv_is_cached() {
    let (service, stats, _) = service();
    stats.script(START, Score::Cp(18), &["e2e4", "e2e4"]);

    let first = service.evaluate(START, 9).await.unwrap();
    assert_eq!(first.fault, None);
    assert_eq!(first.result.pv, "e4 e2e4(illegal)");

    let second = service.evaluate(START, 9).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.result, first.result);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_engine_calls_never_overlap() {
    let (service, stats, _) = service();
    stats.set_delay(Duration::from_millis(20));

    let requests = (1..=6).map(|depth| {
        let service = service.clone();
        tokio::spawn(async move { service.evaluate(START, depth).await })
    });
    for outcome in join_all(requests).await {
        let evaluation = outcome.unwrap().unwrap();
        assert_eq!(evaluation.fault, None);
    }

    assert_eq!(stats.calls(), 6);
    assert_eq!(stats.overlaps(), 0);
    assert_eq!(stats.launches(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_identical_misses_share_one_engine_call() {
    let (service, stats, _) = service();
    stats.set_delay(Duration::from_millis(50));

    let requests = (0..8).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.evaluate(START, 12).await })
    });
    let evaluations: Vec<_> = join_all(requests)
        .await
        .into_iter()
        .map(|outcome| outcome.unwrap().unwrap())
        .collect();

    assert_eq!(stats.calls(), 1);
    assert!(evaluations
        .iter()
        .all(|e| e.result == evaluations[0].result && e.fault.is_none()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cache_hit_does_not_wait_for_busy_engine() {
    let (service, stats, _) = service();
    service.evaluate(START, 10).await.unwrap();

    stats.set_delay(Duration::from_millis(400));
    let busy = {
        let service = service.clone();
        tokio::spawn(async move { service.evaluate(AFTER_E4, 10).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let hit = tokio::time::timeout(Duration::from_millis(150), service.evaluate(START, 10))
        .await
        .expect("cache hit waited for the engine")
        .unwrap();
    assert!(hit.cached);

    busy.await.unwrap().unwrap();
}

/// A backend that is down for both reads and writes.
struct DownBackend;

#[async_trait]
impl CacheBackend for DownBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_cache_outage_degrades_to_engine_only() {
    let (service, stats) = service_with_backend(Arc::new(DownBackend));

    for _ in 0..2 {
        let evaluation = service.evaluate(START, 7).await.unwrap();
        assert!(!evaluation.cached);
        assert_eq!(evaluation.fault, None);
        assert_eq!(evaluation.result.score_cp, 7);
    }
    assert_eq!(stats.calls(), 2);
}

#[tokio::test]
async fn test_shutdown_then_next_request_relaunches() {
    let (service, stats, _) = service();
    service.evaluate(START, 2).await.unwrap();
    service.shutdown().await;

    service.evaluate(START, 3).await.unwrap();
    assert_eq!(stats.launches(), 2);
}
