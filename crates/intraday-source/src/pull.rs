//! 다중 심볼 조회 도우미.
//!
//! 같은 조회 함수와 고정 파라미터를 여러 심볼에 적용하고 심볼별 결과를
//! 돌려줍니다. 동시 실행 버전은 속도 제한기로 묶음 단위 발송을 조절할 뿐,
//! 결과 매핑은 순차 버전과 같습니다 (완료 순서가 아니라 심볼 기준).
//!
//! 입력 심볼은 서로 달라야 합니다. 중복 심볼은 하나의 결과로 합쳐집니다.

use crate::rate_limit::RateLimiter;
use intraday_core::Symbol;
use std::collections::BTreeMap;
use std::future::Future;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// 심볼마다 순서대로 조회합니다.
pub async fn pull_sequential<P, F, Fut, R>(
    symbols: &[Symbol],
    fetch_fn: F,
    params: P,
) -> BTreeMap<Symbol, R>
where
    P: Clone,
    F: Fn(Symbol, P) -> Fut,
    Fut: Future<Output = R>,
{
    let mut results = BTreeMap::new();

    for symbol in symbols {
        let result = fetch_fn(symbol.clone(), params.clone()).await;
        results.insert(symbol.clone(), result);
    }

    results
}

/// 속도 제한기에 맞춰 조회 작업을 동시에 발송하고 모두 끝날 때까지 기다립니다.
pub async fn pull_concurrent<P, F, Fut, R>(
    symbols: &[Symbol],
    fetch_fn: F,
    params: P,
    limiter: &RateLimiter,
) -> BTreeMap<Symbol, R>
where
    P: Clone,
    F: Fn(Symbol, P) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    pull_concurrent_until(symbols, fetch_fn, params, limiter, &CancellationToken::new()).await
}

/// [`pull_concurrent`]와 같지만, 토큰이 취소되면 더 이상 발송하지 않습니다.
///
/// 이미 발송된 작업은 끝까지 실행되며 결과에 포함됩니다.
pub async fn pull_concurrent_until<P, F, Fut, R>(
    symbols: &[Symbol],
    fetch_fn: F,
    params: P,
    limiter: &RateLimiter,
    cancel: &CancellationToken,
) -> BTreeMap<Symbol, R>
where
    P: Clone,
    F: Fn(Symbol, P) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    let mut tasks = JoinSet::new();

    for symbol in symbols {
        if cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = limiter.acquire() => {}
        }

        let fut = fetch_fn(symbol.clone(), params.clone());
        let key = symbol.clone();
        tasks.spawn(async move { (key, fut.await) });
    }

    if cancel.is_cancelled() {
        tracing::info!(dispatched = tasks.len(), "취소 신호 수신, 발송 중단");
    }

    let mut results = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((symbol, result)) => {
                results.insert(symbol, result);
            }
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => tracing::warn!(error = %err, "조회 작업이 중단됨"),
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateLimitConfig;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    fn symbols(names: &[&str]) -> Vec<Symbol> {
        names.iter().map(|s| Symbol::new(*s).unwrap()).collect()
    }

    /// 심볼에 따라 결정되는 결과, 완료 순서는 입력 역순이 되도록 지연.
    async fn fake_fetch(symbol: Symbol, multiplier: usize) -> usize {
        let delay = 100u64.saturating_sub(symbol.as_str().len() as u64 * 10);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        symbol.as_str().len() * multiplier
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_maps_every_symbol() {
        let input = symbols(&["A", "BB", "CCC"]);
        let results = pull_sequential(&input, fake_fetch, 2).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[&input[0]], 2);
        assert_eq!(results[&input[2]], 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_matches_sequential() {
        let input = symbols(&["A", "BB", "CCC", "DDDD", "EEEEE"]);
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(1)));

        let sequential = pull_sequential(&input, fake_fetch, 3).await;
        let concurrent = pull_concurrent(&input, fake_fetch, 3, &limiter).await;

        assert_eq!(sequential, concurrent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_dispatches_in_batches() {
        let input = symbols(&["A", "B", "C", "D", "E"]);
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(1)));
        let start = Instant::now();
        let dispatched: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));

        let log = dispatched.clone();
        let results = pull_concurrent(
            &input,
            move |symbol: Symbol, _: ()| {
                log.lock().unwrap().push(Instant::now() - start);
                async move { symbol.to_string() }
            },
            (),
            &limiter,
        )
        .await;

        assert_eq!(results.len(), 5);
        let times = dispatched.lock().unwrap().clone();
        assert_eq!(times[0], Duration::ZERO);
        assert_eq!(times[1], Duration::ZERO);
        assert!(times[2] >= Duration::from_secs(1));
        assert!(times[4] >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stops_dispatching_after_cancel() {
        let input = symbols(&["A", "B", "C", "D"]);
        let limiter = RateLimiter::new(RateLimitConfig::new(1, Duration::from_millis(10)));
        let cancel = CancellationToken::new();

        let results = pull_concurrent_until(
            &input,
            |symbol: Symbol, token: CancellationToken| {
                if symbol.as_str() == "B" {
                    token.cancel();
                }
                async move { symbol.as_str().to_lowercase() }
            },
            cancel.clone(),
            &limiter,
            &cancel,
        )
        .await;

        let keys: Vec<&str> = results.keys().map(|s| s.as_str()).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(results[&input[1]], "b");
    }

    #[tokio::test]
    async fn test_concurrent_with_cancelled_token_dispatches_nothing() {
        let input = symbols(&["A", "B"]);
        let limiter = RateLimiter::new(RateLimitConfig::new(100, Duration::from_secs(1)));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let results =
            pull_concurrent_until(&input, |s: Symbol, _: ()| async move { s }, (), &limiter, &cancel)
                .await;
        assert!(results.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_pull_variants_agree(
            names in proptest::collection::btree_set("[A-Z]{1,6}", 0..20),
            cap in 1u32..6,
            multiplier in 0usize..10,
        ) {
            let input: Vec<Symbol> = names
                .iter()
                .map(|s| Symbol::new(s.clone()).unwrap())
                .collect();

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let (sequential, concurrent) = runtime.block_on(async {
                let limiter = RateLimiter::new(RateLimitConfig::new(cap, Duration::from_millis(50)));
                let sequential = pull_sequential(&input, fake_fetch, multiplier).await;
                let concurrent = pull_concurrent(&input, fake_fetch, multiplier, &limiter).await;
                (sequential, concurrent)
            });

            prop_assert_eq!(&sequential, &concurrent);
            let keys: BTreeSet<String> = concurrent.keys().map(|s| s.to_string()).collect();
            prop_assert_eq!(keys, names);
        }
    }
}
