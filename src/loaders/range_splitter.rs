//! Recursive block-range splitter for Etherscan-style APIs that cap
//! a single call at `MAX_RESULTS` records (spec §4.7.2).

use crate::errors::LedgerResult;
use crate::logger::{self, LogTag};
use std::future::Future;

pub const MAX_RESULTS: usize = 10_000;

/// Fetches `[from, to]` via `call`, splitting the range in half and
/// recursing whenever a call returns `MAX_RESULTS` or more records —
/// the API truncated rather than returned everything. Stops splitting
/// when the range can no longer be halved (`mid == from`), accepting
/// the partial result rather than looping forever.
pub async fn fetch_range<T, F, Fut>(from: u64, to: u64, call: &F) -> LedgerResult<Vec<T>>
where
    F: Fn(u64, u64) -> Fut,
    Fut: Future<Output = LedgerResult<Vec<T>>>,
{
    let results = call(from, to).await?;

    if results.len() < MAX_RESULTS {
        return Ok(results);
    }

    let mid = from + (to - from) / 2;
    if mid == from {
        logger::warning(LogTag::EvmLoader, &format!("cannot split range further at block {from} — returning partial results"));
        return Ok(results);
    }

    logger::info(LogTag::EvmLoader, &format!("splitting range [{from}, {to}] at {mid}"));

    let first_half = Box::pin(fetch_range(from, mid, call)).await?;
    let second_half = Box::pin(fetch_range(mid + 1, to, call)).await?;

    let mut combined = first_half;
    combined.extend(second_half);
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn returns_single_call_result_under_the_cap() {
        let calls = AtomicUsize::new(0);
        let call = |from: u64, to: u64| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(vec![from, to]) }
        };
        let result = fetch_range(0, 100, &call).await.unwrap();
        assert_eq!(result, vec![0, 100]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn splits_when_the_cap_is_hit() {
        // Every call "hits the cap" (MAX_RESULTS items) until the
        // range can't be halved any further, then returns one item.
        let call = |from: u64, to: u64| async move {
            if to - from <= 1 {
                Ok(vec![from])
            } else {
                Ok(vec![0; MAX_RESULTS])
            }
        };
        let result = fetch_range(0, 3, &call).await.unwrap();
        assert!(result.len() >= 4);
    }

    #[tokio::test]
    async fn stops_when_range_cannot_split_further() {
        let call = |from: u64, _to: u64| async move { Ok(vec![from; MAX_RESULTS]) };
        let result = fetch_range(5, 5, &call).await.unwrap();
        assert_eq!(result.len(), MAX_RESULTS);
    }
}
