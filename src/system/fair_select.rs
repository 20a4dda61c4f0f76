//! Fair two-way select
//!
//! `embassy_futures::select` always polls its first future first, so when both
//! sources are ready the first one wins every time. `RoundRobin` flips the poll
//! order on each call so that neither source can starve the other.

use core::future::Future;

use embassy_futures::select::{select, Either};

/// Alternating-priority selector
#[derive(Debug, Default)]
pub struct RoundRobin {
    second_first: bool,
}

impl RoundRobin {
    pub const fn new() -> Self {
        Self {
            second_first: false,
        }
    }

    /// Waits for whichever of `a` or `b` completes first.
    ///
    /// When both are ready on the same poll, the winner alternates between
    /// calls. The result always maps `a` to `First` and `b` to `Second`.
    pub async fn select<A, B>(&mut self, a: A, b: B) -> Either<A::Output, B::Output>
    where
        A: Future,
        B: Future,
    {
        let second_first = self.second_first;
        self.second_first = !second_first;

        if second_first {
            match select(b, a).await {
                Either::First(b) => Either::Second(b),
                Either::Second(a) => Either::First(a),
            }
        } else {
            select(a, b).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::future::{pending, ready};
    use embassy_futures::block_on;

    #[test]
    fn alternates_when_both_ready() {
        let mut rr = RoundRobin::new();
        let winners: Vec<_> = (0..4)
            .map(|_| match block_on(rr.select(ready('a'), ready('b'))) {
                Either::First(c) | Either::Second(c) => c,
            })
            .collect();
        assert_eq!(winners, vec!['a', 'b', 'a', 'b']);
    }

    #[test]
    fn single_ready_source_always_wins() {
        let mut rr = RoundRobin::new();
        for _ in 0..3 {
            let out = block_on(rr.select(pending::<u8>(), ready(7u8)));
            assert!(matches!(out, Either::Second(7)));
        }
    }
}
