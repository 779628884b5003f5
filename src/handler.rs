//! Functions for driving a pull session to completion.
//!
//! Each driver pulls until the session reports exhaustion or fails, then
//! disposes it. Disposal runs on every path; an error from the pull wins over
//! an error from disposal.

use std::future::Future;

use crate::error::PullError;
use crate::pull::AsyncPull;

/// Call `f` with every element of `pull`.
///
/// ```rust
/// use futures::executor::block_on;
/// use pullcore::{AsyncSource, for_each, from_iter};
/// use tokio_util::sync::CancellationToken;
///
/// let pull = from_iter(1..=3).pull(CancellationToken::new());
/// let mut sum = 0;
/// block_on(for_each(&pull, |v| sum += v)).unwrap();
/// assert_eq!(sum, 6);
/// ```
pub async fn for_each<P, F>(pull: &P, mut f: F) -> Result<(), PullError>
where
    P: AsyncPull,
    F: FnMut(P::Item),
{
    let outcome = async {
        while pull.get_next().await? {
            let item = pull.current().ok_or_else(PullError::missing_current)?;
            f(item);
        }
        Ok::<_, PullError>(())
    }
    .await;
    finish(pull, outcome).await
}

/// Async version of [`for_each`].
///
/// The next element is not pulled until the future returned by `f` resolves.
pub async fn for_each_async<P, F, Fut>(pull: &P, mut f: F) -> Result<(), PullError>
where
    P: AsyncPull,
    F: FnMut(P::Item) -> Fut,
    Fut: Future<Output = ()>,
{
    let outcome = async {
        while pull.get_next().await? {
            let item = pull.current().ok_or_else(PullError::missing_current)?;
            f(item).await;
        }
        Ok::<_, PullError>(())
    }
    .await;
    finish(pull, outcome).await
}

/// Collect every element of `pull` into a `Vec`.
pub async fn collect<P: AsyncPull>(pull: &P) -> Result<Vec<P::Item>, PullError> {
    let mut items = Vec::new();
    for_each(pull, |item| items.push(item)).await?;
    Ok(items)
}

async fn finish<P: AsyncPull, T>(
    pull: &P,
    outcome: Result<T, PullError>,
) -> Result<T, PullError> {
    let disposed = pull.dispose().await;
    let value = outcome?;
    disposed?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fused::{Fused, transform_fn};
    use crate::slot::{Promise, SlotFuture};
    use crate::source::from_iter;
    use crate::testing::{CountingSource, HollowPull, ManualSource};
    use anyhow::anyhow;
    use futures::executor::block_on;
    use futures::future::{join, ready};
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_collect_disposes_after_exhaustion() {
        let source = CountingSource::new(from_iter(["a", "b", "c"]));
        let pull = Fused::new(
            source.clone(),
            transform_fn(
                |s: &'static str| Ok(SlotFuture::ready(s.to_uppercase())),
                |s: String| Ok(Some(s)),
            ),
            CancellationToken::new(),
        );

        assert_eq!(block_on(collect(&pull)).unwrap(), vec!["A", "B", "C"]);
        assert_eq!(source.disposed(), 1);
    }

    #[test]
    fn test_failure_still_disposes() {
        let source = CountingSource::new(from_iter(1..=3_u32));
        let pull = Fused::new(
            source.clone(),
            transform_fn(
                |v: u32| Ok(SlotFuture::ready(v)),
                |v: u32| {
                    anyhow::ensure!(v < 2, "too big: {v}");
                    Ok(Some(v))
                },
            ),
            CancellationToken::new(),
        );

        let mut seen = Vec::new();
        let err = block_on(for_each(&pull, |v| seen.push(v))).unwrap_err();
        assert!(err.to_string().contains("too big: 2"));
        assert_eq!(seen, vec![1]);
        assert_eq!(source.disposed(), 1);
    }

    #[test]
    fn test_awaits_pending_steps() {
        let source = ManualSource::new([7_u32, 8]);
        let pull = crate::sequential::Sequential::new(
            source.clone(),
            crate::sequential::advance_fn(|item: Option<u32>| Ok(crate::step::Advance::Done(item))),
            CancellationToken::new(),
        );

        let driver = async {
            let mut seen = Vec::new();
            let outcome = for_each_async(&pull, |v| {
                seen.push(v);
                ready(())
            })
            .await;
            outcome.map(|()| seen)
        };
        let feeder = async {
            for _ in 0..3 {
                source.complete_next();
                futures::pending!();
            }
        };

        let (seen, ()) = block_on(join(driver, feeder));
        assert_eq!(seen.unwrap(), vec![7, 8]);
        assert_eq!(source.disposed(), 1);
    }

    #[test]
    fn test_fault_from_promise_surfaces() {
        let promise = Promise::<u32>::new();
        promise.try_set_exception(anyhow!("boom"));
        let err = block_on(promise.future()).unwrap_err();
        assert!(err.fault().is_some());
    }

    #[test]
    fn test_missing_current_faults_and_disposes() {
        let pull = HollowPull::default();
        let mut seen = Vec::new();
        let err = block_on(for_each(&pull, |v| seen.push(v))).unwrap_err();
        assert!(err.to_string().contains("without a current value"));
        assert!(seen.is_empty());
        assert_eq!(pull.disposed(), 1);

        let pull = HollowPull::default();
        assert!(block_on(for_each_async(&pull, |_| ready(()))).is_err());
        assert_eq!(pull.disposed(), 1);
    }
}
