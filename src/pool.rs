// pool.rs
//
// Copyright (c) 2026  Douglas Lau
//
//! Worker pool for ordered parallel mapping
use crate::error::{Error, Result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Get the default number of worker threads
pub(crate) fn default_threads() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Map items to results on a pool of worker threads.
///
/// Results are returned in item order, regardless of the order in which
/// workers finish.  A panicking item is reported as `WorkerFailed`.
pub(crate) fn map_ordered<T, R, F>(
    items: &[T],
    threads: usize,
    f: F,
) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync,
{
    let threads = threads.clamp(1, items.len().max(1));
    if threads == 1 {
        return items.iter().map(&f).collect();
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|n| format!("gifkit{n}"))
        .build()?;
    debug!("pool: {} workers for {} items", threads, items.len());
    pool.install(|| {
        items
            .par_iter()
            .map(|item| {
                panic::catch_unwind(AssertUnwindSafe(|| f(item)))
                    .unwrap_or(Err(Error::WorkerFailed))
            })
            .collect()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn ordered() -> Result<()> {
        let items: Vec<u64> = (0..50).collect();
        let res = map_ordered(&items, 4, |i| {
            // later items finish first
            thread::sleep(Duration::from_millis(50 - *i));
            Ok(i * 2)
        })?;
        assert_eq!(res, (0..50).map(|i| i * 2).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn single_thread() -> Result<()> {
        let items = [1, 2, 3];
        let res = map_ordered(&items, 1, |i| Ok(format!("{i}")))?;
        assert_eq!(res, ["1", "2", "3"]);
        Ok(())
    }

    #[test]
    fn empty() -> Result<()> {
        let items: [u8; 0] = [];
        let res = map_ordered(&items, 8, |i| Ok(*i))?;
        assert!(res.is_empty());
        Ok(())
    }

    #[test]
    fn item_error() {
        let items: Vec<u32> = (0..20).collect();
        let res = map_ordered(&items, 3, |i| match i {
            5 => Err(Error::InvalidColorIndex),
            _ => Ok(*i),
        });
        assert!(matches!(res, Err(Error::InvalidColorIndex)));
    }

    #[test]
    fn worker_panic() {
        let items: Vec<u32> = (0..4).collect();
        let res = map_ordered(&items, 2, |i| {
            if *i == 2 {
                panic!("worker panic");
            }
            Ok(*i)
        });
        assert!(matches!(res, Err(Error::WorkerFailed)));
    }
}
