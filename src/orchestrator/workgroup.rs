//! A bounded worker pool with cooperative cancellation and per-task
//! progress callbacks (spec §5 "Concurrency & resource model").
//!
//! Multithread-unsafe tasks (exporters that touch global state, like the
//! native-extension plugin source) are expected to be routed onto
//! [`WorkGroup::run_sequential`] by the caller, not mixed into the pool.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

/// A shared cooperative-cancellation latch. Long-running tasks should poll
/// [`Cancellation::is_cancelled`] at their own suspension points (start of
/// I/O, inside chunked decode loops, around MD5 verification) and return
/// early rather than this type preempting them.
#[derive(Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs `task` over every item in `items` using a bounded pool, isolating
/// panics per-task so one bad input can't take down the whole export (spec
/// §5 "Failure isolation"). `on_progress` is called after each item
/// completes with the number of items finished so far.
pub fn run_parallel<T, R, F>(items: Vec<T>, cancel: &Cancellation, on_progress: impl Fn(usize) + Sync, task: F) -> Vec<Option<R>>
where
    T: Send,
    R: Send,
    F: Fn(T, &Cancellation) -> R + Sync,
{
    let total = items.len();
    let completed = std::sync::atomic::AtomicUsize::new(0);
    items
        .into_par_iter()
        .map(|item| {
            let result = if cancel.is_cancelled() {
                None
            } else {
                match catch_unwind(AssertUnwindSafe(|| task(item, cancel))) {
                    Ok(r) => Some(r),
                    Err(_) => None,
                }
            };
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            on_progress(done);
            let _ = total;
            result
        })
        .collect()
}

/// The sequential counterpart for tasks an exporter flagged as unsafe to
/// run concurrently (spec §4.F "Scheduling hint").
pub fn run_sequential<T, R, F>(items: Vec<T>, cancel: &Cancellation, on_progress: impl Fn(usize), task: F) -> Vec<Option<R>>
where
    F: Fn(T, &Cancellation) -> R,
{
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        if cancel.is_cancelled() {
            out.push(None);
            continue;
        }
        let result = catch_unwind(AssertUnwindSafe(|| task(item, cancel))).ok();
        out.push(result);
        on_progress(i + 1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn parallel_run_processes_every_item() {
        let cancel = Cancellation::new();
        let progress = AtomicUsize::new(0);
        let items: Vec<i32> = (0..20).collect();
        let results = run_parallel(items, &cancel, |_| { progress.fetch_add(1, Ordering::SeqCst); }, |x, _| x * 2);
        assert_eq!(results.len(), 20);
        assert_eq!(results.iter().flatten().sum::<i32>(), (0..20).map(|x| x * 2).sum());
        assert_eq!(progress.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn a_panicking_task_becomes_none_not_a_crash() {
        let cancel = Cancellation::new();
        let items = vec![1, 2, 3];
        let results = run_parallel(items, &cancel, |_| {}, |x, _| {
            if x == 2 {
                panic!("boom");
            }
            x
        });
        assert_eq!(results, vec![Some(1), None, Some(3)]);
    }

    #[test]
    fn cancellation_short_circuits_remaining_items() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let items = vec![1, 2, 3];
        let results = run_sequential(items, &cancel, |_| {}, |x, _| x);
        assert_eq!(results, vec![None, None, None]);
    }
}
