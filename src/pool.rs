use std::panic;
use std::sync::Arc;
use tokio::runtime::Builder;
use tokio::sync::Semaphore;

use crate::error::{RaidError, Result};

/// Run `work` once per item on blocking worker threads.
///
/// With `max_concurrency > 0` a unit must take one of that many slots
/// before it starts and gives it back when it finishes; `0` admits every
/// unit at once. Units never cancel each other. Results come back in
/// item order once every unit has completed.
pub(crate) fn run_bounded<I, R, F>(
    label: &str,
    items: Vec<I>,
    max_concurrency: usize,
    work: F,
) -> Result<Vec<R>>
where
    I: Send + 'static,
    R: Send + 'static,
    F: Fn(I) -> R + Send + Sync + 'static,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let runtime = Builder::new_multi_thread()
        .thread_name(format!("raid-{label}"))
        .max_blocking_threads(blocking_threads(items.len(), max_concurrency))
        .build()
        .map_err(RaidError::Runtime)?;

    let gate = (max_concurrency > 0).then(|| Arc::new(Semaphore::new(max_concurrency)));
    let work = Arc::new(work);

    runtime.block_on(async move {
        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            let gate = gate.clone();
            let work = Arc::clone(&work);
            handles.push(tokio::spawn(async move {
                // The semaphore is never closed, so acquisition only waits.
                let permit = match gate {
                    Some(gate) => gate.acquire_owned().await.ok(),
                    None => None,
                };
                let result = tokio::task::spawn_blocking(move || work(item)).await;
                drop(permit);
                result
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(err)) | Err(err) => {
                    if err.is_panic() {
                        panic::resume_unwind(err.into_panic());
                    }
                    return Err(RaidError::Runtime(std::io::Error::other(err.to_string())));
                }
            }
        }
        Ok(results)
    })
}

/// Blocking pool size that lets every admitted unit hold its own thread.
fn blocking_threads(items: usize, max_concurrency: usize) -> usize {
    if max_concurrency == 0 {
        items.max(1)
    } else {
        max_concurrency.min(items).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn measure(items: usize, max_concurrency: usize) -> (Vec<usize>, usize) {
        let gauge = Arc::new(Gauge::default());
        let tracker = Arc::clone(&gauge);
        let results = run_bounded("test", (0..items).collect(), max_concurrency, move |item| {
            tracker.enter();
            thread::sleep(Duration::from_millis(40));
            tracker.leave();
            item * 10
        })
        .unwrap();
        (results, gauge.peak.load(Ordering::SeqCst))
    }

    #[test]
    fn test_results_follow_item_order() {
        let (results, _) = measure(5, 0);
        assert_eq!(results, vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_limit_bounds_units_in_flight() {
        let (results, peak) = measure(8, 3);
        assert_eq!(results.len(), 8);
        assert!(peak <= 3, "peak {peak} exceeded limit");
        assert!(peak >= 1);
    }

    #[test]
    fn test_limit_of_one_is_sequential() {
        let (_, peak) = measure(4, 1);
        assert_eq!(peak, 1);
    }

    #[test]
    fn test_unbounded_runs_units_together() {
        let (_, peak) = measure(4, 0);
        assert!(peak > 1, "expected overlap, saw peak {peak}");
    }

    #[test]
    fn test_blocking_pool_covers_every_admitted_unit() {
        assert_eq!(blocking_threads(600, 0), 600);
        assert_eq!(blocking_threads(600, 4), 4);
        assert_eq!(blocking_threads(3, 8), 3);
        assert_eq!(blocking_threads(0, 0), 1);
    }

    #[test]
    fn test_unbounded_admits_more_units_than_default_blocking_pool() {
        // Tokio's default blocking pool stops at 512 threads.
        const UNITS: usize = 520;
        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);

        let all_overlapped = run_bounded("test", (0..UNITS).collect(), 0, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            let deadline = std::time::Instant::now() + Duration::from_secs(20);
            while counter.load(Ordering::SeqCst) < UNITS {
                if std::time::Instant::now() > deadline {
                    return false;
                }
                thread::sleep(Duration::from_millis(5));
            }
            true
        })
        .unwrap();

        assert!(all_overlapped.iter().all(|overlapped| *overlapped));
    }

    #[test]
    fn test_empty_input_starts_nothing() {
        let results: Vec<()> = run_bounded("test", Vec::<()>::new(), 2, |_| ()).unwrap();
        assert!(results.is_empty());
    }
}
