//! Worker pool behaviour seen from outside the crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shadeline::scheduler::{run_bands, WorkerPool};
use test_log::test;

const UNSET: usize = usize::MAX;

fn slots(n: usize) -> Arc<Vec<AtomicUsize>> {
    Arc::new((0..n).map(|_| AtomicUsize::new(UNSET)).collect())
}

#[test]
fn six_hundred_row_tasks_fill_every_row() {
    let pool = WorkerPool::new(4, 600).unwrap();
    let results = slots(600);

    for row in 0..600 {
        let results = Arc::clone(&results);
        pool.execute(move || results[row].store(row, Ordering::SeqCst));
    }
    pool.wait();

    let rows: Vec<usize> = results.iter().map(|r| r.load(Ordering::SeqCst)).collect();
    assert_eq!(rows, (0..600).collect::<Vec<_>>());
}

#[test]
fn every_task_runs_exactly_once_for_any_thread_count() {
    const TASKS: usize = 1000;
    for workers in [1, 2, 3, 8] {
        let pool = WorkerPool::new(workers, 64).unwrap();
        let hits: Arc<Vec<AtomicUsize>> = Arc::new((0..TASKS).map(|_| AtomicUsize::new(0)).collect());

        for i in 0..TASKS {
            let hits = Arc::clone(&hits);
            pool.execute(move || {
                hits[i].fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait();

        assert!(
            hits.iter().all(|h| h.load(Ordering::SeqCst) == 1),
            "{workers} workers: a task was skipped or ran twice"
        );
    }
}

#[test]
fn submissions_beyond_capacity_wait_for_space() {
    let pool = WorkerPool::new(2, 2).unwrap();
    let results = slots(50);

    for i in 0..50 {
        let results = Arc::clone(&results);
        pool.execute(move || {
            std::thread::sleep(Duration::from_micros(200));
            results[i].store(i, Ordering::SeqCst);
        });
    }
    pool.wait();

    assert!(results.iter().enumerate().all(|(i, r)| r.load(Ordering::SeqCst) == i));
}

#[test]
fn pool_is_reusable_across_barriers() {
    let pool = WorkerPool::new(3, 8).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for round in 1..=5 {
        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait();
        assert_eq!(counter.load(Ordering::SeqCst), round * 20);
    }
}

#[test]
fn dropping_the_pool_finishes_queued_work() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let pool = WorkerPool::new(2, 32).unwrap();
        for _ in 0..32 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
    }
    assert_eq!(counter.load(Ordering::SeqCst), 32);
}

#[test]
fn row_bands_on_pool_match_inline() {
    let width = 37;
    let fill = |(band, rows): (usize, &mut [u32])| {
        for (i, v) in rows.iter_mut().enumerate() {
            *v = (band * 1_000 + i) as u32;
        }
    };

    let mut inline = vec![0u32; width * 50];
    run_bands(None, inline.chunks_mut(width * 6).enumerate().collect(), fill);

    let pool = WorkerPool::new(4, 4).unwrap();
    let mut pooled = vec![0u32; width * 50];
    run_bands(Some(&pool), pooled.chunks_mut(width * 6).enumerate().collect(), fill);

    assert_eq!(inline, pooled);
}
