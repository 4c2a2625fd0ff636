use esox_gatedpool::{EagerObjectPool, LazyObjectPool, PoolConfiguration, PrepareForReuse};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn capacity_bound_blocks_extra_checkout() {
    let pool = Arc::new(EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default()));
    let held: Vec<_> = (0..3).map(|_| pool.try_checkout().unwrap()).collect();

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let obj = pool.checkout_resource(None).unwrap();
            tx.send(*obj).unwrap();
        })
    };

    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert_eq!(pool.checked_out_count(), 3);

    let mut held = held.into_iter();
    let first = held.next().unwrap();
    pool.checkin(first).unwrap();

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
    waiter.join().unwrap();
}

#[test]
fn eager_conservation_at_quiescent_points() {
    let pool = EagerObjectPool::new((0..5).collect(), PoolConfiguration::default());
    let mut held = Vec::new();

    for step in 0..40 {
        if step % 3 == 2 {
            if let Some(obj) = held.pop() {
                pool.checkin(obj).unwrap();
            }
        } else if let Some(obj) = pool.try_checkout() {
            held.push(obj);
        }

        assert_eq!(held.len(), pool.checked_out_count());
        assert_eq!(pool.checked_out_count() + pool.available_count(), 5);
    }
}

#[test]
fn lazy_conservation_under_concurrency() {
    let pool = Arc::new(LazyObjectPool::new(4, || 0u32, PoolConfiguration::default()));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..100 {
                    let mut obj = pool.checkout_resource(None).unwrap();
                    *obj += 1;
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let uncreated = pool.capacity() - pool.created_count();
    assert_eq!(pool.checked_out_count() + pool.available_count() + uncreated, 4);

    let mut total = 0;
    pool.process_pool(|idle| total = idle.iter().sum::<u32>());
    assert_eq!(total, 800);
}

#[test]
fn timeout_returns_nothing_and_keeps_permits() {
    let pool = EagerObjectPool::new(vec!['a', 'b'], PoolConfiguration::default());
    let _a = pool.try_checkout().unwrap();
    let _b = pool.try_checkout().unwrap();

    let started = Instant::now();
    assert!(pool.checkout_resource(Some(Duration::from_millis(200))).is_none());
    assert!(started.elapsed() >= Duration::from_millis(200));

    // A second attempt must also time out rather than succeed spuriously.
    assert!(pool.checkout_resource(Some(Duration::from_millis(50))).is_none());
    assert!(pool.try_checkout().is_none());
    assert_eq!(pool.get_metrics().exhausted_events, 3);
}

#[test]
fn lazy_creation_never_exceeds_cap() {
    let made = Arc::new(AtomicUsize::new(0));
    let pool = {
        let made = Arc::clone(&made);
        Arc::new(LazyObjectPool::new(
            4,
            move || made.fetch_add(1, Ordering::SeqCst),
            PoolConfiguration::default(),
        ))
    };

    let workers: Vec<_> = (0..16)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..50 {
                    let obj = pool.checkout_resource(None).unwrap();
                    assert!(*obj < 4);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert!(made.load(Ordering::SeqCst) <= 4);
    assert_eq!(pool.created_count(), made.load(Ordering::SeqCst));
    assert_eq!(pool.get_metrics().total_checked_out, 800);
}

#[test]
fn reuse_is_exclusive_under_load() {
    let pool = Arc::new(EagerObjectPool::new(vec![0usize, 1, 2], PoolConfiguration::default()));
    let in_use: Arc<[AtomicBool; 3]> = Arc::new([false, false, false].map(AtomicBool::new));
    let usage: Arc<[AtomicUsize; 3]> = Arc::new([0, 0, 0].map(AtomicUsize::new));

    let workers: Vec<_> = (0..35)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let in_use = Arc::clone(&in_use);
            let usage = Arc::clone(&usage);
            thread::spawn(move || {
                let obj = pool.checkout_resource(None).unwrap();
                let id = *obj;
                assert!(!in_use[id].swap(true, Ordering::SeqCst), "resource {id} handed out twice");
                usage[id].fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(2));
                in_use[id].store(false, Ordering::SeqCst);
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let total: usize = usage.iter().map(|count| count.load(Ordering::SeqCst)).sum();
    assert_eq!(total, 35);
    assert_eq!(pool.available_count(), 3);
}

#[test]
fn prepare_for_reuse_runs_once_per_checkin() {
    #[derive(Clone)]
    struct Session {
        resets: usize,
        scratch: Vec<u8>,
    }

    impl PrepareForReuse for Session {
        fn prepare_for_reuse(&mut self) {
            self.resets += 1;
            self.scratch.clear();
        }
    }

    let config = PoolConfiguration::<Session>::new().with_prepare_for_reuse();
    let sessions = vec![
        Session { resets: 0, scratch: Vec::new() },
        Session { resets: 0, scratch: Vec::new() },
    ];
    let pool = Arc::new(EagerObjectPool::new(sessions, config));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..25 {
                    let mut session = pool.checkout_resource(None).unwrap();
                    assert!(session.scratch.is_empty());
                    session.scratch.push(1);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let mut resets = 0;
    pool.process_pool(|idle| resets = idle.iter().map(|s| s.resets).sum());
    assert_eq!(resets, 100);
    assert_eq!(pool.get_metrics().total_checked_in, 100);
}

#[test]
fn four_borrowers_three_resources() {
    let pool = Arc::new(EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default()));
    let all_tried = Arc::new(Barrier::new(4));

    let borrowers: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let all_tried = Arc::clone(&all_tried);
            thread::spawn(move || {
                let started = Instant::now();
                let obj = pool.checkout_resource(Some(Duration::from_millis(200)));
                let waited = started.elapsed();
                all_tried.wait();
                (obj.is_some(), waited)
            })
        })
        .collect();

    let results: Vec<_> = borrowers.into_iter().map(|b| b.join().unwrap()).collect();

    let served = results.iter().filter(|(ok, _)| *ok).count();
    assert_eq!(served, 3);

    let (_, waited) = results.iter().find(|(ok, _)| !*ok).unwrap();
    assert!(*waited >= Duration::from_millis(200));
    assert_eq!(pool.available_count(), 3);
}

#[test]
fn detached_checkins_all_land() {
    let pool = Arc::new(EagerObjectPool::new(vec![0u8; 4], PoolConfiguration::default()));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..50 {
                    let obj = pool.checkout_resource(None).unwrap();
                    pool.checkin_detached(obj).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    // Every resource comes back once the queued checkins have run.
    let held: Vec<_> = (0..4)
        .map(|_| pool.checkout_resource(Some(Duration::from_secs(5))).unwrap())
        .collect();
    assert_eq!(held.len(), 4);
    assert_eq!(pool.get_metrics().total_checked_in, 400);
}
