//! Advanced features: prototypes, reuse hooks, detached checkin, metrics

use esox_gatedpool::{
    EagerObjectPool, LazyObjectPool, PoolConfiguration, PrepareForReuse,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Connection {
    id: usize,
    in_transaction: bool,
}

impl Connection {
    fn new(id: usize) -> Self {
        Self {
            id,
            in_transaction: false,
        }
    }
}

impl PrepareForReuse for Connection {
    fn prepare_for_reuse(&mut self) {
        self.in_transaction = false;
    }
}

fn main() {
    println!("=== EsoxSolutions.GatedPool - Advanced Features ===\n");

    // Example 1: Prepare-for-reuse
    prepare_for_reuse();

    // Example 2: Prototype pools
    prototype_pool();

    // Example 3: Detached checkin
    detached_checkin();

    // Example 4: Usage under load
    usage_under_load();

    // Example 5: Prometheus metrics
    prometheus_export();
}

fn prepare_for_reuse() {
    println!("1. Prepare For Reuse:");

    let config = PoolConfiguration::<Connection>::new().with_prepare_for_reuse();
    let pool = EagerObjectPool::new(vec![Connection::new(1)], config);

    {
        let mut conn = pool.checkout().unwrap();
        conn.in_transaction = true;
        println!("   Using: {:?}", *conn);
    }

    pool.process_pool(|idle| println!("   Idle after return: {:?}", idle));
    println!();
}

fn prototype_pool() {
    println!("2. Prototype Pool:");

    let template = Connection::new(0);
    let pool = LazyObjectPool::<Connection>::with_prototype(2, template, PoolConfiguration::default()).unwrap();
    println!("   Cloned from prototype: {:?}", *pool.checkout().unwrap());

    match LazyObjectPool::<Connection>::with_prototype(2, "localhost:5432", PoolConfiguration::default()) {
        Ok(_) => println!("   Unexpectedly accepted a string prototype"),
        Err(e) => println!("   Rejected: {}", e),
    }

    println!();
}

fn detached_checkin() {
    println!("3. Detached Checkin:");

    let pool = EagerObjectPool::new(vec![Connection::new(7)], PoolConfiguration::default());

    let conn = pool.checkout().unwrap();
    pool.checkin_detached(conn).unwrap();
    println!("   Handed back without waiting");

    let conn = pool.checkout_resource(Some(Duration::from_secs(1))).unwrap();
    println!("   Checked out again: {:?}\n", *conn);
}

fn usage_under_load() {
    println!("4. Usage Under Load:");

    let connections = (1..=3).map(Connection::new).collect();
    let pool = Arc::new(EagerObjectPool::new(connections, PoolConfiguration::default()));
    let usage = Arc::new([0usize; 3].map(std::sync::atomic::AtomicUsize::new));

    let workers: Vec<_> = (0..35)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let usage = Arc::clone(&usage);
            thread::spawn(move || {
                let conn = pool.checkout().unwrap();
                usage[conn.id - 1].fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                thread::sleep(Duration::from_millis(5));
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    for (i, count) in usage.iter().enumerate() {
        println!("   Connection {} used {} times", i + 1, count.load(std::sync::atomic::Ordering::Relaxed));
    }
    println!();
}

fn prometheus_export() {
    println!("5. Prometheus Metrics Export:");

    let pool = EagerObjectPool::new(vec![1, 2, 3, 4, 5], PoolConfiguration::default());

    // Use some objects
    {
        let _obj1 = pool.checkout().unwrap();
        let _obj2 = pool.checkout().unwrap();

        let mut tags = std::collections::HashMap::new();
        tags.insert("service".to_string(), "example".to_string());
        tags.insert("env".to_string(), "dev".to_string());

        match pool.export_metrics_prometheus("example_pool", Some(&tags)) {
            Ok(text) => println!("{}", text),
            Err(e) => println!("   Export failed: {}", e),
        }
    }
}
