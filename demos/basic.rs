//! Basic usage examples for EagerObjectPool and LazyObjectPool

use esox_gatedpool::{EagerObjectPool, LazyObjectPool, PoolConfiguration};
use std::time::Duration;

fn main() {
    println!("=== EsoxSolutions.GatedPool - Basic Examples ===\n");

    // Example 1: Simple pool with integers
    simple_pool();

    // Example 2: Checkout with timeout
    timed_checkout();

    // Example 3: Try methods
    try_methods();

    // Example 4: Lazy pool
    lazy_pool();

    // Example 5: Metrics and health
    metrics_and_health();
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let pool = EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default());

    {
        let obj = pool.checkout().unwrap();
        println!("   Got object: {}", *obj);
        // Object automatically returned when dropped
    }

    println!("   Available after return: {}\n", pool.available_count());
}

fn timed_checkout() {
    println!("2. Checkout With Timeout:");

    let config = PoolConfiguration::new().with_timeout(Duration::from_millis(200));
    let pool = EagerObjectPool::new(vec![1, 2], config);

    let obj1 = pool.checkout().unwrap();
    let obj2 = pool.checkout().unwrap();
    println!("   Checked out: {}, available: {}", pool.checked_out_count(), pool.available_count());

    match pool.checkout() {
        Some(_) => println!("   Unexpectedly got a third object"),
        None => println!("   Third checkout timed out"),
    }

    pool.checkin(obj1).unwrap();
    drop(obj2);
    println!("   After return - Available: {}\n", pool.available_count());
}

fn try_methods() {
    println!("3. Try Methods:");
    let pool = EagerObjectPool::new(vec![42], PoolConfiguration::default());

    // Get the only object
    let obj1 = pool.try_checkout();
    assert!(obj1.is_some());
    println!("   First try: Success");

    // Try again while object is checked out
    let obj2 = pool.try_checkout();
    assert!(obj2.is_none());
    println!("   Second try: None (pool exhausted)");

    drop(obj1); // Return object

    // Try again after return
    let obj3 = pool.try_checkout();
    assert!(obj3.is_some());
    println!("   Third try: Success\n");
}

fn lazy_pool() {
    println!("4. Lazy Pool:");
    let pool = LazyObjectPool::new(
        3,
        || {
            println!("   Creating new buffer...");
            Vec::<u8>::with_capacity(1024)
        },
        PoolConfiguration::<Vec<u8>>::new().with_reuse_hook(|buf| buf.clear()),
    );

    for round in 0..3 {
        let mut buf = pool.checkout().unwrap();
        buf.extend_from_slice(b"payload");
        println!("   Round {}: buffer holds {} bytes", round, buf.len());
    }

    println!("   Created {} of {} allowed\n", pool.created_count(), pool.capacity());
}

fn metrics_and_health() {
    println!("5. Metrics and Health:");
    let pool = EagerObjectPool::new(vec![1, 2, 3, 4, 5], PoolConfiguration::default());

    // Use some objects
    {
        let _obj1 = pool.checkout().unwrap();
        let _obj2 = pool.checkout().unwrap();

        let health = pool.get_health_status();
        println!("   Health: {}", if health.is_healthy { "Healthy" } else { "Unhealthy" });
        println!("   Utilization: {:.1}%", health.utilization * 100.0);
        println!("   Checked out: {}, Available: {}", health.checked_out_objects, health.available_objects);
    }

    let metrics = pool.export_metrics();
    println!("\n   Metrics:");
    for (key, value) in metrics {
        println!("     {}: {}", key, value);
    }
}
