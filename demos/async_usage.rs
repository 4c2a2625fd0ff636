//! Async usage examples

use esox_gatedpool::{EagerObjectPool, LazyObjectPool, PoolConfiguration};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    println!("=== EsoxSolutions.GatedPool - Async Examples ===\n");

    // Example 1: Async checkout
    async_checkout().await;

    // Example 2: Async with timeout
    async_with_timeout().await;

    // Example 3: Lazy pool with warmup
    lazy_warmup().await;

    // Example 4: Concurrent access
    concurrent_access().await;
}

async fn async_checkout() {
    println!("1. Async Checkout:");
    let pool = EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default());

    {
        let obj = pool.checkout_async().await.unwrap();
        println!("   Got object asynchronously: {}", *obj);
    }

    println!();
}

async fn async_with_timeout() {
    println!("2. Async with Timeout:");

    let config = PoolConfiguration::new().with_timeout(Duration::from_millis(100));

    let pool = EagerObjectPool::new(vec![42], config);

    // Get the only object
    let _obj = pool.try_checkout().unwrap();

    // Try to get another (should timeout)
    match pool.checkout_async().await {
        Ok(_) => println!("   Got object"),
        Err(e) => println!("   Error: {}", e),
    }

    println!();
}

async fn lazy_warmup() {
    println!("3. Lazy Pool with Warmup:");

    let pool = Arc::new(LazyObjectPool::new(
        10,
        || {
            println!("   Creating new object...");
            42
        },
        PoolConfiguration::default(),
    ));

    // Warm up the pool
    println!("   Warming up pool with 5 objects...");
    let created = pool.warmup_async(5).await;
    println!("   Created {}, available after warmup: {}", created, pool.available_count());

    // Get object (should not create new one)
    {
        let obj = pool.checkout_async().await.unwrap();
        println!("   Got pre-created object: {}", *obj);
    }

    println!();
}

async fn concurrent_access() {
    println!("4. Concurrent Access:");

    let config = PoolConfiguration::new().with_timeout(Duration::from_secs(1));
    let pool = Arc::new(EagerObjectPool::new(vec![1, 2, 3, 4, 5], config));

    let mut handles = vec![];

    for i in 0..10 {
        let pool_clone = Arc::clone(&pool);
        let handle = tokio::spawn(async move {
            match pool_clone.checkout_async().await {
                Ok(obj) => {
                    println!("   Task {} got object: {}", i, *obj);
                    sleep(Duration::from_millis(50)).await;
                }
                Err(e) => println!("   Task {} couldn't get object: {}", i, e),
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.unwrap();
    }

    println!("   Final available: {}", pool.available_count());
}
