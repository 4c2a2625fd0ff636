// EsoxSolutions.GatedPool
// Semaphore-gated, thread-safe object pool

// This is just a binary wrapper - the actual library is in lib.rs
// Run examples with: cargo run --example basic

use esox_gatedpool::{EagerObjectPool, PoolConfiguration};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    println!("=== EsoxSolutions.GatedPool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    // Three resources, four borrowers, nobody gives anything back.
    println!("Quick Demo:");
    let pool = Arc::new(EagerObjectPool::new(
        vec!["alpha", "beta", "gamma"],
        PoolConfiguration::default(),
    ));

    let borrowers: Vec<_> = (0..4)
        .map(|i| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let obj = pool.checkout_resource(Some(Duration::from_secs(2)));
                match &obj {
                    Some(obj) => println!("  Borrower {}: got {}", i, **obj),
                    None => println!("  Borrower {}: timed out", i),
                }
                // Hold on until every borrower has tried.
                thread::sleep(Duration::from_millis(2500));
                obj.is_some()
            })
        })
        .collect();

    let served = borrowers
        .into_iter()
        .filter_map(|handle| handle.join().ok())
        .filter(|served| *served)
        .count();

    println!("  Served: {}, available after return: {}", served, pool.available_count());
}
