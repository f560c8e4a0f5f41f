//! Concurrency Tests
//!
//! Many threads sharing one store, the way connection handlers do.

use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;
use vksc_server::store::ContentStore;

const THREADS: usize = 8;

fn shared_store() -> (TempDir, Arc<ContentStore>) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ContentStore::open(dir.path()).unwrap());
    (dir, store)
}

fn run_all<F>(store: &Arc<ContentStore>, work: F)
where
    F: Fn(usize, &ContentStore) + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let store = Arc::clone(store);
            let work = Arc::clone(&work);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                work(i, &store);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_memory_appends_are_not_lost() {
    let (_dir, store) = shared_store();

    run_all(&store, |_, store| {
        for _ in 0..100 {
            store.append("@counter", &[1], false).unwrap();
        }
    });

    let data = store.get("@counter", false).unwrap().unwrap();
    assert_eq!(data.len(), THREADS * 100);
}

#[test]
fn test_concurrent_file_appends_are_not_lost() {
    let (_dir, store) = shared_store();

    run_all(&store, |i, store| {
        for _ in 0..50 {
            store.append("shared.log", &[i as u8], false).unwrap();
        }
    });

    let data = store.get("shared.log", false).unwrap().unwrap();
    assert_eq!(data.len(), THREADS * 50);
    for i in 0..THREADS {
        assert_eq!(data.iter().filter(|&&b| b == i as u8).count(), 50);
    }
}

#[test]
fn test_get_and_remove_has_one_winner() {
    for _ in 0..20 {
        let (_dir, store) = shared_store();
        store.store("@prize", b"token").unwrap();

        let winners = Arc::new(parking_lot::Mutex::new(0usize));
        let counter = Arc::clone(&winners);
        run_all(&store, move |_, store| {
            if store.get("@prize", true).unwrap().is_some() {
                *counter.lock() += 1;
            }
        });

        assert_eq!(*winners.lock(), 1);
    }
}

#[test]
fn test_concurrent_overwrites_leave_one_whole_value() {
    let (_dir, store) = shared_store();

    run_all(&store, |i, store| {
        let value = vec![i as u8; 4096];
        for _ in 0..20 {
            store.store("blob.bin", &value).unwrap();
        }
    });

    let data = store.get("blob.bin", false).unwrap().unwrap();
    assert_eq!(data.len(), 4096);
    assert!(data.iter().all(|&b| b == data[0]));
}
