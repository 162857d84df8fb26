#![cfg(feature = "sync")]

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use rbtree_map::RBTreeMap;
use rbtree_map::sync::SyncRBTreeMap;

const THREADS: u64 = 8;
const PER_THREAD: u64 = 500;

#[test]
fn concurrent_writers_all_land() {
    let map = Arc::new(SyncRBTreeMap::new());
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    // Interleave the key ranges so writers rebalance the same subtrees.
                    map.insert(i * THREADS + t, t);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(map.len() as u64, THREADS * PER_THREAD);
    let map = Arc::try_unwrap(map).ok().unwrap().into_inner();
    assert_eq!(map.check_invariants(), Ok(()));
    assert!(map.keys().copied().eq(0..THREADS * PER_THREAD));
}

#[test]
fn readers_never_see_a_broken_tree() {
    let map = Arc::new(SyncRBTreeMap::from((0..1_000u64).map(|k| (k, k)).collect::<RBTreeMap<_, _>>()));

    let writer = {
        let map = Arc::clone(&map);
        thread::spawn(move || {
            for k in 0..1_000u64 {
                if k % 2 == 0 {
                    map.remove(&k);
                } else {
                    map.insert(k + 1_000, k);
                }
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for _ in 0..200 {
                    let guard = map.read();
                    assert_eq!(guard.check_invariants(), Ok(()));
                    assert_eq!(guard.iter().count(), guard.len());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(map.len(), 1_000);
    assert_eq!(map.first_key_value(), Some((1, 1)));
    assert_eq!(map.last_key_value(), Some((1_999, 999)));
}

#[test]
fn snapshot_is_sorted() {
    let map = SyncRBTreeMap::new();
    for k in [5, 3, 9, 1] {
        map.insert(k, k * 10);
    }
    assert_eq!(map.snapshot(), [(1, 10), (3, 30), (5, 50), (9, 90)]);
    assert!(map.contains_key(&9));
    map.clear();
    assert!(map.is_empty());
    assert_eq!(map.get(&9), None);
}
