use crate::integration::support::TestStore;
use sqlfs::{FsNode, LockRegistry, SqlFs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

#[test]
fn handles_on_one_location_serialize_mutations() {
    let store = TestStore::new();
    let first = store.open();
    let second = store.open();
    assert_eq!(store.registry.ref_count(first.lock_key()), 2);

    let (started_tx, started_rx) = mpsc::channel();
    let committed = Arc::new(AtomicBool::new(false));

    let committed_by_writer = Arc::clone(&committed);
    let writer = thread::spawn(move || {
        let root = first.root().unwrap();
        first
            .atomically(|_| {
                root.add_dir("first")?;
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(200));
                root.add_dir("second")?;
                committed_by_writer.store(true, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
    });

    let waiter = thread::spawn(move || {
        started_rx.recv().unwrap();
        let root = second.root().unwrap();
        root.add_dir("third").unwrap();
        let saw_commit = committed.load(Ordering::SeqCst);
        let names: Vec<String> = root
            .children()
            .unwrap()
            .iter()
            .map(|c| c.name().unwrap())
            .collect();
        (saw_commit, names)
    });

    writer.join().unwrap();
    let (saw_commit, names) = waiter.join().unwrap();
    assert!(saw_commit, "second handle ran inside the first handle's transaction");
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[test]
fn failed_unit_on_one_handle_is_invisible_to_another() {
    let store = TestStore::new();
    let first = store.open();
    let second = store.open();

    let root = first.root().unwrap();
    let result = first.atomically(|_| {
        root.add_dir("temp")?;
        root.add_dir("temp")?;
        Ok(())
    });
    assert!(result.is_err());
    assert!(!second.exists("/temp").unwrap());
}

#[test]
fn different_locations_do_not_share_a_lock() {
    let a = TestStore::new();
    let registry = LockRegistry::shared();
    let fs_a = SqlFs::open(a.path(), &registry).unwrap();
    let b = TestStore::new();
    let fs_b = SqlFs::open(b.path(), &registry).unwrap();

    assert_ne!(fs_a.lock_key(), fs_b.lock_key());
    assert_eq!(registry.len(), 2);

    let (tx, rx) = mpsc::channel();
    let holder = thread::spawn(move || {
        fs_a.atomically(|fs| {
            fs.root()?.add_dir("held")?;
            tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(300));
            Ok(())
        })
        .unwrap();
    });

    rx.recv().unwrap();
    let started = std::time::Instant::now();
    fs_b.root().unwrap().add_dir("free").unwrap();
    assert!(started.elapsed() < Duration::from_millis(300));
    holder.join().unwrap();
    drop(fs_b);
    assert!(registry.is_empty());
}

#[test]
fn equivalent_spellings_share_a_lock() {
    let store = TestStore::new();
    let direct = store.open();
    let dotted = store.dir.path().join(".").join("store.db");
    let other = SqlFs::open(&dotted, &store.registry).unwrap();
    assert_eq!(direct.lock_key(), other.lock_key());
    assert_eq!(store.registry.ref_count(direct.lock_key()), 2);
}
