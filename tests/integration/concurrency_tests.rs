//! Concurrent mutations through independent registry handles.
//!
//! Each thread opens its own `SessionRegistry`, so the only coordination is
//! the on-disk lock, the same as separate processes.

use std::sync::{Arc, Barrier};
use std::thread;

use cnd_state::SessionRegistry;

use super::test_helpers::Fixture;

const WRITERS: usize = 16;

#[test]
fn concurrent_inserts_lose_no_updates() {
    let fx = Fixture::new();
    let path = fx.registry.path().to_path_buf();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let registry = SessionRegistry::new(path.clone());
            let dev = fx.dev("web", &format!("c{i}"));
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.insert("default", &dev, &format!("host:{i}"))
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread").expect("insert succeeds");
    }

    let sessions = fx.registry.all().expect("state file decodes");
    assert_eq!(sessions.len(), WRITERS);
    for i in 0..WRITERS {
        let record = fx
            .registry
            .get("default", &fx.dev("web", &format!("c{i}")))
            .expect("record present");
        assert_eq!(record.agent_handle, format!("host:{i}"));
    }
}

#[test]
fn racing_agents_for_one_session_admit_exactly_one() {
    let fx = Fixture::new();
    let path = fx.registry.path().to_path_buf();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let registry = SessionRegistry::new(path.clone());
            let dev = fx.dev("web", "app");
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.insert("default", &dev, &format!("host:{i}"))
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|handle| handle.join().expect("writer thread"))
        .filter(Result::is_ok)
        .count();

    assert_eq!(successes, 1);
    let record = fx.registry.get("default", &fx.dev("web", "app")).expect("record");
    assert!(record.agent_handle.starts_with("host:"));
}

#[test]
fn readers_never_see_a_partial_document() {
    let fx = Fixture::new();
    let path = fx.registry.path().to_path_buf();

    let writer = {
        let registry = SessionRegistry::new(path.clone());
        let devs: Vec<_> = (0..50).map(|i| fx.dev("web", &format!("c{i}"))).collect();
        thread::spawn(move || {
            for dev in &devs {
                registry.insert("default", dev, "host:1").expect("insert");
            }
        })
    };

    let reader = SessionRegistry::new(path);
    while !writer.is_finished() {
        reader.load().expect("every observed document decodes");
    }
    writer.join().expect("writer thread");

    assert_eq!(fx.registry.all().expect("all").len(), 50);
}
