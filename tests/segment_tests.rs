//! Shared segment lifecycle and concurrency tests.
//!
//! These exercise the full stack: encode through the codec, store under the
//! cross-process lock, read back through an independent handle.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use bytebridge::error::Error;
use bytebridge::{Segment, Value};

/// Per-test segment names so parallel tests never collide.
fn uniq(tag: &str) -> String {
    static N: AtomicU32 = AtomicU32::new(0);
    format!(
        "bytebridge-test-{tag}-{}-{}",
        std::process::id(),
        N.fetch_add(1, Ordering::Relaxed)
    )
}

#[test]
fn test_lifecycle_create_write_read_remove() {
    let name = uniq("lifecycle");
    let seg = Segment::create(&name, 4096).unwrap();
    seg.write(&Value::from(42i64)).unwrap();

    // Second, independent handle to the same name.
    let other = Segment::attach(&name).unwrap();
    assert_eq!(other.read().unwrap(), Value::from(42i64));

    Segment::remove(&name).unwrap();
    assert!(matches!(seg.read(), Err(Error::NotFound(_))));
    assert!(matches!(
        seg.write(&Value::Null),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(Segment::remove(&name), Err(Error::NotFound(_))));
}

#[test]
fn test_read_before_first_write_is_empty() {
    let name = uniq("empty");
    let seg = Segment::create(&name, 4096).unwrap();
    assert!(matches!(seg.read(), Err(Error::Empty(_))));
    Segment::remove(&name).unwrap();
}

#[test]
fn test_create_taken_name_fails() {
    let name = uniq("taken");
    let _seg = Segment::create(&name, 4096).unwrap();
    assert!(matches!(
        Segment::create(&name, 4096),
        Err(Error::AlreadyExists(_))
    ));
    Segment::remove(&name).unwrap();
}

#[test]
fn test_attach_missing_name_fails() {
    assert!(matches!(
        Segment::attach(&uniq("missing")),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_overwrite_replaces_payload() {
    let name = uniq("overwrite");
    let seg = Segment::create(&name, 4096).unwrap();
    seg.write(&Value::from("first")).unwrap();
    seg.write(&Value::from("second")).unwrap();
    assert_eq!(seg.read().unwrap(), Value::from("second"));
    Segment::remove(&name).unwrap();
}

#[test]
fn test_growth_past_initial_capacity() {
    let name = uniq("growth");
    // Minimum-sized segment; the payload below is far larger.
    let seg = Segment::create(&name, 0).unwrap();
    let big = Value::Bytes((0..100_000u32).map(|i| (i % 251) as u8).collect());
    seg.write(&big).unwrap();

    // A handle attached before the grow re-resolves the mapping on read.
    let other = Segment::attach(&name).unwrap();
    assert_eq!(other.read().unwrap(), big);

    // Shrinking back to a small payload keeps working.
    seg.write(&Value::from(1i64)).unwrap();
    assert_eq!(other.read().unwrap(), Value::from(1i64));
    Segment::remove(&name).unwrap();
}

#[test]
fn test_failed_write_preserves_payload() {
    let name = uniq("preserve");
    let seg = Segment::create(&name, 4096).unwrap();
    seg.write(&Value::from("committed")).unwrap();

    // Duplicate keys fail in the encoder, before the segment is touched.
    let bad = Value::Map(vec![
        (Value::from("k"), Value::Null),
        (Value::from("k"), Value::Null),
    ]);
    assert!(matches!(seg.write(&bad), Err(Error::DuplicateKey { .. })));

    assert_eq!(seg.read().unwrap(), Value::from("committed"));
    Segment::remove(&name).unwrap();
}

#[test]
fn test_timeouts_pass_when_uncontended() {
    let name = uniq("timeout");
    let seg = Segment::create(&name, 4096).unwrap();
    seg.write_timeout(&Value::from(7i64), Duration::from_secs(1))
        .unwrap();
    assert_eq!(
        seg.read_timeout(Duration::from_secs(1)).unwrap(),
        Value::from(7i64)
    );
    Segment::remove(&name).unwrap();
}

#[test]
fn test_concurrent_writers_never_interleave() {
    let name = uniq("race");
    let seg = Segment::create(&name, 4096).unwrap();
    const WRITERS: u8 = 4;
    const ROUNDS: usize = 25;
    const LEN: usize = 16 * 1024;

    // Each writer stores a payload filled with its own id; any observed
    // payload must be uniform — one complete write, never a byte-level mix.
    let stop = AtomicBool::new(false);
    std::thread::scope(|scope| {
        for id in 1..=WRITERS {
            let writer = Segment::attach(&name).unwrap();
            scope.spawn(move || {
                for _ in 0..ROUNDS {
                    writer.write(&Value::Bytes(vec![id; LEN])).unwrap();
                }
            });
        }
        let reader = Segment::attach(&name).unwrap();
        let stop = &stop;
        let checker = scope.spawn(move || {
            let mut observed = 0usize;
            while !stop.load(Ordering::Relaxed) {
                match reader.read() {
                    Ok(Value::Bytes(payload)) => {
                        assert_eq!(payload.len(), LEN);
                        let first = payload[0];
                        assert!((1..=WRITERS).contains(&first));
                        assert!(
                            payload.iter().all(|&b| b == first),
                            "payload mixed bytes from different writes"
                        );
                        observed += 1;
                    }
                    Err(Error::Empty(_)) => {}
                    Ok(other) => panic!("unexpected value {other:?}"),
                    Err(err) => panic!("read failed: {err:?}"),
                }
            }
            observed
        });
        // Let the checker overlap the writers, then stop it.
        std::thread::sleep(Duration::from_millis(200));
        stop.store(true, Ordering::Relaxed);
        let observed = checker.join().unwrap();
        assert!(observed > 0, "checker never observed a payload");
    });

    match seg.read().unwrap() {
        Value::Bytes(payload) => {
            let first = payload[0];
            assert!(payload.iter().all(|&b| b == first));
        }
        other => panic!("unexpected value {other:?}"),
    }
    Segment::remove(&name).unwrap();
}

#[test]
fn test_handles_are_cheap_and_cloneable() {
    let name = uniq("clone");
    let seg = Segment::create(&name, 4096).unwrap();
    let copy = seg.clone();
    assert_eq!(copy.name(), seg.name());
    seg.write(&Value::from(1i64)).unwrap();
    assert_eq!(copy.read().unwrap(), Value::from(1i64));
    Segment::remove(&name).unwrap();
}
