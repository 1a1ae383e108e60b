//! Integration tests for shared memory region create/open/delete.

use std::sync::Once;

use courier_memory::{platform_accessor, Ownership, SharedMemoryAccessor};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

#[test]
fn test_create_then_open_sees_same_size() {
    init_tracing();
    let accessor = platform_accessor().unwrap();

    for size in [1usize, 4096, 65_537] {
        let name = unique_name("courier-it");
        let mut owner = accessor.try_create(&name, size).unwrap();
        assert_eq!(owner.size(), size);
        assert_eq!(owner.ownership(), Ownership::Owner);

        let mut attached = accessor.try_open(&name).unwrap();
        assert_eq!(attached.size(), size);
        assert_eq!(attached.ownership(), Ownership::Attached);

        accessor.delete(Some(&mut attached));
        accessor.delete(Some(&mut owner));
    }
}

#[test]
fn test_writes_visible_through_second_reference() {
    init_tracing();
    let accessor = platform_accessor().unwrap();
    let name = unique_name("courier-it");

    let mut owner = accessor.try_create(&name, 64).unwrap();
    let mut attached = accessor.try_open(&name).unwrap();

    owner.write_at(8, b"from host").unwrap();
    assert_eq!(attached.read_at(8, 9).unwrap(), b"from host");

    attached.write_at(32, b"from worker").unwrap();
    assert_eq!(owner.read_at(32, 11).unwrap(), b"from worker");

    accessor.delete(Some(&mut attached));
    accessor.delete(Some(&mut owner));
}

#[test]
fn test_colliding_create_fails_without_corrupting_live_region() {
    init_tracing();
    let accessor = platform_accessor().unwrap();
    let name = unique_name("courier-it");

    let mut live = accessor.try_create(&name, 32).unwrap();
    live.write_at(0, b"payload").unwrap();

    assert!(accessor.try_create(&name, 32).is_none());
    assert!(accessor.try_create(&name, 1024).is_none());

    assert_eq!(live.size(), 32);
    assert_eq!(live.read_at(0, 7).unwrap(), b"payload");
    accessor.delete(Some(&mut live));
}

#[test]
fn test_delete_is_idempotent() {
    init_tracing();
    let accessor = platform_accessor().unwrap();

    accessor.delete(None);

    let mut region = accessor.try_create(&unique_name("courier-it"), 16).unwrap();
    accessor.delete(Some(&mut region));
    assert!(region.is_released());
    accessor.delete(Some(&mut region));
    assert!(region.is_released());
}

#[test]
fn test_open_unknown_region_fails_softly() {
    init_tracing();
    let accessor = platform_accessor().unwrap();
    assert!(accessor.try_open(&unique_name("courier-missing")).is_none());
}
