// tests/limits.rs

use fleetdag::errors::FleetError;
use fleetdag::limits::{Counter, Group, IntoKey, Key, ToCount};
use proptest::prelude::*;

#[test]
fn counter_with_maximum_reports_saturation() {
    let mut counter = Counter::new(2);
    assert!(counter.is_maximum_set());
    assert!(counter.is_active());

    assert_eq!(counter.increment(), 1);
    assert!(counter.is_available());
    assert_eq!(counter.increment(), 2);
    assert!(!counter.is_active());
    assert!(counter.is_inactive());
    assert!(counter.is_overflow());

    assert_eq!(counter.increment(), 3);
    assert!(counter.is_overflow());

    assert_eq!(counter.decrement(), 2);
    assert_eq!(counter.decrement(), 1);
    assert!(counter.is_active());
}

#[test]
fn counter_without_maximum_is_always_active() {
    let mut counter = Counter::unlimited();
    for _ in 0..1_000 {
        counter.increment();
    }
    assert_eq!(counter.current(), 1_000);
    assert!(!counter.is_maximum_set());
    assert!(counter.is_active());
    assert!(!counter.is_overflow());
}

#[test]
fn counter_decrement_saturates_at_zero() {
    let mut counter = Counter::new(1);
    assert_eq!(counter.decrement(), 0);
    assert_eq!(counter.current(), 0);
}

#[test]
fn counter_reset_keeps_maximum() {
    let mut counter = Counter::with_current(3, 3);
    assert!(counter.is_inactive());
    counter.reset();
    assert_eq!(counter.current(), 0);
    assert_eq!(counter.maximum(), 3);
}

#[test]
fn counter_coerces_loose_values() {
    assert_eq!(Counter::new("4").maximum(), 4);
    assert_eq!(Counter::new("2.9").maximum(), 2);
    assert_eq!(Counter::new("lots").maximum(), 0);
    assert_eq!(Counter::new(-3).maximum(), 0);
    assert_eq!(Counter::new(f64::NAN).maximum(), 0);
    assert_eq!(Counter::new(true).maximum(), 0);
    assert_eq!(Counter::new(None::<u64>).maximum(), 0);
    assert_eq!(Counter::new(Some(5u8)).maximum(), 5);
    assert_eq!(Counter::new(vec![1, 2]).maximum(), 0);
    assert_eq!(toml::Value::Integer(7).to_count(), 7);
    assert_eq!(toml::Value::Boolean(true).to_count(), 0);

    let mut counter = Counter::new(2);
    counter.set_maximum("nope");
    assert!(!counter.is_maximum_set());
    counter.set_current(-1);
    assert_eq!(counter.current(), 0);
}

#[test]
fn counter_display_shows_usage() {
    let counter = Counter::with_current(3, 1);
    let text = counter.to_string();
    assert!(text.contains('1'));
    assert!(text.contains('3'));
}

#[test]
fn unknown_key_is_unlimited() {
    let mut group = Group::new();
    let reboot = group.get(":reboot").unwrap();
    assert!(reboot.is_active());
    for _ in 0..50 {
        reboot.increment();
    }
    assert!(group.get(":reboot").unwrap().is_active());
    assert!(group.exists(":reboot"));
}

#[test]
fn keys_are_canonicalized() {
    let mut group = Group::new();
    group.create("7", 2, 0).unwrap();
    assert!(group.contains_key(7u32));
    assert!(group.contains_key(String::from("7")));
    assert!(group.contains_key('7'));
    assert_eq!(group.len(), 1);
}

#[test]
fn empty_or_absent_keys_are_rejected() {
    let mut group = Group::new();
    assert!(matches!(group.get(""), Err(FleetError::InvalidArgument(_))));
    assert!(matches!(
        group.get(None::<&str>),
        Err(FleetError::InvalidArgument(_))
    ));
    assert!(matches!(
        group.create("", 1, 0),
        Err(FleetError::InvalidArgument(_))
    ));
    assert!("".into_key().is_err());
    assert!(group.is_empty());
}

#[test]
fn iteration_follows_insertion_order() {
    let mut group = Group::new();
    group.create("b", 1, 0).unwrap();
    group.create("a", 2, 0).unwrap();
    group.get("c").unwrap();
    group.create("b", 5, 0).unwrap();

    let keys: Vec<&str> = group.keys().map(Key::as_str).collect();
    assert_eq!(keys, vec!["b", "a", "c"]);

    let maximums: Vec<u64> = (&group).into_iter().map(Counter::maximum).collect();
    assert_eq!(maximums, vec![5, 2, 0]);
}

#[test]
fn remove_and_delete_drop_counters() {
    let mut group = Group::new();
    group.create("a", 1, 0).unwrap();
    group.create("b", 1, 0).unwrap();

    assert!(group.remove("a").unwrap().is_some());
    assert!(group.delete("a").unwrap().is_none());
    assert!(!group.exists("a"));
    let keys: Vec<&str> = group.keys().map(Key::as_str).collect();
    assert_eq!(keys, vec!["b"]);
}

#[test]
fn try_acquire_is_all_or_nothing() {
    let mut group = Group::new();
    group.create("db", 1, 0).unwrap();
    group.create("reboot", 1, 1).unwrap();

    let keys = vec!["db".into_key().unwrap(), "reboot".into_key().unwrap()];
    assert!(!group.try_acquire(&keys));
    assert_eq!(group.peek("db").unwrap().unwrap().current(), 0);

    group.release(&keys[1..]);
    assert!(group.try_acquire(&keys));
    assert_eq!(group.peek("db").unwrap().unwrap().current(), 1);
    assert_eq!(group.peek("reboot").unwrap().unwrap().current(), 1);

    group.release(&keys);
    assert_eq!(group.peek("db").unwrap().unwrap().current(), 0);
}

#[test]
fn try_acquire_counts_repeated_keys_once() {
    let mut group = Group::new();
    group.create("db", 1, 0).unwrap();
    let db = "db".into_key().unwrap();

    assert!(group.try_acquire(&[db.clone(), db.clone()]));
    assert_eq!(group.peek("db").unwrap().unwrap().current(), 1);
}

#[test]
fn reset_all_zeroes_every_counter() {
    let mut group = Group::new();
    group.create("a", 2, 2).unwrap();
    group.create("b", 0, 9).unwrap();
    group.reset_all();
    assert!(group.iter().all(|c| c.current() == 0));
    assert_eq!(group.peek("a").unwrap().unwrap().maximum(), 2);
}

proptest! {
    #[test]
    fn counter_activity_matches_definition(max in 0u64..20, incs in 0usize..40, decs in 0usize..40) {
        let mut counter = Counter::new(max);
        for _ in 0..incs {
            counter.increment();
        }
        for _ in 0..decs {
            counter.decrement();
        }

        let expected = incs.saturating_sub(decs) as u64;
        prop_assert_eq!(counter.current(), expected);
        prop_assert_eq!(counter.is_active(), max == 0 || expected < max);
        prop_assert_eq!(counter.is_inactive(), !counter.is_active());
        prop_assert_eq!(counter.is_overflow(), counter.is_inactive());
    }

    #[test]
    fn acquire_never_exceeds_maximum(max in 1u64..5, attempts in 1usize..20) {
        let mut group = Group::new();
        group.create("slot", max, 0).unwrap();
        let slot = vec!["slot".into_key().unwrap()];

        let granted = (0..attempts).filter(|_| group.try_acquire(&slot)).count() as u64;
        prop_assert_eq!(granted, max.min(attempts as u64));
        prop_assert!(group.peek("slot").unwrap().unwrap().current() <= max);
    }
}
