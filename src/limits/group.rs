// src/limits/group.rs

//! Named registry of [`Counter`]s.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::errors::{FleetError, Result};
use crate::limits::counter::{Counter, ToCount};

/// Canonical counter key.
///
/// Every identifier is reduced to its textual form, so `"7"` and `7` name
/// the same counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Conversion of an identifier into a canonical [`Key`].
///
/// Absent (`None`) and empty identifiers are rejected with
/// [`FleetError::InvalidArgument`].
pub trait IntoKey {
    fn into_key(self) -> Result<Key>;
}

fn key_from_text(text: &str) -> Result<Key> {
    if text.is_empty() {
        return Err(FleetError::InvalidArgument(
            "counter key must not be empty".to_string(),
        ));
    }
    Ok(Key(text.to_string()))
}

impl IntoKey for Key {
    fn into_key(self) -> Result<Key> {
        Ok(self)
    }
}

impl IntoKey for &Key {
    fn into_key(self) -> Result<Key> {
        Ok(self.clone())
    }
}

impl IntoKey for &str {
    fn into_key(self) -> Result<Key> {
        key_from_text(self)
    }
}

impl IntoKey for String {
    fn into_key(self) -> Result<Key> {
        key_from_text(&self)
    }
}

impl IntoKey for &String {
    fn into_key(self) -> Result<Key> {
        key_from_text(self)
    }
}

impl IntoKey for char {
    fn into_key(self) -> Result<Key> {
        key_from_text(&self.to_string())
    }
}

macro_rules! numeric_into_key {
    ($($t:ty),*) => {
        $(impl IntoKey for $t {
            fn into_key(self) -> Result<Key> {
                key_from_text(&self.to_string())
            }
        })*
    };
}

numeric_into_key!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl<T: IntoKey> IntoKey for Option<T> {
    fn into_key(self) -> Result<Key> {
        match self {
            Some(inner) => inner.into_key(),
            None => Err(FleetError::InvalidArgument(
                "counter key must not be absent".to_string(),
            )),
        }
    }
}

/// Counters keyed by canonical [`Key`], iterated in insertion order.
///
/// Looking up an unknown key with [`Group::get`] creates an unlimited
/// counter on the spot.
#[derive(Debug, Clone, Default)]
pub struct Group {
    counters: HashMap<Key, Counter>,
    order: Vec<Key>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Existing counter for `key`, or a freshly created unlimited one.
    pub fn get(&mut self, key: impl IntoKey) -> Result<&mut Counter> {
        let key = key.into_key()?;
        if !self.counters.contains_key(&key) {
            debug!(counter = %key, "creating unlimited counter on first use");
            self.order.push(key.clone());
        }
        Ok(self.counters.entry(key).or_default())
    }

    /// Read-only lookup; never creates a counter.
    pub fn peek(&self, key: impl IntoKey) -> Result<Option<&Counter>> {
        let key = key.into_key()?;
        Ok(self.counters.get(&key))
    }

    /// Create (or replace) the counter at `key`.
    pub fn create(
        &mut self,
        key: impl IntoKey,
        maximum: impl ToCount,
        current: impl ToCount,
    ) -> Result<&mut Counter> {
        self.set(key, Counter::with_current(maximum, current))
    }

    /// Store a pre-built counter at `key`, replacing any existing one.
    ///
    /// A replaced counter keeps its original position in iteration order.
    pub fn set(&mut self, key: impl IntoKey, counter: Counter) -> Result<&mut Counter> {
        let key = key.into_key()?;
        if !self.counters.contains_key(&key) {
            self.order.push(key.clone());
        }
        let slot = self.counters.entry(key).or_default();
        *slot = counter;
        Ok(slot)
    }

    pub fn contains_key(&self, key: impl IntoKey) -> bool {
        match key.into_key() {
            Ok(key) => self.counters.contains_key(&key),
            Err(_) => false,
        }
    }

    pub fn exists(&self, key: impl IntoKey) -> bool {
        self.contains_key(key)
    }

    /// Remove the counter at `key`; a no-op for unknown keys.
    pub fn remove(&mut self, key: impl IntoKey) -> Result<Option<Counter>> {
        let key = key.into_key()?;
        let removed = self.counters.remove(&key);
        if removed.is_some() {
            self.order.retain(|k| *k != key);
        }
        Ok(removed)
    }

    pub fn delete(&mut self, key: impl IntoKey) -> Result<Option<Counter>> {
        self.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.order.iter()
    }

    /// Counters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Counter> {
        self.order.iter().filter_map(|key| self.counters.get(key))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Key, &Counter)> {
        self.order
            .iter()
            .filter_map(|key| self.counters.get(key).map(|c| (key, c)))
    }

    /// Zero every counter's current value; maximums are kept.
    pub fn reset_all(&mut self) {
        for counter in self.counters.values_mut() {
            counter.reset();
        }
    }

    /// Admission check and reservation as one unit: if every counter named
    /// by `keys` is active, increment them all and return `true`; otherwise
    /// change nothing and return `false`.
    ///
    /// Unknown keys are created as unlimited counters. Repeated keys count
    /// once.
    pub fn try_acquire(&mut self, keys: &[Key]) -> bool {
        let keys = dedup(keys);

        for key in &keys {
            if !self.counters.contains_key(*key) {
                self.order.push((*key).clone());
                self.counters.insert((*key).clone(), Counter::unlimited());
            }
        }

        let blocked = keys
            .iter()
            .copied()
            .find(|key| self.counters.get(*key).is_some_and(Counter::is_inactive));

        if let Some(key) = blocked {
            debug!(counter = %key, "admission refused; counter is saturated");
            return false;
        }

        for key in &keys {
            if let Some(counter) = self.counters.get_mut(*key) {
                counter.increment();
            }
        }
        true
    }

    /// Give back what [`Group::try_acquire`] reserved.
    pub fn release(&mut self, keys: &[Key]) {
        for key in dedup(keys) {
            if let Some(counter) = self.counters.get_mut(key) {
                counter.decrement();
            }
        }
    }
}

fn dedup(keys: &[Key]) -> Vec<&Key> {
    let mut seen: Vec<&Key> = Vec::with_capacity(keys.len());
    for key in keys {
        if !seen.contains(&key) {
            seen.push(key);
        }
    }
    seen
}

impl<'a> IntoIterator for &'a Group {
    type Item = &'a Counter;
    type IntoIter = Box<dyn Iterator<Item = &'a Counter> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
