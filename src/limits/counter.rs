// src/limits/counter.rs

//! Bounded admission counter.

use std::fmt;

/// Lenient conversion into a counter value.
///
/// Anything that is not a positive number (negative, non-numeric text,
/// booleans, absent values, collections) becomes `0`. This is a sanitizer,
/// not a parser: it never fails.
pub trait ToCount {
    fn to_count(&self) -> u64;
}

macro_rules! unsigned_to_count {
    ($($t:ty),*) => {
        $(impl ToCount for $t {
            fn to_count(&self) -> u64 {
                u64::try_from(*self).unwrap_or(u64::MAX)
            }
        })*
    };
}

macro_rules! signed_to_count {
    ($($t:ty),*) => {
        $(impl ToCount for $t {
            fn to_count(&self) -> u64 {
                u64::try_from(*self).unwrap_or(0)
            }
        })*
    };
}

unsigned_to_count!(u8, u16, u32, u64, usize);
signed_to_count!(i8, i16, i32, i64, isize);

impl ToCount for f64 {
    fn to_count(&self) -> u64 {
        if self.is_finite() && *self > 0.0 {
            self.trunc() as u64
        } else {
            0
        }
    }
}

impl ToCount for f32 {
    fn to_count(&self) -> u64 {
        f64::from(*self).to_count()
    }
}

impl ToCount for bool {
    fn to_count(&self) -> u64 {
        0
    }
}

impl ToCount for str {
    fn to_count(&self) -> u64 {
        let s = self.trim();
        if let Ok(n) = s.parse::<i64>() {
            return n.to_count();
        }
        s.parse::<f64>().map(|f| f.to_count()).unwrap_or(0)
    }
}

impl ToCount for String {
    fn to_count(&self) -> u64 {
        self.as_str().to_count()
    }
}

impl<T: ToCount + ?Sized> ToCount for &T {
    fn to_count(&self) -> u64 {
        (**self).to_count()
    }
}

impl<T: ToCount> ToCount for Option<T> {
    fn to_count(&self) -> u64 {
        self.as_ref().map(ToCount::to_count).unwrap_or(0)
    }
}

impl<T> ToCount for [T] {
    fn to_count(&self) -> u64 {
        0
    }
}

impl<T> ToCount for Vec<T> {
    fn to_count(&self) -> u64 {
        0
    }
}

impl ToCount for toml::Value {
    fn to_count(&self) -> u64 {
        match self {
            toml::Value::Integer(n) => n.to_count(),
            toml::Value::Float(f) => f.to_count(),
            toml::Value::String(s) => s.to_count(),
            _ => 0,
        }
    }
}

/// Current usage against an optional maximum.
///
/// A maximum of `0` means "no limit": such a counter is always active,
/// whatever its current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    current: u64,
    maximum: u64,
}

impl Counter {
    pub fn new(maximum: impl ToCount) -> Self {
        Self {
            current: 0,
            maximum: maximum.to_count(),
        }
    }

    pub fn with_current(maximum: impl ToCount, current: impl ToCount) -> Self {
        Self {
            current: current.to_count(),
            maximum: maximum.to_count(),
        }
    }

    /// Counter without a maximum.
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn maximum(&self) -> u64 {
        self.maximum
    }

    pub fn set_current(&mut self, value: impl ToCount) {
        self.current = value.to_count();
    }

    pub fn set_maximum(&mut self, value: impl ToCount) {
        self.maximum = value.to_count();
    }

    pub fn increment(&mut self) -> u64 {
        self.current = self.current.saturating_add(1);
        self.current
    }

    /// Floors at zero.
    pub fn decrement(&mut self) -> u64 {
        self.current = self.current.saturating_sub(1);
        self.current
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }

    pub fn is_maximum_set(&self) -> bool {
        self.maximum != 0
    }

    /// Room for one more?
    pub fn is_active(&self) -> bool {
        !self.is_maximum_set() || self.current < self.maximum
    }

    pub fn is_available(&self) -> bool {
        self.is_active()
    }

    pub fn is_inactive(&self) -> bool {
        !self.is_active()
    }

    pub fn is_overflow(&self) -> bool {
        self.is_inactive()
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_maximum_set() {
            write!(f, "{}/{}", self.current, self.maximum)
        } else {
            write!(f, "{}/unlimited", self.current)
        }
    }
}
