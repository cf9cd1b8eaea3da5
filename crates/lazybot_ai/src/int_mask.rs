//! Sparse integer sets with a baked bitset view

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator of the canonical string form
pub const SEPARATOR: char = '/';

/// Largest value representable in the bitset
pub const MAX_VALUE: u32 = 63;

/// A set of small non-negative integers.
///
/// The canonical form is a `/`-separated string such as `"0/2/5"`. Membership
/// queries read a 64-bit bitset that is only refreshed by [`IntMask::bake`];
/// after any mutation the bitset is stale until baked again.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct IntMask {
    values: String,
    mask: u64,
    stale: bool,
}

impl IntMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and bake from values
    pub fn from_values(values: impl IntoIterator<Item = u32>) -> Self {
        let mut mask = Self::new();
        for value in values {
            mask.add(value);
        }
        mask.bake();
        mask
    }

    /// Parse a delimited string. Non-numeric items are dropped. Not baked.
    pub fn parse(text: &str) -> Self {
        let mut mask = Self {
            values: text.to_string(),
            mask: 0,
            stale: true,
        };
        mask.validate();
        mask
    }

    /// Canonical string form
    pub fn as_str(&self) -> &str {
        &self.values
    }

    /// Bitset as of the last bake
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Whether the string changed since the last bake
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Values in canonical order
    pub fn values(&self) -> Vec<u32> {
        parse_values(&self.values)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> {
        self.values().into_iter()
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Add a value; duplicates are ignored
    pub fn add(&mut self, value: u32) {
        let mut values = self.values();
        if !values.contains(&value) {
            values.push(value);
        }
        self.store(values);
    }

    pub fn remove(&mut self, value: u32) {
        let values = self.values().into_iter().filter(|v| *v != value).collect();
        self.store(values);
    }

    /// Normalize the string: dedupe and drop non-numeric items
    pub fn validate(&mut self) {
        let values = self.values();
        self.store(values);
    }

    /// Keep values `>= min`
    pub fn retain_min(&mut self, min: u32) {
        self.retain(|v| v >= min);
    }

    /// Keep values `<= max`
    pub fn retain_max(&mut self, max: u32) {
        self.retain(|v| v <= max);
    }

    /// Keep values in `[min, max]`
    pub fn retain_range(&mut self, min: u32, max: u32) {
        self.retain(|v| v >= min && v <= max);
    }

    pub fn retain(&mut self, keep: impl Fn(u32) -> bool) {
        let values = self.values().into_iter().filter(|v| keep(*v)).collect();
        self.store(values);
    }

    /// Rebuild the bitset from the string and return it
    pub fn bake(&mut self) -> u64 {
        self.validate();

        self.mask = 0;
        for value in self.values() {
            if value > MAX_VALUE {
                log::warn!("mask value {} does not fit a 64-bit set, skipped", value);
                continue;
            }
            self.mask |= 1u64 << value;
        }
        self.stale = false;
        self.mask
    }

    /// Membership against the baked bitset. An empty bitset contains nothing.
    pub fn contains(&self, value: u32) -> bool {
        if self.mask == 0 || value > MAX_VALUE {
            return false;
        }
        self.mask & (1u64 << value) != 0
    }

    fn store(&mut self, values: Vec<u32>) {
        let joined = values
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string());
        if joined != self.values {
            self.stale = true;
        }
        self.values = joined;
    }
}

fn parse_values(text: &str) -> Vec<u32> {
    let mut values = Vec::new();
    for item in text.trim_matches(|c| c == ' ' || c == SEPARATOR).split(SEPARATOR) {
        if let Ok(value) = item.trim().parse::<u32>() {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

// Equality ignores the baked cache
impl PartialEq for IntMask {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for IntMask {}

impl FromStr for IntMask {
    type Err = std::convert::Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(text))
    }
}

impl From<String> for IntMask {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<IntMask> for String {
    fn from(mask: IntMask) -> Self {
        mask.values
    }
}

impl fmt::Display for IntMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.values)
    }
}

impl fmt::Debug for IntMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntMask(\"{}\", {:#b}", self.values, self.mask)?;
        if self.stale {
            write!(f, ", stale")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let mask = IntMask::parse(" /3/1/x/3/ 2/");
        assert_eq!(mask.as_str(), "3/1/2");
        assert_eq!(mask.values(), vec![3, 1, 2]);
    }

    #[test]
    fn test_bake_sets_bits() {
        let mut mask = IntMask::parse("0/2/5");
        assert!(mask.is_stale());
        assert!(!mask.contains(2));

        assert_eq!(mask.bake(), 0b100101);
        assert!(!mask.is_stale());
        assert!(mask.contains(0));
        assert!(mask.contains(5));
        assert!(!mask.contains(1));
    }

    #[test]
    fn test_remove_then_rebake() {
        let mut mask = IntMask::from_values([1, 4, 7]);
        mask.remove(4);

        // Stale until baked
        assert!(mask.contains(4));
        mask.bake();
        assert!(!mask.contains(4));
        assert_eq!(mask.mask(), (1 << 1) | (1 << 7));
    }

    #[test]
    fn test_range_filters() {
        let mut mask = IntMask::parse("0/1/2/3/4/5");
        mask.retain_min(1);
        assert_eq!(mask.as_str(), "1/2/3/4/5");
        mask.retain_max(4);
        assert_eq!(mask.as_str(), "1/2/3/4");
        mask.retain_range(2, 3);
        assert_eq!(mask.as_str(), "2/3");
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut mask = IntMask::new();
        mask.add(2);
        mask.add(2);
        assert_eq!(mask.as_str(), "2");
        mask.bake();
        mask.add(2);
        assert!(!mask.is_stale());
    }

    #[test]
    fn test_empty_contains_nothing() {
        let mut mask = IntMask::new();
        assert_eq!(mask.bake(), 0);
        assert!(!mask.contains(0));
    }

    #[test]
    fn test_large_values_skipped_in_bitset() {
        let mut mask = IntMask::parse("1/64/100");
        assert_eq!(mask.bake(), 0b10);
        assert!(!mask.contains(64));
        assert_eq!(mask.values(), vec![1, 64, 100]);
    }

    #[test]
    fn test_serde_as_string() {
        let mask = IntMask::from_values([0, 3]);
        let json = serde_json::to_string(&mask).unwrap();
        assert_eq!(json, "\"0/3\"");

        let back: IntMask = serde_json::from_str("\"3/0/0\"").unwrap();
        assert_eq!(back.as_str(), "3/0");
        assert!(back.is_stale());
    }

    #[test]
    fn test_equality_ignores_bake() {
        let baked = IntMask::from_values([2, 5]);
        let raw = IntMask::parse("2/5");
        assert!(raw.is_stale());
        assert_eq!(baked, raw);
        assert_ne!(baked, IntMask::parse("5/2"));
    }
}
