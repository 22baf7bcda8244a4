//! Typed values and the ordered key→value container backing sensor stores.
//!
//! Property and data-field stores preserve insertion order: data-field
//! position is meaningful (the timestamp always comes first) and property
//! enumeration order is part of the consumer-visible contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::DataFieldKey;

/// A sensor property or data-field value.
///
/// `Empty` means no reading has been produced ("field withheld");
/// `Null` means a reading exists but was suppressed (e.g. bound violated).
/// Consumers may rely on the distinction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Null,
    Bool(bool),
    U32(u32),
    F32(f32),
    Str(String),
    Guid(Uuid),
    Time(DateTime<Utc>),
    /// Nested property set keyed by data field (composite properties).
    Bag(OrderedBag<DataFieldKey>),
}

/// Insertion-ordered key→value container with typed accessors.
///
/// Inserting an existing key replaces the value in place, preserving the
/// key's original position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderedBag<K> {
    entries: Vec<(K, Value)>,
}

impl<K: Copy + PartialEq> OrderedBag<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: Value) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: K) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: K) -> bool {
        self.entries.iter().any(|(k, _)| *k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_bool(&self, key: K) -> Option<bool> {
        match self.get(key) {
            Some(Value::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_u32(&self, key: K) -> Option<u32> {
        match self.get(key) {
            Some(Value::U32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_f32(&self, key: K) -> Option<f32> {
        match self.get(key) {
            Some(Value::F32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, key: K) -> Option<&str> {
        match self.get(key) {
            Some(Value::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn get_guid(&self, key: K) -> Option<Uuid> {
        match self.get(key) {
            Some(Value::Guid(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_time(&self, key: K) -> Option<DateTime<Utc>> {
        match self.get(key) {
            Some(Value::Time(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bag(&self, key: K) -> Option<&OrderedBag<DataFieldKey>> {
        match self.get(key) {
            Some(Value::Bag(v)) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::PropertyKey;

    #[test]
    fn test_insert_preserves_order() {
        let mut bag = OrderedBag::new();
        bag.insert(PropertyKey::Type, Value::Empty);
        bag.insert(PropertyKey::State, Value::U32(2));
        bag.insert(PropertyKey::FriendlyName, Value::Empty);
        // Replacing an existing key keeps its position.
        bag.insert(PropertyKey::State, Value::U32(0));

        let keys: Vec<_> = bag.keys().collect();
        assert_eq!(
            keys,
            vec![
                PropertyKey::Type,
                PropertyKey::State,
                PropertyKey::FriendlyName
            ]
        );
        assert_eq!(bag.get_u32(PropertyKey::State), Some(0));
    }

    #[test]
    fn test_typed_accessors_reject_mismatched_types() {
        let mut bag = OrderedBag::new();
        bag.insert(PropertyKey::State, Value::U32(1));
        assert_eq!(bag.get_f32(PropertyKey::State), None);
        assert_eq!(bag.get_u32(PropertyKey::State), Some(1));
        assert_eq!(bag.get_u32(PropertyKey::Model), None);
    }

    #[test]
    fn test_nested_bag_round_trip() {
        let mut inner = OrderedBag::new();
        inner.insert(DataFieldKey::HumanProximityMeters, Value::F32(0.1));

        let mut bag = OrderedBag::new();
        bag.insert(PropertyKey::ChangeSensitivity, Value::Bag(inner));

        let read = bag
            .get_bag(PropertyKey::ChangeSensitivity)
            .expect("composite present");
        assert_eq!(read.get_f32(DataFieldKey::HumanProximityMeters), Some(0.1));
    }

    #[test]
    fn test_empty_and_null_are_distinct() {
        let mut bag = OrderedBag::new();
        bag.insert(DataFieldKey::HumanProximityMeters, Value::Empty);
        assert_eq!(
            bag.get(DataFieldKey::HumanProximityMeters),
            Some(&Value::Empty)
        );
        bag.insert(DataFieldKey::HumanProximityMeters, Value::Null);
        assert_eq!(
            bag.get(DataFieldKey::HumanProximityMeters),
            Some(&Value::Null)
        );
    }
}
