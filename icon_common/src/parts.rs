//! Slot/part bindings and part properties.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, SystemTime};

use icon_wire::service as wire;

use crate::error::{IconError, IconResult};

/// Maps the slot names of an action type to concrete part names.
///
/// An ordered map, so two bindings compare equal independently of insertion
/// order and the whole map can be hashed.
pub type SlotPartMap = BTreeMap<String, String>;

/// In-memory value of a part property.
///
/// The variant is chosen when the property is first initialized for a given
/// `(part, property)` pair and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PartPropertyValue {
    Bool(bool),
    Double(f64),
}

impl PartPropertyValue {
    pub fn to_wire(&self) -> wire::PartPropertyValue {
        match self {
            Self::Bool(value) => wire::PartPropertyValue::BoolValue(*value),
            Self::Double(value) => wire::PartPropertyValue::DoubleValue(*value),
        }
    }

    pub fn from_wire(value: &wire::PartPropertyValue) -> IconResult<Self> {
        match value {
            wire::PartPropertyValue::BoolValue(v) => Ok(Self::Bool(*v)),
            wire::PartPropertyValue::DoubleValue(v) => Ok(Self::Double(*v)),
            wire::PartPropertyValue::Unset => Err(IconError::invalid_argument(
                "Part property has no value set",
            )),
        }
    }

    /// Assigns `src` into `self` without changing the held variant. Fails
    /// when the variants differ; `property_name` is used in the diagnostic.
    pub fn assign(&mut self, src: PartPropertyValue, property_name: &str) -> IconResult<()> {
        match (self, src) {
            (Self::Bool(dst), Self::Bool(value)) => {
                *dst = value;
                Ok(())
            }
            (Self::Double(dst), Self::Double(value)) => {
                *dst = value;
                Ok(())
            }
            (Self::Bool(_), Self::Double(_)) => Err(IconError::invalid_argument(format!(
                "Cannot assign double value to boolean property '{property_name}'"
            ))),
            (Self::Double(_), Self::Bool(_)) => Err(IconError::invalid_argument(format!(
                "Cannot assign boolean value to double property '{property_name}'"
            ))),
        }
    }
}

/// Property values per part, keyed by part name and property name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartPropertyMap {
    pub properties: HashMap<String, HashMap<String, PartPropertyValue>>,
}

/// Part properties together with the times at which they were captured.
#[derive(Debug, Clone)]
pub struct TimestampedPartProperties {
    /// Wall-clock capture time.
    pub timestamp_wall: SystemTime,
    /// Control-loop time since server start.
    pub timestamp_control: Duration,
    pub properties: HashMap<String, HashMap<String, PartPropertyValue>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_part_map_equality_ignores_insertion_order() {
        let mut a = SlotPartMap::new();
        a.insert("left".to_string(), "arm0".to_string());
        a.insert("right".to_string(), "arm1".to_string());

        let mut b = SlotPartMap::new();
        b.insert("right".to_string(), "arm1".to_string());
        b.insert("left".to_string(), "arm0".to_string());

        assert_eq!(a, b);
    }

    #[test]
    fn property_value_wire_roundtrip() {
        for value in [PartPropertyValue::Bool(true), PartPropertyValue::Double(2.5)] {
            let wire = value.to_wire();
            assert_eq!(PartPropertyValue::from_wire(&wire).unwrap(), value);
        }
    }

    #[test]
    fn unset_wire_value_is_rejected() {
        let err = PartPropertyValue::from_wire(&wire::PartPropertyValue::Unset).unwrap_err();
        assert!(matches!(err, IconError::InvalidArgument(_)));
    }

    #[test]
    fn assign_keeps_variant() {
        let mut value = PartPropertyValue::Double(1.0);
        value
            .assign(PartPropertyValue::Double(2.0), "payload_mass")
            .unwrap();
        assert_eq!(value, PartPropertyValue::Double(2.0));

        let err = value
            .assign(PartPropertyValue::Bool(true), "payload_mass")
            .unwrap_err();
        assert!(err.to_string().contains("payload_mass"));
        assert_eq!(value, PartPropertyValue::Double(2.0));
    }
}
