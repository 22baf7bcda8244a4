//! Presence/proximity sensor types: kinds, selector enumerations, identity,
//! the device-capability snapshot, and the dynamic data-field map.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opensensing_hid_common::DataFieldKey;
use opensensing_hid_common::usages::selector;

use crate::ids::{
    SENSOR_TYPE_HUMAN_PRESENCE, SENSOR_TYPE_HUMAN_PROXIMITY, sensor_usages,
};

/// Sensor kind resolved from the descriptor's sensor-type usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    Presence,
    Proximity,
}

impl SensorKind {
    /// Resolve a sensor-type usage to a kind; `None` for anything this
    /// protocol does not implement.
    pub fn from_usage(usage: u16) -> Option<Self> {
        match usage {
            sensor_usages::BIOMETRIC_HUMAN_PRESENCE => Some(Self::Presence),
            sensor_usages::BIOMETRIC_HUMAN_PROXIMITY => Some(Self::Proximity),
            _ => None,
        }
    }

    /// Short name used in traces and composed friendly names.
    pub fn name(self) -> &'static str {
        match self {
            Self::Presence => "Presence",
            Self::Proximity => "Proximity",
        }
    }

    /// Human-readable description seeded into the property store.
    pub fn description(self) -> &'static str {
        match self {
            Self::Presence => "Detects whether a human is present",
            Self::Proximity => "Measures the distance to a detected human in meters",
        }
    }

    /// Platform sensor-type GUID.
    pub fn type_guid(self) -> Uuid {
        match self {
            Self::Presence => SENSOR_TYPE_HUMAN_PRESENCE,
            Self::Proximity => SENSOR_TYPE_HUMAN_PROXIMITY,
        }
    }
}

/// Platform sensor state published through the state property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum SensorState {
    Ready = 0,
    NotAvailable = 1,
    NoData = 2,
    Initializing = 3,
    AccessDenied = 4,
    Error = 5,
}

impl SensorState {
    /// Map a raw sensor-state selector value to a platform state.
    ///
    /// Devices report either the selector usage low byte or a plain index;
    /// both resolve the same way. Unknown values map to `NotAvailable`.
    pub fn from_selector(raw: u32) -> Self {
        match raw & 0xFF {
            selector::STATE_READY => Self::Ready,
            selector::STATE_NOT_AVAILABLE => Self::NotAvailable,
            selector::STATE_NO_DATA => Self::NoData,
            selector::STATE_INITIALIZING => Self::Initializing,
            selector::STATE_ACCESS_DENIED => Self::AccessDenied,
            selector::STATE_ERROR => Self::Error,
            _ => Self::NotAvailable,
        }
    }
}

/// How the sensor is attached to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum ConnectionType {
    Integrated = 0,
    Attached = 1,
    External = 2,
}

/// Reporting-state selector written back to the device on every refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum ReportingState {
    NoEvents = 0,
    AllEvents = 1,
}

impl ReportingState {
    pub fn selector_value(self) -> u32 {
        match self {
            Self::NoEvents => selector::REPORTING_NO_EVENTS,
            Self::AllEvents => selector::REPORTING_ALL_EVENTS,
        }
    }
}

/// Power-state selector written back to the device on every refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum PowerState {
    Undefined = 0,
    FullPower = 1,
    LowPower = 2,
    Standby = 3,
    Sleep = 4,
    PowerOff = 5,
}

impl PowerState {
    pub fn selector_value(self) -> u32 {
        match self {
            Self::Undefined => selector::POWER_UNDEFINED,
            Self::FullPower => selector::POWER_D0_FULL,
            Self::LowPower => selector::POWER_D1_LOW,
            Self::Standby => selector::POWER_D2_STANDBY,
            Self::Sleep => selector::POWER_D3_SLEEP,
            Self::PowerOff => selector::POWER_D4_OFF,
        }
    }
}

/// Events this protocol raises through the [`crate::events::EventSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorEvent {
    DataUpdated,
    StateChanged,
}

/// Static identity strings and ids supplied by the enumeration layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorIdentity {
    pub manufacturer: String,
    pub product: String,
    pub serial_number: String,
    /// Persistent unique id for this sensor endpoint.
    pub sensor_id: Uuid,
    /// Device-level display name; the kind name is appended when the device
    /// maps more than one sensor.
    pub device_name: String,
}

/// Construction parameters for one sensor endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Sensor-type usage from the report descriptor.
    pub sensor_usage: u16,
    pub link_collection: u16,
    /// Index of this sensor among the device's mapped sensors.
    pub sensor_index: u32,
    pub mapped_sensor_count: u32,
    pub starting_input_report_id: u8,
    pub starting_feature_report_id: u8,
    pub identity: SensorIdentity,
}

/// Device-capability snapshot accumulated across report walks.
///
/// Each optional capability is `Some` once the matching field has been seen
/// in a report; capabilities never revert to `None` for the lifetime of the
/// instance. A value is meaningful only while its slot is `Some`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceProperties {
    // Input-report selectors.
    pub sensor_state_selector: Option<u32>,
    pub event_type_selector: Option<u32>,

    // Feature-report selectors.
    pub reporting_state_selector: Option<u32>,
    pub power_state_selector: Option<u32>,
    pub sensor_status_selector: Option<u32>,
    pub connection_type_selector: Option<u32>,

    // Common value fields.
    pub sensor_state: Option<u32>,
    pub event_type: Option<u32>,
    pub reporting_state: Option<u32>,
    pub power_state: Option<u32>,
    pub sensor_status: Option<u32>,
    pub connection_type: Option<u32>,
    pub report_interval: Option<u32>,
    pub minimum_report_interval: Option<u32>,
    pub global_sensitivity: Option<f32>,
    pub global_maximum: Option<f32>,
    pub global_minimum: Option<f32>,
    pub global_accuracy: Option<f32>,
    pub global_resolution: Option<f32>,
    pub friendly_name: Option<String>,
    pub persistent_unique_id: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub description: Option<String>,

    // Presence/proximity-specific capabilities.
    pub presence_supported: bool,
    pub proximity_range_supported: bool,
    pub proximity_out_of_range_supported: bool,
    pub proximity_sensitivity: Option<f32>,
    pub proximity_maximum: Option<f32>,
    pub proximity_minimum: Option<f32>,
    pub proximity_accuracy: Option<f32>,
    pub proximity_resolution: Option<f32>,

    /// Sticky out-of-range gate: while set, the proximity data field decodes
    /// to the empty state. Cleared only by a fresh in-range indication.
    pub out_of_range: bool,
}

/// Per-field record for vendor-defined data fields outside the fixed set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DynamicField {
    pub usage: u16,
    pub supported: bool,
    pub sensitivity: Option<f32>,
    pub maximum: Option<f32>,
    pub minimum: Option<f32>,
    pub accuracy: Option<f32>,
    pub resolution: Option<f32>,
}

/// Ordered map of vendor-defined data fields, keyed by data-field key.
///
/// Order follows first encounter, matching the supported-data-fields
/// enumeration the synchronizer walks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicFields {
    entries: Vec<(DataFieldKey, DynamicField)>,
}

impl DynamicFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: DataFieldKey) -> Option<&DynamicField> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, f)| f)
    }

    /// Look up the record for `key`, inserting a fresh one for `usage` on
    /// first encounter.
    pub fn entry(&mut self, key: DataFieldKey, usage: u16) -> &mut DynamicField {
        if let Some(idx) = self.entries.iter().position(|(k, _)| *k == key) {
            &mut self.entries[idx].1
        } else {
            self.entries.push((
                key,
                DynamicField {
                    usage,
                    ..DynamicField::default()
                },
            ));
            let last = self.entries.len() - 1;
            &mut self.entries[last].1
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(DataFieldKey, DynamicField)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One-time capability-discovery report for the input report layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputReportConditions {
    pub sensor_state_selector: bool,
    pub event_type_selector: bool,
    pub sensor_state_field: bool,
    pub event_type_field: bool,
}

/// One-time capability-discovery report for the feature report layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureReportConditions {
    pub feature_report: bool,
    pub reporting_state_selector: bool,
    pub power_state_selector: bool,
    pub sensor_status_selector: bool,
    pub connection_type_selector: bool,
    pub reporting_state: bool,
    pub power_state: bool,
    pub sensor_status: bool,
    pub connection_type: bool,
    pub report_interval: bool,
    pub global_sensitivity: bool,
    pub global_maximum: bool,
    pub global_minimum: bool,
    pub global_accuracy: bool,
    pub global_resolution: bool,
    pub minimum_report_interval: bool,
    pub friendly_name: bool,
    pub persistent_unique_id: bool,
    pub manufacturer: bool,
    pub model: bool,
    pub serial_number: bool,
    pub description: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_usage() {
        assert_eq!(
            SensorKind::from_usage(sensor_usages::BIOMETRIC_HUMAN_PRESENCE),
            Some(SensorKind::Presence)
        );
        assert_eq!(
            SensorKind::from_usage(sensor_usages::BIOMETRIC_HUMAN_PROXIMITY),
            Some(SensorKind::Proximity)
        );
        assert_eq!(SensorKind::from_usage(0x0041), None);
    }

    #[test]
    fn test_sensor_state_selector_mapping() {
        assert_eq!(SensorState::from_selector(0x01), SensorState::Ready);
        assert_eq!(SensorState::from_selector(0x0801), SensorState::Ready);
        assert_eq!(SensorState::from_selector(0x03), SensorState::NoData);
        assert_eq!(SensorState::from_selector(0x06), SensorState::Error);
        assert_eq!(SensorState::from_selector(0xEE), SensorState::NotAvailable);
    }

    #[test]
    fn test_dynamic_fields_keep_first_encounter_order() {
        let mut dyn_fields = DynamicFields::new();
        dyn_fields.entry(DataFieldKey::Dynamic(0x04C0), 0x04C0).supported = true;
        dyn_fields.entry(DataFieldKey::Dynamic(0x04C1), 0x04C1).maximum = Some(2.0);
        // Re-entering an existing key must not duplicate it.
        dyn_fields.entry(DataFieldKey::Dynamic(0x04C0), 0x04C0).minimum = Some(0.5);

        assert_eq!(dyn_fields.len(), 2);
        let keys: Vec<_> = dyn_fields.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![DataFieldKey::Dynamic(0x04C0), DataFieldKey::Dynamic(0x04C1)]
        );
        let first = dyn_fields
            .get(DataFieldKey::Dynamic(0x04C0))
            .expect("registered");
        assert!(first.supported);
        assert_eq!(first.minimum, Some(0.5));
    }
}
