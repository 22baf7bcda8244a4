//! Static descriptor tables: which properties and data fields each sensor
//! kind supports, which of them are settable, and which events it raises.

use opensensing_hid_common::{DataFieldKey, PropertyKey};

use crate::types::{SensorEvent, SensorKind};

/// Properties every presence/proximity sensor must expose.
pub const REQUIRED_PROPERTIES: &[PropertyKey] = &[
    PropertyKey::Type,
    PropertyKey::State,
    PropertyKey::MinReportInterval,
    PropertyKey::CurrentReportInterval,
    PropertyKey::PersistentUniqueId,
    PropertyKey::Manufacturer,
    PropertyKey::Model,
    PropertyKey::SerialNumber,
    PropertyKey::FriendlyName,
    PropertyKey::Description,
    PropertyKey::ConnectionType,
    PropertyKey::Category,
];

// There are no optional presence properties.

/// Optional properties exposed only by proximity sensors (composite, keyed by
/// data field).
pub const OPTIONAL_PROXIMITY_PROPERTIES: &[PropertyKey] = &[
    PropertyKey::ChangeSensitivity,
    PropertyKey::RangeMaximum,
    PropertyKey::RangeMinimum,
    PropertyKey::Accuracy,
    PropertyKey::Resolution,
];

/// Settable properties for a presence sensor.
pub const SETTABLE_PRESENCE_PROPERTIES: &[PropertyKey] = &[PropertyKey::CurrentReportInterval];

/// Settable properties for a proximity sensor.
pub const SETTABLE_PROXIMITY_PROPERTIES: &[PropertyKey] = &[
    PropertyKey::ChangeSensitivity,
    PropertyKey::CurrentReportInterval,
];

/// Data fields for a presence sensor; the timestamp is always first.
pub const PRESENCE_DATA_FIELDS: &[DataFieldKey] =
    &[DataFieldKey::Timestamp, DataFieldKey::HumanPresence];

/// Data fields for a proximity sensor; the timestamp is always first.
pub const PROXIMITY_DATA_FIELDS: &[DataFieldKey] =
    &[DataFieldKey::Timestamp, DataFieldKey::HumanProximityMeters];

/// Events raised by both sensor kinds.
pub const SUPPORTED_EVENTS: &[SensorEvent] = &[SensorEvent::DataUpdated, SensorEvent::StateChanged];

/// Supported property keys for a sensor kind, in enumeration order.
pub fn supported_properties(kind: SensorKind) -> Vec<PropertyKey> {
    let mut keys = REQUIRED_PROPERTIES.to_vec();
    if kind == SensorKind::Proximity {
        keys.extend_from_slice(OPTIONAL_PROXIMITY_PROPERTIES);
    }
    keys
}

/// Settable property keys for a sensor kind.
pub fn settable_properties(kind: SensorKind) -> &'static [PropertyKey] {
    match kind {
        SensorKind::Presence => SETTABLE_PRESENCE_PROPERTIES,
        SensorKind::Proximity => SETTABLE_PROXIMITY_PROPERTIES,
    }
}

/// Supported data-field keys for a sensor kind.
pub fn supported_data_fields(kind: SensorKind) -> &'static [DataFieldKey] {
    match kind {
        SensorKind::Presence => PRESENCE_DATA_FIELDS,
        SensorKind::Proximity => PROXIMITY_DATA_FIELDS,
    }
}
