//! Stable keys identifying sensor properties and data fields.
//!
//! Keys are fixed at sensor initialization; values behind them are mutable
//! for the lifetime of the instance. Vendor-defined extensions use the open
//! variants so descriptor-driven fields outside the fixed set stay
//! addressable.

use serde::{Deserialize, Serialize};

/// Key of a sensor property (configuration/identity plane).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKey {
    /// Functional category GUID.
    Category,
    /// Sensor type GUID.
    Type,
    State,
    MinReportInterval,
    CurrentReportInterval,
    PersistentUniqueId,
    Manufacturer,
    Model,
    SerialNumber,
    FriendlyName,
    Description,
    ConnectionType,
    /// Composite, keyed by data field.
    ChangeSensitivity,
    /// Composite, keyed by data field.
    RangeMaximum,
    /// Composite, keyed by data field.
    RangeMinimum,
    /// Composite, keyed by data field.
    Accuracy,
    /// Composite, keyed by data field.
    Resolution,
    /// Vendor-defined property, identified by its HID usage.
    Vendor(u16),
}

/// Key of a sensor data field (sample plane).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFieldKey {
    Timestamp,
    HumanPresence,
    HumanProximityMeters,
    /// Vendor-defined data field, identified by its HID usage.
    Dynamic(u16),
}
