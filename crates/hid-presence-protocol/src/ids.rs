//! Presence/proximity usage ids, platform GUIDs, and compile-time defaults.

use uuid::{Uuid, uuid};

/// Biometric sensor-type usages on the HID sensor page.
pub mod sensor_usages {
    /// Human presence sensor.
    pub const BIOMETRIC_HUMAN_PRESENCE: u16 = 0x0011;
    /// Human proximity sensor.
    pub const BIOMETRIC_HUMAN_PROXIMITY: u16 = 0x0012;
}

/// Biometric data-field usages (modifier nibble zero).
pub mod data_usages {
    /// Boolean human-presence reading.
    pub const HUMAN_PRESENCE: u16 = 0x04B1;
    /// Proximity distance reading, meters.
    pub const HUMAN_PROXIMITY_RANGE: u16 = 0x04B2;
    /// Out-of-range indication paired with the proximity reading.
    pub const HUMAN_PROXIMITY_OUT_OF_RANGE: u16 = 0x04B3;
}

/// Functional category GUID for biometric sensors.
pub const SENSOR_CATEGORY_BIOMETRIC: Uuid = uuid!("ca19690f-a2c7-477d-a99e-99ec6e2b5648");

/// Sensor type GUID: human presence.
pub const SENSOR_TYPE_HUMAN_PRESENCE: Uuid = uuid!("c138c12b-ad52-451c-9375-87f518ff10c6");

/// Sensor type GUID: human proximity.
pub const SENSOR_TYPE_HUMAN_PROXIMITY: Uuid = uuid!("5220dae9-3179-4430-9f90-06266d2a34de");

/// Compile-time defaults seeded at construction and used as the last link of
/// the device-specific → global → default resolution chain.
pub mod defaults {
    pub const CURRENT_REPORT_INTERVAL_MS: u32 = 100;
    pub const MIN_REPORT_INTERVAL_MS: u32 = 50;
    pub const PRESENCE_SENSITIVITY: f32 = 1.0;
    pub const PROXIMITY_SENSITIVITY_M: f32 = 0.1;
    pub const PROXIMITY_MAXIMUM_M: f32 = 5.0;
    pub const PROXIMITY_MINIMUM_M: f32 = 0.0;
    pub const PROXIMITY_ACCURACY_M: f32 = 0.1;
    pub const PROXIMITY_RESOLUTION_M: f32 = 0.01;
}

/// Maximum number of characters kept from device-reported strings; longer
/// strings truncate deterministically at this length.
pub const MAX_STRING_CHARS: usize = 64;
