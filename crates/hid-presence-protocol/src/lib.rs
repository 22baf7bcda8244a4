//! Human presence/proximity HID sensor report core.
//!
//! Bidirectional translator between the vendor-neutral sensor property/
//! data-field model and the fixed-layout binary reports of HID biometric
//! presence and proximity sensors. Input reports decode into typed data-field
//! values with unit gating, range gating, and a sticky out-of-range flag;
//! feature reports decode into a device-capability snapshot and settable
//! properties re-encode into outgoing buffers.
//!
//! The crate is I/O-free: capability tables and report buffers come from the
//! transport owner through [`opensensing_hid_common::SensorDevice`], decoded
//! updates leave through [`events::EventSink`].

pub mod events;
pub mod ids;
pub mod protocol;
pub mod tables;
pub mod types;

mod datafields;
mod handlers;
mod sync;

pub use events::{EventSink, NullSink};
pub use protocol::{DecodeSummary, FeatureRefresh, PresenceSensor};
pub use types::{
    ConnectionType, DeviceProperties, DynamicField, DynamicFields, FeatureReportConditions,
    InputReportConditions, PowerState, ReportingState, SensorConfig, SensorEvent, SensorIdentity,
    SensorKind, SensorState,
};

pub use opensensing_hid_common::{
    DataFieldKey, FieldCap, HidSensorError, OrderedBag, PropertyKey, ReportKind, SensorDevice,
    Value,
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PresenceError {
    /// The descriptor's sensor-type usage is not a presence/proximity sensor;
    /// construction fails outright.
    #[error("unsupported presence/proximity sensor usage 0x{0:04X}")]
    UnsupportedSensorUsage(u16),

    /// Host-side update for a property outside this sensor's supported set.
    #[error("property {0:?} is not in this sensor's supported set")]
    UnsupportedProperty(PropertyKey),

    /// Report-layer failure: buffer length mismatch, field access, or device
    /// feature read.
    #[error(transparent)]
    Hid(#[from] HidSensorError),
}

pub type PresenceResult<T> = Result<T, PresenceError>;
