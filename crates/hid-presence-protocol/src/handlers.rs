//! Usage dispatch and the common-field handler.
//!
//! Instead of branching on usage codes at every field, the sensor builds a
//! `(usage, modifier) → handler` table once at construction from its kind
//! tables. Table misses route to the vendor-extension path.

use std::collections::HashMap;

use tracing::{debug, warn};

use opensensing_hid_common::usages::{event, modifier, property, units};
use opensensing_hid_common::{
    FieldCap, PropertyKey, Value, extract_physical, normalize_unit_exponent, read_scalar,
};

use crate::ids::{MAX_STRING_CHARS, data_usages};
use crate::protocol::PresenceSensor;
use crate::types::{SensorKind, SensorState};

/// Identity of the routine that resolves one `(usage, modifier)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldHandler {
    // Input selectors.
    SensorState,
    EventType,
    // Feature selectors.
    ReportingState,
    PowerState,
    SensorStatus,
    ConnectionType,
    // Common property fields.
    ReportInterval,
    MinimumReportInterval,
    GlobalSensitivity,
    GlobalMaximum,
    GlobalMinimum,
    GlobalAccuracy,
    GlobalResolution,
    FriendlyName,
    PersistentUniqueId,
    Manufacturer,
    Model,
    SerialNumber,
    Description,
    // Kind-specific data fields.
    HumanPresence,
    ProximityRange,
    ProximityOutOfRange,
    // Kind-specific usage-modifier fields (feature plane).
    PresenceSensitivity,
    ProximitySensitivity,
    ProximityMaximum,
    ProximityMinimum,
    ProximityAccuracy,
    ProximityResolution,
}

pub(crate) type HandlerTable = HashMap<(u16, u16), FieldHandler>;

/// Build the dispatch table for a sensor kind.
pub(crate) fn handler_table(kind: SensorKind) -> HandlerTable {
    use FieldHandler as H;

    let mut table = HandlerTable::new();
    let common = [
        ((event::SENSOR_STATE, modifier::NONE), H::SensorState),
        ((event::SENSOR_EVENT, modifier::NONE), H::EventType),
        ((property::REPORTING_STATE, modifier::NONE), H::ReportingState),
        ((property::POWER_STATE, modifier::NONE), H::PowerState),
        ((property::SENSOR_STATUS, modifier::NONE), H::SensorStatus),
        ((property::CONNECTION_TYPE, modifier::NONE), H::ConnectionType),
        ((property::REPORT_INTERVAL, modifier::NONE), H::ReportInterval),
        (
            (property::MINIMUM_REPORT_INTERVAL, modifier::NONE),
            H::MinimumReportInterval,
        ),
        (
            (property::CHANGE_SENSITIVITY_ABS, modifier::NONE),
            H::GlobalSensitivity,
        ),
        ((property::MAXIMUM, modifier::NONE), H::GlobalMaximum),
        ((property::MINIMUM, modifier::NONE), H::GlobalMinimum),
        ((property::ACCURACY, modifier::NONE), H::GlobalAccuracy),
        ((property::RESOLUTION, modifier::NONE), H::GlobalResolution),
        ((property::FRIENDLY_NAME, modifier::NONE), H::FriendlyName),
        (
            (property::PERSISTENT_UNIQUE_ID, modifier::NONE),
            H::PersistentUniqueId,
        ),
        ((property::MANUFACTURER, modifier::NONE), H::Manufacturer),
        ((property::MODEL, modifier::NONE), H::Model),
        ((property::SERIAL_NUMBER, modifier::NONE), H::SerialNumber),
        ((property::DESCRIPTION, modifier::NONE), H::Description),
    ];
    table.extend(common);

    table.insert((data_usages::HUMAN_PRESENCE, modifier::NONE), H::HumanPresence);
    table.insert(
        (data_usages::HUMAN_PRESENCE, modifier::CHANGE_SENSITIVITY_ABS),
        H::PresenceSensitivity,
    );

    if kind == SensorKind::Proximity {
        table.insert(
            (data_usages::HUMAN_PROXIMITY_RANGE, modifier::NONE),
            H::ProximityRange,
        );
        table.insert(
            (data_usages::HUMAN_PROXIMITY_OUT_OF_RANGE, modifier::NONE),
            H::ProximityOutOfRange,
        );
        table.insert(
            (
                data_usages::HUMAN_PROXIMITY_RANGE,
                modifier::CHANGE_SENSITIVITY_ABS,
            ),
            H::ProximitySensitivity,
        );
        table.insert(
            (data_usages::HUMAN_PROXIMITY_RANGE, modifier::MAX),
            H::ProximityMaximum,
        );
        table.insert(
            (data_usages::HUMAN_PROXIMITY_RANGE, modifier::MIN),
            H::ProximityMinimum,
        );
        table.insert(
            (data_usages::HUMAN_PROXIMITY_RANGE, modifier::ACCURACY),
            H::ProximityAccuracy,
        );
        table.insert(
            (data_usages::HUMAN_PROXIMITY_RANGE, modifier::RESOLUTION),
            H::ProximityResolution,
        );
    }

    table
}

/// One field pulled out of a report buffer, ready for dispatch.
#[derive(Debug, Clone)]
pub(crate) struct DecodedField {
    pub cap: FieldCap,
    /// Base usage with the modifier nibble masked off.
    pub usage: u16,
    pub modifier: u16,
    pub raw: u32,
    pub signed: i64,
    pub unit_exp: i8,
    /// Raw element bytes for array fields (report count > 1).
    pub array: Option<Vec<u8>>,
}

impl DecodedField {
    pub fn physical(&self) -> f64 {
        extract_physical(self.cap.logical_min, self.raw, self.signed, self.unit_exp)
    }

    /// Whether the field's unit allows a meter interpretation.
    pub fn meter_or_unspecified(&self) -> bool {
        self.cap.units == units::METER || self.cap.units == units::NOT_SPECIFIED
    }

    /// Decode an array field as a NUL-terminated UTF-16LE string, truncated
    /// deterministically at [`MAX_STRING_CHARS`].
    pub fn text(&self) -> Option<String> {
        let bytes = self.array.as_deref()?;
        let code_units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();
        let text: String = char::decode_utf16(code_units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .take(MAX_STRING_CHARS)
            .collect();
        Some(text)
    }
}

impl<D> PresenceSensor<D> {
    /// Resolve the two input selector fields, if the descriptor carries them,
    /// before the main walk so field handlers can consult them.
    pub(crate) fn decode_input_selectors(&mut self, report: &[u8], report_id: u8) {
        for idx in 0..self.input_caps.len() {
            let cap = self.input_caps[idx];
            if cap.report_id != report_id || cap.usage_modifier() != modifier::NONE {
                continue;
            }
            let slot = match cap.data_usage() {
                event::SENSOR_STATE => &mut self.snapshot.sensor_state_selector,
                event::SENSOR_EVENT => &mut self.snapshot.event_type_selector,
                _ => continue,
            };
            match read_scalar(report, &cap) {
                Ok(raw) => *slot = Some(raw),
                Err(err) => debug!(
                    usage = cap.usage,
                    %err,
                    "input selector present in descriptor but unreadable"
                ),
            }
        }
    }

    /// Resolve the four feature selector fields before the main walk.
    pub(crate) fn decode_feature_selectors(&mut self, report: &[u8], report_id: u8) {
        for idx in 0..self.feature_caps.len() {
            let cap = self.feature_caps[idx];
            if cap.report_id != report_id || cap.usage_modifier() != modifier::NONE {
                continue;
            }
            let slot = match cap.data_usage() {
                property::REPORTING_STATE => &mut self.snapshot.reporting_state_selector,
                property::POWER_STATE => &mut self.snapshot.power_state_selector,
                property::SENSOR_STATUS => &mut self.snapshot.sensor_status_selector,
                property::CONNECTION_TYPE => &mut self.snapshot.connection_type_selector,
                _ => continue,
            };
            match read_scalar(report, &cap) {
                Ok(raw) => *slot = Some(raw),
                Err(err) => debug!(
                    usage = cap.usage,
                    %err,
                    "feature selector present in descriptor but unreadable"
                ),
            }
        }
    }

    /// Route one decoded input field to its handler.
    pub(crate) fn dispatch_input(&mut self, handler: FieldHandler, field: &DecodedField) {
        use FieldHandler as H;

        if self.common_input(handler, field) {
            return;
        }
        match handler {
            H::HumanPresence => self.handle_presence_input(field),
            H::ProximityRange => self.handle_proximity_range_input(field),
            H::ProximityOutOfRange => self.handle_out_of_range_input(field),
            H::PresenceSensitivity
            | H::ProximitySensitivity
            | H::ProximityMaximum
            | H::ProximityMinimum
            | H::ProximityAccuracy
            | H::ProximityResolution => {
                debug!(
                    usage = field.usage,
                    modifier = field.modifier,
                    "modifier not supported for this input data field"
                );
            }
            // Feature-plane usages showing up in an input report are outside
            // the input contract; treat them like any unrecognized usage.
            _ => self.register_dynamic_input(field),
        }
    }

    /// Route one decoded feature field to its handler.
    pub(crate) fn dispatch_feature(&mut self, handler: FieldHandler, field: &DecodedField) {
        use FieldHandler as H;

        if self.common_feature(handler, field) {
            return;
        }
        match handler {
            H::ProximitySensitivity => {
                if field.meter_or_unspecified() {
                    self.snapshot.proximity_sensitivity = Some(field.physical() as f32);
                }
            }
            H::ProximityMaximum => {
                if field.meter_or_unspecified() {
                    self.snapshot.proximity_maximum = Some(field.physical() as f32);
                }
            }
            H::ProximityMinimum => {
                if field.meter_or_unspecified() {
                    self.snapshot.proximity_minimum = Some(field.physical() as f32);
                }
            }
            H::ProximityAccuracy => {
                if field.meter_or_unspecified() {
                    self.snapshot.proximity_accuracy = Some(field.physical() as f32);
                }
            }
            H::ProximityResolution => {
                if field.meter_or_unspecified() {
                    self.snapshot.proximity_resolution = Some(field.physical() as f32);
                }
            }
            H::HumanPresence | H::PresenceSensitivity | H::ProximityRange
            | H::ProximityOutOfRange => {
                debug!(
                    usage = field.usage,
                    modifier = field.modifier,
                    "modifier not supported for this feature data field"
                );
            }
            _ => {}
        }
    }

    /// Handle the usages shared by every sensor kind on the input plane.
    ///
    /// Returns whether the usage was recognized so the caller can skip
    /// kind-specific dispatch.
    fn common_input(&mut self, handler: FieldHandler, field: &DecodedField) -> bool {
        match handler {
            FieldHandler::SensorState => {
                self.snapshot.sensor_state = Some(field.raw);
                let state = SensorState::from_selector(field.raw);
                let previous = self.properties.get_u32(PropertyKey::State);
                if previous != Some(state as u32) {
                    self.properties
                        .insert(PropertyKey::State, Value::U32(state as u32));
                    self.sink.state_changed(state);
                }
                true
            }
            FieldHandler::EventType => {
                self.snapshot.event_type = Some(field.raw);
                true
            }
            _ => false,
        }
    }

    /// Handle the ~20 usages shared by every sensor kind on the feature
    /// plane, writing the device-capability snapshot.
    fn common_feature(&mut self, handler: FieldHandler, field: &DecodedField) -> bool {
        use FieldHandler as H;

        match handler {
            H::ReportingState => self.snapshot.reporting_state = Some(field.raw),
            H::PowerState => self.snapshot.power_state = Some(field.raw),
            H::SensorStatus => self.snapshot.sensor_status = Some(field.raw),
            H::ConnectionType => self.snapshot.connection_type = Some(field.raw),
            H::ReportInterval => {
                self.snapshot.report_interval = Some(field.physical().max(0.0) as u32);
            }
            H::MinimumReportInterval => {
                self.snapshot.minimum_report_interval = Some(field.physical().max(0.0) as u32);
            }
            H::GlobalSensitivity => {
                self.snapshot.global_sensitivity = Some(field.physical() as f32);
            }
            H::GlobalMaximum => self.snapshot.global_maximum = Some(field.physical() as f32),
            H::GlobalMinimum => self.snapshot.global_minimum = Some(field.physical() as f32),
            H::GlobalAccuracy => self.snapshot.global_accuracy = Some(field.physical() as f32),
            H::GlobalResolution => self.snapshot.global_resolution = Some(field.physical() as f32),
            H::FriendlyName => return self.set_snapshot_string(field, |s| &mut s.friendly_name),
            H::PersistentUniqueId => {
                return self.set_snapshot_string(field, |s| &mut s.persistent_unique_id);
            }
            H::Manufacturer => return self.set_snapshot_string(field, |s| &mut s.manufacturer),
            H::Model => return self.set_snapshot_string(field, |s| &mut s.model),
            H::SerialNumber => return self.set_snapshot_string(field, |s| &mut s.serial_number),
            H::Description => return self.set_snapshot_string(field, |s| &mut s.description),
            // Input selectors have no meaning in a feature report; consume
            // them so they do not register as vendor fields.
            H::SensorState | H::EventType => {
                debug!(usage = field.usage, "input selector usage in feature report");
            }
            _ => return false,
        }
        true
    }

    fn set_snapshot_string(
        &mut self,
        field: &DecodedField,
        slot: impl FnOnce(&mut crate::types::DeviceProperties) -> &mut Option<String>,
    ) -> bool {
        match field.text() {
            Some(text) => *slot(&mut self.snapshot) = Some(text),
            None => warn!(
                usage = field.usage,
                "string usage declared as a scalar field; ignoring"
            ),
        }
        true
    }
}

/// Normalize a capability node's raw exponent nibble.
pub(crate) fn field_unit_exponent(cap: &FieldCap) -> i8 {
    normalize_unit_exponent(cap.unit_exp)
}
