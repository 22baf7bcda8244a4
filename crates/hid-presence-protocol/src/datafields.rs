//! Presence/proximity-specific data-field handling and the vendor-extension
//! path for descriptor-defined fields outside the fixed set.

use tracing::debug;

use opensensing_hid_common::usages::modifier;
use opensensing_hid_common::{DataFieldKey, Value};

use crate::handlers::DecodedField;
use crate::ids::defaults;
use crate::protocol::PresenceSensor;

impl<D> PresenceSensor<D> {
    /// Boolean human-presence reading: any nonzero raw value is "present".
    /// Always published; presence is never gated.
    pub(crate) fn handle_presence_input(&mut self, field: &DecodedField) {
        self.snapshot.presence_supported = true;
        let present = field.raw != 0;
        self.data_fields
            .insert(DataFieldKey::HumanPresence, Value::Bool(present));
    }

    /// Proximity distance reading, meters.
    ///
    /// Published only for meter/unspecified units; any other unit yields the
    /// empty state rather than a misinterpreted number. In-unit readings are
    /// gated against the effective range bounds and the sticky out-of-range
    /// flag: a violated bound publishes the null state (valid field, no
    /// usable reading).
    pub(crate) fn handle_proximity_range_input(&mut self, field: &DecodedField) {
        self.snapshot.proximity_range_supported = true;
        let value = if field.meter_or_unspecified() {
            let distance = field.physical() as f32;
            let max = self.effective_range_maximum();
            let min = self.effective_range_minimum();
            if self.snapshot.out_of_range || distance > max || distance < min {
                Value::Null
            } else {
                Value::F32(distance)
            }
        } else {
            Value::Empty
        };
        self.data_fields
            .insert(DataFieldKey::HumanProximityMeters, value);
    }

    /// Out-of-range indication: when set, the proximity field is withheld for
    /// this sample and the sticky flag keeps suppressing readings until the
    /// device reports in-range again.
    pub(crate) fn handle_out_of_range_input(&mut self, field: &DecodedField) {
        self.snapshot.proximity_out_of_range_supported = true;
        self.snapshot.out_of_range = field.raw != 0;
        if self.snapshot.out_of_range {
            self.data_fields
                .insert(DataFieldKey::HumanProximityMeters, Value::Empty);
        }
    }

    /// Vendor-extension path for unrecognized input usages: record the usage
    /// in the dynamic table and publish the scalar value so future samples
    /// resolve generically.
    pub(crate) fn register_dynamic_input(&mut self, field: &DecodedField) {
        let key = DataFieldKey::Dynamic(field.usage);
        self.dynamic.entry(key, field.usage).supported = true;
        if field.array.is_none() {
            let value = field.physical() as f32;
            self.data_fields.insert(key, Value::F32(value));
        }
        debug!(
            usage = field.usage,
            "recorded vendor-defined input data field"
        );
    }

    /// Vendor-extension path for unrecognized feature usages: the modifier
    /// nibble selects which per-field slot the value lands in.
    pub(crate) fn register_dynamic_feature(&mut self, field: &DecodedField) {
        let key = DataFieldKey::Dynamic(field.usage);
        let value = field.physical() as f32;
        let entry = self.dynamic.entry(key, field.usage);
        match field.modifier {
            modifier::NONE => entry.supported = true,
            modifier::CHANGE_SENSITIVITY_ABS => entry.sensitivity = Some(value),
            modifier::MAX => entry.maximum = Some(value),
            modifier::MIN => entry.minimum = Some(value),
            modifier::ACCURACY => entry.accuracy = Some(value),
            modifier::RESOLUTION => entry.resolution = Some(value),
            other => debug!(
                usage = field.usage,
                modifier = other,
                "unsupported modifier on vendor-defined feature field"
            ),
        }
    }

    /// Effective proximity maximum: device-specific bound if present, else
    /// the global bound, else the compile-time default.
    pub(crate) fn effective_range_maximum(&self) -> f32 {
        self.snapshot
            .proximity_maximum
            .or(self.snapshot.global_maximum)
            .unwrap_or(defaults::PROXIMITY_MAXIMUM_M)
    }

    /// Effective proximity minimum, same precedence as the maximum.
    pub(crate) fn effective_range_minimum(&self) -> f32 {
        self.snapshot
            .proximity_minimum
            .or(self.snapshot.global_minimum)
            .unwrap_or(defaults::PROXIMITY_MINIMUM_M)
    }

    pub(crate) fn effective_sensitivity(&self) -> f32 {
        self.snapshot
            .proximity_sensitivity
            .or(self.snapshot.global_sensitivity)
            .unwrap_or(match self.kind {
                crate::types::SensorKind::Presence => defaults::PRESENCE_SENSITIVITY,
                crate::types::SensorKind::Proximity => defaults::PROXIMITY_SENSITIVITY_M,
            })
    }

    pub(crate) fn effective_accuracy(&self) -> f32 {
        self.snapshot
            .proximity_accuracy
            .or(self.snapshot.global_accuracy)
            .unwrap_or(defaults::PROXIMITY_ACCURACY_M)
    }

    pub(crate) fn effective_resolution(&self) -> f32 {
        self.snapshot
            .proximity_resolution
            .or(self.snapshot.global_resolution)
            .unwrap_or(defaults::PROXIMITY_RESOLUTION_M)
    }
}
