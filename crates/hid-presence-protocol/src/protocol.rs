//! The presence/proximity sensor instance: construction and default seeding,
//! input-report decode, and feature-report property refresh.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use opensensing_hid_common::{
    DataFieldKey, FieldCap, HidSensorError, HidSensorResult, OrderedBag, PropertyKey, ReportKind,
    SensorDevice, Value, extract_signed, read_array, read_scalar,
};

use crate::events::EventSink;
use crate::handlers::{DecodedField, HandlerTable, field_unit_exponent, handler_table};
use crate::ids::{SENSOR_CATEGORY_BIOMETRIC, defaults};
use crate::tables::{
    SUPPORTED_EVENTS, settable_properties, supported_data_fields, supported_properties,
};
use crate::types::{
    ConnectionType, DeviceProperties, DynamicFields, FeatureReportConditions,
    InputReportConditions, PowerState, ReportingState, SensorConfig, SensorEvent, SensorKind,
    SensorState,
};
use crate::{PresenceError, PresenceResult};

/// Outcome of one input-report decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Fields whose raw value was retrieved and dispatched.
    pub decoded_fields: usize,
    /// Fields whose raw retrieval failed; the walk continued past them.
    pub parse_errors: usize,
}

/// Outcome of one property refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureRefresh {
    /// Whether the device exposes a feature report at all.
    pub supported: bool,
    /// Bytes encoded into the outgoing buffer (the declared feature length).
    pub encoded_len: usize,
    pub decoded_fields: usize,
    pub parse_errors: usize,
    pub encoded_properties: usize,
    pub skipped_properties: usize,
    pub encode_errors: usize,
    /// Supported properties with no known encoder (table-completeness defect).
    pub unknown_properties: usize,
}

/// One presence or proximity sensor endpoint.
///
/// Owns the property and data-field stores, the device-capability snapshot,
/// and read-only copies of the device's field-capability tables. One instance
/// exists per physical sensor endpoint; the surrounding framework serializes
/// decode and refresh calls.
pub struct PresenceSensor<D> {
    pub(crate) kind: SensorKind,
    pub(crate) config: SensorConfig,
    pub(crate) device: D,
    pub(crate) sink: Box<dyn EventSink>,

    pub(crate) input_caps: Vec<FieldCap>,
    pub(crate) feature_caps: Vec<FieldCap>,
    input_report_len: usize,
    feature_report_len: usize,
    feature_report_supported: bool,
    handlers: HandlerTable,

    pub(crate) properties: OrderedBag<PropertyKey>,
    pub(crate) data_fields: OrderedBag<DataFieldKey>,
    pub(crate) settable: &'static [PropertyKey],
    pub(crate) snapshot: DeviceProperties,
    pub(crate) dynamic: DynamicFields,

    pub(crate) reporting_state: ReportingState,
    pub(crate) power_state: PowerState,

    informed_input_conditions: bool,
    informed_feature_conditions: bool,
}

impl<D: SensorDevice> PresenceSensor<D> {
    /// Construct a sensor endpoint and seed its stores with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PresenceError::UnsupportedSensorUsage`] when the descriptor's
    /// sensor-type usage is neither human presence nor human proximity.
    pub fn new(config: SensorConfig, device: D, sink: Box<dyn EventSink>) -> PresenceResult<Self> {
        let Some(kind) = SensorKind::from_usage(config.sensor_usage) else {
            error!(
                usage = config.sensor_usage,
                "unsupported usage of presence/proximity sensor"
            );
            return Err(PresenceError::UnsupportedSensorUsage(config.sensor_usage));
        };

        let input_caps = device.field_caps(ReportKind::Input).to_vec();
        let feature_caps = device.field_caps(ReportKind::Feature).to_vec();
        let input_report_len = device.input_report_byte_len();
        let feature_report_len = device.feature_report_byte_len();
        let feature_report_supported = feature_report_len > 0;

        let mut sensor = Self {
            kind,
            device,
            sink,
            input_caps,
            feature_caps,
            input_report_len,
            feature_report_len,
            feature_report_supported,
            handlers: handler_table(kind),
            properties: OrderedBag::new(),
            data_fields: OrderedBag::new(),
            settable: settable_properties(kind),
            snapshot: DeviceProperties::default(),
            dynamic: DynamicFields::new(),
            reporting_state: ReportingState::NoEvents,
            power_state: PowerState::FullPower,
            informed_input_conditions: false,
            informed_feature_conditions: false,
            config,
        };
        sensor.add_property_keys();
        sensor.add_data_field_keys();
        sensor.set_default_values();

        info!(
            sensor = kind.name(),
            index = sensor.config.sensor_index,
            "sensor endpoint initialized"
        );
        Ok(sensor)
    }

    /// Decode one input report and publish the new sample.
    ///
    /// On success the data-field store reflects the sample and a data-updated
    /// notification is raised. Individual malformed fields are logged and
    /// skipped; the rest of the report is still processed.
    ///
    /// # Errors
    ///
    /// Returns a length error when the buffer does not match the device's
    /// declared input report length; the data-field store is left untouched.
    pub fn decode_input_report(&mut self, report: &[u8]) -> PresenceResult<DecodeSummary> {
        if report.len() != self.input_report_len {
            warn!(
                sensor = self.kind.name(),
                actual = report.len(),
                expected = self.input_report_len,
                "input report has incorrect length"
            );
            return Err(HidSensorError::ReportLength {
                kind: ReportKind::Input,
                expected: self.input_report_len,
                actual: report.len(),
            }
            .into());
        }

        let report_id = self.target_report_id(ReportKind::Input);
        self.set_timestamp();
        self.decode_input_selectors(report, report_id);

        let mut summary = DecodeSummary::default();
        for idx in 0..self.input_caps.len() {
            let cap = self.input_caps[idx];
            if cap.report_id != report_id {
                continue;
            }
            match read_field(report, &cap) {
                Ok(field) => {
                    summary.decoded_fields += 1;
                    match self.handlers.get(&(field.usage, field.modifier)).copied() {
                        Some(handler) => self.dispatch_input(handler, &field),
                        None => self.register_dynamic_input(&field),
                    }
                }
                Err(err) => {
                    warn!(
                        sensor = self.kind.name(),
                        usage = cap.usage,
                        report = ?ReportKind::Input,
                        link_collection = cap.link_collection,
                        %err,
                        "field retrieval failed; continuing with remaining fields"
                    );
                    summary.parse_errors += 1;
                }
            }
        }

        self.sink.data_updated(&self.data_fields);
        if !self.informed_input_conditions {
            self.informed_input_conditions = true;
            let conditions = self.input_conditions();
            self.sink.input_conditions(&conditions);
        }
        Ok(summary)
    }

    /// Refresh property state from the device and re-encode settable
    /// properties into `report`.
    ///
    /// Reads the current feature report through the device collaborator,
    /// decodes it into the capability snapshot, then encodes property updates
    /// back into the same buffer. With `settable_only`, only the kind's
    /// settable properties are encoded.
    ///
    /// # Errors
    ///
    /// Returns a length error when `report` does not match the declared
    /// feature report length, and propagates device read failures.
    pub fn refresh_properties(
        &mut self,
        report: &mut [u8],
        settable_only: bool,
    ) -> PresenceResult<FeatureRefresh> {
        let report_id = self.target_report_id(ReportKind::Feature);

        if !self.feature_report_supported {
            debug!(sensor = self.kind.name(), "device exposes no feature report");
            self.inform_feature_conditions();
            return Ok(FeatureRefresh::default());
        }
        if report.len() != self.feature_report_len {
            return Err(HidSensorError::ReportLength {
                kind: ReportKind::Feature,
                expected: self.feature_report_len,
                actual: report.len(),
            }
            .into());
        }

        let read = self.device.read_feature_report(report_id, report);
        let read_len = match read {
            Ok(n) => n,
            Err(err) => {
                warn!(
                    sensor = self.kind.name(),
                    %err,
                    "failed to get configuration from device"
                );
                self.inform_feature_conditions();
                return Err(err.into());
            }
        };
        if read_len != self.feature_report_len {
            warn!(
                sensor = self.kind.name(),
                actual = read_len,
                expected = self.feature_report_len,
                "feature report has incorrect length"
            );
            self.inform_feature_conditions();
            return Err(HidSensorError::ReportLength {
                kind: ReportKind::Feature,
                expected: self.feature_report_len,
                actual: read_len,
            }
            .into());
        }

        self.decode_feature_selectors(report, report_id);

        let mut decoded_fields = 0usize;
        let mut parse_errors = 0usize;
        for idx in 0..self.feature_caps.len() {
            let cap = self.feature_caps[idx];
            if cap.report_id != report_id {
                continue;
            }
            match read_field(report, &cap) {
                Ok(field) => {
                    decoded_fields += 1;
                    match self.handlers.get(&(field.usage, field.modifier)).copied() {
                        Some(handler) => self.dispatch_feature(handler, &field),
                        None => self.register_dynamic_feature(&field),
                    }
                }
                Err(err) => {
                    warn!(
                        sensor = self.kind.name(),
                        usage = cap.usage,
                        report = ?ReportKind::Feature,
                        link_collection = cap.link_collection,
                        %err,
                        "field retrieval failed; continuing with remaining fields"
                    );
                    parse_errors += 1;
                }
            }
        }

        self.inform_feature_conditions();

        let counts = self.sync_properties(report, report_id, settable_only);
        info!(
            sensor = self.kind.name(),
            encoded = counts.encoded,
            "device properties updated"
        );
        Ok(FeatureRefresh {
            supported: true,
            encoded_len: self.feature_report_len,
            decoded_fields,
            parse_errors,
            encoded_properties: counts.encoded,
            skipped_properties: counts.skipped,
            encode_errors: counts.encode_errors,
            unknown_properties: counts.unknown_properties,
        })
    }

    /// Update a property value from the host side.
    ///
    /// Keys are fixed at initialization; only values mutate.
    ///
    /// # Errors
    ///
    /// Returns [`PresenceError::UnsupportedProperty`] for keys outside this
    /// sensor's supported set.
    pub fn set_property(&mut self, key: PropertyKey, value: Value) -> PresenceResult<()> {
        if !self.properties.contains(key) {
            warn!(sensor = self.kind.name(), ?key, "property not supported");
            return Err(PresenceError::UnsupportedProperty(key));
        }
        self.properties.insert(key, value);
        Ok(())
    }

    pub fn set_reporting_state(&mut self, state: ReportingState) {
        self.reporting_state = state;
    }

    pub fn set_power_state(&mut self, state: PowerState) {
        self.power_state = state;
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn properties(&self) -> &OrderedBag<PropertyKey> {
        &self.properties
    }

    pub fn data_fields(&self) -> &OrderedBag<DataFieldKey> {
        &self.data_fields
    }

    pub fn device_properties(&self) -> &DeviceProperties {
        &self.snapshot
    }

    pub fn dynamic_fields(&self) -> &DynamicFields {
        &self.dynamic
    }

    pub fn settable_properties(&self) -> &'static [PropertyKey] {
        self.settable
    }

    pub fn supported_events(&self) -> &'static [SensorEvent] {
        SUPPORTED_EVENTS
    }

    pub fn feature_report_supported(&self) -> bool {
        self.feature_report_supported
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    // ── construction helpers ────────────────────────────────────────────────

    fn add_property_keys(&mut self) {
        for key in supported_properties(self.kind) {
            self.properties.insert(key, Value::Empty);
        }
    }

    fn add_data_field_keys(&mut self) {
        for key in supported_data_fields(self.kind) {
            self.data_fields.insert(*key, Value::Empty);
        }
    }

    fn set_default_values(&mut self) {
        let identity = self.config.identity.clone();

        self.properties
            .insert(PropertyKey::Category, Value::Guid(SENSOR_CATEGORY_BIOMETRIC));
        self.properties
            .insert(PropertyKey::Type, Value::Guid(self.kind.type_guid()));
        self.properties
            .insert(PropertyKey::State, Value::U32(SensorState::NoData as u32));
        self.properties.insert(
            PropertyKey::MinReportInterval,
            Value::U32(defaults::MIN_REPORT_INTERVAL_MS),
        );
        self.properties.insert(
            PropertyKey::CurrentReportInterval,
            Value::U32(defaults::CURRENT_REPORT_INTERVAL_MS),
        );
        self.properties.insert(
            PropertyKey::PersistentUniqueId,
            Value::Guid(identity.sensor_id),
        );
        self.properties
            .insert(PropertyKey::Manufacturer, Value::Str(identity.manufacturer));
        self.properties
            .insert(PropertyKey::Model, Value::Str(identity.product));
        self.properties.insert(
            PropertyKey::SerialNumber,
            Value::Str(identity.serial_number),
        );
        // With several sensors mapped on one device the kind name is appended
        // so endpoints stay distinguishable.
        let friendly = if self.config.mapped_sensor_count > 1 {
            format!("{}: {}", identity.device_name, self.kind.name())
        } else {
            identity.device_name
        };
        self.properties
            .insert(PropertyKey::FriendlyName, Value::Str(friendly));
        self.properties.insert(
            PropertyKey::Description,
            Value::Str(self.kind.description().to_string()),
        );
        self.properties.insert(
            PropertyKey::ConnectionType,
            Value::U32(ConnectionType::Attached as u32),
        );

        if self.kind == SensorKind::Proximity {
            let composites = [
                (
                    PropertyKey::ChangeSensitivity,
                    defaults::PROXIMITY_SENSITIVITY_M,
                ),
                (PropertyKey::RangeMaximum, defaults::PROXIMITY_MAXIMUM_M),
                (PropertyKey::RangeMinimum, defaults::PROXIMITY_MINIMUM_M),
                (PropertyKey::Accuracy, defaults::PROXIMITY_ACCURACY_M),
                (PropertyKey::Resolution, defaults::PROXIMITY_RESOLUTION_M),
            ];
            for (key, default) in composites {
                let mut bag = OrderedBag::new();
                bag.insert(DataFieldKey::HumanProximityMeters, Value::F32(default));
                self.properties.insert(key, Value::Bag(bag));
            }
            self.snapshot.out_of_range = false;
        }

        self.set_timestamp();
    }

    // ── shared walk plumbing ────────────────────────────────────────────────

    pub(crate) fn target_report_id(&self, kind: ReportKind) -> u8 {
        if self.config.mapped_sensor_count > 1 {
            let base = match kind {
                ReportKind::Input => self.config.starting_input_report_id,
                ReportKind::Feature => self.config.starting_feature_report_id,
            };
            base.wrapping_add(self.config.sensor_index as u8)
        } else {
            0
        }
    }

    fn set_timestamp(&mut self) {
        self.data_fields
            .insert(DataFieldKey::Timestamp, Value::Time(Utc::now()));
    }

    fn inform_feature_conditions(&mut self) {
        if !self.informed_feature_conditions {
            self.informed_feature_conditions = true;
            let conditions = self.feature_conditions();
            self.sink.feature_conditions(&conditions);
        }
    }

    fn input_conditions(&self) -> InputReportConditions {
        InputReportConditions {
            sensor_state_selector: self.snapshot.sensor_state_selector.is_some(),
            event_type_selector: self.snapshot.event_type_selector.is_some(),
            sensor_state_field: self.snapshot.sensor_state.is_some(),
            event_type_field: self.snapshot.event_type.is_some(),
        }
    }

    fn feature_conditions(&self) -> FeatureReportConditions {
        FeatureReportConditions {
            feature_report: self.feature_report_supported,
            reporting_state_selector: self.snapshot.reporting_state_selector.is_some(),
            power_state_selector: self.snapshot.power_state_selector.is_some(),
            sensor_status_selector: self.snapshot.sensor_status_selector.is_some(),
            connection_type_selector: self.snapshot.connection_type_selector.is_some(),
            reporting_state: self.snapshot.reporting_state.is_some(),
            power_state: self.snapshot.power_state.is_some(),
            sensor_status: self.snapshot.sensor_status.is_some(),
            connection_type: self.snapshot.connection_type.is_some(),
            report_interval: self.snapshot.report_interval.is_some(),
            global_sensitivity: self.snapshot.global_sensitivity.is_some(),
            global_maximum: self.snapshot.global_maximum.is_some(),
            global_minimum: self.snapshot.global_minimum.is_some(),
            global_accuracy: self.snapshot.global_accuracy.is_some(),
            global_resolution: self.snapshot.global_resolution.is_some(),
            minimum_report_interval: self.snapshot.minimum_report_interval.is_some(),
            friendly_name: self.snapshot.friendly_name.is_some(),
            persistent_unique_id: self.snapshot.persistent_unique_id.is_some(),
            manufacturer: self.snapshot.manufacturer.is_some(),
            model: self.snapshot.model.is_some(),
            serial_number: self.snapshot.serial_number.is_some(),
            description: self.snapshot.description.is_some(),
        }
    }
}

/// Retrieve one field's value (array when the report count exceeds one,
/// scalar otherwise) and pre-compute its sign and exponent.
fn read_field(report: &[u8], cap: &FieldCap) -> HidSensorResult<DecodedField> {
    if cap.report_count == 0 {
        return Err(HidSensorError::ZeroReportCount { usage: cap.usage });
    }
    let usage = cap.data_usage();
    let modifier = cap.usage_modifier();
    let unit_exp = field_unit_exponent(cap);
    if cap.report_count > 1 {
        let array = read_array(report, cap)?;
        Ok(DecodedField {
            cap: *cap,
            usage,
            modifier,
            raw: 0,
            signed: 0,
            unit_exp,
            array: Some(array),
        })
    } else {
        let raw = read_scalar(report, cap)?;
        let signed = extract_signed(cap.logical_min, cap.bit_size, raw);
        Ok(DecodedField {
            cap: *cap,
            usage,
            modifier,
            raw,
            signed,
            unit_exp,
            array: None,
        })
    }
}
