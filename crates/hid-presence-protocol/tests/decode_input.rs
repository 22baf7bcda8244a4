//! Input-report decode scenarios: presence publication, proximity unit and
//! range gating, the sticky out-of-range flag, parse-error isolation, and
//! the vendor-extension path.

use opensensing_hid_common::mock::MockSensorDevice;
use opensensing_hid_common::usages::units;
use opensensing_hid_common::write_scalar;
use sensor_hid_presence_protocol::events::mock::RecordingSink;
use sensor_hid_presence_protocol::{
    DataFieldKey, FieldCap, PresenceError, PresenceSensor, SensorConfig, SensorIdentity,
    SensorState, Value,
};
use uuid::Uuid;

fn cap(report_id: u8, usage: u16, bit_offset: u32, bit_size: u16) -> FieldCap {
    FieldCap {
        report_id,
        link_collection: 0,
        usage_page: 0x20,
        usage,
        report_count: 1,
        bit_offset,
        bit_size,
        logical_min: 0,
        logical_max: 0,
        units: units::NOT_SPECIFIED,
        unit_exp: 0,
    }
}

fn meter_cap(report_id: u8, usage: u16, bit_offset: u32) -> FieldCap {
    FieldCap {
        units: units::METER,
        // Nibble 14 encodes an exponent of -2: raw centimeter counts.
        unit_exp: 14,
        ..cap(report_id, usage, bit_offset, 16)
    }
}

fn identity() -> SensorIdentity {
    SensorIdentity {
        manufacturer: "Contoso".to_string(),
        product: "PresencePod 2".to_string(),
        serial_number: "SN-0042".to_string(),
        sensor_id: Uuid::from_u128(0x4242),
        device_name: "PresencePod".to_string(),
    }
}

fn config(sensor_usage: u16) -> SensorConfig {
    SensorConfig {
        sensor_usage,
        link_collection: 0,
        sensor_index: 0,
        mapped_sensor_count: 1,
        starting_input_report_id: 1,
        starting_feature_report_id: 1,
        identity: identity(),
    }
}

fn put(report: &mut [u8], field: &FieldCap, raw: u32) {
    write_scalar(report, field, raw).expect("field must fit test report");
}

/// Presence sensor: the single presence field at payload byte 0.
fn presence_sensor() -> (PresenceSensor<MockSensorDevice>, RecordingSink) {
    let device = MockSensorDevice::new(2, 0).with_input_caps(vec![cap(0, 0x04B1, 0, 8)]);
    let sink = RecordingSink::new();
    let sensor =
        PresenceSensor::new(config(0x0011), device, Box::new(sink.clone())).expect("presence kind");
    (sensor, sink)
}

/// Proximity sensor: state/event selectors, range field (centimeter raw),
/// and the out-of-range field after the range field.
fn proximity_caps() -> Vec<FieldCap> {
    vec![
        cap(0, 0x0201, 0, 8),
        cap(0, 0x0202, 8, 8),
        meter_cap(0, 0x04B2, 16),
        cap(0, 0x04B3, 32, 8),
    ]
}

fn proximity_sensor_with_caps(
    caps: Vec<FieldCap>,
    input_len: usize,
) -> (PresenceSensor<MockSensorDevice>, RecordingSink) {
    let device = MockSensorDevice::new(input_len, 0).with_input_caps(caps);
    let sink = RecordingSink::new();
    let sensor = PresenceSensor::new(config(0x0012), device, Box::new(sink.clone()))
        .expect("proximity kind");
    (sensor, sink)
}

fn proximity_sensor() -> (PresenceSensor<MockSensorDevice>, RecordingSink) {
    proximity_sensor_with_caps(proximity_caps(), 6)
}

fn proximity_report(state: u32, distance_raw: u32, out_of_range: u32) -> [u8; 6] {
    let caps = proximity_caps();
    let mut report = [0u8; 6];
    put(&mut report, &caps[0], state);
    put(&mut report, &caps[1], 0x02);
    put(&mut report, &caps[2], distance_raw);
    put(&mut report, &caps[3], out_of_range);
    report
}

// ── presence ────────────────────────────────────────────────────────────────

/// End-to-end: raw presence value 1 publishes `true`, stamps the sample, and
/// raises exactly one data-updated notification.
#[test]
fn presence_sample_publishes_bool_and_event() {
    let (mut sensor, sink) = presence_sensor();

    let report = [0x00, 0x01];
    let summary = sensor.decode_input_report(&report).expect("decode");
    assert_eq!(summary.decoded_fields, 1);
    assert_eq!(summary.parse_errors, 0);

    assert_eq!(
        sensor.data_fields().get_bool(DataFieldKey::HumanPresence),
        Some(true)
    );
    assert!(
        sensor
            .data_fields()
            .get_time(DataFieldKey::Timestamp)
            .is_some()
    );

    let rec = sink.recorded();
    assert_eq!(rec.data_updates, 1);
    let fields = rec.last_fields.expect("fields delivered with event");
    assert_eq!(fields.get_bool(DataFieldKey::HumanPresence), Some(true));
}

/// Any nonzero raw value coerces to `true`; zero to `false`.
#[test]
fn presence_nonzero_raw_is_true() {
    let (mut sensor, _sink) = presence_sensor();

    sensor.decode_input_report(&[0x00, 0x7F]).expect("decode");
    assert_eq!(
        sensor.data_fields().get_bool(DataFieldKey::HumanPresence),
        Some(true)
    );

    sensor.decode_input_report(&[0x00, 0x00]).expect("decode");
    assert_eq!(
        sensor.data_fields().get_bool(DataFieldKey::HumanPresence),
        Some(false)
    );
}

/// The input conditions report is delivered exactly once, after the first
/// decode.
#[test]
fn input_conditions_reported_once() {
    let (mut sensor, sink) = presence_sensor();

    sensor.decode_input_report(&[0x00, 0x01]).expect("decode");
    sensor.decode_input_report(&[0x00, 0x01]).expect("decode");

    let rec = sink.recorded();
    assert_eq!(rec.data_updates, 2);
    assert_eq!(rec.input_conditions.len(), 1);
    // The presence-only layout exposes neither selector.
    assert!(!rec.input_conditions[0].sensor_state_selector);
    assert!(!rec.input_conditions[0].event_type_selector);
}

// ── length gating ───────────────────────────────────────────────────────────

/// A report that does not match the declared input length fails with a length
/// error and leaves the data-field store untouched.
#[test]
fn wrong_length_aborts_without_mutation() {
    let (mut sensor, sink) = presence_sensor();

    let before = sensor
        .data_fields()
        .get_time(DataFieldKey::Timestamp)
        .expect("seeded at construction");

    let err = sensor
        .decode_input_report(&[0x00, 0x01, 0x02])
        .expect_err("length mismatch");
    assert!(matches!(
        err,
        PresenceError::Hid(opensensing_hid_common::HidSensorError::ReportLength { .. })
    ));

    assert_eq!(
        sensor.data_fields().get(DataFieldKey::HumanPresence),
        Some(&Value::Empty)
    );
    assert_eq!(
        sensor.data_fields().get_time(DataFieldKey::Timestamp),
        Some(before)
    );
    assert_eq!(sink.recorded().data_updates, 0);
}

// ── proximity gating ────────────────────────────────────────────────────────

/// In-range reading with the flag clear publishes the decoded float exactly.
#[test]
fn proximity_in_range_publishes_distance() {
    let (mut sensor, sink) = proximity_sensor();

    // 50 cm => 0.5 m, inside the default 0.0..=5.0 m window.
    let report = proximity_report(0x01, 50, 0);
    sensor.decode_input_report(&report).expect("decode");

    assert_eq!(
        sensor
            .data_fields()
            .get_f32(DataFieldKey::HumanProximityMeters),
        Some(0.5)
    );
    // The sensor-state selector decoded Ready and raised a state change.
    assert_eq!(sink.recorded().states, vec![SensorState::Ready]);
    assert_eq!(
        sensor.device_properties().sensor_state_selector,
        Some(0x01)
    );
}

/// A reading above the compile-time default maximum publishes the null
/// sentinel: valid field, no usable reading.
#[test]
fn proximity_above_default_max_is_null() {
    let (mut sensor, _sink) = proximity_sensor();

    // 600 cm => 6.0 m, above the 5.0 m default maximum.
    let report = proximity_report(0x01, 600, 0);
    sensor.decode_input_report(&report).expect("decode");

    assert_eq!(
        sensor.data_fields().get(DataFieldKey::HumanProximityMeters),
        Some(&Value::Null)
    );
}

/// A unit other than meter/unspecified yields the empty sentinel rather than
/// a misinterpreted number.
#[test]
fn proximity_foreign_unit_is_empty() {
    let mut caps = proximity_caps();
    caps[2].units = 0x21;
    let (mut sensor, _sink) = proximity_sensor_with_caps(caps.clone(), 6);

    let mut report = [0u8; 6];
    put(&mut report, &caps[2], 50);
    sensor.decode_input_report(&report).expect("decode");

    assert_eq!(
        sensor.data_fields().get(DataFieldKey::HumanProximityMeters),
        Some(&Value::Empty)
    );
}

/// The out-of-range indication withholds the sample (empty), stays sticky
/// across reports, and clears only on a fresh in-range indication.
#[test]
fn out_of_range_is_sticky_until_cleared() {
    let (mut sensor, _sink) = proximity_sensor();

    // Device flags out-of-range; the same report's distance is withheld.
    let report = proximity_report(0x01, 50, 1);
    sensor.decode_input_report(&report).expect("decode");
    assert_eq!(
        sensor.data_fields().get(DataFieldKey::HumanProximityMeters),
        Some(&Value::Empty)
    );
    assert!(sensor.device_properties().out_of_range);

    // Still out of range: readings keep being suppressed.
    let report = proximity_report(0x01, 50, 1);
    sensor.decode_input_report(&report).expect("decode");
    assert_eq!(
        sensor.data_fields().get(DataFieldKey::HumanProximityMeters),
        Some(&Value::Empty)
    );
    assert!(sensor.device_properties().out_of_range);

    // Fresh in-range indication clears the flag and the value flows again.
    let report = proximity_report(0x01, 50, 0);
    sensor.decode_input_report(&report).expect("decode");
    assert!(!sensor.device_properties().out_of_range);
    assert_eq!(
        sensor
            .data_fields()
            .get_f32(DataFieldKey::HumanProximityMeters),
        Some(0.5)
    );
}

// ── walk robustness ─────────────────────────────────────────────────────────

/// A single malformed field is recorded and skipped; the remaining fields
/// still decode and the data event is still raised.
#[test]
fn malformed_field_does_not_abort_walk() {
    let mut caps = proximity_caps();
    // A capability past the end of the 6-byte report.
    caps.push(cap(0, 0x04D0, 100, 16));
    let (mut sensor, sink) = proximity_sensor_with_caps(caps, 6);

    let report = proximity_report(0x01, 50, 0);
    let summary = sensor.decode_input_report(&report).expect("decode");
    assert_eq!(summary.parse_errors, 1);
    assert_eq!(summary.decoded_fields, 4);

    assert_eq!(
        sensor
            .data_fields()
            .get_f32(DataFieldKey::HumanProximityMeters),
        Some(0.5)
    );
    assert_eq!(sink.recorded().data_updates, 1);
}

/// An unrecognized usage lands in the dynamic data-field table and publishes
/// generically.
#[test]
fn unknown_usage_registers_dynamic_field() {
    let mut caps = proximity_caps();
    caps.push(cap(0, 0x04C0, 40, 8));
    let (mut sensor, _sink) = proximity_sensor_with_caps(caps.clone(), 7);

    let mut report = [0u8; 7];
    put(&mut report, &caps[2], 50);
    put(&mut report, &caps[4], 7);
    sensor.decode_input_report(&report).expect("decode");

    let dynamic = sensor
        .dynamic_fields()
        .get(DataFieldKey::Dynamic(0x04C0))
        .expect("registered");
    assert!(dynamic.supported);
    assert_eq!(dynamic.usage, 0x04C0);
    assert_eq!(
        sensor.data_fields().get_f32(DataFieldKey::Dynamic(0x04C0)),
        Some(7.0)
    );
}

// ── multi-sensor report id targeting ────────────────────────────────────────

/// With several sensors mapped, only capabilities matching
/// `starting_report_id + sensor_index` are walked.
#[test]
fn multi_sensor_walk_filters_by_report_id() {
    let caps = vec![
        // Belongs to sensor 0 (report id 1): must be ignored.
        cap(1, 0x04B1, 0, 8),
        // Belongs to sensor 1 (report id 2): must decode.
        cap(2, 0x04B1, 8, 8),
    ];
    let device = MockSensorDevice::new(3, 0).with_input_caps(caps);
    let sink = RecordingSink::new();
    let mut config = config(0x0011);
    config.sensor_index = 1;
    config.mapped_sensor_count = 2;
    let mut sensor =
        PresenceSensor::new(config, device, Box::new(sink.clone())).expect("presence kind");

    // Payload byte 0 (sensor 0's field) says present; byte 1 (ours) says not.
    let report = [0x02, 0x01, 0x00];
    let summary = sensor.decode_input_report(&report).expect("decode");
    assert_eq!(summary.decoded_fields, 1);
    assert_eq!(
        sensor.data_fields().get_bool(DataFieldKey::HumanPresence),
        Some(false)
    );
}
