//! Capability-query trait implemented by sensor device transports.

use crate::caps::{FieldCap, ReportKind};
use crate::{HidSensorError, HidSensorResult};

/// The device/transport collaborator a sensor protocol core consumes.
///
/// The owner of the transport discovers report geometry (declared report byte
/// lengths and field-capability tables) and hands buffers to the core
/// synchronously; the core itself performs no blocking I/O.
pub trait SensorDevice {
    /// Declared byte length of input reports, including the report id byte.
    fn input_report_byte_len(&self) -> usize;

    /// Declared byte length of feature reports, including the report id byte.
    /// Zero means the device exposes no feature report.
    fn feature_report_byte_len(&self) -> usize;

    /// Field-capability nodes for the given report type, in descriptor order.
    fn field_caps(&self, kind: ReportKind) -> &[FieldCap];

    /// Synchronously read the current feature report into `buf`.
    ///
    /// Returns the number of bytes read.
    ///
    /// # Errors
    ///
    /// Returns [`HidSensorError::FeatureRead`] when the device cannot supply
    /// a feature report.
    fn read_feature_report(&mut self, report_id: u8, buf: &mut [u8]) -> HidSensorResult<usize>;
}

pub mod mock {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory [`SensorDevice`] for tests: fixed capability tables and a
    /// queue of canned feature reports.
    #[derive(Debug, Default)]
    pub struct MockSensorDevice {
        input_len: usize,
        feature_len: usize,
        input_caps: Vec<FieldCap>,
        feature_caps: Vec<FieldCap>,
        feature_queue: VecDeque<Vec<u8>>,
        feature_requests: Vec<u8>,
    }

    impl MockSensorDevice {
        pub fn new(input_len: usize, feature_len: usize) -> Self {
            Self {
                input_len,
                feature_len,
                ..Self::default()
            }
        }

        pub fn with_input_caps(mut self, caps: Vec<FieldCap>) -> Self {
            self.input_caps = caps;
            self
        }

        pub fn with_feature_caps(mut self, caps: Vec<FieldCap>) -> Self {
            self.feature_caps = caps;
            self
        }

        /// Queue a canned feature report for the next read.
        pub fn queue_feature_report(&mut self, report: Vec<u8>) {
            self.feature_queue.push_back(report);
        }

        /// Report ids the core requested feature reads for, in order.
        pub fn feature_requests(&self) -> &[u8] {
            &self.feature_requests
        }
    }

    impl SensorDevice for MockSensorDevice {
        fn input_report_byte_len(&self) -> usize {
            self.input_len
        }

        fn feature_report_byte_len(&self) -> usize {
            self.feature_len
        }

        fn field_caps(&self, kind: ReportKind) -> &[FieldCap] {
            match kind {
                ReportKind::Input => &self.input_caps,
                ReportKind::Feature => &self.feature_caps,
            }
        }

        fn read_feature_report(&mut self, report_id: u8, buf: &mut [u8]) -> HidSensorResult<usize> {
            self.feature_requests.push(report_id);
            let report = self
                .feature_queue
                .pop_front()
                .ok_or_else(|| HidSensorError::FeatureRead("no queued report".to_string()))?;
            let n = report.len().min(buf.len());
            buf[..n].copy_from_slice(&report[..n]);
            Ok(n)
        }
    }
}
