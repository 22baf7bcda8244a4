//! Notification channel between the report core and its consumers.

use opensensing_hid_common::{DataFieldKey, OrderedBag};

use crate::types::{FeatureReportConditions, InputReportConditions, SensorState};

/// Eventing/diagnostics collaborator notified by the report core.
///
/// `data_updated` fires on every successfully decoded input report. The two
/// conditions callbacks fire at most once per instance, after the first walk
/// of the corresponding report type, and describe which optional selectors
/// and fields the physical device actually exposes.
pub trait EventSink {
    fn data_updated(&mut self, fields: &OrderedBag<DataFieldKey>);

    fn state_changed(&mut self, state: SensorState);

    fn input_conditions(&mut self, conditions: &InputReportConditions);

    fn feature_conditions(&mut self, conditions: &FeatureReportConditions);
}

/// Sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn data_updated(&mut self, _fields: &OrderedBag<DataFieldKey>) {}
    fn state_changed(&mut self, _state: SensorState) {}
    fn input_conditions(&mut self, _conditions: &InputReportConditions) {}
    fn feature_conditions(&mut self, _conditions: &FeatureReportConditions) {}
}

pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Everything a [`RecordingSink`] has observed.
    #[derive(Debug, Default, Clone)]
    pub struct Recorded {
        pub data_updates: usize,
        pub last_fields: Option<OrderedBag<DataFieldKey>>,
        pub states: Vec<SensorState>,
        pub input_conditions: Vec<InputReportConditions>,
        pub feature_conditions: Vec<FeatureReportConditions>,
    }

    /// Test sink that records every notification; clones share the record so
    /// tests can keep a handle after moving the sink into the sensor.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingSink {
        inner: Arc<Mutex<Recorded>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn recorded(&self) -> Recorded {
            self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    impl EventSink for RecordingSink {
        fn data_updated(&mut self, fields: &OrderedBag<DataFieldKey>) {
            let mut rec = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            rec.data_updates += 1;
            rec.last_fields = Some(fields.clone());
        }

        fn state_changed(&mut self, state: SensorState) {
            let mut rec = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            rec.states.push(state);
        }

        fn input_conditions(&mut self, conditions: &InputReportConditions) {
            let mut rec = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            rec.input_conditions.push(*conditions);
        }

        fn feature_conditions(&mut self, conditions: &FeatureReportConditions) {
            let mut rec = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            rec.feature_conditions.push(*conditions);
        }
    }
}
