//! Property synchronizer: re-encodes settable/updated properties into an
//! outgoing feature report buffer, table-driven over property identity.

use tracing::{debug, error, warn};

use opensensing_hid_common::usages::{modifier, property};
use opensensing_hid_common::{
    DataFieldKey, FieldCap, PropertyKey, encode_physical, normalize_unit_exponent, write_scalar,
};

use crate::ids::{data_usages, defaults};
use crate::protocol::PresenceSensor;

/// Outcome counters for one synchronization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SyncCounts {
    pub encoded: usize,
    pub skipped: usize,
    pub encode_errors: usize,
    pub unknown_properties: usize,
}

/// The five composite property families, each re-encoded per data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Composite {
    Sensitivity,
    Maximum,
    Minimum,
    Accuracy,
    Resolution,
}

impl Composite {
    fn usage_modifier(self) -> u16 {
        match self {
            Self::Sensitivity => modifier::CHANGE_SENSITIVITY_ABS,
            Self::Maximum => modifier::MAX,
            Self::Minimum => modifier::MIN,
            Self::Accuracy => modifier::ACCURACY,
            Self::Resolution => modifier::RESOLUTION,
        }
    }
}

impl<D> PresenceSensor<D> {
    /// Encode updated property values into the outgoing feature report.
    ///
    /// Walks the supported-property list in order; `settable_only` restricts
    /// encoding to the kind's settable table. Reporting and power state are
    /// written last; they affect the device operating mode rather than a
    /// single property.
    pub(crate) fn sync_properties(
        &self,
        report: &mut [u8],
        report_id: u8,
        settable_only: bool,
    ) -> SyncCounts {
        let mut counts = SyncCounts::default();
        let keys: Vec<PropertyKey> = self.properties.keys().collect();

        for key in keys {
            if settable_only && !self.settable.contains(&key) {
                counts.skipped += 1;
                continue;
            }
            match key {
                PropertyKey::CurrentReportInterval => {
                    self.encode_report_interval(report, report_id, &mut counts);
                }
                PropertyKey::ChangeSensitivity => {
                    self.encode_composite(report, report_id, key, Composite::Sensitivity, &mut counts);
                }
                PropertyKey::RangeMaximum => {
                    self.encode_composite(report, report_id, key, Composite::Maximum, &mut counts);
                }
                PropertyKey::RangeMinimum => {
                    self.encode_composite(report, report_id, key, Composite::Minimum, &mut counts);
                }
                PropertyKey::Accuracy => {
                    self.encode_composite(report, report_id, key, Composite::Accuracy, &mut counts);
                }
                PropertyKey::Resolution => {
                    self.encode_composite(report, report_id, key, Composite::Resolution, &mut counts);
                }
                // Identity and static properties: no action, updates are not
                // supported after initialization.
                PropertyKey::Category
                | PropertyKey::Type
                | PropertyKey::State
                | PropertyKey::MinReportInterval
                | PropertyKey::PersistentUniqueId
                | PropertyKey::Manufacturer
                | PropertyKey::Model
                | PropertyKey::SerialNumber
                | PropertyKey::FriendlyName
                | PropertyKey::Description
                | PropertyKey::ConnectionType => {}
                PropertyKey::Vendor(usage) => {
                    // A supported property without an encoder means the static
                    // tables are out of sync with the supported-property list.
                    error!(
                        usage,
                        sensor = self.kind.name(),
                        "no update encoder for supported property"
                    );
                    counts.unknown_properties += 1;
                }
            }
        }

        self.write_reporting_and_power(report, report_id, &mut counts);
        counts
    }

    /// Report interval is optional device capability: encode only when the
    /// feature walk marked it supported, otherwise skip silently.
    fn encode_report_interval(&self, report: &mut [u8], report_id: u8, counts: &mut SyncCounts) {
        if self.snapshot.report_interval.is_none() {
            debug!("report interval not supported by device; skipping update");
            counts.skipped += 1;
            return;
        }
        let value = self
            .properties
            .get_u32(PropertyKey::CurrentReportInterval)
            .unwrap_or(defaults::CURRENT_REPORT_INTERVAL_MS);
        self.encode_field(
            report,
            report_id,
            property::REPORT_INTERVAL,
            modifier::NONE,
            f64::from(value),
            counts,
        );
    }

    /// Composite properties are nested sets keyed by data field; re-encode
    /// every supported data field except the timestamp.
    fn encode_composite(
        &self,
        report: &mut [u8],
        report_id: u8,
        key: PropertyKey,
        composite: Composite,
        counts: &mut SyncCounts,
    ) {
        let fields: Vec<DataFieldKey> = self.data_fields.keys().collect();
        for df in fields {
            match df {
                DataFieldKey::Timestamp => {}
                DataFieldKey::HumanProximityMeters => {
                    // Change sensitivity is settable, so the host-side store
                    // value is canonical. The read-only bound family follows
                    // the device-specific → global → default chain.
                    let value = match composite {
                        Composite::Sensitivity => self
                            .properties
                            .get_bag(key)
                            .and_then(|bag| bag.get_f32(df))
                            .unwrap_or_else(|| self.effective_sensitivity()),
                        Composite::Maximum => self.effective_range_maximum(),
                        Composite::Minimum => self.effective_range_minimum(),
                        Composite::Accuracy => self.effective_accuracy(),
                        Composite::Resolution => self.effective_resolution(),
                    };
                    self.encode_field(
                        report,
                        report_id,
                        data_usages::HUMAN_PROXIMITY_RANGE,
                        composite.usage_modifier(),
                        f64::from(value),
                        counts,
                    );
                }
                DataFieldKey::HumanPresence => {
                    // The presence data field carries no composite bounds.
                    debug!(?key, "composite update not supported for presence field");
                }
                DataFieldKey::Dynamic(_) => {
                    self.encode_dynamic_composite(report, report_id, df, composite, counts);
                }
            }
        }
    }

    /// Vendor-extension data fields source their composite values from the
    /// dynamic table at the same key.
    fn encode_dynamic_composite(
        &self,
        report: &mut [u8],
        report_id: u8,
        df: DataFieldKey,
        composite: Composite,
        counts: &mut SyncCounts,
    ) {
        let Some(entry) = self.dynamic.get(df) else {
            debug!(?df, "data field has no dynamic record; skipping update");
            counts.skipped += 1;
            return;
        };
        let value = match composite {
            // The host-side store wins for the settable sensitivity.
            Composite::Sensitivity => self
                .properties
                .get_bag(PropertyKey::ChangeSensitivity)
                .and_then(|bag| bag.get_f32(df))
                .or(entry.sensitivity),
            Composite::Maximum => entry.maximum,
            Composite::Minimum => entry.minimum,
            Composite::Accuracy => entry.accuracy,
            Composite::Resolution => entry.resolution,
        };
        let Some(value) = value else {
            debug!(
                usage = entry.usage,
                ?composite,
                "vendor field does not carry this composite; skipping"
            );
            counts.skipped += 1;
            return;
        };
        self.encode_field(
            report,
            report_id,
            entry.usage,
            composite.usage_modifier(),
            f64::from(value),
            counts,
        );
    }

    /// Cross-cutting final step: reporting and power state affect the device
    /// operating mode and are written after all per-property encodings.
    fn write_reporting_and_power(&self, report: &mut [u8], report_id: u8, counts: &mut SyncCounts) {
        if self.snapshot.reporting_state.is_some()
            || self.snapshot.reporting_state_selector.is_some()
        {
            self.encode_field(
                report,
                report_id,
                property::REPORTING_STATE,
                modifier::NONE,
                f64::from(self.reporting_state.selector_value()),
                counts,
            );
        }
        if self.snapshot.power_state.is_some() || self.snapshot.power_state_selector.is_some() {
            self.encode_field(
                report,
                report_id,
                property::POWER_STATE,
                modifier::NONE,
                f64::from(self.power_state.selector_value()),
                counts,
            );
        }
    }

    /// Locate the feature field for `(usage, modifier)` and write the scaled
    /// value into the outgoing buffer.
    ///
    /// A missing capability is an absent optional feature (skip, `debug`); a
    /// value that does not fit the field is a range failure that skips only
    /// this property (`warn`).
    fn encode_field(
        &self,
        report: &mut [u8],
        report_id: u8,
        usage: u16,
        usage_modifier: u16,
        value: f64,
        counts: &mut SyncCounts,
    ) {
        let Some(cap) = self.find_feature_cap(report_id, usage, usage_modifier) else {
            debug!(
                usage,
                modifier = usage_modifier,
                "feature capability absent on this device; skipping update"
            );
            counts.skipped += 1;
            return;
        };
        let exp = normalize_unit_exponent(cap.unit_exp);
        let result = encode_physical(value, cap.logical_min, cap.bit_size, exp)
            .and_then(|raw| write_scalar(report, &cap, raw));
        match result {
            Ok(()) => counts.encoded += 1,
            Err(err) => {
                warn!(
                    usage,
                    modifier = usage_modifier,
                    value,
                    %err,
                    "failed to encode property update"
                );
                counts.encode_errors += 1;
            }
        }
    }

    fn find_feature_cap(&self, report_id: u8, usage: u16, usage_modifier: u16) -> Option<FieldCap> {
        self.feature_caps
            .iter()
            .find(|cap| {
                cap.report_id == report_id
                    && cap.data_usage() == usage
                    && cap.usage_modifier() == usage_modifier
            })
            .copied()
    }
}
