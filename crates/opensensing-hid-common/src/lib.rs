//! Common HID sensor-page utilities for OpenSensing protocol crates
//!
//! This crate provides the shared plumbing for fixed-layout HID sensor report
//! handling: the field-capability model, bit-level report buffer access, the
//! unit/value codec, usage-page constants, the ordered property container, and
//! the capability-query trait implemented by device transports.

pub mod caps;
pub mod codec;
pub mod device;
pub mod keys;
pub mod usages;
pub mod value;

pub use caps::*;
pub use codec::*;
pub use device::*;
pub use keys::*;
pub use value::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HidSensorError {
    #[error("{kind:?} report length {actual} does not match declared length {expected}")]
    ReportLength {
        kind: caps::ReportKind,
        expected: usize,
        actual: usize,
    },

    #[error(
        "field usage 0x{usage:04X} (collection {link_collection}) exceeds report bounds: \
         bits {bit_offset}..{bit_end} of {report_bits}"
    )]
    FieldBounds {
        usage: u16,
        link_collection: u16,
        bit_offset: u32,
        bit_end: u32,
        report_bits: u32,
    },

    #[error("field usage 0x{usage:04X} declares a report count of zero")]
    ZeroReportCount { usage: u16 },

    #[error("field usage 0x{usage:04X} has unsupported bit size {bit_size}")]
    UnsupportedBitSize { usage: u16, bit_size: u16 },

    #[error("field usage 0x{usage:04X} declares a byte-unaligned array field")]
    UnalignedArray { usage: u16 },

    #[error(
        "value {value} is not representable in a {bit_size}-bit field \
         with logical minimum {logical_min}"
    )]
    ValueNotRepresentable {
        value: f64,
        bit_size: u16,
        logical_min: i32,
    },

    #[error("feature report read failed: {0}")]
    FeatureRead(String),
}

pub type HidSensorResult<T> = Result<T, HidSensorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HidSensorError::ReportLength {
            kind: caps::ReportKind::Input,
            expected: 8,
            actual: 4,
        };
        assert_eq!(
            format!("{err}"),
            "Input report length 4 does not match declared length 8"
        );

        let err = HidSensorError::ZeroReportCount { usage: 0x04B2 };
        assert_eq!(
            format!("{err}"),
            "field usage 0x04B2 declares a report count of zero"
        );
    }
}
