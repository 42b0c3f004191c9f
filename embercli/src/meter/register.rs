//! Fixed-point register decoding.
//!
//! The metering chip publishes its measurement registers as 24-bit
//! fixed-point fractions: the raw integer divided by 2^24 gives the
//! fraction of full scale. Raw values at or above 2^24 are accepted
//! and decode proportionally to 1.0 and beyond.

use crate::error::{ParseError, Result};

/// Full scale of a 24-bit fixed-point register, 2^24.
pub const REGISTER_FULL_SCALE: f64 = 16_777_216.0;

/// Divisor applied when scaling RMS register fractions to line units.
pub const RMS_DIVISOR: f64 = 0.6;

/// Decode a raw register reading into its fractional value.
pub fn register_fraction(raw: u32) -> f64 {
    f64::from(raw) / REGISTER_FULL_SCALE
}

/// Decode a hexadecimal register reading, with or without a `0x` prefix.
pub fn register_fraction_hex(hex: &str) -> Result<f64> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    let raw = u32::from_str_radix(digits, 16).map_err(|source| ParseError::InvalidNumber {
        field: "register",
        value: hex.to_string(),
        source,
    })?;
    Ok(register_fraction(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_zero_decodes_to_zero() {
        assert_eq!(register_fraction(0), 0.0);
    }

    #[test]
    fn test_midscale_decodes_exactly() {
        assert_eq!(register_fraction(0x800000), 0.5);
    }

    #[test]
    fn test_hex_decodes() {
        let value = register_fraction_hex("5C28F6").unwrap();
        assert!((value - 0.36).abs() < 1e-6);
    }

    #[test]
    fn test_top_of_range_stays_below_one() {
        let value = register_fraction(0xFFFFFF);
        assert!(value < 1.0);
        assert!(value > 0.9999);
    }

    #[test]
    fn test_hex_agrees_with_integer() {
        assert_eq!(
            register_fraction_hex("5C28F6").unwrap(),
            register_fraction(0x5C28F6)
        );
    }

    #[test]
    fn test_hex_prefix_accepted() {
        assert_eq!(register_fraction_hex("0x800000").unwrap(), 0.5);
        assert_eq!(register_fraction_hex("0X800000").unwrap(), 0.5);
    }

    #[test]
    fn test_full_scale_and_above_unclamped() {
        assert_eq!(register_fraction_hex("01000000").unwrap(), 1.0);
        assert!(register_fraction_hex("FFFFFFFF").unwrap() > 255.0);
    }

    #[test]
    fn test_garbage_rejected() {
        for bad in ["zzzz", "", "-5", "12 34"] {
            let err = register_fraction_hex(bad).unwrap_err();
            assert!(matches!(
                err,
                Error::Parse(ParseError::InvalidNumber {
                    field: "register",
                    ..
                })
            ));
        }
    }
}
