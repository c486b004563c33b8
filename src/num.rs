use alloy::primitives::U256;
use fastnum::{
    UD256, bint,
    decimal::{Context, RoundingMode, UnsignedDecimal},
};

/// Amount string rejected at the parsing boundary.
#[derive(Debug, thiserror::Error)]
pub enum AmountError {
    #[error("invalid decimal amount: {0:?}")]
    Invalid(String),

    #[error("amount must be greater than zero")]
    Zero,
}

/// Fixed-point to decimal converter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub(crate) fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    pub fn from_unsigned<const N: usize>(&self, value: U256) -> UnsignedDecimal<N> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.as_le_slice())
            .expect("Converter: U256 -> UInt::<N>");
        UnsignedDecimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            Context::default().with_rounding_mode(RoundingMode::Floor),
        )
    }

    pub fn to_unsigned<const N: usize>(&self, value: UnsignedDecimal<N>) -> U256 {
        let rescaled = value.rescale(self.decimals as i16);
        U256::from_le_slice(rescaled.digits().to_radix_le(256).as_slice())
    }
}

/// Parse a human decimal amount ("1.5") into smallest token units at the
/// given number of decimals. Excess fractional digits are floored away.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let parsed = UD256::from_str(
        amount,
        Context::default().with_rounding_mode(RoundingMode::Floor),
    )
    .map_err(|_| AmountError::Invalid(amount.to_string()))?;
    Ok(Converter::new(decimals).to_unsigned(parsed))
}

/// Render smallest token units as a human decimal string, trailing zeros
/// trimmed. Exact for any `value`, so this direction cannot fail.
pub fn format_base_units(value: U256, decimals: u8) -> String {
    let human: UD256 = Converter::new(decimals).from_unsigned(value);
    let fixed = format!("{human:.prec$}", prec = decimals as usize);
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}

#[cfg(test)]
mod tests {
    use fastnum::udec256;

    use super::*;

    #[test]
    fn test_numeric_converter_from_unsigned() {
        assert_eq!(
            Converter::new(0).from_unsigned(U256::from(1234567890)),
            udec256!(1234567890)
        );
        assert_eq!(
            Converter::new(6).from_unsigned(U256::from(1234567890)),
            udec256!(1234.56789)
        );
        assert_eq!(
            Converter::new(12).from_unsigned(U256::from(1234567890)),
            udec256!(0.00123456789)
        );
    }

    #[test]
    fn test_numeric_converter_to_unsigned() {
        assert_eq!(
            Converter::new(0).to_unsigned(udec256!(1234567890)),
            U256::from(1234567890)
        );
        assert_eq!(
            Converter::new(6).to_unsigned(udec256!(1234.56789)),
            U256::from(1234567890)
        );
        assert_eq!(
            Converter::new(12).to_unsigned(udec256!(0.00123456789)),
            U256::from(1234567890)
        );
    }

    #[test]
    fn test_to_base_units() {
        assert_eq!(to_base_units("1.5", 6).unwrap(), U256::from(1500000u64));
        assert_eq!(to_base_units("0.000001", 6).unwrap(), U256::from(1u64));
        assert_eq!(
            to_base_units("100", 18).unwrap(),
            U256::from(100000000000000000000u128)
        );
        assert_eq!(to_base_units("0.1", 6).unwrap(), U256::from(100000u64));
        assert_eq!(
            to_base_units("0.00003", 18).unwrap(),
            U256::from(30000000000000u64)
        );
        assert_eq!(to_base_units("42", 0).unwrap(), U256::from(42u64));
    }

    #[test]
    fn test_to_base_units_floors_excess_digits() {
        assert_eq!(to_base_units("0.0000019", 6).unwrap(), U256::from(1u64));
        assert_eq!(to_base_units("0.0000001", 6).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_to_base_units_rejects_garbage() {
        assert!(matches!(
            to_base_units("abc", 6),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(to_base_units("", 6), Err(AmountError::Invalid(_))));
        assert!(matches!(
            to_base_units("-1", 6),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(
            to_base_units("1.2.3", 6),
            Err(AmountError::Invalid(_))
        ));
    }

    #[test]
    fn test_format_base_units() {
        assert_eq!(format_base_units(U256::from(1500000u64), 6), "1.5");
        assert_eq!(format_base_units(U256::from(1u64), 6), "0.000001");
        assert_eq!(
            format_base_units(U256::from(100000000000000000000u128), 18),
            "100"
        );
        assert_eq!(format_base_units(U256::from(30000000000000u64), 18), "0.00003");
        assert_eq!(format_base_units(U256::ZERO, 6), "0");
        assert_eq!(format_base_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn test_string_round_trip() {
        for (amount, decimals) in [("1.5", 6u8), ("0.000001", 6), ("100", 18), ("0.00003", 18)] {
            let raw = to_base_units(amount, decimals).unwrap();
            assert_eq!(format_base_units(raw, decimals), amount);
        }
    }
}
