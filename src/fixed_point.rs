//! Exact decimal to fixed-point conversion.
//!
//! Every numeric attribute in the DSN documents is stored as an integer count of a
//! field-specific decimal unit. A numeral is accepted only when `value × 10^scale` is an
//! integer that fits the field's width. Nothing is ever rounded: a numeral that needs
//! more significant fractional digits than the field keeps is rejected.
//!
//! ## Field Table
//!
//! | Field | Scale | Width | Absent literal | Stored as |
//! |-------|-------|-------|----------------|-----------|
//! | `Coordinate` | 1e7 | i64 | none | n/a |
//! | `Azimuth`, `Elevation`, `WindSpeed` | 1e2 | i32 | `""` | `-1` |
//! | `UplegRange`, `DownlegRange` | 1e3 | i64 | `"-1.0"` | `-1` |
//! | `RoundTripLightTime` | 1e6 | i64 | `"-1.0"` | `-1` |
//! | `DataRate` | 1e6 | i64 | `""`, `"null"` | `-1` |
//! | `Frequency(Down)` | 1e6 | i64 | `""`, `"none"`, `"null"` | `-1` |
//! | `Frequency(Up)` | 1e12 | i64 | `""`, `"none"`, `"null"` | `-1` |
//! | `Power` | 1e6 | i32 | `""`, `"null"` | `0` |
//! | `TimeZoneOffset` | 1 | i32 | none | n/a |
//! | `Timestamp` | 1 | i64 | none | n/a |
//!
//! The two integral fields (`TimeZoneOffset`, `Timestamp`) accept plain integers only.
//!
//! ## Numeral Grammar
//!
//! ```text
//! numeral  = [sign] (digits ["." [digits]] | "." digits) [exponent]
//! exponent = ("e" | "E") [sign] digits
//! ```
//!
//! Trailing zeros in the fraction are not significant, so `"12.340"` decodes to `1234`
//! at scale 1e2 while `"12.345"` is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::IntErrorKind;

use crate::types::SignalDirection;

/// Sentinel stored for an absent reading on fields that use one.
pub const ABSENT: i64 = -1;

/// Literal the producer writes for a range or light time it has no value for.
pub const NO_DATA_LITERAL: &str = "-1.0";

/// Largest power of ten applied after the fraction is consumed.
///
/// Anything past this overflows every supported width for a non-zero value.
const MAX_SHIFT: i64 = 40;

/// Identity of a numeric field, carrying its scale, width and absent convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Site latitude or longitude, in 1e-7 degrees.
    Coordinate,
    /// Dish azimuth, in centidegrees.
    Azimuth,
    /// Dish elevation, in centidegrees.
    Elevation,
    /// Wind speed at the dish, in hundredths of the reported unit.
    WindSpeed,
    /// Up-link path range, in thousandths of the reported unit.
    UplegRange,
    /// Down-link path range, in thousandths of the reported unit.
    DownlegRange,
    /// Round-trip light time, in millionths of the reported unit.
    RoundTripLightTime,
    /// Signal data rate, in millionths of the reported unit.
    DataRate,
    /// Signal frequency; the scale depends on the direction.
    Frequency(SignalDirection),
    /// Signal power, in millionths of the reported unit.
    Power,
    /// Station time zone offset, in milliseconds.
    TimeZoneOffset,
    /// Snapshot timestamp, in milliseconds since the epoch.
    Timestamp,
}

/// Integer width a field is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// 32-bit signed.
    I32,
    /// 64-bit signed.
    I64,
}

impl Width {
    fn contains(self, value: i128) -> bool {
        match self {
            Self::I32 => i32::try_from(value).is_ok(),
            Self::I64 => i64::try_from(value).is_ok(),
        }
    }
}

impl Field {
    /// Number of decimal fractional digits the field keeps.
    pub fn scale_digits(self) -> u32 {
        match self {
            Self::Coordinate => 7,
            Self::Azimuth | Self::Elevation | Self::WindSpeed => 2,
            Self::UplegRange | Self::DownlegRange => 3,
            Self::RoundTripLightTime | Self::DataRate | Self::Power => 6,
            Self::Frequency(SignalDirection::Down) => 6,
            Self::Frequency(SignalDirection::Up) => 12,
            Self::TimeZoneOffset | Self::Timestamp => 0,
        }
    }

    /// Multiplier applied to the decimal value (`10^scale_digits`).
    pub fn scale(self) -> i64 {
        10_i64.pow(self.scale_digits())
    }

    /// Integer width the decoded value must fit.
    pub fn width(self) -> Width {
        match self {
            Self::Azimuth
            | Self::Elevation
            | Self::WindSpeed
            | Self::Power
            | Self::TimeZoneOffset => Width::I32,
            _ => Width::I64,
        }
    }

    /// The stored value when `input` is this field's "absent" literal.
    pub fn absent_value(self, input: &str) -> Option<i64> {
        let absent = match self {
            Self::Coordinate | Self::TimeZoneOffset | Self::Timestamp => false,
            Self::Azimuth | Self::Elevation | Self::WindSpeed => input.is_empty(),
            Self::UplegRange | Self::DownlegRange | Self::RoundTripLightTime => {
                input == NO_DATA_LITERAL
            }
            Self::DataRate => matches!(input, "" | "null"),
            Self::Frequency(_) => matches!(input, "" | "none" | "null"),
            Self::Power => return matches!(input, "" | "null").then_some(0),
        };
        absent.then_some(ABSENT)
    }

    fn is_integral(self) -> bool {
        matches!(self, Self::TimeZoneOffset | Self::Timestamp)
    }

    /// Decode `input` into this field's fixed-point representation.
    pub fn decode(self, input: &str) -> Result<i64, NumericError> {
        if let Some(sentinel) = self.absent_value(input) {
            return Ok(sentinel);
        }

        let parsed = if self.is_integral() {
            parse_integer(input)
        } else {
            scale_exact(input, self.scale_digits())
        };
        let value = parsed.map_err(|fault| fault.into_error(self, input))?;

        if !self.width().contains(value) {
            return Err(Fault::OutOfRange.into_error(self, input));
        }
        i64::try_from(value).map_err(|_| Fault::OutOfRange.into_error(self, input))
    }

    /// Decode a field stored as `i32`.
    pub fn decode_i32(self, input: &str) -> Result<i32, NumericError> {
        let value = self.decode(input)?;
        i32::try_from(value).map_err(|_| Fault::OutOfRange.into_error(self, input))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinate => write!(f, "coordinate"),
            Self::Azimuth => write!(f, "azimuth angle"),
            Self::Elevation => write!(f, "elevation angle"),
            Self::WindSpeed => write!(f, "wind speed"),
            Self::UplegRange => write!(f, "upleg range"),
            Self::DownlegRange => write!(f, "downleg range"),
            Self::RoundTripLightTime => write!(f, "round-trip light time"),
            Self::DataRate => write!(f, "data rate"),
            Self::Frequency(SignalDirection::Down) => write!(f, "down-link frequency"),
            Self::Frequency(SignalDirection::Up) => write!(f, "up-link frequency"),
            Self::Power => write!(f, "power"),
            Self::TimeZoneOffset => write!(f, "time zone offset"),
            Self::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// Failure to convert a numeral into a field's fixed-point value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumericError {
    /// The input is not a numeral the field accepts.
    #[error("{field}: {input:?} is not a valid numeral")]
    InvalidNumeral {
        /// Field being decoded.
        field: Field,
        /// Raw attribute text.
        input: String,
    },
    /// The numeral has more significant fractional digits than the field keeps.
    #[error("{field}: {input:?} needs more than {allowed} fractional digits")]
    ExcessPrecision {
        /// Field being decoded.
        field: Field,
        /// Raw attribute text.
        input: String,
        /// Fractional digits the field keeps.
        allowed: u32,
    },
    /// The scaled value does not fit the field's width.
    #[error("{field}: {input:?} is out of range")]
    OutOfRange {
        /// Field being decoded.
        field: Field,
        /// Raw attribute text.
        input: String,
    },
}

impl NumericError {
    /// The field that failed to decode.
    pub fn field(&self) -> Field {
        match self {
            Self::InvalidNumeral { field, .. }
            | Self::ExcessPrecision { field, .. }
            | Self::OutOfRange { field, .. } => *field,
        }
    }

    /// The raw text that failed to decode.
    pub fn input(&self) -> &str {
        match self {
            Self::InvalidNumeral { input, .. }
            | Self::ExcessPrecision { input, .. }
            | Self::OutOfRange { input, .. } => input,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Invalid,
    ExcessPrecision,
    OutOfRange,
}

impl Fault {
    fn into_error(self, field: Field, input: &str) -> NumericError {
        let input = input.to_string();
        match self {
            Self::Invalid => NumericError::InvalidNumeral { field, input },
            Self::ExcessPrecision => NumericError::ExcessPrecision {
                field,
                input,
                allowed: field.scale_digits(),
            },
            Self::OutOfRange => NumericError::OutOfRange { field, input },
        }
    }
}

fn parse_integer(input: &str) -> Result<i128, Fault> {
    input.parse::<i64>().map(i128::from).map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Fault::OutOfRange,
        _ => Fault::Invalid,
    })
}

/// A syntactically valid decimal numeral, split into its parts.
struct Numeral<'a> {
    negative: bool,
    integer: &'a [u8],
    fraction: &'a [u8],
    exponent: i64,
}

impl<'a> Numeral<'a> {
    fn parse(input: &'a str) -> Option<Self> {
        let bytes = input.as_bytes();
        let mut pos = 0;

        let negative = match bytes.first() {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };

        let integer = take_digits(bytes, &mut pos);
        let fraction = if bytes.get(pos) == Some(&b'.') {
            pos += 1;
            take_digits(bytes, &mut pos)
        } else {
            &[]
        };
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }

        let exponent = if matches!(bytes.get(pos), Some(b'e' | b'E')) {
            pos += 1;
            let start = pos;
            if matches!(bytes.get(pos), Some(b'-' | b'+')) {
                pos += 1;
            }
            if take_digits(bytes, &mut pos).is_empty() {
                return None;
            }
            // Exponents beyond i32 are rejected like any other malformed numeral.
            i64::from(input[start..pos].parse::<i32>().ok()?)
        } else {
            0
        };

        (pos == bytes.len()).then_some(Self {
            negative,
            integer,
            fraction,
            exponent,
        })
    }

    /// `value × 10^scale_digits`, exactly.
    fn scaled(&self, scale_digits: u32) -> Result<i128, Fault> {
        let digits: Vec<u8> = self
            .integer
            .iter()
            .chain(self.fraction)
            .copied()
            .skip_while(|&d| d == b'0')
            .collect();
        if digits.is_empty() {
            return Ok(0);
        }

        let mut shift = self.exponent - self.fraction.len() as i64 + i64::from(scale_digits);
        let mut significant = digits.as_slice();
        if shift < 0 {
            let excess = usize::try_from(-shift).map_err(|_| Fault::ExcessPrecision)?;
            let trailing_zeros = significant.iter().rev().take_while(|&&d| d == b'0').count();
            if trailing_zeros < excess {
                return Err(Fault::ExcessPrecision);
            }
            significant = &significant[..significant.len() - excess];
            shift = 0;
        }
        if shift > MAX_SHIFT {
            return Err(Fault::OutOfRange);
        }

        let mut value: i128 = 0;
        for &digit in significant {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(i128::from(digit - b'0')))
                .ok_or(Fault::OutOfRange)?;
        }
        for _ in 0..shift {
            value = value.checked_mul(10).ok_or(Fault::OutOfRange)?;
        }

        Ok(if self.negative { -value } else { value })
    }
}

fn take_digits<'a>(bytes: &'a [u8], pos: &mut usize) -> &'a [u8] {
    let start = *pos;
    while bytes.get(*pos).is_some_and(u8::is_ascii_digit) {
        *pos += 1;
    }
    &bytes[start..*pos]
}

fn scale_exact(input: &str, scale_digits: u32) -> Result<i128, Fault> {
    Numeral::parse(input)
        .ok_or(Fault::Invalid)?
        .scaled(scale_digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOWN: Field = Field::Frequency(SignalDirection::Down);
    const UP: Field = Field::Frequency(SignalDirection::Up);

    #[test]
    fn test_coordinates_scale_by_ten_million() {
        assert_eq!(Field::Coordinate.decode("35.4"), Ok(354_000_000));
        assert_eq!(Field::Coordinate.decode("-116.8"), Ok(-1_168_000_000));
        assert_eq!(Field::Coordinate.decode("148.9812519"), Ok(1_489_812_519));
    }

    #[test]
    fn test_angles_and_wind() {
        assert_eq!(Field::Azimuth.decode_i32("123.45"), Ok(12345));
        assert_eq!(Field::Elevation.decode_i32("-0.5"), Ok(-50));
        assert_eq!(Field::WindSpeed.decode_i32(""), Ok(-1));
        assert_eq!(Field::WindSpeed.decode_i32("0"), Ok(0));
    }

    #[test]
    fn test_excess_precision_is_rejected() {
        let err = Field::Azimuth.decode("12.345").unwrap_err();
        assert_eq!(
            err,
            NumericError::ExcessPrecision {
                field: Field::Azimuth,
                input: "12.345".to_string(),
                allowed: 2,
            }
        );
    }

    #[test]
    fn test_trailing_fraction_zeros_are_not_significant() {
        assert_eq!(Field::Azimuth.decode("12.340"), Ok(1234));
        assert_eq!(Field::Azimuth.decode("12.3400000"), Ok(1234));
        assert_eq!(Field::Coordinate.decode("1.000000000000"), Ok(10_000_000));
    }

    #[test]
    fn test_range_sentinel_is_exact_literal() {
        assert_eq!(Field::UplegRange.decode("-1.0"), Ok(-1));
        assert_eq!(Field::DownlegRange.decode("-1.0"), Ok(-1));
        assert_eq!(Field::RoundTripLightTime.decode("-1.0"), Ok(-1));
        // Only the literal is the sentinel; other spellings are values.
        assert_eq!(Field::UplegRange.decode("-1"), Ok(-1000));
        assert_eq!(Field::UplegRange.decode("-1.00"), Ok(-1000));
        assert!(Field::UplegRange.decode("").is_err());
    }

    #[test]
    fn test_signal_sentinels() {
        assert_eq!(Field::DataRate.decode(""), Ok(-1));
        assert_eq!(Field::DataRate.decode("null"), Ok(-1));
        assert!(Field::DataRate.decode("none").is_err());

        for literal in ["", "none", "null"] {
            assert_eq!(DOWN.decode(literal), Ok(-1));
            assert_eq!(UP.decode(literal), Ok(-1));
        }

        assert_eq!(Field::Power.decode_i32(""), Ok(0));
        assert_eq!(Field::Power.decode_i32("null"), Ok(0));
        assert_eq!(Field::Power.decode_i32("-120.4"), Ok(-120_400_000));
    }

    #[test]
    fn test_coordinate_has_no_sentinel() {
        assert!(matches!(
            Field::Coordinate.decode(""),
            Err(NumericError::InvalidNumeral { .. })
        ));
    }

    #[test]
    fn test_frequency_depends_on_direction() {
        assert_eq!(DOWN.decode("8.415"), Ok(8_415_000));
        assert_eq!(UP.decode("8.415"), Ok(8_415_000_000_000));
        assert_eq!(
            DOWN.decode("8.4150001"),
            Err(NumericError::ExcessPrecision {
                field: DOWN,
                input: "8.4150001".to_string(),
                allowed: 6,
            })
        );
        assert_eq!(UP.decode("8.4150001"), Ok(8_415_000_100_000));
    }

    #[test]
    fn test_exponent_forms() {
        assert_eq!(Field::DataRate.decode("1.5E3"), Ok(1_500_000_000));
        assert_eq!(Field::DataRate.decode("2e-6"), Ok(2));
        assert_eq!(
            Field::DataRate.decode("25E-7"),
            Err(NumericError::ExcessPrecision {
                field: Field::DataRate,
                input: "25E-7".to_string(),
                allowed: 6,
            })
        );
        assert_eq!(Field::DataRate.decode("0E-99"), Ok(0));
    }

    #[test]
    fn test_numeral_shapes() {
        assert_eq!(Field::Azimuth.decode(".5"), Ok(50));
        assert_eq!(Field::Azimuth.decode("5."), Ok(500));
        assert_eq!(Field::Azimuth.decode("+7.25"), Ok(725));
        assert_eq!(Field::Azimuth.decode("-0.00"), Ok(0));
        assert_eq!(Field::Azimuth.decode("007"), Ok(700));

        for bad in [".", "-", "+.", "1.2.3", "1e", "1e+", " 1", "1 ", "0x10", "NaN", "1,5"] {
            assert!(
                matches!(Field::Azimuth.decode(bad), Err(NumericError::InvalidNumeral { .. })),
                "{bad:?} should be invalid"
            );
        }
    }

    #[test]
    fn test_width_overflow() {
        // 21474836.48 * 100 = i32::MAX + 1
        assert!(matches!(
            Field::Azimuth.decode("21474836.48"),
            Err(NumericError::OutOfRange { .. })
        ));
        assert_eq!(Field::Azimuth.decode("21474836.47"), Ok(i64::from(i32::MAX)));
        assert!(matches!(
            UP.decode("10000000"),
            Err(NumericError::OutOfRange { .. })
        ));
        assert!(matches!(
            Field::DataRate.decode("1e400"),
            Err(NumericError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_integral_fields() {
        assert_eq!(Field::TimeZoneOffset.decode_i32("-25200000"), Ok(-25_200_000));
        assert_eq!(Field::Timestamp.decode("1467330727000"), Ok(1_467_330_727_000));
        assert!(matches!(
            Field::Timestamp.decode("1467330727000.0"),
            Err(NumericError::InvalidNumeral { .. })
        ));
        assert!(matches!(
            Field::TimeZoneOffset.decode("2147483648"),
            Err(NumericError::OutOfRange { .. })
        ));
        assert!(matches!(
            Field::Timestamp.decode("99999999999999999999"),
            Err(NumericError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_error_accessors() {
        let err = Field::Power.decode("abc").unwrap_err();
        assert_eq!(err.field(), Field::Power);
        assert_eq!(err.input(), "abc");
        assert_eq!(err.to_string(), "power: \"abc\" is not a valid numeral");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Sign, integer part and fractional digits of a generated numeral.
    fn numeral(max_fraction: usize) -> impl Strategy<Value = (bool, u64, Vec<u8>)> {
        (
            any::<bool>(),
            0u64..1_000_000,
            prop::collection::vec(0u8..10, 0..=max_fraction),
        )
    }

    fn render(negative: bool, integer: u64, fraction: &[u8]) -> String {
        let mut s = String::new();
        if negative {
            s.push('-');
        }
        s.push_str(&integer.to_string());
        if !fraction.is_empty() {
            s.push('.');
            s.extend(fraction.iter().map(|d| char::from(b'0' + d)));
        }
        s
    }

    fn expected(negative: bool, integer: u64, fraction: &[u8], scale_digits: u32) -> i64 {
        let mut value = integer as i128 * 10_i128.pow(scale_digits);
        for (i, &d) in fraction.iter().enumerate() {
            value += i128::from(d) * 10_i128.pow(scale_digits - 1 - i as u32);
        }
        let value = if negative { -value } else { value };
        value as i64
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2000))]

        #[test]
        fn prop_exact_within_scale(
            (negative, integer, fraction) in numeral(6),
            field in prop::sample::select(vec![
                Field::Coordinate,
                Field::DataRate,
                Field::Frequency(SignalDirection::Down),
                Field::Frequency(SignalDirection::Up),
            ]),
        ) {
            let input = render(negative, integer, &fraction);
            let decoded = field.decode(&input).unwrap();
            prop_assert_eq!(decoded, expected(negative, integer, &fraction, field.scale_digits()));
        }

        #[test]
        fn prop_excess_precision_always_fails(
            negative in any::<bool>(),
            integer in 0u64..1_000_000,
            padding in prop::collection::vec(0u8..10, 0..3),
            last in 1u8..10,
        ) {
            // Seven kept digits plus at least one more non-zero digit.
            let mut fraction = vec![1, 2, 3, 4, 5, 6, 7];
            fraction.extend(padding);
            fraction.push(last);
            let input = render(negative, integer, &fraction);
            prop_assert!(
                matches!(
                    Field::Coordinate.decode(&input),
                    Err(NumericError::ExcessPrecision { .. })
                ),
                "excess precision accepted for {}",
                input
            );
        }

        #[test]
        fn prop_up_frequency_is_million_times_down(
            (negative, integer, fraction) in numeral(6),
        ) {
            let input = render(negative, integer, &fraction);
            let down = Field::Frequency(SignalDirection::Down).decode(&input).unwrap();
            let up = Field::Frequency(SignalDirection::Up).decode(&input).unwrap();
            prop_assert_eq!(up, down * 1_000_000);
        }

        #[test]
        fn prop_decode_is_deterministic(input in "[-+]?[0-9]{0,6}(\\.[0-9]{0,8})?") {
            prop_assert_eq!(Field::Azimuth.decode(&input), Field::Azimuth.decode(&input));
        }
    }
}
