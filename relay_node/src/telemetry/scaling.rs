//! Fixed-point encoding of sensor units for the on-chain schema.
//!
//! Both quantities are stored as tenths: temperature as `int16` and humidity
//! as `uint16`. Scaling rounds half away from zero (`f64::round`), so `2.5`
//! tenths becomes `3` and `-2.5` becomes `-3`.

use thiserror::Error;

/// Multiplier between sensor units and the encoded integers.
pub const SCALE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    #[error("temperature {0} is outside the encodable range [-3276.8, 3276.7]")]
    Temperature(f64),

    #[error("humidity {0} is outside the encodable range [0, 6553.5]")]
    Humidity(f64),
}

/// Scale a (temperature, humidity) pair to tenths.
pub fn encode(temperature: f64, humidity: f64) -> Result<(i16, u16), RangeError> {
    Ok((encode_temperature(temperature)?, encode_humidity(humidity)?))
}

pub fn encode_temperature(value: f64) -> Result<i16, RangeError> {
    let scaled = (value * SCALE).round();
    if !scaled.is_finite() || scaled < f64::from(i16::MIN) || scaled > f64::from(i16::MAX) {
        return Err(RangeError::Temperature(value));
    }
    Ok(scaled as i16)
}

pub fn encode_humidity(value: f64) -> Result<u16, RangeError> {
    let scaled = (value * SCALE).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled > f64::from(u16::MAX) {
        return Err(RangeError::Humidity(value));
    }
    Ok(scaled as u16)
}

/// Inverse of [`encode`].
pub fn decode(temperature_tenths: i16, humidity_tenths: u16) -> (f64, f64) {
    (
        f64::from(temperature_tenths) / SCALE,
        f64::from(humidity_tenths) / SCALE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_values() {
        assert_eq!(encode(150.0, 45.5), Ok((1500, 455)));
        assert_eq!(encode(-12.0, 0.0), Ok((-120, 0)));
        assert_eq!(encode(21.34, 99.96), Ok((213, 1000)));
    }

    #[test]
    fn test_ties_round_away_from_zero() {
        assert_eq!(encode_temperature(0.25), Ok(3));
        assert_eq!(encode_temperature(-0.25), Ok(-3));
        assert_eq!(encode_humidity(0.25), Ok(3));
    }

    #[test]
    fn test_temperature_bounds() {
        assert_eq!(encode_temperature(3276.7), Ok(i16::MAX));
        assert_eq!(encode_temperature(-3276.8), Ok(i16::MIN));
        assert!(matches!(encode_temperature(3276.8), Err(RangeError::Temperature(_))));
        assert!(matches!(encode_temperature(-3276.9), Err(RangeError::Temperature(_))));
    }

    #[test]
    fn test_humidity_bounds() {
        assert_eq!(encode_humidity(6553.5), Ok(u16::MAX));
        assert_eq!(encode_humidity(-0.04), Ok(0));
        assert!(matches!(encode_humidity(6553.6), Err(RangeError::Humidity(_))));
        assert!(matches!(encode_humidity(-0.1), Err(RangeError::Humidity(_))));
    }

    #[test]
    fn test_non_finite_inputs_are_rejected() {
        assert!(encode(f64::NAN, 10.0).is_err());
        assert!(encode(10.0, f64::INFINITY).is_err());
        assert!(encode(f64::NEG_INFINITY, 10.0).is_err());
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode(1500, 455), (150.0, 45.5));
        assert_eq!(decode(-43, 0), (-4.3, 0.0));
    }

    proptest! {
        #[test]
        fn prop_round_trip_within_a_tenth(t in -3276.0f64..3276.0, h in 0.0f64..6553.0) {
            let (tt, ht) = encode(t, h).unwrap();
            let (dt, dh) = decode(tt, ht);
            prop_assert!((dt - t).abs() < 0.1);
            prop_assert!((dh - h).abs() < 0.1);
        }
    }
}
