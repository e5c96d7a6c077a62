//! Temperature conversions for the status ack.
//!
//! The internal sensor is an NTC thermistor sampled by a 12-bit ADC. The
//! optional external probe reports a signed 16-bit value in 1/16 degC steps.

#![deny(static_mut_refs)]

/// Full-scale reading of the internal ADC.
pub const AD_MAX: i32 = 4095;
/// Thermistor B constant.
pub const NTC_B: f64 = 3380.0;
/// 0 degC in kelvin.
pub const KELVIN_OFFSET: f64 = 273.15;
/// Thermistor reference temperature (25 degC) in kelvin.
pub const NTC_T25: f64 = KELVIN_OFFSET + 25.0;

/// Value of `temperatureDetection` when the external probe is plugged in.
pub const EXTERNAL_PROBE_PRESENT: u8 = 1;

/// Convert a raw internal ADC reading to centi-degrees Celsius.
///
/// `ad` is clamped to `[1, AD_MAX - 1]`, the result is rounded half away from
/// zero at the second decimal and then truncated.
pub fn ntc_centi_celsius(ad: i32) -> i32 {
    let ad = ad.clamp(1, AD_MAX - 1);
    let ratio = f64::from(AD_MAX - ad) / f64::from(ad);
    let mut t = NTC_B / (ratio.ln() + NTC_B / NTC_T25) - KELVIN_OFFSET;
    t += if t >= 0.0 { 0.005 } else { -0.005 };
    (t * 100.0) as i32
}

/// Convert the raw external probe field to centi-degrees Celsius.
///
/// Only the low 16 bits are meaningful; they hold a signed count of 1/16 degC.
/// The `+ 0.5` bias matches the firmware's own rounding.
pub fn external_probe_centi_celsius(raw: u32) -> f32 {
    let counts = f32::from((raw & 0xFFFF) as u16 as i16);
    counts * 0.0625 * 100.0 + 0.5
}

/// Centi-degrees to degrees.
pub fn centi_to_celsius(centi: f64) -> f64 {
    centi * 0.01
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ntc_midscale_is_about_room_temperature() {
        assert_eq!(ntc_centi_celsius(2048), 2501);
    }

    #[test]
    fn test_ntc_sign_and_rounding() {
        assert_eq!(ntc_centi_celsius(1000), -202);
        assert_eq!(ntc_centi_celsius(3000), 5409);
    }

    #[test]
    fn test_ntc_clamps_out_of_range_readings() {
        assert_eq!(ntc_centi_celsius(0), ntc_centi_celsius(1));
        assert_eq!(ntc_centi_celsius(-50), ntc_centi_celsius(1));
        assert_eq!(ntc_centi_celsius(AD_MAX), ntc_centi_celsius(AD_MAX - 1));
        assert_eq!(ntc_centi_celsius(i32::MAX), ntc_centi_celsius(AD_MAX - 1));
    }

    #[test]
    fn test_ntc_is_monotonic_in_adc_reading() {
        let mut last = ntc_centi_celsius(1);
        for ad in (64..AD_MAX).step_by(64) {
            let t = ntc_centi_celsius(ad);
            assert!(t >= last, "ad={ad} gave {t} after {last}");
            last = t;
        }
    }

    #[test]
    fn test_external_probe_decoding() {
        // 0x0190 = 400 counts = 25.0 degC
        assert!((external_probe_centi_celsius(0x0000_0190) - 2500.5).abs() < 1e-3);
        // 0xFFF0 = -16 counts = -1.0 degC, upper bits ignored
        assert!((external_probe_centi_celsius(0xABCD_FFF0) - (-99.5)).abs() < 1e-3);
    }

    #[test]
    fn test_centi_to_celsius() {
        assert!((centi_to_celsius(2501.0) - 25.01).abs() < 1e-9);
    }
}
