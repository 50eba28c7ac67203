//! Cloud-aware percentile stretch
//!
//! Maps a 16-bit band to the full 16-bit range in two segments:
//!
//! ```text
//! (0, cut)       [p_low, cut]  -> [256, divide]
//! [cut, ..]      own min..max  -> [divide, 65535]
//!
//! cut    = percentile(valid, 100 - coverage * 3/4)
//! divide = 65000 - coverage * 100
//! ```
//!
//! The more cloud and snow a scene has, the lower the cut and the divide,
//! so bright cloud pixels get their own slice of the output range instead
//! of flattening the terrain. Zero stays zero.

use landsat_core::{Algorithm, Error, Result};
use ndarray::Array2;
use tracing::debug;

/// Values strictly inside this open interval take part in the percentiles
const VALID_MAX: f64 = 65535.0;
const OUT_MIN: f64 = 256.0;
const OUT_MAX: f64 = 65535.0;

/// Parameters for [`stretch`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchParams {
    /// Lower percentile, 0 to 100
    pub low: f64,
    /// Cloud/snow coverage percentage, 0 to 100
    pub coverage: f64,
}

impl Default for StretchParams {
    fn default() -> Self {
        Self {
            low: 0.0,
            coverage: 0.0,
        }
    }
}

impl StretchParams {
    pub fn with_coverage(coverage: f64) -> Self {
        Self {
            coverage,
            ..Self::default()
        }
    }

    /// Upper percentile used for the cloud cut
    pub fn high(&self) -> f64 {
        100.0 - self.coverage.clamp(0.0, 100.0) * 3.0 / 4.0
    }

    /// Start of the output range reserved for cloud and snow
    pub fn cloud_divide(&self) -> f64 {
        65000.0 - self.coverage.clamp(0.0, 100.0) * 100.0
    }
}

/// Percentiles of `values` with linear interpolation between closest ranks.
///
/// Reorders `values`. Fails when `values` is empty.
pub fn percentiles(values: &mut [f64], ps: &[f64]) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(Error::Statistics(
            "percentile of an empty sample (all pixels zero or saturated)".into(),
        ));
    }

    let n = values.len();
    ps.iter()
        .map(|&p| {
            if !(0.0..=100.0).contains(&p) {
                return Err(Error::InvalidParameter {
                    name: "percentile",
                    value: p.to_string(),
                    reason: "must be within [0, 100]".into(),
                });
            }

            let rank = p / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let frac = rank - lo as f64;

            let (_, lo_value, above) = values.select_nth_unstable_by(lo, |a, b| a.total_cmp(b));
            let lo_value = *lo_value;
            if frac == 0.0 || above.is_empty() {
                return Ok(lo_value);
            }
            let hi_value = above.iter().copied().fold(f64::INFINITY, f64::min);
            Ok(lo_value + (hi_value - lo_value) * frac)
        })
        .collect()
}

/// Linear rescale of `v` from `[in_min, in_max]` to `[out_min, out_max]`,
/// clipping to the input range and truncating to an integer.
#[inline]
fn rescale(v: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> u16 {
    if in_max <= in_min {
        return out_min as u16;
    }
    let t = (v.clamp(in_min, in_max) - in_min) / (in_max - in_min);
    (out_min + t * (out_max - out_min)) as u16
}

/// Stretch one band; see the module docs for the mapping.
///
/// Non-positive input is nodata and maps to 0. Fails when the band has no
/// pixel strictly between 0 and 65535.
pub fn stretch(band: &Array2<f64>, params: &StretchParams) -> Result<Array2<u16>> {
    let high = params.high();
    if !(params.low < high) {
        return Err(Error::InvalidParameter {
            name: "low",
            value: params.low.to_string(),
            reason: format!("must be below the cloud percentile {}", high),
        });
    }

    let mut valid: Vec<f64> = band
        .iter()
        .copied()
        .filter(|&v| v > 0.0 && v < VALID_MAX)
        .collect();
    let cuts = percentiles(&mut valid, &[params.low, high])?;
    let (p_low, cut) = (cuts[0], cuts[1]);
    let divide = params.cloud_divide();

    let (upper_min, upper_max) = band
        .iter()
        .filter(|&&v| v >= cut)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    debug!(p_low, cut, divide, upper_min, upper_max, "stretch ranges");

    Ok(band.mapv(|v| {
        if v >= cut {
            rescale(v, upper_min, upper_max, divide, OUT_MAX)
        } else if v > 0.0 {
            rescale(v, p_low, cut, OUT_MIN, divide)
        } else {
            0
        }
    }))
}

/// 16-bit to 8-bit quantisation keeping the high byte
pub fn to_u8(band: &Array2<u16>) -> Array2<u8> {
    band.mapv(|v| (v >> 8) as u8)
}

/// [`stretch`] behind the common algorithm interface
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentileStretch;

impl Algorithm for PercentileStretch {
    type Input = Array2<f64>;
    type Output = Array2<u16>;
    type Params = StretchParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "PercentileStretch"
    }

    fn description(&self) -> &'static str {
        "Cloud-aware two-segment percentile stretch to 16 bits"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        stretch(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn band(values: &[f64], cols: usize) -> Array2<f64> {
        Array2::from_shape_vec((values.len() / cols, cols), values.to_vec()).unwrap()
    }

    #[test]
    fn test_percentiles_match_linear_interpolation() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0];
        let p = percentiles(&mut v, &[0.0, 50.0, 100.0, 25.0]).unwrap();
        assert_relative_eq!(p[0], 1.0);
        assert_relative_eq!(p[1], 2.5);
        assert_relative_eq!(p[2], 4.0);
        assert_relative_eq!(p[3], 1.75);
    }

    #[test]
    fn test_percentiles_empty_fails() {
        assert!(matches!(
            percentiles(&mut [], &[50.0]),
            Err(Error::Statistics(_))
        ));
        assert!(percentiles(&mut [1.0], &[101.0]).is_err());
    }

    #[test]
    fn test_clear_scene_mapping() {
        let b = band(&[0.0, 1000.0, 2000.0, 3000.0, 4000.0, 5000.0], 3);
        let out = stretch(&b, &StretchParams::default()).unwrap();

        assert_eq!(out[(0, 0)], 0);
        assert_eq!(out[(0, 1)], 256);
        // the maximum sits at the cut and opens the upper segment
        assert_eq!(out[(1, 2)], 65000);
        // 3000 is halfway between 1000 and 5000
        assert_eq!(out[(1, 0)], (256.0 + 0.5 * (65000.0 - 256.0)) as u16);
    }

    #[test]
    fn test_output_range_property() {
        for coverage in [0.0, 12.5, 60.0, 100.0] {
            let values: Vec<f64> = (0..400).map(|i| ((i * 7919) % 70000) as f64).collect();
            let b = band(&values, 20);
            let out = stretch(&b, &StretchParams::with_coverage(coverage)).unwrap();

            for (input, output) in b.iter().zip(out.iter()) {
                if *input == 0.0 {
                    assert_eq!(*output, 0);
                } else {
                    assert!(*output >= 256, "{} -> {}", input, output);
                }
            }
        }
    }

    #[test]
    fn test_cloud_divide_moves_with_coverage() {
        assert_relative_eq!(StretchParams::with_coverage(0.0).cloud_divide(), 65000.0);
        assert_relative_eq!(StretchParams::with_coverage(20.0).cloud_divide(), 63000.0);
        assert_relative_eq!(StretchParams::with_coverage(20.0).high(), 85.0);
    }

    #[test]
    fn test_all_zero_band_fails() {
        let b = Array2::<f64>::zeros((4, 4));
        assert!(matches!(
            stretch(&b, &StretchParams::default()),
            Err(Error::Statistics(_))
        ));

        let saturated = Array2::from_elem((2, 2), 65535.0);
        assert!(stretch(&saturated, &StretchParams::default()).is_err());
    }

    #[test]
    fn test_algorithm_trait() {
        let b = band(&[10.0, 20.0, 30.0, 40.0], 2);
        let out = PercentileStretch.execute_default(b).unwrap();
        assert_eq!(out[(0, 0)], 256);
        assert_eq!(PercentileStretch.name(), "PercentileStretch");
    }

    #[test]
    fn test_to_u8_keeps_high_byte() {
        let b = Array2::from_shape_vec((1, 4), vec![0u16, 256, 32768, 65535]).unwrap();
        assert_eq!(to_u8(&b).iter().copied().collect::<Vec<u8>>(), vec![0, 1, 128, 255]);
    }
}
