//! Battery level estimation.
//!
//! Converts a raw ADC sample of the supply voltage into the 0-100 value
//! published on the Battery Level characteristic. Everything here is pure
//! integer arithmetic: out-of-range samples (negative, above full scale)
//! clamp instead of failing.

/// ADC transfer function: `millivolts = raw * full_scale_mv / 2^resolution_bits`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcScale {
    pub full_scale_mv: u32,
    pub resolution_bits: u8,
}

impl AdcScale {
    /// nRF52 SAADC sampling VDD: 0.6 V internal reference, gain 1/6, 12 bit.
    pub const NRF52_VDD: Self = Self {
        full_scale_mv: 3600,
        resolution_bits: 12,
    };

    /// nRF51 ADC sampling VDD with 1/3 prescaling against the 1.2 V band gap, 10 bit.
    pub const NRF51_VDD: Self = Self {
        full_scale_mv: 3600,
        resolution_bits: 10,
    };

    pub fn to_millivolts(&self, raw: i32) -> i32 {
        let steps = 1i64 << self.resolution_bits.min(32);
        let mv = i64::from(raw) * i64::from(self.full_scale_mv) / steps;
        mv.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }
}

/// One point of a discharge curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Anchor {
    pub millivolts: i32,
    pub percent: u8,
}

const fn anchor(millivolts: i32, percent: u8) -> Anchor {
    Anchor {
        millivolts,
        percent,
    }
}

/// CR2032 lithium coin cell under light load, highest voltage first.
pub const CR2032_CURVE: [Anchor; 8] = [
    anchor(3000, 100),
    anchor(2900, 80),
    anchor(2800, 60),
    anchor(2700, 40),
    anchor(2600, 30),
    anchor(2500, 20),
    anchor(2400, 10),
    anchor(2000, 0),
];

/// How a voltage maps to a percentage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatteryPolicy {
    /// Piecewise-linear interpolation over anchors ordered by decreasing voltage.
    Curve(&'static [Anchor]),
    /// Straight line from `empty_mv` (0 %) to `full_mv` (100 %).
    Linear { empty_mv: i32, full_mv: i32 },
}

/// ADC scale plus policy; the only thing the dispatcher needs to publish a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatteryEstimator {
    scale: AdcScale,
    policy: BatteryPolicy,
}

impl BatteryEstimator {
    pub const fn new(scale: AdcScale, policy: BatteryPolicy) -> Self {
        Self { scale, policy }
    }

    /// Estimate the charge level in percent (always within 0..=100).
    pub fn estimate(&self, raw: i32) -> u8 {
        let mv = self.scale.to_millivolts(raw);
        match self.policy {
            BatteryPolicy::Curve(curve) => percent_from_curve(mv, curve),
            BatteryPolicy::Linear { empty_mv, full_mv } => percent_linear(mv, empty_mv, full_mv),
        }
    }
}

/// Interpolate `mv` over `curve` (highest voltage first).
pub fn percent_from_curve(mv: i32, curve: &[Anchor]) -> u8 {
    let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
        return 0;
    };
    if mv >= first.millivolts {
        return 100;
    }
    if mv <= last.millivolts {
        return 0;
    }

    for pair in curve.windows(2) {
        let (upper, lower) = (pair[0], pair[1]);
        if mv > lower.millivolts {
            return interpolate(mv, lower, upper);
        }
    }
    0
}

/// Map `mv` linearly from `empty_mv..=full_mv` onto 0..=100.
///
/// With `full_mv <= empty_mv` this degenerates to a step at `full_mv`.
pub fn percent_linear(mv: i32, empty_mv: i32, full_mv: i32) -> u8 {
    if mv >= full_mv {
        return 100;
    }
    if mv <= empty_mv {
        return 0;
    }
    let span = i64::from(full_mv) - i64::from(empty_mv);
    let offset = i64::from(mv) - i64::from(empty_mv);
    round_div(offset * 100, span).clamp(0, 100) as u8
}

fn interpolate(mv: i32, lower: Anchor, upper: Anchor) -> u8 {
    let span = i64::from(upper.millivolts) - i64::from(lower.millivolts);
    if span <= 0 {
        return upper.percent.min(100);
    }
    let rise = i64::from(upper.percent) - i64::from(lower.percent);
    let offset = i64::from(mv) - i64::from(lower.millivolts);
    let value = i64::from(lower.percent) + round_div(offset * rise, span);
    value.clamp(0, 100) as u8
}

/// Division rounding half away from zero. `den` must be positive.
fn round_div(num: i64, den: i64) -> i64 {
    if num >= 0 {
        (num + den / 2) / den
    } else {
        -((-num + den / 2) / den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(empty_mv: i32, full_mv: i32) -> BatteryEstimator {
        BatteryEstimator::new(AdcScale::NRF52_VDD, BatteryPolicy::Linear { empty_mv, full_mv })
    }

    fn raw_for(mv: i32, scale: AdcScale) -> i32 {
        // Smallest raw sample that converts to at least `mv`.
        let steps = 1i64 << scale.resolution_bits;
        let full = i64::from(scale.full_scale_mv);
        ((i64::from(mv) * steps + full - 1) / full) as i32
    }

    #[test]
    fn millivolt_conversion_nrf52() {
        let scale = AdcScale::NRF52_VDD;
        assert_eq!(scale.to_millivolts(0), 0);
        assert_eq!(scale.to_millivolts(4096), 3600);
        assert_eq!(scale.to_millivolts(2048), 1800);
        assert!(scale.to_millivolts(-10) < 0);
    }

    #[test]
    fn millivolt_conversion_nrf51() {
        assert_eq!(AdcScale::NRF51_VDD.to_millivolts(1024), 3600);
        assert_eq!(AdcScale::NRF51_VDD.to_millivolts(512), 1800);
    }

    #[test]
    fn millivolt_conversion_saturates() {
        let wide = AdcScale {
            full_scale_mv: u32::MAX,
            resolution_bits: 0,
        };
        assert_eq!(wide.to_millivolts(i32::MAX), i32::MAX);
        assert_eq!(wide.to_millivolts(i32::MIN), i32::MIN);
    }

    #[test]
    fn curve_endpoints_clamp() {
        assert_eq!(percent_from_curve(3300, &CR2032_CURVE), 100);
        assert_eq!(percent_from_curve(3000, &CR2032_CURVE), 100);
        assert_eq!(percent_from_curve(2000, &CR2032_CURVE), 0);
        assert_eq!(percent_from_curve(-500, &CR2032_CURVE), 0);
    }

    #[test]
    fn curve_hits_anchors_exactly() {
        assert_eq!(percent_from_curve(2900, &CR2032_CURVE), 80);
        assert_eq!(percent_from_curve(2700, &CR2032_CURVE), 40);
        assert_eq!(percent_from_curve(2400, &CR2032_CURVE), 10);
    }

    #[test]
    fn curve_interpolates_between_anchors() {
        assert_eq!(percent_from_curve(2950, &CR2032_CURVE), 90);
        assert_eq!(percent_from_curve(2650, &CR2032_CURVE), 35);
        // 2.0 V -> 0 %, 2.4 V -> 10 %: 2.2 V is half way.
        assert_eq!(percent_from_curve(2200, &CR2032_CURVE), 5);
        // Rounds to nearest: 2.475 V -> 17.5 % between 2.4 and 2.5.
        assert_eq!(percent_from_curve(2475, &CR2032_CURVE), 18);
    }

    #[test]
    fn curve_tolerates_degenerate_input() {
        assert_eq!(percent_from_curve(2500, &[]), 0);

        static FLAT: [Anchor; 3] = [anchor(3000, 100), anchor(2500, 50), anchor(2500, 0)];
        assert_eq!(percent_from_curve(2700, &FLAT), 70);
        assert_eq!(percent_from_curve(2500, &FLAT), 0);

        static SINGLE: [Anchor; 1] = [anchor(2800, 60)];
        assert_eq!(percent_from_curve(2900, &SINGLE), 100);
        assert_eq!(percent_from_curve(2700, &SINGLE), 0);
    }

    #[test]
    fn linear_two_point_policy() {
        let est = linear(1800, 3100);
        let scale = AdcScale::NRF52_VDD;

        assert_eq!(est.estimate(raw_for(1800, scale)), 0);
        assert_eq!(est.estimate(raw_for(3100, scale)), 100);
        assert_eq!(est.estimate(raw_for(3500, scale)), 100);

        let half = est.estimate(raw_for(2450, scale));
        assert!((49..=51).contains(&half), "got {half}");
    }

    #[test]
    fn linear_clamps_out_of_range_raw() {
        let est = linear(1800, 3100);
        assert_eq!(est.estimate(-1), 0);
        assert_eq!(est.estimate(i32::MIN), 0);
        assert_eq!(est.estimate(i32::MAX), 100);
    }

    #[test]
    fn linear_inverted_range_is_a_step() {
        assert_eq!(percent_linear(3000, 3100, 1800), 100);
        assert_eq!(percent_linear(1799, 3100, 1800), 0);
    }

    #[test]
    fn estimate_is_monotonic_in_raw() {
        let estimators = [
            BatteryEstimator::new(AdcScale::NRF52_VDD, BatteryPolicy::Curve(&CR2032_CURVE)),
            BatteryEstimator::new(AdcScale::NRF51_VDD, BatteryPolicy::Curve(&CR2032_CURVE)),
            linear(1800, 3100),
        ];
        for est in estimators {
            let mut prev = est.estimate(-200);
            for raw in -199..5000 {
                let pct = est.estimate(raw);
                assert!(pct <= 100);
                assert!(pct >= prev, "raw {raw}: {pct} < {prev}");
                prev = pct;
            }
        }
    }
}
