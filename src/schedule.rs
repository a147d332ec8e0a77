//! Rate schedule: maps pity counters to the probability of a rare draw.
//!
//! Pure functions of `(VariantConfig, counters)`; nothing here holds state.

use crate::config::{HardPityMode, VariantConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateDecision {
    /// Probability that this draw is rare, always within [0, 1].
    pub rare_probability: f64,
    /// A rare result on this draw is the UP item.
    pub forced_up: bool,
}

/// Rare probability from the escalation bands and soft pity alone.
///
/// Bands are cumulative: inside band k the rate is the base rate, plus every
/// lower band's increment times its full width, plus the current band's
/// increment for each pull already spent in it (the band's first pull counts).
pub fn rare_rate(variant: &VariantConfig, pulls_since_rare: u32) -> f64 {
    if variant.soft_pity.is_some_and(|soft| pulls_since_rare >= soft) {
        return 1.0;
    }
    // validated variants stay within 1.0 up to float rounding
    escalated_rate(variant, pulls_since_rare).min(1.0)
}

/// Base rate plus band escalation, before soft pity and without any cap.
pub fn escalated_rate(variant: &VariantConfig, pulls_since_rare: u32) -> f64 {
    let mut rate = variant.base_rate;
    for band in &variant.bands {
        if pulls_since_rare < band.start {
            break;
        }
        let steps = pulls_since_rare.min(band.end) - band.start + 1;
        rate += steps as f64 * band.increment;
    }
    rate
}

/// Full decision for the next draw.
///
/// `pulls_since_rare` and `pulls_since_up` already count the draw being
/// evaluated.
pub fn evaluate(
    variant: &VariantConfig,
    pulls_since_rare: u32,
    pulls_since_up: u32,
    hard_pity_armed: bool,
) -> RateDecision {
    let mut rare_probability = rare_rate(variant, pulls_since_rare);

    let pity_hit = hard_pity_armed && variant.hard_pity.is_some_and(|hard| pulls_since_up >= hard);
    if pity_hit {
        rare_probability = 1.0;
    }

    let guarantee_pending = variant.hard_pity_mode == HardPityMode::AfterLoss && hard_pity_armed;

    RateDecision {
        rare_probability,
        forced_up: pity_hit || guarantee_pending,
    }
}

/// Every `periodic_bonus_interval`-th pull of a pool grants a free UP.
pub fn periodic_bonus(variant: &VariantConfig, total_pulls: u64) -> bool {
    match variant.periodic_bonus_interval {
        Some(interval) => total_pulls > 0 && total_pulls % interval as u64 == 0,
        None => false,
    }
}

/// Exact expected number of pulls between two rares, ignoring hard pity.
///
/// `None` when a rare can never happen (zero rate with no soft pity).
pub fn expected_pulls_per_rare(variant: &VariantConfig) -> Option<f64> {
    let last_band_end = variant.bands.last().map_or(0, |b| b.end);
    let mut survival = 1.0;
    let mut expected = 0.0;
    let mut k = 1u32;
    loop {
        let p = rare_rate(variant, k);
        expected += k as f64 * survival * p;
        survival *= 1.0 - p;
        if p >= 1.0 {
            return Some(expected);
        }
        if variant.soft_pity.is_none() && k >= last_band_end {
            // constant rate from here on: geometric tail
            if p <= 0.0 {
                return None;
            }
            return Some(expected + survival * (k as f64 + 1.0 / p));
        }
        k += 1;
    }
}
