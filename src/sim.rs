use crate::config::{HardPityMode, VariantConfig};
use crate::error::{GachaError, GachaResult};
use crate::pool::{PoolState, PullOutcome};
use crate::rng::UniformSource;
use crate::schedule;
use log::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub outcome: PullOutcome,
    /// This pull also landed on a periodic free UP.
    pub bonus_up: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSummary {
    pub draws: u32,
    pub rares: u32,
    pub ups: u32,
    pub bonus_ups: u32,
}

/// Terminal cost of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationResult {
    Pulls(u64),
    PerPool { primary: u64, secondary: u64 },
}

impl SimulationResult {
    pub fn total(&self) -> u64 {
        match *self {
            SimulationResult::Pulls(n) => n,
            SimulationResult::PerPool { primary, secondary } => primary + secondary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostMetric {
    Combined,
    PerPool,
}

/// Advances `state` by one draw.
///
/// Order matters: counters tick first, the periodic bonus is checked on the
/// new total, the rate is read from the ticked counters, then the roll
/// resets whatever it hit.
pub fn roll_one<R: UniformSource + ?Sized>(
    state: &mut PoolState,
    variant: &VariantConfig,
    rng: &mut R,
) -> Draw {
    state.total_pulls += 1;
    state.pulls_since_rare = state.pulls_since_rare.saturating_add(1);
    state.pulls_since_up = state.pulls_since_up.saturating_add(1);
    state.pulls_since_near_rare = state.pulls_since_near_rare.saturating_add(1);

    let bonus_up = schedule::periodic_bonus(variant, state.total_pulls);
    if bonus_up {
        state.bonus_up_count += 1;
    }

    let decision = schedule::evaluate(
        variant,
        state.pulls_since_rare,
        state.pulls_since_up,
        state.hard_pity_armed,
    );

    let r = rng.next_f64();
    let outcome = if r < decision.rare_probability {
        let is_up = decision.forced_up || variant.up_rate >= 1.0 || rng.next_f64() < variant.up_rate;
        settle_rare(state, variant, is_up);
        if is_up {
            PullOutcome::RareUp
        } else {
            PullOutcome::Rare
        }
    } else {
        settle_non_rare(state, variant, r, decision.rare_probability);
        PullOutcome::NonRare
    };

    Draw { outcome, bonus_up }
}

fn settle_rare(state: &mut PoolState, variant: &VariantConfig, is_up: bool) {
    state.rare_count += 1;
    state.pulls_since_rare = 0;
    state.pulls_since_near_rare = 0;

    if is_up {
        state.up_count += 1;
        state.pulls_since_up = 0;
        state.hard_pity_armed = match variant.hard_pity_mode {
            HardPityMode::OnceOnly | HardPityMode::AfterLoss => false,
            HardPityMode::Recurring => true,
        };
    } else if variant.hard_pity_mode == HardPityMode::AfterLoss {
        state.hard_pity_armed = true;
    }

    if let Some(currency) = &variant.currency {
        state.credit_currency(currency.rare);
    }
}

fn settle_non_rare(state: &mut PoolState, variant: &VariantConfig, r: f64, rare_probability: f64) {
    let Some(currency) = &variant.currency else {
        return;
    };
    let near_rare_forced = currency
        .near_rare_pity
        .is_some_and(|pity| state.pulls_since_near_rare >= pity);
    if near_rare_forced || r < rare_probability + currency.near_rare_rate {
        state.near_rare_count += 1;
        state.pulls_since_near_rare = 0;
        state.credit_currency(currency.near_rare);
    } else {
        state.credit_currency(currency.common);
    }
}

/// One purchase on the pool: a single pull, or a full multi-pull batch whose
/// draws all happen even if the target is met halfway through.
pub fn step<R: UniformSource + ?Sized>(
    state: &mut PoolState,
    variant: &VariantConfig,
    rng: &mut R,
) -> StepSummary {
    if let Some(cost) = variant.draw_cost {
        state.spend_currency(cost);
    }

    let mut summary = StepSummary::default();
    for _ in 0..variant.batch_size {
        let draw = roll_one(state, variant, rng);
        summary.draws += 1;
        if draw.outcome.is_rare() {
            summary.rares += 1;
        }
        if draw.outcome.is_up() {
            summary.ups += 1;
        }
        if draw.bonus_up {
            summary.bonus_ups += 1;
        }
    }
    summary
}

fn ensure_under_cap(state: &PoolState, variant: &VariantConfig, max_draws: u64) -> GachaResult<()> {
    if state.total_pulls >= max_draws {
        return Err(GachaError::NonTerminatingTrial {
            variant: variant.name.clone(),
            cap: max_draws,
        });
    }
    Ok(())
}

/// Steps one pool until it owns `target` UP items. The stop check only runs
/// between steps, so multi-pull pools may overshoot within their last batch.
pub fn run_pool<R: UniformSource + ?Sized>(
    state: &mut PoolState,
    variant: &VariantConfig,
    target: u64,
    max_draws: u64,
    rng: &mut R,
) -> GachaResult<()> {
    while state.owned_up() < target {
        ensure_under_cap(state, variant, max_draws)?;
        let s = step(state, variant, rng);
        trace!(
            "[Sim] '{}' step: {} draws, {} rare, {} up, {} bonus",
            variant.name, s.draws, s.rares, s.ups, s.bonus_ups
        );
    }
    Ok(())
}

/// Steps two pools in lockstep until both targets are met. The primary's
/// currency is handed to the secondary before each of its steps.
#[allow(clippy::too_many_arguments)]
pub fn run_pair<R: UniformSource + ?Sized>(
    primary: &mut PoolState,
    primary_variant: &VariantConfig,
    primary_target: u64,
    secondary: &mut PoolState,
    secondary_variant: &VariantConfig,
    secondary_target: u64,
    max_draws: u64,
    rng: &mut R,
) -> GachaResult<()> {
    while primary.owned_up() < primary_target || secondary.owned_up() < secondary_target {
        if primary.owned_up() < primary_target {
            ensure_under_cap(primary, primary_variant, max_draws)?;
            step(primary, primary_variant, rng);
        }
        if secondary.owned_up() < secondary_target {
            ensure_under_cap(secondary, secondary_variant, max_draws)?;
            primary.transfer_currency_to(secondary);
            step(secondary, secondary_variant, rng);
        }
    }
    Ok(())
}

/// Fresh single-pool trial; returns the pulls spent.
pub fn single_trial<R: UniformSource + ?Sized>(
    variant: &VariantConfig,
    target: u64,
    max_draws: u64,
    rng: &mut R,
) -> GachaResult<SimulationResult> {
    let mut state = PoolState::new(variant);
    run_pool(&mut state, variant, target, max_draws, rng)?;
    Ok(SimulationResult::Pulls(state.total_pulls))
}

/// Fresh coupled trial over two pools.
pub fn pair_trial<R: UniformSource + ?Sized>(
    (primary_variant, primary_target): (&VariantConfig, u64),
    (secondary_variant, secondary_target): (&VariantConfig, u64),
    metric: CostMetric,
    max_draws: u64,
    rng: &mut R,
) -> GachaResult<SimulationResult> {
    let mut primary = PoolState::new(primary_variant);
    let mut secondary = PoolState::new(secondary_variant);
    run_pair(
        &mut primary,
        primary_variant,
        primary_target,
        &mut secondary,
        secondary_variant,
        secondary_target,
        max_draws,
        rng,
    )?;
    debug!(
        "[Sim] pair trial: {} rare / {} near-rare, {} tickets earned, {} tickets short",
        primary.rare_count, primary.near_rare_count, primary.currency_earned, secondary.currency_shortfall
    );
    Ok(match metric {
        CostMetric::Combined => SimulationResult::Pulls(primary.total_pulls + secondary.total_pulls),
        CostMetric::PerPool => SimulationResult::PerPool {
            primary: primary.total_pulls,
            secondary: secondary.total_pulls,
        },
    })
}

/// One player visiting `banners` consecutive banners of `variant`, stopping
/// on each at the first UP. Rarity pity carries from banner to banner.
/// Returns the pulls spent on each banner.
pub fn rotation_trial<R: UniformSource + ?Sized>(
    variant: &VariantConfig,
    banners: usize,
    max_draws: u64,
    rng: &mut R,
) -> GachaResult<Vec<u64>> {
    let mut state = PoolState::new(variant);
    let mut spent = Vec::with_capacity(banners);
    for _ in 0..banners {
        state = state.carry_over(variant);
        run_pool(&mut state, variant, 1, max_draws, rng)?;
        spent.push(state.total_pulls);
    }
    Ok(spent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VariantConfig;
    use crate::rng::scripted::{Constant, Script};
    use crate::rng::Rng;

    const CAP: u64 = 1_000_000;

    fn pity_free(base_rate: f64, up_rate: f64) -> VariantConfig {
        VariantConfig {
            name: "pity-free".to_string(),
            base_rate,
            bands: Vec::new(),
            soft_pity: None,
            hard_pity: None,
            hard_pity_mode: HardPityMode::Recurring,
            up_rate,
            periodic_bonus_interval: None,
            batch_size: 1,
            currency: None,
            draw_cost: None,
        }
    }

    #[test]
    fn soft_pity_boundary_forces_rare_at_79() {
        let v = VariantConfig::wuwa_weapon();
        for _ in 0..5 {
            let mut rng = Constant(0.999);
            let res = single_trial(&v, 1, CAP, &mut rng).unwrap();
            assert_eq!(res, SimulationResult::Pulls(79));
        }
    }

    #[test]
    fn hard_pity_gives_first_up_at_120_then_disarms() {
        let v = VariantConfig::endfield_character();
        let mut state = PoolState::new(&v);
        let mut rng = Constant(0.999);
        let mut first_up = None;
        for _ in 0..200 {
            let draw = roll_one(&mut state, &v, &mut rng);
            if state.total_pulls == 80 {
                assert_eq!(draw.outcome, PullOutcome::Rare);
            }
            if draw.outcome.is_up() {
                first_up = Some(state.total_pulls);
                break;
            }
        }
        assert_eq!(first_up, Some(120));
        assert!(!state.hard_pity_armed);
        assert_eq!(state.rare_count, 2);
        assert_eq!(state.up_count, 1);
        assert!(state.check_invariants());
    }

    #[test]
    fn periodic_bonus_leaves_pity_alone() {
        let v = VariantConfig::endfield_character();
        let mut state = PoolState::new(&v);
        let mut rng = Constant(0.999);
        run_pool(&mut state, &v, 2, CAP, &mut rng).unwrap();
        // organic UP at 120 (hard pity), rares at 80/120/200, bonus at 240
        assert_eq!(state.total_pulls, 240);
        assert_eq!(state.up_count, 1);
        assert_eq!(state.bonus_up_count, 1);
        assert_eq!(state.rare_count, 3);
        assert_eq!(state.pulls_since_up, 120);
        assert_eq!(state.pulls_since_rare, 40);
        assert!(state.check_invariants());
    }

    #[test]
    fn draw_consumes_second_number_only_for_unforced_rares() {
        let v = VariantConfig::wuwa_character();

        // non-rare: one number
        let mut state = PoolState::new(&v);
        let mut rng = Script::new(&[0.5], 0.5);
        roll_one(&mut state, &v, &mut rng);
        assert_eq!(rng.consumed(), 1);

        // rare, coin flip lost: two numbers, guarantee armed
        let mut rng = Script::new(&[0.001, 0.9], 0.5);
        let draw = roll_one(&mut state, &v, &mut rng);
        assert_eq!(draw.outcome, PullOutcome::Rare);
        assert_eq!(rng.consumed(), 2);
        assert!(state.hard_pity_armed);

        // next rare is forced UP: no coin flip
        let mut rng = Script::new(&[0.001], 0.5);
        let draw = roll_one(&mut state, &v, &mut rng);
        assert_eq!(draw.outcome, PullOutcome::RareUp);
        assert_eq!(rng.consumed(), 1);
        assert!(!state.hard_pity_armed);

        // up_rate 1.0 never flips
        let w = VariantConfig::wuwa_weapon();
        let mut state = PoolState::new(&w);
        let mut rng = Script::new(&[0.001], 0.5);
        assert_eq!(roll_one(&mut state, &w, &mut rng).outcome, PullOutcome::RareUp);
        assert_eq!(rng.consumed(), 1);
    }

    #[test]
    fn non_rare_resets_nothing_but_ticks() {
        let v = VariantConfig::wuwa_character();
        let mut state = PoolState::new(&v);
        let mut rng = Constant(0.5);
        for _ in 0..10 {
            assert_eq!(roll_one(&mut state, &v, &mut rng).outcome, PullOutcome::NonRare);
        }
        assert_eq!(state.total_pulls, 10);
        assert_eq!(state.pulls_since_rare, 10);
        assert_eq!(state.pulls_since_up, 10);
        assert_eq!(state.rare_count, 0);
    }

    #[test]
    fn multi_pull_finishes_the_batch() {
        let v = VariantConfig::endfield_weapon();
        let mut state = PoolState::new(&v);
        // third draw rare, coin flip won
        let mut rng = Script::new(&[0.9, 0.9, 0.01, 0.1], 0.9);
        run_pool(&mut state, &v, 1, CAP, &mut rng).unwrap();
        assert_eq!(state.total_pulls, 10);
        assert_eq!(state.up_count, 1);
        assert_eq!(state.pulls_since_up, 7);
    }

    #[test]
    fn recurring_hard_pity_rearms() {
        let v = VariantConfig::endfield_weapon();
        let mut state = PoolState::new(&v);
        let mut rng = Constant(0.999);
        run_pool(&mut state, &v, 2, CAP, &mut rng).unwrap();
        // soft pity rares at 40 and 120 lose the flip; hard pity hits at 80 and 160
        assert_eq!(state.total_pulls, 160);
        assert_eq!(state.up_count, 2);
        assert!(state.hard_pity_armed);
    }

    #[test]
    fn single_pull_trials_hit_target_exactly() {
        let v = VariantConfig::wuwa_character();
        let mut rng = Rng::from_seed(11);
        for _ in 0..500 {
            let mut state = PoolState::new(&v);
            run_pool(&mut state, &v, 3, CAP, &mut rng).unwrap();
            assert_eq!(state.owned_up(), 3);
            assert!(state.check_invariants());
        }
    }

    #[test]
    fn multi_pull_overshoot_is_bounded_by_batch() {
        let v = VariantConfig::endfield_weapon();
        let mut rng = Rng::from_seed(12);
        for _ in 0..500 {
            let mut state = PoolState::new(&v);
            run_pool(&mut state, &v, 2, CAP, &mut rng).unwrap();
            assert!(state.owned_up() >= 2);
            assert!(state.owned_up() - 2 < v.batch_size as u64);
            assert_eq!(state.total_pulls % 10, 0);
        }
    }

    #[test]
    fn pity_free_mean_matches_geometric() {
        let v = pity_free(0.05, 0.5);
        let mut rng = Rng::from_seed(2024);
        let n = 20_000;
        let total: u64 = (0..n)
            .map(|_| single_trial(&v, 1, CAP, &mut rng).unwrap().total())
            .sum();
        let mean = total as f64 / n as f64;
        // expected 1 / (0.05 * 0.5) = 40, standard error ~0.28
        assert!((mean - 40.0).abs() < 1.5, "mean {}", mean);
    }

    #[test]
    fn zero_rate_without_pity_hits_the_cap() {
        let v = pity_free(0.0, 0.5);
        let mut rng = Rng::from_seed(1);
        match single_trial(&v, 1, 1_000, &mut rng) {
            Err(GachaError::NonTerminatingTrial { cap, .. }) => assert_eq!(cap, 1_000),
            other => panic!("expected NonTerminatingTrial, got {:?}", other),
        }
    }

    #[test]
    fn coupled_run_stops_at_the_cap_of_a_stuck_secondary() {
        let primary_variant = VariantConfig::endfield_character();
        let secondary_variant = pity_free(0.0, 0.5);
        let mut primary = PoolState::new(&primary_variant);
        let mut secondary = PoolState::new(&secondary_variant);
        let mut rng = Rng::from_seed(2);
        let res = run_pair(
            &mut primary,
            &primary_variant,
            1,
            &mut secondary,
            &secondary_variant,
            1,
            1_000,
            &mut rng,
        );
        match res {
            Err(GachaError::NonTerminatingTrial { variant, cap }) => {
                assert_eq!(variant, "pity-free");
                assert_eq!(cap, 1_000);
            }
            other => panic!("expected NonTerminatingTrial, got {:?}", other),
        }
        assert_eq!(secondary.total_pulls, 1_000);
        assert!(primary.owned_up() >= 1);
    }

    #[test]
    fn after_loss_never_loses_twice_in_a_row() {
        let v = VariantConfig::wuwa_character();
        let mut state = PoolState::new(&v);
        let mut rng = Rng::from_seed(5);
        let mut last_rare = None;
        for _ in 0..20_000 {
            let outcome = roll_one(&mut state, &v, &mut rng).outcome;
            if outcome.is_rare() {
                if last_rare == Some(PullOutcome::Rare) {
                    assert_eq!(outcome, PullOutcome::RareUp);
                }
                last_rare = Some(outcome);
            }
        }
        assert!(state.rare_count > 100);
    }

    #[test]
    fn near_rare_pity_and_currency_credit() {
        let v = VariantConfig::endfield_character();
        let mut state = PoolState::new(&v);
        let mut rng = Constant(0.5);
        for _ in 0..20 {
            roll_one(&mut state, &v, &mut rng);
        }
        // 0.5 is never near-rare by rate, so pulls 10 and 20 are forced
        assert_eq!(state.near_rare_count, 2);
        assert_eq!(state.currency_earned, 18 * 20 + 2 * 200);
    }

    #[test]
    fn coupled_pools_fund_the_dependent_pool() {
        let character = VariantConfig::endfield_character();
        let weapon = VariantConfig::endfield_weapon();
        let mut rng = Rng::from_seed(77);
        for _ in 0..200 {
            let mut primary = PoolState::new(&character);
            let mut secondary = PoolState::new(&weapon);
            run_pair(&mut primary, &character, 1, &mut secondary, &weapon, 1, CAP, &mut rng).unwrap();
            assert!(primary.owned_up() >= 1);
            assert!(secondary.owned_up() >= 1);
            assert!(primary.currency_earned >= 2000 * primary.rare_count);

            let transferred = primary.currency_earned - primary.secondary_currency;
            let spent = secondary.total_pulls / 10 * 1980;
            assert_eq!(spent, transferred - secondary.secondary_currency + secondary.currency_shortfall);
        }
    }

    #[test]
    fn pair_metric_shapes_the_result() {
        let character = VariantConfig::wuwa_character();
        let weapon = VariantConfig::wuwa_weapon();
        let mut rng = Rng::from_seed(3);
        let combined = pair_trial((&character, 1), (&weapon, 1), CostMetric::Combined, CAP, &mut Rng::from_seed(3)).unwrap();
        let split = pair_trial((&character, 1), (&weapon, 1), CostMetric::PerPool, CAP, &mut rng).unwrap();
        match split {
            SimulationResult::PerPool { primary, secondary } => {
                assert!(primary >= 1 && secondary >= 1);
                assert_eq!(combined, SimulationResult::Pulls(primary + secondary));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rotation_carries_rarity_pity() {
        let v = VariantConfig::wuwa_weapon();
        let mut rng = Constant(0.999);
        // every banner stops at soft pity with nothing carried
        let spent = rotation_trial(&v, 3, CAP, &mut rng).unwrap();
        assert_eq!(spent, vec![79, 79, 79]);

        let ten = v.with_batch_size(10);
        let mut rng = Constant(0.999);
        // batches of 10 overshoot to 80; the leftover pity brings the next UP earlier
        let spent = rotation_trial(&ten, 3, CAP, &mut rng).unwrap();
        assert_eq!(spent, vec![80, 80, 80]);
    }
}
