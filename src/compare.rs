//! Single pulls against ten-pulls on the same banner.
//!
//! A ten-pull cannot stop mid-batch, so on average it spends more per UP.
//! The comparison quantifies that loss with a bootstrap interval.

use crate::config::{Config, VariantConfig};
use crate::driver::SimulationDriver;
use crate::error::GachaResult;
use crate::rng::Rng;
use crate::sim::rotation_trial;
use crate::stats::{self, PercentileMethod, Summary};
use log::info;
use serde::Serialize;

pub const MULTI_PULL_SIZE: u32 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct PoolComparison {
    pub variant: String,
    pub banners: usize,
    pub single: Summary,
    pub multi: Summary,
    /// `mean(multi) - mean(single)`.
    pub absolute_loss: f64,
    pub relative_loss_percent: f64,
    /// Bootstrap percentiles of the absolute loss.
    pub loss_percentiles: Vec<(f64, f64)>,
}

/// Pulls per banner for `banners` banners, grouped into players of
/// `config.banners_per_player` consecutive banners each.
pub fn banner_costs(
    variant: &VariantConfig,
    banners: usize,
    config: &Config,
    driver: &SimulationDriver,
) -> GachaResult<Vec<u64>> {
    let (players, per_player) = rotation_plan(banners, config.banners_per_player);
    let max_draws = config.max_draws_per_trial;
    let runs = driver.run(players, |rng: &mut Rng| rotation_trial(variant, per_player, max_draws, rng))?;
    let mut costs: Vec<u64> = runs.into_iter().flatten().collect();
    costs.truncate(banners);
    Ok(costs)
}

/// `(players, banners per player)`; no player visits more banners than
/// were asked for.
fn rotation_plan(banners: usize, banners_per_player: usize) -> (usize, usize) {
    let per_player = banners_per_player.min(banners).max(1);
    (banners.div_ceil(per_player), per_player)
}

pub fn compare(
    variant: &VariantConfig,
    banners: usize,
    config: &Config,
    driver: &SimulationDriver,
    bootstrap_rng: &mut Rng,
) -> GachaResult<PoolComparison> {
    info!("[Compare] {} banners of '{}': single vs x{}", banners, variant.name, MULTI_PULL_SIZE);

    let single = stats::to_f64(&banner_costs(&variant.with_batch_size(1), banners, config, driver)?);
    let multi = stats::to_f64(&banner_costs(&variant.with_batch_size(MULTI_PULL_SIZE), banners, config, driver)?);

    let single_summary = Summary::from_values(&single, &config.percentiles, PercentileMethod::Linear)?;
    let multi_summary = Summary::from_values(&multi, &config.percentiles, PercentileMethod::Linear)?;

    let absolute_loss = multi_summary.mean - single_summary.mean;
    let relative_loss_percent = absolute_loss / single_summary.mean * 100.0;

    let loss_percentiles = stats::bootstrap_difference(
        &single,
        &multi,
        config.bootstrap_samples,
        &config.percentiles,
        bootstrap_rng,
    )?;

    Ok(PoolComparison {
        variant: variant.name.clone(),
        banners,
        single: single_summary,
        multi: multi_summary,
        absolute_loss,
        relative_loss_percent,
        loss_percentiles,
    })
}
