//! Distribution summaries over trial results.
//!
//! Two percentile conventions coexist: nearest-rank (index
//! `floor(p/100 * (n-1))`, used by the per-pool reports and the bootstrap)
//! and linear interpolation between neighbours (used by pool comparison).

use crate::error::{GachaError, GachaResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PercentileMethod {
    NearestRank,
    Linear,
}

pub fn to_f64(values: &[u64]) -> Vec<f64> {
    values.iter().map(|&v| v as f64).collect()
}

fn require_data(data: &[f64], what: &str) -> GachaResult<()> {
    if data.is_empty() {
        return Err(GachaError::insufficient(format!("{} of an empty result list", what)));
    }
    Ok(())
}

fn sorted(data: &[f64]) -> Vec<f64> {
    let mut v = data.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

pub fn mean(data: &[f64]) -> GachaResult<f64> {
    require_data(data, "mean")?;
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population variance (divides by N).
pub fn variance(data: &[f64]) -> GachaResult<f64> {
    let m = mean(data)?;
    Ok(data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64)
}

pub fn std_dev(data: &[f64]) -> GachaResult<f64> {
    Ok(variance(data)?.sqrt())
}

pub fn median(data: &[f64]) -> GachaResult<f64> {
    require_data(data, "median")?;
    let s = sorted(data);
    let n = s.len();
    Ok(if n % 2 == 0 {
        (s[n / 2 - 1] + s[n / 2]) / 2.0
    } else {
        s[n / 2]
    })
}

fn percentile_index(n: usize, p: f64) -> GachaResult<f64> {
    if !(0.0..=100.0).contains(&p) {
        return Err(GachaError::invalid(format!("percentile {} outside 0..=100", p)));
    }
    if n == 0 {
        return Err(GachaError::insufficient(format!("percentile {} of an empty result list", p)));
    }
    Ok(p / 100.0 * (n - 1) as f64)
}

/// `sorted` must be ascending.
pub fn percentile_sorted(sorted: &[f64], p: f64, method: PercentileMethod) -> GachaResult<f64> {
    let index = percentile_index(sorted.len(), p)?;
    let lower = index.floor() as usize;
    Ok(match method {
        PercentileMethod::NearestRank => sorted[lower],
        PercentileMethod::Linear => {
            let weight = index - lower as f64;
            if weight == 0.0 {
                sorted[lower]
            } else {
                sorted[lower] * (1.0 - weight) + sorted[lower + 1] * weight
            }
        }
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub method: PercentileMethod,
    /// `(p, value)` pairs in request order.
    pub percentiles: Vec<(f64, f64)>,
}

impl Summary {
    pub fn from_values(data: &[f64], percentiles: &[f64], method: PercentileMethod) -> GachaResult<Self> {
        let s = sorted(data);
        let percentiles = percentiles
            .iter()
            .map(|&p| Ok((p, percentile_sorted(&s, p, method)?)))
            .collect::<GachaResult<Vec<_>>>()?;
        Ok(Summary {
            count: s.len(),
            mean: mean(&s)?,
            median: median(&s)?,
            variance: variance(&s)?,
            std_dev: std_dev(&s)?,
            min: s[0],
            max: s[s.len() - 1],
            method,
            percentiles,
        })
    }
}

// --- Histogram ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: u64,
    pub upper: u64,
    pub count: usize,
    pub percent: f64,
    pub cumulative: usize,
    pub cumulative_percent: f64,
}

/// Results sitting exactly on the largest observed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CappedTail {
    pub value: u64,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Histogram {
    pub bin_width: u64,
    pub total: usize,
    pub bins: Vec<HistogramBin>,
    /// Present only when more than 5% of results share the maximum.
    pub capped: Option<CappedTail>,
}

const CAPPED_REPORT_PERCENT: f64 = 5.0;

impl Histogram {
    /// First bin with the largest count.
    pub fn modal_bin(&self) -> Option<&HistogramBin> {
        self.bins
            .iter()
            .fold(None, |best: Option<&HistogramBin>, bin| match best {
                Some(b) if b.count >= bin.count => Some(b),
                _ => Some(bin),
            })
    }
}

/// Bins `[1, w]`, `[w+1, 2w]`, ... up to the maximum result. A zero result
/// (a zero target) lands in the first bin.
pub fn histogram(values: &[u64], bin_width: u64) -> GachaResult<Histogram> {
    if bin_width == 0 {
        return Err(GachaError::invalid("histogram bin width must be positive"));
    }
    let max_value = values
        .iter()
        .copied()
        .max()
        .ok_or_else(|| GachaError::insufficient("histogram of an empty result list"))?;

    let total = values.len();
    let bin_count = (max_value.div_ceil(bin_width)).max(1) as usize;
    let mut counts = vec![0usize; bin_count];
    let mut at_max = 0usize;
    for &v in values {
        let idx = (v.saturating_sub(1) / bin_width) as usize;
        counts[idx.min(bin_count - 1)] += 1;
        if v == max_value {
            at_max += 1;
        }
    }

    let pct = |c: usize| c as f64 * 100.0 / total as f64;
    let mut cumulative = 0usize;
    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            cumulative += count;
            let lower = i as u64 * bin_width + 1;
            HistogramBin {
                lower,
                upper: lower + bin_width - 1,
                count,
                percent: pct(count),
                cumulative,
                cumulative_percent: pct(cumulative),
            }
        })
        .collect();

    let capped = (pct(at_max) > CAPPED_REPORT_PERCENT).then(|| CappedTail {
        value: max_value,
        count: at_max,
        percent: pct(at_max),
    });

    Ok(Histogram { bin_width, total, bins, capped })
}

// --- Bootstrap ---

/// Resamples `a` and `b` with replacement `samples` times and reports
/// nearest-rank percentiles of `mean(b*) - mean(a*)`.
pub fn bootstrap_difference<R: rand::Rng>(
    a: &[f64],
    b: &[f64],
    samples: usize,
    percentiles: &[f64],
    rng: &mut R,
) -> GachaResult<Vec<(f64, f64)>> {
    require_data(a, "bootstrap")?;
    require_data(b, "bootstrap")?;
    if samples == 0 {
        return Err(GachaError::insufficient("bootstrap with zero resamples"));
    }

    let mut resample_mean = |data: &[f64]| -> f64 {
        let n = data.len();
        (0..n).map(|_| data[rng.gen_range(0..n)]).sum::<f64>() / n as f64
    };

    let mut diffs: Vec<f64> = (0..samples)
        .map(|_| {
            let mean_a = resample_mean(a);
            let mean_b = resample_mean(b);
            mean_b - mean_a
        })
        .collect();
    diffs.sort_by(|x, y| x.total_cmp(y));

    percentiles
        .iter()
        .map(|&p| Ok((p, percentile_sorted(&diffs, p, PercentileMethod::NearestRank)?)))
        .collect()
}
