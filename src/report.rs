//! Console rendering. Every function returns the finished text so `main`
//! decides where it goes.

use crate::compare::PoolComparison;
use crate::config::{HardPityMode, VariantConfig};
use crate::i18n::{I18n, Language};
use crate::schedule;
use crate::stats::{Histogram, Summary};
use colored::*;

const BAR_CHAR: &str = "█";

fn push_line(out: &mut String, text: impl AsRef<str>) {
    out.push_str(text.as_ref());
    out.push('\n');
}

fn label(lang: Language, key: &str) -> String {
    format!("{:<28}", I18n::get(lang, key))
}

fn format_percentiles(pairs: &[(f64, f64)]) -> String {
    pairs
        .iter()
        .map(|(p, v)| format!("P{}={:.1}", p, v))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn render_summary(summary: &Summary, lang: Language) -> String {
    let mut out = String::new();
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_trials"), summary.count));
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_mean"), format!("{:.2}", summary.mean).green().bold()));
    push_line(&mut out, format!("  {}: {:.1}", label(lang, "lbl_median"), summary.median));
    push_line(&mut out, format!("  {}: {:.2}", label(lang, "lbl_variance"), summary.variance));
    push_line(&mut out, format!("  {}: {:.2}", label(lang, "lbl_std_dev"), summary.std_dev));
    push_line(&mut out, format!("  {}: {} / {}", label(lang, "lbl_range"), summary.min, summary.max));
    if !summary.percentiles.is_empty() {
        push_line(
            &mut out,
            format!("  {}: {}", label(lang, "lbl_percentiles"), format_percentiles(&summary.percentiles)),
        );
    }
    out
}

/// One row per bin: range, count, cumulative share and a bar of one block
/// per percent.
pub fn render_histogram(hist: &Histogram, lang: Language) -> String {
    let mut out = String::new();
    push_line(&mut out, I18n::get(lang, "hist_header"));
    push_line(
        &mut out,
        format!(
            "  {:>11} {:>9} {:>8}",
            I18n::get(lang, "hist_range"),
            I18n::get(lang, "hist_count"),
            I18n::get(lang, "hist_cumulative")
        ),
    );
    for bin in &hist.bins {
        let bar = BAR_CHAR.repeat(bin.percent.round() as usize);
        push_line(
            &mut out,
            format!(
                "  {:>5}-{:<5} {:>9} {:>7.2}% {}",
                bin.lower,
                bin.upper,
                bin.count,
                bin.cumulative_percent,
                bar.blue()
            ),
        );
    }
    if let Some(capped) = &hist.capped {
        push_line(
            &mut out,
            format!(
                "  {}: {} -> {} ({:.2}%)",
                I18n::get(lang, "capped_tail"),
                capped.value,
                capped.count,
                capped.percent
            ),
        );
    }
    if let Some(modal) = hist.modal_bin() {
        push_line(
            &mut out,
            format!(
                "  {}: {}-{} ({:.2}%)",
                I18n::get(lang, "modal_bin"),
                modal.lower,
                modal.upper,
                modal.percent
            ),
        );
    }
    out
}

pub fn render_pool_report(variant: &str, target: u64, summary: &Summary, hist: &Histogram, lang: Language) -> String {
    let mut out = String::new();
    push_line(&mut out, I18n::get(lang, "pool_header"));
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_variant"), variant.cyan()));
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_target"), target));
    out.push_str(&render_summary(summary, lang));
    out.push_str(&render_histogram(hist, lang));
    out
}

/// `sections` are labelled summaries (per pool and/or combined); the
/// histogram is always over the combined cost.
pub fn render_mix_report(
    primary: &str,
    secondary: &str,
    sections: &[(String, Summary)],
    combined: &Histogram,
    lang: Language,
) -> String {
    let mut out = String::new();
    push_line(&mut out, I18n::get(lang, "mix_header"));
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_primary"), primary.cyan()));
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_secondary"), secondary.cyan()));
    for (title, summary) in sections {
        push_line(&mut out, format!("[{}]", title).bold().to_string());
        out.push_str(&render_summary(summary, lang));
    }
    out.push_str(&render_histogram(combined, lang));
    out
}

pub fn render_comparison(cmp: &PoolComparison, lang: Language) -> String {
    let mut out = String::new();
    push_line(&mut out, I18n::get(lang, "compare_header"));
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_variant"), cmp.variant.cyan()));
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_banners"), cmp.banners));
    push_line(&mut out, format!("[{}]", I18n::get(lang, "lbl_single")).bold().to_string());
    out.push_str(&render_summary(&cmp.single, lang));
    push_line(&mut out, format!("[{}]", I18n::get(lang, "lbl_multi")).bold().to_string());
    out.push_str(&render_summary(&cmp.multi, lang));

    let loss = format!("{:+.2}", cmp.absolute_loss);
    let loss = if cmp.absolute_loss > 0.0 { loss.red() } else { loss.green() };
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_abs_loss"), loss));
    push_line(&mut out, format!("  {}: {:+.2}%", label(lang, "lbl_rel_loss"), cmp.relative_loss_percent));
    push_line(
        &mut out,
        format!("  {}: {}", label(lang, "lbl_bootstrap"), format_percentiles(&cmp.loss_percentiles)),
    );
    out
}

fn optional<T: std::fmt::Display>(value: Option<T>, lang: Language) -> String {
    value.map_or_else(|| I18n::get(lang, "lbl_none"), |v| v.to_string())
}

pub fn render_variant_info(variant: &VariantConfig, lang: Language) -> String {
    let mut out = String::new();
    push_line(&mut out, format!("{}", variant.name.cyan().bold()));
    push_line(&mut out, format!("  {}: {:.2}%", label(lang, "lbl_base_rate"), variant.base_rate * 100.0));

    let bands = if variant.bands.is_empty() {
        I18n::get(lang, "lbl_none")
    } else {
        variant
            .bands
            .iter()
            .map(|b| format!("{}-{} +{:.0}%", b.start, b.end, b.increment * 100.0))
            .collect::<Vec<_>>()
            .join(", ")
    };
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_bands"), bands));
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_soft_pity"), optional(variant.soft_pity, lang)));

    let hard = match (variant.hard_pity_mode, variant.hard_pity) {
        (HardPityMode::AfterLoss, _) => "after_loss".to_string(),
        (mode, Some(n)) => format!("{} ({:?})", n, mode),
        (_, None) => I18n::get(lang, "lbl_none"),
    };
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_hard_pity"), hard));
    push_line(&mut out, format!("  {}: {:.0}%", label(lang, "lbl_up_rate"), variant.up_rate * 100.0));
    push_line(
        &mut out,
        format!("  {}: {}", label(lang, "lbl_bonus"), optional(variant.periodic_bonus_interval, lang)),
    );
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_batch"), variant.batch_size));
    let currency = variant
        .currency
        .map(|c| format!("{}/{}/{}", c.rare, c.near_rare, c.common));
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_currency"), optional(currency, lang)));
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_draw_cost"), optional(variant.draw_cost, lang)));

    let expected = match schedule::expected_pulls_per_rare(variant) {
        Some(e) => format!("{:.2}", e).green().to_string(),
        None => I18n::get(lang, "lbl_unbounded"),
    };
    push_line(&mut out, format!("  {}: {}", label(lang, "lbl_expected"), expected));
    out
}
