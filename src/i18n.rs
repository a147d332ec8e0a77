use colored::*;
use crate::config::Config;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Language {
    En,
    Cn,
}

impl Language {
    pub fn from_config(config: &Config) -> Self {
        if let Some(lang_str) = &config.language {
            let lower = lang_str.to_lowercase();
            if lower.contains("cn") || lower.contains("zh") {
                return Language::Cn;
            } else if lower.contains("en") {
                return Language::En;
            }
        }
        Self::from_env()
    }

    pub fn from_env() -> Self {
        if let Ok(lang) = std::env::var("LANG") {
            let lower = lang.to_lowercase();
            if lower.contains("cn") || lower.contains("zh") {
                return Language::Cn;
            }
        }
        Language::En
    }
}

pub struct I18n;

impl I18n {
    pub fn get(lang: Language, key: &str) -> String {
        match (lang, key) {
            // === Pool report ===
            (Language::En, "pool_header") => "=== Pulls to reach target ===".purple().bold().to_string(),
            (Language::Cn, "pool_header") => "=== 达成目标所需抽数 ===".purple().bold().to_string(),

            (Language::En, "mix_header") => "=== Coupled pools ===".purple().bold().to_string(),
            (Language::Cn, "mix_header") => "=== 联动卡池 ===".purple().bold().to_string(),

            (Language::En, "lbl_variant") => "Variant".to_string(),
            (Language::Cn, "lbl_variant") => "卡池".to_string(),

            (Language::En, "lbl_target") => "Target UP".to_string(),
            (Language::Cn, "lbl_target") => "目标 UP 数".to_string(),

            (Language::En, "lbl_trials") => "Trials".to_string(),
            (Language::Cn, "lbl_trials") => "模拟次数".to_string(),

            (Language::En, "lbl_mean") => "Mean".to_string(),
            (Language::Cn, "lbl_mean") => "均值".to_string(),

            (Language::En, "lbl_median") => "Median".to_string(),
            (Language::Cn, "lbl_median") => "中位数".to_string(),

            (Language::En, "lbl_variance") => "Variance".to_string(),
            (Language::Cn, "lbl_variance") => "方差".to_string(),

            (Language::En, "lbl_std_dev") => "Std Dev".to_string(),
            (Language::Cn, "lbl_std_dev") => "标准差".to_string(),

            (Language::En, "lbl_range") => "Min / Max".to_string(),
            (Language::Cn, "lbl_range") => "最小 / 最大".to_string(),

            (Language::En, "lbl_percentiles") => "Percentiles".to_string(),
            (Language::Cn, "lbl_percentiles") => "分位数".to_string(),

            (Language::En, "lbl_primary") => "Primary".to_string(),
            (Language::Cn, "lbl_primary") => "主池".to_string(),

            (Language::En, "lbl_secondary") => "Secondary".to_string(),
            (Language::Cn, "lbl_secondary") => "副池".to_string(),

            (Language::En, "lbl_combined") => "Combined".to_string(),
            (Language::Cn, "lbl_combined") => "合计".to_string(),

            // === Histogram ===
            (Language::En, "hist_header") => "Distribution".cyan().bold().to_string(),
            (Language::Cn, "hist_header") => "分布".cyan().bold().to_string(),

            (Language::En, "hist_range") => "Pulls".to_string(),
            (Language::Cn, "hist_range") => "抽数".to_string(),

            (Language::En, "hist_count") => "Count".to_string(),
            (Language::Cn, "hist_count") => "次数".to_string(),

            (Language::En, "hist_cumulative") => "Cum %".to_string(),
            (Language::Cn, "hist_cumulative") => "累计 %".to_string(),

            (Language::En, "capped_tail") => "Capped at pity".yellow().to_string(),
            (Language::Cn, "capped_tail") => "保底触顶".yellow().to_string(),

            (Language::En, "modal_bin") => "Most common range".to_string(),
            (Language::Cn, "modal_bin") => "最常见区间".to_string(),

            // === Comparison ===
            (Language::En, "compare_header") => "=== Single pull vs ten-pull ===".purple().bold().to_string(),
            (Language::Cn, "compare_header") => "=== 单抽 vs 十连 ===".purple().bold().to_string(),

            (Language::En, "lbl_banners") => "Banners".to_string(),
            (Language::Cn, "lbl_banners") => "卡池轮数".to_string(),

            (Language::En, "lbl_single") => "Single pull".to_string(),
            (Language::Cn, "lbl_single") => "单抽".to_string(),

            (Language::En, "lbl_multi") => "Ten-pull".to_string(),
            (Language::Cn, "lbl_multi") => "十连".to_string(),

            (Language::En, "lbl_abs_loss") => "Extra pulls per UP".to_string(),
            (Language::Cn, "lbl_abs_loss") => "每个 UP 多花抽数".to_string(),

            (Language::En, "lbl_rel_loss") => "Relative loss".to_string(),
            (Language::Cn, "lbl_rel_loss") => "相对损失".to_string(),

            (Language::En, "lbl_bootstrap") => "Bootstrap loss percentiles".to_string(),
            (Language::Cn, "lbl_bootstrap") => "自助法损失分位数".to_string(),

            // === Variant info ===
            (Language::En, "info_header") => "=== Variant parameters ===".purple().bold().to_string(),
            (Language::Cn, "info_header") => "=== 卡池参数 ===".purple().bold().to_string(),

            (Language::En, "lbl_base_rate") => "Base rate".to_string(),
            (Language::Cn, "lbl_base_rate") => "基础概率".to_string(),

            (Language::En, "lbl_bands") => "Escalation".to_string(),
            (Language::Cn, "lbl_bands") => "概率递增".to_string(),

            (Language::En, "lbl_soft_pity") => "Soft pity".to_string(),
            (Language::Cn, "lbl_soft_pity") => "软保底".to_string(),

            (Language::En, "lbl_hard_pity") => "Hard pity".to_string(),
            (Language::Cn, "lbl_hard_pity") => "硬保底".to_string(),

            (Language::En, "lbl_up_rate") => "UP rate".to_string(),
            (Language::Cn, "lbl_up_rate") => "UP 概率".to_string(),

            (Language::En, "lbl_bonus") => "Free UP every".to_string(),
            (Language::Cn, "lbl_bonus") => "赠送 UP 间隔".to_string(),

            (Language::En, "lbl_batch") => "Pulls per step".to_string(),
            (Language::Cn, "lbl_batch") => "每步抽数".to_string(),

            (Language::En, "lbl_currency") => "Tickets (rare/near/common)".to_string(),
            (Language::Cn, "lbl_currency") => "兑换券 (稀有/次稀有/普通)".to_string(),

            (Language::En, "lbl_draw_cost") => "Ticket cost per step".to_string(),
            (Language::Cn, "lbl_draw_cost") => "每步消耗兑换券".to_string(),

            (Language::En, "lbl_expected") => "Expected pulls per rare".to_string(),
            (Language::Cn, "lbl_expected") => "每个稀有期望抽数".to_string(),

            (Language::En, "lbl_none") => "none".dimmed().to_string(),
            (Language::Cn, "lbl_none") => "无".dimmed().to_string(),

            (Language::En, "lbl_unbounded") => "unbounded".red().to_string(),
            (Language::Cn, "lbl_unbounded") => "无上限".red().to_string(),

            // Default fallback
            (_, k) => k.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_language_wins_over_env() {
        let config = Config { language: Some("zh_CN".to_string()), ..Config::default() };
        assert_eq!(Language::from_config(&config), Language::Cn);
        let config = Config { language: Some("EN".to_string()), ..Config::default() };
        assert_eq!(Language::from_config(&config), Language::En);
    }

    #[test]
    fn unknown_keys_echo_back() {
        assert_eq!(I18n::get(Language::En, "no_such_key"), "no_such_key");
        assert_eq!(I18n::get(Language::Cn, "lbl_mean"), "均值");
    }
}
