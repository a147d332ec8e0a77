use crate::error::{GachaError, GachaResult};
use crate::schedule;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// --- Variant parameters ---

/// One escalation band: inside `start..=end` pulls since the last rare the
/// rate grows by `increment` per pull, on top of every lower band in full.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscalationBand {
    pub start: u32,
    pub end: u32,
    pub increment: f64,
}

impl EscalationBand {
    pub const fn new(start: u32, end: u32, increment: f64) -> Self {
        EscalationBand { start, end, increment }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardPityMode {
    /// Armed from the start, spent by the first UP and never restored.
    OnceOnly,
    /// Every `hard_pity` pulls without an UP force one.
    Recurring,
    /// A non-UP rare arms a guarantee that the next rare is UP.
    AfterLoss,
}

/// Secondary currency credited per pull, plus the near-rare tier needed to
/// decide which credit applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrencyYield {
    pub rare: u64,
    pub near_rare: u64,
    pub common: u64,
    pub near_rare_rate: f64,
    pub near_rare_pity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Overwritten by the map key when loaded from a config file.
    #[serde(default)]
    pub name: String,
    pub base_rate: f64,
    #[serde(default)]
    pub bands: Vec<EscalationBand>,
    #[serde(default)]
    pub soft_pity: Option<u32>,
    #[serde(default)]
    pub hard_pity: Option<u32>,
    pub hard_pity_mode: HardPityMode,
    pub up_rate: f64,
    #[serde(default)]
    pub periodic_bonus_interval: Option<u32>,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default)]
    pub currency: Option<CurrencyYield>,
    /// Secondary currency paid per batch when this pool is funded by another.
    #[serde(default)]
    pub draw_cost: Option<u64>,
}

fn default_batch_size() -> u32 {
    1
}

const ENDFIELD_CHARACTER: &str = "endfield-character";
const ENDFIELD_WEAPON: &str = "endfield-weapon";
const WUWA_CHARACTER: &str = "wuwa-character";
const WUWA_WEAPON: &str = "wuwa-weapon";

const WUWA_BANDS: [EscalationBand; 3] = [
    EscalationBand::new(66, 70, 0.04),
    EscalationBand::new(71, 75, 0.08),
    EscalationBand::new(76, 79, 0.10),
];

impl VariantConfig {
    /// Arknights: Endfield limited operator banner.
    pub fn endfield_character() -> Self {
        VariantConfig {
            name: ENDFIELD_CHARACTER.to_string(),
            base_rate: 0.008,
            bands: vec![EscalationBand::new(66, 79, 0.05)],
            soft_pity: Some(80),
            hard_pity: Some(120),
            hard_pity_mode: HardPityMode::OnceOnly,
            up_rate: 0.5,
            periodic_bonus_interval: Some(240),
            batch_size: 1,
            currency: Some(CurrencyYield {
                rare: 2000,
                near_rare: 200,
                common: 20,
                near_rare_rate: 0.08,
                near_rare_pity: Some(10),
            }),
            draw_cost: None,
        }
    }

    /// Arknights: Endfield weapon banner, ten-pulls bought with tickets.
    pub fn endfield_weapon() -> Self {
        VariantConfig {
            name: ENDFIELD_WEAPON.to_string(),
            base_rate: 0.04,
            bands: Vec::new(),
            soft_pity: Some(40),
            hard_pity: Some(80),
            hard_pity_mode: HardPityMode::Recurring,
            up_rate: 0.25,
            periodic_bonus_interval: None,
            batch_size: 10,
            currency: None,
            draw_cost: Some(1980),
        }
    }

    /// Wuthering Waves featured resonator banner.
    pub fn wuwa_character() -> Self {
        VariantConfig {
            name: WUWA_CHARACTER.to_string(),
            base_rate: 0.008,
            bands: WUWA_BANDS.to_vec(),
            soft_pity: Some(79),
            hard_pity: None,
            hard_pity_mode: HardPityMode::AfterLoss,
            up_rate: 0.5,
            periodic_bonus_interval: None,
            batch_size: 1,
            currency: None,
            draw_cost: None,
        }
    }

    /// Wuthering Waves featured weapon banner: every 5-star is the UP.
    pub fn wuwa_weapon() -> Self {
        VariantConfig {
            name: WUWA_WEAPON.to_string(),
            up_rate: 1.0,
            ..VariantConfig::wuwa_character()
        }
    }

    pub fn presets() -> Vec<VariantConfig> {
        vec![
            VariantConfig::endfield_character(),
            VariantConfig::endfield_weapon(),
            VariantConfig::wuwa_character(),
            VariantConfig::wuwa_weapon(),
        ]
    }

    pub fn with_batch_size(&self, batch_size: u32) -> Self {
        VariantConfig {
            name: format!("{}@x{}", self.name, batch_size),
            batch_size,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> GachaResult<()> {
        let fail = |what: String| Err(GachaError::invalid(format!("variant '{}': {}", self.name, what)));

        for (label, p) in [("base_rate", self.base_rate), ("up_rate", self.up_rate)] {
            if !is_probability(p) {
                return fail(format!("{} = {} is not a probability", label, p));
            }
        }

        let mut previous_end = 0u32;
        for band in &self.bands {
            if band.start == 0 || band.start > band.end {
                return fail(format!("band {}-{} is malformed", band.start, band.end));
            }
            if band.start <= previous_end {
                return fail(format!("band {}-{} overlaps or is out of order", band.start, band.end));
            }
            if !is_probability(band.increment) {
                return fail(format!("band {}-{} increment {} is not a probability", band.start, band.end, band.increment));
            }
            previous_end = band.end;
        }

        for (label, threshold) in [
            ("soft_pity", self.soft_pity),
            ("hard_pity", self.hard_pity),
            ("periodic_bonus_interval", self.periodic_bonus_interval),
        ] {
            if threshold == Some(0) {
                return fail(format!("{} must be positive", label));
            }
        }

        if self.batch_size == 0 {
            return fail("batch_size must be positive".to_string());
        }

        // soft pity overrides whatever the bands reach at its threshold
        let last_band_end = self.bands.last().map_or(0, |b| b.end);
        let last_escalated = match self.soft_pity {
            Some(soft) => (soft - 1).min(last_band_end),
            None => last_band_end,
        };
        if let Some(p) = (1..=last_escalated).find(|&p| schedule::escalated_rate(self, p) > 1.0 + RATE_EPSILON) {
            return fail(format!(
                "rate reaches {:.4} at {} pulls since the last rare",
                schedule::escalated_rate(self, p),
                p
            ));
        }

        if self.hard_pity_mode == HardPityMode::AfterLoss && self.hard_pity.is_some() {
            return fail("after_loss guarantees the next rare; hard_pity is not used with it".to_string());
        }

        if let Some(currency) = &self.currency {
            if !is_probability(currency.near_rare_rate) {
                return fail(format!("near_rare_rate = {} is not a probability", currency.near_rare_rate));
            }
            if self.base_rate + currency.near_rare_rate > 1.0 {
                return fail("base_rate + near_rare_rate exceeds 1".to_string());
            }
            if currency.near_rare_pity == Some(0) {
                return fail("near_rare_pity must be positive".to_string());
            }
        }

        debug!("variant '{}' validated", self.name);
        Ok(())
    }
}

const RATE_EPSILON: f64 = 1e-9;

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

// --- Run configuration ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulations: usize,
    pub targets: Vec<u32>,
    pub percentiles: Vec<f64>,
    pub bin_width: u32,
    pub bootstrap_samples: usize,
    pub banners_per_player: usize,
    pub max_draws_per_trial: u64,
    pub worker_max_threads: usize,
    pub worker_reserve_cores: usize,
    pub language: Option<String>,
    pub variants: BTreeMap<String, VariantConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            simulations: 100_000,
            targets: vec![1],
            percentiles: vec![10.0, 25.0, 50.0, 75.0, 90.0],
            bin_width: 10,
            bootstrap_samples: 1000,
            banners_per_player: 1000,
            max_draws_per_trial: 1_000_000,
            worker_max_threads: 4,
            worker_reserve_cores: 1,
            language: None,
            variants: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Reads `path` (falling back to `../../path`, the usual spot when run
    /// from `target/release`). A missing file yields the defaults.
    pub fn load(path: &str) -> GachaResult<Self> {
        let alt = format!("../../{}", path);
        let found = [path, alt.as_str()].into_iter().find(|p| Path::new(p).is_file());

        let config = match found {
            Some(p) => {
                info!("[Config] Loading {}", p);
                let contents = fs::read_to_string(p)?;
                Config::from_json(&contents)?
            }
            None => {
                warn!("[Config] {} not found, using built-in defaults", path);
                Config::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(contents: &str) -> GachaResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Looks a variant up by name; file entries shadow the built-in presets.
    pub fn variant(&self, name: &str) -> GachaResult<VariantConfig> {
        if let Some(v) = self.variants.get(name) {
            let mut v = v.clone();
            v.name = name.to_string();
            return Ok(v);
        }
        VariantConfig::presets()
            .into_iter()
            .find(|v| v.name == name)
            .ok_or_else(|| GachaError::invalid(format!("unknown variant '{}' (known: {})", name, self.variant_names().join(", "))))
    }

    pub fn variant_names(&self) -> Vec<String> {
        let mut names: Vec<String> = VariantConfig::presets().into_iter().map(|v| v.name).collect();
        for name in self.variants.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    pub fn validate(&self) -> GachaResult<()> {
        if self.simulations == 0 {
            return Err(GachaError::invalid("simulations must be positive"));
        }
        if self.bin_width == 0 {
            return Err(GachaError::invalid("bin_width must be positive"));
        }
        if self.worker_max_threads == 0 {
            return Err(GachaError::invalid("worker_max_threads must be positive"));
        }
        if self.max_draws_per_trial == 0 {
            return Err(GachaError::invalid("max_draws_per_trial must be positive"));
        }
        if self.banners_per_player == 0 {
            return Err(GachaError::invalid("banners_per_player must be positive"));
        }
        if let Some(p) = self.percentiles.iter().find(|p| !(0.0..=100.0).contains(*p)) {
            return Err(GachaError::invalid(format!("percentile {} outside 0..=100", p)));
        }
        for name in self.variant_names() {
            self.variant(&name)?.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for v in VariantConfig::presets() {
            v.validate().unwrap();
        }
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_probability_out_of_range() {
        let mut v = VariantConfig::wuwa_character();
        v.up_rate = 1.5;
        assert!(matches!(v.validate(), Err(GachaError::InvalidConfiguration(_))));

        let mut v = VariantConfig::wuwa_character();
        v.base_rate = -0.1;
        assert!(v.validate().is_err());
    }

    #[test]
    fn rejects_malformed_bands() {
        let mut v = VariantConfig::wuwa_character();
        v.bands = vec![EscalationBand::new(70, 66, 0.04)];
        assert!(v.validate().is_err());

        v.bands = vec![EscalationBand::new(66, 72, 0.04), EscalationBand::new(71, 75, 0.08)];
        assert!(v.validate().is_err());

        v.bands = vec![EscalationBand::new(0, 5, 0.04)];
        assert!(v.validate().is_err());
    }

    #[test]
    fn rejects_hard_pity_on_after_loss() {
        let mut v = VariantConfig::wuwa_character();
        v.base_rate = 0.0;
        v.bands.clear();
        v.soft_pity = None;
        v.hard_pity = Some(10);
        assert!(matches!(v.validate(), Err(GachaError::InvalidConfiguration(_))));

        let json = r#"{ "variants": { "broken": {
            "base_rate": 0.01, "hard_pity": 90, "hard_pity_mode": "after_loss", "up_rate": 0.5
        } } }"#;
        assert!(Config::from_json(json).unwrap().validate().is_err());
    }

    #[test]
    fn rejects_rates_escalating_past_one() {
        let mut v = VariantConfig::wuwa_character();
        v.base_rate = 0.5;
        v.bands = vec![EscalationBand::new(1, 10, 0.2)];
        v.soft_pity = None;
        assert!(v.validate().is_err());

        // the same bands are fine when soft pity lands before the overflow
        v.soft_pity = Some(3);
        v.validate().unwrap();
    }

    #[test]
    fn rejects_near_rare_rate_overflowing_base() {
        let mut v = VariantConfig::endfield_character();
        if let Some(c) = v.currency.as_mut() {
            c.near_rare_rate = 0.995;
        }
        assert!(v.validate().is_err());
    }

    #[test]
    fn file_variants_shadow_presets() {
        let json = r#"{
            "simulations": 500,
            "variants": {
                "wuwa-weapon": {
                    "name": "ignored",
                    "base_rate": 0.1,
                    "hard_pity_mode": "after_loss",
                    "up_rate": 1.0
                },
                "flat": {
                    "name": "flat",
                    "base_rate": 0.02,
                    "hard_pity_mode": "recurring",
                    "hard_pity": 60,
                    "up_rate": 0.5,
                    "batch_size": 10
                }
            }
        }"#;
        let config = Config::from_json(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.simulations, 500);
        assert_eq!(config.bin_width, 10);

        let weapon = config.variant("wuwa-weapon").unwrap();
        assert_eq!(weapon.name, "wuwa-weapon");
        assert_eq!(weapon.base_rate, 0.1);
        assert!(weapon.bands.is_empty());

        let flat = config.variant("flat").unwrap();
        assert_eq!(flat.batch_size, 10);
        assert!(config.variant_names().contains(&"flat".to_string()));
        assert!(config.variant("nope").is_err());
    }

    #[test]
    fn rejects_bad_percentiles() {
        let config = Config { percentiles: vec![50.0, 101.0], ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bundled_config_loads() {
        let config = Config::load("data/config.json").unwrap();
        assert_eq!(config.targets, vec![1, 2, 3]);
        let v = config.variant("endfield-character-x10").unwrap();
        assert_eq!(v.batch_size, 10);
        assert_eq!(v.name, "endfield-character-x10");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load("definitely/not/here.json").unwrap();
        assert_eq!(config.simulations, Config::default().simulations);
    }
}
