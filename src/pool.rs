use crate::config::{HardPityMode, VariantConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    NonRare,
    Rare,
    RareUp,
}

impl PullOutcome {
    pub fn is_rare(self) -> bool {
        !matches!(self, PullOutcome::NonRare)
    }

    pub fn is_up(self) -> bool {
        matches!(self, PullOutcome::RareUp)
    }
}

/// Counters for one pool of one simulated player. Created per trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub total_pulls: u64,
    pub pulls_since_rare: u32,
    pub pulls_since_up: u32,
    pub pulls_since_near_rare: u32,
    pub rare_count: u64,
    pub up_count: u64,
    pub bonus_up_count: u64,
    pub near_rare_count: u64,
    pub hard_pity_armed: bool,
    pub secondary_currency: u64,
    pub currency_earned: u64,
    pub currency_shortfall: u64,
}

impl PoolState {
    pub fn new(variant: &VariantConfig) -> Self {
        PoolState {
            total_pulls: 0,
            pulls_since_rare: 0,
            pulls_since_up: 0,
            pulls_since_near_rare: 0,
            rare_count: 0,
            up_count: 0,
            bonus_up_count: 0,
            near_rare_count: 0,
            hard_pity_armed: variant.hard_pity_mode != HardPityMode::AfterLoss,
            secondary_currency: 0,
            currency_earned: 0,
            currency_shortfall: 0,
        }
    }

    /// Fresh state for the next banner of the same player: only the
    /// rarity pity carries over.
    pub fn carry_over(&self, variant: &VariantConfig) -> Self {
        PoolState {
            pulls_since_rare: self.pulls_since_rare,
            pulls_since_near_rare: self.pulls_since_near_rare,
            ..PoolState::new(variant)
        }
    }

    /// UP items owned, including periodic bonuses.
    pub fn owned_up(&self) -> u64 {
        self.up_count + self.bonus_up_count
    }

    pub fn credit_currency(&mut self, amount: u64) {
        self.secondary_currency += amount;
        self.currency_earned += amount;
    }

    /// Moves this pool's whole currency balance into `other`.
    pub fn transfer_currency_to(&mut self, other: &mut PoolState) {
        other.secondary_currency += self.secondary_currency;
        self.secondary_currency = 0;
    }

    /// Pays `cost`; a missing balance is recorded rather than refused.
    pub fn spend_currency(&mut self, cost: u64) {
        if self.secondary_currency >= cost {
            self.secondary_currency -= cost;
        } else {
            self.currency_shortfall += cost - self.secondary_currency;
            self.secondary_currency = 0;
        }
    }

    #[cfg(test)]
    pub fn check_invariants(&self) -> bool {
        self.pulls_since_rare as u64 <= self.total_pulls
            && self.rare_count <= self.total_pulls
            && self.up_count <= self.rare_count
    }
}
