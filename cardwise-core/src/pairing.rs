//! Payment-wrapper pairing.
//!
//! A wrapper is a virtual card held in a wallet that passes the charge through
//! to the paired card as an online transaction. It can unlock an online bonus
//! for a purchase made offline, at a per-transaction fee.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::card::Card;
use crate::purchase::{CardConfig, CardConfigs, Channel, Purchase};
use crate::reward::{evaluate, RewardResult, WrapperApplied};

pub const WRAPPER_FEE_RATE: f64 = 0.01;
pub const WRAPPER_MIN_FEE: f64 = 0.50;
pub const DEFAULT_WRAPPER_CARDS: &[&str] = &["ocbc_rewards", "citi_rewards"];

/// Which cards may be paired with the wrapper, and what it charges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapperPolicy {
    pub compatible_cards: Vec<String>,
    pub fee_rate: f64,
    pub min_fee: f64,
}

impl Default for WrapperPolicy {
    fn default() -> Self {
        Self {
            compatible_cards: DEFAULT_WRAPPER_CARDS.iter().map(|s| s.to_string()).collect(),
            fee_rate: WRAPPER_FEE_RATE,
            min_fee: WRAPPER_MIN_FEE,
        }
    }
}

impl WrapperPolicy {
    /// `max(min_fee, amount * fee_rate)`
    pub fn fee(&self, amount: f64) -> f64 {
        self.min_fee.max(amount * self.fee_rate)
    }

    pub fn is_compatible(&self, card_id: &str) -> bool {
        self.compatible_cards.iter().any(|id| id == card_id)
    }

    /// Compatible and switched on by the user.
    pub fn applies_to(&self, card_id: &str, configs: &CardConfigs) -> bool {
        self.is_compatible(card_id) && configs.get(card_id).is_some_and(|c| c.wrapper)
    }

    /// Evaluate `card` both directly and through the wrapper, keeping whichever
    /// is better. The fee is charged only when the wrapper unlocks a bonus the
    /// direct path lacks, or a strictly higher rate.
    pub fn pair(&self, card: &Card, purchase: &Purchase, config: &CardConfig) -> RewardResult {
        let mut original = evaluate(card, purchase, config);
        let mut wrapped = evaluate(card, &purchase.via(Channel::Online), config);

        let helps = wrapped.is_bonus && (!original.is_bonus || wrapped.rate > original.rate);
        if helps {
            let fee = self.fee(purchase.amount);
            debug!(card = %card.card_id, fee, rate = wrapped.rate, "wrapper unlocks better rate");
            wrapped.charge_wrapper_fee(fee);
            wrapped
        } else {
            original.wrapper = Some(WrapperApplied { fee: 0.0 });
            original
        }
    }
}
