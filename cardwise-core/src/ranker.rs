//! Ranking: evaluate the user's selected cards and order them by expected value.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::card::Card;
use crate::pairing::WrapperPolicy;
use crate::purchase::{CardConfig, CardConfigs, Purchase};
use crate::reward::{evaluate, RewardResult};

/// Ranked results for one purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub results: Vec<RewardResult>,
    /// No selected card earns a bonus for this purchase.
    pub all_base_rate: bool,
}

impl Recommendation {
    pub fn best(&self) -> Option<&RewardResult> {
        self.results.first()
    }
}

/// Sort descending by mid value. Stable, so equal values keep their order.
pub fn rank(results: &mut [RewardResult]) {
    results.sort_by(|a, b| b.value_mid.total_cmp(&a.value_mid));
}

/// Non-empty and no result carries a bonus.
pub fn all_base_rate(results: &[RewardResult]) -> bool {
    !results.is_empty() && results.iter().all(|r| !r.is_bonus)
}

fn config_for<'a>(configs: &'a CardConfigs, card_id: &str) -> &'a CardConfig {
    static EMPTY: CardConfig = CardConfig {
        wrapper: false,
        category: None,
    };
    configs.get(card_id).unwrap_or(&EMPTY)
}

/// Evaluate the selected cards directly, in catalog order, ranked.
/// Ids missing from the catalog are skipped.
pub fn calculate_results<S: AsRef<str>>(
    cards: &[Card],
    selected: &[S],
    purchase: &Purchase,
    configs: &CardConfigs,
) -> Vec<RewardResult> {
    let mut results: Vec<RewardResult> = cards
        .iter()
        .filter(|card| selected.iter().any(|id| id.as_ref() == card.card_id))
        .map(|card| evaluate(card, purchase, config_for(configs, &card.card_id)))
        .collect();
    rank(&mut results);
    results
}

/// Full recommendation: wrapper-enabled cards go through the pairing adapter,
/// the rest are evaluated directly, and everything is ranked together.
pub fn recommend<S: AsRef<str>>(
    cards: &[Card],
    selected: &[S],
    purchase: &Purchase,
    configs: &CardConfigs,
    policy: &WrapperPolicy,
) -> Recommendation {
    let (wrapped, direct): (Vec<&str>, Vec<&str>) = selected
        .iter()
        .map(|id| id.as_ref())
        .partition(|id| policy.applies_to(id, configs));

    let mut results = calculate_results(cards, &direct, purchase, configs);

    let mut seen = HashSet::new();
    for id in wrapped {
        if !seen.insert(id) {
            continue;
        }
        if let Some(card) = cards.iter().find(|c| c.card_id == id) {
            results.push(policy.pair(card, purchase, config_for(configs, id)));
        }
    }

    rank(&mut results);
    let all_base_rate = all_base_rate(&results);
    Recommendation {
        results,
        all_base_rate,
    }
}
