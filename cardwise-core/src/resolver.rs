//! Rule resolution: pick the single best bonus rule a card offers for a purchase.
//!
//! A rule is eligible when its promo window covers the evaluation time, its
//! channel set contains the purchase channel, no blacklist vetoes the category,
//! and it matches either by merchant name (when it carries a merchant whitelist)
//! or by category. Among eligible rules the highest rate wins; the first rule to
//! reach that rate keeps it.

use tracing::{debug, trace};

use crate::card::{mcc_in_ranges, Card, Mcc, PromoPeriod, Rule};
use crate::purchase::{CardConfig, Purchase};

/// Outcome of resolving one card against one purchase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<'a> {
    /// `None` means the card earns its base rate.
    pub rule: Option<&'a Rule>,
    /// The winning rule matched through its merchant whitelist.
    pub is_merchant_specific: bool,
}

impl<'a> Resolution<'a> {
    pub fn base_rate() -> Self {
        Self {
            rule: None,
            is_merchant_specific: false,
        }
    }

    pub fn is_bonus(&self) -> bool {
        self.rule.is_some()
    }
}

pub fn promo_active(promo: Option<&PromoPeriod>, purchase: &Purchase) -> bool {
    promo.is_none_or(|p| p.contains(purchase.at))
}

fn normalize_merchant(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case- and space-insensitive containment in either direction.
pub fn merchant_matches(merchant: Option<&str>, whitelist: &[String]) -> bool {
    let Some(merchant) = merchant.map(normalize_merchant) else {
        return false;
    };
    if merchant.is_empty() {
        return false;
    }
    whitelist.iter().any(|entry| {
        let entry = normalize_merchant(entry);
        merchant.contains(&entry) || entry.contains(&merchant)
    })
}

pub fn mcc_blacklisted(mcc: Mcc, rule: &Rule, card: &Card) -> bool {
    rule.conditions.mcc_blacklist.contains(&mcc)
        || card.is_globally_blacklisted(mcc)
        || (rule.conditions.excludes_travel && card.is_travel(mcc))
}

pub fn mcc_whitelisted(mcc: Mcc, rule: &Rule, card: &Card, config: &CardConfig) -> bool {
    let cond = &rule.conditions;
    if cond.matches_all_categories() {
        return true;
    }

    if cond.uses_configurable_category {
        if let Some(configurable) = &card.configurable_category {
            return configurable
                .selected(config.category.as_deref())
                .is_some_and(|option| option.mcc_whitelist.contains(&mcc));
        }
    }

    cond.mcc_whitelist.contains(&mcc) || mcc_in_ranges(mcc, &cond.mcc_whitelist_ranges)
}

/// Whether `rule` applies to the purchase, and if so whether it matched by merchant.
fn rule_match(rule: &Rule, card: &Card, purchase: &Purchase, config: &CardConfig) -> Option<bool> {
    if !promo_active(rule.promo_period.as_ref(), purchase) {
        trace!(card = %card.card_id, rule = %rule.description, "outside promo period");
        return None;
    }
    if !rule.conditions.channels.contains(&purchase.channel) {
        return None;
    }
    if mcc_blacklisted(purchase.mcc, rule, card) {
        trace!(card = %card.card_id, rule = %rule.description, mcc = purchase.mcc, "blacklisted");
        return None;
    }

    match rule.conditions.merchant_whitelist() {
        Some(whitelist) => merchant_matches(purchase.merchant.as_deref(), whitelist).then_some(true),
        None => mcc_whitelisted(purchase.mcc, rule, card, config).then_some(false),
    }
}

/// Select the best-matching bonus rule on `card` for `purchase`.
pub fn resolve<'a>(card: &'a Card, purchase: &Purchase, config: &CardConfig) -> Resolution<'a> {
    let mut best: Option<(&'a Rule, bool)> = None;

    for rule in &card.rules {
        let Some(by_merchant) = rule_match(rule, card, purchase, config) else {
            continue;
        };
        if best.is_none_or(|(current, _)| rule.rate > current.rate) {
            best = Some((rule, by_merchant));
        }
    }

    match best {
        Some((rule, is_merchant_specific)) => {
            debug!(
                card = %card.card_id,
                rule = %rule.description,
                rate = rule.rate,
                is_merchant_specific,
                "bonus rule selected"
            );
            Resolution {
                rule: Some(rule),
                is_merchant_specific,
            }
        }
        None => {
            debug!(card = %card.card_id, mcc = purchase.mcc, channel = %purchase.channel, "no bonus rule, base rate");
            Resolution::base_rate()
        }
    }
}
