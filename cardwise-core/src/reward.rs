//! Reward valuation: turn a resolved rate into points, miles or cashback and a
//! low/mid/high estimate of its cash value.

use serde::{Deserialize, Serialize};

use crate::card::{Card, CapType, PromoPeriod, Rule};
use crate::purchase::{CardConfig, Purchase};
use crate::resolver::{resolve, Resolution};

/// Cents per mile used to value miles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MileValuation {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

pub const MILE_VALUATIONS: MileValuation = MileValuation {
    low: 1.1,
    mid: 1.5,
    high: 2.0,
};

pub const BASE_RATE_LABEL: &str = "Base rate";

/// Fee charged for routing the purchase through the payment wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WrapperApplied {
    pub fee: f64,
}

impl WrapperApplied {
    pub fn is_charged(&self) -> bool {
        self.fee > 0.0
    }
}

/// Valued reward of one card for one purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardResult {
    pub card_id: String,
    pub card_name: String,
    pub bank: String,
    pub color: Option<String>,
    pub image: Option<String>,
    pub currency: String,

    pub rule: Option<Rule>,
    pub rule_name: String,
    pub is_bonus: bool,
    pub is_merchant_specific: bool,
    pub merchant_whitelist: Option<Vec<String>>,

    pub rate: f64,
    pub points: f64,
    pub miles: f64,
    /// Miles per currency unit spent.
    pub mpd: f64,
    pub cashback: f64,

    pub value_low: f64,
    pub value_mid: f64,
    pub value_high: f64,

    pub cap: Option<f64>,
    pub cap_type: Option<CapType>,
    pub promo: Option<PromoPeriod>,
    pub min_spend: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_expiry: Option<String>,

    /// Set when the card went through the payment-wrapper adapter.
    pub wrapper: Option<WrapperApplied>,
}

impl RewardResult {
    /// Deduct the wrapper fee from every value band and record it.
    pub fn charge_wrapper_fee(&mut self, fee: f64) {
        self.value_low -= fee;
        self.value_mid -= fee;
        self.value_high -= fee;
        self.wrapper = Some(WrapperApplied { fee });
    }

    pub fn wrapper_fee(&self) -> f64 {
        self.wrapper.map_or(0.0, |w| w.fee)
    }
}

#[derive(Debug, Default)]
struct Earned {
    points: f64,
    miles: f64,
    mpd: f64,
    cashback: f64,
    bands: (f64, f64, f64),
}

fn earn_cashback(rate: f64, amount: f64) -> Earned {
    let cashback = amount.floor() * (rate / 100.0);
    Earned {
        cashback,
        bands: (cashback, cashback, cashback),
        ..Earned::default()
    }
}

fn earn_miles(card: &Card, rate: f64, amount: f64) -> Earned {
    let earn_block = f64::from(card.earn_block());
    // No conversion means the card already earns miles.
    let ratio = card.miles_ratio().unwrap_or(1.0);

    let blocks = (amount / earn_block).floor();
    let points = blocks * rate;
    let miles = points / ratio;
    Earned {
        points,
        miles,
        mpd: (rate / earn_block) / ratio,
        cashback: 0.0,
        bands: (
            miles * MILE_VALUATIONS.low / 100.0,
            miles * MILE_VALUATIONS.mid / 100.0,
            miles * MILE_VALUATIONS.high / 100.0,
        ),
    }
}

/// Value `card`'s reward for spending `amount` under `resolution`.
pub fn compute_reward(card: &Card, resolution: Resolution<'_>, amount: f64) -> RewardResult {
    let rule = resolution.rule;
    let rate = rule.map_or(card.base_rate.rate, |r| r.rate);

    let earned = if card.is_cashback() {
        earn_cashback(rate, amount)
    } else {
        earn_miles(card, rate, amount)
    };

    let cap = rule.and_then(|r| r.caps).and_then(|c| c.display_limit());

    RewardResult {
        card_id: card.card_id.clone(),
        card_name: card.card_name.clone(),
        bank: card.bank.clone(),
        color: card.color.clone(),
        image: card.image.clone(),
        currency: card.currency.clone(),

        rule: rule.cloned(),
        rule_name: rule.map_or_else(|| BASE_RATE_LABEL.to_string(), |r| r.description.clone()),
        is_bonus: rule.is_some(),
        is_merchant_specific: resolution.is_merchant_specific,
        merchant_whitelist: rule.and_then(|r| r.conditions.merchant_whitelist.clone()),

        rate,
        points: earned.points,
        miles: earned.miles,
        mpd: earned.mpd,
        cashback: earned.cashback,

        value_low: earned.bands.0,
        value_mid: earned.bands.1,
        value_high: earned.bands.2,

        cap: cap.map(|(limit, _)| limit),
        cap_type: cap.map(|(_, kind)| kind),
        promo: rule.and_then(|r| r.promo_period),
        min_spend: card.min_spend_monthly,
        points_expiry: card.points_expiry.clone(),

        wrapper: None,
    }
}

/// Resolve and value one card for a purchase.
pub fn evaluate(card: &Card, purchase: &Purchase, config: &CardConfig) -> RewardResult {
    let resolution = resolve(card, purchase, config);
    compute_reward(card, resolution, purchase.amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Caps;
    use serde_json::json;

    fn cashback_card() -> Card {
        serde_json::from_value(json!({
            "card_id": "cb",
            "card_name": "Cashback",
            "bank": "Bank",
            "currency": "cashback",
            "base_rate": { "rate": 0.25 },
            "min_spend_monthly": 800.0,
            "rules": [
                { "rate": 5.0, "description": "Dining 5%",
                  "caps": { "max_cashback_monthly": 80.0 },
                  "conditions": { "channels": ["online"], "mcc_whitelist": [5812] } }
            ]
        }))
        .unwrap()
    }

    fn miles_card(earn_block: u32) -> Card {
        serde_json::from_value(json!({
            "card_id": "mi",
            "card_name": "Miles",
            "bank": "Bank",
            "currency": "points",
            "earn_block": earn_block,
            "base_rate": { "rate": 1.0 },
            "conversions": { "krisflyer": { "ratio": 1.0 } },
            "rules": [
                { "rate": 4.0, "description": "Online 4x",
                  "caps": { "max_qualifying_spend_monthly": 1000.0 },
                  "promo_period": { "start": "2025-01-01", "end": "2025-12-31" },
                  "conditions": { "channels": ["online"], "mcc_whitelist_mode": "all_except_blacklist" } }
            ]
        }))
        .unwrap()
    }

    fn bonus(card: &Card) -> Resolution<'_> {
        Resolution {
            rule: card.rules.first(),
            is_merchant_specific: false,
        }
    }

    #[test]
    fn test_cashback_floors_amount_before_rate() {
        let card = cashback_card();
        let r = compute_reward(&card, bonus(&card), 99.99);
        assert!((r.cashback - 4.95).abs() < 1e-9);
        assert_eq!(r.value_low, r.cashback);
        assert_eq!(r.value_mid, r.cashback);
        assert_eq!(r.value_high, r.cashback);
        assert_eq!(r.points, 0.0);
        assert_eq!(r.cap, Some(80.0));
        assert_eq!(r.cap_type, Some(CapType::Cashback));
        assert_eq!(r.min_spend, Some(800.0));
    }

    #[test]
    fn test_cashback_cap_reported_when_both_caps_set() {
        let mut card = cashback_card();
        card.rules[0].caps = Some(Caps {
            max_qualifying_spend_monthly: Some(1000.0),
            max_cashback_monthly: Some(80.0),
        });
        let r = compute_reward(&card, bonus(&card), 50.0);
        assert_eq!(r.cap, Some(80.0));
        assert_eq!(r.cap_type, Some(CapType::Cashback));
    }

    #[test]
    fn test_points_expiry_passed_through() {
        let mut card = miles_card(1);
        card.points_expiry = Some("24 months".to_string());
        let r = compute_reward(&card, Resolution::base_rate(), 10.0);
        assert_eq!(r.points_expiry.as_deref(), Some("24 months"));

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["points_expiry"], "24 months");
        let plain = serde_json::to_value(compute_reward(&cashback_card(), Resolution::base_rate(), 10.0)).unwrap();
        assert!(plain.get("points_expiry").is_none());
    }

    #[test]
    fn test_cashback_base_rate() {
        let card = cashback_card();
        let r = compute_reward(&card, Resolution::base_rate(), 200.0);
        assert!(!r.is_bonus);
        assert_eq!(r.rule_name, BASE_RATE_LABEL);
        assert_eq!(r.rate, 0.25);
        assert!((r.cashback - 0.5).abs() < 1e-9);
        assert_eq!(r.cap, None);
    }

    #[test]
    fn test_earn_block_flooring() {
        let card = miles_card(5);
        let r = compute_reward(&card, bonus(&card), 23.0);
        assert_eq!(r.points, 16.0);
        assert_eq!(r.miles, 16.0);
        assert!((r.mpd - 0.8).abs() < 1e-9);
        assert_eq!(r.cap, Some(1000.0));
        assert_eq!(r.cap_type, Some(CapType::Spend));
        assert!(r.promo.is_some());
    }

    #[test]
    fn test_mile_value_bands() {
        let mut card = miles_card(1);
        card.conversions.krisflyer = Some(crate::card::ConversionRatio { ratio: 2.5 });
        let r = compute_reward(&card, bonus(&card), 100.0);
        // 400 points / 2.5 = 160 miles
        assert!((r.miles - 160.0).abs() < 1e-9);
        assert!((r.value_low - 1.76).abs() < 1e-9);
        assert!((r.value_mid - 2.4).abs() < 1e-9);
        assert!((r.value_high - 3.2).abs() < 1e-9);
        assert!((r.mpd - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_charge_wrapper_fee() {
        let card = cashback_card();
        let mut r = compute_reward(&card, bonus(&card), 100.0);
        r.charge_wrapper_fee(1.0);
        assert!((r.value_mid - 4.0).abs() < 1e-9);
        assert!((r.cashback - 5.0).abs() < 1e-9);
        assert_eq!(r.wrapper_fee(), 1.0);
        assert!(r.wrapper.unwrap().is_charged());
    }
}
