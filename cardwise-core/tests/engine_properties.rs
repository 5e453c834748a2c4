use cardwise_core::{
    calculate_results, compute_reward, parse_eval_time, recommend, resolve, Card, CardConfig,
    CardConfigs, Channel, Purchase, Resolution, WrapperPolicy,
};
use chrono::NaiveDateTime;
use proptest::prelude::*;
use serde_json::json;

fn noon() -> NaiveDateTime {
    parse_eval_time("2025-06-15 12:00").unwrap()
}

fn catalog() -> Vec<Card> {
    serde_json::from_value(json!([
        {
            "card_id": "citi_rewards", "card_name": "Citi Rewards", "bank": "Citibank",
            "currency": "points", "earn_block": 1,
            "base_rate": { "rate": 1.0 },
            "conversions": { "krisflyer": { "ratio": 2.5 } },
            "travel_mcc_blacklist_ranges": [{ "start": 3000, "end": 3350 }],
            "rules": [
                { "rate": 10.0, "description": "Online shopping",
                  "caps": { "max_qualifying_spend_monthly": 1000 },
                  "conditions": { "channels": ["online"], "mcc_whitelist_mode": "all_except_blacklist",
                                  "excludes_travel": true } }
            ]
        },
        {
            "card_id": "cold_storage_cb", "card_name": "Grocer Cashback", "bank": "Bank",
            "currency": "cashback",
            "base_rate": { "rate": 0.25 },
            "rules": [
                { "rate": 8.0, "description": "Partner grocers",
                  "conditions": { "channels": ["online", "offline", "contactless"],
                                  "mcc_whitelist": [5411],
                                  "merchant_whitelist": ["Cold Storage"] } },
                { "rate": 3.0, "description": "Groceries",
                  "conditions": { "channels": ["online", "offline", "contactless"],
                                  "mcc_whitelist": [5411] } }
            ]
        }
    ]))
    .unwrap()
}

#[test]
fn test_no_matching_rule_uses_base_rate() {
    let cards = catalog();
    let p = Purchase::new(5411, Channel::Offline, 100.0, noon());
    let res = resolve(&cards[0], &p, &CardConfig::default());
    assert_eq!(res, Resolution::base_rate());

    let results = calculate_results(&cards, &["citi_rewards"], &p, &CardConfigs::new());
    assert_eq!(results[0].rate, 1.0);
    assert!(!results[0].is_bonus);
    assert_eq!(results[0].rule_name, "Base rate");
}

#[test]
fn test_merchant_rule_never_wins_via_category() {
    let cards = catalog();
    let p = Purchase::new(5411, Channel::Offline, 100.0, noon()).with_merchant("FairPrice Xtra");
    let res = resolve(&cards[1], &p, &CardConfig::default());
    assert_eq!(res.rule.unwrap().description, "Groceries");
    assert!(!res.is_merchant_specific);

    let p = p.with_merchant("cold storage");
    let res = resolve(&cards[1], &p, &CardConfig::default());
    assert_eq!(res.rule.unwrap().description, "Partner grocers");
    assert!(res.is_merchant_specific);
}

#[test]
fn test_range_boundaries_are_inclusive() {
    let cards = catalog();
    for mcc in [3000, 3350] {
        let p = Purchase::new(mcc, Channel::Online, 100.0, noon());
        assert!(!resolve(&cards[0], &p, &CardConfig::default()).is_bonus(), "mcc {mcc} should be travel");
    }
    let p = Purchase::new(3351, Channel::Online, 100.0, noon());
    assert!(resolve(&cards[0], &p, &CardConfig::default()).is_bonus());
}

#[test]
fn test_wrapper_offline_to_online() {
    let cards = catalog();
    let mut configs = CardConfigs::new();
    configs.insert("citi_rewards".to_string(), CardConfig { wrapper: true, category: None });

    let p = Purchase::new(5999, Channel::Offline, 100.0, noon());
    let online = calculate_results(&cards, &["citi_rewards"], &p.via(Channel::Online), &configs);
    let rec = recommend(&cards, &["citi_rewards"], &p, &configs, &WrapperPolicy::default());

    let r = &rec.results[0];
    assert_eq!(r.wrapper_fee(), 1.0);
    assert!((r.value_low - (online[0].value_low - 1.0)).abs() < 1e-9);
    assert!((r.value_mid - (online[0].value_mid - 1.0)).abs() < 1e-9);
    assert!((r.value_high - (online[0].value_high - 1.0)).abs() < 1e-9);
}

#[test]
fn test_wrapper_disabled_uses_actual_channel() {
    let cards = catalog();
    let p = Purchase::new(5999, Channel::Offline, 100.0, noon());
    let rec = recommend(&cards, &["citi_rewards"], &p, &CardConfigs::new(), &WrapperPolicy::default());
    assert!(rec.results[0].wrapper.is_none());
    assert!(!rec.results[0].is_bonus);
    assert!(rec.all_base_rate);
}

#[test]
fn test_empty_selection() {
    let cards = catalog();
    let p = Purchase::new(5999, Channel::Offline, 100.0, noon());
    let none: [&str; 0] = [];
    let rec = recommend(&cards, &none, &p, &CardConfigs::new(), &WrapperPolicy::default());
    assert!(rec.results.is_empty());
    assert!(!rec.all_base_rate);
    assert!(rec.best().is_none());
}

#[test]
fn test_recommendation_serializes() {
    let cards = catalog();
    let p = Purchase::new(5411, Channel::Online, 50.0, noon()).with_merchant("Cold Storage");
    let rec = recommend(&cards, &["citi_rewards", "cold_storage_cb"], &p, &CardConfigs::new(), &WrapperPolicy::default());
    let v = serde_json::to_value(&rec).unwrap();
    // 8% of 50 beats 200 miles at 1.5c
    assert_eq!(v["results"][0]["card_id"], "cold_storage_cb");
    assert_eq!(v["results"][0]["is_merchant_specific"], true);
    assert_eq!(v["results"][1]["card_id"], "citi_rewards");
    assert_eq!(v["results"][1]["cap_type"], "spend");
    assert_eq!(v["all_base_rate"], false);
}

proptest! {
    #[test]
    fn prop_points_use_whole_blocks(amount in 0.01f64..10_000.0, block in 1u32..20, rate in 0.5f64..10.0) {
        let mut card = catalog().remove(0);
        card.earn_block = Some(block);
        card.rules[0].rate = rate;
        let res = Resolution { rule: card.rules.first(), is_merchant_specific: false };
        let r = compute_reward(&card, res, amount);
        let blocks = (amount / f64::from(block)).floor();
        prop_assert!((r.points - blocks * rate).abs() < 1e-6);
        prop_assert!(r.points <= amount / f64::from(block) * rate + 1e-9);
    }

    #[test]
    fn prop_cashback_ignores_cents(whole in 1u32..5_000, cents in 0u32..100) {
        let card = catalog().remove(1);
        let res = Resolution::base_rate();
        let with_cents = compute_reward(&card, res, f64::from(whole) + f64::from(cents) / 100.0);
        let without = compute_reward(&card, res, f64::from(whole));
        prop_assert_eq!(with_cents.cashback, without.cashback);
    }

    #[test]
    fn prop_results_sorted_desc(amount in 1.0f64..2_000.0, mcc in prop::sample::select(vec![5411u32, 5999, 3100, 5812])) {
        let cards = catalog();
        let p = Purchase::new(mcc, Channel::Online, amount, noon());
        let rec = recommend(&cards, &["citi_rewards", "cold_storage_cb"], &p, &CardConfigs::new(), &WrapperPolicy::default());
        for pair in rec.results.windows(2) {
            prop_assert!(pair[0].value_mid >= pair[1].value_mid);
        }
    }
}
