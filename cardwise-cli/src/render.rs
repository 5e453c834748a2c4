//! Plain-text output for the terminal.

use cardwise_catalog::{MccEntry, StatementReport};
use cardwise_core::{CapType, Card, CardConfig, Purchase, Recommendation, RewardResult, WrapperPolicy};
use std::collections::BTreeMap;
use std::fmt::Write;

pub fn recommendation(rec: &Recommendation, purchase: &Purchase, mcc_label: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "${:.2} {} at {} ({}){}",
        purchase.amount,
        purchase.channel,
        mcc_label,
        purchase.at.format("%Y-%m-%d %H:%M"),
        purchase
            .merchant
            .as_deref()
            .map(|m| format!(" - {m}"))
            .unwrap_or_default()
    );

    if rec.results.is_empty() {
        out.push_str("No cards selected. Run `cardwise select <card_id>...` first.\n");
        return out;
    }
    if rec.all_base_rate {
        out.push_str("None of your cards earn a bonus here; showing base rates.\n");
    }
    out.push('\n');

    for (i, r) in rec.results.iter().enumerate() {
        out.push_str(&result_line(i + 1, r));
    }
    out
}

pub fn result_line(rank: usize, r: &RewardResult) -> String {
    let mut out = String::new();
    let earn = if r.currency == cardwise_core::card::CASHBACK {
        format!("{:.2}% = ${:.2} cashback", r.rate, r.cashback)
    } else {
        // Miles only transfer in whole units.
        format!(
            "{:.2} mpd = {:.0} {} -> {:.0} miles (~${:.2}, ${:.2}-${:.2})",
            r.mpd,
            r.points.floor(),
            r.currency,
            r.miles.floor(),
            r.value_mid,
            r.value_low,
            r.value_high
        )
    };
    let _ = writeln!(out, "{rank:>2}. {} ({})  {earn}", r.card_name, r.bank);
    let _ = writeln!(out, "    {}", r.rule_name);

    let mut notes = Vec::new();
    if r.is_merchant_specific {
        notes.push("partner merchant".to_string());
    }
    if let Some(fee) = r.wrapper.as_ref().filter(|w| w.is_charged()).map(|w| w.fee) {
        notes.push(format!("via wrapper, fee ${fee:.2}"));
    }
    match (r.cap, r.cap_type) {
        (Some(cap), Some(CapType::Spend)) => notes.push(format!("bonus on first ${cap:.0}/month")),
        (Some(cap), Some(CapType::Cashback)) => notes.push(format!("capped at ${cap:.0}/month")),
        _ => {}
    }
    if let Some(promo) = &r.promo {
        notes.push(format!("promo until {}", promo.end));
    }
    if let Some(min) = r.min_spend {
        notes.push(format!("min spend ${min:.0}/month"));
    }
    if let Some(expiry) = &r.points_expiry {
        notes.push(format!("points expire: {expiry}"));
    }
    if !notes.is_empty() {
        let _ = writeln!(out, "    [{}]", notes.join("; "));
    }
    out
}

/// `*` marks selected cards. Wrapper-compatible cards show whether pairing is on.
pub fn card_list(
    cards: &[Card],
    selected: &[String],
    configs: &BTreeMap<String, CardConfig>,
    policy: &WrapperPolicy,
) -> String {
    let mut out = String::new();
    for card in cards {
        let mark = if selected.iter().any(|s| s == &card.card_id) { "*" } else { " " };
        let config = configs.get(&card.card_id);
        let mut line = format!(
            "{mark} {:<16} {} ({}, {})",
            card.card_id, card.card_name, card.bank, card.currency
        );
        if policy.is_compatible(&card.card_id) {
            let on = config.is_some_and(|c| c.wrapper);
            line.push_str(if on { "  [wrapper: on]" } else { "  [wrapper: off]" });
        }
        if let Some(category) = &card.configurable_category {
            let choice = config
                .and_then(|c| c.category.as_deref())
                .filter(|c| !c.is_empty())
                .unwrap_or(&category.default);
            let _ = write!(line, "  [category: {choice}]");
        }
        let _ = writeln!(out, "{line}");
    }
    out
}

pub fn mcc_entries(entries: &[MccEntry]) -> String {
    if entries.is_empty() {
        return "No matching merchant categories.\n".to_string();
    }
    let mut out = String::new();
    for e in entries {
        if e.manual {
            let _ = writeln!(out, "{:04}  (entered code)", e.mcc);
        } else {
            let _ = writeln!(out, "{:04}  {} / {}", e.mcc, e.group, e.name);
        }
    }
    out
}

pub fn statement(report: &StatementReport) -> String {
    let mut out = String::new();
    for line in &report.lines {
        let p = &line.purchase;
        let _ = writeln!(
            out,
            "{}  {:<24} {:04} {:<11} ${:>9.2}  -> {} (~${:.2})",
            p.at.format("%Y-%m-%d"),
            p.merchant.as_deref().unwrap_or("-"),
            p.mcc,
            p.channel,
            p.amount,
            line.best_card.as_deref().unwrap_or("-"),
            line.value_mid
        );
    }

    out.push_str("\nBy card:\n");
    for t in &report.by_card {
        let _ = writeln!(
            out,
            "  {:<24} wins={:<3} spend=${:.2} value=~${:.2}",
            t.card_name, t.wins, t.spend, t.value_mid
        );
    }
    let _ = writeln!(
        out,
        "\nTotal spend ${:.2}, best-card value ~${:.2}",
        report.total_spend, report.total_value_mid
    );
    out
}
