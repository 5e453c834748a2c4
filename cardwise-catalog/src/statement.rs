//! Purchase statements: a CSV of past purchases, each ranked against the
//! user's cards to show which card should have been used and what it was worth.
//!
//! Expected header (column order is free):
//! date,merchant,mcc,channel,amount

use anyhow::{Context, Result};
use cardwise_core::{
    parse_eval_time, recommend, Card, CardConfigs, Channel, Mcc, Purchase, WrapperPolicy,
};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Parse a purchase statement file.
pub fn parse_purchases_csv(path: impl AsRef<Path>) -> Result<Vec<Purchase>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_purchases(file).with_context(|| format!("parsing {}", path.display()))
}

/// Parse purchases from any reader. Rows that cannot be understood are skipped.
pub fn parse_purchases<R: Read>(reader: R) -> Result<Vec<Purchase>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    };
    let require = |name: &str| {
        column(name).with_context(|| {
            format!("missing column '{name}' (expected date,merchant,mcc,channel,amount)")
        })
    };
    let date_col = require("date")?;
    let mcc_col = require("mcc")?;
    let channel_col = require("channel")?;
    let amount_col = require("amount")?;
    let merchant_col = column("merchant");

    // "$1,234.50", "S$ 12.00" -> "1234.50"
    let not_numeric = Regex::new(r"[^\d.\-]")?;

    let mut purchases = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let line = i + 2;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let Ok(at) = parse_eval_time(field(date_col)) else {
            warn!(line, date = field(date_col), "skipping row with unparseable date");
            continue;
        };
        let Ok(mcc) = field(mcc_col).parse::<Mcc>() else {
            warn!(line, mcc = field(mcc_col), "skipping row with invalid mcc");
            continue;
        };
        let Ok(channel) = field(channel_col).parse::<Channel>() else {
            warn!(line, channel = field(channel_col), "skipping row with unknown channel");
            continue;
        };
        let amount: f64 = match not_numeric.replace_all(field(amount_col), "").parse() {
            Ok(a) if a > 0.0 => a,
            _ => {
                warn!(line, amount = field(amount_col), "skipping row without a positive amount");
                continue;
            }
        };

        let mut purchase = Purchase::new(mcc, channel, amount, at);
        if let Some(merchant) = merchant_col.map(field).filter(|m| !m.is_empty()) {
            purchase = purchase.with_merchant(merchant);
        }
        purchases.push(purchase);
    }

    Ok(purchases)
}

/// Best card for one statement line.
#[derive(Debug, Clone, Serialize)]
pub struct StatementLine {
    pub purchase: Purchase,
    pub best_card: Option<String>,
    pub rule_name: Option<String>,
    pub value_mid: f64,
    pub wrapper_fee: f64,
}

/// How often a card came out on top, and what it earned there.
#[derive(Debug, Clone, Serialize)]
pub struct CardTally {
    pub card_id: String,
    pub card_name: String,
    pub wins: usize,
    pub spend: f64,
    pub value_mid: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementReport {
    pub lines: Vec<StatementLine>,
    /// Sorted by value, highest first.
    pub by_card: Vec<CardTally>,
    pub total_spend: f64,
    pub total_value_mid: f64,
}

/// Rank the selected cards for every purchase and total the best picks.
pub fn summarize<S: AsRef<str>>(
    cards: &[Card],
    selected: &[S],
    purchases: &[Purchase],
    configs: &CardConfigs,
    policy: &WrapperPolicy,
) -> StatementReport {
    let mut tallies: HashMap<String, CardTally> = HashMap::new();
    let mut lines = Vec::with_capacity(purchases.len());

    for purchase in purchases {
        let rec = recommend(cards, selected, purchase, configs, policy);
        let line = match rec.best() {
            Some(best) => {
                let tally = tallies
                    .entry(best.card_id.clone())
                    .or_insert_with(|| CardTally {
                        card_id: best.card_id.clone(),
                        card_name: best.card_name.clone(),
                        wins: 0,
                        spend: 0.0,
                        value_mid: 0.0,
                    });
                tally.wins += 1;
                tally.spend += purchase.amount;
                tally.value_mid += best.value_mid;

                StatementLine {
                    purchase: purchase.clone(),
                    best_card: Some(best.card_id.clone()),
                    rule_name: Some(best.rule_name.clone()),
                    value_mid: best.value_mid,
                    wrapper_fee: best.wrapper_fee(),
                }
            }
            None => StatementLine {
                purchase: purchase.clone(),
                best_card: None,
                rule_name: None,
                value_mid: 0.0,
                wrapper_fee: 0.0,
            },
        };
        lines.push(line);
    }

    let mut by_card: Vec<CardTally> = tallies.into_values().collect();
    by_card.sort_by(|a, b| {
        b.value_mid
            .total_cmp(&a.value_mid)
            .then_with(|| a.card_id.cmp(&b.card_id))
    });

    StatementReport {
        total_spend: purchases.iter().map(|p| p.amount).sum(),
        total_value_mid: lines.iter().map(|l| l.value_mid).sum(),
        lines,
        by_card,
    }
}
