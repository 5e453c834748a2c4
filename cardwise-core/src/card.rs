//! Card catalog types: a card, its bonus rules, and the conditions a rule matches on.
//!
//! Every optional field defaults to empty, so a partially specified rule still
//! deserializes and simply never matches.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::purchase::Channel;
use crate::time::{day_end, day_start};

/// Merchant category code
pub type Mcc = u32;

/// Currency label used by cards that pay cashback instead of points.
pub const CASHBACK: &str = "cashback";

/// Inclusive range of category codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MccRange {
    pub start: Mcc,
    pub end: Mcc,
}

impl MccRange {
    pub fn contains(&self, mcc: Mcc) -> bool {
        mcc >= self.start && mcc <= self.end
    }
}

/// True when `mcc` falls in any of the ranges (both ends inclusive).
pub fn mcc_in_ranges(mcc: Mcc, ranges: &[MccRange]) -> bool {
    ranges.iter().any(|r| r.contains(mcc))
}

/// How a rule's category whitelist is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhitelistMode {
    /// Every category not vetoed by a blacklist matches.
    #[serde(rename = "all_except_blacklist")]
    AllExceptBlacklist,
    /// Only the listed codes and ranges match.
    #[serde(other, rename = "listed")]
    Listed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conditions {
    /// Channels the rule applies to. Empty means the rule never applies.
    pub channels: Vec<Channel>,
    pub mcc_whitelist: Vec<Mcc>,
    pub mcc_whitelist_ranges: Vec<MccRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcc_whitelist_mode: Option<WhitelistMode>,
    /// Resolve the whitelist from the card's user-selected category option.
    pub uses_configurable_category: bool,
    pub mcc_blacklist: Vec<Mcc>,
    /// Veto the card's travel blacklist as well.
    pub excludes_travel: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_whitelist: Option<Vec<String>>,
}

impl Conditions {
    /// A non-empty merchant whitelist switches the rule to merchant-only matching.
    pub fn merchant_whitelist(&self) -> Option<&[String]> {
        self.merchant_whitelist
            .as_deref()
            .filter(|list| !list.is_empty())
    }

    pub fn matches_all_categories(&self) -> bool {
        self.mcc_whitelist_mode == Some(WhitelistMode::AllExceptBlacklist)
    }
}

/// Monthly ceilings, carried for display only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Caps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_qualifying_spend_monthly: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cashback_monthly: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapType {
    Spend,
    Cashback,
}

impl Caps {
    /// The cap to show. A cashback ceiling wins over a qualifying-spend one.
    pub fn display_limit(&self) -> Option<(f64, CapType)> {
        self.max_cashback_monthly
            .map(|v| (v, CapType::Cashback))
            .or_else(|| self.max_qualifying_spend_monthly.map(|v| (v, CapType::Spend)))
    }
}

/// Calendar window during which a rule is eligible.
/// `end` covers its whole day, up to 23:59:59.999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PromoPeriod {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= day_start(self.start) && at <= day_end(self.end)
    }
}

/// A conditional bonus-earning rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Percent for cashback cards, points per earn block otherwise.
    pub rate: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub conditions: Conditions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caps: Option<Caps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_period: Option<PromoPeriod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseRate {
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionRatio {
    pub ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conversions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub krisflyer: Option<ConversionRatio>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mcc_whitelist: Vec<Mcc>,
}

/// A bonus category the cardholder picks from a fixed menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurableCategory {
    pub default: String,
    #[serde(default)]
    pub options: Vec<CategoryOption>,
}

impl ConfigurableCategory {
    /// The option for `choice`, or for the card default when nothing (or an
    /// empty id) was chosen. An unknown choice yields `None`.
    pub fn selected(&self, choice: Option<&str>) -> Option<&CategoryOption> {
        let id = choice
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.default);
        self.options.iter().find(|o| o.id == id)
    }

    pub fn option(&self, id: &str) -> Option<&CategoryOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

/// Static catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub card_id: String,
    pub card_name: String,
    #[serde(default)]
    pub bank: String,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub base_rate: BaseRate,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub conversions: Conversions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earn_block: Option<u32>,
    #[serde(default)]
    pub global_mcc_blacklist: Vec<Mcc>,
    #[serde(default)]
    pub travel_mcc_blacklist: Vec<Mcc>,
    #[serde(default)]
    pub travel_mcc_blacklist_ranges: Vec<MccRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configurable_category: Option<ConfigurableCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_spend_monthly: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_expiry: Option<String>,
}

impl Card {
    pub fn is_cashback(&self) -> bool {
        self.currency == CASHBACK
    }

    /// Spend unit that must be fully accumulated before points accrue.
    pub fn earn_block(&self) -> u32 {
        self.earn_block.unwrap_or(1)
    }

    /// Points-to-mile divisor, if the card converts to miles.
    pub fn miles_ratio(&self) -> Option<f64> {
        self.conversions.krisflyer.map(|c| c.ratio)
    }

    pub fn is_globally_blacklisted(&self, mcc: Mcc) -> bool {
        self.global_mcc_blacklist.contains(&mcc)
    }

    pub fn is_travel(&self, mcc: Mcc) -> bool {
        self.travel_mcc_blacklist.contains(&mcc)
            || mcc_in_ranges(mcc, &self.travel_mcc_blacklist_ranges)
    }
}
