//! Card catalog loading and integrity checks.
//!
//! Catalog documents are JSON, either a single card or an array of cards. The
//! engine assumes well-formed data, so everything it cannot survive
//! (zero earn blocks, missing mile conversions, duplicate ids) is rejected here.

use anyhow::{bail, Context, Result};
use cardwise_core::Card;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN_CARDS: &[(&str, &str)] = &[
    ("citi_cashback.json", include_str!("../data/cards/citi_cashback.json")),
    ("citi_rewards.json", include_str!("../data/cards/citi_rewards.json")),
    ("dbs_yuu.json", include_str!("../data/cards/dbs_yuu.json")),
    ("hsbc_revolution.json", include_str!("../data/cards/hsbc_revolution.json")),
    ("ocbc_365.json", include_str!("../data/cards/ocbc_365.json")),
    ("ocbc_rewards.json", include_str!("../data/cards/ocbc_rewards.json")),
    ("uob_ladys.json", include_str!("../data/cards/uob_ladys.json")),
];

#[derive(Deserialize)]
#[serde(untagged)]
enum CardDocument {
    Many(Vec<Card>),
    One(Box<Card>),
}

impl CardDocument {
    fn into_cards(self) -> Vec<Card> {
        match self {
            CardDocument::Many(cards) => cards,
            CardDocument::One(card) => vec![*card],
        }
    }
}

fn parse_cards(json: &str) -> Result<Vec<Card>> {
    let doc: CardDocument = serde_json::from_str(json).context("parse card JSON")?;
    Ok(doc.into_cards())
}

/// Validated, immutable set of cards.
#[derive(Debug, Clone, PartialEq)]
pub struct CardCatalog {
    cards: Vec<Card>,
}

impl CardCatalog {
    pub fn new(cards: Vec<Card>) -> Result<Self> {
        validate(&cards)?;
        Ok(Self { cards })
    }

    /// The sample catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        let mut cards = Vec::new();
        for (name, json) in BUILTIN_CARDS {
            cards.extend(parse_cards(json).with_context(|| format!("builtin card {name}"))?);
        }
        Self::new(cards)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::new(parse_cards(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cards = parse_cards(&s).with_context(|| format!("parsing {}", path.display()))?;
        Self::new(cards)
    }

    /// Load every `*.json` file in `dir`, in file-name order.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut cards = Vec::new();
        for path in &paths {
            let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            let loaded = parse_cards(&s).with_context(|| format!("parsing {}", path.display()))?;
            debug!(file = %path.display(), cards = loaded.len(), "loaded card file");
            cards.extend(loaded);
        }

        if cards.is_empty() {
            bail!("no cards found in {}", dir.display());
        }
        info!(dir = %dir.display(), cards = cards.len(), "card catalog loaded");
        Self::new(cards)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, card_id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.card_id == card_id)
    }

    pub fn contains(&self, card_id: &str) -> bool {
        self.get(card_id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|c| c.card_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Reject catalog data the engine would compute garbage from.
pub fn validate(cards: &[Card]) -> Result<()> {
    let mut seen = HashSet::new();
    for card in cards {
        let id = &card.card_id;
        if id.trim().is_empty() {
            bail!("card '{}' has an empty card_id", card.card_name);
        }
        if !seen.insert(id.as_str()) {
            bail!("duplicate card_id: {id}");
        }
        if card.earn_block == Some(0) {
            bail!("{id}: earn_block must be at least 1");
        }
        if !card.base_rate.rate.is_finite() {
            bail!("{id}: base rate is not a number");
        }
        if !card.is_cashback() {
            match card.miles_ratio() {
                Some(ratio) if ratio.is_finite() && ratio > 0.0 => {}
                Some(ratio) => bail!("{id}: conversion ratio must be positive, got {ratio}"),
                None => bail!("{id}: points card without conversions.krisflyer.ratio"),
            }
        }
        for (i, rule) in card.rules.iter().enumerate() {
            if !rule.rate.is_finite() {
                bail!("{id}: rule {i} ('{}') has a non-numeric rate", rule.description);
            }
            if let Some(p) = rule.promo_period {
                if p.end < p.start {
                    bail!("{id}: rule {i} promo period ends before it starts");
                }
            }
        }
        if let Some(cc) = &card.configurable_category {
            if cc.option(&cc.default).is_none() {
                bail!("{id}: default category '{}' is not one of its options", cc.default);
            }
        }
    }
    Ok(())
}
