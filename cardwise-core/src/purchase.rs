//! Transaction context handed to the engine for a single computation.

use anyhow::bail;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::card::Mcc;

/// Payment channel of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Online,
    Contactless,
    Offline,
    /// Any channel name the engine does not know; never matches a purchase.
    #[serde(other)]
    Unknown,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Online => "online",
            Channel::Contactless => "contactless",
            Channel::Offline => "offline",
            Channel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "online" => Ok(Channel::Online),
            "contactless" => Ok(Channel::Contactless),
            "offline" => Ok(Channel::Offline),
            other => bail!("unknown channel '{other}' (expected online, contactless or offline)"),
        }
    }
}

/// One purchase to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub mcc: Mcc,
    pub channel: Channel,
    /// Positive amount in currency units. Validated by the caller.
    pub amount: f64,
    /// Local evaluation time, used for promo windows.
    pub at: NaiveDateTime,
    /// Free-text merchant description, if the user typed one.
    pub merchant: Option<String>,
}

impl Purchase {
    pub fn new(mcc: Mcc, channel: Channel, amount: f64, at: NaiveDateTime) -> Self {
        Self {
            mcc,
            channel,
            amount,
            at,
            merchant: None,
        }
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    /// The same purchase made through another channel.
    pub fn via(&self, channel: Channel) -> Self {
        Self {
            channel,
            ..self.clone()
        }
    }
}

/// Per-card user configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardConfig {
    /// Route this card through the payment wrapper.
    #[serde(default, alias = "amaze")]
    pub wrapper: bool,
    /// Selected configurable-category option id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// card_id -> configuration
pub type CardConfigs = HashMap<String, CardConfig>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_channel_parse() {
        assert_eq!("Online".parse::<Channel>().unwrap(), Channel::Online);
        assert_eq!(" contactless ".parse::<Channel>().unwrap(), Channel::Contactless);
        assert!("in-app".parse::<Channel>().is_err());
    }

    #[test]
    fn test_via_keeps_everything_but_channel() {
        let at = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let p = Purchase::new(5812, Channel::Offline, 42.0, at).with_merchant("Cafe");
        let online = p.via(Channel::Online);
        assert_eq!(online.channel, Channel::Online);
        assert_eq!(online.mcc, 5812);
        assert_eq!(online.merchant.as_deref(), Some("Cafe"));
        assert_eq!(p.channel, Channel::Offline);
    }

    #[test]
    fn test_card_config_accepts_amaze_alias() {
        let cfg: CardConfig = serde_json::from_str(r#"{"amaze": true, "category": "dining"}"#).unwrap();
        assert!(cfg.wrapper);
        assert_eq!(cfg.category.as_deref(), Some("dining"));
        assert_eq!(CardConfig::default(), serde_json::from_str("{}").unwrap());
    }
}
