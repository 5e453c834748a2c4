use anyhow::{Context, Result};
use cardwise_core::{CardConfig, CardConfigs, WrapperPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_cardwise_home;

/// User preferences persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cards the user holds. Empty means every card in the catalog.
    pub selected_cards: Vec<String>,
    /// IANA timezone used for "now" when evaluating promo windows.
    pub timezone: String,
    pub log_level: String,
    /// Directory of card JSON files replacing the built-in catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_dir: Option<PathBuf>,
    pub wrapper: WrapperPolicy,
    pub card_configs: BTreeMap<String, CardConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            selected_cards: Vec::new(),
            timezone: "Asia/Singapore".to_string(),
            log_level: "warn".to_string(),
            catalog_dir: None,
            wrapper: WrapperPolicy::default(),
            card_configs: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn card_configs(&self) -> CardConfigs {
        self.card_configs
            .iter()
            .map(|(id, cfg)| (id.clone(), cfg.clone()))
            .collect()
    }

    pub fn card_config_mut(&mut self, card_id: &str) -> &mut CardConfig {
        self.card_configs.entry(card_id.to_string()).or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_cardwise_home()?.join("config.toml"))
}

/// Writes defaults on first use.
pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        let cfg = Config::default();
        save_config_to(&cfg, &p)?;
        return Ok(cfg);
    }
    load_config_from(&p)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    save_config_to(cfg, &config_path()?)
}

/// Missing file means defaults.
pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}
