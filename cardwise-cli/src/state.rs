use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$CARDWISE_HOME`, or `~/.cardwise`.
pub fn cardwise_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CARDWISE_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".cardwise"))
}

pub fn ensure_cardwise_home() -> Result<PathBuf> {
    let dir = cardwise_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
