//! Merchant category directory and search.
//!
//! The directory is grouped: `{ "categories": { group: { name: mcc | { mcc, tags } } } }`.
//! Search matches the whitespace-free query against "group name mcc tags", and a
//! bare four-digit query that no entry carries becomes a manual entry.

use anyhow::{Context, Result};
use cardwise_core::Mcc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BUILTIN_DIRECTORY: &str = include_str!("../data/mcc_categories.json");

pub const MANUAL_GROUP: &str = "Manual Entry";

#[derive(Deserialize)]
#[serde(untagged)]
enum EntryDocument {
    Code(Mcc),
    Tagged {
        mcc: Mcc,
        #[serde(default)]
        tags: Vec<String>,
    },
}

#[derive(Deserialize)]
struct DirectoryDocument {
    categories: BTreeMap<String, BTreeMap<String, EntryDocument>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MccEntry {
    pub group: String,
    pub name: String,
    pub mcc: Mcc,
    pub tags: Vec<String>,
    /// Synthesized from a typed-in code rather than found in the directory.
    pub manual: bool,
}

impl MccEntry {
    fn manual(mcc: Mcc) -> Self {
        Self {
            group: MANUAL_GROUP.to_string(),
            name: format!("MCC {mcc}"),
            mcc,
            tags: Vec::new(),
            manual: true,
        }
    }
}

fn squash(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}

#[derive(Debug, Clone)]
pub struct MccDirectory {
    entries: Vec<MccEntry>,
    search_text: Vec<String>,
    manual_code: Regex,
}

impl MccDirectory {
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_DIRECTORY).context("builtin MCC directory")
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: DirectoryDocument = serde_json::from_str(json).context("parse MCC directory")?;

        let mut entries = Vec::new();
        for (group, names) in doc.categories {
            for (name, entry) in names {
                let (mcc, tags) = match entry {
                    EntryDocument::Code(mcc) => (mcc, Vec::new()),
                    EntryDocument::Tagged { mcc, tags } => (mcc, tags),
                };
                entries.push(MccEntry {
                    group: group.clone(),
                    name,
                    mcc,
                    tags,
                    manual: false,
                });
            }
        }

        let search_text = entries
            .iter()
            .map(|e| squash(&format!("{} {} {} {}", e.group, e.name, e.mcc, e.tags.join(" "))))
            .collect();

        Ok(Self {
            entries,
            search_text,
            manual_code: Regex::new(r"^\d{4}$")?,
        })
    }

    pub fn entries(&self) -> &[MccEntry] {
        &self.entries
    }

    /// First directory entry carrying `mcc`.
    pub fn lookup(&self, mcc: Mcc) -> Option<&MccEntry> {
        self.entries.iter().find(|e| e.mcc == mcc)
    }

    /// Label like "Dining / Restaurants", or "MCC 1234" for unknown codes.
    pub fn describe(&self, mcc: Mcc) -> String {
        match self.lookup(mcc) {
            Some(e) => format!("{} / {}", e.group, e.name),
            None => format!("MCC {mcc}"),
        }
    }

    pub fn search(&self, query: &str) -> Vec<MccEntry> {
        let q = squash(query.trim());
        if q.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<MccEntry> = self
            .entries
            .iter()
            .zip(&self.search_text)
            .filter(|(_, text)| text.contains(&q))
            .map(|(e, _)| e.clone())
            .collect();

        if self.manual_code.is_match(&q) {
            if let Ok(mcc) = q.parse::<Mcc>() {
                if !results.iter().any(|e| e.mcc == mcc) {
                    results.insert(0, MccEntry::manual(mcc));
                }
            }
        }

        results
    }
}
