//! Category → sub-category map.
//!
//! The catalog is an explicit object handed to whoever needs it. Additions
//! made at runtime go through [`SubCategoryCatalog::add`]; persisting them is
//! the caller's job (the store keeps a `sub_categories` table that is replayed
//! into the catalog on startup).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;
use crate::task::Category;

/// One dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategoryOption {
    pub key: String,
    pub label: String,
}

impl SubCategoryOption {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        self.key.eq_ignore_ascii_case(text) || self.label.eq_ignore_ascii_case(text)
    }
}

/// Built-in option sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogPreset {
    #[default]
    Classic,
    Extended,
}

impl CatalogPreset {
    fn defaults(self, category: Category) -> Vec<SubCategoryOption> {
        let pairs: &[(&str, &str)] = match (self, category) {
            (Self::Classic, Category::Personal) => {
                &[("learning", "Learning"), ("experimenting", "Experimenting")]
            }
            (Self::Classic, Category::Office) => {
                &[("development", "Development"), ("bug fixing", "Bug Fixing")]
            }
            (Self::Extended, Category::Personal) => {
                &[("learning", "Learning"), ("implementing", "Implementing")]
            }
            (Self::Extended, Category::Office) => &[("debugging", "Debugging"), ("coding", "Coding")],
        };
        pairs
            .iter()
            .map(|(key, label)| SubCategoryOption::new(*key, *label))
            .collect()
    }
}

impl fmt::Display for CatalogPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic => f.write_str("classic"),
            Self::Extended => f.write_str("extended"),
        }
    }
}

impl FromStr for CatalogPreset {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "extended" => Ok(Self::Extended),
            _ => Err(CatalogError::UnknownPreset(s.to_string())),
        }
    }
}

/// Thread-safe category → options map.
#[derive(Debug)]
pub struct SubCategoryCatalog {
    options: RwLock<BTreeMap<Category, Vec<SubCategoryOption>>>,
}

impl SubCategoryCatalog {
    pub fn from_preset(preset: CatalogPreset) -> Self {
        let options = Category::ALL
            .iter()
            .map(|&c| (c, preset.defaults(c)))
            .collect();
        Self {
            options: RwLock::new(options),
        }
    }

    /// Options offered for `category`, in insertion order.
    pub fn options(&self, category: Category) -> Vec<SubCategoryOption> {
        self.options
            .read()
            .get(&category)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `key` is offered for `category`.
    pub fn contains(&self, category: Category, key: &str) -> bool {
        self.options
            .read()
            .get(&category)
            .is_some_and(|opts| opts.iter().any(|o| o.key == key))
    }

    /// Look up an option by key or label, ignoring ASCII case.
    pub fn find(&self, category: Category, text: &str) -> Option<SubCategoryOption> {
        let text = text.trim();
        self.options
            .read()
            .get(&category)
            .and_then(|opts| opts.iter().find(|o| o.matches(text)).cloned())
    }

    /// The option [`SubCategoryCatalog::add`] would return for `name`,
    /// without adding it.
    pub fn resolve(&self, category: Category, name: &str) -> Result<(SubCategoryOption, bool), CatalogError> {
        let label = name.trim();
        if label.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        match self.find(category, label) {
            Some(existing) => Ok((existing, false)),
            None => Ok((SubCategoryOption::new(label.to_lowercase(), label), true)),
        }
    }

    /// Add a sub-category typed by the user.
    ///
    /// The key is the trimmed, lowercased name and the label is the trimmed
    /// name as typed. Returns the option and whether it was new; an existing
    /// match is returned unchanged.
    pub fn add(&self, category: Category, name: &str) -> Result<(SubCategoryOption, bool), CatalogError> {
        let label = name.trim();
        if label.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        let mut guard = self.options.write();
        let opts = guard.entry(category).or_default();
        if let Some(existing) = opts.iter().find(|o| o.matches(label)) {
            return Ok((existing.clone(), false));
        }
        let option = SubCategoryOption::new(label.to_lowercase(), label);
        opts.push(option.clone());
        tracing::debug!(%category, key = %option.key, "sub-category added");
        Ok((option, true))
    }

    /// Replay previously persisted options. Duplicates are skipped.
    pub fn extend(&self, entries: impl IntoIterator<Item = (Category, SubCategoryOption)>) {
        let mut guard = self.options.write();
        for (category, option) in entries {
            let opts = guard.entry(category).or_default();
            if !opts.iter().any(|o| o.key == option.key) {
                opts.push(option);
            }
        }
    }
}

impl Default for SubCategoryCatalog {
    fn default() -> Self {
        Self::from_preset(CatalogPreset::default())
    }
}
