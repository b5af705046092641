//! Keyword extraction — turns free text into a normalized `SkillSet`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A duplicate-free set of lower-cased, trimmed, non-empty tokens.
///
/// Backed by a `BTreeSet` so iteration (and everything derived from it, like
/// prompts and gap lists) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SkillSet(BTreeSet<String>);

/// Splits `text` on whitespace and returns the normalized token set.
/// Empty or whitespace-only input yields an empty set.
pub fn normalize(text: &str) -> SkillSet {
    SkillSet(text.split_whitespace().filter_map(normalize_token).collect())
}

fn normalize_token(raw: &str) -> Option<String> {
    let token = raw.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_lowercase())
    }
}

impl SkillSet {
    /// Builds a set from pre-split items, e.g. a profile's structured skill list.
    /// Multi-word items ("machine learning") stay a single entry.
    pub fn from_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SkillSet(
            items
                .into_iter()
                .filter_map(|item| normalize_token(item.as_ref()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Tokens present in both sets, sorted.
    pub fn intersection<'a>(&'a self, other: &'a SkillSet) -> Vec<&'a str> {
        self.0.intersection(&other.0).map(String::as_str).collect()
    }

    /// Tokens of `self` missing from `other`, sorted.
    pub fn difference<'a>(&'a self, other: &'a SkillSet) -> Vec<&'a str> {
        self.0.difference(&other.0).map(String::as_str).collect()
    }

    /// Space-joined rendering, used when the set is fed back into a prompt.
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(" ")
    }
}

impl From<Vec<String>> for SkillSet {
    fn from(items: Vec<String>) -> Self {
        SkillSet::from_items(items)
    }
}

impl From<SkillSet> for Vec<String> {
    fn from(set: SkillSet) -> Self {
        set.0.into_iter().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkillSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        SkillSet::from_items(iter)
    }
}
