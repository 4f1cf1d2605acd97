//! Multi-valued categorical facets
//!
//! Facets are persisted as semicolon-joined strings (`"video; text"`) and
//! held in memory as ordered tag sets.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

/// Separator used by the persisted form
pub const TAG_SEPARATOR: char = ';';

/// Tag value used for a true boolean flag
pub const FLAG_YES: &str = "yes";

/// Tag value used for a false boolean flag
pub const FLAG_NO: &str = "no";

/// An ordered set of facet tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    /// Empty tag set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a semicolon-joined string into tags.
    ///
    /// Tags are trimmed; empty pieces are dropped.
    #[must_use]
    pub fn parse(joined: &str) -> Self {
        joined
            .split(TAG_SEPARATOR)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Single-tag set for a boolean flag (`yes` / `no`)
    #[must_use]
    pub fn flag(value: bool) -> Self {
        Self::single(if value { FLAG_YES } else { FLAG_NO })
    }

    /// Set holding exactly one tag
    #[must_use]
    pub fn single(tag: impl Into<String>) -> Self {
        let mut set = BTreeSet::new();
        set.insert(tag.into());
        Self(set)
    }

    /// Add a tag, returning whether it was new
    #[inline]
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// True if at least one tag is shared
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|t| large.contains(t))
    }

    /// True if every tag of `self` is in `other`
    #[inline]
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Merge another set into this one
    pub fn extend_from(&mut self, other: &Self) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Number of tags
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no tags
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate tags in order
    #[inline]
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }

    /// Persisted form: tags joined with `;`
    #[must_use]
    pub fn joined(&self) -> String {
        let mut out = String::new();
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(TAG_SEPARATOR);
            }
            out.push_str(tag);
        }
        out
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.joined())
    }
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Joined(String),
            List(Vec<String>),
            Missing(()),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Joined(s) => Self::parse(&s),
            Repr::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect(),
            Repr::Missing(()) => Self::new(),
        })
    }
}
