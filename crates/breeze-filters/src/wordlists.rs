//! Built-in word lists
//!
//! Lists ship as plain text under `data/` and are compiled into the binary.
//! Hosts can replace or extend any of them through `WordList::from_file`.

use breeze_core::Result;
use std::collections::HashSet;
use std::path::Path;

const EXTRALIST: &str = include_str!("../data/extralist.txt");
const ALLOWLIST: &str = include_str!("../data/allowlist.txt");
const LONGLIST: &str = include_str!("../data/longlist.txt");
const LEXICON: &str = include_str!("../data/lexicon.txt");

/// An ordered, deduplicated list of lowercase entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordList {
    entries: Vec<String>,
}

impl WordList {
    /// Parse a newline-separated list; `#` comments and blank lines are skipped
    pub fn parse(source: &str) -> Self {
        let mut seen = HashSet::new();
        let entries = source
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter(|line| seen.insert(line.clone()))
            .collect();
        Self { entries }
    }

    /// Load a list from a text file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Build a list from entries, lowercasing each one
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined: Vec<String> = entries.into_iter().map(|e| e.as_ref().to_string()).collect();
        Self::parse(&joined.join("\n"))
    }

    /// Fuzzy blacklist for the extralist layer
    pub fn builtin_extralist() -> Self {
        Self::parse(EXTRALIST)
    }

    /// Words the extralist layer never flags
    pub fn builtin_allowlist() -> Self {
        Self::parse(ALLOWLIST)
    }

    /// Substring list for the longlist layer
    pub fn builtin_longlist() -> Self {
        Self::parse(LONGLIST)
    }

    /// Roots for the lexicon classifier
    pub fn builtin_lexicon() -> Self {
        Self::parse(LEXICON)
    }

    /// Append entries from another list, keeping order and uniqueness
    pub fn extend(&mut self, other: &WordList) {
        for entry in &other.entries {
            if !self.entries.contains(entry) {
                self.entries.push(entry.clone());
            }
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}
